//! ISL Topology - +Grid mesh for Walker-delta shells
//!
//! Derives the static inter-satellite-link mesh of a constellation snapshot
//! and joins externally computed traffic summaries against it:
//!
//! - Constellation generation (orbit-major satellite records)
//! - Position evaluation at a single epoch
//! - 4-neighbour toroidal grid with distance-window filtering
//! - Canonical link identity (`node-index` keys used by traffic records)
//! - Traffic colouring and a render IR with Cesium / JSON export

use orbital_mechanics::OrbitalError;
use thiserror::Error;

pub mod colormap;
pub mod config;
pub mod constellation;
pub mod export;
pub mod grid;
pub mod link_index;
pub mod position;
pub mod scene;
pub mod traffic;

pub use colormap::{colorize, AnchorColormap, Colormap, Rgb, PLASMA, VIRIDIS};
pub use config::{ConstellationConfig, DistanceWindow, OrbitTemplate, Palette, Preset, ShellConfig};
pub use constellation::{generate, SatelliteRecord};
pub use grid::{build_edges, Direction, GridEdge, GridTopology, MeshStats, ShellGrid};
pub use link_index::{build_link_index, LinkIndex, LinkKey};
pub use position::{GeoPosition, PositionEvaluator};
pub use scene::{build_shell_scene, LinkLine, NodeMarker, Paint, Scene, Styling};
pub use traffic::{LinkTraffic, NodeTraffic, TrafficMetric, TrafficSummary};

/// Global satellite identifier (unique across all shells).
pub type NodeId = u32;

/// Topology errors
#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Unknown link {node_a} -> {node_b}: not a grid neighbour")]
    UnknownLink { node_a: NodeId, node_b: NodeId },
    #[error("Traffic record for link {0} has no canonical grid link")]
    UnmappedTrafficLink(LinkKey),
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),
    #[error("Orbital error: {0}")]
    Orbital(#[from] OrbitalError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TopologyError>;
