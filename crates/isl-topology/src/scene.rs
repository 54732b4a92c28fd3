//! Render intermediate representation
//!
//! Typed marker and line records built from the topology; serialization to
//! Cesium directives or JSON happens separately in [`crate::export`].

use crate::colormap::Rgb;
use crate::config::{Palette, ShellConfig};
use crate::constellation::SatelliteRecord;
use crate::grid::{build_edges, ShellGrid};
use crate::link_index::{LinkIndex, LinkKey};
use crate::{NodeId, Result, TopologyError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// CSS colour plus opacity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paint {
    pub css: String,
    pub alpha: f64,
}

impl Paint {
    pub fn new(css: impl Into<String>, alpha: f64) -> Self {
        Self { css: css.into(), alpha }
    }

    pub fn opaque(color: Rgb) -> Self {
        Self::new(color.hex(), 1.0)
    }
}

/// Spherical satellite marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMarker {
    pub node_id: NodeId,
    pub sublong_deg: f64,
    pub sublat_deg: f64,
    pub altitude_m: f64,
    pub radius_m: f64,
    pub paint: Paint,
}

/// Straight line between two satellites, `[lon_deg, lat_deg, height_m]` ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkLine {
    pub node_a: NodeId,
    pub node_b: NodeId,
    pub link: LinkKey,
    pub inter_orbit: bool,
    pub from: [f64; 3],
    pub to: [f64; 3],
    pub width: f64,
    pub paint: Paint,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub nodes: Vec<NodeMarker>,
    pub links: Vec<LinkLine>,
}

impl Scene {
    pub fn merge(&mut self, other: Scene) {
        self.nodes.extend(other.nodes);
        self.links.extend(other.links);
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// How markers and lines are coloured
#[derive(Debug, Clone, Copy)]
pub enum Styling<'a> {
    /// Uniform markers, links coloured by inter/intra orbit
    Palette(&'a Palette),
    /// Per-node and per-link traffic colours, fully opaque
    Traffic {
        node_colors: &'a BTreeMap<NodeId, Rgb>,
        link_colors: &'a BTreeMap<LinkKey, Rgb>,
        marker_radius_m: f64,
    },
}

impl Styling<'_> {
    fn marker(&self, node: NodeId) -> Result<(Paint, f64)> {
        match self {
            Styling::Palette(palette) => {
                Ok((Paint::new(&palette.node_color, 1.0), palette.marker_radius_m))
            }
            Styling::Traffic {
                node_colors,
                marker_radius_m,
                ..
            } => node_colors
                .get(&node)
                .map(|c| (Paint::opaque(*c), *marker_radius_m))
                .ok_or_else(|| {
                    TopologyError::DataIntegrity(format!("no traffic record for node {}", node))
                }),
        }
    }

    fn line(&self, key: &LinkKey, inter_orbit: bool) -> Result<Paint> {
        match self {
            Styling::Palette(palette) => {
                let css = if inter_orbit { &palette.inter_orbit } else { &palette.intra_orbit };
                Ok(Paint::new(css, palette.link_alpha))
            }
            Styling::Traffic { link_colors, .. } => link_colors
                .get(key)
                .map(|c| Paint::opaque(*c))
                .ok_or_else(|| {
                    TopologyError::DataIntegrity(format!("no traffic record for link {}", key))
                }),
        }
    }
}

/// Build markers and rendered links for one shell.
///
/// `satellites` must carry computed positions and `grid` must describe
/// `shell`. Markers are drawn at the shell's configured altitude.
/// `marker_filter` limits which nodes get a marker; links are unaffected by it.
pub fn build_shell_scene(
    shell: &ShellConfig,
    grid: &ShellGrid,
    satellites: &[SatelliteRecord],
    index: &LinkIndex,
    styling: &Styling<'_>,
    marker_filter: Option<&BTreeSet<NodeId>>,
) -> Result<Scene> {
    let altitude_m = shell.altitude_m;

    let mut ends: HashMap<NodeId, [f64; 3]> = HashMap::with_capacity(satellites.len());
    let mut scene = Scene::default();

    for sat in satellites {
        let position = sat.computed_position.ok_or_else(|| {
            TopologyError::DataIntegrity(format!(
                "satellite {} has no computed position",
                sat.node_id
            ))
        })?;
        ends.insert(sat.node_id, [position.sublong_deg, position.sublat_deg, altitude_m]);

        if marker_filter.is_some_and(|f| !f.contains(&sat.node_id)) {
            continue;
        }
        let (paint, radius_m) = styling.marker(sat.node_id)?;
        scene.nodes.push(NodeMarker {
            node_id: sat.node_id,
            sublong_deg: position.sublong_deg,
            sublat_deg: position.sublat_deg,
            altitude_m,
            radius_m,
            paint,
        });
    }

    let topology = build_edges(satellites, grid);
    for edge in topology.rendered(&shell.distance_window) {
        let link = index.lookup(edge.node_a, edge.node_b)?;
        let (Some(from), Some(to)) = (ends.get(&edge.node_a), ends.get(&edge.node_b)) else {
            continue;
        };
        scene.links.push(LinkLine {
            node_a: edge.node_a,
            node_b: edge.node_b,
            link,
            inter_orbit: edge.inter_orbit,
            from: *from,
            to: *to,
            width: 1.0,
            paint: styling.line(&link, edge.inter_orbit)?,
        });
    }

    debug!(
        "Shell {}: {} markers, {} of {} links rendered",
        shell.label(),
        scene.nodes.len(),
        scene.links.len(),
        topology.len()
    );
    Ok(scene)
}
