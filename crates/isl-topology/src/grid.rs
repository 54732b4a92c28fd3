//! +Grid topology builder
//!
//! Every satellite links to four toroidal neighbours: east/west along its own
//! orbit and south/north across the adjacent orbits. [`ShellGrid`] is the one
//! place neighbour identity is computed; the edge builder here and the link
//! identity mapper both read it, and the distance window only annotates edges
//! rather than re-deriving them.

use crate::config::{DistanceWindow, ShellConfig};
use crate::constellation::SatelliteRecord;
use crate::{NodeId, Result, TopologyError};
use petgraph::algo::connected_components;
use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

/// Neighbour direction, in canonical link enumeration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Same orbit, next slot
    East,
    /// Next orbit, same slot
    South,
    /// Same orbit, previous slot
    West,
    /// Previous orbit, same slot
    North,
}

impl Direction {
    /// External traffic records number links in exactly this order.
    pub const ALL: [Direction; 4] = [
        Direction::East,
        Direction::South,
        Direction::West,
        Direction::North,
    ];

    pub fn local_link_index(self) -> u8 {
        match self {
            Direction::East => 1,
            Direction::South => 2,
            Direction::West => 3,
            Direction::North => 4,
        }
    }

    pub fn from_local_link_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(Direction::East),
            2 => Some(Direction::South),
            3 => Some(Direction::West),
            4 => Some(Direction::North),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::North => Direction::South,
        }
    }

    pub fn is_inter_orbit(self) -> bool {
        matches!(self, Direction::South | Direction::North)
    }

    /// (orbit step, slot step)
    fn offset(self) -> (i64, i64) {
        match self {
            Direction::East => (0, 1),
            Direction::South => (1, 0),
            Direction::West => (0, -1),
            Direction::North => (-1, 0),
        }
    }
}

/// Grid dimensions of one shell: N orbits of M satellites, ids from `base_id`.
///
/// With `phase_offset` set, odd orbits sit half a slot ahead of even ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShellGrid {
    orbit_count: u32,
    sats_per_orbit: u32,
    base_id: NodeId,
    phase_offset: bool,
}

impl ShellGrid {
    pub fn new(orbit_count: u32, sats_per_orbit: u32, base_id: NodeId) -> Result<Self> {
        if orbit_count == 0 || sats_per_orbit == 0 {
            return Err(TopologyError::Configuration(format!(
                "grid dimensions must be positive, got {}x{}",
                orbit_count, sats_per_orbit
            )));
        }
        let end = u64::from(base_id) + u64::from(orbit_count) * u64::from(sats_per_orbit);
        if end > u64::from(NodeId::MAX) {
            return Err(TopologyError::Configuration(format!(
                "grid {}x{} from base {} overflows node ids",
                orbit_count, sats_per_orbit, base_id
            )));
        }
        Ok(Self {
            orbit_count,
            sats_per_orbit,
            base_id,
            phase_offset: false,
        })
    }

    pub fn with_phase_offset(self, phase_offset: bool) -> Self {
        Self { phase_offset, ..self }
    }

    pub fn from_shell(shell: &ShellConfig) -> Result<Self> {
        Self::new(shell.orbit_count, shell.sats_per_orbit, shell.base_id)
    }

    pub fn orbit_count(&self) -> u32 {
        self.orbit_count
    }

    pub fn sats_per_orbit(&self) -> u32 {
        self.sats_per_orbit
    }

    pub fn base_id(&self) -> NodeId {
        self.base_id
    }

    pub fn phase_offset(&self) -> bool {
        self.phase_offset
    }

    pub fn len(&self) -> u32 {
        self.orbit_count * self.sats_per_orbit
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, node: NodeId) -> bool {
        node >= self.base_id && node - self.base_id < self.len()
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> {
        self.base_id..self.base_id + self.len()
    }

    /// Node id at (orbit, slot), wrapping both indices toroidally.
    pub fn node_id(&self, orbit: i64, slot: i64) -> NodeId {
        let orbit = orbit.rem_euclid(i64::from(self.orbit_count)) as u32;
        let slot = slot.rem_euclid(i64::from(self.sats_per_orbit)) as u32;
        self.base_id + orbit * self.sats_per_orbit + slot
    }

    /// (orbit, slot) of `node`, or `None` if it belongs to another shell.
    pub fn coordinates(&self, node: NodeId) -> Option<(u32, u32)> {
        if !self.contains(node) {
            return None;
        }
        let local = node - self.base_id;
        Some((local / self.sats_per_orbit, local % self.sats_per_orbit))
    }

    pub fn neighbor(&self, node: NodeId, direction: Direction) -> Option<NodeId> {
        let (orbit, slot) = self.coordinates(node)?;
        let (d_orbit, d_slot) = direction.offset();
        Some(self.node_id(i64::from(orbit) + d_orbit, i64::from(slot) + d_slot))
    }

    /// All four neighbours in canonical order.
    pub fn neighbors(&self, node: NodeId) -> Option<[(Direction, NodeId); 4]> {
        self.coordinates(node)?;
        let mut out = [(Direction::East, node); 4];
        for (i, direction) in Direction::ALL.into_iter().enumerate() {
            out[i] = (direction, self.neighbor(node, direction)?);
        }
        Some(out)
    }

    /// In-orbit phase of `node` in half-slot units.
    pub fn phase_position(&self, node: NodeId) -> Option<u64> {
        let (orbit, slot) = self.coordinates(node)?;
        let shift = u64::from(self.phase_offset && orbit % 2 == 1);
        Some(2 * u64::from(slot) + shift)
    }

    /// Phase-slot separation between `a` and `b`, half slots rounded up.
    ///
    /// An in-orbit wrap link spans M - 1 slots; a cross-orbit link spans 0,
    /// or 1 when the phase offset shifts one side.
    pub fn orbital_distance(&self, a: NodeId, b: NodeId) -> Option<u32> {
        let half_slots = self.phase_position(a)?.abs_diff(self.phase_position(b)?);
        // at most M slots, so it fits back into u32
        Some(half_slots.div_ceil(2) as u32)
    }
}

/// Directed grid link from `node_a` to `node_b`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridEdge {
    pub node_a: NodeId,
    pub node_b: NodeId,
    pub direction: Direction,
    pub inter_orbit: bool,
    pub orbital_distance: u32,
}

impl GridEdge {
    pub fn is_rendered(&self, window: &DistanceWindow) -> bool {
        window.admits(self.orbital_distance)
    }
}

/// Edges between materialized satellites of one shell
#[derive(Debug, Clone)]
pub struct GridTopology {
    grid: ShellGrid,
    nodes: BTreeSet<NodeId>,
    edges: BTreeMap<(NodeId, NodeId), GridEdge>,
}

/// Build the directed +Grid edge set over `satellites`.
///
/// Satellites outside `grid` and neighbours that were not materialized (a
/// truncated subset of the shell) are skipped rather than treated as errors.
/// When N or M is at most 2 two directions can reach the same neighbour; the
/// first one in canonical order labels the edge.
pub fn build_edges(satellites: &[SatelliteRecord], grid: &ShellGrid) -> GridTopology {
    let nodes: BTreeSet<NodeId> = satellites
        .iter()
        .map(|s| s.node_id)
        .filter(|id| grid.contains(*id))
        .collect();

    let mut edges = BTreeMap::new();
    let mut missing_neighbors = 0usize;

    for &node in &nodes {
        let Some(neighbors) = grid.neighbors(node) else {
            continue;
        };
        for (direction, neighbor) in neighbors {
            if !nodes.contains(&neighbor) {
                missing_neighbors += 1;
                continue;
            }
            let orbital_distance = grid
                .orbital_distance(node, neighbor)
                .unwrap_or_default();
            edges.entry((node, neighbor)).or_insert(GridEdge {
                node_a: node,
                node_b: neighbor,
                direction,
                inter_orbit: direction.is_inter_orbit(),
                orbital_distance,
            });
        }
    }

    let foreign = satellites.len() - nodes.len();
    debug!(
        "Built {} grid edges over {} nodes ({} neighbours not materialized, {} foreign satellites)",
        edges.len(),
        nodes.len(),
        missing_neighbors,
        foreign
    );

    GridTopology {
        grid: *grid,
        nodes,
        edges,
    }
}

impl GridTopology {
    pub fn grid(&self) -> &ShellGrid {
        &self.grid
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().copied()
    }

    pub fn edges(&self) -> impl Iterator<Item = &GridEdge> {
        self.edges.values()
    }

    pub fn get(&self, node_a: NodeId, node_b: NodeId) -> Option<&GridEdge> {
        self.edges.get(&(node_a, node_b))
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Edges the distance window lets through, in (node_a, node_b) order.
    pub fn rendered<'a>(
        &'a self,
        window: &'a DistanceWindow,
    ) -> impl Iterator<Item = &'a GridEdge> + 'a {
        self.edges.values().filter(move |e| e.is_rendered(window))
    }

    /// Undirected graph of the rendered mesh, one edge per linked pair.
    pub fn to_graph(&self, window: &DistanceWindow) -> UnGraph<NodeId, Direction> {
        let mut graph = UnGraph::with_capacity(self.nodes.len(), self.edges.len() / 2);
        let index: HashMap<NodeId, NodeIndex> = self
            .nodes
            .iter()
            .map(|&id| (id, graph.add_node(id)))
            .collect();

        for edge in self.rendered(window) {
            let (a, b) = (index[&edge.node_a], index[&edge.node_b]);
            if graph.find_edge(a, b).is_none() {
                graph.add_edge(a, b, edge.direction);
            }
        }
        graph
    }

    pub fn mesh_stats(&self, window: &DistanceWindow) -> MeshStats {
        let mut rendered = 0;
        let mut inter_orbit = 0;
        for edge in self.rendered(window) {
            rendered += 1;
            if edge.inter_orbit {
                inter_orbit += 1;
            }
        }

        MeshStats {
            nodes: self.nodes.len(),
            directed_edges: self.edges.len(),
            rendered_edges: rendered,
            suppressed_edges: self.edges.len() - rendered,
            inter_orbit_edges: inter_orbit,
            intra_orbit_edges: rendered - inter_orbit,
            components: connected_components(&self.to_graph(window)),
        }
    }
}

/// Mesh statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshStats {
    pub nodes: usize,
    pub directed_edges: usize,
    pub rendered_edges: usize,
    pub suppressed_edges: usize,
    pub inter_orbit_edges: usize,
    pub intra_orbit_edges: usize,
    /// Connected components of the rendered mesh
    pub components: usize,
}
