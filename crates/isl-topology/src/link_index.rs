//! Link identity mapper
//!
//! Traffic records name a link as `"<node_id>-<local_link_index>"`, counting
//! all four geometric neighbours regardless of whether the edge is rendered.
//! The index is therefore built from [`ShellGrid`] alone, never from a
//! filtered edge set.

use crate::grid::{Direction, ShellGrid};
use crate::{NodeId, Result, TopologyError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Canonical identity of a directed link endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LinkKey {
    pub node_id: NodeId,
    pub local_link_index: u8,
}

impl LinkKey {
    pub fn new(node_id: NodeId, direction: Direction) -> Self {
        Self {
            node_id,
            local_link_index: direction.local_link_index(),
        }
    }

    pub fn direction(&self) -> Option<Direction> {
        Direction::from_local_link_index(self.local_link_index)
    }
}

impl fmt::Display for LinkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.node_id, self.local_link_index)
    }
}

impl FromStr for LinkKey {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || TopologyError::DataIntegrity(format!("malformed link id '{}'", s));

        let (node, index) = s.trim().split_once('-').ok_or_else(malformed)?;
        let node_id = node.parse::<NodeId>().map_err(|_| malformed())?;
        let local_link_index = index.parse::<u8>().map_err(|_| malformed())?;
        if Direction::from_local_link_index(local_link_index).is_none() {
            return Err(TopologyError::DataIntegrity(format!(
                "link id '{}': local link index must be 1..4",
                s
            )));
        }
        Ok(Self {
            node_id,
            local_link_index,
        })
    }
}

/// Bidirectional map between directed node pairs and link keys
#[derive(Debug, Clone, Default)]
pub struct LinkIndex {
    by_key: BTreeMap<LinkKey, (NodeId, NodeId)>,
    by_pair: HashMap<(NodeId, NodeId), LinkKey>,
}

/// Enumerate all four neighbours of every node in `grid`.
pub fn build_link_index(grid: &ShellGrid) -> LinkIndex {
    let mut index = LinkIndex::default();

    for node in grid.nodes() {
        let Some(neighbors) = grid.neighbors(node) else {
            continue;
        };
        for (direction, neighbor) in neighbors {
            index.insert(LinkKey::new(node, direction), node, neighbor);
        }
    }

    debug!(
        "Link index: {} keys over {} nodes (base {})",
        index.len(),
        grid.len(),
        grid.base_id()
    );
    index
}

impl LinkIndex {
    fn insert(&mut self, key: LinkKey, node_a: NodeId, node_b: NodeId) {
        self.by_key.insert(key, (node_a, node_b));
        // first direction in canonical order wins when two reach the same node
        self.by_pair.entry((node_a, node_b)).or_insert(key);
    }

    /// Key of the directed link `node_a -> node_b`.
    pub fn lookup(&self, node_a: NodeId, node_b: NodeId) -> Result<LinkKey> {
        self.by_pair
            .get(&(node_a, node_b))
            .copied()
            .ok_or(TopologyError::UnknownLink { node_a, node_b })
    }

    /// Endpoints a key resolves to.
    pub fn endpoints(&self, key: &LinkKey) -> Result<(NodeId, NodeId)> {
        self.by_key
            .get(key)
            .copied()
            .ok_or(TopologyError::UnmappedTrafficLink(*key))
    }

    pub fn contains_key(&self, key: &LinkKey) -> bool {
        self.by_key.contains_key(key)
    }

    /// Entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&LinkKey, &(NodeId, NodeId))> {
        self.by_key.iter()
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Merge another shell's index. Shells own disjoint id ranges, so a
    /// repeated key means the configuration was not validated.
    pub fn extend(&mut self, other: LinkIndex) -> Result<()> {
        for (key, (a, b)) in other.by_key {
            if self.by_key.contains_key(&key) {
                return Err(TopologyError::DataIntegrity(format!(
                    "link {} defined by two shells",
                    key
                )));
            }
            self.insert(key, a, b);
        }
        Ok(())
    }
}
