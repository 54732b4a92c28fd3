//! Traffic summaries
//!
//! Readers for the per-node and per-link CSV summaries produced by an external
//! simulator, plus the join against the canonical link index.

use crate::link_index::{LinkIndex, LinkKey};
use crate::{NodeId, Result, TopologyError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Traffic carried by one node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodeTraffic {
    pub packet_count: u64,
    pub traffic_size_mb: f64,
    pub orbit: u32,
    pub sat_id: u32,
}

/// Traffic carried by one directed link
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinkTraffic {
    pub packet_count: u64,
    pub traffic_size_mb: f64,
}

#[derive(Debug, Deserialize)]
struct NodeRow {
    node_id: NodeId,
    packet_count: u64,
    traffic_size_mb: f64,
    orbit: u32,
    sat_id: u32,
}

#[derive(Debug, Deserialize)]
struct LinkRow {
    link_id: String,
    packet_count: u64,
    traffic_size_mb: f64,
}

/// Which column drives the colour scale
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficMetric {
    #[default]
    Megabytes,
    Packets,
}

impl fmt::Display for TrafficMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrafficMetric::Megabytes => f.write_str("megabytes"),
            TrafficMetric::Packets => f.write_str("packets"),
        }
    }
}

impl FromStr for TrafficMetric {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "megabytes" | "mb" => Ok(TrafficMetric::Megabytes),
            "packets" => Ok(TrafficMetric::Packets),
            other => Err(TopologyError::Configuration(format!(
                "unknown traffic metric '{}'",
                other
            ))),
        }
    }
}

impl NodeTraffic {
    pub fn magnitude(&self, metric: TrafficMetric) -> f64 {
        match metric {
            TrafficMetric::Megabytes => self.traffic_size_mb,
            TrafficMetric::Packets => self.packet_count as f64,
        }
    }
}

impl LinkTraffic {
    pub fn magnitude(&self, metric: TrafficMetric) -> f64 {
        match metric {
            TrafficMetric::Megabytes => self.traffic_size_mb,
            TrafficMetric::Packets => self.packet_count as f64,
        }
    }
}

fn row_error(source: &str, row: usize, err: impl fmt::Display) -> TopologyError {
    TopologyError::DataIntegrity(format!("{} row {}: {}", source, row, err))
}

/// Parse a per-node summary (`node_id,packet_count,traffic_size_mb,orbit,sat_id`).
pub fn read_node_summary<R: Read>(reader: R) -> Result<BTreeMap<NodeId, NodeTraffic>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut nodes = BTreeMap::new();

    // header is row 1
    for (i, row) in rdr.deserialize::<NodeRow>().enumerate() {
        let row = row.map_err(|e| row_error("node summary", i + 2, e))?;
        let traffic = NodeTraffic {
            packet_count: row.packet_count,
            traffic_size_mb: row.traffic_size_mb,
            orbit: row.orbit,
            sat_id: row.sat_id,
        };
        if nodes.insert(row.node_id, traffic).is_some() {
            return Err(row_error(
                "node summary",
                i + 2,
                format!("duplicate node_id {}", row.node_id),
            ));
        }
    }

    Ok(nodes)
}

/// Parse a per-link summary (`link_id,packet_count,traffic_size_mb`).
pub fn read_link_summary<R: Read>(reader: R) -> Result<BTreeMap<LinkKey, LinkTraffic>> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut links = BTreeMap::new();

    for (i, row) in rdr.deserialize::<LinkRow>().enumerate() {
        let row = row.map_err(|e| row_error("link summary", i + 2, e))?;
        let key: LinkKey = row
            .link_id
            .parse()
            .map_err(|e| row_error("link summary", i + 2, e))?;
        let traffic = LinkTraffic {
            packet_count: row.packet_count,
            traffic_size_mb: row.traffic_size_mb,
        };
        if links.insert(key, traffic).is_some() {
            return Err(row_error(
                "link summary",
                i + 2,
                format!("duplicate link_id {}", key),
            ));
        }
    }

    Ok(links)
}

/// Node and link traffic for one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrafficSummary {
    pub nodes: BTreeMap<NodeId, NodeTraffic>,
    pub links: BTreeMap<LinkKey, LinkTraffic>,
}

impl TrafficSummary {
    pub fn load(node_path: impl AsRef<Path>, link_path: impl AsRef<Path>) -> Result<Self> {
        let (node_path, link_path) = (node_path.as_ref(), link_path.as_ref());
        info!("Loading traffic from {:?} and {:?}", node_path, link_path);

        let nodes = read_node_summary(std::fs::File::open(node_path)?)?;
        let links = read_link_summary(std::fs::File::open(link_path)?)?;
        debug!("Read {} node and {} link traffic records", nodes.len(), links.len());

        Ok(Self { nodes, links })
    }

    /// Every link record must name a canonical grid link.
    pub fn validate_links(&self, index: &LinkIndex) -> Result<()> {
        match self.links.keys().find(|key| !index.contains_key(key)) {
            Some(key) => Err(TopologyError::UnmappedTrafficLink(*key)),
            None => Ok(()),
        }
    }

    pub fn node_magnitudes(&self, metric: TrafficMetric) -> BTreeMap<NodeId, f64> {
        self.nodes
            .iter()
            .map(|(id, t)| (*id, t.magnitude(metric)))
            .collect()
    }

    pub fn link_magnitudes(&self, metric: TrafficMetric) -> BTreeMap<LinkKey, f64> {
        self.links
            .iter()
            .map(|(key, t)| (*key, t.magnitude(metric)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::ShellGrid;
    use crate::link_index::build_link_index;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const NODES: &str = "node_id,packet_count,traffic_size_mb,orbit,sat_id\n\
                         0,120,1.5,0,0\n\
                         1,80,0.75,0,1\n\
                         22,10,0.125,1,0\n";

    const LINKS: &str = "link_id,packet_count,traffic_size_mb\n\
                         0-1,40,0.5\n\
                         0-2,20,0.25\n\
                         22-4,5,0.0625\n";

    #[test]
    fn test_read_node_summary() {
        let nodes = read_node_summary(NODES.as_bytes()).unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(
            nodes[&22],
            NodeTraffic { packet_count: 10, traffic_size_mb: 0.125, orbit: 1, sat_id: 0 }
        );
    }

    #[test]
    fn test_read_link_summary() {
        let links = read_link_summary(LINKS.as_bytes()).unwrap();
        let key = LinkKey { node_id: 0, local_link_index: 2 };
        assert_eq!(links[&key].packet_count, 20);
        assert_eq!(links.len(), 3);
    }

    #[test]
    fn test_missing_column_names_row() {
        let text = "node_id,packet_count,orbit,sat_id\n0,1,0,0\n";
        match read_node_summary(text.as_bytes()) {
            Err(TopologyError::DataIntegrity(msg)) => assert!(msg.contains("row 2"), "{}", msg),
            other => panic!("expected data integrity error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_link_id() {
        let text = "link_id,packet_count,traffic_size_mb\n0-1,1,1.0\n7_2,1,1.0\n";
        match read_link_summary(text.as_bytes()) {
            Err(TopologyError::DataIntegrity(msg)) => {
                assert!(msg.contains("row 3"), "{}", msg);
                assert!(msg.contains("7_2"), "{}", msg);
            }
            other => panic!("expected data integrity error, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_keys_rejected() {
        let text = "link_id,packet_count,traffic_size_mb\n0-1,1,1.0\n0-1,2,2.0\n";
        assert!(matches!(read_link_summary(text.as_bytes()), Err(TopologyError::DataIntegrity(_))));

        let text = "node_id,packet_count,traffic_size_mb,orbit,sat_id\n3,1,1.0,0,3\n3,1,1.0,0,3\n";
        assert!(matches!(read_node_summary(text.as_bytes()), Err(TopologyError::DataIntegrity(_))));
    }

    #[test]
    fn test_load_and_validate_against_index() {
        let mut nodes = NamedTempFile::new().unwrap();
        nodes.write_all(NODES.as_bytes()).unwrap();
        let mut links = NamedTempFile::new().unwrap();
        links.write_all(LINKS.as_bytes()).unwrap();

        let summary = TrafficSummary::load(nodes.path(), links.path()).unwrap();
        let index = build_link_index(&ShellGrid::new(72, 22, 0).unwrap());
        summary.validate_links(&index).unwrap();

        let small = build_link_index(&ShellGrid::new(1, 22, 0).unwrap());
        assert!(matches!(
            summary.validate_links(&small),
            Err(TopologyError::UnmappedTrafficLink(LinkKey { node_id: 22, local_link_index: 4 }))
        ));
    }

    #[test]
    fn test_magnitudes_follow_metric() {
        let summary = TrafficSummary {
            nodes: read_node_summary(NODES.as_bytes()).unwrap(),
            links: read_link_summary(LINKS.as_bytes()).unwrap(),
        };
        assert_eq!(summary.node_magnitudes(TrafficMetric::Megabytes)[&0], 1.5);
        assert_eq!(summary.node_magnitudes(TrafficMetric::Packets)[&0], 120.0);
        let key = LinkKey { node_id: 0, local_link_index: 1 };
        assert_eq!(summary.link_magnitudes(TrafficMetric::Packets)[&key], 40.0);
        assert_eq!("Packets".parse::<TrafficMetric>().unwrap(), TrafficMetric::Packets);
        assert!("bits".parse::<TrafficMetric>().is_err());
    }
}
