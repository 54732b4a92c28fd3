//! Constellation generator
//!
//! Expands a shell configuration into satellite records in orbit-major order.
//! Node ids are positional (`base + orbit * M + slot`), so the ordering of the
//! returned vector is part of the contract.

use crate::config::{OrbitTemplate, ShellConfig};
use crate::position::GeoPosition;
use crate::{NodeId, Result, TopologyError};
use orbital_mechanics::walker::WalkerDelta;
use orbital_mechanics::OrbitalElementSet;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SatelliteRecord {
    pub node_id: NodeId,
    pub orbit_index: u32,
    pub slot_index: u32,
    pub elements: OrbitalElementSet,
    /// Filled by the position evaluator for one epoch
    pub computed_position: Option<GeoPosition>,
}

impl SatelliteRecord {
    /// Copy of this record carrying `position`.
    pub fn with_position(&self, position: GeoPosition) -> Self {
        Self {
            computed_position: Some(position),
            ..self.clone()
        }
    }
}

/// Generate every satellite of `shell`.
pub fn generate(shell: &ShellConfig, template: &OrbitTemplate) -> Result<Vec<SatelliteRecord>> {
    shell.validate()?;

    let walker = WalkerDelta {
        planes: shell.orbit_count,
        sats_per_plane: shell.sats_per_orbit,
        phase_diff: template.phase_diff,
    };

    let mut satellites = Vec::with_capacity(walker.total_satellites() as usize);

    for orbit in 0..shell.orbit_count {
        let raan_deg = walker.raan_deg(orbit);

        for slot in 0..shell.sats_per_orbit {
            let elements = OrbitalElementSet {
                inclination_deg: shell.inclination_deg,
                eccentricity: template.eccentricity,
                arg_of_perigee_deg: template.arg_of_perigee_deg,
                mean_motion_rev_per_day: shell.mean_motion_rev_per_day,
                altitude_m: shell.altitude_m,
                epoch: template.epoch,
                raan_deg,
                mean_anomaly_deg: walker.mean_anomaly_deg(orbit, slot),
            };
            elements
                .validate()
                .map_err(|e| TopologyError::Configuration(e.to_string()))?;

            satellites.push(SatelliteRecord {
                node_id: shell.base_id + orbit * shell.sats_per_orbit + slot,
                orbit_index: orbit,
                slot_index: slot,
                elements,
                computed_position: None,
            });
        }
    }

    debug!(
        "Generated {} satellites for shell {} (ids {}..{})",
        satellites.len(),
        shell.label(),
        shell.base_id,
        shell.end_id()
    );

    Ok(satellites)
}

/// Keep only the first `orbits` orbits of an orbit-major satellite list.
pub fn truncate_orbits(satellites: &[SatelliteRecord], orbits: u32) -> Vec<SatelliteRecord> {
    satellites
        .iter()
        .filter(|s| s.orbit_index < orbits)
        .cloned()
        .collect()
}
