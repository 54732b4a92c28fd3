//! Position evaluator
//!
//! Thin wrapper over the propagation black box: picks the epoch and converts
//! the sub-point into geographic degrees.

use crate::constellation::SatelliteRecord;
use crate::Result;
use chrono::{DateTime, Utc};
use orbital_mechanics::propagation::{Propagator, Sgp4Propagator};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Ground-projected satellite position
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPosition {
    pub sublong_deg: f64,
    pub sublat_deg: f64,
    pub altitude_km: f64,
}

impl GeoPosition {
    pub fn altitude_m(&self) -> f64 {
        self.altitude_km * 1000.0
    }
}

pub struct PositionEvaluator<P = Sgp4Propagator> {
    propagator: P,
}

impl Default for PositionEvaluator<Sgp4Propagator> {
    fn default() -> Self {
        Self::new(Sgp4Propagator)
    }
}

impl<P: Propagator> PositionEvaluator<P> {
    pub fn new(propagator: P) -> Self {
        Self { propagator }
    }

    pub fn evaluate(&self, record: &SatelliteRecord, epoch: DateTime<Utc>) -> Result<GeoPosition> {
        let sp = self.propagator.subpoint(&record.elements, epoch)?;
        Ok(GeoPosition {
            sublong_deg: sp.sublong_rad.to_degrees(),
            sublat_deg: sp.sublat_rad.to_degrees(),
            altitude_km: sp.altitude_km,
        })
    }

    /// Fresh records carrying their position at `epoch`.
    pub fn evaluate_all(
        &self,
        satellites: &[SatelliteRecord],
        epoch: DateTime<Utc>,
    ) -> Result<Vec<SatelliteRecord>> {
        let positioned = satellites
            .iter()
            .map(|sat| Ok(sat.with_position(self.evaluate(sat, epoch)?)))
            .collect::<Result<Vec<_>>>()?;
        debug!("Evaluated {} positions at {}", positioned.len(), epoch);
        Ok(positioned)
    }
}
