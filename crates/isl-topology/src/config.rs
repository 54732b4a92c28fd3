//! Constellation configuration
//!
//! One immutable record per shell, grouped under a constellation record that
//! carries the settings shared by every shell (epoch, phasing, eccentricity).
//! Loaded from TOML or taken from a built-in preset.

use crate::{NodeId, Result, TopologyError};
use chrono::{DateTime, TimeZone, Utc};
use orbital_mechanics::MIN_ECCENTRICITY;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::info;

/// Phase-separation window deciding which grid edges are rendered.
///
/// An edge is kept when its orbital distance is at most `max_short` or at
/// least `min_wrap`. The reference values are empirical and carry no derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceWindow {
    pub max_short: u32,
    pub min_wrap: u32,
}

impl DistanceWindow {
    pub fn admits(&self, distance: u32) -> bool {
        distance <= self.max_short || distance >= self.min_wrap
    }

    /// Window that admits every edge.
    pub fn unfiltered() -> Self {
        Self { max_short: u32::MAX, min_wrap: 0 }
    }
}

impl Default for DistanceWindow {
    fn default() -> Self {
        Self { max_short: 1, min_wrap: 21 }
    }
}

/// A single Walker-delta shell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default)]
    pub name: Option<String>,
    pub mean_motion_rev_per_day: f64,
    pub altitude_m: f64,
    pub orbit_count: u32,
    pub sats_per_orbit: u32,
    pub inclination_deg: f64,
    #[serde(default)]
    pub base_id: NodeId,
    #[serde(default)]
    pub distance_window: DistanceWindow,
}

impl ShellConfig {
    pub fn new(
        mean_motion_rev_per_day: f64,
        altitude_m: f64,
        orbit_count: u32,
        sats_per_orbit: u32,
        inclination_deg: f64,
        base_id: NodeId,
    ) -> Self {
        Self {
            name: None,
            mean_motion_rev_per_day,
            altitude_m,
            orbit_count,
            sats_per_orbit,
            inclination_deg,
            base_id,
            distance_window: DistanceWindow::default(),
        }
    }

    pub fn satellite_count(&self) -> u64 {
        u64::from(self.orbit_count) * u64::from(self.sats_per_orbit)
    }

    /// One past the last node id of this shell.
    pub fn end_id(&self) -> u64 {
        u64::from(self.base_id) + self.satellite_count()
    }

    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!(
                "{}x{}@{}",
                self.orbit_count, self.sats_per_orbit, self.inclination_deg
            ),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.orbit_count == 0 || self.sats_per_orbit == 0 {
            return Err(TopologyError::Configuration(format!(
                "shell {}: orbit count ({}) and satellites per orbit ({}) must be positive",
                self.label(),
                self.orbit_count,
                self.sats_per_orbit
            )));
        }
        if !(self.mean_motion_rev_per_day > 0.0) {
            return Err(TopologyError::Configuration(format!(
                "shell {}: mean motion must be positive",
                self.label()
            )));
        }
        if !(self.altitude_m > 0.0) {
            return Err(TopologyError::Configuration(format!(
                "shell {}: altitude must be positive",
                self.label()
            )));
        }
        if !(0.0..=180.0).contains(&self.inclination_deg) {
            return Err(TopologyError::Configuration(format!(
                "shell {}: inclination {} outside [0, 180]",
                self.label(),
                self.inclination_deg
            )));
        }
        if self.end_id() > u64::from(NodeId::MAX) {
            return Err(TopologyError::Configuration(format!(
                "shell {}: node ids overflow",
                self.label()
            )));
        }
        Ok(())
    }
}

/// Orbit settings shared by all shells of a constellation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitTemplate {
    pub epoch: DateTime<Utc>,
    pub phase_diff: bool,
    pub eccentricity: f64,
    pub arg_of_perigee_deg: f64,
}

impl Default for OrbitTemplate {
    fn default() -> Self {
        Self {
            epoch: default_epoch(),
            phase_diff: true,
            eccentricity: MIN_ECCENTRICITY,
            arg_of_perigee_deg: 0.0,
        }
    }
}

/// Fixed colours used when no traffic data drives the styling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub inter_orbit: String,
    pub intra_orbit: String,
    pub link_alpha: f64,
    pub node_color: String,
    pub marker_radius_m: f64,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            inter_orbit: "#1f77b4".to_string(),
            intra_orbit: "#ff7f0e".to_string(),
            link_alpha: 0.3,
            node_color: "black".to_string(),
            marker_radius_m: 30_000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstellationConfig {
    pub name: String,
    #[serde(default = "default_epoch")]
    pub epoch: DateTime<Utc>,
    #[serde(default = "default_true")]
    pub phase_diff: bool,
    #[serde(default = "default_eccentricity")]
    pub eccentricity: f64,
    #[serde(default)]
    pub arg_of_perigee_deg: f64,
    #[serde(default)]
    pub palette: Palette,
    pub shells: Vec<ShellConfig>,
}

fn default_epoch() -> DateTime<Utc> {
    // 2000-01-01T00:00:00Z
    Utc.timestamp_nanos(946_684_800_000_000_000)
}

fn default_true() -> bool {
    true
}

fn default_eccentricity() -> f64 {
    MIN_ECCENTRICITY
}

impl ConstellationConfig {
    pub fn new(name: impl Into<String>, shells: Vec<ShellConfig>) -> Self {
        let template = OrbitTemplate::default();
        Self {
            name: name.into(),
            epoch: template.epoch,
            phase_diff: template.phase_diff,
            eccentricity: template.eccentricity,
            arg_of_perigee_deg: template.arg_of_perigee_deg,
            palette: Palette::default(),
            shells,
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| TopologyError::Configuration(format!("TOML parse error: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading constellation config from {:?}", path);
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn orbit_template(&self) -> OrbitTemplate {
        OrbitTemplate {
            epoch: self.epoch,
            phase_diff: self.phase_diff,
            eccentricity: self.eccentricity,
            arg_of_perigee_deg: self.arg_of_perigee_deg,
        }
    }

    pub fn total_satellites(&self) -> u64 {
        self.shells.iter().map(ShellConfig::satellite_count).sum()
    }

    pub fn validate(&self) -> Result<()> {
        if self.shells.is_empty() {
            return Err(TopologyError::Configuration(format!(
                "constellation {} has no shells",
                self.name
            )));
        }
        if !(self.eccentricity > 0.0 && self.eccentricity < 1.0) {
            return Err(TopologyError::Configuration(format!(
                "eccentricity {} must lie in (0, 1); use {} for circular orbits",
                self.eccentricity, MIN_ECCENTRICITY
            )));
        }
        if !(0.0..360.0).contains(&self.arg_of_perigee_deg) {
            return Err(TopologyError::Configuration(format!(
                "argument of perigee {} outside [0, 360)",
                self.arg_of_perigee_deg
            )));
        }
        for shell in &self.shells {
            shell.validate()?;
        }

        let mut ranges: Vec<(u64, u64, String)> = self
            .shells
            .iter()
            .map(|s| (u64::from(s.base_id), s.end_id(), s.label()))
            .collect();
        ranges.sort_by_key(|(start, _, _)| *start);
        for pair in ranges.windows(2) {
            let (_, end, lower) = &pair[0];
            let (start, _, upper) = &pair[1];
            if start < end {
                return Err(TopologyError::Configuration(format!(
                    "node id ranges of shells {} and {} overlap",
                    lower, upper
                )));
            }
        }
        Ok(())
    }
}

/// Built-in constellations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Starlink,
    Starlink5Shell,
    Telesat,
    Kuiper,
}

impl Preset {
    pub const ALL: [Preset; 4] = [
        Preset::Starlink,
        Preset::Starlink5Shell,
        Preset::Telesat,
        Preset::Kuiper,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Starlink => "starlink",
            Preset::Starlink5Shell => "starlink-5shell",
            Preset::Telesat => "telesat",
            Preset::Kuiper => "kuiper",
        }
    }

    pub fn config(&self) -> ConstellationConfig {
        match self {
            Preset::Starlink => ConstellationConfig::new(
                "Starlink",
                vec![ShellConfig::new(15.19, 550_000.0, 72, 22, 53.0, 0)],
            ),
            Preset::Starlink5Shell => ConstellationConfig::new(
                "Starlink",
                vec![
                    ShellConfig::new(15.19, 550_000.0, 72, 22, 53.0, 0),
                    ShellConfig::new(13.4, 1_110_000.0, 32, 50, 53.8, 1584),
                    ShellConfig::new(13.35, 1_130_000.0, 8, 50, 74.0, 3184),
                    ShellConfig::new(12.97, 1_275_000.0, 5, 75, 81.0, 3584),
                    ShellConfig::new(12.84, 1_325_000.0, 6, 75, 70.0, 3959),
                ],
            ),
            Preset::Telesat => ConstellationConfig::new(
                "Telesat",
                vec![
                    ShellConfig::new(13.66, 1_015_000.0, 27, 13, 98.98, 0),
                    ShellConfig::new(12.84, 1_325_000.0, 40, 33, 50.88, 351),
                ],
            ),
            // Kuiper FCC filing, ITU publication 8716
            Preset::Kuiper => ConstellationConfig::new(
                "kuiper",
                vec![
                    ShellConfig::new(14.80, 630_000.0, 34, 34, 51.9, 0),
                    ShellConfig::new(14.86, 610_000.0, 36, 36, 42.0, 1156),
                    ShellConfig::new(14.93, 590_000.0, 28, 28, 33.0, 2452),
                ],
            ),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = TopologyError;

    fn from_str(s: &str) -> Result<Self> {
        Preset::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let known: Vec<&str> = Preset::ALL.iter().map(Preset::name).collect();
                TopologyError::Configuration(format!(
                    "unknown preset '{}' (known: {})",
                    s,
                    known.join(", ")
                ))
            })
    }
}
