//! Orbital Mechanics Library
//!
//! SGP4 propagation, TEME to Earth-fixed sub-point transforms and Walker-delta
//! spacing for static constellation snapshots.
//!
//! The topology crates treat everything in here as a black box: an orbital
//! element set plus a time goes in, a ground-projected position comes out.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrbitalError {
    #[error("Invalid TLE format: {0}")]
    InvalidTle(String),
    #[error("Propagation failed: {0}")]
    PropagationFailed(String),
    #[error("Invalid orbital elements: {0}")]
    InvalidElements(String),
}

pub type Result<T> = std::result::Result<T, OrbitalError>;

/// WGS72 equatorial radius, the value SGP4 itself is built on.
pub const EARTH_RADIUS_KM: f64 = 6378.135;

/// Smallest eccentricity that survives the 7-digit TLE encoding.
///
/// Circular orbits are zero, but the propagation backend rejects an exact
/// zero, so this is what callers use to approximate one.
pub const MIN_ECCENTRICITY: f64 = 0.0000001;

/// Mean Keplerian elements for a single satellite.
///
/// Angles are in degrees, mean motion in revolutions per day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElementSet {
    pub inclination_deg: f64,
    pub eccentricity: f64,
    pub arg_of_perigee_deg: f64,
    pub mean_motion_rev_per_day: f64,
    /// Nominal altitude the shell was designed for (not used by SGP4)
    pub altitude_m: f64,
    pub epoch: DateTime<Utc>,
    pub raan_deg: f64,
    pub mean_anomaly_deg: f64,
}

impl OrbitalElementSet {
    /// Check the elements can be encoded and propagated.
    pub fn validate(&self) -> Result<()> {
        if !(self.eccentricity > 0.0 && self.eccentricity < 1.0) {
            return Err(OrbitalError::InvalidElements(format!(
                "eccentricity {} must lie in (0, 1); use {} for circular orbits",
                self.eccentricity, MIN_ECCENTRICITY
            )));
        }
        if !(self.mean_motion_rev_per_day > 0.0) {
            return Err(OrbitalError::InvalidElements(format!(
                "mean motion {} rev/day must be positive",
                self.mean_motion_rev_per_day
            )));
        }
        for (name, value) in [
            ("inclination", self.inclination_deg),
            ("RAAN", self.raan_deg),
            ("argument of perigee", self.arg_of_perigee_deg),
            ("mean anomaly", self.mean_anomaly_deg),
        ] {
            if !(0.0..360.0).contains(&value) {
                return Err(OrbitalError::InvalidElements(format!(
                    "{} {} deg outside [0, 360)",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Ground projection of a satellite at an instant.
///
/// Angles are radians; callers convert for geographic output.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubPoint {
    pub sublong_rad: f64,
    pub sublat_rad: f64,
    pub altitude_km: f64,
}

pub mod tle {
    //! Two-line element synthesis for generated (not catalogued) satellites.

    use super::*;
    use chrono::{Datelike, Timelike};

    /// Format `elements` as TLE line 1 and line 2.
    ///
    /// Catalog numbers wrap at five digits.
    pub fn format_lines(catalog_number: u32, elements: &OrbitalElementSet) -> (String, String) {
        let catalog_number = catalog_number % 100_000;
        let epoch = elements.epoch;

        // Epoch format: YYDDD.DDDDDDDD (2-digit year, day of year with fraction)
        let year = epoch.year().rem_euclid(100);
        let seconds_of_day = f64::from(epoch.num_seconds_from_midnight())
            + f64::from(epoch.nanosecond()) / 1e9;
        let day_of_year = f64::from(epoch.ordinal()) + seconds_of_day / 86_400.0;

        let line1_base = format!(
            "1 {:05}U 24001A   {:02}{:012.8}  .00000000  00000-0  00000-0 0  999",
            catalog_number, year, day_of_year
        );
        let line1 = format!("{}{}", line1_base, checksum_digit(&line1_base));

        // Eccentricity has an implied leading decimal point
        let ecc = (elements.eccentricity * 10_000_000.0).round().clamp(0.0, 9_999_999.0) as u32;

        let line2_base = format!(
            "2 {:05} {:8.4} {:8.4} {:07} {:8.4} {:8.4} {:11.8}{:05}",
            catalog_number,
            elements.inclination_deg,
            elements.raan_deg,
            ecc,
            elements.arg_of_perigee_deg,
            elements.mean_anomaly_deg,
            elements.mean_motion_rev_per_day,
            0
        );
        let line2 = format!("{}{}", line2_base, checksum_digit(&line2_base));

        (line1, line2)
    }

    /// TLE checksum: digits count as themselves, minus signs as one.
    pub fn checksum_digit(line: &str) -> u32 {
        let sum: u32 = line
            .chars()
            .map(|c| match c {
                '0'..='9' => c.to_digit(10).unwrap_or(0),
                '-' => 1,
                _ => 0,
            })
            .sum();
        sum % 10
    }
}

pub mod propagation {
    use super::*;

    /// Maps an element set and a time to a ground projection.
    ///
    /// Implementations must be pure: the same inputs always produce the same
    /// sub-point, with no clock advanced between calls.
    pub trait Propagator {
        fn subpoint(&self, elements: &OrbitalElementSet, at: DateTime<Utc>) -> Result<SubPoint>;
    }

    /// SGP4 via the `sgp4` crate, fed with synthesized TLEs.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct Sgp4Propagator;

    /// Catalog number stamped on synthesized TLEs.
    const SYNTHETIC_CATALOG_NUMBER: u32 = 90_000;

    impl Propagator for Sgp4Propagator {
        fn subpoint(&self, elements: &OrbitalElementSet, at: DateTime<Utc>) -> Result<SubPoint> {
            let position = sgp4_propagate(elements, at)?;
            Ok(transforms::teme_to_subpoint(position, transforms::gmst_rad(at)))
        }
    }

    /// Propagate to `time`, returning the TEME position in km.
    pub fn sgp4_propagate(elements: &OrbitalElementSet, time: DateTime<Utc>) -> Result<[f64; 3]> {
        elements.validate()?;

        let (line1, line2) = tle::format_lines(SYNTHETIC_CATALOG_NUMBER, elements);
        let parsed = sgp4::Elements::from_tle(None, line1.as_bytes(), line2.as_bytes())
            .map_err(|e| OrbitalError::InvalidTle(format!("{:?}", e)))?;

        let constants = sgp4::Constants::from_elements(&parsed)
            .map_err(|e| OrbitalError::PropagationFailed(format!("{:?}", e)))?;

        let epoch_utc = DateTime::<Utc>::from_naive_utc_and_offset(parsed.datetime, Utc);
        let duration = time.signed_duration_since(epoch_utc);
        let minutes_since_epoch = duration.num_milliseconds() as f64 / 60_000.0;

        let prediction = constants
            .propagate(sgp4::MinutesSinceEpoch(minutes_since_epoch))
            .map_err(|e| OrbitalError::PropagationFailed(format!("{:?}", e)))?;

        Ok(prediction.position)
    }
}

pub mod transforms {
    use super::*;
    use std::f64::consts::TAU;

    const JULIAN_DATE_UNIX_EPOCH: f64 = 2_440_587.5;
    const JULIAN_DATE_J2000: f64 = 2_451_545.0;

    /// Julian date (UTC, used in place of UT1).
    pub fn julian_date(time: DateTime<Utc>) -> f64 {
        let seconds = time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) / 1e9;
        seconds / 86_400.0 + JULIAN_DATE_UNIX_EPOCH
    }

    /// Greenwich mean sidereal time (IAU-82) in radians, in [0, 2π).
    pub fn gmst_rad(time: DateTime<Utc>) -> f64 {
        let t = (julian_date(time) - JULIAN_DATE_J2000) / 36_525.0;
        let gmst_seconds = 67_310.548_41
            + (876_600.0 * 3_600.0 + 8_640_184.812_866) * t
            + 0.093_104 * t * t
            - 6.2e-6 * t * t * t;
        (gmst_seconds.rem_euclid(86_400.0) / 86_400.0) * TAU
    }

    /// Rotate a TEME position into the Earth-fixed frame and project it.
    ///
    /// Latitude is geocentric; altitude is measured above the WGS72 sphere.
    pub fn teme_to_subpoint(position_km: [f64; 3], gmst_rad: f64) -> SubPoint {
        let [x, y, z] = position_km;

        // Rotation matrix around Z-axis by GMST
        let cos_gmst = gmst_rad.cos();
        let sin_gmst = gmst_rad.sin();
        let x_ecef = cos_gmst * x + sin_gmst * y;
        let y_ecef = -sin_gmst * x + cos_gmst * y;

        let r_xy = (x_ecef * x_ecef + y_ecef * y_ecef).sqrt();
        let radius = (r_xy * r_xy + z * z).sqrt();

        SubPoint {
            sublong_rad: y_ecef.atan2(x_ecef),
            sublat_rad: z.atan2(r_xy),
            altitude_km: radius - EARTH_RADIUS_KM,
        }
    }
}

pub mod walker {
    //! Walker-delta spacing for a single shell.

    #[derive(Debug, Clone, Copy)]
    pub struct WalkerDelta {
        pub planes: u32,
        pub sats_per_plane: u32,
        /// Shift odd planes by half an in-plane slot
        pub phase_diff: bool,
    }

    impl WalkerDelta {
        pub fn total_satellites(&self) -> u32 {
            self.planes * self.sats_per_plane
        }

        pub fn plane_spacing_deg(&self) -> f64 {
            360.0 / f64::from(self.planes)
        }

        pub fn in_plane_spacing_deg(&self) -> f64 {
            360.0 / f64::from(self.sats_per_plane)
        }

        pub fn raan_deg(&self, plane: u32) -> f64 {
            f64::from(plane) * self.plane_spacing_deg()
        }

        /// Mean-anomaly offset applied to every satellite of `plane`.
        pub fn phase_shift_deg(&self, plane: u32) -> f64 {
            if self.phase_diff && plane % 2 == 1 {
                self.in_plane_spacing_deg() / 2.0
            } else {
                0.0
            }
        }

        pub fn mean_anomaly_deg(&self, plane: u32, slot: u32) -> f64 {
            self.phase_shift_deg(plane) + f64::from(slot) * self.in_plane_spacing_deg()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::propagation::{Propagator, Sgp4Propagator};
    use super::*;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap()
    }

    fn starlink_elements(raan_deg: f64, mean_anomaly_deg: f64) -> OrbitalElementSet {
        OrbitalElementSet {
            inclination_deg: 53.0,
            eccentricity: MIN_ECCENTRICITY,
            arg_of_perigee_deg: 0.0,
            mean_motion_rev_per_day: 15.19,
            altitude_m: 550_000.0,
            epoch: epoch(),
            raan_deg,
            mean_anomaly_deg,
        }
    }

    #[test]
    fn test_tle_line_layout() {
        let (line1, line2) = tle::format_lines(90_000, &starlink_elements(5.0, 16.3636));
        assert_eq!(line1.len(), 69);
        assert_eq!(line2.len(), 69);
        assert!(line1.starts_with("1 90000U"));
        assert_eq!(&line1[18..32], "00001.00000000");
        assert_eq!(&line2[26..33], "0000001");
        assert_eq!(&line2[52..63], "15.19000000");

        let expected = tle::checksum_digit(&line2[..68]);
        assert_eq!(line2[68..].parse::<u32>().unwrap(), expected);
    }

    #[test]
    fn test_tle_checksum() {
        let line = "1 25544U 98067A   08264.51782528 -.00002182  00000-0 -11606-4 0  292";
        assert_eq!(tle::checksum_digit(line), 7);
    }

    #[test]
    fn test_zero_eccentricity_rejected() {
        let mut elements = starlink_elements(0.0, 0.0);
        elements.eccentricity = 0.0;
        let err = Sgp4Propagator.subpoint(&elements, epoch()).unwrap_err();
        assert!(matches!(err, OrbitalError::InvalidElements(_)));
    }

    #[test]
    fn test_gmst_at_j2000_midnight() {
        // 2000-01-01 00:00 UTC: GMST = 6h39m52s ≈ 99.968°
        let gmst_deg = transforms::gmst_rad(epoch()).to_degrees();
        assert!((gmst_deg - 99.968).abs() < 0.01, "GMST {}", gmst_deg);
    }

    #[test]
    fn test_ascending_node_subpoint() {
        let sp = Sgp4Propagator
            .subpoint(&starlink_elements(0.0, 0.0), epoch())
            .unwrap();

        // At the ascending node with RAAN 0 the satellite sits on the vernal
        // equinox direction, so the sub-longitude is -GMST.
        assert!(sp.sublat_rad.to_degrees().abs() < 1.0);
        assert!((sp.sublong_rad.to_degrees() + 99.968).abs() < 2.0);
        assert!(sp.altitude_km > 400.0 && sp.altitude_km < 650.0, "alt {}", sp.altitude_km);
    }

    #[test]
    fn test_propagation_is_repeatable() {
        let elements = starlink_elements(125.0, 212.7272);
        let a = Sgp4Propagator.subpoint(&elements, epoch()).unwrap();
        let b = Sgp4Propagator.subpoint(&elements, epoch()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_latitude_bounded_by_inclination() {
        for slot in 0..22 {
            let ma = f64::from(slot) * 360.0 / 22.0;
            let sp = Sgp4Propagator
                .subpoint(&starlink_elements(40.0, ma), epoch())
                .unwrap();
            assert!(sp.sublat_rad.to_degrees().abs() <= 53.5);
        }
    }

    #[test]
    fn test_walker_spacing() {
        let walker = walker::WalkerDelta { planes: 72, sats_per_plane: 22, phase_diff: true };
        assert_eq!(walker.total_satellites(), 1584);
        assert_eq!(walker.raan_deg(1), 5.0);
        assert_eq!(walker.phase_shift_deg(0), 0.0);
        assert!((walker.phase_shift_deg(1) - 360.0 / 44.0).abs() < 1e-12);
        assert!((walker.mean_anomaly_deg(2, 11) - 180.0).abs() < 1e-9);

        let stacked = walker::WalkerDelta { phase_diff: false, ..walker };
        assert_eq!(stacked.phase_shift_deg(1), 0.0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(300))]

            #[test]
            fn tle_lines_keep_fixed_width(
                inclination in 0.0f64..180.0,
                raan in 0.0f64..360.0,
                mean_anomaly in 0.0f64..360.0,
                mean_motion in 11.0f64..16.5,
            ) {
                let elements = OrbitalElementSet {
                    inclination_deg: inclination,
                    raan_deg: raan,
                    mean_anomaly_deg: mean_anomaly,
                    mean_motion_rev_per_day: mean_motion,
                    ..starlink_elements(0.0, 0.0)
                };
                let (line1, line2) = tle::format_lines(90_000, &elements);
                prop_assert_eq!(line1.len(), 69);
                prop_assert_eq!(line2.len(), 69);
                let check = line2[68..].parse::<u32>().unwrap();
                prop_assert_eq!(check, tle::checksum_digit(&line2[..68]));
            }

            #[test]
            fn walker_anomalies_stay_in_range(
                planes in 1u32..100,
                sats in 1u32..100,
                phase_diff in any::<bool>(),
            ) {
                let walker = walker::WalkerDelta { planes, sats_per_plane: sats, phase_diff };
                for plane in [0, planes / 2, planes - 1] {
                    prop_assert!(walker.raan_deg(plane) < 360.0);
                    for slot in [0, sats - 1] {
                        let ma = walker.mean_anomaly_deg(plane, slot);
                        prop_assert!((0.0..360.0).contains(&ma));
                    }
                }
            }
        }
    }
}
