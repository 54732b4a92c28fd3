//! Continuous colormaps and min/max normalization

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

/// 8-bit colour, displayed as `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Quantize unit-interval channels with `floor(255 * x)`.
    pub fn from_unit(r: f64, g: f64, b: f64) -> Self {
        let q = |x: f64| (255.0 * x.clamp(0.0, 1.0)).floor() as u8;
        Self { r: q(r), g: q(g), b: q(b) }
    }

    pub fn hex(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Maps a normalized value in [0, 1] to a colour.
pub trait Colormap {
    fn name(&self) -> &str;
    fn sample(&self, t: f64) -> Rgb;
}

/// Piecewise-linear colormap over evenly spaced anchors
#[derive(Debug, Clone, Copy)]
pub struct AnchorColormap {
    name: &'static str,
    anchors: &'static [(f64, f64, f64)],
}

impl AnchorColormap {
    /// Panics on an empty anchor table; in a `const` item that is a
    /// compile error.
    pub const fn new(name: &'static str, anchors: &'static [(f64, f64, f64)]) -> Self {
        assert!(!anchors.is_empty(), "colormap needs at least one anchor");
        Self { name, anchors }
    }
}

impl Colormap for AnchorColormap {
    fn name(&self) -> &str {
        self.name
    }

    fn sample(&self, t: f64) -> Rgb {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let last = self.anchors.len() - 1;
        let pos = t * last as f64;
        let i = (pos.floor() as usize).min(last);
        if i == last {
            let (r, g, b) = self.anchors[last];
            return Rgb::from_unit(r, g, b);
        }
        let frac = pos - i as f64;
        let (r0, g0, b0) = self.anchors[i];
        let (r1, g1, b1) = self.anchors[i + 1];
        Rgb::from_unit(
            r0 + (r1 - r0) * frac,
            g0 + (g1 - g0) * frac,
            b0 + (b1 - b0) * frac,
        )
    }
}

/// Node colouring
pub const VIRIDIS: AnchorColormap = AnchorColormap::new(
    "viridis",
    &[
        (0.267004, 0.004874, 0.329415),
        (0.282623, 0.140926, 0.457517),
        (0.253935, 0.265254, 0.529983),
        (0.206756, 0.371758, 0.553117),
        (0.163625, 0.471133, 0.558148),
        (0.127568, 0.566949, 0.550556),
        (0.134692, 0.658636, 0.517649),
        (0.266941, 0.748751, 0.440573),
        (0.477504, 0.821444, 0.318195),
        (0.741388, 0.873449, 0.149561),
        (0.993248, 0.906157, 0.143936),
    ],
);

/// Link colouring
pub const PLASMA: AnchorColormap = AnchorColormap::new(
    "plasma",
    &[
        (0.050383, 0.029803, 0.527975),
        (0.254627, 0.013882, 0.615419),
        (0.417642, 0.000564, 0.658390),
        (0.562738, 0.051545, 0.641509),
        (0.692840, 0.165141, 0.564522),
        (0.798216, 0.280197, 0.469538),
        (0.881443, 0.392529, 0.383229),
        (0.949217, 0.517763, 0.295662),
        (0.988260, 0.652325, 0.211364),
        (0.988648, 0.809579, 0.145357),
        (0.940015, 0.975158, 0.131326),
    ],
);

/// Normalize `values` linearly between their minimum and maximum and sample
/// `colormap`. A constant input maps every entry to the midpoint.
pub fn colorize<K: Ord + Copy>(
    values: &BTreeMap<K, f64>,
    colormap: &impl Colormap,
) -> BTreeMap<K, Rgb> {
    let Some((min, max)) = values.values().fold(None, |acc: Option<(f64, f64)>, &v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    }) else {
        return BTreeMap::new();
    };

    info!("{} ranges: {} - {}", colormap.name(), min, max);

    values
        .iter()
        .map(|(key, &v)| {
            let norm = if max > min { (v - min) / (max - min) } else { 0.5 };
            (*key, colormap.sample(norm))
        })
        .collect()
}
