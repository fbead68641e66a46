//! Sensor kinds and their static metadata.
//!
//! The set of kinds is closed. Each kind carries a `SensorSpec` with inclusive
//! bounds, a display precision and a unit suffix; a `SpecTable` holds one spec
//! per kind and is fixed once a decoder is built.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Water-quality quantities reported by the probe firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorKind {
    Ph,
    Temperature,
    Turbidity,
    Tds,
}

impl SensorKind {
    /// All kinds in canonical (export column) order.
    pub const ALL: [SensorKind; 4] = [
        SensorKind::Ph,
        SensorKind::Temperature,
        SensorKind::Turbidity,
        SensorKind::Tds,
    ];

    /// Lowercase identifier, as used in JSON and configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            SensorKind::Ph => "ph",
            SensorKind::Temperature => "temperature",
            SensorKind::Turbidity => "turbidity",
            SensorKind::Tds => "tds",
        }
    }

    /// Column label used in CSV exports.
    pub fn label(self) -> &'static str {
        match self {
            SensorKind::Ph => "pH",
            SensorKind::Temperature => "Temperature",
            SensorKind::Turbidity => "Turbidity",
            SensorKind::Tds => "TDS",
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            SensorKind::Ph => 0,
            SensorKind::Temperature => 1,
            SensorKind::Turbidity => 2,
            SensorKind::Tds => 3,
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static metadata for one sensor kind.
///
/// # Examples
/// ```
/// use aqualink_core::{SensorKind, SpecTable};
///
/// let specs = SpecTable::default();
/// let spec = specs.get(SensorKind::Ph);
/// assert!(spec.contains(6.5));
/// assert_eq!(spec.round(7.26), 7.3);
/// assert_eq!(spec.format(7.0), "7.0");
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSpec {
    /// Inclusive lower bound.
    pub min: f64,
    /// Inclusive upper bound.
    pub max: f64,
    /// Number of decimal digits kept after rounding.
    pub precision: u32,
    /// Display suffix (may be empty).
    pub unit: &'static str,
}

impl SensorSpec {
    pub const fn new(min: f64, max: f64, precision: u32, unit: &'static str) -> Self {
        Self {
            min,
            max,
            precision,
            unit,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Round half away from zero to `precision` decimal digits.
    pub fn round(&self, value: f64) -> f64 {
        let factor = 10f64.powi(self.precision as i32);
        (value * factor).round() / factor
    }

    /// Fixed-point rendering with `precision` digits, without the unit.
    pub fn format(&self, value: f64) -> String {
        format!("{:.*}", self.precision as usize, value)
    }

    /// Fixed-point rendering followed by the unit suffix.
    pub fn display(&self, value: f64) -> String {
        format!("{}{}", self.format(value), self.unit)
    }

    /// Gauge level of `value` as a fraction of the upper bound.
    ///
    /// # Examples
    /// ```
    /// use aqualink_core::{SensorKind, SensorStatus, SpecTable};
    ///
    /// let specs = SpecTable::default();
    /// let tds = specs.get(SensorKind::Tds);
    /// assert_eq!(tds.status(180.0), SensorStatus::Good);
    /// assert_eq!(tds.status(200.0), SensorStatus::Warning);
    /// assert_eq!(tds.status(400.0), SensorStatus::Danger);
    /// ```
    pub fn status(&self, value: f64) -> SensorStatus {
        if self.max <= 0.0 {
            return SensorStatus::Danger;
        }
        let ratio = value / self.max;
        if ratio < STATUS_WARNING_RATIO {
            SensorStatus::Good
        } else if ratio < STATUS_DANGER_RATIO {
            SensorStatus::Warning
        } else {
            SensorStatus::Danger
        }
    }
}

const STATUS_WARNING_RATIO: f64 = 0.4;
const STATUS_DANGER_RATIO: f64 = 0.8;

/// Coarse level shown next to a value on a gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorStatus {
    Good,
    Warning,
    Danger,
}

/// Default metadata, matching the ranges shown on the probe dashboard.
pub const DEFAULT_SPECS: [SensorSpec; 4] = [
    SensorSpec::new(6.5, 8.5, 1, ""),
    SensorSpec::new(20.0, 30.0, 1, "°C"),
    SensorSpec::new(0.0, 10.0, 1, " NTU"),
    SensorSpec::new(0.0, 500.0, 0, " ppm"),
];

/// One `SensorSpec` per kind.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecTable {
    specs: [SensorSpec; 4],
}

impl Default for SpecTable {
    fn default() -> Self {
        Self {
            specs: DEFAULT_SPECS,
        }
    }
}

impl SpecTable {
    pub fn get(&self, kind: SensorKind) -> &SensorSpec {
        &self.specs[kind.index()]
    }

    pub(crate) fn set(&mut self, kind: SensorKind, spec: SensorSpec) {
        self.specs[kind.index()] = spec;
    }

    pub fn iter(&self) -> impl Iterator<Item = (SensorKind, &SensorSpec)> {
        SensorKind::ALL.into_iter().map(|kind| (kind, self.get(kind)))
    }
}
