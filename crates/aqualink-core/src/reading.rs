//! Reading snapshot accumulated from decoded frames.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::sensor::{SensorKind, SensorStatus, SpecTable};

/// Source of update timestamps.
pub trait Clock {
    fn now(&self) -> OffsetDateTime;
}

/// Wall clock (UTC).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Clock frozen at a single instant, for deterministic replays.
///
/// # Examples
/// ```
/// use aqualink_core::{Clock, FixedClock};
///
/// let clock = FixedClock::epoch();
/// assert_eq!(clock.now().unix_timestamp(), 0);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub OffsetDateTime);

impl FixedClock {
    pub fn epoch() -> Self {
        Self(OffsetDateTime::UNIX_EPOCH)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> OffsetDateTime {
        self.0
    }
}

/// Latest known value per sensor kind.
///
/// The snapshot is sparse: kinds appear as frames report them. `updated_at`
/// never moves backwards, and `revision` counts frames that changed at least
/// one value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorReading {
    values: BTreeMap<SensorKind, f64>,
    updated_at: Option<OffsetDateTime>,
    revision: u64,
}

impl SensorReading {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: SensorKind) -> Option<f64> {
        self.values.get(&kind).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SensorKind, f64)> + '_ {
        self.values.iter().map(|(kind, value)| (*kind, *value))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn updated_at(&self) -> Option<OffsetDateTime> {
        self.updated_at
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub(crate) fn set(&mut self, kind: SensorKind, value: f64, now: OffsetDateTime) {
        self.values.insert(kind, value);
        self.updated_at = Some(match self.updated_at {
            Some(previous) if previous > now => previous,
            _ => now,
        });
    }

    pub(crate) fn bump_revision(&mut self) {
        self.revision += 1;
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    /// Serializable view of the current values.
    ///
    /// # Examples
    /// ```
    /// use aqualink_core::{FixedClock, StreamDecoder, DecoderConfig};
    ///
    /// let mut decoder = StreamDecoder::with_clock(DecoderConfig::default(), FixedClock::epoch())?;
    /// decoder.feed("7.2,24.5,3.1\n");
    /// let snapshot = decoder.reading().snapshot();
    /// assert_eq!(snapshot.ph, Some(7.2));
    /// assert_eq!(snapshot.tds, None);
    /// assert_eq!(snapshot.timestamp.as_deref(), Some("1970-01-01T00:00:00Z"));
    /// # Ok::<(), aqualink_core::ConfigError>(())
    /// ```
    pub fn snapshot(&self) -> ReadingSnapshot {
        ReadingSnapshot {
            timestamp: self.updated_at.and_then(format_timestamp),
            ph: self.get(SensorKind::Ph),
            temperature: self.get(SensorKind::Temperature),
            turbidity: self.get(SensorKind::Turbidity),
            tds: self.get(SensorKind::Tds),
        }
    }
}

impl SensorReading {
    /// Rendered value and gauge status for every known kind.
    pub fn display(&self, specs: &SpecTable) -> BTreeMap<SensorKind, SensorDisplay> {
        self.iter()
            .map(|(kind, value)| {
                let spec = specs.get(kind);
                let display = SensorDisplay {
                    text: spec.display(value),
                    status: spec.status(value),
                };
                (kind, display)
            })
            .collect()
    }
}

/// One value as a dashboard would show it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorDisplay {
    /// Value with the kind's precision and unit, e.g. `"24.3°C"`.
    pub text: String,
    pub status: SensorStatus,
}

/// Flat, export-friendly view of a `SensorReading`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadingSnapshot {
    /// RFC3339 time of the last update, when any value is known.
    pub timestamp: Option<String>,
    pub ph: Option<f64>,
    pub temperature: Option<f64>,
    pub turbidity: Option<f64>,
    pub tds: Option<f64>,
}

impl ReadingSnapshot {
    pub fn get(&self, kind: SensorKind) -> Option<f64> {
        match kind {
            SensorKind::Ph => self.ph,
            SensorKind::Temperature => self.temperature,
            SensorKind::Turbidity => self.turbidity,
            SensorKind::Tds => self.tds,
        }
    }
}

pub(crate) fn format_timestamp(ts: OffsetDateTime) -> Option<String> {
    ts.format(&Rfc3339).ok()
}
