//! Merges decoded values into a reading snapshot.
//!
//! Range checks and rounding happen here rather than in the parser so that a
//! frame can be decoded once and validated against whichever `SpecTable` the
//! owning decoder was configured with.

use std::collections::BTreeSet;

use time::OffsetDateTime;

use crate::protocol::DecodeError;
use crate::reading::SensorReading;
use crate::sensor::{SensorKind, SpecTable};

/// What a `feed` (or a single `apply`) changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSet {
    /// Kinds written at least once, in canonical order.
    pub updated: BTreeSet<SensorKind>,
    /// Decode and range failures, in the order they occurred.
    pub failures: Vec<DecodeError>,
    /// Number of non-empty frames processed.
    pub frames: usize,
}

impl UpdateSet {
    /// True when nothing was updated and nothing failed.
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.failures.is_empty()
    }

    pub fn merge(&mut self, other: UpdateSet) {
        self.updated.extend(other.updated);
        self.failures.extend(other.failures);
        self.frames += other.frames;
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReadingAssembler {
    specs: SpecTable,
}

impl ReadingAssembler {
    pub fn new(specs: SpecTable) -> Self {
        Self { specs }
    }

    pub fn specs(&self) -> &SpecTable {
        &self.specs
    }

    /// Write in-range values into `reading`, rounded to each kind's precision.
    ///
    /// Values outside the bounds, before or after rounding, leave the reading
    /// untouched for their kind and are reported as `DecodeError::OutOfRange`. The revision is bumped once when
    /// anything was written.
    ///
    /// # Examples
    /// ```
    /// use aqualink_core::{ReadingAssembler, SensorKind, SensorReading};
    /// use time::OffsetDateTime;
    ///
    /// let assembler = ReadingAssembler::default();
    /// let mut reading = SensorReading::new();
    /// let update = assembler.apply(
    ///     &mut reading,
    ///     &[(SensorKind::Ph, 7.26), (SensorKind::Tds, 900.0)],
    ///     OffsetDateTime::UNIX_EPOCH,
    /// );
    /// assert_eq!(reading.get(SensorKind::Ph), Some(7.3));
    /// assert_eq!(reading.get(SensorKind::Tds), None);
    /// assert_eq!(update.failures.len(), 1);
    /// ```
    pub fn apply(
        &self,
        reading: &mut SensorReading,
        decoded: &[(SensorKind, f64)],
        now: OffsetDateTime,
    ) -> UpdateSet {
        let mut update = UpdateSet::default();
        for &(kind, value) in decoded {
            let spec = self.specs.get(kind);
            let rounded = spec.round(value);
            // Rounding can carry an in-range value past a bound.
            if !spec.contains(value) || !spec.contains(rounded) {
                update.failures.push(DecodeError::OutOfRange {
                    kind,
                    value,
                    min: spec.min,
                    max: spec.max,
                });
                continue;
            }
            reading.set(kind, rounded, now);
            update.updated.insert(kind);
        }
        if !update.updated.is_empty() {
            reading.bump_revision();
        }
        update
    }
}
