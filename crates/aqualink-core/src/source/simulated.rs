use log::trace;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{ChunkSource, SourceError};
use crate::protocol::Dialect;
use crate::protocol::layout::{CSV_FIELD_ORDER, FIELD_SEPARATOR, KEY_TABLE, PAIR_SEPARATOR};
use crate::sensor::{SensorKind, SpecTable};
use crate::stream::{ConfigError, DecoderConfig};

/// Values a fresh probe reports before any drift, in `SensorKind::ALL` order.
pub const SIMULATION_START: [f64; 4] = [7.2, 24.3, 4.2, 180.0];
/// Largest change applied to one value per step, in either direction.
pub const SIMULATION_STEP: f64 = 0.1;

/// Random-walk telemetry in the configured dialect, one frame per chunk.
///
/// Every value drifts by less than `SIMULATION_STEP` per frame and stays
/// within its kind's bounds. A seed makes the sequence reproducible.
///
/// # Examples
/// ```
/// use aqualink_core::{ChunkSource, DecoderConfig, Dialect, SimulatedSource};
///
/// let config = DecoderConfig::new(Dialect::KeyValue);
/// let mut source = SimulatedSource::new(&config, Some(7))?.with_limit(1);
/// let frame = source.next_chunk()?.unwrap_or_default();
/// assert!(frame.starts_with("PH:7."));
/// assert!(frame.ends_with('\n'));
/// assert!(source.next_chunk()?.is_none());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct SimulatedSource {
    rng: StdRng,
    specs: SpecTable,
    dialect: Dialect,
    terminator: String,
    values: [f64; 4],
    remaining: Option<u64>,
    bytes_read: u64,
}

impl SimulatedSource {
    /// # Errors
    /// Returns the `ConfigError` of an invalid limit override.
    pub fn new(config: &DecoderConfig, seed: Option<u64>) -> Result<Self, ConfigError> {
        let specs = config.spec_table()?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut values = SIMULATION_START;
        for (value, kind) in values.iter_mut().zip(SensorKind::ALL) {
            let spec = specs.get(kind);
            *value = value.clamp(spec.min, spec.max);
        }
        Ok(Self {
            rng,
            specs,
            dialect: config.dialect,
            terminator: config.terminator().unwrap_or_default().to_string(),
            values,
            remaining: None,
            bytes_read: 0,
        })
    }

    /// Stop after `count` frames instead of running forever.
    pub fn with_limit(mut self, count: u64) -> Self {
        self.remaining = Some(count);
        self
    }

    fn step(&mut self) {
        for (value, kind) in self.values.iter_mut().zip(SensorKind::ALL) {
            let spec = self.specs.get(kind);
            let drift = self.rng.gen_range(-SIMULATION_STEP..SIMULATION_STEP);
            *value = (*value + drift).max(0.0).clamp(spec.min, spec.max);
        }
    }

    fn value(&self, kind: SensorKind) -> String {
        self.specs.get(kind).format(self.values[kind.index()])
    }

    fn render(&self) -> String {
        let fields: Vec<String> = match self.dialect {
            Dialect::Csv => CSV_FIELD_ORDER
                .iter()
                .map(|kind| self.value(*kind))
                .collect(),
            Dialect::KeyValue => KEY_TABLE
                .iter()
                .map(|(key, kind)| format!("{key}{PAIR_SEPARATOR}{}", self.value(*kind)))
                .collect(),
        };
        let mut frame = fields.join(&FIELD_SEPARATOR.to_string());
        frame.push_str(&self.terminator);
        frame
    }
}

impl ChunkSource for SimulatedSource {
    fn next_chunk(&mut self) -> Result<Option<String>, SourceError> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Ok(None);
            }
            *remaining -= 1;
        }
        self.step();
        let frame = self.render();
        trace!("simulated {frame:?}");
        self.bytes_read += frame.len() as u64;
        Ok(Some(frame))
    }

    fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}
