use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};

use crate::assembler::{ReadingAssembler, UpdateSet};
use crate::protocol::DecodeError;
use crate::reading::{Clock, SensorReading, SystemClock};
use crate::sensor::SpecTable;

use super::config::{ConfigError, DecoderConfig};
use super::framer::FrameBuffer;

/// Lifecycle of a `StreamDecoder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Nothing buffered.
    Idle,
    /// A partial frame is waiting for its terminator.
    Buffering,
    /// A complete frame is being decoded.
    Decoding,
    /// `close()` was called; feeds are ignored until `reset()`.
    Closed,
}

/// Counters accumulated since construction or the last `reset()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStats {
    /// Chunks fed.
    pub chunks_total: u64,
    /// Non-empty frames seen, overlong ones included.
    pub frames_total: u64,
    /// Frames dropped as a whole (incomplete or overlong); counted in `frames_total` too.
    pub frames_rejected: u64,
    /// Values written into the reading.
    pub fields_applied: u64,
    /// Fields or pairs skipped (parse, key or range failures).
    pub fields_rejected: u64,
}

/// Stateful decoder owning one buffer and one reading snapshot.
///
/// # Examples
/// ```
/// use aqualink_core::{DecoderConfig, Dialect, SensorKind, StreamDecoder};
///
/// let mut decoder = StreamDecoder::new(DecoderConfig::new(Dialect::KeyValue))?;
/// assert!(decoder.feed("PH:7.").updated.is_empty());
/// let update = decoder.feed("2,TEMP:24\n");
/// assert!(update.updated.contains(&SensorKind::Ph));
/// assert_eq!(decoder.reading().get(SensorKind::Ph), Some(7.2));
/// # Ok::<(), aqualink_core::ConfigError>(())
/// ```
#[derive(Debug)]
pub struct StreamDecoder<C = SystemClock> {
    config: DecoderConfig,
    framer: FrameBuffer,
    assembler: ReadingAssembler,
    reading: SensorReading,
    clock: C,
    state: StreamState,
    stats: StreamStats,
}

impl StreamDecoder<SystemClock> {
    /// Build a decoder stamping updates with the wall clock.
    ///
    /// # Errors
    /// Returns `ConfigError` when the configuration does not validate.
    pub fn new(config: DecoderConfig) -> Result<Self, ConfigError> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> StreamDecoder<C> {
    /// Build a decoder stamping updates with `clock`.
    ///
    /// # Errors
    /// Returns `ConfigError` when the configuration does not validate.
    pub fn with_clock(config: DecoderConfig, clock: C) -> Result<Self, ConfigError> {
        config.validate()?;
        let specs = config.spec_table()?;
        Ok(Self {
            framer: FrameBuffer::new(config.terminator.clone(), config.max_frame_len),
            assembler: ReadingAssembler::new(specs),
            reading: SensorReading::new(),
            clock,
            state: StreamState::Idle,
            stats: StreamStats::default(),
            config,
        })
    }

    /// Buffer `chunk`, decode every frame it completes and apply the values.
    ///
    /// A trailing partial frame stays buffered for the next call. Failures
    /// are returned alongside the updated kinds and never stop the stream.
    pub fn feed(&mut self, chunk: &str) -> UpdateSet {
        if self.state == StreamState::Closed {
            warn!("ignoring {} bytes fed to a closed decoder", chunk.len());
            return UpdateSet::default();
        }
        trace!("chunk {:?}", chunk);
        self.stats.chunks_total += 1;

        let extracted = self.framer.push(chunk);
        let mut update = UpdateSet::default();
        for frame in extracted.frames {
            self.state = StreamState::Decoding;
            update.merge(self.take_frame(frame));
        }

        self.state = if self.framer.is_empty() {
            StreamState::Idle
        } else {
            StreamState::Buffering
        };
        update
    }

    fn take_frame(&mut self, frame: Result<String, DecodeError>) -> UpdateSet {
        match frame {
            Ok(frame) => self.decode_frame(&frame),
            Err(err) => {
                warn!("{err}");
                self.stats.frames_total += 1;
                self.stats.frames_rejected += 1;
                UpdateSet {
                    frames: 1,
                    failures: vec![err],
                    ..UpdateSet::default()
                }
            }
        }
    }

    fn decode_frame(&mut self, frame: &str) -> UpdateSet {
        let frame = frame.trim();
        if frame.is_empty() {
            trace!("skipping empty frame");
            return UpdateSet::default();
        }
        self.stats.frames_total += 1;

        let decoded = match self.config.dialect.decode(frame) {
            Ok(decoded) => decoded,
            Err(err) => {
                debug!("frame rejected: {err}");
                self.stats.frames_rejected += 1;
                return UpdateSet {
                    frames: 1,
                    failures: vec![err],
                    ..UpdateSet::default()
                };
            }
        };
        for err in &decoded.failures {
            debug!("field skipped: {err}");
        }

        let applied = self
            .assembler
            .apply(&mut self.reading, &decoded.fields, self.clock.now());
        for err in &applied.failures {
            debug!("value rejected: {err}");
        }
        let rejected = applied.failures.len();
        self.stats.fields_applied += (decoded.fields.len() - rejected) as u64;
        self.stats.fields_rejected += (decoded.failures.len() + rejected) as u64;
        debug!(
            "frame {:?} -> updated {:?} (revision {})",
            frame,
            applied.updated,
            self.reading.revision()
        );

        let mut failures = decoded.failures;
        failures.extend(applied.failures);
        UpdateSet {
            updated: applied.updated,
            failures,
            frames: 1,
        }
    }

    /// Decode whatever is still buffered as a final frame.
    ///
    /// Used at end of input, when the last line may lack its terminator.
    pub fn flush(&mut self) -> UpdateSet {
        if self.state == StreamState::Closed {
            return UpdateSet::default();
        }
        let Some(remainder) = self.framer.finish() else {
            self.state = StreamState::Idle;
            return UpdateSet::default();
        };
        self.state = StreamState::Decoding;
        let update = self.take_frame(remainder);
        self.state = StreamState::Idle;
        update
    }

    /// Drop buffered text, the reading and the counters; reopens a closed decoder.
    pub fn reset(&mut self) {
        debug!("decoder reset");
        self.framer.clear();
        self.reading.clear();
        self.stats = StreamStats::default();
        self.state = StreamState::Idle;
    }

    /// Stop accepting chunks and hand back the final reading.
    pub fn close(&mut self) -> SensorReading {
        if !self.framer.is_empty() {
            debug!(
                "closing with {} unterminated bytes",
                self.framer.pending().len()
            );
        }
        self.framer.clear();
        self.state = StreamState::Closed;
        std::mem::take(&mut self.reading)
    }

    pub fn reading(&self) -> &SensorReading {
        &self.reading
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn specs(&self) -> &SpecTable {
        self.assembler.specs()
    }

    /// Unterminated text waiting for the next chunk.
    pub fn buffered(&self) -> &str {
        self.framer.pending()
    }
}
