//! AquaLink core library for water-quality probe telemetry.
//!
//! This crate turns the line-delimited text a probe sends over a serial or
//! Bluetooth link into validated sensor readings. Chunk sources feed a
//! stateful stream decoder, which cuts frames, decodes them per dialect
//! (layout/reader/parser) and folds in-range values into a reading snapshot.
//! Decoding is side-effect free; all I/O is isolated in `source` modules and
//! sessions summarise a replay into a deterministic report.
//!
//! Invariants:
//! - Every failure is local to a field, pair or frame; a stream never stops.
//! - Accepted values lie within their kind's inclusive bounds and are rounded
//!   to its precision.
//! - Splitting input differently across chunks never changes the result.
//!
//! # Examples
//! ```
//! use aqualink_core::{DecoderConfig, Dialect, SensorKind, StreamDecoder};
//!
//! let mut decoder = StreamDecoder::new(DecoderConfig::new(Dialect::Csv))?;
//! let update = decoder.feed("7.2,24.5,3.1\n6.9,");
//! assert_eq!(update.updated.len(), 3);
//! assert_eq!(decoder.buffered(), "6.9,");
//! assert_eq!(decoder.reading().get(SensorKind::Turbidity), Some(3.1));
//! # Ok::<(), aqualink_core::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};

mod assembler;
mod export;
mod protocol;
mod reading;
mod sensor;
mod session;
mod source;
mod stream;

pub use assembler::{ReadingAssembler, UpdateSet};
pub use export::{
    CSV_TIMESTAMP_HEADER, ExportError, ExportFormat, export, to_csv, to_json,
};
pub use protocol::{
    DecodeError, DecodeResult, DecodedFrame, Dialect, UnknownDialect, decode_frame, parse_field,
};
pub use reading::{
    Clock, FixedClock, ReadingSnapshot, SensorDisplay, SensorReading, SystemClock,
};
pub use sensor::{DEFAULT_SPECS, SensorKind, SensorSpec, SensorStatus, SpecTable};
pub use session::{SessionError, decode_file, decode_source};
pub use source::{
    ChunkSource, DEFAULT_CHUNK_SIZE, ReaderSource, SIMULATION_START, SIMULATION_STEP,
    SimulatedSource, SourceError, latin1_to_string,
};
pub use stream::{
    ConfigError, DecoderConfig, MAX_PRECISION, SpecOverride, StreamDecoder, StreamState,
    StreamStats, parse_terminator,
};

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;
/// Default timestamp used when no value was ever applied.
pub const DEFAULT_GENERATED_AT: &str = "1970-01-01T00:00:00Z";

/// Summary of one decode session.
///
/// # Examples
/// ```
/// use aqualink_core::make_stub_report;
///
/// let report = make_stub_report("probe.log", 42);
/// assert_eq!(report.report_version, aqualink_core::REPORT_VERSION);
/// assert!(report.failures.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    /// Tool identification metadata.
    pub tool: ToolInfo,
    /// RFC3339 time of the last applied update, or the epoch.
    pub generated_at: String,
    /// Input metadata.
    pub input: InputInfo,
    /// Effective decoder configuration.
    pub decoder: DecoderConfig,
    /// Chunk, frame and field counters.
    pub stream_summary: StreamStats,
    /// Final reading snapshot.
    pub reading: ReadingSnapshot,
    /// Failures grouped by id, sorted by id.
    pub failures: Vec<FailureSummary>,
    /// Snapshot after every feed that changed the reading (not serialized).
    #[serde(skip)]
    pub history: Vec<ReadingSnapshot>,
}

/// Tool metadata embedded in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name ("aqualink").
    pub name: String,
    /// Tool version (semver).
    pub version: String,
}

/// Input metadata embedded in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    /// Input path as provided to the decoder (`-` for stdin).
    pub path: String,
    /// Bytes consumed from the input.
    pub bytes: u64,
}

/// Aggregated failures sharing one id.
///
/// # Examples
/// ```
/// use aqualink_core::FailureSummary;
///
/// let failure = FailureSummary {
///     id: "AQ-UNKNOWN-KEY".to_string(),
///     message: "Key does not name a known sensor".to_string(),
///     count: 2,
///     examples: vec!["unknown key: 'DO'".to_string()],
/// };
/// assert_eq!(failure.count, 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureSummary {
    /// Stable identifier (e.g., `AQ-OUT-OF-RANGE`).
    pub id: String,
    /// Description shared by every occurrence.
    pub message: String,
    /// Number of occurrences.
    pub count: u64,
    /// At most three rendered occurrences, in input order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

/// Build a report with base fields filled and empty aggregates.
pub fn make_stub_report(input_path: &str, input_bytes: u64) -> SessionReport {
    SessionReport {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "aqualink".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        generated_at: DEFAULT_GENERATED_AT.to_string(),
        input: InputInfo {
            path: input_path.to_string(),
            bytes: input_bytes,
        },
        decoder: DecoderConfig::default(),
        stream_summary: StreamStats::default(),
        reading: ReadingSnapshot::default(),
        failures: vec![],
        history: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_serializes_null_values_and_skips_history() {
        let mut report = make_stub_report("probe.log", 1);
        report.history.push(ReadingSnapshot::default());
        report.failures.push(FailureSummary {
            id: "AQ-NOT-A-NUMBER".to_string(),
            message: "Field value is not a decimal number".to_string(),
            count: 1,
            examples: vec![],
        });

        let value = serde_json::to_value(&report).expect("report json");
        assert!(value.get("history").is_none());
        assert!(value["reading"]["ph"].is_null());
        assert!(value["failures"][0].get("examples").is_none());
        assert_eq!(value["decoder"]["dialect"], "csv");
        assert_eq!(value["stream_summary"]["frames_total"], 0);

        let parsed: SessionReport = serde_json::from_value(value).expect("report roundtrip");
        assert!(parsed.history.is_empty());
    }
}
