use std::path::Path;

use log::{info, warn};
use thiserror::Error;

use crate::reading::{Clock, SystemClock};
use crate::source::{ChunkSource, ReaderSource, SourceError};
use crate::stream::{ConfigError, DecoderConfig, StreamDecoder};
use crate::{DEFAULT_GENERATED_AT, SessionReport, make_stub_report};

mod failures;

use failures::FailureStore;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Replay a telemetry file through a fresh decoder.
///
/// # Errors
/// Returns `SessionError` when the file cannot be read or the configuration
/// is invalid. Decode failures never abort a session.
pub fn decode_file(
    path: &Path,
    config: &DecoderConfig,
    chunk_size: usize,
) -> Result<SessionReport, SessionError> {
    let source = ReaderSource::open(path, chunk_size)?;
    let decoder = StreamDecoder::with_clock(config.clone(), SystemClock)?;
    decode_source(path, source, decoder)
}

/// Feed every chunk of `source` into `decoder` and summarise the session.
///
/// Buffered text left at end of input is decoded as a final frame.
pub fn decode_source<S: ChunkSource, C: Clock>(
    path: &Path,
    mut source: S,
    mut decoder: StreamDecoder<C>,
) -> Result<SessionReport, SessionError> {
    let mut failures = FailureStore::new();
    let mut history = Vec::new();

    while let Some(chunk) = source.next_chunk()? {
        let update = decoder.feed(&chunk);
        failures.extend(&update.failures);
        if !update.updated.is_empty() {
            history.push(decoder.reading().snapshot());
        }
    }

    if !decoder.buffered().is_empty() {
        warn!(
            "input ended without terminator; decoding {} trailing bytes",
            decoder.buffered().len()
        );
    }
    let update = decoder.flush();
    failures.extend(&update.failures);
    if !update.updated.is_empty() {
        history.push(decoder.reading().snapshot());
    }

    let stats = decoder.stats().clone();
    info!(
        "{}: {} frames ({} rejected), {} values applied, {} failures",
        path.display(),
        stats.frames_total,
        stats.frames_rejected,
        stats.fields_applied,
        failures.total()
    );

    let mut report = make_stub_report(&path.display().to_string(), source.bytes_read());
    report.decoder = decoder.config().clone();
    report.stream_summary = stats;
    report.reading = decoder.reading().snapshot();
    report.generated_at = report
        .reading
        .timestamp
        .clone()
        .unwrap_or_else(|| DEFAULT_GENERATED_AT.to_string());
    report.failures = failures.into_summaries();
    report.history = history;
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::decode_source;
    use crate::reading::FixedClock;
    use crate::source::ReaderSource;
    use crate::stream::{DecoderConfig, StreamDecoder};
    use crate::{DEFAULT_GENERATED_AT, Dialect};
    use std::io::Cursor;
    use std::path::Path;

    fn run(input: &str, config: DecoderConfig, chunk_size: usize) -> crate::SessionReport {
        let source = ReaderSource::new(Cursor::new(input.as_bytes().to_vec()), chunk_size).unwrap();
        let decoder = StreamDecoder::with_clock(config, FixedClock::epoch()).unwrap();
        decode_source(Path::new("memory"), source, decoder).unwrap()
    }

    #[test]
    fn summarises_counts_and_failures() {
        let report = run(
            "PH:7.2,TEMP:24.1\nturb:3.46,tds:180.4\nPH:7.0,GARBAGE\nTDS:600\n",
            DecoderConfig::new(Dialect::KeyValue),
            7,
        );
        assert_eq!(report.input.bytes, 60);
        assert_eq!(report.stream_summary.chunks_total, 9);
        assert_eq!(report.stream_summary.frames_total, 4);
        assert_eq!(report.stream_summary.fields_applied, 5);
        assert_eq!(report.reading.turbidity, Some(3.5));
        assert_eq!(report.reading.tds, Some(180.0));
        assert_eq!(report.history.len(), 3);
        let ids: Vec<_> = report.failures.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["AQ-MALFORMED-PAIR", "AQ-OUT-OF-RANGE"]);
        assert_eq!(report.generated_at, DEFAULT_GENERATED_AT);
    }

    #[test]
    fn trailing_frame_without_terminator_is_decoded() {
        let report = run("7.2,24.5,3.1\n7.0,25.0,2.0", DecoderConfig::default(), 64);
        assert_eq!(report.reading.ph, Some(7.0));
        assert_eq!(report.stream_summary.frames_total, 2);
        assert_eq!(report.history.len(), 2);
    }

    #[test]
    fn empty_input_yields_empty_reading() {
        let report = run("", DecoderConfig::default(), 16);
        assert_eq!(report.stream_summary.chunks_total, 0);
        assert!(report.reading.timestamp.is_none());
        assert!(report.failures.is_empty());
        assert!(report.history.is_empty());
    }
}
