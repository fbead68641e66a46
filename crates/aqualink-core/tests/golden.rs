use std::fs;
use std::path::{Path, PathBuf};

use aqualink_core::{
    DecoderConfig, FixedClock, ReaderSource, SessionReport, StreamDecoder, decode_source,
};

const GOLDEN_CHUNK_SIZE: usize = 16;

fn repo_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("..").join("..")
}

fn load_expected_report(dir: &str) -> SessionReport {
    let expected_path = repo_root().join(dir).join("expected_report.json");
    let expected_json = fs::read_to_string(&expected_path).expect("read expected_report.json");
    serde_json::from_str(&expected_json).expect("parse expected report")
}

fn decode_case(dir: &str, chunk_size: usize) -> SessionReport {
    let case = repo_root().join(dir);
    let config = DecoderConfig::load(&case.join("config.json")).expect("load config.json");
    let input = case.join("input.txt");
    let source = ReaderSource::open(&input, chunk_size).expect("open input.txt");
    let decoder = StreamDecoder::with_clock(config, FixedClock::epoch()).expect("build decoder");
    decode_source(&input, source, decoder).expect("decode input")
}

fn run_golden(dir: &str) {
    let expected = load_expected_report(dir);

    let mut actual = decode_case(dir, GOLDEN_CHUNK_SIZE);
    actual.generated_at = expected.generated_at.clone();
    actual.input.path = expected.input.path.clone();

    let actual_value = serde_json::to_value(actual).expect("serialize actual");
    let expected_value = serde_json::to_value(expected).expect("serialize expected");

    assert_eq!(actual_value, expected_value, "golden mismatch in {dir}");
}

#[test]
fn golden_csv() {
    run_golden("tests/golden/csv");
}

#[test]
fn golden_keyvalue() {
    run_golden("tests/golden/keyvalue");
}

#[test]
fn golden_csv_is_independent_of_chunk_size() {
    let reference = decode_case("tests/golden/csv", GOLDEN_CHUNK_SIZE);
    for chunk_size in [1, 3, 64, 4096] {
        let report = decode_case("tests/golden/csv", chunk_size);
        assert_eq!(report.reading, reference.reading, "chunk size {chunk_size}");
        assert_eq!(
            report.stream_summary.fields_applied,
            reference.stream_summary.fields_applied
        );
        assert_eq!(report.failures.len(), reference.failures.len());
    }
}

#[test]
fn golden_keyvalue_has_one_failure_per_kind() {
    let report = load_expected_report("tests/golden/keyvalue");
    assert!(report.failures.iter().all(|failure| failure.count == 1));
    assert_eq!(report.stream_summary.frames_rejected, 0);
    assert_eq!(report.reading.tds, Some(180.0));
}
