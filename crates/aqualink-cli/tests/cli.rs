use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("aqualink"))
}

fn repo_root() -> std::path::PathBuf {
    let manifest = std::path::Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest
        .parent()
        .and_then(|p| p.parent())
        .expect("repo root")
        .to_path_buf()
}

fn sample_log(case: &str) -> std::path::PathBuf {
    repo_root()
        .join("tests")
        .join("golden")
        .join(case)
        .join("input.txt")
}

fn stdout_json(assert: &assert_cmd::assert::Assert) -> Value {
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    serde_json::from_str(&stdout).expect("valid json")
}

#[test]
fn help_lists_stream_subcommands() {
    for sub in ["decode", "export", "watch", "simulate"] {
        cmd().arg("stream").arg(sub).arg("--help").assert().success();
    }
}

#[test]
fn missing_input_shows_error_and_hint() {
    let temp = TempDir::new().expect("tempdir");
    let missing = temp.path().join("missing.log");
    let report = temp.path().join("report.json");

    cmd()
        .arg("stream")
        .arg("decode")
        .arg(missing)
        .arg("-o")
        .arg(report)
        .assert()
        .failure()
        .code(2)
        .stderr(contains("error:").and(contains("hint:")));
}

#[test]
fn stdout_outputs_report_json() {
    let assert = cmd()
        .arg("stream")
        .arg("decode")
        .arg(sample_log("csv"))
        .arg("--stdout")
        .assert()
        .success();
    let report = stdout_json(&assert);
    assert_eq!(report["report_version"], 1);
    assert_eq!(report["tool"]["name"], "aqualink");
    assert_eq!(report["stream_summary"]["frames_total"], 4);
    assert_eq!(report["reading"]["ph"], 6.9);
    assert!(report["reading"]["tds"].is_null());
}

#[test]
fn stdout_and_report_conflict() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("report.json");

    cmd()
        .arg("stream")
        .arg("decode")
        .arg(sample_log("csv"))
        .arg("--stdout")
        .arg("-o")
        .arg(report)
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn pretty_and_compact_conflict() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("report.json");

    cmd()
        .arg("stream")
        .arg("decode")
        .arg(sample_log("csv"))
        .arg("-o")
        .arg(report)
        .arg("--pretty")
        .arg("--compact")
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn report_is_written_and_quiet_suppresses_ok_message() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("out").join("report.json");

    cmd()
        .arg("stream")
        .arg("decode")
        .arg(sample_log("keyvalue"))
        .arg("--dialect")
        .arg("keyvalue")
        .arg("-o")
        .arg(&report)
        .arg("--quiet")
        .assert()
        .success()
        .stderr(contains("OK:").not());

    let json = std::fs::read_to_string(&report).expect("report written");
    let value: Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(value["decoder"]["dialect"], "keyvalue");
    assert_eq!(value["reading"]["tds"], 180.0);
}

#[test]
fn list_failures_outputs_ids() {
    let temp = TempDir::new().expect("tempdir");
    let report = temp.path().join("report.json");

    cmd()
        .arg("stream")
        .arg("decode")
        .arg(sample_log("csv"))
        .arg("-o")
        .arg(report)
        .arg("--list-failures")
        .assert()
        .success()
        .stderr(contains("Decode failures:").and(contains("AQ-OUT-OF-RANGE (1)")));
}

#[test]
fn strict_fails_when_failures_present() {
    cmd()
        .arg("stream")
        .arg("decode")
        .arg(sample_log("csv"))
        .arg("--stdout")
        .arg("--strict")
        .assert()
        .failure()
        .stderr(contains("decode failures detected"));
}

#[test]
fn strict_passes_on_clean_stdin() {
    cmd()
        .arg("stream")
        .arg("decode")
        .arg("-")
        .arg("--dialect")
        .arg("kv")
        .arg("--stdout")
        .arg("--strict")
        .write_stdin("PH:7.2\nTEMP:24.5\n")
        .assert()
        .success();
}

#[test]
fn config_file_overrides_limits() {
    let temp = TempDir::new().expect("tempdir");
    let config = temp.path().join("config.json");
    std::fs::write(&config, r#"{"limits": {"ph": {"min": 0, "max": 14}}}"#).expect("write config");

    let assert = cmd()
        .arg("stream")
        .arg("decode")
        .arg(sample_log("csv"))
        .arg("--config")
        .arg(&config)
        .arg("--stdout")
        .assert()
        .success();
    let report = stdout_json(&assert);
    assert_eq!(report["reading"]["ph"], 9.4);
    assert_eq!(report["decoder"]["limits"]["ph"]["max"], 14.0);
}

#[test]
fn invalid_terminator_escape_is_rejected() {
    cmd()
        .arg("stream")
        .arg("decode")
        .arg(sample_log("csv"))
        .arg("--stdout")
        .arg("--terminator")
        .arg("\\x")
        .assert()
        .failure()
        .code(2)
        .stderr(contains("invalid decoder configuration").and(contains("hint:")));
}

#[test]
fn unknown_dialect_is_a_usage_error() {
    cmd()
        .arg("stream")
        .arg("decode")
        .arg(sample_log("csv"))
        .arg("--stdout")
        .arg("--dialect")
        .arg("xml")
        .assert()
        .failure()
        .stderr(contains("unknown dialect"));
}

#[test]
fn export_history_writes_one_row_per_update() {
    let assert = cmd()
        .arg("stream")
        .arg("export")
        .arg(sample_log("csv"))
        .arg("--history")
        .arg("--chunk-size")
        .arg("16")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let lines: Vec<_> = stdout.lines().collect();
    assert_eq!(lines[0], "Timestamp,pH,Temperature,Turbidity,TDS");
    assert_eq!(lines.len(), 4);
    assert!(lines[3].ends_with(",6.9,22.0,4.0,"));
}

#[test]
fn export_json_to_file() {
    let temp = TempDir::new().expect("tempdir");
    let output = temp.path().join("readings.json");

    cmd()
        .arg("stream")
        .arg("export")
        .arg(sample_log("csv"))
        .arg("--format")
        .arg("json")
        .arg("-o")
        .arg(&output)
        .assert()
        .success()
        .stderr(contains("OK: 1 rows exported as json"));

    let json = std::fs::read_to_string(&output).expect("export written");
    let rows: Value = serde_json::from_str(&json).expect("valid json");
    assert_eq!(rows.as_array().map(Vec::len), Some(1));
    assert_eq!(rows[0]["temperature"], 22.0);
}

#[test]
fn export_refuses_to_overwrite_input() {
    let temp = TempDir::new().expect("tempdir");
    let input = temp.path().join("probe.log");
    std::fs::write(&input, "7.2,24.5,3.1\n").expect("write input");

    cmd()
        .arg("stream")
        .arg("export")
        .arg(&input)
        .arg("-o")
        .arg(&input)
        .assert()
        .failure()
        .stderr(contains("must differ from input"));
}

#[test]
fn glob_input_resolves_single_match() {
    let temp = TempDir::new().expect("tempdir");
    std::fs::write(temp.path().join("probe.log"), "7.2,24.5,3.1\n").expect("write input");
    let pattern = temp.path().join("*.log");

    let assert = cmd()
        .arg("stream")
        .arg("decode")
        .arg(pattern)
        .arg("--stdout")
        .assert()
        .success();
    assert_eq!(stdout_json(&assert)["reading"]["turbidity"], 3.1);
}

#[test]
fn glob_input_rejects_multiple_matches() {
    let temp = TempDir::new().expect("tempdir");
    std::fs::write(temp.path().join("a.log"), "7.2,24.5,3.1\n").expect("write input");
    std::fs::write(temp.path().join("b.log"), "7.0,25.0,2.0\n").expect("write input");

    cmd()
        .arg("stream")
        .arg("decode")
        .arg(temp.path().join("*.log"))
        .arg("--stdout")
        .assert()
        .failure()
        .stderr(contains("multiple files match pattern").and(contains("hint:")));
}

#[test]
fn watch_prints_one_line_per_update() {
    let assert = cmd()
        .arg("stream")
        .arg("watch")
        .arg("-")
        .arg("--dialect")
        .arg("keyvalue")
        .arg("--chunk-size")
        .arg("8")
        .write_stdin("PH:7.2\n\nTEMP:x,TDS:150\n")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let events: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect();

    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["updated"], serde_json::json!(["ph"]));
    assert_eq!(events[0]["reading"]["ph"], 7.2);
    assert_eq!(events[1]["updated"], serde_json::json!(["tds"]));
    assert_eq!(events[1]["reading"]["tds"], 150.0);
    assert_eq!(events[1]["sensors"]["ph"]["text"], "7.2");
    assert_eq!(events[1]["sensors"]["tds"]["text"], "150 ppm");
    assert_eq!(events[1]["sensors"]["tds"]["status"], "good");
    assert!(events[1]["sensors"].get("temperature").is_none());
    assert!(
        events[1]["failures"][0]
            .as_str()
            .is_some_and(|failure| failure.starts_with("AQ-NOT-A-NUMBER"))
    );
}

fn json_lines(assert: &assert_cmd::assert::Assert) -> Vec<Value> {
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("json line"))
        .collect()
}

#[test]
fn simulate_emits_requested_frame_count() {
    let assert = cmd()
        .arg("stream")
        .arg("simulate")
        .arg("--count")
        .arg("3")
        .arg("--interval-ms")
        .arg("0")
        .arg("--seed")
        .arg("1")
        .arg("--dialect")
        .arg("keyvalue")
        .assert()
        .success();
    let events = json_lines(&assert);

    assert_eq!(events.len(), 3);
    for event in &events {
        assert_eq!(
            event["updated"],
            serde_json::json!(["ph", "temperature", "turbidity", "tds"])
        );
        assert!(event.get("failures").is_none());
        assert!(
            event["sensors"]["temperature"]["text"]
                .as_str()
                .is_some_and(|text| text.ends_with("°C"))
        );
    }
}

#[test]
fn simulate_is_reproducible_with_seed() {
    let run = || {
        let assert = cmd()
            .arg("stream")
            .arg("simulate")
            .arg("--count")
            .arg("4")
            .arg("--interval-ms")
            .arg("0")
            .arg("--seed")
            .arg("99")
            .assert()
            .success();
        json_lines(&assert)
            .into_iter()
            .map(|event| event["reading"].clone())
            .collect::<Vec<_>>()
    };
    let first = run();
    assert_eq!(first.len(), 4);
    assert!(first[0]["tds"].is_null());
    assert_eq!(first, run());
}

#[test]
fn simulate_rejects_invalid_limits() {
    let temp = TempDir::new().expect("tempdir");
    let config = temp.path().join("config.json");
    std::fs::write(&config, r#"{"limits": {"ph": {"min": 9, "max": 1}}}"#).expect("write config");

    cmd()
        .arg("stream")
        .arg("simulate")
        .arg("--count")
        .arg("1")
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .code(2)
        .stderr(contains("error:").and(contains("hint:")));
}

#[test]
fn glob_input_without_matches_is_reported() {
    let temp = TempDir::new().expect("tempdir");

    cmd()
        .arg("stream")
        .arg("decode")
        .arg(temp.path().join("*.log"))
        .arg("--stdout")
        .assert()
        .failure()
        .code(2)
        .stderr(contains("no telemetry log matches").and(contains("hint:")));
}
