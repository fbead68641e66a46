use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use aqualink_core::{DecoderConfig, FixedClock, ReaderSource, StreamDecoder, decode_source};

/// Small chunks so fixtures exercise frames split across feeds.
const GOLDEN_CHUNK_SIZE: usize = 16;

fn main() -> ExitCode {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run() -> Result<(), String> {
    let root = PathBuf::from("tests").join("golden");
    let entries =
        fs::read_dir(&root).map_err(|err| format!("failed to read {}: {}", root.display(), err))?;

    for entry in entries {
        let entry = entry.map_err(|err| format!("failed to read entry: {}", err))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let input = path.join("input.txt");
        if !input.exists() {
            continue;
        }
        regenerate_one(&path, &input)?;
    }

    Ok(())
}

fn regenerate_one(dir: &Path, input: &Path) -> Result<(), String> {
    let config_path = dir.join("config.json");
    let config = if config_path.exists() {
        DecoderConfig::load(&config_path)
            .map_err(|err| format!("invalid config {}: {}", config_path.display(), err))?
    } else {
        DecoderConfig::default()
    };

    let source = ReaderSource::open(input, GOLDEN_CHUNK_SIZE)
        .map_err(|err| format!("failed to open {}: {}", input.display(), err))?;
    let decoder = StreamDecoder::with_clock(config, FixedClock::epoch())
        .map_err(|err| format!("invalid config {}: {}", config_path.display(), err))?;
    let report = decode_source(input, source, decoder)
        .map_err(|err| format!("decode failed for {}: {}", input.display(), err))?;

    let output = dir.join("expected_report.json");
    let json = serde_json::to_string_pretty(&report)
        .map_err(|err| format!("JSON serialization failed: {}", err))?;
    fs::write(&output, json + "\n")
        .map_err(|err| format!("failed to write {}: {}", output.display(), err))?;
    Ok(())
}
