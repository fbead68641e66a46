use std::collections::{BTreeMap, BTreeSet};
use std::env;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use aqualink_core::{
    ChunkSource, ConfigError, DEFAULT_CHUNK_SIZE, DecoderConfig, Dialect, ExportFormat,
    ReaderSource, ReadingSnapshot, SensorDisplay, SensorKind, SessionReport, SimulatedSource,
    SpecTable, StreamDecoder, UpdateSet, decode_source, export, parse_terminator, to_json,
};
use clap::{ArgAction, Args, Parser, Subcommand};
use glob::glob;
use log::{LevelFilter, info};
use serde::Serialize;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("AQUALINK_BUILD_COMMIT"),
    ")"
);
const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    "\ncommit: ",
    env!("AQUALINK_BUILD_COMMIT_FULL"),
    "\nbuilt: ",
    env!("AQUALINK_BUILD_DATE")
);

/// Input argument naming standard input.
const STDIN_INPUT: &str = "-";

const EXAMPLES: &str = "Examples:\n  aqualink stream decode probe.log -o report.json\n  aqualink stream decode - --dialect keyvalue --stdout < probe.log\n  aqualink stream export probe.log --history --format csv -o readings.csv\n  aqualink stream watch /dev/rfcomm0 --dialect keyvalue\n  aqualink stream simulate --count 10 --interval-ms 1000";

#[derive(Parser, Debug)]
#[command(name = "aqualink")]
#[command(version = VERSION, long_version = LONG_VERSION)]
#[command(
    about = "Decoder for line-delimited water-quality probe telemetry (pH, temperature, turbidity, TDS).",
    long_about = None,
    after_help = EXAMPLES
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Operations on telemetry streams (files, device nodes or stdin).
    Stream {
        #[command(subcommand)]
        command: StreamCommands,
    },
}

#[derive(Subcommand, Debug)]
enum StreamCommands {
    /// Decode a telemetry log and write a versioned JSON report.
    #[command(after_help = EXAMPLES)]
    Decode {
        /// Telemetry file, glob pattern, or - for stdin
        input: PathBuf,

        /// Output report path (JSON)
        #[arg(short = 'o', long, required_unless_present = "stdout")]
        report: Option<PathBuf>,

        /// Write JSON report to stdout
        #[arg(long, conflicts_with = "report")]
        stdout: bool,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "compact")]
        pretty: bool,

        /// Compact JSON output (default)
        #[arg(long)]
        compact: bool,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,

        /// Exit with a non-zero code if any decode failure occurred
        #[arg(long)]
        strict: bool,

        /// List failure ids and counts after decoding
        #[arg(long)]
        list_failures: bool,

        #[command(flatten)]
        decoder: DecoderArgs,
    },
    /// Decode a telemetry log and export readings as CSV or JSON.
    Export {
        /// Telemetry file, glob pattern, or - for stdin
        input: PathBuf,

        /// Export format: csv or json
        #[arg(long, default_value = "csv")]
        format: ExportFormat,

        /// Output path (defaults to stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Export one row per update instead of the final reading only
        #[arg(long)]
        history: bool,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,

        /// Suppress non-error output
        #[arg(long)]
        quiet: bool,

        #[command(flatten)]
        decoder: DecoderArgs,
    },
    /// Follow a live stream and print one JSON line per update.
    Watch {
        /// Device node, file, or - for stdin
        input: PathBuf,

        #[command(flatten)]
        decoder: DecoderArgs,
    },
    /// Generate drifting probe readings and print them like `watch`.
    Simulate {
        /// Stop after this many frames (runs until interrupted otherwise)
        #[arg(long)]
        count: Option<u64>,

        /// Delay between frames, in milliseconds
        #[arg(long, default_value_t = 5000)]
        interval_ms: u64,

        /// Seed for a reproducible sequence
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        decoder: DecoderArgs,
    },
}

#[derive(Args, Debug)]
struct DecoderArgs {
    /// Decoder configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frame dialect: csv or keyvalue
    #[arg(long)]
    dialect: Option<Dialect>,

    /// Frame terminator; \n, \r, \t and \\ escapes are resolved
    #[arg(long, conflicts_with = "no_terminator")]
    terminator: Option<String>,

    /// Treat every read chunk as one frame
    #[arg(long)]
    no_terminator: bool,

    /// Longest accepted frame, in bytes (terminator excluded)
    #[arg(long)]
    max_frame_len: Option<usize>,

    /// Bytes requested per read
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Stream { command } => match command {
            StreamCommands::Decode {
                input,
                report,
                stdout,
                pretty,
                compact,
                quiet,
                strict,
                list_failures,
                decoder,
            } => cmd_stream_decode(
                input,
                report,
                stdout,
                pretty,
                compact,
                quiet,
                strict,
                list_failures,
                decoder,
            ),
            StreamCommands::Export {
                input,
                format,
                output,
                history,
                pretty,
                quiet,
                decoder,
            } => cmd_stream_export(input, format, output, history, pretty, quiet, decoder),
            StreamCommands::Watch { input, decoder } => cmd_stream_watch(input, decoder),
            StreamCommands::Simulate {
                count,
                interval_ms,
                seed,
                decoder,
            } => cmd_stream_simulate(count, interval_ms, seed, decoder),
        },
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut builder = pretty_env_logger::formatted_builder();
    builder.filter_level(level);
    if let Ok(filters) = env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    let _ = builder.try_init();
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{:#}", err), None)
    }
}

#[allow(clippy::too_many_arguments)]
fn cmd_stream_decode(
    input: PathBuf,
    report: Option<PathBuf>,
    stdout: bool,
    pretty: bool,
    compact: bool,
    quiet: bool,
    strict: bool,
    list_failures: bool,
    decoder: DecoderArgs,
) -> Result<(), CliError> {
    let input = resolve_input(&input)?;
    let report_path = if stdout {
        None
    } else {
        let path = report.ok_or_else(|| {
            CliError::new(
                "missing output path",
                Some("use -o/--report or --stdout".to_string()),
            )
        })?;
        ensure_distinct_output(&input, &path)?;
        Some(path)
    };

    let (rep, _) = decode_input(&input, &decoder)?;
    let json = serialize_report(&rep, pretty, compact)?;

    match report_path {
        None => print!("{}", json),
        Some(path) => {
            write_output(&path, &json)?;
            if !quiet {
                eprintln!("OK: report written -> {}", path.display());
            }
        }
    }

    if list_failures && !quiet {
        print_failures(&rep);
    }
    if strict && !rep.failures.is_empty() {
        return Err(CliError::new(
            "decode failures detected",
            Some("use --list-failures to inspect".to_string()),
        ));
    }
    Ok(())
}

fn cmd_stream_export(
    input: PathBuf,
    format: ExportFormat,
    output: Option<PathBuf>,
    history: bool,
    pretty: bool,
    quiet: bool,
    decoder: DecoderArgs,
) -> Result<(), CliError> {
    let input = resolve_input(&input)?;
    if let Some(path) = output.as_ref() {
        ensure_distinct_output(&input, path)?;
    }

    let (rep, specs) = decode_input(&input, &decoder)?;
    let rows = if history {
        rep.history
    } else {
        vec![rep.reading]
    };
    let text = render_rows(&rows, &specs, format, pretty)?;

    match output {
        None => println!("{}", text),
        Some(path) => {
            write_output(&path, &text)?;
            if !quiet {
                eprintln!(
                    "OK: {} rows exported as {} -> {}",
                    rows.len(),
                    format,
                    path.display()
                );
            }
        }
    }
    Ok(())
}

fn render_rows(
    rows: &[ReadingSnapshot],
    specs: &SpecTable,
    format: ExportFormat,
    pretty: bool,
) -> Result<String, CliError> {
    let text = match format {
        ExportFormat::Json if pretty => to_json(rows, true),
        _ => export(rows, specs, format),
    };
    text.context("export failed").map_err(Into::into)
}

/// One line of `stream watch` output.
#[derive(Serialize)]
struct WatchEvent<'a> {
    updated: &'a BTreeSet<SensorKind>,
    reading: ReadingSnapshot,
    sensors: BTreeMap<SensorKind, SensorDisplay>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    failures: Vec<String>,
}

fn cmd_stream_watch(input: PathBuf, decoder: DecoderArgs) -> Result<(), CliError> {
    let input = resolve_input(&input)?;
    let config = build_config(&decoder)?;
    let mut stream = StreamDecoder::new(config).map_err(config_error)?;
    let mut source = input.open(decoder.chunk_size)?;
    info!("watching {}", input.path().display());
    follow(&mut source, &mut stream, input.path(), None)
}

fn cmd_stream_simulate(
    count: Option<u64>,
    interval_ms: u64,
    seed: Option<u64>,
    decoder: DecoderArgs,
) -> Result<(), CliError> {
    let config = build_config(&decoder)?;
    let mut source = SimulatedSource::new(&config, seed).map_err(config_error)?;
    if let Some(count) = count {
        source = source.with_limit(count);
    }
    let mut stream = StreamDecoder::new(config).map_err(config_error)?;
    info!("simulating {} frames every {interval_ms} ms", stream.config().dialect);
    follow(
        &mut source,
        &mut stream,
        Path::new("simulation"),
        Some(Duration::from_millis(interval_ms)),
    )
}

/// Feed every chunk of `source` and print a line per change, pausing
/// `interval` between reads when set.
fn follow(
    source: &mut impl ChunkSource,
    stream: &mut StreamDecoder,
    label: &Path,
    interval: Option<Duration>,
) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut first = true;
    loop {
        if let Some(interval) = interval.filter(|_| !first) {
            thread::sleep(interval);
        }
        first = false;
        let Some(chunk) = source
            .next_chunk()
            .with_context(|| format!("failed to read {}", label.display()))?
        else {
            break;
        };
        let update = stream.feed(&chunk);
        emit_update(&mut out, stream, &update)?;
    }
    let update = stream.flush();
    emit_update(&mut out, stream, &update)?;

    let reading = stream.close();
    info!(
        "{} closed after {} bytes, {} revisions",
        label.display(),
        source.bytes_read(),
        reading.revision()
    );
    Ok(())
}

fn emit_update(
    out: &mut impl Write,
    decoder: &StreamDecoder,
    update: &UpdateSet,
) -> Result<(), CliError> {
    if update.is_empty() {
        return Ok(());
    }
    let event = WatchEvent {
        updated: &update.updated,
        reading: decoder.reading().snapshot(),
        sensors: decoder.reading().display(decoder.specs()),
        failures: update
            .failures
            .iter()
            .map(|failure| format!("{}: {}", failure.id(), failure))
            .collect(),
    };
    let line = serde_json::to_string(&event).context("JSON serialization failed")?;
    writeln!(out, "{}", line).context("failed to write to stdout")?;
    out.flush().context("failed to write to stdout")?;
    Ok(())
}

fn decode_input(
    input: &Input,
    args: &DecoderArgs,
) -> Result<(SessionReport, SpecTable), CliError> {
    let config = build_config(args)?;
    let decoder = StreamDecoder::new(config).map_err(config_error)?;
    let specs = decoder.specs().clone();
    let source = input.open(args.chunk_size)?;
    let report = decode_source(input.path(), source, decoder)
        .with_context(|| format!("decoding failed for {}", input.path().display()))?;
    Ok((report, specs))
}

fn build_config(args: &DecoderArgs) -> Result<DecoderConfig, CliError> {
    let mut config = match args.config.as_ref() {
        Some(path) => DecoderConfig::load(path).map_err(|err| {
            CliError::new(
                format!("invalid config {}: {}", path.display(), err),
                Some("expected JSON with dialect, terminator, max_frame_len, limits".to_string()),
            )
        })?,
        None => DecoderConfig::default(),
    };

    if let Some(dialect) = args.dialect {
        config.dialect = dialect;
    }
    if args.no_terminator {
        config.terminator = None;
    } else if let Some(text) = args.terminator.as_deref() {
        config.terminator = Some(parse_terminator(text).map_err(config_error)?);
    }
    if let Some(max_frame_len) = args.max_frame_len {
        config.max_frame_len = max_frame_len;
    }

    config.validate().map_err(config_error)?;
    Ok(config)
}

fn config_error(err: ConfigError) -> CliError {
    let hint = match err {
        ConfigError::EmptyTerminator | ConfigError::InvalidEscape { .. } => {
            "use --no-terminator for chunk-per-frame input; supported escapes: \\n \\r \\t \\\\"
        }
        ConfigError::InvalidMaxFrameLen => "use a --max-frame-len greater than zero",
        ConfigError::Dialect(_) => "expected csv or keyvalue",
        _ => "check the limits section of the config file",
    };
    CliError::new(
        format!("invalid decoder configuration: {}", err),
        Some(hint.to_string()),
    )
}

fn serialize_report(rep: &SessionReport, pretty: bool, compact: bool) -> Result<String, CliError> {
    if pretty && compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }
    if pretty {
        serde_json::to_string_pretty(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

fn print_failures(rep: &SessionReport) {
    eprintln!("Decode failures:");
    for failure in &rep.failures {
        eprintln!("  {} ({})", failure.id, failure.count);
    }
}

fn write_output(path: &Path, contents: &str) -> Result<(), CliError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }
    fs::write(path, contents)
        .with_context(|| format!("Failed to write output: {}", path.display()))?;
    Ok(())
}

#[derive(Debug)]
enum Input {
    Stdin,
    File(PathBuf),
}

impl Input {
    fn path(&self) -> &Path {
        match self {
            Input::Stdin => Path::new(STDIN_INPUT),
            Input::File(path) => path,
        }
    }

    fn open(&self, chunk_size: usize) -> Result<ReaderSource<Box<dyn Read>>, CliError> {
        let reader: Box<dyn Read> = match self {
            Input::Stdin => Box::new(io::stdin()),
            Input::File(path) => Box::new(
                File::open(path)
                    .with_context(|| format!("Failed to open input: {}", path.display()))?,
            ),
        };
        ReaderSource::new(reader, chunk_size).map_err(|err| {
            CliError::new(
                err.to_string(),
                Some("use a --chunk-size greater than zero".to_string()),
            )
        })
    }
}

fn ensure_distinct_output(input: &Input, output: &Path) -> Result<(), CliError> {
    let Input::File(input_path) = input else {
        return Ok(());
    };
    let input_abs = fs::canonicalize(input_path)
        .with_context(|| format!("Failed to resolve input path: {}", input_path.display()))?;
    let output_dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::canonicalize(parent).ok(),
        _ => fs::canonicalize(".").ok(),
    };
    let (Some(output_dir), Some(file_name)) = (output_dir, output.file_name()) else {
        return Ok(());
    };
    if output_dir.join(file_name) == input_abs {
        return Err(CliError::new(
            format!("output path must differ from input: {}", output.display()),
            Some("choose a different output path".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input(input: &Path) -> Result<Input, CliError> {
    if input == Path::new(STDIN_INPUT) {
        return Ok(Input::Stdin);
    }
    let resolved = resolve_input_path(input)?;
    if !resolved.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", resolved.display()),
            Some("pass a telemetry log, a device node, or - for stdin".to_string()),
        ));
    }
    if resolved.is_dir() {
        return Err(CliError::new(
            format!("input is a directory: {}", resolved.display()),
            Some("pass a telemetry log, or a glob pattern such as 'logs/*.log'".to_string()),
        ));
    }
    Ok(Input::File(resolved))
}

/// Matches listed in the "multiple files" error.
const LISTED_MATCHES: usize = 3;

/// Expand a glob to exactly one file; plain paths pass through unchanged.
fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }
    let bad_pattern = |detail: String| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", detail)),
        )
    };

    let files = glob(&pattern)
        .map_err(|err| bad_pattern(err.msg.to_string()))?
        .filter_map(|entry| match entry {
            Ok(path) if path.is_file() => Some(Ok(path)),
            Ok(_) => None,
            Err(err) => Some(Err(bad_pattern(err.to_string()))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    match files.as_slice() {
        [] => Err(CliError::new(
            format!("no telemetry log matches '{}'", pattern),
            Some("check the path, and quote the pattern so the shell leaves it alone".to_string()),
        )),
        [single] => Ok(single.clone()),
        several => {
            let mut shown: Vec<String> = several
                .iter()
                .take(LISTED_MATCHES)
                .map(|path| path.display().to_string())
                .collect();
            if several.len() > LISTED_MATCHES {
                shown.push("...".to_string());
            }
            Err(CliError::new(
                format!(
                    "multiple files match pattern '{}': {} ({} in total)",
                    pattern,
                    shown.join(", "),
                    several.len()
                ),
                Some("narrow the pattern to one log, or decode each file separately".to_string()),
            ))
        }
    }
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}
