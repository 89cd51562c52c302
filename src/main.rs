use clap::{Parser, ValueEnum};
use media_detective::{
    Config, MediaDetective, MediaDetectiveError, ProgressEvent, ResolveRequest, ResolvedMedia,
    fingerprint_file,
};
use std::path::PathBuf;
use std::process;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "media_detective",
    version,
    about = "Identify the movie or TV episode behind a media file"
)]
struct Cli {
    /// Verbose logging (debug level)
    #[arg(short, long, conflicts_with = "quiet")]
    debug: bool,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    /// Explicit log level, overriding --debug and --quiet
    #[arg(long, value_enum)]
    log_level: Option<LogLevel>,

    /// Configuration file (defaults to config.toml in the user config directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Media metadata as a JSON object, e.g. '{"filename": "Show.S01E02.mkv"}'
    #[arg(long)]
    meta: String,

    /// OpenSubtitles hash of the file content
    #[arg(long)]
    hash: Option<String>,

    /// File size in bytes
    #[arg(long)]
    size: Option<u64>,

    /// Playback duration in seconds
    #[arg(long)]
    duration: Option<f64>,

    /// Local media file to compute a missing hash and size from
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Installs the stderr logger; stdout is reserved for the JSON result
fn init_logging(cli: &Cli) {
    let level = match (cli.log_level, cli.debug, cli.quiet) {
        (Some(level), _, _) => level,
        (None, true, _) => LogLevel::Debug,
        (None, _, true) => LogLevel::Error,
        (None, false, false) => LogLevel::Warn,
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Forwards progress events to the log
fn handle_progress_event(event: ProgressEvent) {
    match event {
        ProgressEvent::Started { filename } => {
            info!("Identifying {}", filename);
        }
        ProgressEvent::Unrecognized { filename } => {
            info!("No naming scheme matches {}", filename);
        }
        ProgressEvent::Parsed { descriptor } => {
            debug!("Parsed filename as {:?}", descriptor);
        }
        ProgressEvent::Resolving { strategy } => {
            debug!("Trying {:?} resolution", strategy);
        }
        ProgressEvent::StrategyFailed { strategy, error } => {
            warn!("{:?} resolution failed: {}", strategy, error);
        }
        ProgressEvent::Resolved {
            id,
            title,
            strategy,
        } => {
            info!("Identified {} ({}) by {:?} resolution", title, id, strategy);
        }
        ProgressEvent::HashSubmission { outcome } => {
            debug!("Hash submission: {:?}", outcome);
        }
        ProgressEvent::ExpansionTruncated {
            requested,
            resolved,
        } => {
            warn!(
                "Only {} of {} requested episodes could be resolved",
                resolved, requested
            );
        }
        ProgressEvent::Complete { count } => {
            info!("Identification complete, {} record(s)", count);
        }
    }
}

fn run(cli: Cli) -> Result<Vec<ResolvedMedia>, MediaDetectiveError> {
    let config = Config::load(cli.config.as_deref())?;

    let mut request = ResolveRequest::from_json(&cli.meta)?.with_overrides(
        cli.hash,
        cli.size,
        cli.duration,
    );

    if let Some(path) = &cli.file {
        if request.content_hash().is_none() || request.size_bytes.is_none() {
            let fingerprint = fingerprint_file(path)?;
            debug!("Fingerprint of {}: {}", path.display(), fingerprint.hash);
            let hash = request.content_hash().is_none().then_some(fingerprint.hash);
            let size = request.size_bytes.is_none().then_some(fingerprint.size_bytes);
            request = request.with_overrides(hash, size, None);
        }
    }

    let detective = MediaDetective::from_config(&config)?;
    Ok(detective.identify(&request, handle_progress_event))
}

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let output = run(cli).and_then(|results| Ok(serde_json::to_string_pretty(&results)?));

    match output {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}
