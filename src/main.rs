use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, warn};
use lookout::analytics::{AnalyticsSink, HttpAnalyticsSink, LogAnalyticsSink};
use lookout::config::Config;
use lookout::dashboard::DashboardView;
use lookout::error::ConfigError;
use lookout::events::{CapturedError, DataMap, LogCategory, LogContext, LogLevel};
use lookout::monitoring::{MetricsEngine, MonitorRuntime, ProcessMemoryProbe};
use lookout::store::ExportFormat;
use lookout::Logger;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::Notify;

/// Command-line arguments for the builder observability monitor
#[derive(Parser)]
#[command(
    name = "lookout",
    about = "Observability core for a visual UI builder",
    long_about = "Ingests structured builder events as JSON lines, keeps them in a bounded \
                  log store, and prints a live dashboard of performance metrics, trends, \
                  component health and alerts."
)]
struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (TOML format)"
    )]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,

    /// JSON-lines event source
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Read events from FILE instead of standard input"
    )]
    input: Option<PathBuf>,

    /// Export stored entries on exit
    #[arg(short, long, value_name = "FORMAT", help = "Export format on exit: json or csv")]
    export: Option<ExportFormat>,

    /// Export destination
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Write the export to FILE instead of standard output"
    )]
    output: Option<PathBuf>,

    /// Print only the one-line status
    #[arg(long, help = "Print the minimized dashboard")]
    compact: bool,
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// # Returns
    ///
    /// `Ok(())` if all arguments are valid, `Err(String)` with error message otherwise
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            // Missing files fall back to defaults in load_config
            if config_path.exists() && !config_path.is_file() {
                return Err(format!(
                    "Configuration path is not a file: {}",
                    config_path.display()
                ));
            }
        }

        if let Some(ref input) = self.input {
            if !input.is_file() {
                return Err(format!("Input file not found: {}", input.display()));
            }
        }

        if self.output.is_some() && self.export.is_none() {
            return Err("--output requires --export".to_string());
        }

        Ok(())
    }
}

/// One ingested event; stamped on arrival
#[derive(Debug, Deserialize)]
struct EventRecord {
    level: LogLevel,
    category: LogCategory,
    message: String,
    #[serde(default)]
    context: Option<LogContext>,
    #[serde(default)]
    data: Option<DataMap>,
    #[serde(default)]
    error: Option<CapturedError>,
}

/// Load configuration from file or use defaults
///
/// Missing or invalid files are reported and replaced by the defaults.
fn load_config(config_path: Option<&Path>) -> Config {
    let Some(path) = config_path else {
        info!("Using default configuration");
        return Config::default();
    };

    info!("Loading configuration from: {}", path.display());
    match Config::from_file(path) {
        Ok(config) => config,
        Err(ConfigError::ReadError(_)) => {
            warn!(
                "Configuration file '{}' not found or unreadable, using defaults",
                path.display()
            );
            Config::default()
        }
        Err(e) => {
            error!("Configuration error in '{}': {}", path.display(), e);
            warn!("Using default configuration due to invalid config file");
            Config::default()
        }
    }
}

fn build_sink(config: &Config) -> Result<Arc<dyn AnalyticsSink>> {
    match &config.analytics.endpoint {
        Some(endpoint) => {
            info!("Forwarding analytics to {}", endpoint);
            let sink = HttpAnalyticsSink::new(endpoint.clone())
                .context("Failed to create HTTP analytics sink")?;
            Ok(Arc::new(sink))
        }
        None => Ok(Arc::new(LogAnalyticsSink)),
    }
}

async fn open_input(path: Option<&Path>) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
    match path {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open input {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdin())),
    }
}

fn ingest_line(logger: &Logger, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    match serde_json::from_str::<EventRecord>(line) {
        Ok(record) => logger.log(
            record.level,
            record.category,
            record.message,
            record.context,
            record.data,
            record.error,
        ),
        Err(e) => warn!("Skipping malformed event line: {}", e),
    }
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    let logger = Logger::new(&config).with_sink(build_sink(&config)?);

    let engine = MetricsEngine::new(logger.clone(), config.aggregator.clone())
        .with_probe(Box::new(ProcessMemoryProbe));
    let mut states = engine.subscribe();
    let engine = Arc::new(Mutex::new(engine));

    let mut runtime = MonitorRuntime::start(logger.clone(), Arc::clone(&engine), &config);

    let interrupted = Arc::new(Notify::new());
    let handler_notify = Arc::clone(&interrupted);
    ctrlc::set_handler(move || {
        info!("Received interrupt signal (SIGINT), shutting down gracefully...");
        handler_notify.notify_one();
    })
    .context("Failed to set SIGINT handler")?;

    let mut view = DashboardView::new();
    if cli.compact {
        view.toggle_minimized();
    }

    let mut lines = BufReader::new(open_input(cli.input.as_deref()).await?).lines();
    info!("Reading events. Press Ctrl+C to stop.");

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => ingest_line(&logger, &line),
                Ok(None) => {
                    debug!("End of input");
                    break;
                }
                Err(e) => {
                    error!("Failed to read input: {}", e);
                    break;
                }
            },
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = states.borrow_and_update().clone();
                view.observe(&state);
                println!("{}", view.render(&state));
            }
            _ = interrupted.notified() => break,
        }
    }

    runtime.shutdown();

    let state = engine.lock().unwrap_or_else(|e| e.into_inner()).sample();
    view.observe(&state);
    println!("{}", view.render(&state));

    if let Some(format) = cli.export {
        match &cli.output {
            Some(path) => {
                logger
                    .export_to_file(path, format)
                    .with_context(|| format!("Failed to export to {}", path.display()))?;
                info!(
                    "Exported {} entries to {}",
                    logger.stats().total_entries,
                    path.display()
                );
            }
            None => println!("{}", logger.export_logs(format)?),
        }
    }

    Ok(())
}

fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let config = load_config(cli.config.as_deref());

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(run(cli, config));
    // A pending stdin read would otherwise hold the runtime open
    runtime.shutdown_background();

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }

    info!("Shutdown complete");
}
