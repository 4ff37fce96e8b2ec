//! EMU-2 telemetry logger - Main Entry Point
//!
//! Assembles the concrete pipelines (device, replay file, simulator) and
//! blocks on the primary source's reader until it finishes.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use emu_telemetry::{
    config::{AppConfig, OutputFormat},
    device::{Connector, FileConnector, SerialConnector, SimulatorConnector, StdinConnector},
    pipeline::{
        lock,
        nodes::{AnnotationFormatter, CsvFormatter, Echo, FileLogger, FragmentDecoder, JsonFormatter},
        shared, Coalescer, Pipe, Shared, Source,
    },
    Command,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default tracing filter when neither RUST_LOG nor --log-level is given
const DEFAULT_FILTER: &str = "info,emu_telemetry=debug";

/// EMU-2 energy monitor telemetry logger.
#[derive(Parser, Debug)]
#[command(name = "emu-telemetry", version, about, long_about = None)]
struct Cli {
    /// Path to the config.toml file (default: platform config directory).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Log decoded records from the serial device.
    Log(LogArgs),

    /// Run a captured sample file through the logging pipeline.
    Replay {
        /// File of raw device output, one line per read.
        file: PathBuf,
    },

    /// Capture raw, unframed device output to the log file.
    Sample,

    /// Log records from a simulated device.
    Simulate,

    /// Send one command to the device and show its replies.
    Send(SendArgs),

    /// Print the effective configuration as TOML.
    Config,
}

#[derive(Args, Debug)]
struct LogArgs {
    /// Also log lines typed on stdin as annotations.
    #[arg(long)]
    annotate: bool,
}

#[derive(Args, Debug)]
struct SendArgs {
    /// Command name, e.g. get_connection_status.
    name: String,

    /// Target meter MAC id.
    #[arg(long)]
    meter: Option<String>,

    /// Extra command field as TAG=VALUE (repeatable).
    #[arg(long = "field", value_parser = parse_field)]
    fields: Vec<(String, String)>,

    /// How long to print replies before exiting, in milliseconds.
    #[arg(long, default_value_t = 2000)]
    wait_ms: u64,
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (tag, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected TAG=VALUE, got `{}`", raw))?;
    if tag.is_empty() {
        return Err(format!("empty tag in `{}`", raw));
    }
    Ok((tag.to_string(), value.to_string()))
}

fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Log(args) => {
            let connector = SerialConnector::new(&config.device.port);
            run_logger(connector, &config, args.annotate)
        }
        Commands::Replay { file } => run_logger(FileConnector::new(file), &config, false),
        Commands::Sample => run_sampler(&config),
        Commands::Simulate => {
            let connector = SimulatorConnector::new(config.simulator.interval()).with_mac_ids(
                config.simulator.device_mac_id.clone(),
                config.simulator.meter_mac_id.clone(),
            );
            run_logger(connector, &config, false)
        }
        Commands::Send(args) => run_send(args, &config),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn open_logger(config: &AppConfig) -> anyhow::Result<Shared<FileLogger>> {
    let logger = FileLogger::rolling(
        &config.logging.directory,
        &config.logging.file_name,
        config.logging.rotation,
    )
    .context("Failed to open telemetry log")?;
    let logger = shared(logger);
    if config.output.echo {
        logger.pipe(shared(Echo::<String>::stdout()));
    }
    Ok(logger)
}

/// source -> framer -> decoder -> formatter -> file logger (-> echo)
fn run_logger<C: Connector>(connector: C, config: &AppConfig, annotate: bool) -> anyhow::Result<()> {
    let logger = open_logger(config)?;

    let source = shared(Source::new(connector));
    let records = source
        .pipe(shared(Coalescer::with_max_fragment_bytes(
            config.framer.max_fragment_bytes,
        )))
        .pipe(shared(FragmentDecoder::new()));
    match config.output.format {
        OutputFormat::Csv => {
            records.pipe(shared(CsvFormatter::new())).pipe(logger.clone());
        }
        OutputFormat::Json => {
            records.pipe(shared(JsonFormatter::new())).pipe(logger.clone());
        }
    }

    // Annotations share the logger with the device pipeline.
    let console = if annotate {
        let console = shared(Source::new(StdinConnector));
        console
            .pipe(shared(AnnotationFormatter::new()))
            .pipe(logger.clone());
        let handle = lock(&console).start()?;
        Some((console, handle))
    } else {
        None
    };

    let handle = lock(&source).start()?;
    let exit = handle.join();
    tracing::info!(
        "Source {} finished: {} ({} lines)",
        lock(&source).name(),
        exit.reason,
        exit.delivered
    );

    if let Some((console, _handle)) = console {
        // A blocked stdin read is not interrupted; the process exit ends it.
        lock(&console).stop();
    }

    if exit.reason.is_failure() {
        anyhow::bail!("source failed: {}", exit.reason);
    }
    Ok(())
}

/// serial device -> raw file logger (-> echo)
fn run_sampler(config: &AppConfig) -> anyhow::Result<()> {
    let logger = open_logger(config)?;
    let source = shared(Source::new(SerialConnector::new(&config.device.port)));
    source.pipe(logger);

    let handle = lock(&source).start()?;
    let exit = handle.join();
    if exit.reason.is_failure() {
        anyhow::bail!("source failed: {}", exit.reason);
    }
    Ok(())
}

fn run_send(args: SendArgs, config: &AppConfig) -> anyhow::Result<()> {
    let mut command = Command::new(args.name);
    if let Some(meter) = args.meter {
        command = command.meter(meter);
    }
    for (tag, value) in args.fields {
        command = command.field(tag, value);
    }

    let source = shared(Source::new(SerialConnector::new(&config.device.port)));
    source
        .pipe(shared(Coalescer::with_max_fragment_bytes(
            config.framer.max_fragment_bytes,
        )))
        .pipe(shared(Echo::<String>::stdout()));

    let _handle = lock(&source).start()?;
    let text = command.to_string();
    tracing::info!("Sending {}", text);
    lock(&source).write(&text)?;

    std::thread::sleep(Duration::from_millis(args.wait_ms));
    lock(&source).stop();
    Ok(())
}
