use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use dirscan_config::{ScanMode, ScannerConfig, ScannerConfigSource};
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod output;

use output::{Summary, write_entry};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "dirscanctl", version)]
#[command(about = "Stream the contents of directory trees with bounded concurrency")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan directories and print one line per entry
    Scan(ScanArgs),
    /// Inspect the effective configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Print the effective scanner configuration as TOML
    Show(ConfigArgs),
}

#[derive(ClapArgs, Debug, Clone)]
struct ConfigArgs {
    /// Configuration file (TOML or JSON); takes precedence over DIRSCAN_CONFIG_PATH
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
}

#[derive(ClapArgs, Debug, Clone)]
struct ScanArgs {
    /// Directories to scan. Falls back to the configured roots, then "."
    roots: Vec<PathBuf>,

    #[command(flatten)]
    config: ConfigArgs,

    /// Maximum number of directories listed at the same time
    #[arg(long, short = 'w')]
    workers: Option<usize>,

    /// Entries buffered ahead of the output before listing pauses
    #[arg(long)]
    buffer: Option<usize>,

    /// List the roots only, without descending into subdirectories
    #[arg(long)]
    flat: bool,

    /// Only print regular files
    #[arg(long, conflicts_with = "dirs")]
    files: bool,

    /// Only print directories
    #[arg(long)]
    dirs: bool,

    /// Only print entries with this extension (repeatable or comma separated)
    #[arg(long = "ext", value_delimiter = ',')]
    extensions: Vec<String>,

    /// Regular expression matched against entry names
    #[arg(long)]
    pattern: Option<String>,

    /// Stop after printing this many entries
    #[arg(long)]
    limit: Option<usize>,

    /// Prefix each path with its kind, size and modification time
    #[arg(long, short = 'l')]
    long: bool,

    /// Log every entry on the scan::trace target
    #[arg(long)]
    trace: bool,
}

impl ScanArgs {
    /// Command line flags win over file and environment settings.
    fn apply(&self, config: &mut ScannerConfig) {
        if let Some(workers) = self.workers {
            config.workers = Some(workers);
        }
        if let Some(buffer) = self.buffer {
            config.buffer = buffer;
        }
        if self.flat {
            config.recursive = false;
        }
        if self.files {
            config.mode = ScanMode::Files;
        } else if self.dirs {
            config.mode = ScanMode::Directories;
        }
        if !self.extensions.is_empty() {
            config.extensions = self.extensions.clone();
        }
        if self.pattern.is_some() {
            config.pattern = self.pattern.clone();
        }
        if self.limit.is_some() {
            config.limit = self.limit;
        }
        if !self.roots.is_empty() {
            config.roots = self.roots.clone();
        }
        if config.roots.is_empty() {
            config.roots.push(PathBuf::from("."));
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                // Entries go to stdout; keep stderr to warnings and the summary.
                "warn,scan::summary=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    match cli.command {
        Command::Scan(args) => run_scan(args).await,
        Command::Config(ConfigCommand::Show(args)) => show_config(&args),
    }
}

fn load_config(args: &ConfigArgs) -> anyhow::Result<ScannerConfig> {
    let (config, source) = match &args.config {
        Some(path) => (
            ScannerConfig::load_from_file(path)?,
            ScannerConfigSource::File(path.clone()),
        ),
        None => ScannerConfig::load_from_env().context("failed to load scanner configuration")?,
    };

    match &source {
        ScannerConfigSource::Default => debug!("using default scanner configuration"),
        ScannerConfigSource::EnvInline => {
            debug!("scanner config loaded from inline environment json")
        }
        ScannerConfigSource::EnvPath(path) | ScannerConfigSource::File(path) => {
            debug!(path = %path.display(), "scanner config loaded from file")
        }
    }
    Ok(config)
}

fn show_config(args: &ConfigArgs) -> anyhow::Result<ExitCode> {
    let config = load_config(args)?;
    config.validate()?;
    print!("{}", config.to_toml_string()?);
    Ok(ExitCode::SUCCESS)
}

async fn run_scan(args: ScanArgs) -> anyhow::Result<ExitCode> {
    let mut config = load_config(&args.config)?;
    args.apply(&mut config);
    config.validate().context("invalid scanner configuration")?;

    let mut builder = config.to_builder();
    if args.trace {
        builder = builder.trace();
    }
    let scanner = builder.build().context("failed to start scan")?;

    // Ctrl-C cancels the parent; a closed stdout only cancels the scan.
    let interrupt = CancellationToken::new();
    let cancel = interrupt.child_token();
    let on_signal = interrupt.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping scan");
            on_signal.cancel();
        }
    });

    let started = Instant::now();
    let mut entries = scanner
        .scan(cancel.clone())
        .context("failed to start scan")?;
    let mut out = BufWriter::new(io::stdout());
    let mut summary = Summary::default();

    while let Some(entry) = entries.next().await {
        match entry {
            Ok(meta) => {
                summary.record(&meta);
                if let Err(err) = write_entry(&mut out, &meta, args.long) {
                    if err.kind() == io::ErrorKind::BrokenPipe {
                        cancel.cancel();
                        break;
                    }
                    return Err(err).context("failed to write entry");
                }
            }
            Err(err) => {
                summary.errors += 1;
                eprintln!("dirscanctl: {err}");
            }
        }
    }
    drop(entries);

    match out.flush() {
        Err(err) if err.kind() != io::ErrorKind::BrokenPipe => {
            return Err(err).context("failed to flush output");
        }
        _ => {}
    }

    let interrupted = interrupt.is_cancelled();
    info!(
        target: "scan::summary",
        files = summary.files,
        directories = summary.directories,
        other = summary.other,
        errors = summary.errors,
        interrupted,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "scan finished"
    );

    Ok(if interrupted {
        ExitCode::from(130)
    } else if summary.errors > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
