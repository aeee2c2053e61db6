use anyhow::{Context as AnyhowContext, Result};
use apispec_indexer::ScanConfig;
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

mod config;
mod context;

pub use config::{AppConfig, ProcessorSection, WORKERS_ENV};
pub use context::AppContext;

fn print_stdout(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "apispec")]
#[command(about = "Discover API specification files and turn them into retrieval chunks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (implies progress logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for output)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the spec files under a directory
    Scan(ScanArgs),

    /// Run the full pipeline and write the chunks as JSON
    Index(IndexArgs),
}

#[derive(Args, Clone)]
struct FilterArgs {
    /// Descend into hidden directories and keep hidden files
    #[arg(long)]
    include_hidden: bool,

    /// Allowed extension (repeatable, replaces the configured set)
    #[arg(long = "ext", value_name = "EXT")]
    extensions: Vec<String>,
}

#[derive(Args)]
struct ScanArgs {
    /// Directory to scan
    root: PathBuf,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    filter: FilterArgs,
}

#[derive(Args)]
struct IndexArgs {
    /// Directory to process
    root: PathBuf,

    /// TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write output here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,

    /// Worker threads (1 = sequential)
    #[arg(long)]
    workers: Option<usize>,

    /// Write the full per-file report instead of the chunk array
    #[arg(long)]
    report: bool,

    #[command(flatten)]
    filter: FilterArgs,
}

fn apply_filter(config: &mut AppConfig, filter: &FilterArgs) -> Result<()> {
    if !filter.extensions.is_empty() {
        config.scan = ScanConfig::new(config.scan.include_hidden(), &filter.extensions)
            .context("Invalid --ext values")?;
    }
    if filter.include_hidden {
        config.scan = config.scan.clone().with_include_hidden(true);
    }
    Ok(())
}

pub fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Scan(args) => run_scan(args),
        Commands::Index(args) => run_index(args, cli.verbose),
    }
}

fn run_scan(args: ScanArgs) -> Result<()> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    apply_filter(&mut config, &args.filter)?;
    let ctx = AppContext::new(config)?;

    let files = ctx
        .scanner()
        .scan(&args.root)
        .with_context(|| format!("Cannot scan {}", args.root.display()))?;

    let mut count = 0usize;
    for file in files {
        print_stdout(&file.relative_str())?;
        count += 1;
    }
    log::debug!("Discovered {count} file(s) under {}", args.root.display());
    Ok(())
}

fn run_index(args: IndexArgs, verbose: bool) -> Result<()> {
    let mut config = AppConfig::load(args.config.as_deref())?;
    apply_filter(&mut config, &args.filter)?;
    if let Some(workers) = args.workers {
        config.processor.workers = workers;
    }
    if verbose {
        config.processor.log_progress = true;
    }
    let ctx = AppContext::new(config)?;

    let report = ctx.processor().process_with_report(&args.root);
    log::info!(
        "Indexed {}: {} chunk(s) from {} file(s), {} skipped in {} ms",
        args.root.display(),
        report.stats.chunks,
        report.stats.files_emitted,
        report.stats.files_skipped,
        report.stats.time_ms
    );

    let json = if args.report {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string_pretty(&report.chunks)?
    };

    match args.out {
        Some(path) => {
            fs::write(&path, format!("{json}\n"))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Wrote {}", path.display());
            Ok(())
        }
        None => print_stdout(&json),
    }
}
