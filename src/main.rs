//! Zip-Ingest main entry point
//!
//! This is the command-line interface for the archive ingestion pipeline.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use zip_ingest::config::{load_config_with_hash, Config};
use zip_ingest::{Coordinator, RedisStore, RunOutcome};

/// Exit code reported after Ctrl-C, matching the shell convention for SIGINT
const EXIT_INTERRUPTED: u8 = 130;

/// Zip-Ingest: a re-runnable archive ingestion pipeline
///
/// Zip-Ingest reads a listing page, downloads every archive it links to that
/// has not been handled before, and pushes each new entry onto a Redis list.
#[derive(Parser, Debug)]
#[command(name = "zip-ingest")]
#[command(version)]
#[command(about = "A re-runnable archive ingestion pipeline", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be ingested without running
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(ExitCode::SUCCESS);
    }

    handle_ingest(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("zip_ingest=info,warn"),
            1 => EnvFilter::new("zip_ingest=debug,info"),
            2 => EnvFilter::new("zip_ingest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Zip-Ingest Dry Run ===\n");

    println!("Listing:");
    println!("  URL: {}", config.listing.url);
    println!("  Archive suffix: {}", config.listing.archive_suffix);
    println!("  Minimum link length: {}", config.listing.min_link_length);

    println!("\nWorkers:");
    println!("  Count: {}", config.workers.count);
    println!("  Queue capacity: {}", config.workers.queue_capacity);
    match &config.workers.scratch_dir {
        Some(dir) => println!("  Scratch dir: {}", dir.display()),
        None => println!("  Scratch dir: {}", std::env::temp_dir().display()),
    }
    println!("  On error: {:?}", config.workers.on_error);
    println!("  Drain on complete: {}", config.workers.drain_on_complete);

    println!("\nRedis:");
    println!("  URL: {}", config.redis.url);
    println!("  Downloaded hash: {}", config.redis.downloaded_key);
    println!("  Processed hash: {}", config.redis.processed_key);
    println!("  Output queue: {}", config.redis.queue);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    if let Some(contact) = &config.user_agent.contact_url {
        println!("  Contact URL: {}", contact);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main ingestion run
async fn handle_ingest(config: Config) -> anyhow::Result<ExitCode> {
    let store = RedisStore::open(&config.redis)
        .with_context(|| format!("Failed to open Redis at {}", config.redis.url))?;
    let coordinator = Coordinator::new(config, store)?;

    let shutdown = CancellationToken::new();
    let interrupt = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, shutting down");
            interrupt.cancel();
        }
    });

    match coordinator.run_until(shutdown).await? {
        RunOutcome::Completed(_) => Ok(ExitCode::SUCCESS),
        RunOutcome::Cancelled(_) => Ok(ExitCode::from(EXIT_INTERRUPTED)),
    }
}
