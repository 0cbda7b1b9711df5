//! newsweep main entry point
//!
//! This is the command-line interface for the newsweep feed crawler.

use anyhow::Context;
use clap::{Parser, Subcommand};
use newsweep::catalog::build_catalog;
use newsweep::config::{load_config_with_hash, Config};
use newsweep::coordination::Coordinator;
use newsweep::crawler::{build_coordinator, build_http_client, build_worker};
use newsweep::{SourceState, SweepSummary};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// newsweep: a distributed feed crawler
///
/// Workers lease RSS sources from a shared coordinator, extract and classify
/// their articles, and publish them. Any number of workers can share one
/// coordination store.
#[derive(Parser, Debug)]
#[command(name = "newsweep")]
#[command(version)]
#[command(about = "A distributed feed crawler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the worker loop until interrupted
    Run {
        /// Path to TOML configuration file
        #[arg(value_name = "CONFIG")]
        config: PathBuf,

        /// Run a single sweep and exit
        #[arg(long)]
        once: bool,
    },
    /// Validate config and list the sources that would be crawled
    Check {
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },
    /// Show the coordinator's partitions and worker counters
    Status {
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },
    /// Force a sweep reset and print the summary of the old sweep
    Reset {
        #[arg(value_name = "CONFIG")]
        config: PathBuf,
    },
}

impl Command {
    fn config_path(&self) -> &PathBuf {
        match self {
            Self::Run { config, .. }
            | Self::Check { config }
            | Self::Status { config }
            | Self::Reset { config } => config,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let path = cli.command.config_path();
    tracing::info!("Loading configuration from: {}", path.display());
    let (config, config_hash) = load_config_with_hash(path)
        .with_context(|| format!("failed to load configuration {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    match &cli.command {
        Command::Run { once, .. } => handle_run(&config, *once).await,
        Command::Check { .. } => handle_check(&config, &config_hash).await,
        Command::Status { .. } => handle_status(&config).await,
        Command::Reset { .. } => handle_reset(&config).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("newsweep=info,warn"),
            1 => EnvFilter::new("newsweep=debug,info"),
            2 => EnvFilter::new("newsweep=trace,debug"),
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

/// Runs the worker until Ctrl-C, or for a single sweep with `--once`
async fn handle_run(config: &Config, once: bool) -> anyhow::Result<()> {
    let (coordinator, worker) = build_worker(config).await?;
    tracing::info!(
        "Worker {} using {:?} coordination, batch size {}, {} parallel sources",
        worker.worker_id(),
        coordinator.backend(),
        config.worker.batch_size,
        config.worker.worker_threads
    );

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, finishing in-flight sources");
                cancel.cancel();
            }
        });
    }

    if once {
        let totals = worker.run_once(&cancel).await?;
        println!(
            "Sweep finished: {} sources, {} articles",
            totals.sources, totals.articles
        );
    } else {
        worker.run(&cancel).await;
    }

    Ok(())
}

/// Validates config and shows what would be crawled without crawling
async fn handle_check(config: &Config, config_hash: &str) -> anyhow::Result<()> {
    println!("=== newsweep configuration check ===\n");
    println!("Config hash: {}", config_hash);

    println!("\nCoordination:");
    println!("  Backend: {:?}", config.coordination.backend);
    println!("  Store: {}", config.coordination.store_url);
    println!("  Key prefix: {}", config.coordination.key_prefix);
    match config.coordination.lease_timeout_secs {
        0 => println!("  Lease timeout: disabled"),
        secs => println!("  Lease timeout: {}s", secs),
    }

    println!("\nWorker:");
    println!("  Identity: {}", config.worker.worker_id());
    println!("  Batch size: {}", config.worker.batch_size);
    println!("  Parallel sources: {}", config.worker.worker_threads);
    println!("  Sweep interval: {}s", config.worker.sweep_interval_secs);
    println!("  Max items per source: {}", config.worker.max_items_per_source);
    println!("  Full content: {}", config.worker.fetch_full_content);

    println!("\nUser Agent: {}", config.user_agent.user_agent_string());

    println!("\nClassifier: {:?}", config.classifier.kind);
    println!("  Categories: {}", config.classifier.categories.join(", "));
    println!("  Fallback: {}", config.classifier.fallback_label);

    println!("\nPublisher: {:?}", config.publisher.kind);

    let client = build_http_client(&config.user_agent, &config.worker)?;
    let catalog = build_catalog(&config.catalog, client)?;
    let sources = catalog
        .get_all_sources()
        .await
        .context("failed to read the source catalog")?;

    println!("\nSources ({}):", sources.len());
    for source in &sources {
        if source.categories.is_empty() {
            println!("  - {} <{}>", source.name, source.url);
        } else {
            println!(
                "  - {} <{}> [{}]",
                source.name,
                source.url,
                source.categories.join(", ")
            );
        }
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Prints partition counts, plus fleet counters for the shared store
async fn handle_status(config: &Config) -> anyhow::Result<()> {
    let coordinator = build_coordinator(config).await?;
    let status = coordinator.as_dyn().status().await?;

    println!("Backend: {:?}", coordinator.backend());
    match status.sweep_started {
        Some(started) => println!("Sweep started: {}", started.to_rfc3339()),
        None => println!("Sweep started: not seeded"),
    }
    for state in SourceState::all_states() {
        println!("  {:<11} {}", format!("{}:", state), status.count(state));
    }
    println!("  Complete:   {}", status.is_complete() && status.total() > 0);

    if let Coordinator::Shared(shared) = &coordinator {
        let workers = shared.worker_stats().await?;
        println!("\nWorkers ({}):", workers.len());
        for worker in &workers {
            let last = worker
                .last_activity
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string());
            println!(
                "  - {}: {} sources, {} articles, last active {}",
                worker.worker_id, worker.sources_processed, worker.articles_processed, last
            );
        }

        let runs = shared.run_history().await?;
        println!("\nPast sweeps ({}):", runs.len());
        for run in &runs {
            print_summary(run);
        }
    }

    Ok(())
}

async fn handle_reset(config: &Config) -> anyhow::Result<()> {
    let coordinator = build_coordinator(config).await?;
    let summary = coordinator.as_dyn().reset().await?;

    println!("Sweep reset.");
    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &SweepSummary) {
    let duration = summary
        .duration()
        .map(|d| format!("{}s", d.num_seconds()))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  - {} finished {}: {} sources, {} articles, {}",
        summary.run_id,
        summary.finished_at.to_rfc3339(),
        summary.sources_completed,
        summary.articles_processed,
        duration
    );
}
