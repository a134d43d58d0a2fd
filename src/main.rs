//! Catalog-Ripple main entry point
//!
//! This is the command-line interface for the Catalog-Ripple category mapper.

use anyhow::Context;
use catalog_ripple::config::{load_config_with_hash, Config};
use catalog_ripple::crawler::{
    resolve_roots, MenuRoots, NodeEvent, RootListing, Scheduler, SchedulerSettings, StaticRoots,
};
use catalog_ripple::output::write_reports;
use catalog_ripple::probe::{HttpProbeFactory, ProbeFactory};
use catalog_ripple::NodeStatus;
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// Catalog-Ripple: a concurrent category-tree cartographer
///
/// Catalog-Ripple walks an online catalog from its top-level categories
/// down, classifying every category page by layout and recording the
/// discovered hierarchy as a leveled report.
#[derive(Parser, Debug)]
#[command(name = "catalog-ripple")]
#[command(version)]
#[command(about = "A concurrent category-tree cartographer", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Only use the roots listed in the config, never read the site menu
    #[arg(long)]
    offline_roots: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config, cli.offline_roots);
        return Ok(());
    }

    handle_crawl(config, &config_hash, cli.offline_roots).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_ripple=info,warn"),
            1 => EnvFilter::new("catalog_ripple=debug,info"),
            2 => EnvFilter::new("catalog_ripple=trace,debug"),
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

fn uses_static_roots(config: &Config, offline_roots: bool) -> bool {
    offline_roots || !config.site.roots.is_empty()
}

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config, offline_roots: bool) {
    println!("=== Catalog-Ripple Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Max attempts: {}", config.crawler.max_attempts);
    println!(
        "  Retry delay: {}ms (max {}ms)",
        config.crawler.retry_delay_ms, config.crawler.retry_max_delay_ms
    );
    println!(
        "  Navigation timeout: {}ms",
        config.crawler.navigation_timeout_ms
    );
    println!("  Node timeout: {}ms", config.crawler.node_timeout_ms);
    match config.crawler.max_depth {
        Some(depth) => println!("  Max depth: {}", depth),
        None => println!("  Max depth: unbounded"),
    }

    println!("\nStability Poll:");
    println!("  Interval: {}ms", config.poll.interval_ms);
    println!("  Stable reads: {}", config.poll.stable_reads);
    println!("  Max polls: {}", config.poll.max_polls);

    println!("\nSite:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  User agent: {}", config.site.user_agent);

    if uses_static_roots(config, offline_roots) {
        println!("\nConfigured Roots ({}):", config.site.roots.len());
        for root in &config.site.roots {
            println!("  - {} ({})", root.name, root.url);
        }
    } else {
        println!("\nRoots: read from the site main menu");
    }

    println!(
        "\nExcluded Roots ({}):",
        config.site.excluded_roots.len()
    );
    for name in &config.site.excluded_roots {
        println!("  - {}", name);
    }

    println!("\nOutput:");
    println!("  Report: {}", config.output.report_path);
    if let Some(database) = &config.output.database_path {
        println!("  Database: {}", database);
    }
    println!(
        "  Exclude root from path: {}",
        config.output.exclude_root_from_path
    );

    println!("\nMarkers:");
    for (key, selector) in config.markers.entries() {
        println!("  {}: {}", key, selector);
    }

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    config_hash: &str,
    offline_roots: bool,
) -> anyhow::Result<()> {
    let started_at = Utc::now();

    let factory: Arc<dyn ProbeFactory> = Arc::new(
        HttpProbeFactory::from_site(&config.site, config.crawler.navigation_timeout())
            .context("building HTTP probe")?,
    );

    let listing: Box<dyn RootListing> = if uses_static_roots(&config, offline_roots) {
        Box::new(StaticRoots::from_config(&config.site))
    } else {
        Box::new(MenuRoots::new(
            Arc::clone(&factory),
            &config.markers,
            config.crawler.navigation_timeout(),
            config.crawler.probe_wait(),
        ))
    };

    let roots = resolve_roots(&*listing, &config.site.excluded_roots).await?;
    let settings = SchedulerSettings::from_config(&config)?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let observer = tokio::spawn(log_events(events_rx));

    let report = Scheduler::new(settings, factory)
        .with_events(events_tx)
        .run(roots)
        .await?;

    // The scheduler dropped its sender, so the observer ends on its own
    let failed = observer.await.context("event observer task")?;

    let written = write_reports(&report, &config.output, config_hash, started_at)?;

    tracing::info!(
        "Done: {} nodes, {} failed, peak {} open sessions, report at {}",
        report.counts.total(),
        failed,
        report.peak_active,
        written
            .first()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    );

    Ok(())
}

/// Logs node events as they arrive and returns how many nodes failed
async fn log_events(mut events: mpsc::UnboundedReceiver<NodeEvent>) -> usize {
    let mut failed = 0;

    while let Some(event) = events.recv().await {
        let path = event.path.join(" / ");
        match event.status {
            NodeStatus::Failed => {
                failed += 1;
                tracing::warn!(
                    "FAILED {} after {} attempts: {}",
                    path,
                    event.attempts,
                    event.error.as_deref().unwrap_or("unknown error")
                );
            }
            status => tracing::debug!(
                "{} {} ({} via {}, {:?})",
                status,
                path,
                event.produced,
                event
                    .strategy
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                event.elapsed
            ),
        }
    }

    failed
}
