//! Spindle main entry point
//!
//! This is the command-line interface for the Spindle web crawler.

use clap::Parser;
use spindle::config::load_config_with_hash;
use spindle::crawler::{run_crawl, run_sizing_pass};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Spindle: a continuously-running web crawler
///
/// Spindle expands a crawl frontier from seed URLs, fetching pages,
/// extracting links and metadata, and persisting everything to a local
/// database. Interrupting it is safe; the frontier is durable and a
/// restart picks up where the last run stopped.
#[derive(Parser, Debug)]
#[command(name = "spindle")]
#[command(version = "0.3.0")]
#[command(about = "A continuously-running web crawler", long_about = None)]
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

    /// Validate config and show what would be crawled without crawling
    #[arg(long, conflicts_with_all = ["stats", "size_images"])]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["dry_run", "size_images"])]
    stats: bool,

    /// Backfill image file sizes for stored pages and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    size_images: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config)?;
    } else if cli.stats {
        handle_stats(&config)?;
    } else if cli.size_images {
        handle_size_images(config).await?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("spindle=info,warn"),
            1 => EnvFilter::new("spindle=debug,info"),
            2 => EnvFilter::new("spindle=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would run
fn handle_dry_run(config: &spindle::config::Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Spindle Dry Run ===\n");

    println!("Crawler Configuration:");
    println!(
        "  Fetch workers: {} ({} effective)",
        config.crawler.fetch_workers,
        config.crawler.effective_fetch_workers()
    );
    println!(
        "  Parse workers: {} ({} effective)",
        config.crawler.parse_workers,
        config.crawler.effective_parse_workers()
    );
    println!("  Scale factor: {}", config.crawler.scale_factor);
    println!("  Batch size: {}", config.crawler.batch_size);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!("\nSeed URLs ({}):", config.start_urls.len());
    for url in &config.start_urls {
        println!("  - {}", url);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start crawling with {} seed URLs",
        config.start_urls.len()
    );

    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &spindle::config::Config) -> Result<(), Box<dyn std::error::Error>> {
    use spindle::model::TaskStatus;
    use spindle::storage::{SqliteStorage, Storage};
    use std::path::Path;

    println!("Database: {}\n", config.storage.database_path);

    let storage = SqliteStorage::new(Path::new(&config.storage.database_path))?;

    let pages = storage.count_pages()?;
    let tasks = storage.count_tasks(None)?;
    let pending = storage.count_tasks(Some(TaskStatus::Pending))?;

    println!("Pages stored:     {}", pages);
    println!("Tasks total:      {}", tasks);
    println!("Tasks pending:    {}", pending);

    Ok(())
}

/// Handles the --size-images mode: backfills image file sizes
async fn handle_size_images(
    config: spindle::config::Config,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting image sizing pass");

    let report = run_sizing_pass(config).await?;

    println!("Pages examined: {}", report.pages_examined);
    println!("Images sized:   {}", report.images_sized);
    println!("Images failed:  {}", report.images_failed);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: spindle::config::Config) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting crawl with {} seed URLs", config.start_urls.len());

    match run_crawl(config).await {
        Ok(()) => {
            tracing::info!("Crawl stopped cleanly");
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
