use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use lyrics_dataset::catalog::load_catalog;
use lyrics_dataset::cleaner::LyricsCleaner;
use lyrics_dataset::client::RateLimitedClient;
use lyrics_dataset::config::Settings;
use lyrics_dataset::credits::CreditExtractor;
use lyrics_dataset::matching::MatchValidator;
use lyrics_dataset::observe::{install_run_logger, Observer};
use lyrics_dataset::pipeline::Pipeline;
use lyrics_dataset::progress::{format_duration, Progress};
use lyrics_dataset::providers::{GeniusClient, SpotifyClient};
use lyrics_dataset::resolver::LyricsResolver;
use lyrics_dataset::safety::validate_dataset_path;
use lyrics_dataset::store::DatasetStore;

#[derive(Parser)]
#[command(name = "lyrics-dataset")]
#[command(about = "Resolve, clean and persist lyrics for a catalog of tracks")]
struct Args {
    /// Catalog input (JSON array of tracks)
    catalog: PathBuf,

    /// Dataset file to append to (JSON array)
    dataset: PathBuf,

    /// Optional TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Append log lines to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Hide the progress bar and print periodic progress lines
    #[arg(long)]
    log_only: bool,

    /// Write run statistics as JSON to this path
    #[arg(long)]
    stats: Option<PathBuf>,

    #[arg(long, env = "GENIUS_API_TOKEN", hide_env_values = true)]
    genius_token: String,

    #[arg(long, env = "SPOTIFY_ACCESS_TOKEN", hide_env_values = true)]
    spotify_token: String,

    /// Only process the first N catalog entries
    #[arg(long)]
    limit: Option<usize>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    validate_dataset_path(&args.dataset, &args.catalog)?;
    let settings = Settings::load(args.config.as_deref())?;
    let _log_guard = install_run_logger(args.log_file.as_deref())?;

    let mut catalog = load_catalog(&args.catalog)?;
    if let Some(limit) = args.limit {
        catalog.truncate(limit);
    }
    info!(entries = catalog.len(), catalog = %args.catalog.display(), "catalog loaded");

    let genius = GeniusClient::new(&args.genius_token, settings.request_timeout)
        .context("Failed to build lyric-source client")?;
    let spotify = SpotifyClient::new(&args.spotify_token, settings.request_timeout, settings.registry)
        .context("Failed to build catalog-source client")?;

    let client = RateLimitedClient::new(settings.retry);
    let resolver = LyricsResolver::new(
        &client,
        &genius,
        &genius,
        MatchValidator::new(settings.match_threshold),
        LyricsCleaner::new(settings.min_chars)?,
        CreditExtractor::new(settings.probes),
        settings.resolver,
    );
    let store = DatasetStore::new(&args.dataset);
    let pipeline = Pipeline::new(resolver, &client, &spotify, &store);

    let obs = Observer::new();
    let progress = Progress::new(catalog.len() as u64, "Resolving lyrics", args.log_only);
    let stats = pipeline.run(&obs, &catalog, &progress)?;
    progress.finish("done");

    println!("\n{:=<60}", "");
    println!("Run complete!");
    println!("  Catalog entries: {}", stats.catalog_entries);
    println!("  Processed: {}", stats.processed);
    println!(
        "  Resolved: {} clean, {} unverified ({:.1}%)",
        stats.resolved_clean,
        stats.resolved_fallback,
        stats.resolve_rate()
    );
    println!("  Unresolved: {}", stats.unresolved);
    println!(
        "  Skipped: {} already stored, {} duplicate, {} invalid",
        stats.skipped_existing, stats.skipped_duplicate, stats.skipped_invalid
    );
    println!(
        "  Retries: {} backoff, {} rate-limit waits ({} provider calls)",
        stats.backoff_retries,
        stats.rate_limit_waits,
        client.call_count()
    );
    println!("  Elapsed: {}", format_duration(Duration::from_secs_f64(stats.elapsed_seconds)));
    println!("  Dataset: {}", args.dataset.display());
    println!("{:=<60}", "");

    if let Some(path) = &args.stats {
        stats
            .write_to_file(path)
            .with_context(|| format!("Failed to write stats: {:?}", path))?;
        info!(path = %path.display(), "stats written");
    }

    Ok(())
}
