//! podcrawl CLI
//!
//! Each command runs one stage of the catalog crawl and exits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use podcrawl::{
    error::{AppError, Result},
    models::{CompactShow, Config, Feed, Genre, RunReport, Show, ShowDetails},
    pipeline,
    services::{Dispatcher, LogProgress},
    storage::{
        self, CatalogStorage, COMPACT_FILE, DETAILS_FILE, FEEDS_FILE, GENRES_FILE, LocalStorage,
        SHOWS_FILE,
    },
};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

/// podcrawl - iTunes Podcast Catalog Crawler
#[derive(Parser, Debug)]
#[command(
    name = "podcrawl",
    version,
    about = "Incremental iTunes podcast catalog crawler"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "podcrawl.toml")]
    config: PathBuf,

    /// Output directory (overrides paths.output_dir)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve genres from the genre index page
    Genres,

    /// Resolve shows from every genre page
    Shows {
        /// Genres file (default: {out}/genres.json)
        genres: Option<PathBuf>,
    },

    /// Fetch lookup details for the next chunk of uncached shows
    Details {
        /// Shows file (default: {out}/shows.json)
        shows: Option<PathBuf>,

        /// Maximum number of shows fetched in this run
        #[arg(long)]
        chunk: Option<usize>,

        /// Minimum milliseconds between two lookups
        #[arg(long)]
        interval_ms: Option<u64>,
    },

    /// Fetch RSS feeds for the next chunk of uncached shows
    Feeds {
        /// Details file (default: {out}/shows.details.json)
        details: Option<PathBuf>,

        /// Maximum number of feeds fetched in this run
        #[arg(long)]
        chunk: Option<usize>,
    },

    /// Join every catalog file into shows.compact.json
    Compact,

    /// Validate the configuration
    Validate,

    /// Show counts of every catalog file
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Load the input list of a stage, from `path` or from the output directory.
async fn load_input<T: DeserializeOwned>(
    storage: &dyn CatalogStorage,
    path: Option<&Path>,
    key: &str,
) -> Result<Vec<T>> {
    match path {
        Some(path) => storage::load_list_from_path(path).await,
        None => storage::load_required(storage, key).await,
    }
}

/// Turn failed targets into a non-zero exit once results are saved.
fn check(report: RunReport) -> Result<()> {
    if report.has_failures() {
        return Err(AppError::FetchFailures {
            command: report.command,
            failed: report.failed,
            total: report.fetched + report.failed,
        });
    }
    Ok(())
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, finishing the current lookup and saving...");
            token.cancel();
        }
    });
}

async fn log_count<T: DeserializeOwned>(storage: &dyn CatalogStorage, key: &str) {
    let bytes = match storage.read_bytes(key).await {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            log::info!("{:<20} {:>8}", key, "missing");
            return;
        }
        Err(e) => {
            log::warn!("{:<20} unreadable: {}", key, e);
            return;
        }
    };
    match serde_json::from_slice::<Vec<T>>(&bytes) {
        Ok(entries) => log::info!("{:<20} {:>8} entries", key, entries.len()),
        Err(e) => log::warn!("{:<20} corrupt: {}", key, e),
    }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    if let Some(out) = cli.out {
        config.paths.output_dir = out;
    }
    if config.paths.output_dir.is_file() {
        return Err(AppError::config(format!(
            "output path {} is a file",
            config.paths.output_dir.display()
        )));
    }
    log::info!("Output directory: {}", config.paths.output_dir.display());

    let storage = LocalStorage::new(&config.paths.output_dir);

    match cli.command {
        Command::Genres => {
            config.validate()?;
            let dispatcher = dispatcher(&config)?;
            let report = pipeline::run_genres(&config, &storage, &dispatcher).await?;
            check(report)?;
        }

        Command::Shows { genres } => {
            config.validate()?;
            let genres: Vec<Genre> = load_input(&storage, genres.as_deref(), GENRES_FILE).await?;
            let dispatcher = dispatcher(&config)?;
            let report = pipeline::run_shows(&config, &storage, &dispatcher, &genres).await?;
            check(report)?;
        }

        Command::Details {
            shows,
            chunk,
            interval_ms,
        } => {
            if let Some(chunk) = chunk {
                config.crawler.chunk_size = chunk;
            }
            if let Some(interval_ms) = interval_ms {
                config.crawler.rate_interval_ms = interval_ms;
            }
            config.validate()?;

            let shows: Vec<Show> = load_input(&storage, shows.as_deref(), SHOWS_FILE).await?;
            let dispatcher = dispatcher(&config)?;

            let cancel = CancellationToken::new();
            cancel_on_ctrl_c(cancel.clone());

            let report =
                pipeline::run_details(&config, &storage, &dispatcher, &shows, &cancel).await?;
            check(report)?;
        }

        Command::Feeds { details, chunk } => {
            if let Some(chunk) = chunk {
                config.crawler.chunk_size = chunk;
            }
            config.validate()?;

            let details: Vec<ShowDetails> =
                load_input(&storage, details.as_deref(), DETAILS_FILE).await?;
            let dispatcher = dispatcher(&config)?;
            let report = pipeline::run_feeds(&config, &storage, &dispatcher, &details).await?;
            check(report)?;
        }

        Command::Compact => {
            pipeline::run_compact(&storage).await?;
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
        }

        Command::Info => {
            log::info!("Config file: {}", cli.config.display());
            log::info!("Compact output: {}", config.output_file(COMPACT_FILE).display());
            log::info!("Chunk size: {}", config.crawler.chunk_size);
            log::info!("Lookup interval: {:?}", config.crawler.rate_interval());
            log_count::<Genre>(&storage, GENRES_FILE).await;
            log_count::<Show>(&storage, SHOWS_FILE).await;
            log_count::<ShowDetails>(&storage, DETAILS_FILE).await;
            log_count::<Feed>(&storage, FEEDS_FILE).await;
            log_count::<CompactShow>(&storage, COMPACT_FILE).await;
        }
    }

    log::info!("Done!");

    Ok(())
}

fn dispatcher(config: &Config) -> Result<Dispatcher> {
    Ok(Dispatcher::from_config(&config.crawler)?.with_progress(Arc::new(LogProgress)))
}
