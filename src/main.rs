use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use tracing::{error, info, warn};

use trawler::config::Config;
use trawler::db::{self, Database, SqliteDatabase, StoreConfig};
use trawler::fetch::file::FileFetcher;
use trawler::fetch::render::RenderServiceFetcher;
use trawler::fetch::{Browser, Credentials, FetchRequest, PageFetcher};
use trawler::output::{csv, terminal};
use trawler::pipeline::ingest::{self, IngestRequest};
use trawler::profile::client::HttpProfileLookup;
use trawler::profile::rate_limiter::RateLimiter;
use trawler::profile::traits::UnconfiguredProfileLookup;
use trawler::profile::{ProfileLookup, ProfileResolver};

/// Trawler: collect search-result posts into a relational store.
///
/// Fetches the scrolled results page for a query, extracts every post,
/// resolves author profiles and saves posts, hashtags and the search that
/// found them.
#[derive(Parser)]
#[command(name = "trawler", version, about)]
struct Cli {
    /// Search query to collect posts for
    query: String,

    /// Store credential: the SQLite database the run writes to
    store: PathBuf,

    /// Front-end username ("anonymous" skips login)
    #[arg(short, long, default_value = Credentials::ANONYMOUS)]
    username: String,

    /// Front-end password ("anonymous" skips login)
    #[arg(short, long, default_value = Credentials::ANONYMOUS)]
    password: String,

    /// Browser the render service should drive
    #[arg(short, long, value_enum, default_value_t = Browser::Firefox)]
    browser: Browser,

    /// Page-down scrolls before capturing the page
    #[arg(long, default_value = "5")]
    scrolls: u32,

    /// Seconds to let the page settle after each step
    #[arg(long, default_value = "5")]
    idle: u64,

    /// Profile lookups in flight at once
    #[arg(long, default_value = "4")]
    concurrency: usize,

    /// Read saved results-page markup instead of driving a browser
    #[arg(long)]
    markup_file: Option<PathBuf>,

    /// Also export the run's posts to a new CSV file
    #[arg(long)]
    csv: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("trawler=info")),
        )
        .init();

    let cli = Cli::parse();

    // Refuse before doing any work, so an existing export is never clobbered
    if let Some(path) = &cli.csv {
        if path.exists() {
            println!("File already exists");
            std::process::exit(1);
        }
    }

    let config = Config::load()?;

    let store = StoreConfig::new(&cli.store);
    let conn = db::initialize(&store)?;
    let db = SqliteDatabase::new(conn);
    let table_count = db.table_count().await?;
    info!(path = %store.db_path.display(), tables = table_count, "Store ready");

    let fetcher: Box<dyn PageFetcher> = match &cli.markup_file {
        Some(path) => Box::new(FileFetcher::new(path)),
        None => Box::new(RenderServiceFetcher::new(
            &config.render_url,
            &config.login_url,
            &config.query_url,
        )?),
    };

    let (lookup, limiter): (Arc<dyn ProfileLookup>, RateLimiter) = if config.has_profile_api() {
        (
            Arc::new(HttpProfileLookup::new(
                &config.profile_api_url,
                &config.profile_bearer_token,
            )?),
            RateLimiter::per_second(config.profile_qps),
        )
    } else {
        warn!("TRAWLER_PROFILE_BEARER_TOKEN not set; author profiles will be empty");
        (Arc::new(UnconfiguredProfileLookup), RateLimiter::unlimited())
    };
    let resolver = ProfileResolver::new(lookup, limiter, config.profile_timeout);

    let request = IngestRequest {
        fetch: FetchRequest {
            query: cli.query.clone(),
            credentials: Credentials::from_cli(&cli.username, &cli.password),
            scrolls: cli.scrolls,
            idle: Duration::from_secs(cli.idle),
            browser: cli.browser,
        },
        username: cli.username.clone(),
        fetch_timeout: config.fetch_timeout,
        concurrency: cli.concurrency,
    };

    println!("Collecting posts for \"{}\"...", cli.query);
    let outcome = match ingest::run(fetcher.as_ref(), &resolver, &db, &request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            if e.is_fatal() {
                error!(query = cli.query.as_str(), error = %e, "Run aborted");
            } else {
                warn!(query = cli.query.as_str(), error = %e, "Run stopped early");
            }
            return Err(e.into());
        }
    };

    terminal::display_posts(&outcome.posts, 10);
    terminal::display_run_summary(&outcome.summary);
    terminal::display_store_counts(&db.store_counts().await?);

    if let Some(path) = &cli.csv {
        match csv::write_csv(path, &outcome.posts) {
            Ok(()) => println!(
                "\n{} {}",
                "CSV written to".green(),
                path.display()
            ),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                println!("File already exists");
                std::process::exit(1);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
