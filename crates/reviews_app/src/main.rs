mod config;
mod headless;
mod session;

use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use engine_logging::{engine_info, LogDestination};
use log::LevelFilter;
use reviews_core::{DisplayItem, ReviewsState, ViewState};
use reviews_engine::{
    HttpReviewsProvider, ImageLoader, LoaderSettings, RasterImageDecoder, ReqwestTransport,
    TransportSettings,
};
use url::Url;

use config::{load_config, DEFAULT_CONFIG_FILENAME};
use headless::HeadlessFeed;
use session::ReviewsSession;

/// Pages through a reviews endpoint the way the reviews screen does and
/// prints the resulting rows.
#[derive(Debug, Parser)]
#[command(name = "reviews", version)]
struct Cli {
    /// RON config file; missing files fall back to defaults.
    #[arg(long, default_value = DEFAULT_CONFIG_FILENAME)]
    config: PathBuf,

    /// Reviews endpoint, overriding the config file.
    #[arg(long, env = "REVIEWS_ENDPOINT")]
    endpoint: Option<String>,

    /// Reviews per page.
    #[arg(long)]
    limit: Option<usize>,

    /// Also write logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = Some(endpoint);
    }
    if let Some(limit) = cli.limit {
        config.page_limit = limit;
    }
    if cli.log_file.is_some() {
        config.log_file = cli.log_file;
    }

    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let destination = match config.log_file.clone() {
        Some(path) => LogDestination::Both(path),
        None => LogDestination::Terminal,
    };
    engine_logging::initialize(destination, level);

    let Some(endpoint) = config.endpoint.as_deref() else {
        bail!("no reviews endpoint configured; pass --endpoint or set it in the config file");
    };
    let endpoint = Url::parse(endpoint).with_context(|| format!("invalid endpoint {endpoint:?}"))?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    let page_transport = ReqwestTransport::new(TransportSettings::for_json())?;
    let image_transport = ReqwestTransport::new(TransportSettings::for_images())?;
    let provider = HttpReviewsProvider::new(endpoint, Arc::new(page_transport));
    let images = ImageLoader::new(
        Arc::new(image_transport),
        Arc::new(RasterImageDecoder),
        LoaderSettings {
            max_concurrent_fetches: config.max_concurrent_fetches,
            cache_max_cost: config.cache_max_bytes,
        },
        runtime.handle().clone(),
    );

    let (state_tx, state_rx) = mpsc::channel::<ViewState>();
    let session = ReviewsSession::spawn(
        ReviewsState::with_limit(config.page_limit),
        Arc::new(provider),
        images,
        runtime.handle().clone(),
        Box::new(move |state: ViewState| {
            let _ = state_tx.send(state);
        }),
    );

    let feed = HeadlessFeed::new(
        &session,
        &state_rx,
        config.viewport,
        Duration::from_secs(config.idle_timeout_secs),
        config.max_pages,
    );
    let outcome = feed.scroll_to_end();

    if let Some(state) = &outcome.last_state {
        print_rows(state);
    }
    engine_info!(
        "Done: complete={} page_requests={} cached_images={}",
        outcome.complete,
        outcome.page_requests,
        session.images().cache().len()
    );
    session.shutdown();

    if !outcome.complete {
        bail!("stopped before the last page was loaded");
    }
    Ok(())
}

fn print_rows(state: &ViewState) {
    for item in &state.items {
        match item {
            DisplayItem::Review(row) => {
                let stars: String = (0..row.rating.total)
                    .map(|i| if i < row.rating.filled { '★' } else { '☆' })
                    .collect();
                println!("{} {} ({})", stars, row.username, row.created);
                println!("    {}", row.text);
                if !row.photo_urls.is_empty() {
                    println!("    {} photo(s)", row.photo_urls.len());
                }
            }
            DisplayItem::Loader(_) => println!("..."),
            DisplayItem::Footer(footer) => println!("{}", footer.text()),
        }
    }
}
