//! # trace_crawler
//!
//! Crawls one news source with stored traces and writes the scraped articles
//! as JSON.
//!
//! ## Usage
//!
//! ```sh
//! trace_crawler -u https://lite.cnn.com -s ./traces.yaml -o ./json
//! ```
//!
//! ## Pipeline
//!
//! 1. **Bootstrap** (with `--discover`): discover link and title traces for
//!    sources that have no finalised ones
//! 2. **Listing**: replay the link traces against the listing page
//! 3. **Fetching**: fetch every article's title concurrently under the
//!    configured caps
//! 4. **Output**: write the articles JSON and flush the trace store

use clap::Parser;
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};
use trace_crawler::client::{ReqwestTransport, RetryingClient};
use trace_crawler::config::CrawlerConfig;
use trace_crawler::discovery::{HeadingTitleDiscoverer, HeuristicLinkDiscoverer, TraceBootstrapper};
use trace_crawler::models::{Source, TraceKind};
use trace_crawler::orchestrator::Orchestrator;
use trace_crawler::outputs::json;
use trace_crawler::store::FileTraceStore;
use trace_crawler::utils::domain_of;

mod cli;

use cli::Cli;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("trace_crawler starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Config ----
    let mut config = match &args.config {
        Some(path) => CrawlerConfig::load(path).await?,
        None => CrawlerConfig::default(),
    };
    if let Some(n) = args.max_at_once {
        config.max_at_once = n;
    }
    if let Some(n) = args.max_per_second {
        config.max_per_second = n;
    }
    config.validate()?;

    // ---- Wiring ----
    let name = args
        .name
        .clone()
        .or_else(|| domain_of(&args.url))
        .unwrap_or_else(|| args.url.clone());
    let source = Source::new(name, &args.url);
    let store = Arc::new(FileTraceStore::open(&args.store).await?);
    let client = RetryingClient::new(ReqwestTransport::new(&config.transport)?, config.retry_policy()?);
    let orchestrator = Orchestrator::new(source.clone(), Arc::clone(&store), client.clone(), &config)?;
    info!(source = %source.id, store = %store.path().display(), "Crawler ready");

    // ---- Bootstrap traces ----
    if args.discover {
        let bootstrapper = TraceBootstrapper::new(Arc::clone(&store), client.clone());
        bootstrapper
            .ensure_traces(
                &source,
                TraceKind::ArticleLinks,
                &args.url,
                &HeuristicLinkDiscoverer::new(args.heuristic),
            )
            .await?;

        let links = orchestrator.get_article_links(&args.url).await?;
        match links.first() {
            Some(first) => {
                bootstrapper
                    .ensure_traces(&source, TraceKind::ArticleTitle, first, &HeadingTitleDiscoverer)
                    .await?;
            }
            None => warn!("No article links to discover a title trace from"),
        }
    }

    // ---- Crawl ----
    let articles = orchestrator.run(&args.url).await?;

    // ---- Output ----
    let domain = orchestrator
        .domain()
        .map(str::to_string)
        .or_else(|| domain_of(&args.url))
        .unwrap_or_else(|| source.name.clone());
    let path = json::write_articles(&args.output_dir, &domain, &articles).await?;
    store.flush().await?;

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        articles = articles.len(),
        path = %path.display(),
        "Execution complete"
    );
    Ok(())
}
