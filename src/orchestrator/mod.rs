//! Scrape orchestrator: list article links for a source, then fetch every
//! article's title under the concurrency and start-rate caps.
//!
//! # Run lifecycle
//!
//! ```text
//! Idle -> ListingLinks -> FetchingArticles -> Done
//!              \
//!               -> Failed
//! ```
//!
//! Link listing has no fallback, so every error there fails the run. Article
//! lookups are independent: any error is logged and the article is dropped.

pub mod limiter;

use crate::client::{RequestOptions, RetryingClient, Transport};
use crate::config::CrawlerConfig;
use crate::dom::{Document, keep_anchor_paths, strip_boilerplate};
use crate::error::{CrawlError, Result};
use crate::models::{Article, Source, TraceKind};
use crate::store::TraceStore;
use crate::trace::{Trace, replay_all, replay_text};
use crate::utils::{domain_of, resolve_href};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use std::fmt;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

pub use limiter::RateLimiter;

/// Where the current (or last) run is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RunState {
    Idle = 0,
    ListingLinks = 1,
    FetchingArticles = 2,
    Done = 3,
    Failed = 4,
}

impl RunState {
    fn from_u8(v: u8) -> Self {
        match v {
            1 => RunState::ListingLinks,
            2 => RunState::FetchingArticles,
            3 => RunState::Done,
            4 => RunState::Failed,
            _ => RunState::Idle,
        }
    }
}

/// Crawls one [`Source`] through an injected trace store and HTTP client.
pub struct Orchestrator<S, T> {
    source: Source,
    domain: OnceLock<String>,
    store: S,
    client: RetryingClient<T>,
    limiter: RateLimiter,
    max_at_once: usize,
    state: AtomicU8,
}

impl<S, T> fmt::Debug for Orchestrator<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("source", &self.source)
            .field("domain", &self.domain.get())
            .field("max_at_once", &self.max_at_once)
            .field("max_per_second", &self.limiter.max_per_second())
            .field("state", &self.state())
            .finish()
    }
}

impl<S, T> Orchestrator<S, T> {
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// The domain fixed by the first link listing, if any has run.
    pub fn domain(&self) -> Option<&str> {
        self.domain.get().map(String::as_str)
    }

    pub fn state(&self) -> RunState {
        RunState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: RunState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

impl<S: TraceStore, T: Transport> Orchestrator<S, T> {
    /// Build an orchestrator for `source`.
    ///
    /// # Errors
    ///
    /// [`CrawlError::Configuration`] when the source URL is empty or not a valid
    /// absolute URL, or when `config` fails validation.
    pub fn new(
        source: Source,
        store: S,
        client: RetryingClient<T>,
        config: &CrawlerConfig,
    ) -> Result<Self> {
        if source.url.trim().is_empty() {
            return Err(CrawlError::Configuration(format!(
                "source {:?} has no base url",
                source.name
            )));
        }
        Url::parse(&source.url).map_err(|e| {
            CrawlError::Configuration(format!("source url {:?} is invalid: {e}", source.url))
        })?;
        config.validate()?;

        Ok(Self {
            source,
            domain: OnceLock::new(),
            store,
            client,
            limiter: RateLimiter::new(config.max_per_second),
            max_at_once: config.max_at_once,
            state: AtomicU8::new(RunState::Idle as u8),
        })
    }

    fn ensure_domain(&self, url: &str) -> Result<&str> {
        if self.domain.get().is_none() {
            let domain = domain_of(url)
                .ok_or_else(|| CrawlError::Configuration(format!("no host in url {url:?}")))?;
            // First writer wins.
            let _ = self.domain.set(domain);
        }
        self.domain
            .get()
            .map(String::as_str)
            .ok_or_else(|| CrawlError::Configuration("domain not set".to_string()))
    }

    /// Absolute article URLs found on the listing page at `url`, grouped by
    /// trace in trace order.
    ///
    /// # Errors
    ///
    /// Every failure is returned: HTTP errors, a missing `article_links` trace
    /// set ([`CrawlError::PatternNotFound`]), or no trace resolving
    /// ([`CrawlError::ReplayMiss`]).
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn get_article_links(&self, url: &str) -> Result<Vec<String>> {
        let domain = self.ensure_domain(url)?;
        let response = self.client.get(url, &RequestOptions::default()).await?;
        let doc = keep_anchor_paths(&Document::parse(&response.body));

        let set = self
            .store
            .read_by_and_type(&self.source.id, TraceKind::ArticleLinks)
            .await?;
        let anchors = replay_all(&doc, doc.root(), &set.traces);
        if anchors.is_empty() {
            return Err(CrawlError::ReplayMiss {
                kind: TraceKind::ArticleLinks,
                url: url.to_string(),
            });
        }

        let links: Vec<String> = anchors
            .into_iter()
            .filter_map(|a| doc.attr(a, "href"))
            .filter_map(|href| resolve_href(domain, href))
            .unique()
            .collect();

        info!(
            count = links.len(),
            traces = set.traces.len(),
            "Listed article links"
        );
        debug!(links = ?links, "Article links");
        Ok(links)
    }

    /// The article at `url`, or `None` if anything along the way fails.
    #[instrument(level = "info", skip_all, fields(%url))]
    pub async fn get_article_info(&self, url: &str) -> Option<Article> {
        let result = async {
            let set = self
                .store
                .read_by_and_type(&self.source.id, TraceKind::ArticleTitle)
                .await?;
            self.fetch_article(url, &set.traces).await
        }
        .await;
        log_article_result(url, result)
    }

    async fn fetch_article(&self, url: &str, title_traces: &[Trace]) -> Result<Article> {
        let response = self.client.get(url, &RequestOptions::default()).await?;
        let doc = strip_boilerplate(&Document::parse(&response.body));
        let title = replay_text(&doc, doc.root(), title_traces, TraceKind::ArticleTitle, url)?;
        if title.is_empty() {
            // a blank heading is not a usable title
            return Err(CrawlError::ReplayMiss {
                kind: TraceKind::ArticleTitle,
                url: url.to_string(),
            });
        }

        let domain = match self.domain() {
            Some(d) => d.to_string(),
            None => domain_of(url)
                .ok_or_else(|| CrawlError::Configuration(format!("no host in url {url:?}")))?,
        };
        Ok(Article::new(domain, url, title))
    }

    /// List links from `url`, then fetch every article.
    ///
    /// Articles come back in link order; articles that failed are left out.
    ///
    /// # Errors
    ///
    /// Only link listing errors are returned; the run is then [`RunState::Failed`].
    #[instrument(level = "info", skip_all, fields(source = %self.source.id, %url))]
    pub async fn run(&self, url: &str) -> Result<Vec<Article>> {
        self.set_state(RunState::ListingLinks);
        let links = match self.get_article_links(url).await {
            Ok(links) => links,
            Err(e) => {
                error!(error = %e, "Link listing failed; aborting run");
                self.set_state(RunState::Failed);
                return Err(e);
            }
        };

        self.set_state(RunState::FetchingArticles);
        let title_traces = match self
            .store
            .read_by_and_type(&self.source.id, TraceKind::ArticleTitle)
            .await
        {
            Ok(set) => set.traces,
            Err(e) => {
                warn!(error = %e, links = links.len(), "No title traces; every article would be skipped");
                self.set_state(RunState::Done);
                return Ok(Vec::new());
            }
        };

        info!(
            links = links.len(),
            max_at_once = self.max_at_once,
            max_per_second = self.limiter.max_per_second(),
            "Fetching articles"
        );
        let traces = title_traces.as_slice();
        let articles: Vec<Article> = stream::iter(links.iter())
            .map(|link| async move {
                self.limiter.acquire().await;
                log_article_result(link, self.fetch_article(link, traces).await)
            })
            .buffered(self.max_at_once)
            .filter_map(std::future::ready)
            .collect()
            .await;

        info!(
            total = links.len(),
            successful = articles.len(),
            failed = links.len() - articles.len(),
            "Run complete"
        );
        self.set_state(RunState::Done);
        Ok(articles)
    }
}

fn log_article_result(url: &str, result: Result<Article>) -> Option<Article> {
    match result {
        Ok(article) => {
            debug!(%url, title = %article.title, "Fetched article");
            Some(article)
        }
        Err(e @ CrawlError::ReplayMiss { .. }) => {
            warn!(%url, error = %e, "No title found; skipping article");
            None
        }
        Err(e) => {
            error!(%url, error = %e, "Article fetch failed; skipping article");
            None
        }
    }
}
