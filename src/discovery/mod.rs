//! Pattern discovery: producing the first traces for a source nobody has
//! crawled yet.
//!
//! The crawler core never looks inside a discoverer; it only needs traces that
//! satisfy the invariants of their kind. Implementations:
//!
//! - [`StaticDiscoverer`]: canned traces, for fixtures and hand-written patterns
//! - [`HeuristicLinkDiscoverer`]: picks article anchors with a [`LinkHeuristic`]
//! - [`HeadingTitleDiscoverer`]: traces the page's top heading
//!
//! [`TraceBootstrapper`] is the write side: it decides when discovery runs and
//! stores the result.

pub mod bootstrap;
pub mod heuristics;

use crate::dom::{Document, keep_anchor_paths, strip_boilerplate};
use crate::error::{CrawlError, Result};
use crate::trace::{Trace, compute_trace, dedupe_traces};
use itertools::Itertools;
use tracing::{debug, info, instrument};

pub use bootstrap::TraceBootstrapper;
pub use heuristics::LinkHeuristic;

/// Something that can propose traces for a page.
pub trait PatternDiscoverer {
    /// Traces for the page at `url`, whose body is `html`.
    async fn discover(&self, url: &str, html: &str) -> Result<Vec<Trace>>;
}

/// Returns the same traces for every page.
#[derive(Debug, Clone, Default)]
pub struct StaticDiscoverer {
    traces: Vec<Trace>,
}

impl StaticDiscoverer {
    pub fn new(traces: Vec<Trace>) -> Self {
        Self { traces }
    }
}

impl PatternDiscoverer for StaticDiscoverer {
    async fn discover(&self, _url: &str, _html: &str) -> Result<Vec<Trace>> {
        Ok(self.traces.clone())
    }
}

/// Link traces from the anchors a [`LinkHeuristic`] accepts.
///
/// Candidates are picked on the boilerplate-stripped page, then traced on the
/// anchor-path view the orchestrator replays against, so stored traces match
/// what the crawl will see. Equivalent paths collapse into one trace.
#[derive(Debug, Clone, Default)]
pub struct HeuristicLinkDiscoverer {
    heuristic: LinkHeuristic,
}

impl HeuristicLinkDiscoverer {
    pub fn new(heuristic: LinkHeuristic) -> Self {
        Self { heuristic }
    }

    pub fn heuristic(&self) -> LinkHeuristic {
        self.heuristic
    }
}

impl PatternDiscoverer for HeuristicLinkDiscoverer {
    #[instrument(level = "info", skip_all, fields(%url, heuristic = %self.heuristic))]
    async fn discover(&self, url: &str, html: &str) -> Result<Vec<Trace>> {
        let page = Document::parse(html);
        let full = strip_boilerplate(&page);
        let links: Vec<String> = self
            .heuristic
            .select(&full)
            .into_iter()
            .filter_map(|a| full.attr(a, "href"))
            .map(str::to_string)
            .unique()
            .collect();
        debug!(candidates = links.len(), "Heuristic selected anchors");

        let traces = dedupe_traces(&links, &keep_anchor_paths(&page));
        if traces.is_empty() {
            return Err(CrawlError::Discovery(format!(
                "heuristic {} found no article links on {url}",
                self.heuristic
            )));
        }
        info!(links = links.len(), traces = traces.len(), "Discovered link traces");
        Ok(traces)
    }
}

/// Title trace of the first heading on an article page, preferring `h1`,
/// then `h2`, and so on.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadingTitleDiscoverer;

impl PatternDiscoverer for HeadingTitleDiscoverer {
    #[instrument(level = "info", skip_all, fields(%url))]
    async fn discover(&self, url: &str, html: &str) -> Result<Vec<Trace>> {
        let doc = strip_boilerplate(&Document::parse(html));
        let heading = ["h1", "h2", "h3", "h4", "h5", "h6"]
            .into_iter()
            .find_map(|h| {
                doc.find_all(h)
                    .into_iter()
                    .find(|&n| !doc.text(n).is_empty())
            })
            .ok_or_else(|| CrawlError::Discovery(format!("no heading found on {url}")))?;

        let trace = compute_trace(&doc, heading)
            .ok_or_else(|| CrawlError::Discovery(format!("could not trace heading on {url}")))?;
        info!(%trace, title = %doc.text(heading), "Discovered title trace");
        Ok(vec![trace])
    }
}
