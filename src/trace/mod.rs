//! Traces: root-first tag-name paths to an element of interest.
//!
//! A trace such as `["body", "div", "a"]` says "the anchors that are direct
//! children of a `div` that is a direct child of `body`". Traces are computed
//! once (by discovery) and replayed on every later fetch by [`engine`].

pub mod engine;

use crate::error::{CrawlError, Result};
use crate::models::TraceKind;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use engine::{compute_trace, dedupe_traces, replay, replay_all, replay_text};

/// An immutable, non-empty, root-first sequence of tag names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Trace(Vec<String>);

impl Trace {
    pub fn new(tags: Vec<String>) -> Result<Self> {
        if tags.is_empty() {
            return Err(CrawlError::InvalidTrace("trace is empty".to_string()));
        }
        if let Some(blank) = tags.iter().position(|t| t.trim().is_empty()) {
            return Err(CrawlError::InvalidTrace(format!(
                "blank tag name at position {blank}"
            )));
        }
        Ok(Self(tags))
    }

    pub fn tags(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The tag the trace points at.
    pub fn target(&self) -> &str {
        // non-empty by construction
        self.0.last().map(String::as_str).unwrap_or_default()
    }

    /// Check the trace ends in a tag `kind` accepts.
    pub fn validate_for(&self, kind: TraceKind) -> Result<()> {
        if kind.accepts_target(self.target()) {
            Ok(())
        } else {
            Err(CrawlError::InvalidTrace(format!(
                "{kind} trace must not end in <{}>: {self}",
                self.target()
            )))
        }
    }
}

impl TryFrom<Vec<String>> for Trace {
    type Error = CrawlError;

    fn try_from(tags: Vec<String>) -> Result<Self> {
        Trace::new(tags)
    }
}

impl From<Trace> for Vec<String> {
    fn from(trace: Trace) -> Self {
        trace.0
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(" > "))
    }
}
