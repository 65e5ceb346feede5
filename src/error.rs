//! Error taxonomy for the crawler core.
//!
//! Call sites decide severity: link listing propagates every variant with `?`,
//! while per-article lookups downgrade any error to "no result".

use crate::models::TraceKind;
use reqwest::Method;

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Every failure the crawler can surface.
#[derive(Debug, thiserror::Error)]
pub enum CrawlError {
    /// A required static setting is missing or invalid. Raised at construction.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No trace set exists for a (source, kind) pair.
    #[error("no {kind} traces found for source {source_id}")]
    PatternNotFound { source_id: String, kind: TraceKind },

    /// Every supplied trace failed to resolve against a document.
    #[error("no {kind} trace resolved against {url}")]
    ReplayMiss { kind: TraceKind, url: String },

    /// 429/502/503/504 still returned after the retry budget was spent.
    #[error("{method} {url} returned {status} after exhausting retries")]
    TransientHttp {
        method: Method,
        url: String,
        status: u16,
    },

    /// Any other non-2xx status.
    #[error("{method} {url} returned {status}")]
    TerminalHttp {
        method: Method,
        url: String,
        status: u16,
    },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A trace broke the shape invariants of its kind.
    #[error("invalid trace: {0}")]
    InvalidTrace(String),

    /// Attempted to replace the traces of a trusted set.
    #[error("trace set {0} is finalised")]
    TraceSetFinalised(String),

    #[error("trace store error: {0}")]
    Store(String),

    #[error("pattern discovery failed: {0}")]
    Discovery(String),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl CrawlError {
    /// The HTTP status carried by the error, if it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            CrawlError::TransientHttp { status, .. } | CrawlError::TerminalHttp { status, .. } => {
                Some(*status)
            }
            CrawlError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_not_found_message() {
        let e = CrawlError::PatternNotFound {
            source_id: "https://example.com".to_string(),
            kind: TraceKind::ArticleLinks,
        };
        assert_eq!(
            e.to_string(),
            "no article_links traces found for source https://example.com"
        );
    }

    #[test]
    fn test_status_from_http_errors() {
        let e = CrawlError::TerminalHttp {
            method: Method::GET,
            url: "https://example.com".to_string(),
            status: 404,
        };
        assert_eq!(e.status(), Some(404));
        assert_eq!(CrawlError::Store("boom".to_string()).status(), None);
    }
}
