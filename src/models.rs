//! Data models shared by the crawler core and its collaborators.
//!
//! - [`Source`]: external identity of a crawled site
//! - [`TraceKind`] / [`TraceSet`]: the persisted, per-source path sets
//! - [`Article`]: transient output of a run, handed to an external persistence layer
//!
//! The persisted trace set shape uses the wire names `sourceId`, `type` and
//! `is_finalised`, hence the serde renames.

use crate::error::{CrawlError, Result};
use crate::trace::Trace;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The extraction target a trace set describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    /// Paths from `body` down to article anchors on a listing page.
    ArticleLinks,
    /// Paths from `body` down to the headline of an article page.
    ArticleTitle,
}

impl TraceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceKind::ArticleLinks => "article_links",
            TraceKind::ArticleTitle => "article_title",
        }
    }

    /// Whether `tag` is an acceptable last element for a trace of this kind.
    pub fn accepts_target(&self, tag: &str) -> bool {
        match self {
            TraceKind::ArticleLinks => tag == "a",
            TraceKind::ArticleTitle => {
                matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
            }
        }
    }
}

impl fmt::Display for TraceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A crawled site. The id is the canonical URL, which doubles as the store key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub name: String,
    pub url: String,
}

impl Source {
    /// Build a source from a human name and a URL, canonicalising the URL by
    /// dropping any trailing slash.
    pub fn new(name: impl Into<String>, url: &str) -> Self {
        let canonical = url.trim_end_matches('/').to_string();
        Self {
            id: canonical.clone(),
            name: name.into(),
            url: canonical,
        }
    }
}

/// All traces of one kind for one source.
///
/// Traces are immutable values; changing a set means replacing its trace list
/// through [`TraceSet::apply`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSet {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "sourceId")]
    pub source_id: String,
    #[serde(rename = "type")]
    pub kind: TraceKind,
    pub traces: Vec<Trace>,
    #[serde(default)]
    pub is_finalised: bool,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl TraceSet {
    /// A fresh, unfinalised set. The id is assigned by the store on create.
    pub fn new(source_id: impl Into<String>, kind: TraceKind, traces: Vec<Trace>) -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            source_id: source_id.into(),
            kind,
            traces,
            is_finalised: false,
            created_at: now,
            modified_at: now,
        }
    }

    /// Check every trace ends in a tag this set's kind accepts.
    pub fn validate(&self) -> Result<()> {
        for trace in &self.traces {
            trace.validate_for(self.kind)?;
        }
        Ok(())
    }

    /// Apply a partial update. Trace lists are replaced wholesale, and a
    /// finalised set refuses new traces.
    pub fn apply(&mut self, update: TraceSetUpdate) -> Result<()> {
        if let Some(traces) = update.traces {
            if self.is_finalised {
                return Err(CrawlError::TraceSetFinalised(self.id.clone()));
            }
            for trace in &traces {
                trace.validate_for(self.kind)?;
            }
            self.traces = traces;
        }
        if let Some(finalised) = update.is_finalised {
            self.is_finalised = finalised;
        }
        self.modified_at = Utc::now();
        Ok(())
    }
}

/// Partial update for a [`TraceSet`]; unset fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceSetUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traces: Option<Vec<Trace>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_finalised: Option<bool>,
}

impl TraceSetUpdate {
    pub fn traces(traces: Vec<Trace>) -> Self {
        Self {
            traces: Some(traces),
            is_finalised: Some(false),
        }
    }

    pub fn finalise() -> Self {
        Self {
            traces: None,
            is_finalised: Some(true),
        }
    }
}

/// A scraped article as handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    /// Host the article was scraped from.
    pub domain: String,
    pub url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    /// First text content of the article.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Vec<String>>,
    pub scraped_at: DateTime<Utc>,
}

impl Article {
    /// A bare article with only the fields a title trace can produce.
    pub fn new(domain: impl Into<String>, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            url: url.into(),
            title: title.into(),
            published_at: None,
            preview: None,
            tags: None,
            author: None,
            scraped_at: Utc::now(),
        }
    }
}
