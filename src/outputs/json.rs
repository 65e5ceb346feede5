//! JSON output of a run's articles.
//!
//! Files are organised by domain, one file per UTC day:
//! ```text
//! output_dir/
//! └── news.example.com/
//!     ├── 2025-05-06.json
//!     └── 2025-05-07.json
//! ```
//!
//! A second run on the same day replaces that day's file.

use crate::error::Result;
use crate::models::Article;
use chrono::{NaiveDate, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `articles` to `{output_dir}/{domain}/{today}.json`.
///
/// # Arguments
///
/// * `output_dir` - Base directory for JSON output
/// * `domain` - Domain the articles were scraped from; used as a subdirectory
/// * `articles` - The articles to serialize
///
/// # Returns
///
/// The path written, or an error if directory creation or writing fails.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir.as_ref().display(), %domain))]
pub async fn write_articles(
    output_dir: impl AsRef<Path>,
    domain: &str,
    articles: &[Article],
) -> Result<PathBuf> {
    write_articles_for_date(output_dir.as_ref(), domain, Utc::now().date_naive(), articles).await
}

async fn write_articles_for_date(
    output_dir: &Path,
    domain: &str,
    date: NaiveDate,
    articles: &[Article],
) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(articles)?;

    // Ports are legal in a domain but not in every filesystem's names.
    let dir = output_dir.join(domain.replace(':', "_"));
    info!(dir = %dir.display(), "Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(&dir).await {
        error!(dir = %dir.display(), error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = dir.join(format!("{date}.json"));
    fs::write(&path, json).await?;
    info!(path = %path.display(), count = articles.len(), "Wrote articles JSON");
    Ok(path)
}
