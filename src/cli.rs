//! Command-line interface definitions for trace_crawler.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Most arguments can be provided via command-line flags or environment variables.

use clap::Parser;
use trace_crawler::discovery::LinkHeuristic;

/// Command-line arguments for the trace_crawler binary.
///
/// Crawls one source: lists article links from `--url` with the stored link
/// traces, fetches every article's title, and writes the articles as JSON.
///
/// # Examples
///
/// ```sh
/// # Crawl a source whose traces are already in the store
/// trace_crawler -u https://lite.cnn.com -s ./traces.yaml -o ./json
///
/// # First crawl of a new source: discover traces, then crawl
/// trace_crawler -u https://text.npr.org -s ./traces.yaml -o ./json --discover --heuristic inside-list-item
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Listing page to crawl; also identifies the source
    #[arg(short, long, env = "CRAWL_URL")]
    pub url: String,

    /// Human-readable source name (defaults to the URL's domain)
    #[arg(short, long)]
    pub name: Option<String>,

    /// YAML file holding the trace store
    #[arg(short, long, env = "TRACE_STORE", default_value = "traces.yaml")]
    pub store: String,

    /// Output directory for the JSON article files
    #[arg(short, long, env = "OUTPUT_DIR")]
    pub output_dir: String,

    /// Optional path to a crawler config YAML file
    #[arg(short, long, env = "CRAWLER_CONFIG")]
    pub config: Option<String>,

    /// Override the maximum number of concurrent article fetches
    #[arg(long)]
    pub max_at_once: Option<usize>,

    /// Override the maximum number of article fetches started per second
    #[arg(long)]
    pub max_per_second: Option<usize>,

    /// Discover and store traces for the source when none are finalised
    #[arg(long)]
    pub discover: bool,

    /// Link heuristic used by `--discover`
    #[arg(long, value_enum, default_value = "inside-list-item")]
    pub heuristic: LinkHeuristic,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "trace_crawler",
            "--url",
            "https://lite.cnn.com",
            "--output-dir",
            "./json",
        ]);

        assert_eq!(cli.url, "https://lite.cnn.com");
        assert_eq!(cli.output_dir, "./json");
        assert_eq!(cli.store, "traces.yaml");
        assert!(!cli.discover);
        assert_eq!(cli.heuristic, LinkHeuristic::InsideListItem);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "trace_crawler",
            "-u",
            "https://text.npr.org",
            "-s",
            "/tmp/traces.yaml",
            "-o",
            "/tmp/json",
            "-n",
            "NPR",
        ]);

        assert_eq!(cli.store, "/tmp/traces.yaml");
        assert_eq!(cli.output_dir, "/tmp/json");
        assert_eq!(cli.name.as_deref(), Some("NPR"));
    }

    #[test]
    fn test_cli_discovery_flags() {
        let cli = Cli::parse_from([
            "trace_crawler",
            "-u",
            "https://example.com",
            "-o",
            "out",
            "--discover",
            "--heuristic",
            "dot-html",
            "--max-at-once",
            "4",
            "--max-per-second",
            "2",
        ]);

        assert!(cli.discover);
        assert_eq!(cli.heuristic, LinkHeuristic::DotHtml);
        assert_eq!(cli.max_at_once, Some(4));
        assert_eq!(cli.max_per_second, Some(2));
    }
}
