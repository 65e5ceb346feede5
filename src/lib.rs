//! # trace_crawler
//!
//! A source-agnostic news crawler. Instead of per-site scraping code it keeps,
//! for every source, *traces*: root-first tag-name paths to the article links on
//! a listing page and to the headline on an article page. Traces are discovered
//! once, stored, and replayed on every later crawl.
//!
//! ## Architecture
//!
//! 1. **Fetch**: [`client::RetryingClient`] retries 429/502/503/504 with backoff
//!    and raises on any other non-2xx status
//! 2. **Normalize**: [`dom`] parses into an immutable arena and builds filtered
//!    copies of it
//! 3. **Replay**: [`trace`] follows stored traces to the elements of interest
//! 4. **Fan out**: [`orchestrator::Orchestrator`] lists links, then fetches
//!    every article under concurrency and start-rate caps
//!
//! Trace sets live in an injected [`store::TraceStore`]; first-time patterns
//! come from a [`discovery::PatternDiscoverer`].

pub mod client;
pub mod config;
pub mod discovery;
pub mod dom;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod outputs;
pub mod store;
pub mod trace;
pub mod utils;

pub use error::{CrawlError, Result};
