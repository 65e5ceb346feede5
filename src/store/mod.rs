//! Trace store: persistence of trace sets per (source, kind).
//!
//! The crawler only needs three operations, captured by [`TraceStore`]. The
//! store is always an explicit, constructor-injected value; there is no
//! process-wide registry.
//!
//! - [`MemoryTraceStore`]: in-process map, used directly by tests and as the
//!   working set of the file store
//! - [`FileTraceStore`]: YAML file on disk, opened and flushed explicitly

pub mod file;
pub mod memory;

use crate::error::Result;
use crate::models::{TraceKind, TraceSet, TraceSetUpdate};
use std::sync::Arc;

pub use file::FileTraceStore;
pub use memory::MemoryTraceStore;

pub trait TraceStore {
    /// The set for `(source_id, kind)`, or [`crate::CrawlError::PatternNotFound`].
    async fn read_by_and_type(&self, source_id: &str, kind: TraceKind) -> Result<TraceSet>;

    /// Persist a new set and return it with its store id assigned.
    async fn create(&self, set: TraceSet) -> Result<TraceSet>;

    /// Apply a partial update to the set with store id `id`.
    async fn update(&self, id: &str, update: TraceSetUpdate) -> Result<TraceSet>;
}

impl<S: TraceStore> TraceStore for Arc<S> {
    async fn read_by_and_type(&self, source_id: &str, kind: TraceKind) -> Result<TraceSet> {
        self.as_ref().read_by_and_type(source_id, kind).await
    }

    async fn create(&self, set: TraceSet) -> Result<TraceSet> {
        self.as_ref().create(set).await
    }

    async fn update(&self, id: &str, update: TraceSetUpdate) -> Result<TraceSet> {
        self.as_ref().update(id, update).await
    }
}

/// Store id for a (source, kind) pair. One set per pair, so the pair is the key.
pub fn trace_set_id(source_id: &str, kind: TraceKind) -> String {
    format!("{source_id}#{kind}")
}
