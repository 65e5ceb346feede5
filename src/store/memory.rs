use super::{TraceStore, trace_set_id};
use crate::error::{CrawlError, Result};
use crate::models::{TraceKind, TraceSet, TraceSetUpdate};
use std::collections::BTreeMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Trace sets held in memory, keyed by store id.
#[derive(Debug, Default)]
pub struct MemoryTraceStore {
    sets: RwLock<BTreeMap<String, TraceSet>>,
}

impl MemoryTraceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store pre-loaded with `sets`, e.g. from a file or a fixture.
    pub fn with_sets(sets: impl IntoIterator<Item = TraceSet>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for mut set in sets {
            set.validate()?;
            set.id = trace_set_id(&set.source_id, set.kind);
            map.insert(set.id.clone(), set);
        }
        Ok(Self {
            sets: RwLock::new(map),
        })
    }

    /// Every set, ordered by id.
    pub async fn snapshot(&self) -> Vec<TraceSet> {
        self.sets.read().await.values().cloned().collect()
    }

    /// Swap the contents back to an earlier [`snapshot`](Self::snapshot).
    pub(crate) async fn restore(&self, sets: Vec<TraceSet>) {
        *self.sets.write().await = sets.into_iter().map(|s| (s.id.clone(), s)).collect();
    }
}

impl TraceStore for MemoryTraceStore {
    async fn read_by_and_type(&self, source_id: &str, kind: TraceKind) -> Result<TraceSet> {
        self.sets
            .read()
            .await
            .get(&trace_set_id(source_id, kind))
            .cloned()
            .ok_or_else(|| CrawlError::PatternNotFound {
                source_id: source_id.to_string(),
                kind,
            })
    }

    #[instrument(level = "debug", skip_all, fields(source_id = %set.source_id, kind = %set.kind))]
    async fn create(&self, mut set: TraceSet) -> Result<TraceSet> {
        set.validate()?;
        set.id = trace_set_id(&set.source_id, set.kind);
        let mut sets = self.sets.write().await;
        if sets.contains_key(&set.id) {
            return Err(CrawlError::Store(format!("trace set {} already exists", set.id)));
        }
        debug!(id = %set.id, traces = set.traces.len(), "Created trace set");
        sets.insert(set.id.clone(), set.clone());
        Ok(set)
    }

    #[instrument(level = "debug", skip(self, update))]
    async fn update(&self, id: &str, update: TraceSetUpdate) -> Result<TraceSet> {
        let mut sets = self.sets.write().await;
        let set = sets
            .get_mut(id)
            .ok_or_else(|| CrawlError::Store(format!("trace set {id} not found")))?;
        set.apply(update)?;
        debug!(traces = set.traces.len(), finalised = set.is_finalised, "Updated trace set");
        Ok(set.clone())
    }
}
