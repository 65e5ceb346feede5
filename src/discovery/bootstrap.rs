use super::PatternDiscoverer;
use crate::client::{RequestOptions, RetryingClient, Transport};
use crate::error::{CrawlError, Result};
use crate::models::{Source, TraceKind, TraceSet, TraceSetUpdate};
use crate::store::TraceStore;
use std::fmt;
use tracing::{info, instrument};

/// Keeps a source's trace sets populated.
///
/// A finalised set is trusted and returned untouched. Otherwise the page is
/// fetched, the discoverer proposes traces, and the existing set is replaced
/// (or a new one created). Discovered sets stay unfinalised until someone
/// finalises them.
pub struct TraceBootstrapper<S, T> {
    store: S,
    client: RetryingClient<T>,
}

impl<S, T> fmt::Debug for TraceBootstrapper<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceBootstrapper")
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

impl<S: TraceStore, T: Transport> TraceBootstrapper<S, T> {
    pub fn new(store: S, client: RetryingClient<T>) -> Self {
        Self { store, client }
    }

    /// Make sure `source` has a `kind` trace set, discovering one from `url`
    /// if needed.
    ///
    /// # Errors
    ///
    /// Fetch failures, discoverer failures, traces that break the invariants
    /// of `kind`, and store errors other than "not found".
    #[instrument(level = "info", skip_all, fields(source = %source.id, %kind, %url))]
    pub async fn ensure_traces<D: PatternDiscoverer>(
        &self,
        source: &Source,
        kind: TraceKind,
        url: &str,
        discoverer: &D,
    ) -> Result<TraceSet> {
        let existing = match self.store.read_by_and_type(&source.id, kind).await {
            Ok(set) if set.is_finalised => {
                info!(traces = set.traces.len(), "Using finalised traces");
                return Ok(set);
            }
            Ok(set) => Some(set),
            Err(CrawlError::PatternNotFound { .. }) => None,
            Err(e) => return Err(e),
        };

        let response = self.client.get(url, &RequestOptions::default()).await?;
        let traces = discoverer.discover(url, &response.body).await?;
        if traces.is_empty() {
            return Err(CrawlError::Discovery(format!(
                "discoverer returned no {kind} traces for {url}"
            )));
        }
        for trace in &traces {
            trace.validate_for(kind)?;
        }

        match existing {
            Some(set) => {
                info!(id = %set.id, traces = traces.len(), "Replacing unfinalised traces");
                self.store.update(&set.id, TraceSetUpdate::traces(traces)).await
            }
            None => {
                info!(traces = traces.len(), "Creating trace set");
                self.store
                    .create(TraceSet::new(source.id.clone(), kind, traces))
                    .await
            }
        }
    }

    /// Mark the `kind` set of `source` as trusted.
    pub async fn finalise(&self, source: &Source, kind: TraceKind) -> Result<TraceSet> {
        let set = self.store.read_by_and_type(&source.id, kind).await?;
        self.store.update(&set.id, TraceSetUpdate::finalise()).await
    }
}
