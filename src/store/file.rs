use super::{MemoryTraceStore, TraceStore};
use crate::error::Result;
use crate::models::{TraceKind, TraceSet, TraceSetUpdate};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

/// Trace sets persisted as a YAML list in a single file.
///
/// [`FileTraceStore::open`] loads the file (or starts empty when it does not
/// exist yet); every write persists the whole list, and [`FileTraceStore::flush`]
/// writes it out one last time at shutdown.
///
/// Writes are serialised and land through a sibling temp file that is renamed
/// over the target, so readers of the file never see a partial list. A write
/// whose persist fails is rolled back in memory.
#[derive(Debug)]
pub struct FileTraceStore {
    path: PathBuf,
    sets: MemoryTraceStore,
    write_lock: Mutex<()>,
}

impl FileTraceStore {
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let sets: Vec<TraceSet> = match fs::read_to_string(&path).await {
            Ok(raw) if raw.trim().is_empty() => Vec::new(),
            Ok(raw) => serde_yaml::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        info!(count = sets.len(), "Opened trace store");
        Ok(Self {
            path,
            sets: MemoryTraceStore::with_sets(sets)?,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write every set to disk.
    pub async fn flush(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.persist().await
    }

    async fn persist(&self) -> Result<()> {
        let sets = self.sets.snapshot().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let tmp = self.tmp_path();
        fs::write(&tmp, serde_yaml::to_string(&sets)?).await?;
        fs::rename(&tmp, &self.path).await?;
        info!(path = %self.path.display(), count = sets.len(), "Flushed trace store");
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        PathBuf::from(tmp)
    }

    /// Run one in-memory change and persist it under the write lock.
    async fn write(&self, change: impl Future<Output = Result<TraceSet>>) -> Result<TraceSet> {
        let _guard = self.write_lock.lock().await;
        let before = self.sets.snapshot().await;
        let changed = change.await?;
        if let Err(e) = self.persist().await {
            warn!(path = %self.path.display(), error = %e, "Persist failed; rolling back");
            self.sets.restore(before).await;
            let _ = fs::remove_file(self.tmp_path()).await;
            return Err(e);
        }
        Ok(changed)
    }
}

impl TraceStore for FileTraceStore {
    async fn read_by_and_type(&self, source_id: &str, kind: TraceKind) -> Result<TraceSet> {
        self.sets.read_by_and_type(source_id, kind).await
    }

    async fn create(&self, set: TraceSet) -> Result<TraceSet> {
        self.write(self.sets.create(set)).await
    }

    async fn update(&self, id: &str, update: TraceSetUpdate) -> Result<TraceSet> {
        self.write(self.sets.update(id, update)).await
    }
}
