//! Crash-safe persistence of span batches.
//!
//! A batch becomes visible on disk through exactly one path: a full write to
//! a `.spans.tmp` file followed by an atomic rename to the final `.spans`
//! name. Readers only ever consider the final naming pattern, so a partially
//! written file can never be observed as pending data.

use crate::batch::SpanBatch;
use crate::error::StoreError;
use crate::quota::StorageQuotaEnforcer;
use crate::store::{SpanStore, FILE_SUFFIX, TMP_SUFFIX};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Serializes span batches to disk with tmp-then-rename crash safety.
#[derive(Debug, Default)]
pub struct DurableWriter;

impl DurableWriter {
    pub fn new() -> Self {
        Self
    }

    /// Writes `batch` into the store's current write directory and returns
    /// the final file path.
    ///
    /// If the write step fails, no renamed file is ever created; the
    /// temporary file is removed on a best-effort basis.
    pub async fn write(&self, store: &SpanStore, batch: &SpanBatch) -> Result<PathBuf, StoreError> {
        let dir = store.write_dir();
        tokio::fs::create_dir_all(&dir).await?;

        let encoded =
            bincode::serialize(&batch.records).map_err(|e| StoreError::Encode(e.to_string()))?;

        let (tmp_path, final_path) = reserve_paths(&dir).await;

        if let Err(e) = tokio::fs::write(&tmp_path, &encoded).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        if let Err(e) = tokio::fs::rename(&tmp_path, &final_path).await {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        debug!(
            file = %final_path.display(),
            records = batch.len(),
            bytes = encoded.len(),
            "persisted span batch"
        );
        Ok(final_path)
    }
}

/// Picks an unused `<epoch-millis>` file name pair in `dir`, bumping the
/// timestamp past same-millisecond collisions.
async fn reserve_paths(dir: &Path) -> (PathBuf, PathBuf) {
    let mut millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    loop {
        let final_path = dir.join(format!("{millis}{FILE_SUFFIX}"));
        let tmp_path = dir.join(format!("{millis}{TMP_SUFFIX}"));
        let taken = tokio::fs::try_exists(&final_path).await.unwrap_or(false)
            || tokio::fs::try_exists(&tmp_path).await.unwrap_or(false);
        if !taken {
            return (tmp_path, final_path);
        }
        millis += 1;
    }
}

/// Reads a persisted batch back from disk.
pub async fn read_batch(path: &Path) -> Result<SpanBatch, StoreError> {
    let bytes = tokio::fs::read(path).await?;
    let records: Vec<Vec<u8>> =
        bincode::deserialize(&bytes).map_err(|e| StoreError::Decode(e.to_string()))?;
    Ok(SpanBatch::with_records(records))
}

/// Disk-path counterpart of [`BufferingExporter`](crate::BufferingExporter):
/// persists each exported batch instead of buffering it in memory, after
/// asking the quota enforcer for room.
///
/// Persisted batches are later drained and delivered by
/// [`ExportCycle`](crate::ExportCycle). There is nothing to flush or shut
/// down here - surviving process restarts is the point of this path.
#[derive(Debug)]
pub struct DiskBufferingExporter {
    store: Arc<SpanStore>,
    writer: DurableWriter,
    quota: StorageQuotaEnforcer,
}

impl DiskBufferingExporter {
    pub fn new(store: Arc<SpanStore>, quota: StorageQuotaEnforcer) -> Self {
        Self {
            store,
            writer: DurableWriter::new(),
            quota,
        }
    }

    /// Persists `batch`, returning where it was written.
    ///
    /// Returns `None` when the batch was dropped instead: either the quota
    /// enforcer could not reclaim room or the write itself failed. Both
    /// outcomes are absorbed and logged; neither propagates to the caller.
    pub async fn export(&self, batch: SpanBatch) -> Option<PathBuf> {
        if batch.is_empty() {
            return None;
        }
        if !self.quota.ensure_free_space(&self.store).await {
            warn!(
                records = batch.len(),
                "storage quota exhausted, dropping span batch"
            );
            return None;
        }
        match self.writer.write(&self.store, &batch).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, records = batch.len(), "failed to persist span batch");
                None
            }
        }
    }

    /// The store this exporter writes into.
    pub fn store(&self) -> &Arc<SpanStore> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{StoragePolicy, BACKGROUND_DIR};
    use tempfile::TempDir;

    fn batch() -> SpanBatch {
        SpanBatch::with_records(vec![vec![1, 2, 3], vec![4, 5]])
    }

    async fn tmp_file_count(dir: &Path) -> usize {
        let mut count = 0;
        let mut entries = tokio::fs::read_dir(dir).await.unwrap();
        while let Ok(Some(entry)) = entries.next_entry().await {
            if entry.file_name().to_string_lossy().ends_with(TMP_SUFFIX) {
                count += 1;
            }
        }
        count
    }

    #[tokio::test]
    async fn test_write_then_read_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = SpanStore::new(tmp.path(), StoragePolicy::Simple).await;
        let writer = DurableWriter::new();

        let original = batch();
        let path = writer.write(&store, &original).await.unwrap();

        assert!(path.to_string_lossy().ends_with(FILE_SUFFIX));
        assert_eq!(tmp_file_count(store.dir()).await, 0);

        let read_back = read_batch(&path).await.unwrap();
        assert_eq!(read_back, original);
    }

    #[tokio::test]
    async fn test_written_file_is_listed_pending() {
        let tmp = TempDir::new().unwrap();
        let store = SpanStore::new(tmp.path(), StoragePolicy::Simple).await;
        let writer = DurableWriter::new();

        writer.write(&store, &batch()).await.unwrap();
        writer.write(&store, &batch()).await.unwrap();

        let pending = store.list_pending().await;
        assert_eq!(pending.len(), 2);
        // Same-millisecond writes must not collide.
        assert_ne!(pending[0].path, pending[1].path);
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_visible_file() {
        let tmp = TempDir::new().unwrap();
        let store = SpanStore::new(
            tmp.path(),
            StoragePolicy::VisibilityPartitioned {
                session_id: "s1".into(),
            },
        )
        .await;
        store.set_visible(false).await;

        // A regular file squats on the background partition path, so the
        // write directory cannot be created and the write must fail.
        tokio::fs::write(store.dir().join(BACKGROUND_DIR), b"x")
            .await
            .unwrap();

        let writer = DurableWriter::new();
        let result = writer.write(&store, &batch()).await;
        assert!(result.is_err());
        assert!(store.list_pending().await.is_empty());
    }

    #[tokio::test]
    async fn test_read_rejects_corrupt_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("1.spans");
        tokio::fs::write(&path, b"xx").await.unwrap();
        assert!(matches!(
            read_batch(&path).await,
            Err(StoreError::Decode(_))
        ));
    }

    #[tokio::test]
    async fn test_disk_exporter_writes_and_drops() {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(SpanStore::new(tmp.path(), StoragePolicy::Simple).await);
        let exporter = DiskBufferingExporter::new(
            Arc::clone(&store),
            StorageQuotaEnforcer::new(1024).with_min_free_bytes(0),
        );

        assert!(exporter.export(batch()).await.is_some());
        assert!(exporter.export(SpanBatch::new()).await.is_none());
        assert_eq!(store.list_pending().await.len(), 1);
    }
}
