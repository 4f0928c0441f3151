//! Storage-quota enforcement: keeps total on-disk span usage under a
//! configured ceiling by evicting the oldest persisted batches.

use crate::store::SpanStore;
use std::path::Path;
use tracing::{debug, warn};

/// Decides whether a new batch may be written to disk, reclaiming space by
/// deleting the oldest persisted files when the quota is exceeded.
///
/// Eviction order is strictly oldest-modification-time first; a file is never
/// deleted while an older deletable file remains.
#[derive(Debug)]
pub struct StorageQuotaEnforcer {
    max_usage_bytes: u64,
    min_free_bytes: u64,
}

impl StorageQuotaEnforcer {
    /// Creates an enforcer with the given usage ceiling in bytes.
    ///
    /// The device is additionally required to keep one quota's worth of free
    /// space, so a full quota of spans can always be flushed.
    pub fn new(max_usage_bytes: u64) -> Self {
        Self {
            max_usage_bytes,
            min_free_bytes: max_usage_bytes,
        }
    }

    /// Overrides the required free device space in bytes.
    pub fn with_min_free_bytes(mut self, min_free_bytes: u64) -> Self {
        self.min_free_bytes = min_free_bytes;
        self
    }

    /// Returns `true` if the caller may proceed to write a new batch.
    ///
    /// Fast path: usage is at or under quota and device free space is
    /// adequate; nothing is deleted. Otherwise pending files are deleted
    /// oldest-first until usage falls back under quota; returns `false` when
    /// enough space could not be reclaimed.
    pub async fn ensure_free_space(&self, store: &SpanStore) -> bool {
        let mut usage = store.total_bytes_used().await;
        if usage <= self.max_usage_bytes && self.device_space_adequate(store.dir()) {
            return true;
        }

        let mut files = store.list_pending().await;
        files.sort_by(|a, b| {
            a.modified
                .cmp(&b.modified)
                .then_with(|| a.path.cmp(&b.path))
        });

        for file in files {
            if usage <= self.max_usage_bytes {
                break;
            }
            if store.delete(&file.path).await {
                usage = usage.saturating_sub(file.size_bytes);
                warn!(
                    file = %file.path.display(),
                    size = file.size_bytes,
                    "evicted oldest persisted batch to stay under storage quota"
                );
            }
        }

        let reclaimed = usage <= self.max_usage_bytes && self.device_space_adequate(store.dir());
        if !reclaimed {
            debug!(
                usage,
                quota = self.max_usage_bytes,
                "storage quota could not be satisfied"
            );
        }
        reclaimed
    }

    fn device_space_adequate(&self, dir: &Path) -> bool {
        // Unknown free space (unsupported platform or probe failure) counts
        // as adequate; the usage quota remains the binding limit.
        match free_device_bytes(dir) {
            Some(free) => free >= self.min_free_bytes,
            None => true,
        }
    }
}

/// Free bytes available to unprivileged writes on the filesystem holding
/// `path`, if the platform can report it.
#[cfg(unix)]
fn free_device_bytes(path: &Path) -> Option<u64> {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;

    let c_path = CString::new(path.as_os_str().as_bytes()).ok()?;
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc == 0 {
        Some(stat.f_bavail as u64 * stat.f_frsize as u64)
    } else {
        None
    }
}

#[cfg(not(unix))]
fn free_device_bytes(_path: &Path) -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoragePolicy;
    use filetime::FileTime;
    use tempfile::TempDir;

    async fn store(tmp: &TempDir) -> SpanStore {
        SpanStore::new(tmp.path(), StoragePolicy::Simple).await
    }

    async fn persisted(store: &SpanStore, created_ms: u64, len: usize, mtime_secs: i64) {
        let path = store.dir().join(format!("{created_ms}.spans"));
        tokio::fs::write(&path, vec![0u8; len]).await.unwrap();
        filetime::set_file_mtime(&path, FileTime::from_unix_time(mtime_secs, 0)).unwrap();
    }

    #[tokio::test]
    async fn test_under_quota_deletes_nothing() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp).await;
        persisted(&store, 1000, 50, 100).await;

        let enforcer = StorageQuotaEnforcer::new(200).with_min_free_bytes(0);
        assert!(enforcer.ensure_free_space(&store).await);
        assert_eq!(store.list_pending().await.len(), 1);
    }

    #[tokio::test]
    async fn test_evicts_two_oldest_keeps_newest() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp).await;
        // Usage exceeds the quota by the size of exactly the two oldest files.
        persisted(&store, 1000, 100, 100).await;
        persisted(&store, 2000, 100, 200).await;
        persisted(&store, 3000, 100, 300).await;

        let enforcer = StorageQuotaEnforcer::new(100).with_min_free_bytes(0);
        assert!(enforcer.ensure_free_space(&store).await);

        let remaining = store.list_pending().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].created_at_ms, 3000);
    }

    #[tokio::test]
    async fn test_eviction_is_by_mtime_not_name() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp).await;
        // The newer-named file carries the older modification time.
        persisted(&store, 1000, 100, 500).await;
        persisted(&store, 2000, 100, 100).await;

        let enforcer = StorageQuotaEnforcer::new(100).with_min_free_bytes(0);
        assert!(enforcer.ensure_free_space(&store).await);

        let remaining = store.list_pending().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].created_at_ms, 1000);
    }

    #[tokio::test]
    async fn test_unreclaimable_usage_returns_false() {
        let tmp = TempDir::new().unwrap();
        let store = store(&tmp).await;
        // A tmp file counts toward usage but is not deletable as pending.
        tokio::fs::write(store.dir().join("5000.spans.tmp"), vec![0u8; 300])
            .await
            .unwrap();

        let enforcer = StorageQuotaEnforcer::new(100).with_min_free_bytes(0);
        assert!(!enforcer.ensure_free_space(&store).await);
    }
}
