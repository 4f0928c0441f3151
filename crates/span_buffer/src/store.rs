//! On-disk span store: path resolution, listing, and deletion of
//! persisted batch files.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;
use tracing::{debug, warn};

/// Directory under the application data dir that holds persisted batches.
pub const SPANS_DIR: &str = "spans";
/// Sub-directory holding batches produced while the application was not
/// visible to the user.
pub const BACKGROUND_DIR: &str = "background";
/// Suffix of a fully written, reader-visible batch file.
pub const FILE_SUFFIX: &str = ".spans";
/// Suffix of an in-progress write; never considered pending.
pub const TMP_SUFFIX: &str = ".spans.tmp";

/// Storage layout strategy, chosen at construction.
#[derive(Debug, Clone)]
pub enum StoragePolicy {
    /// One flat directory; every batch is immediately pending.
    Simple,
    /// Batches written while the application is not visible go to
    /// `background/<session-id>/` and are only promoted into the main
    /// directory (and thus become pending) once visibility returns.
    VisibilityPartitioned {
        /// Identifier of the current application session.
        session_id: String,
    },
}

/// A fully written batch file awaiting export.
#[derive(Debug, Clone)]
pub struct PersistedFile {
    /// Absolute path of the file.
    pub path: PathBuf,
    /// Creation timestamp in epoch milliseconds, parsed from the file name.
    pub created_at_ms: u64,
    /// File size in bytes.
    pub size_bytes: u64,
    /// Filesystem modification time.
    pub modified: SystemTime,
}

impl PersistedFile {
    /// Stable string key identifying this file in the retry ledger.
    pub fn key(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// Resolves and owns the span storage directory.
///
/// All failures here are absorbed and logged; listing returns what could be
/// read and deletion reports success as a bool. The visible flag is atomic so
/// the store can be shared behind `Arc` between the disk write path and the
/// export task.
#[derive(Debug)]
pub struct SpanStore {
    dir: PathBuf,
    policy: StoragePolicy,
    visible: AtomicBool,
}

impl SpanStore {
    /// Resolves (and lazily creates) the storage directory under
    /// `app_data_dir`, falling back to `app_data_dir` itself if the `spans`
    /// sub-directory cannot be created.
    pub async fn new(app_data_dir: impl Into<PathBuf>, policy: StoragePolicy) -> Self {
        let app_data_dir = app_data_dir.into();
        let spans_dir = app_data_dir.join(SPANS_DIR);
        let dir = match tokio::fs::create_dir_all(&spans_dir).await {
            Ok(()) => spans_dir,
            Err(e) => {
                warn!(
                    dir = %spans_dir.display(),
                    error = %e,
                    "could not create span storage directory, falling back to parent"
                );
                let _ = tokio::fs::create_dir_all(&app_data_dir).await;
                app_data_dir
            }
        };
        Self {
            dir,
            policy,
            visible: AtomicBool::new(true),
        }
    }

    /// The resolved storage directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Directory that new batch files should be written into.
    ///
    /// Under the visibility-partitioned policy this is the background
    /// partition while the application is not visible.
    pub fn write_dir(&self) -> PathBuf {
        match &self.policy {
            StoragePolicy::VisibilityPartitioned { session_id }
                if !self.visible.load(Ordering::Acquire) =>
            {
                self.dir.join(BACKGROUND_DIR).join(session_id)
            }
            _ => self.dir.clone(),
        }
    }

    /// Records the host application's visibility. When visibility returns,
    /// files parked in the background partition are promoted into the main
    /// directory so they become pending for export.
    pub async fn set_visible(&self, visible: bool) {
        let was_visible = self.visible.swap(visible, Ordering::AcqRel);
        if visible && !was_visible {
            if let StoragePolicy::VisibilityPartitioned { session_id } = &self.policy {
                self.promote_background(session_id).await;
            }
        }
    }

    async fn promote_background(&self, session_id: &str) {
        let background = self.dir.join(BACKGROUND_DIR).join(session_id);
        let mut entries = match tokio::fs::read_dir(&background).await {
            Ok(entries) => entries,
            // Nothing was parked for this session.
            Err(_) => return,
        };
        let mut promoted = 0u32;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            if !name.to_string_lossy().ends_with(FILE_SUFFIX) {
                continue;
            }
            let target = self.dir.join(&name);
            match tokio::fs::rename(entry.path(), &target).await {
                Ok(()) => promoted += 1,
                Err(e) => warn!(
                    file = %entry.path().display(),
                    error = %e,
                    "failed to promote background span file"
                ),
            }
        }
        if promoted > 0 {
            debug!(promoted, session_id, "promoted background span files");
        }
    }

    /// Lists fully written batch files in the main directory, sorted by
    /// creation timestamp (then name) for deterministic processing order.
    ///
    /// Files still in the background partition, in-progress `.tmp` files,
    /// and files with unrecognized names are never returned.
    pub async fn list_pending(&self) -> Vec<PersistedFile> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "could not list span storage");
                return Vec::new();
            }
        };

        let mut files = Vec::new();
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            let Some(stem) = name.strip_suffix(FILE_SUFFIX) else {
                continue;
            };
            let Ok(created_at_ms) = stem.parse::<u64>() else {
                continue;
            };
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            files.push(PersistedFile {
                path,
                created_at_ms,
                size_bytes: meta.len(),
                modified: meta.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }

        files.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.path.cmp(&b.path))
        });
        files
    }

    /// Total bytes occupied by everything under the storage directory,
    /// including the background partition and in-progress tmp files.
    pub async fn total_bytes_used(&self) -> u64 {
        let mut total = 0u64;
        let mut stack = vec![self.dir.clone()];
        while let Some(dir) = stack.pop() {
            let Ok(mut entries) = tokio::fs::read_dir(&dir).await else {
                continue;
            };
            while let Ok(Some(entry)) = entries.next_entry().await {
                let Ok(meta) = entry.metadata().await else {
                    continue;
                };
                if meta.is_dir() {
                    stack.push(entry.path());
                } else {
                    total += meta.len();
                }
            }
        }
        total
    }

    /// Deletes a persisted file, returning `true` on success.
    pub async fn delete(&self, path: &Path) -> bool {
        match tokio::fs::remove_file(path).await {
            Ok(()) => true,
            Err(e) => {
                warn!(file = %path.display(), error = %e, "failed to delete span file");
                false
            }
        }
    }
}
