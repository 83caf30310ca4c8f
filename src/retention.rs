//! Age-based deletion of old backup files

use crate::tabular::BACKUP_EXTENSION;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};

const SECONDS_PER_DAY: f64 = 60.0 * 60.0 * 24.0;

/// Deletes backup files whose modification time is older than the retention window
#[derive(Clone, Debug)]
pub struct RetentionSweeper {
    dir: PathBuf,
    retention_days: u64,
}

impl RetentionSweeper {
    /// Sweeper for `*.csv` files directly inside `dir`
    pub fn new(dir: impl Into<PathBuf>, retention_days: u64) -> Self {
        Self {
            dir: dir.into(),
            retention_days,
        }
    }

    /// Delete expired files and return how many were removed
    ///
    /// A missing directory deletes nothing. Files that cannot be inspected or removed
    /// are logged and skipped; they never fail the sweep.
    pub async fn sweep(&self) -> usize {
        self.sweep_at(SystemTime::now()).await
    }

    /// Like [`sweep`](Self::sweep) with an explicit "now"
    pub async fn sweep_at(&self, now: SystemTime) -> usize {
        use tokio::fs;

        if fs::metadata(&self.dir).await.map(|m| !m.is_dir()).unwrap_or(true) {
            debug!(dir = %self.dir.display(), "backup directory does not exist, skipping cleanup");
            return 0;
        }

        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "failed to read backup directory");
                return 0;
            }
        };

        let mut deleted = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();

            let is_backup = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(BACKUP_EXTENSION));
            if !is_backup {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to stat backup file");
                    continue;
                }
            };

            let Ok(modified) = metadata.modified() else {
                continue;
            };
            let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
            let age_days = age.as_secs_f64() / SECONDS_PER_DAY;
            if age_days <= self.retention_days as f64 {
                continue;
            }

            match fs::remove_file(&path).await {
                Ok(()) => {
                    debug!(path = %path.display(), age_days, "deleted expired backup");
                    deleted += 1;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to delete expired backup");
                }
            }
        }

        info!(
            dir = %self.dir.display(),
            retention_days = self.retention_days,
            deleted,
            "cleanup complete"
        );
        deleted
    }
}
