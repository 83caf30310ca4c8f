//! CSV export of flattened records
//!
//! The header row comes from the first record only. Later rows are written
//! positionally in their own flattened order and are not realigned against the
//! header, so a collection whose records have differing nested structure will
//! produce rows whose columns do not line up with the header.

use crate::error::{Error, Result};
use crate::flatten::flatten;
use crate::types::{BackupArtifact, RemoteRecord};
use crate::utils::{ensure_dir, stamped_file_name};
use chrono::{DateTime, Local};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension of backup files (also what the retention sweep looks for)
pub const BACKUP_EXTENSION: &str = "csv";

/// Render `records` as CSV text
///
/// Returns `Ok(None)` when `records` is empty.
pub fn render_records(records: &[RemoteRecord]) -> Result<Option<Vec<u8>>> {
    let Some(first) = records.first() else {
        return Ok(None);
    };

    let mut writer = csv::WriterBuilder::new()
        // Rows may be longer or shorter than the header
        .flexible(true)
        .from_writer(Vec::new());

    let header = flatten(first);
    writer.write_record(header.keys())?;

    for record in records {
        let row = flatten(record);
        writer.write_record(row.values().map(cell_text))?;
    }

    let buffer = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    Ok(Some(buffer))
}

/// Write `records` as CSV to `path`
///
/// Returns `Ok(false)` without touching the filesystem when `records` is empty.
pub async fn write_records(records: &[RemoteRecord], path: &Path) -> Result<bool> {
    let Some(buffer) = render_records(records)? else {
        return Ok(false);
    };

    tokio::fs::write(path, buffer)
        .await
        .map_err(|e| Error::write_failed(path, e))?;
    Ok(true)
}

/// Render one flattened value as CSV cell text
///
/// Strings are written raw, `null` as an empty cell, and arrays as compact JSON.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Writes timestamped backup files into one directory
#[derive(Clone, Debug)]
pub struct TabularWriter {
    backup_dir: PathBuf,
}

impl TabularWriter {
    /// Writer targeting `backup_dir` (created on first write)
    pub fn new(backup_dir: impl Into<PathBuf>) -> Self {
        Self {
            backup_dir: backup_dir.into(),
        }
    }

    /// Directory backups are written to
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Write `records` to `{prefix}_{ddMMyyyy_HHmmss}.csv`
    ///
    /// Returns `None` when there is nothing to write; no file or directory is created then.
    pub async fn save(
        &self,
        records: &[RemoteRecord],
        prefix: &str,
        at: DateTime<Local>,
    ) -> Result<Option<BackupArtifact>> {
        if records.is_empty() {
            debug!(prefix, "no records, skipping backup file");
            return Ok(None);
        }

        ensure_dir(&self.backup_dir).await?;
        let path = self
            .backup_dir
            .join(stamped_file_name(prefix, &at, BACKUP_EXTENSION));

        write_records(records, &path).await?;
        debug!(prefix, path = %path.display(), rows = records.len(), "wrote backup file");

        Ok(Some(BackupArtifact {
            resource_name: prefix.to_string(),
            file_path: path,
            record_count: records.len(),
            created_at: at,
        }))
    }
}
