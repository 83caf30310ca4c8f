//! Human-readable run reports and the mail body derived from them

use crate::error::{Error, Result};
use crate::types::RunLog;
use crate::utils::{DISPLAY_STAMP_FORMAT, ensure_dir, format_kib, stamped_file_name};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::info;

/// File name prefix of saved reports
pub const REPORT_PREFIX: &str = "backup_report";

const SECTION_RULE: &str = "--------------------------";

/// Mail body in both representations
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailBody {
    /// HTML part (escaped text with `<br>` line breaks)
    pub html: String,
    /// Plain text fallback
    pub text: String,
}

/// Renders a [`RunLog`] for humans
#[derive(Clone, Copy, Debug, Default)]
pub struct ReportBuilder;

impl ReportBuilder {
    /// Create a builder
    pub fn new() -> Self {
        Self
    }

    /// Plain text report, one section per log entry in insertion order
    ///
    /// The backup file line is only emitted when the referenced file still exists.
    pub fn render(&self, log: &RunLog, at: DateTime<Local>) -> String {
        let mut report = String::from("Listmonk Backup Report\n");
        report.push_str(&format!("Date and Time: {}\n", at.format(DISPLAY_STAMP_FORMAT)));
        report.push('\n');

        for (name, outcome) in log.iter() {
            report.push_str(&name.to_uppercase());
            report.push('\n');
            report.push_str(SECTION_RULE);
            report.push('\n');

            if let Some(count) = outcome.count {
                report.push_str(&format!("Number of records: {count}\n"));
            }
            if let Some(file) = &outcome.file
                && let Ok(metadata) = std::fs::metadata(file)
                && metadata.is_file()
            {
                let file_name = file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file.display().to_string());
                let size = format_kib(metadata.len());
                report.push_str(&format!("Backup file: {file_name} ({size} KB)\n"));
            }
            if let Some(media) = outcome.media_downloaded {
                report.push_str(&format!("Downloaded media: {media}\n"));
            }
            if let Some(error) = &outcome.error {
                report.push_str(&format!("ERROR: {error}\n"));
            }
            report.push('\n');
        }

        report
    }

    /// Write `report` to `reports_dir/backup_report_{stamp}.txt` and return the path
    pub async fn save(
        &self,
        report: &str,
        reports_dir: &Path,
        at: DateTime<Local>,
    ) -> Result<PathBuf> {
        ensure_dir(reports_dir).await?;
        let path = reports_dir.join(stamped_file_name(REPORT_PREFIX, &at, "txt"));
        tokio::fs::write(&path, report)
            .await
            .map_err(|e| Error::write_failed(&path, e))?;

        info!(path = %path.display(), "report saved");
        Ok(path)
    }

    /// Mail body listing every outcome field per entry
    pub fn email_body(&self, log: &RunLog, at: DateTime<Local>) -> EmailBody {
        let mut text = String::new();
        text.push_str(&format!("Backup report - {}\n", at.format(DISPLAY_STAMP_FORMAT)));
        text.push('\n');

        for (name, outcome) in log.iter() {
            text.push_str(&format!("{}:\n", name.to_uppercase()));
            for (key, value) in outcome.fields() {
                text.push_str(&format!("  - {key}: {value}\n"));
            }
            text.push('\n');
        }

        let html = escape_html(&text).replace('\n', "<br>\n");
        EmailBody { html, text }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
