//! Utility functions for file naming and directory handling

use crate::error::{Error, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};

/// Maximum number of counter suffixes tried when resolving a name collision
const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// Timestamp format used in file names (`ddMMyyyy_HHmmss`)
pub const FILE_STAMP_FORMAT: &str = "%d%m%Y_%H%M%S";

/// Timestamp format used inside reports (`dd.mm.YYYY HH:MM:SS`)
pub const DISPLAY_STAMP_FORMAT: &str = "%d.%m.%Y %H:%M:%S";

/// Format `at` for use in a file name
pub fn file_stamp(at: &DateTime<Local>) -> String {
    at.format(FILE_STAMP_FORMAT).to_string()
}

/// `{prefix}_{stamp}.{extension}`
///
/// ```
/// use chrono::{Local, TimeZone};
/// use listmonk_backup::utils::stamped_file_name;
///
/// let at = Local.with_ymd_and_hms(2025, 6, 14, 15, 30, 45).unwrap();
/// assert_eq!(stamped_file_name("lists", &at, "csv"), "lists_14062025_153045.csv");
/// ```
pub fn stamped_file_name(prefix: &str, at: &DateTime<Local>, extension: &str) -> String {
    format!("{prefix}_{}.{extension}", file_stamp(at))
}

/// Insert `_{stamp}` before the extension of `file_name`
///
/// `logo.png` becomes `logo_14062025_153045.png`; a name without extension just gets the suffix.
pub fn insert_stamp(file_name: &str, at: &DateTime<Local>) -> String {
    let (stem, extension) = split_extension(file_name);
    match extension {
        Some(ext) => format!("{stem}_{}.{ext}", file_stamp(at)),
        None => format!("{stem}_{}", file_stamp(at)),
    }
}

/// Split `name.ext` into (`name`, `Some("ext")`); dotfiles and names without a dot have no extension
pub fn split_extension(file_name: &str) -> (&str, Option<&str>) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < file_name.len() => {
            (&file_name[..idx], Some(&file_name[idx + 1..]))
        }
        _ => (file_name, None),
    }
}

/// Return `path` if free, otherwise the first free `stem (n).ext` sibling
pub fn get_unique_path(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        return Ok(path.to_path_buf());
    }

    let file_name = path.file_name().and_then(|s| s.to_str()).ok_or_else(|| {
        Error::write_failed(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "cannot extract file name"),
        )
    })?;
    let (stem, extension) = split_extension(file_name);
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    for i in 1..=MAX_RENAME_ATTEMPTS {
        let new_name = match extension {
            Some(ext) => format!("{stem} ({i}).{ext}"),
            None => format!("{stem} ({i})"),
        };
        let new_path = parent.join(new_name);
        if !new_path.exists() {
            return Ok(new_path);
        }
    }

    Err(Error::write_failed(
        path,
        std::io::Error::new(
            std::io::ErrorKind::AlreadyExists,
            "could not find unique filename after 9999 attempts",
        ),
    ))
}

/// Create `dir` and its parents if missing
pub async fn ensure_dir(dir: &Path) -> Result<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Error::write_failed(dir, e))
}

/// Final path segment of a URL, without query or fragment
///
/// Returns `None` for empty segments and for `.`/`..`, which must never name a local file.
pub fn file_name_from_url(url: &str) -> Option<&str> {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    let without_query = &url[..end];
    let after_scheme = match without_query.find("://") {
        Some(idx) => &without_query[idx + 3..],
        None => without_query,
    };
    // No path at all (e.g. "https://host")
    let path = after_scheme.find('/').map(|idx| &after_scheme[idx..])?;
    let name = path.rsplit('/').next()?;
    if name.is_empty() || name == "." || name == ".." || name.contains('\\') {
        return None;
    }
    Some(name)
}

/// Render `bytes` as KiB with two decimals
pub fn format_kib(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / 1024.0)
}
