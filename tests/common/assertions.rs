//! Filesystem assertions for backup output

use std::path::Path;

/// Sorted names of the regular files directly inside `dir`
pub fn file_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Contents of `path`, panicking with the path on failure
pub fn read_text(path: &Path) -> String {
    std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()))
}

/// Assert that `dir` holds exactly the files `expected`
pub fn assert_files(dir: &Path, expected: &[&str]) {
    let actual = file_names(dir);
    assert_eq!(
        actual, expected,
        "unexpected files in {}",
        dir.display()
    );
}
