//! Reading earlier batches back
//!
//! Later scrape stages take their targets from the batches of earlier ones
//! (job links come from the domain batches, job details from the job link
//! batches).

use crate::output::OutputResult;
use serde::de::DeserializeOwned;
use std::io;
use std::path::{Path, PathBuf};

/// Finds every batch file in `dir` whose name starts with `prefix`
///
/// Files are ordered by root name, then by numeric batch index, so `root.csv`
/// comes before `root1.csv` and `root2.csv` before `root10.csv`. A missing
/// directory yields no batches.
pub fn find_batches(dir: &Path, prefix: &str) -> OutputResult<Vec<PathBuf>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut batches = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if name.starts_with(prefix) && name.ends_with(".csv") {
            batches.push(path);
        }
    }

    batches.sort_by_cached_key(|path| sort_key(path));
    Ok(batches)
}

/// Splits `root12.csv` into `("root", 12)`
fn sort_key(path: &Path) -> (String, usize) {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let root = stem.trim_end_matches(|c: char| c.is_ascii_digit());
    let index = stem[root.len()..].parse().unwrap_or(0);
    (root.to_string(), index)
}

/// Reads the data rows of `files` in order, skipping each header row
pub fn read_batches<T: DeserializeOwned>(files: &[PathBuf]) -> OutputResult<Vec<T>> {
    let mut rows = Vec::new();
    for file in files {
        let mut reader = csv::Reader::from_path(file)?;
        let before = rows.len();
        for row in reader.deserialize() {
            rows.push(row?);
        }
        tracing::debug!("Read {} rows from {}", rows.len() - before, file.display());
    }
    Ok(rows)
}
