// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Finding the file a native capture produced.
//
// Backends may append an extension or a counter to the requested name, so
// the lookup is a prefix match. When that finds nothing, the newest file in
// the folder that is not already a tracked page is taken instead. That
// fallback is only sound because the scratch folder belongs to one session
// and captures are serialized.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use scanfold_core::error::Result;
use tracing::debug;

/// Files in `dir` whose name starts with `name`, sorted by name.
pub fn find_by_name(dir: &Path, name: &str) -> Result<Vec<PathBuf>> {
    let mut matches = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if entry.file_name().to_string_lossy().starts_with(name) {
            matches.push(entry.path());
        }
    }
    matches.sort();
    Ok(matches)
}

/// The most recently modified file in `dir` that is not in `tracked`.
///
/// A heuristic: correct only while nothing else writes into `dir`.
pub fn most_recent_untracked(dir: &Path, tracked: &[PathBuf]) -> Result<Option<PathBuf>> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let meta = entry.metadata()?;
        if !meta.is_file() || tracked.contains(&path) {
            continue;
        }
        let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        if newest.as_ref().is_none_or(|(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }
    Ok(newest.map(|(_, p)| p))
}

/// Locate the output of a capture requested under `name`.
pub fn locate_capture(dir: &Path, name: &str, tracked: &[PathBuf]) -> Result<Option<PathBuf>> {
    if let Some(found) = find_by_name(dir, name)?.into_iter().next() {
        debug!(path = %found.display(), "capture located by name");
        return Ok(Some(found));
    }
    let fallback = most_recent_untracked(dir, tracked)?;
    if let Some(path) = &fallback {
        debug!(path = %path.display(), "capture located by recency");
    }
    Ok(fallback)
}
