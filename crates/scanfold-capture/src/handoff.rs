// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Manual handoff: wait for the user to save a scan into the drop folder.
//
// The folder is snapshotted, then polled a bounded number of times for a new
// non-empty file with a recognised extension. The first match is copied
// into the session's scratch folder; the user's file is left where it is.

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use scanfold_core::AppConfig;
use scanfold_core::error::{Result, ScanError};
use scanfold_core::types::DocumentType;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Waits between polls. Injected so tests don't sleep for real.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper backed by `tokio::time::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// File names present in the drop folder before the user was asked to scan.
#[derive(Debug, Clone, Default)]
pub struct DropSnapshot {
    names: HashSet<OsString>,
}

impl DropSnapshot {
    pub fn contains(&self, name: &OsString) -> bool {
        self.names.contains(name)
    }
}

/// Polling parameters for one drop folder.
#[derive(Debug, Clone)]
pub struct ManualHandoff {
    drop_folder: PathBuf,
    timeout: Duration,
    poll_interval: Duration,
}

impl ManualHandoff {
    pub fn new(drop_folder: impl Into<PathBuf>, timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            drop_folder: drop_folder.into(),
            timeout,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.drop_folder.clone(),
            config.handoff_timeout(),
            config.handoff_poll_interval(),
        )
    }

    pub fn drop_folder(&self) -> &Path {
        &self.drop_folder
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Number of polls that fit in the timeout (at least one).
    pub fn attempts(&self) -> u32 {
        let polls = self.timeout.as_millis().div_ceil(self.poll_interval.as_millis());
        polls.clamp(1, u32::MAX as u128) as u32
    }

    // -- Polling --------------------------------------------------------------

    /// Record what is in the drop folder right now.
    pub fn snapshot(&self) -> Result<DropSnapshot> {
        let mut names = HashSet::new();
        for entry in std::fs::read_dir(&self.drop_folder)? {
            names.insert(entry?.file_name());
        }
        debug!(folder = %self.drop_folder.display(), existing = names.len(), "drop folder snapshot");
        Ok(DropSnapshot { names })
    }

    /// New candidate files since `baseline`, sorted by name.
    fn new_candidates(&self, baseline: &DropSnapshot) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(&self.drop_folder)? {
            let entry = entry?;
            if baseline.contains(&entry.file_name()) {
                continue;
            }
            let path = entry.path();
            if DocumentType::from_path(&path).is_none() {
                continue;
            }
            // Files still being written show up empty first.
            match entry.metadata() {
                Ok(meta) if meta.is_file() && meta.len() > 0 => found.push(path),
                _ => {}
            }
        }
        found.sort();
        Ok(found)
    }

    /// Poll until a new file appears or the attempts run out.
    #[instrument(skip_all, fields(folder = %self.drop_folder.display()))]
    pub async fn wait_for_new_file(
        &self,
        baseline: &DropSnapshot,
        sleeper: &dyn Sleeper,
    ) -> Result<PathBuf> {
        for attempt in 1..=self.attempts() {
            sleeper.sleep(self.poll_interval).await;
            if let Some(path) = self.new_candidates(baseline)?.into_iter().next() {
                info!(path = %path.display(), attempt, "new file in drop folder");
                return Ok(path);
            }
        }
        Err(ScanError::NoScanProduced {
            folder: self.drop_folder.clone(),
            waited_secs: self.timeout.as_secs(),
        })
    }

    /// Copy a dropped file into `scratch_dir` as `handoff_<uuid>.<ext>`.
    ///
    /// A failed copy leaves nothing behind in `scratch_dir`.
    pub async fn import(&self, dropped: &Path, scratch_dir: &Path) -> Result<PathBuf> {
        let ext = dropped
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        let target = scratch_dir.join(format!("handoff_{}.{ext}", Uuid::new_v4().simple()));
        if let Err(e) = tokio::fs::copy(dropped, &target).await {
            warn!(from = %dropped.display(), error = %e, "import of dropped file failed");
            let _ = tokio::fs::remove_file(&target).await;
            return Err(e.into());
        }
        debug!(from = %dropped.display(), to = %target.display(), "dropped file imported");
        Ok(target)
    }

    /// Poll from `baseline` and import the first new file. `on_found` sees
    /// the user's file before it is copied.
    pub async fn receive(
        &self,
        baseline: &DropSnapshot,
        scratch_dir: &Path,
        sleeper: &dyn Sleeper,
        on_found: impl FnOnce(&Path),
    ) -> Result<PathBuf> {
        let dropped = self.wait_for_new_file(baseline, sleeper).await?;
        on_found(&dropped);
        self.import(&dropped, scratch_dir).await
    }
}
