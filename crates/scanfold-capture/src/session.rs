// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan session: the scratch folder and the ordered pages scanned into it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use scanfold_core::error::{Result, ScanError};
use scanfold_core::types::{ScanSettings, canonical_page_name};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of [`ScanSession::clear`].
#[derive(Debug)]
pub struct ClearOutcome {
    /// Tracked page files that were deleted.
    pub removed: usize,
    /// Set when something could not be deleted. The session is reset anyway.
    pub warning: Option<ScanError>,
}

/// Pages scanned so far, in scan order, and the folder holding them.
///
/// Every tracked path is a canonical PNG inside the scratch folder until the
/// session is cleared.
#[derive(Debug)]
pub struct ScanSession {
    scratch_root: PathBuf,
    scratch_dir: Option<PathBuf>,
    pages: Vec<PathBuf>,
    settings: ScanSettings,
}

impl ScanSession {
    /// A session whose scratch folders will live under `scratch_root`.
    /// Nothing is created on disk until the first scan.
    pub fn new(scratch_root: impl Into<PathBuf>, settings: ScanSettings) -> Self {
        Self {
            scratch_root: scratch_root.into(),
            scratch_dir: None,
            pages: Vec::new(),
            settings,
        }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn settings(&self) -> ScanSettings {
        self.settings
    }

    /// Settings for subsequent scans. Already scanned pages keep theirs.
    pub fn set_settings(&mut self, settings: ScanSettings) {
        self.settings = settings;
    }

    pub fn scratch_dir(&self) -> Option<&Path> {
        self.scratch_dir.as_deref()
    }

    pub fn pages(&self) -> &[PathBuf] {
        &self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Canonical path for the next page. Starts the scratch folder if needed.
    pub fn next_page_path(&mut self) -> Result<PathBuf> {
        let name = canonical_page_name(self.pages.len());
        Ok(self.start_if_needed()?.join(name))
    }

    // -- Lifecycle ------------------------------------------------------------

    /// Create the scratch folder if this session has none yet.
    ///
    /// Idempotent: later calls return the same folder until [`clear`].
    ///
    /// [`clear`]: ScanSession::clear
    pub fn start_if_needed(&mut self) -> Result<&Path> {
        let dir = match self.scratch_dir.take() {
            Some(dir) => dir,
            None => {
                let dir = self
                    .scratch_root
                    .join(format!("scanfold_{}", Uuid::new_v4().simple()));
                std::fs::create_dir_all(&dir)?;
                info!(dir = %dir.display(), "scan session started");
                dir
            }
        };
        Ok(self.scratch_dir.insert(dir).as_path())
    }

    /// Track a normalized page as the last page of the document.
    pub fn append(&mut self, page: PathBuf) {
        debug!(page = %page.display(), index = self.pages.len(), "page appended");
        self.pages.push(page);
    }

    /// Delete every tracked page and the scratch folder, then reset.
    ///
    /// Never fails: files that are already gone count as cleaned and anything
    /// that cannot be removed is reported through [`ClearOutcome::warning`].
    pub fn clear(&mut self) -> ClearOutcome {
        let mut removed = 0;
        let mut problems: Vec<String> = Vec::new();

        for page in self.pages.drain(..) {
            match std::fs::remove_file(&page) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => problems.push(format!("{}: {e}", page.display())),
            }
        }

        if let Some(dir) = self.scratch_dir.take() {
            match std::fs::remove_dir_all(&dir) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => problems.push(format!("{}: {e}", dir.display())),
            }
        }

        let warning = if problems.is_empty() {
            None
        } else {
            let detail = problems.join("; ");
            warn!(detail = %detail, "scan session cleanup incomplete");
            Some(ScanError::CleanupWarning(detail))
        };

        info!(removed, "scan session cleared");
        ClearOutcome { removed, warning }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_in(root: &Path) -> ScanSession {
        ScanSession::new(root, ScanSettings::default())
    }

    fn add_page(session: &mut ScanSession) -> PathBuf {
        let path = session.next_page_path().unwrap();
        std::fs::write(&path, b"page").unwrap();
        session.append(path.clone());
        path
    }

    #[test]
    fn nothing_on_disk_before_start() {
        let root = tempfile::tempdir().unwrap();
        let session = session_in(root.path());
        assert!(session.scratch_dir().is_none());
        assert_eq!(std::fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn start_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let mut session = session_in(root.path());
        let first = session.start_if_needed().unwrap().to_path_buf();
        let second = session.start_if_needed().unwrap().to_path_buf();
        assert_eq!(first, second);
        assert!(first.is_dir());
        assert!(first.starts_with(root.path()));
    }

    #[test]
    fn next_page_path_follows_page_count() {
        let root = tempfile::tempdir().unwrap();
        let mut session = session_in(root.path());
        let first = session.next_page_path().unwrap();
        assert_eq!(first.file_name().unwrap(), "scan_000.png");
        assert_eq!(first.parent(), session.scratch_dir());

        add_page(&mut session);
        let next = session.next_page_path().unwrap();
        assert_eq!(next.file_name().unwrap(), "scan_001.png");
        assert_eq!(next.parent(), first.parent());
    }

    #[test]
    fn clear_removes_pages_and_folder_then_restarts_elsewhere() {
        let root = tempfile::tempdir().unwrap();
        let mut session = session_in(root.path());
        let dir = session.start_if_needed().unwrap().to_path_buf();
        let pages: Vec<_> = (0..3).map(|_| add_page(&mut session)).collect();

        let outcome = session.clear();
        assert_eq!(outcome.removed, 3);
        assert!(outcome.warning.is_none());
        assert!(pages.iter().all(|p| !p.exists()));
        assert!(!dir.exists());
        assert!(session.is_empty());
        assert!(session.scratch_dir().is_none());

        let fresh = session.start_if_needed().unwrap().to_path_buf();
        assert_ne!(fresh, dir);
    }

    #[test]
    fn already_deleted_pages_count_as_cleaned() {
        let root = tempfile::tempdir().unwrap();
        let mut session = session_in(root.path());
        session.start_if_needed().unwrap();
        let page = add_page(&mut session);
        std::fs::remove_file(&page).unwrap();

        let outcome = session.clear();
        assert_eq!(outcome.removed, 0);
        assert!(outcome.warning.is_none());
    }

    #[test]
    fn clearing_an_unstarted_session_is_a_no_op() {
        let root = tempfile::tempdir().unwrap();
        let mut session = session_in(root.path());
        let outcome = session.clear();
        assert_eq!(outcome.removed, 0);
        assert!(outcome.warning.is_none());
    }

    #[test]
    fn settings_can_change_between_pages() {
        let root = tempfile::tempdir().unwrap();
        let mut session = session_in(root.path());
        let mut settings = session.settings();
        settings.resolution = scanfold_core::Resolution::Dpi600;
        session.set_settings(settings);
        assert_eq!(session.settings().resolution.dpi(), 600);
    }
}
