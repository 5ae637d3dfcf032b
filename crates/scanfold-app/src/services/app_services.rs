// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer: owns the capture host, the scan session and the
// settings, and exposes async methods for the Dioxus UI to call.
//
// The session sits behind a `tokio::sync::Mutex` because a scan holds it
// across awaits (up to the whole manual-handoff wait). Config is only held
// briefly, so a std mutex does.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use scanfold_bridge::{CaptureHost, platform_host};
use scanfold_capture::{
    AcquireEvent, ClearOutcome, DeviceEnumerator, DeviceList, PageAcquirer, ScanSession,
    SetupReport, run_setup_check,
};
use scanfold_core::AppConfig;
use scanfold_core::config::default_config_path;
use scanfold_core::error::{Result, ScanError};
use scanfold_core::types::{DeviceDescriptor, ScanSettings, scan_file_name};
use scanfold_document::{PdfAssembler, PdfInspector};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

/// A PDF that was just written, as read back from disk.
#[derive(Debug, Clone)]
pub struct SavedDocument {
    pub path: PathBuf,
    pub pages: usize,
    pub page_size_pt: Option<(f32, f32)>,
}

/// Shared application services accessible from all Dioxus components via
/// `use_context::<AppServices>()`.
#[derive(Clone)]
pub struct AppServices {
    host: Arc<dyn CaptureHost>,
    session: Arc<tokio::sync::Mutex<ScanSession>>,
    config: Arc<Mutex<AppConfig>>,
    config_path: PathBuf,
}

impl AppServices {
    /// Load settings and pick the platform's capture host. Call once at startup.
    pub fn init() -> Self {
        let config_path = default_config_path();
        let config = AppConfig::load_or_default(&config_path);
        info!(config = %config_path.display(), "initialising app services");
        Self::with_host(Arc::from(platform_host()), config, config_path)
    }

    pub fn with_host(host: Arc<dyn CaptureHost>, config: AppConfig, config_path: PathBuf) -> Self {
        let session = ScanSession::new(config.scratch_root.clone(), config.default_settings);
        Self {
            host,
            session: Arc::new(tokio::sync::Mutex::new(session)),
            config: Arc::new(Mutex::new(config)),
            config_path,
        }
    }

    fn lock_config(&self) -> MutexGuard<'_, AppConfig> {
        self.config.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // -- Settings -------------------------------------------------------------

    pub fn config(&self) -> AppConfig {
        self.lock_config().clone()
    }

    /// Change settings and write them to the settings file.
    pub fn update_config(&self, change: impl FnOnce(&mut AppConfig)) -> Result<()> {
        let snapshot = {
            let mut guard = self.lock_config();
            change(&mut guard);
            guard.clone()
        };
        snapshot.save(&self.config_path)?;
        info!(path = %self.config_path.display(), "settings saved");
        Ok(())
    }

    pub fn platform_name(&self) -> String {
        self.host.platform_name().to_string()
    }

    // -- Scanning -------------------------------------------------------------

    pub async fn enumerate(&self) -> DeviceList {
        let timeout = self.lock_config().enumerate_timeout();
        DeviceEnumerator::new(self.host.clone(), timeout)
            .enumerate()
            .await
    }

    /// Scan one page and append it. Returns the new page count.
    pub async fn scan_page(
        &self,
        device: DeviceDescriptor,
        settings: ScanSettings,
        events: UnboundedSender<AcquireEvent>,
    ) -> Result<usize> {
        let acquirer = PageAcquirer::new(self.host.clone(), self.config()).on_event(move |e| {
            // The receiver is gone only once the UI stopped listening.
            let _ = events.send(e.clone());
        });

        let mut session = self.session.lock().await;
        session.set_settings(settings);
        let page = acquirer.acquire(&device, settings, &mut session).await?;
        session.append(page);
        Ok(session.page_count())
    }

    pub async fn page_count(&self) -> usize {
        self.session.lock().await.page_count()
    }

    /// Assemble every page into `<output_dir>/Scan_<timestamp>.pdf`.
    ///
    /// The session is left as it was so more pages can follow.
    pub async fn save_pdf(&self) -> Result<SavedDocument> {
        let (pages, dpi) = {
            let session = self.session.lock().await;
            (session.pages().to_vec(), session.settings().resolution.dpi())
        };
        if pages.is_empty() {
            return Err(ScanError::EmptyInput);
        }

        let path = self
            .lock_config()
            .output_dir
            .join(scan_file_name(&chrono::Local::now()));

        let target = path.clone();
        let saved = tokio::task::spawn_blocking(move || -> Result<SavedDocument> {
            PdfAssembler::new().write_to_file(&pages, dpi, &target)?;
            let pdf = PdfInspector::open(&target)?;
            Ok(SavedDocument {
                pages: pdf.page_count(),
                page_size_pt: pdf.page_size_pt(1).ok(),
                path: target,
            })
        })
        .await
        .map_err(|e| ScanError::PdfError(format!("save task failed: {e}")))??;

        info!(path = %saved.path.display(), pages = saved.pages, "PDF saved");
        Ok(saved)
    }

    /// Delete the session's pages and scratch folder.
    pub async fn clear(&self) -> ClearOutcome {
        let outcome = self.session.lock().await.clear();
        if let Some(warning) = &outcome.warning {
            warn!(%warning, "clear left files behind");
        }
        outcome
    }

    // -- Diagnostics ----------------------------------------------------------

    pub async fn setup_check(&self) -> SetupReport {
        let config = self.config();
        run_setup_check(self.host.as_ref(), &config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanfold_bridge::sane::SaneHost;

    fn services(dir: &std::path::Path) -> AppServices {
        let config = AppConfig {
            output_dir: dir.join("scans"),
            scratch_root: dir.to_path_buf(),
            drop_folder: dir.to_path_buf(),
            ..AppConfig::default()
        };
        AppServices::with_host(Arc::new(SaneHost::new()), config, dir.join("config.json"))
    }

    #[tokio::test]
    async fn saving_without_pages_is_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let svc = services(dir.path());
        assert!(matches!(svc.save_pdf().await, Err(ScanError::EmptyInput)));
        assert!(!dir.path().join("scans").exists());
    }

    #[test]
    fn settings_changes_are_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let svc = services(dir.path());
        svc.update_config(|c| c.output_dir = PathBuf::from("/srv/scans"))
            .unwrap();

        let reloaded = AppConfig::load_or_default(&dir.path().join("config.json"));
        assert_eq!(reloaded.output_dir, PathBuf::from("/srv/scans"));
        assert_eq!(svc.config().output_dir, PathBuf::from("/srv/scans"));
    }

    #[tokio::test]
    async fn clearing_a_fresh_session_is_quiet() {
        let dir = tempfile::tempdir().unwrap();
        let svc = services(dir.path());
        let outcome = svc.clear().await;
        assert_eq!(outcome.removed, 0);
        assert!(outcome.warning.is_none());
        assert_eq!(svc.page_count().await, 0);
    }
}
