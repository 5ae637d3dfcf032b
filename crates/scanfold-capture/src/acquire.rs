// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page acquisition: obtain one page through the selected device and store
// it as the session's next canonical page.
//
//   NativeCommand    -> host capture command -> locate output
//   AutomationScript -> trigger host app -> manual handoff
//   ManualHandoff    -> poll drop folder -> import
//
// Every branch ends in normalization. The session is only read here; the
// caller appends the returned page on success.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use scanfold_bridge::{AutomationOutcome, CaptureHost, CaptureRequest};
use scanfold_core::AppConfig;
use scanfold_core::error::{Result, ScanError};
use scanfold_core::types::{DeviceDescriptor, DeviceKind, ScanSettings};
use scanfold_document::normalize_page;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::handoff::{DropSnapshot, ManualHandoff, Sleeper, TokioSleeper};
use crate::locate;
use crate::session::ScanSession;

/// Progress notifications emitted while a page is acquired.
#[derive(Debug, Clone, PartialEq)]
pub enum AcquireEvent {
    /// The host capture command was started.
    CaptureStarted { device: String },
    /// The host capture application confirmed the scan request.
    AutomationTriggered,
    /// The automation could not confirm; manual handoff follows.
    AutomationFailed(String),
    /// Waiting for a new file in the drop folder.
    WaitingForDrop { folder: PathBuf, timeout_secs: u64 },
    /// A new file appeared in the drop folder.
    DropFileFound(PathBuf),
    /// The page was stored at its canonical path.
    Normalized { page: PathBuf, width: u32, height: u32 },
}

type EventSink = Arc<dyn Fn(&AcquireEvent) + Send + Sync>;

/// Acquires pages through a capture host.
pub struct PageAcquirer {
    host: Arc<dyn CaptureHost>,
    config: AppConfig,
    sleeper: Arc<dyn Sleeper>,
    events: Option<EventSink>,
}

impl PageAcquirer {
    pub fn new(host: Arc<dyn CaptureHost>, config: AppConfig) -> Self {
        Self {
            host,
            config,
            sleeper: Arc::new(TokioSleeper),
            events: None,
        }
    }

    /// Replace the sleeper used while polling the drop folder.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Receive [`AcquireEvent`]s as acquisition progresses.
    pub fn on_event(mut self, sink: impl Fn(&AcquireEvent) + Send + Sync + 'static) -> Self {
        self.events = Some(Arc::new(sink));
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn emit(&self, event: AcquireEvent) {
        if let Some(sink) = &self.events {
            sink(&event);
        }
    }

    // -- Entry point ----------------------------------------------------------

    /// Acquire one page and return its canonical path.
    ///
    /// Starts the session's scratch folder if needed but does not append; on
    /// error the session's pages are unchanged and no stray file is left in
    /// the scratch folder.
    #[instrument(skip_all, fields(device = %device.id, page = session.page_count()))]
    pub async fn acquire(
        &self,
        device: &DeviceDescriptor,
        settings: ScanSettings,
        session: &mut ScanSession,
    ) -> Result<PathBuf> {
        let target = session.next_page_path()?;
        let scratch = session.start_if_needed()?.to_path_buf();

        let produced = match device.kind {
            DeviceKind::NativeCommand => {
                self.acquire_native(device, settings, &scratch, session.pages())
                    .await?
            }
            DeviceKind::AutomationScript => self.acquire_automated(&scratch).await?,
            DeviceKind::ManualHandoff => {
                let handoff = ManualHandoff::from_config(&self.config);
                let baseline = handoff.snapshot()?;
                self.acquire_manual(&handoff, &baseline, &scratch).await?
            }
        };

        let page = self.normalize(produced, target).await?;
        info!(page = %page.display(), "page acquired");
        Ok(page)
    }

    // -- Branches -------------------------------------------------------------

    async fn acquire_native(
        &self,
        device: &DeviceDescriptor,
        settings: ScanSettings,
        scratch: &Path,
        tracked: &[PathBuf],
    ) -> Result<PathBuf> {
        let name = format!("capture_{}", Uuid::new_v4().simple());
        let request = CaptureRequest {
            device: device.native_device().map(str::to_string),
            output_dir: scratch.to_path_buf(),
            name: name.clone(),
            settings,
            timeout: self.config.capture_timeout(),
        };

        self.emit(AcquireEvent::CaptureStarted {
            device: device.label.clone(),
        });

        if let Err(e) = self.host.capture(&request).await {
            discard_partial(scratch, &name);
            return Err(e);
        }

        locate::locate_capture(scratch, &name, tracked)?.ok_or_else(|| {
            ScanError::AcquisitionFailed(format!(
                "{} reported success but no scanned file appeared in {}",
                self.host.capture_tool(),
                scratch.display()
            ))
        })
    }

    async fn acquire_automated(&self, scratch: &Path) -> Result<PathBuf> {
        let handoff = ManualHandoff::from_config(&self.config);
        // Taken before the trigger so a scan saved while the script runs counts.
        let baseline = handoff.snapshot()?;

        match self
            .host
            .trigger_capture_app(self.config.automation_timeout())
            .await
        {
            Ok(AutomationOutcome::Triggered) => {
                debug!("automation confirmed the scan request");
                self.emit(AcquireEvent::AutomationTriggered);
            }
            Ok(AutomationOutcome::NotTriggered(detail)) => {
                warn!(detail = %detail, "automation did not confirm");
                self.emit(AcquireEvent::AutomationFailed(detail));
            }
            Err(e) => {
                warn!(error = %e, "automation unavailable");
                self.emit(AcquireEvent::AutomationFailed(e.to_string()));
            }
        }

        self.acquire_manual(&handoff, &baseline, scratch).await
    }

    async fn acquire_manual(
        &self,
        handoff: &ManualHandoff,
        baseline: &DropSnapshot,
        scratch: &Path,
    ) -> Result<PathBuf> {
        self.emit(AcquireEvent::WaitingForDrop {
            folder: handoff.drop_folder().to_path_buf(),
            timeout_secs: handoff.timeout().as_secs(),
        });

        handoff
            .receive(baseline, scratch, self.sleeper.as_ref(), |dropped| {
                self.emit(AcquireEvent::DropFileFound(dropped.to_path_buf()))
            })
            .await
    }

    // -- Normalization --------------------------------------------------------

    async fn normalize(&self, produced: PathBuf, target: PathBuf) -> Result<PathBuf> {
        let (source, dest) = (produced.clone(), target.clone());
        let joined = tokio::task::spawn_blocking(move || normalize_page(&source, &dest)).await;

        let outcome = joined
            .map_err(|e| ScanError::ImageError(format!("normalization task failed: {e}")))
            .and_then(|r| r);

        match outcome {
            Ok(raster) => {
                self.emit(AcquireEvent::Normalized {
                    page: target.clone(),
                    width: raster.width,
                    height: raster.height,
                });
                Ok(target)
            }
            Err(e) => {
                warn!(error = %e, produced = %produced.display(), "normalization failed");
                let _ = std::fs::remove_file(&produced);
                let _ = std::fs::remove_file(&target);
                Err(e)
            }
        }
    }
}

/// Remove anything a failed capture left under `name`.
fn discard_partial(scratch: &Path, name: &str) {
    if let Ok(partials) = locate::find_by_name(scratch, name) {
        for partial in partials {
            let _ = std::fs::remove_file(partial);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use image::ImageFormat;

    use crate::discovery::DeviceEnumerator;
    use crate::test_support::{FakeCapture, FakeHost, TickSleeper};

    struct Rig {
        _root: tempfile::TempDir,
        drop: tempfile::TempDir,
        config: AppConfig,
        session: ScanSession,
    }

    fn rig() -> Rig {
        let root = tempfile::tempdir().unwrap();
        let drop = tempfile::tempdir().unwrap();
        let config = AppConfig {
            drop_folder: drop.path().to_path_buf(),
            scratch_root: root.path().to_path_buf(),
            handoff_timeout_secs: 5,
            ..AppConfig::default()
        };
        let session = ScanSession::new(root.path(), ScanSettings::default());
        Rig {
            _root: root,
            drop,
            config,
            session,
        }
    }

    fn native() -> DeviceDescriptor {
        DeviceDescriptor::native("fake:0", "Fake scanner")
    }

    fn scratch_files(session: &ScanSession) -> Vec<PathBuf> {
        let mut files: Vec<_> = std::fs::read_dir(session.scratch_dir().unwrap())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        files
    }

    #[tokio::test]
    async fn native_capture_yields_canonical_png() {
        let mut r = rig();
        let acquirer = PageAcquirer::new(Arc::new(FakeHost::new()), r.config.clone());

        let page = acquirer
            .acquire(&native(), ScanSettings::default(), &mut r.session)
            .await
            .unwrap();
        r.session.append(page.clone());

        assert_eq!(r.session.page_count(), 1);
        assert_eq!(page.file_name().unwrap(), "scan_000.png");
        assert_eq!(image::image_dimensions(&page).unwrap(), (40, 60));
        // The JPEG the backend wrote is gone.
        assert_eq!(scratch_files(&r.session), vec![page]);
    }

    #[tokio::test]
    async fn native_png_output_is_renamed() {
        let mut r = rig();
        let host = FakeHost::new().with_capture(FakeCapture::Write {
            suffix: ".png",
            format: ImageFormat::Png,
            width: 25,
            height: 33,
        });
        let acquirer = PageAcquirer::new(Arc::new(host), r.config.clone());
        let page = acquirer
            .acquire(&native(), ScanSettings::default(), &mut r.session)
            .await
            .unwrap();
        assert_eq!(image::image_dimensions(&page).unwrap(), (25, 33));
    }

    #[tokio::test]
    async fn renamed_output_is_found_by_recency() {
        let mut r = rig();
        let host = FakeHost::new().with_capture(FakeCapture::WriteRenamed("Scan 2026-03-07.jpeg"));
        let acquirer = PageAcquirer::new(Arc::new(host), r.config.clone());
        let page = acquirer
            .acquire(&native(), ScanSettings::default(), &mut r.session)
            .await
            .unwrap();
        assert!(page.exists());
    }

    #[tokio::test]
    async fn backend_failure_leaves_pages_unchanged() {
        let mut r = rig();
        let host = FakeHost::new().with_capture(FakeCapture::Fail("no document in feeder"));
        let acquirer = PageAcquirer::new(Arc::new(host), r.config.clone());

        let err = acquirer
            .acquire(&native(), ScanSettings::default(), &mut r.session)
            .await
            .unwrap_err();
        match err {
            ScanError::AcquisitionFailed(detail) => assert!(detail.contains("feeder")),
            other => panic!("unexpected {other:?}"),
        }
        assert!(r.session.is_empty());
    }

    #[tokio::test]
    async fn silent_backend_is_an_acquisition_failure() {
        let mut r = rig();
        let host = FakeHost::new().with_capture(FakeCapture::Nothing);
        let acquirer = PageAcquirer::new(Arc::new(host), r.config.clone());
        let err = acquirer
            .acquire(&native(), ScanSettings::default(), &mut r.session)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::AcquisitionFailed(_)));
    }

    #[tokio::test]
    async fn undecodable_output_is_cleaned_up() {
        let mut r = rig();
        let host = FakeHost::new().with_capture(FakeCapture::WriteGarbage);
        let acquirer = PageAcquirer::new(Arc::new(host), r.config.clone());
        let err = acquirer
            .acquire(&native(), ScanSettings::default(), &mut r.session)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::ImageError(_)));
        assert!(r.session.is_empty());
        assert!(scratch_files(&r.session).is_empty());
    }

    #[tokio::test]
    async fn second_page_gets_next_index() {
        let mut r = rig();
        let acquirer = PageAcquirer::new(Arc::new(FakeHost::new()), r.config.clone());
        for _ in 0..2 {
            let page = acquirer
                .acquire(&native(), ScanSettings::default(), &mut r.session)
                .await
                .unwrap();
            r.session.append(page);
        }
        let names: Vec<_> = r
            .session
            .pages()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["scan_000.png", "scan_001.png"]);
    }

    #[tokio::test]
    async fn manual_handoff_imports_dropped_file() {
        let mut r = rig();
        let dropped = r.drop.path().join("scan.tif");
        let sleeper = TickSleeper::on_tick(2, move || {
            image::RgbImage::new(16, 8)
                .save_with_format(&dropped, ImageFormat::Tiff)
                .unwrap();
        });
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let acquirer = PageAcquirer::new(Arc::new(FakeHost::new()), r.config.clone())
            .with_sleeper(Arc::new(sleeper))
            .on_event(move |e| sink.lock().unwrap().push(e.clone()));

        let page = acquirer
            .acquire(&DeviceDescriptor::manual("Manual"), ScanSettings::default(), &mut r.session)
            .await
            .unwrap();
        assert_eq!(image::image_dimensions(&page).unwrap(), (16, 8));
        assert!(r.drop.path().join("scan.tif").exists());

        let events = events.lock().unwrap();
        assert!(matches!(events[0], AcquireEvent::WaitingForDrop { timeout_secs: 5, .. }));
        assert!(matches!(events[1], AcquireEvent::DropFileFound(_)));
        assert!(matches!(events[2], AcquireEvent::Normalized { width: 16, height: 8, .. }));
    }

    #[tokio::test]
    async fn manual_timeout_is_no_scan_produced() {
        let mut r = rig();
        let sleeper = Arc::new(TickSleeper::default());
        let acquirer = PageAcquirer::new(Arc::new(FakeHost::new()), r.config.clone())
            .with_sleeper(sleeper.clone());

        let err = acquirer
            .acquire(&DeviceDescriptor::manual("Manual"), ScanSettings::default(), &mut r.session)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::NoScanProduced { waited_secs: 5, .. }));
        assert_eq!(sleeper.ticks(), 5);
        assert!(r.session.is_empty());
    }

    #[tokio::test]
    async fn automation_falls_through_to_handoff_whatever_the_outcome() {
        let outcomes = vec![
            Ok(AutomationOutcome::Triggered),
            Ok(AutomationOutcome::NotTriggered("error: no scanner".into())),
            Err(ScanError::PlatformUnavailable),
        ];
        for outcome in outcomes {
            let mut r = rig();
            let dropped = r.drop.path().join("from-app.png");
            let sleeper = TickSleeper::on_tick(1, move || {
                image::RgbImage::new(10, 10).save(&dropped).unwrap();
            });
            let host = Arc::new(FakeHost::new().with_automation(outcome));
            let acquirer = PageAcquirer::new(host.clone(), r.config.clone())
                .with_sleeper(Arc::new(sleeper));

            let page = acquirer
                .acquire(&DeviceDescriptor::automation("App"), ScanSettings::default(), &mut r.session)
                .await
                .unwrap();
            assert!(page.exists());
            assert_eq!(host.triggers.load(Ordering::SeqCst), 1);
            assert_eq!(host.captures.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn enumerate_then_acquire_through_each_kind() {
        let mut r = rig();
        let host: Arc<FakeHost> = Arc::new(FakeHost::new().with_devices(&["fake:0"]));
        let list = DeviceEnumerator::new(host.clone(), Duration::from_secs(1))
            .enumerate()
            .await;

        let drop = r.drop.path().to_path_buf();
        let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let sleeper = {
            let counter = counter.clone();
            // Each handoff wait sees a fresh file on its first poll.
            struct DropOnSleep {
                drop: PathBuf,
                counter: Arc<std::sync::atomic::AtomicUsize>,
            }
            #[async_trait::async_trait]
            impl Sleeper for DropOnSleep {
                async fn sleep(&self, _d: Duration) {
                    let n = self.counter.fetch_add(1, Ordering::SeqCst);
                    image::RgbImage::new(12, 12)
                        .save(self.drop.join(format!("drop_{n}.png")))
                        .unwrap();
                }
            }
            DropOnSleep { drop, counter }
        };
        let acquirer = PageAcquirer::new(host.clone(), r.config.clone()).with_sleeper(Arc::new(sleeper));

        for device in &list {
            let page = acquirer
                .acquire(device, ScanSettings::default(), &mut r.session)
                .await
                .unwrap();
            r.session.append(page);
        }

        assert_eq!(r.session.page_count(), 3);
        assert!(r.session.pages().iter().all(|p| p.exists()));
        assert_eq!(host.captures.load(Ordering::SeqCst), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}
