// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Test doubles: a scriptable capture host and a sleeper that only counts.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use scanfold_bridge::{AutomationOutcome, CaptureHost, CaptureRequest, HostDevice};
use scanfold_core::error::{Result, ScanError};

use crate::handoff::Sleeper;

/// Counts sleeps and optionally runs an action on a given tick.
#[derive(Default)]
pub(crate) struct TickSleeper {
    ticks: AtomicUsize,
    trigger: Mutex<Option<(usize, Box<dyn FnOnce() + Send>)>>,
}

impl TickSleeper {
    pub(crate) fn on_tick(tick: usize, action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            ticks: AtomicUsize::new(0),
            trigger: Mutex::new(Some((tick, Box::new(action)))),
        }
    }

    pub(crate) fn ticks(&self) -> usize {
        self.ticks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Sleeper for TickSleeper {
    async fn sleep(&self, _duration: Duration) {
        let tick = self.ticks.fetch_add(1, Ordering::SeqCst) + 1;
        let action = {
            let mut guard = self.trigger.lock().unwrap();
            if matches!(*guard, Some((at, _)) if at == tick) {
                guard.take()
            } else {
                None
            }
        };
        if let Some((_, action)) = action {
            action();
        }
    }
}

/// What a [`FakeHost`] does when asked to capture.
#[derive(Debug, Clone)]
pub(crate) enum FakeCapture {
    /// Write a real raster named `<request name><suffix>` in `format`.
    Write {
        suffix: &'static str,
        format: ImageFormat,
        width: u32,
        height: u32,
    },
    /// Write a real JPEG under an unrelated name.
    WriteRenamed(&'static str),
    /// Write bytes that are not an image.
    WriteGarbage,
    /// Exit cleanly without writing anything.
    Nothing,
    /// Fail as a backend error would.
    Fail(&'static str),
}

/// What a [`FakeHost`] does when asked to list devices.
#[derive(Debug, Clone)]
pub(crate) enum FakeListing {
    Devices(Vec<HostDevice>),
    Fail(&'static str),
    Hang,
}

pub(crate) struct FakeHost {
    pub listing: FakeListing,
    pub capture: FakeCapture,
    pub automation: Result<AutomationOutcome>,
    pub captures: AtomicUsize,
    pub triggers: AtomicUsize,
}

impl FakeHost {
    pub(crate) fn new() -> Self {
        Self {
            listing: FakeListing::Devices(Vec::new()),
            capture: FakeCapture::Write {
                suffix: ".jpeg",
                format: ImageFormat::Jpeg,
                width: 40,
                height: 60,
            },
            automation: Err(ScanError::PlatformUnavailable),
            captures: AtomicUsize::new(0),
            triggers: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_devices(mut self, names: &[&str]) -> Self {
        self.listing = FakeListing::Devices(
            names
                .iter()
                .map(|n| HostDevice {
                    name: n.to_string(),
                    label: format!("Scanner {n}"),
                })
                .collect(),
        );
        self
    }

    pub(crate) fn with_listing(mut self, listing: FakeListing) -> Self {
        self.listing = listing;
        self
    }

    pub(crate) fn with_capture(mut self, capture: FakeCapture) -> Self {
        self.capture = capture;
        self
    }

    pub(crate) fn with_automation(mut self, outcome: Result<AutomationOutcome>) -> Self {
        self.automation = outcome;
        self
    }
}

fn write_raster(path: &std::path::Path, format: ImageFormat, width: u32, height: u32) {
    RgbImage::from_pixel(width, height, Rgb([120, 130, 140]))
        .save_with_format(path, format)
        .unwrap();
}

#[async_trait]
impl CaptureHost for FakeHost {
    fn platform_name(&self) -> &str {
        "Fake"
    }

    fn capture_tool(&self) -> &str {
        "fakescan"
    }

    async fn probe(&self) -> Result<String> {
        Ok("fakescan 1.0".into())
    }

    async fn list_devices(&self) -> Result<Vec<HostDevice>> {
        match &self.listing {
            FakeListing::Devices(devices) => Ok(devices.clone()),
            FakeListing::Fail(detail) => Err(ScanError::EnumerationDegraded(detail.to_string())),
            FakeListing::Hang => {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(Vec::new())
            }
        }
    }

    async fn capture(&self, request: &CaptureRequest) -> Result<()> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        let dir = &request.output_dir;
        match &self.capture {
            FakeCapture::Write {
                suffix,
                format,
                width,
                height,
            } => write_raster(
                &dir.join(format!("{}{suffix}", request.name)),
                *format,
                *width,
                *height,
            ),
            FakeCapture::WriteRenamed(name) => write_raster(&dir.join(name), ImageFormat::Jpeg, 30, 30),
            FakeCapture::WriteGarbage => {
                std::fs::write(dir.join(format!("{}.jpeg", request.name)), b"garbage").unwrap()
            }
            FakeCapture::Nothing => {}
            FakeCapture::Fail(detail) => return Err(ScanError::AcquisitionFailed(detail.to_string())),
        }
        Ok(())
    }

    async fn trigger_capture_app(&self, _timeout: Duration) -> Result<AutomationOutcome> {
        self.triggers.fetch_add(1, Ordering::SeqCst);
        match &self.automation {
            Ok(outcome) => Ok(outcome.clone()),
            Err(ScanError::PlatformUnavailable) => Err(ScanError::PlatformUnavailable),
            Err(other) => Err(ScanError::HostCommand {
                command: "osascript".into(),
                detail: other.to_string(),
            }),
        }
    }
}
