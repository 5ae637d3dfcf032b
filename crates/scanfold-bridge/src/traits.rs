// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic trait definitions for the host capture subsystem.
//
// The workflow never talks to `imagecapture`, `scanimage` or `osascript`
// directly; it goes through `CaptureHost` so that every acquisition path can
// be exercised against a fake host in tests.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use scanfold_core::ScanSettings;
use scanfold_core::error::Result;

/// The operating system's scanning service, seen as an opaque device.
#[async_trait]
pub trait CaptureHost: Send + Sync {
    /// Human-readable backend name (e.g. "Image Capture", "SANE").
    fn platform_name(&self) -> &str;

    /// Executable that performs captures, used by setup diagnostics.
    fn capture_tool(&self) -> &str;

    /// Confirm the capture tool is installed. Returns a short description
    /// (resolved path or version string).
    async fn probe(&self) -> Result<String>;

    /// Scanners the host reports, in the host's order.
    ///
    /// Callers bound this with their own timeout; implementations must be
    /// cancel-safe (child processes are killed when the future is dropped).
    async fn list_devices(&self) -> Result<Vec<HostDevice>>;

    /// Capture one page into `request.output_dir`.
    ///
    /// A successful return only means the backend exited cleanly; the caller
    /// locates the produced file itself because backends may alter the name.
    async fn capture(&self, request: &CaptureRequest) -> Result<()>;

    /// Bring up the host's capture application through desktop automation.
    ///
    /// Fire-and-forget: the automation can only start a scan, never deliver
    /// one. `Err(PlatformUnavailable)` when the host has no scripting bridge.
    async fn trigger_capture_app(&self, timeout: Duration) -> Result<AutomationOutcome>;
}

/// A scanner as listed by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDevice {
    /// Name the host accepts back when capturing.
    pub name: String,
    /// Label suitable for a picker.
    pub label: String,
}

/// Parameters for a single native capture.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    /// Host device name; `None` lets the backend pick its default scanner.
    pub device: Option<String>,
    /// Directory the backend writes into.
    pub output_dir: PathBuf,
    /// Base file name without extension.
    pub name: String,
    pub settings: ScanSettings,
    /// Upper bound for the whole capture command.
    pub timeout: Duration,
}

/// What the automation script reported back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AutomationOutcome {
    /// The script printed its success token.
    Triggered,
    /// The script ran but did not confirm; carries its diagnostic output.
    NotTriggered(String),
}
