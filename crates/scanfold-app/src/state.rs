// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application state: reactive signals for the Dioxus UI.

use std::path::PathBuf;

use scanfold_capture::{AcquireEvent, DeviceList};
use scanfold_core::error::ScanError;
use scanfold_core::human_errors::{Severity, humanize_error};
use scanfold_core::types::{DeviceDescriptor, ScanSettings};

use crate::services::app_services::AppServices;

/// Colour of the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Info,
    Success,
    Warning,
    Error,
}

impl Tone {
    pub fn color(&self) -> &'static str {
        match self {
            Self::Info => "#007aff",
            Self::Success => "#2e7d32",
            Self::Warning => "#e67e00",
            Self::Error => "#c62828",
        }
    }
}

/// One line of feedback under the controls.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusLine {
    pub message: String,
    pub detail: Option<String>,
    pub tone: Tone,
}

impl StatusLine {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
            tone: Tone::Info,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            detail: None,
            tone: Tone::Success,
        }
    }

    /// Plain-English rendering of a backend error.
    pub fn from_error(err: &ScanError) -> Self {
        let human = humanize_error(err);
        let tone = match human.severity {
            Severity::Transient => Tone::Warning,
            Severity::ActionRequired | Severity::Permanent => Tone::Error,
        };
        Self {
            message: human.message,
            detail: Some(human.suggestion),
            tone,
        }
    }

    /// Progress text for an acquisition event.
    pub fn from_event(event: &AcquireEvent) -> Self {
        match event {
            AcquireEvent::CaptureStarted { device } => Self::info(format!("Scanning with {device}...")),
            AcquireEvent::AutomationTriggered => {
                Self::info("The scanner app is scanning. Save the result to the drop folder.")
            }
            AcquireEvent::AutomationFailed(_) => Self {
                message: "Couldn't start the scanner app automatically.".into(),
                detail: Some("Scan with it yourself and save the file to the drop folder.".into()),
                tone: Tone::Warning,
            },
            AcquireEvent::WaitingForDrop {
                folder,
                timeout_secs,
            } => Self::info(format!(
                "Waiting up to {timeout_secs}s for a new scan in {}...",
                folder.display()
            )),
            AcquireEvent::DropFileFound(path) => Self::info(format!(
                "Found {}, importing...",
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            )),
            AcquireEvent::Normalized { width, height, .. } => {
                Self::info(format!("Page captured ({width} x {height} px)."))
            }
        }
    }
}

/// Shared state accessible to all pages via `use_context`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Acquisition methods from the last enumeration.
    pub devices: Vec<DeviceDescriptor>,
    /// Id of the chosen device.
    pub selected_device: Option<String>,
    /// Settings for the next scan.
    pub settings: ScanSettings,
    /// Folder new PDFs are saved into.
    pub output_dir: PathBuf,
    /// Pages in the current session.
    pub page_count: usize,
    /// Whether enumeration, a scan or a save is running.
    pub busy: bool,
    pub status: StatusLine,
}

impl AppState {
    pub fn new(svc: &AppServices) -> Self {
        let config = svc.config();
        Self {
            devices: Vec::new(),
            selected_device: None,
            settings: config.default_settings,
            output_dir: config.output_dir,
            page_count: 0,
            busy: false,
            status: StatusLine::info("Ready"),
        }
    }

    /// Adopt a fresh enumeration, keeping the selection if it still exists.
    pub fn apply_devices(&mut self, list: DeviceList) {
        let keep = self
            .selected_device
            .as_ref()
            .is_some_and(|id| list.find_by_id(id).is_some());
        if !keep {
            self.selected_device = list.devices.first().map(|d| d.id.clone());
        }
        self.status = match &list.warning {
            Some(warning) => StatusLine::from_error(warning),
            None => StatusLine::success(format!(
                "{} scanner(s) found.",
                list.native_count()
            )),
        };
        self.devices = list.devices;
    }

    pub fn selected(&self) -> Option<&DeviceDescriptor> {
        let id = self.selected_device.as_ref()?;
        self.devices.iter().find(|d| &d.id == id)
    }
}
