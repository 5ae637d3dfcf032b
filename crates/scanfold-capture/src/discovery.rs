// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device enumeration.
//
// Native scanners come from the host listing, bounded by a timeout. The
// automation trigger and the manual handoff are always offered after them,
// so the list is never empty even when the host query fails.

use std::sync::Arc;
use std::time::Duration;

use scanfold_bridge::CaptureHost;
use scanfold_core::error::{Result, ScanError};
use scanfold_core::types::{DeviceDescriptor, DeviceKind};
use tracing::{info, instrument, warn};

/// Selector meaning "the first descriptor".
pub const AUTO_SELECTOR: &str = "auto";

/// Outcome of one enumeration.
#[derive(Debug)]
pub struct DeviceList {
    /// Natives in host order, then automation, then manual.
    pub devices: Vec<DeviceDescriptor>,
    /// Set when the host could not be asked for native devices.
    pub warning: Option<ScanError>,
}

impl DeviceList {
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DeviceDescriptor> {
        self.devices.iter()
    }

    pub fn native_count(&self) -> usize {
        self.devices
            .iter()
            .filter(|d| d.kind == DeviceKind::NativeCommand)
            .count()
    }

    /// Resolve a user selector: `auto`, a 1-based index, a descriptor id, or
    /// a bare native device name.
    pub fn select(&self, selector: &str) -> Result<&DeviceDescriptor> {
        let selector = selector.trim();
        let found = if selector.eq_ignore_ascii_case(AUTO_SELECTOR) {
            self.devices.first()
        } else if let Ok(index) = selector.parse::<usize>() {
            index.checked_sub(1).and_then(|i| self.devices.get(i))
        } else {
            self.devices
                .iter()
                .find(|d| d.id == selector || d.native_device() == Some(selector))
        };
        found.ok_or_else(|| ScanError::DeviceNotFound(selector.to_string()))
    }

    pub fn find_by_id(&self, id: &str) -> Option<&DeviceDescriptor> {
        self.devices.iter().find(|d| d.id == id)
    }
}

impl<'a> IntoIterator for &'a DeviceList {
    type Item = &'a DeviceDescriptor;
    type IntoIter = std::slice::Iter<'a, DeviceDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.devices.iter()
    }
}

/// Produces the acquisition methods available right now.
pub struct DeviceEnumerator {
    host: Arc<dyn CaptureHost>,
    timeout: Duration,
}

impl DeviceEnumerator {
    pub fn new(host: Arc<dyn CaptureHost>, timeout: Duration) -> Self {
        Self { host, timeout }
    }

    /// List devices. Never fails; host problems become [`DeviceList::warning`].
    #[instrument(skip_all, fields(host = self.host.platform_name()))]
    pub async fn enumerate(&self) -> DeviceList {
        let (natives, warning) =
            match tokio::time::timeout(self.timeout, self.host.list_devices()).await {
                Ok(Ok(devices)) => (devices, None),
                Ok(Err(e)) => {
                    warn!(error = %e, "host device query failed");
                    (Vec::new(), Some(ScanError::EnumerationDegraded(e.to_string())))
                }
                Err(_) => {
                    warn!(timeout_secs = self.timeout.as_secs_f32(), "host device query timed out");
                    let detail = format!(
                        "{} did not answer within {:.1}s",
                        self.host.capture_tool(),
                        self.timeout.as_secs_f32()
                    );
                    (Vec::new(), Some(ScanError::EnumerationDegraded(detail)))
                }
            };

        let platform = self.host.platform_name();
        let mut devices: Vec<DeviceDescriptor> = natives
            .iter()
            .map(|d| DeviceDescriptor::native(&d.name, format!("{} ({platform})", d.label)))
            .collect();
        devices.push(DeviceDescriptor::automation(format!(
            "Open {platform} and wait for the scan"
        )));
        devices.push(DeviceDescriptor::manual(
            "Manual: save the scan into the drop folder",
        ));

        info!(total = devices.len(), native = natives.len(), degraded = warning.is_some(), "devices enumerated");
        DeviceList { devices, warning }
    }
}
