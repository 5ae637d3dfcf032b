// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SANE host for Linux and the BSDs, driven through `scanimage`.
//
// SANE has no companion GUI to script, so the automation trigger is
// unavailable and callers fall through to the manual handoff.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use scanfold_core::CANONICAL_EXTENSION;
use scanfold_core::error::{Result, ScanError};

use crate::process::{CommandError, failure_text, run_bounded};
use crate::traits::*;

const TOOL: &str = "scanimage";

/// Host backed by SANE's `scanimage` front end.
#[derive(Debug, Default)]
pub struct SaneHost;

impl SaneHost {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CaptureHost for SaneHost {
    fn platform_name(&self) -> &str {
        "SANE"
    }

    fn capture_tool(&self) -> &str {
        TOOL
    }

    async fn probe(&self) -> Result<String> {
        which::which(TOOL).map_err(|e| ScanError::HostCommand {
            command: TOOL.into(),
            detail: e.to_string(),
        })?;

        let mut cmd = Command::new(TOOL);
        cmd.arg("--version");
        let output = run_bounded(cmd, Duration::from_secs(5))
            .await
            .map_err(|e| e.into_scan_error(TOOL))?;
        if !output.status.success() {
            return Err(ScanError::HostCommand {
                command: TOOL.into(),
                detail: failure_text(&output),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    #[instrument(skip_all, fields(tool = TOOL))]
    async fn list_devices(&self) -> Result<Vec<HostDevice>> {
        let mut cmd = Command::new(TOOL);
        cmd.arg("-L");
        let output = run_bounded(cmd, Duration::from_secs(60))
            .await
            .map_err(|e| e.into_scan_error(TOOL))?;

        if !output.status.success() {
            return Err(ScanError::EnumerationDegraded(failure_text(&output)));
        }

        let devices = parse_device_list(&String::from_utf8_lossy(&output.stdout));
        debug!(count = devices.len(), "SANE devices listed");
        Ok(devices)
    }

    #[instrument(skip_all, fields(name = %request.name, dpi = request.settings.resolution.dpi()))]
    async fn capture(&self, request: &CaptureRequest) -> Result<()> {
        let target = request
            .output_dir
            .join(format!("{}.{CANONICAL_EXTENSION}", request.name));

        let mut cmd = Command::new(TOOL);
        if let Some(device) = &request.device {
            cmd.arg("-d").arg(device);
        }
        cmd.arg("--format=png")
            .arg("--resolution")
            .arg(request.settings.resolution.dpi().to_string())
            .arg("--mode")
            .arg(request.settings.color_mode.sane_keyword())
            .arg("-o")
            .arg(&target);

        let output = run_bounded(cmd, request.timeout).await.map_err(|e| match e {
            CommandError::TimedOut(t) => {
                ScanError::AcquisitionFailed(format!("{TOOL} timed out after {}s", t.as_secs()))
            }
            other => other.into_scan_error(TOOL),
        })?;

        if !output.status.success() {
            let detail = failure_text(&output);
            warn!(detail = %detail, "scanimage failed");
            return Err(ScanError::AcquisitionFailed(detail));
        }

        info!(target = %target.display(), "scanimage finished");
        Ok(())
    }

    async fn trigger_capture_app(&self, _timeout: Duration) -> Result<AutomationOutcome> {
        warn!("automation trigger requested on SANE host");
        Err(ScanError::PlatformUnavailable)
    }
}

/// Parse `scanimage -L` output.
///
/// Lines look like ``device `pixma:04A9176D' is a CANON Canon PIXMA MG5200``;
/// anything else (blank lines, the "No scanners were identified" notice) is
/// ignored.
pub fn parse_device_list(stdout: &str) -> Vec<HostDevice> {
    stdout.lines().filter_map(parse_device_line).collect()
}

fn parse_device_line(line: &str) -> Option<HostDevice> {
    let rest = line.trim().strip_prefix("device `")?;
    let (name, tail) = rest.split_once('\'')?;
    if name.is_empty() {
        return None;
    }
    let label = tail
        .trim()
        .strip_prefix("is a ")
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(name);
    Some(HostDevice {
        name: name.to_string(),
        label: label.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typical_listing() {
        let out = "device `pixma:04A9176D_3EBCC9' is a CANON Canon PIXMA MG5200 multi-function peripheral\n\
                   device `v4l:/dev/video0' is a Noname HD Webcam virtual device\n";
        let devices = parse_device_list(out);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name, "pixma:04A9176D_3EBCC9");
        assert_eq!(
            devices[0].label,
            "CANON Canon PIXMA MG5200 multi-function peripheral"
        );
        assert_eq!(devices[1].name, "v4l:/dev/video0");
    }

    #[test]
    fn no_scanners_notice_yields_empty_list() {
        let out = "\nNo scanners were identified. If you were expecting something different,\n\
                   check that the scanner is plugged in, turned on and detected by the\n\
                   sane-find-scanner tool (if appropriate).\n";
        assert!(parse_device_list(out).is_empty());
    }

    #[test]
    fn label_falls_back_to_name() {
        let devices = parse_device_list("device `test:0'");
        assert_eq!(devices[0].label, "test:0");
    }

    #[tokio::test]
    async fn automation_is_unavailable() {
        let err = SaneHost::new()
            .trigger_capture_app(Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::PlatformUnavailable));
    }
}
