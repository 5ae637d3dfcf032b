// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// macOS host: the `imagecapture` command plus Image Capture.app automation.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use scanfold_core::error::{Result, ScanError};

use crate::process::{failure_text, run_bounded};
use crate::traits::*;

const TOOL: &str = "imagecapture";
const OSASCRIPT: &str = "osascript";

/// Token the automation script prints when Image Capture accepted the scan.
pub const AUTOMATION_SUCCESS_TOKEN: &str = "scan_initiated";

/// Uniform type identifier requested from `imagecapture`.
const CAPTURE_TYPE: &str = "public.jpeg";

/// AppleScript that raises Image Capture and asks it to scan.
const AUTOMATION_SCRIPT: &str = r#"
tell application "Image Capture"
    activate
    delay 2
    try
        scan
        delay 3
        return "scan_initiated"
    on error errMsg
        return "error: " & errMsg
    end try
end tell
"#;

/// Host backed by the macOS Image Capture framework.
#[derive(Debug, Default)]
pub struct ImageCaptureHost;

impl ImageCaptureHost {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CaptureHost for ImageCaptureHost {
    fn platform_name(&self) -> &str {
        "Image Capture"
    }

    fn capture_tool(&self) -> &str {
        TOOL
    }

    async fn probe(&self) -> Result<String> {
        let path = which::which(TOOL).map_err(|e| ScanError::HostCommand {
            command: TOOL.into(),
            detail: e.to_string(),
        })?;
        Ok(path.display().to_string())
    }

    #[instrument(skip_all, fields(tool = TOOL))]
    async fn list_devices(&self) -> Result<Vec<HostDevice>> {
        let mut cmd = Command::new(TOOL);
        cmd.arg("-list");
        // The caller owns the deadline; this bound only stops a wedged child.
        let output = run_bounded(cmd, Duration::from_secs(60))
            .await
            .map_err(|e| e.into_scan_error(TOOL))?;

        if !output.status.success() {
            return Err(ScanError::EnumerationDegraded(failure_text(&output)));
        }

        let devices = parse_device_list(&String::from_utf8_lossy(&output.stdout));
        debug!(count = devices.len(), "imagecapture devices listed");
        Ok(devices)
    }

    #[instrument(skip_all, fields(name = %request.name, dpi = request.settings.resolution.dpi()))]
    async fn capture(&self, request: &CaptureRequest) -> Result<()> {
        if let Some(device) = &request.device {
            // imagecapture scans with the default scanner; it has no device switch.
            debug!(device = %device, "imagecapture ignores explicit device selection");
        }

        let mut cmd = Command::new(TOOL);
        cmd.arg("-path")
            .arg(&request.output_dir)
            .arg("-name")
            .arg(&request.name)
            .arg("-type")
            .arg(CAPTURE_TYPE)
            .arg("-dpi")
            .arg(request.settings.resolution.dpi().to_string());

        let output = run_bounded(cmd, request.timeout).await.map_err(|e| match e {
            crate::process::CommandError::TimedOut(t) => {
                ScanError::AcquisitionFailed(format!("{TOOL} timed out after {}s", t.as_secs()))
            }
            other => other.into_scan_error(TOOL),
        })?;

        if !output.status.success() {
            let detail = failure_text(&output);
            warn!(detail = %detail, "imagecapture failed");
            return Err(ScanError::AcquisitionFailed(detail));
        }

        info!("imagecapture finished");
        Ok(())
    }

    #[instrument(skip_all)]
    async fn trigger_capture_app(&self, timeout: Duration) -> Result<AutomationOutcome> {
        let mut cmd = Command::new(OSASCRIPT);
        cmd.arg("-e").arg(AUTOMATION_SCRIPT);

        let output = run_bounded(cmd, timeout)
            .await
            .map_err(|e| e.into_scan_error(OSASCRIPT))?;

        let outcome = interpret_automation_output(
            output.status.success(),
            &String::from_utf8_lossy(&output.stdout),
            &failure_text(&output),
        );
        debug!(?outcome, "automation script returned");
        Ok(outcome)
    }
}

/// Parse `imagecapture -list` output: one device per non-blank line, skipping
/// the `Devices:` header.
pub fn parse_device_list(stdout: &str) -> Vec<HostDevice> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("Devices:"))
        .map(|line| HostDevice {
            name: line.to_string(),
            label: line.to_string(),
        })
        .collect()
}

fn interpret_automation_output(success: bool, stdout: &str, diagnostic: &str) -> AutomationOutcome {
    if success && stdout.trim() == AUTOMATION_SUCCESS_TOKEN {
        AutomationOutcome::Triggered
    } else if success {
        AutomationOutcome::NotTriggered(stdout.trim().to_string())
    } else {
        AutomationOutcome::NotTriggered(diagnostic.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_list_skips_header_and_blank_lines() {
        let out = "Devices:\n\n  Canon LiDE 400  \nEpson Perfection V39\n\n";
        let devices = parse_device_list(out);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].name, "Canon LiDE 400");
        assert_eq!(devices[1].label, "Epson Perfection V39");
    }

    #[test]
    fn empty_device_list() {
        assert!(parse_device_list("Devices:\n").is_empty());
        assert!(parse_device_list("").is_empty());
    }

    #[test]
    fn automation_token_means_triggered() {
        assert_eq!(
            interpret_automation_output(true, "scan_initiated\n", ""),
            AutomationOutcome::Triggered
        );
    }

    #[test]
    fn automation_error_text_is_kept() {
        let outcome = interpret_automation_output(true, "error: no scanner selected", "");
        assert_eq!(
            outcome,
            AutomationOutcome::NotTriggered("error: no scanner selected".into())
        );

        let outcome = interpret_automation_output(false, "", "execution error: -1743");
        assert_eq!(outcome, AutomationOutcome::NotTriggered("execution error: -1743".into()));
    }

    #[test]
    fn script_requests_a_scan() {
        assert!(AUTOMATION_SCRIPT.contains("tell application \"Image Capture\""));
        assert!(AUTOMATION_SCRIPT.contains(AUTOMATION_SUCCESS_TOKEN));
    }
}
