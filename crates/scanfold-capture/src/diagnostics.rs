// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Setup diagnostics.
//
// Runs every check (capture tool -> scanners -> drop folder -> output folder
// -> scratch folder) and reports each one with a fix hint. Unlike a pipeline
// it does not stop at the first problem: users fix several things at once.

use std::path::Path;
use std::time::Duration;

use scanfold_bridge::CaptureHost;
use scanfold_core::AppConfig;
use tracing::{info, instrument};
use uuid::Uuid;

/// Outcome of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    /// Scanning still works, through a fallback.
    Warn,
    /// Scanning or saving cannot work until this is fixed.
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Check name shown to the user.
    pub name: String,
    pub status: CheckStatus,
    /// What was found.
    pub detail: String,
    /// What to do if the check did not pass.
    pub fix: Option<String>,
}

impl CheckResult {
    fn pass(name: &str, detail: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Pass,
            detail: detail.into(),
            fix: None,
        }
    }

    fn warn(name: &str, detail: impl Into<String>, fix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Warn,
            detail: detail.into(),
            fix: Some(fix.into()),
        }
    }

    fn fail(name: &str, detail: impl Into<String>, fix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: CheckStatus::Fail,
            detail: detail.into(),
            fix: Some(fix.into()),
        }
    }
}

/// Full diagnostic report.
#[derive(Debug, Clone)]
pub struct SetupReport {
    pub platform: String,
    pub checks: Vec<CheckResult>,
}

impl SetupReport {
    /// True when no check failed. Warnings are allowed.
    pub fn passed(&self) -> bool {
        self.checks.iter().all(|c| c.status != CheckStatus::Fail)
    }

    pub fn count(&self, status: CheckStatus) -> usize {
        self.checks.iter().filter(|c| c.status == status).count()
    }

    /// One-line overall verdict.
    pub fn summary(&self) -> String {
        match (self.count(CheckStatus::Fail), self.count(CheckStatus::Warn)) {
            (0, 0) => "Everything looks good. You're ready to scan.".into(),
            (0, w) => format!("Ready to scan, with {w} warning(s)."),
            (f, _) => format!("{f} problem(s) need fixing before scanning will work."),
        }
    }

    /// Plain-text rendering for a terminal or a help request.
    pub fn to_text(&self) -> String {
        let now = chrono::Local::now().format("%d %b %Y, %H:%M");
        let mut text = format!("Scanner setup check\nDate: {now}\nCapture host: {}\n\n", self.platform);
        for check in &self.checks {
            let mark = match check.status {
                CheckStatus::Pass => "ok  ",
                CheckStatus::Warn => "warn",
                CheckStatus::Fail => "FAIL",
            };
            text.push_str(&format!("[{mark}] {}: {}\n", check.name, check.detail));
            if let Some(fix) = &check.fix {
                text.push_str(&format!("       fix: {fix}\n"));
            }
        }
        text.push('\n');
        text.push_str(&self.summary());
        text.push('\n');
        text
    }
}

/// Run every setup check against `host` and the configured folders.
#[instrument(skip_all, fields(host = host.platform_name()))]
pub async fn run_setup_check(host: &dyn CaptureHost, config: &AppConfig) -> SetupReport {
    let tool = check_capture_tool(host).await;
    let scanners = if tool.status == CheckStatus::Pass {
        check_scanners(host, config.enumerate_timeout()).await
    } else {
        CheckResult::warn(
            "Scanners",
            "Skipped because the capture tool is missing.",
            "Install the capture tool first, or use the manual option.",
        )
    };

    let checks = vec![
        tool,
        scanners,
        check_drop_folder(&config.drop_folder),
        check_writable("Output folder", &config.output_dir),
        check_writable("Scratch folder", &config.scratch_root),
    ];

    let report = SetupReport {
        platform: host.platform_name().to_string(),
        checks,
    };
    info!(
        passed = report.passed(),
        warnings = report.count(CheckStatus::Warn),
        failures = report.count(CheckStatus::Fail),
        "setup check finished"
    );
    report
}

// -- Check implementations ----------------------------------------------------

async fn check_capture_tool(host: &dyn CaptureHost) -> CheckResult {
    let name = "Capture tool";
    match host.probe().await {
        Ok(found) => CheckResult::pass(name, format!("`{}` found: {found}", host.capture_tool())),
        Err(e) => CheckResult::warn(
            name,
            format!("`{}` is not usable: {e}", host.capture_tool()),
            install_hint(host.capture_tool()),
        ),
    }
}

fn install_hint(tool: &str) -> String {
    match tool {
        "scanimage" => "Install SANE (e.g. `sudo apt install sane-utils`). Until then, save scans to the drop folder by hand.".into(),
        "imagecapture" => "Install the `imagecapture` command-line tool, or use the Image Capture option which opens the app for you.".into(),
        other => format!("Install `{other}`, or save scans to the drop folder by hand."),
    }
}

async fn check_scanners(host: &dyn CaptureHost, timeout: Duration) -> CheckResult {
    let name = "Scanners";
    match tokio::time::timeout(timeout, host.list_devices()).await {
        Ok(Ok(devices)) if !devices.is_empty() => {
            let labels: Vec<_> = devices.iter().map(|d| d.label.as_str()).collect();
            CheckResult::pass(name, format!("Found {}: {}", devices.len(), labels.join(", ")))
        }
        Ok(Ok(_)) => CheckResult::warn(
            name,
            "No scanners were detected.",
            "Check the scanner is plugged in and switched on. USB scanners may need a driver.",
        ),
        Ok(Err(e)) => CheckResult::warn(
            name,
            format!("Could not list scanners: {e}"),
            "Try again in a moment. The manual option works without detection.",
        ),
        Err(_) => CheckResult::warn(
            name,
            format!("Listing scanners took longer than {}s.", timeout.as_secs()),
            "Network scanners can be slow to answer; try again, or use the manual option.",
        ),
    }
}

fn check_drop_folder(folder: &Path) -> CheckResult {
    let name = "Drop folder";
    if folder.is_dir() {
        CheckResult::pass(name, format!("{} exists.", folder.display()))
    } else {
        CheckResult::warn(
            name,
            format!("{} does not exist.", folder.display()),
            "Create it, or set `drop_folder` in the settings file to where your scanner app saves.",
        )
    }
}

/// Writes and removes a marker file. A folder that does not exist yet is
/// judged by its nearest existing ancestor and is not created.
fn check_writable(name: &str, folder: &Path) -> CheckResult {
    let fix = "Choose a folder you own, or fix its permissions.";
    let Some(existing) = folder.ancestors().find(|p| p.exists()) else {
        return CheckResult::fail(
            name,
            format!("No part of {} exists.", folder.display()),
            fix,
        );
    };
    if !existing.is_dir() {
        return CheckResult::fail(
            name,
            format!("{} is a file, not a folder.", existing.display()),
            fix,
        );
    }

    let marker = existing.join(format!(".scanfold_write_test_{}", Uuid::new_v4().simple()));
    let result = std::fs::write(&marker, b"scanfold").and_then(|()| std::fs::remove_file(&marker));
    match result {
        Ok(()) if existing == folder => {
            CheckResult::pass(name, format!("{} is writable.", folder.display()))
        }
        Ok(()) => CheckResult::pass(
            name,
            format!(
                "{} will be created on first use ({} is writable).",
                folder.display(),
                existing.display()
            ),
        ),
        Err(e) => CheckResult::fail(
            name,
            format!("Cannot write to {}: {e}", existing.display()),
            fix,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeHost, FakeListing};

    fn config_in(dir: &Path) -> AppConfig {
        AppConfig {
            output_dir: dir.join("scans"),
            drop_folder: dir.to_path_buf(),
            scratch_root: dir.to_path_buf(),
            ..AppConfig::default()
        }
    }

    #[tokio::test]
    async fn healthy_setup_passes() {
        let dir = tempfile::tempdir().unwrap();
        let host = FakeHost::new().with_devices(&["fake:0"]);
        let report = run_setup_check(&host, &config_in(dir.path())).await;
        assert!(report.passed());
        assert_eq!(report.count(CheckStatus::Pass), 5);
        // Checking leaves the disk as it was.
        assert!(!dir.path().join("scans").exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn missing_nested_folder_is_judged_by_its_parent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a").join("b");
        let check = check_writable("Output folder", &target);
        assert_eq!(check.status, CheckStatus::Pass);
        assert!(check.detail.contains("will be created"));
        assert!(!dir.path().join("a").exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn existing_folder_is_writable() {
        let dir = tempfile::tempdir().unwrap();
        let check = check_writable("Scratch folder", dir.path());
        assert_eq!(check.status, CheckStatus::Pass);
        assert!(check.detail.ends_with("is writable."));
    }

    #[tokio::test]
    async fn no_scanners_is_only_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let report = run_setup_check(&FakeHost::new(), &config_in(dir.path())).await;
        assert!(report.passed());
        assert_eq!(report.count(CheckStatus::Warn), 1);
        assert!(report.summary().contains("warning"));
    }

    #[tokio::test]
    async fn listing_error_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let host = FakeHost::new().with_listing(FakeListing::Fail("saned unreachable"));
        let report = run_setup_check(&host, &config_in(dir.path())).await;
        let scanners = report.checks.iter().find(|c| c.name == "Scanners").unwrap();
        assert_eq!(scanners.status, CheckStatus::Warn);
        assert!(scanners.detail.contains("saned unreachable"));
    }

    #[tokio::test]
    async fn unwritable_output_fails() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the output folder should be.
        let blocker = dir.path().join("scans");
        std::fs::write(&blocker, b"not a folder").unwrap();

        let report = run_setup_check(&FakeHost::new().with_devices(&["x"]), &config_in(dir.path())).await;
        assert!(!report.passed());
        assert!(report.to_text().contains("[FAIL] Output folder"));
    }

    #[test]
    fn missing_drop_folder_warns() {
        let dir = tempfile::tempdir().unwrap();
        let check = check_drop_folder(&dir.path().join("Desktop"));
        assert_eq!(check.status, CheckStatus::Warn);
        assert!(check.fix.is_some());
    }
}
