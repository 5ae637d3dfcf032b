// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for both front ends.
//
// Every technical error is mapped to plain English with a clear suggestion.
// The severity drives colour in the desktop UI and the wording in the CLI.

use crate::error::ScanError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Nothing is broken; pressing Scan again is likely to work.
    Transient,
    /// User must do something (select a device, connect the scanner, free space).
    ActionRequired,
    /// Cannot be fixed by retrying (wrong format or missing platform support).
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary (shown as a heading).
    pub message: String,
    /// What the user should try (shown as body text).
    pub suggestion: String,
    /// Whether pressing Scan / Save again is worthwhile.
    pub retriable: bool,
    /// Severity level (drives colour in UI).
    pub severity: Severity,
}

/// Convert a `ScanError` into a `HumanError`.
pub fn humanize_error(err: &ScanError) -> HumanError {
    match err {
        // -- Capture errors --
        ScanError::EnumerationDegraded(_) => HumanError {
            message: "We couldn't ask the system for scanners.".into(),
            suggestion: "You can still scan with the manual option: save the scan to the drop folder yourself.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanError::AcquisitionFailed(detail) => HumanError {
            message: "The scanner didn't return a page.".into(),
            suggestion: format!("Check the scanner is on and has paper loaded, then press Scan again. ({detail})"),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanError::NoScanProduced { folder, waited_secs } => HumanError {
            message: format!("No new scan showed up in {waited_secs} seconds."),
            suggestion: format!(
                "Scan with your scanner's own app and save the file to {}, then press Scan again.",
                folder.display()
            ),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        ScanError::DeviceNotFound(wanted) => HumanError {
            message: "That scanner isn't available.".into(),
            suggestion: format!("List the available devices and pick one of them instead of {wanted:?}."),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanError::HostCommand { command, .. } => HumanError {
            message: "The system scanning tool didn't work.".into(),
            suggestion: format!("Make sure `{command}` is installed and runs from a terminal."),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        ScanError::Cancelled => HumanError {
            message: "Scanning was cancelled.".into(),
            suggestion: "Nothing was saved. Start again when you're ready.".into(),
            retriable: true,
            severity: Severity::ActionRequired,
        },

        // -- Document errors --
        ScanError::EmptyInput => HumanError {
            message: "There's nothing to save yet.".into(),
            suggestion: "Scan at least one page first.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        ScanError::UnsupportedDocument(detail) => HumanError {
            message: "That file type can't be used as a page.".into(),
            suggestion: format!("Save the scan as PNG, JPEG or TIFF instead. ({detail})"),
            retriable: false,
            severity: Severity::Permanent,
        },

        ScanError::PdfError(_) => HumanError {
            message: "The PDF couldn't be written.".into(),
            suggestion: "Your scanned pages are still here. Try saving again, or clear and rescan.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        ScanError::ImageError(_) => HumanError {
            message: "There's a problem with the scanned image.".into(),
            suggestion: "The file may be damaged or in an unusual format. Try scanning the page again.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        // -- Session housekeeping --
        ScanError::CleanupWarning(detail) => HumanError {
            message: "Some temporary files were left behind.".into(),
            suggestion: format!("They're harmless and can be deleted by hand. ({detail})"),
            retriable: false,
            severity: Severity::Transient,
        },

        // -- Storage --
        ScanError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "A file or folder couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Check the output and drop folders exist.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "The app isn't allowed to write there.".into(),
                    suggestion: "Choose a different output folder, or check its permissions.".into(),
                    retriable: false,
                    severity: Severity::ActionRequired,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your disk may be full.".into(),
                    retriable: true,
                    severity: Severity::Transient,
                }
            }
        }

        ScanError::Serialization(_) => HumanError {
            message: "The settings file couldn't be read or written.".into(),
            suggestion: "Delete the settings file to go back to the defaults.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        // -- Platform --
        ScanError::PlatformUnavailable => HumanError {
            message: "This scanning method isn't available on your computer.".into(),
            suggestion: "Pick the manual option and save scans to the drop folder.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },
    }
}
