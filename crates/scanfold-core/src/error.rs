// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for scanfold.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for all scanfold operations.
#[derive(Debug, Error)]
pub enum ScanError {
    // -- Capture errors --
    /// The host capture subsystem could not be queried. Non-fatal: the
    /// enumerator still returns its fallback descriptors.
    #[error("device enumeration degraded: {0}")]
    EnumerationDegraded(String),

    #[error("scan failed: {0}")]
    AcquisitionFailed(String),

    #[error("no new scan appeared in {} within {waited_secs}s", folder.display())]
    NoScanProduced { folder: PathBuf, waited_secs: u64 },

    #[error("no scanning device matches {0:?}")]
    DeviceNotFound(String),

    #[error("host command `{command}` failed: {detail}")]
    HostCommand { command: String, detail: String },

    #[error("scan cancelled")]
    Cancelled,

    // -- Document errors --
    #[error("no scanned pages to assemble")]
    EmptyInput,

    #[error("unsupported document type: {0}")]
    UnsupportedDocument(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    // -- Session housekeeping --
    #[error("scratch cleanup incomplete: {0}")]
    CleanupWarning(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -- Platform bridge --
    #[error("feature not available on this platform")]
    PlatformUnavailable,
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, ScanError>;
