// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for scanfold.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// File extension of the canonical raster format every stored page uses.
pub const CANONICAL_EXTENSION: &str = "png";

/// Id prefix that marks a descriptor as a native host device.
const NATIVE_ID_PREFIX: &str = "native:";

/// How a device obtains a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeviceKind {
    /// The host's capture command drives the scanner directly.
    NativeCommand,
    /// A desktop-automation script opens the host capture application.
    AutomationScript,
    /// The user saves a scan into the drop folder by hand.
    ManualHandoff,
}

/// A selectable acquisition method as reported by the enumerator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Stable, backend-unique identifier.
    pub id: String,
    /// Human-readable label for pickers.
    pub label: String,
    pub kind: DeviceKind,
}

impl DeviceDescriptor {
    /// Descriptor for a scanner the host reported under `device`.
    pub fn native(device: &str, label: impl Into<String>) -> Self {
        Self {
            id: format!("{NATIVE_ID_PREFIX}{device}"),
            label: label.into(),
            kind: DeviceKind::NativeCommand,
        }
    }

    /// Descriptor for the automation-script trigger.
    pub fn automation(label: impl Into<String>) -> Self {
        Self {
            id: "automation".into(),
            label: label.into(),
            kind: DeviceKind::AutomationScript,
        }
    }

    /// Descriptor for the manual drop-folder handoff.
    pub fn manual(label: impl Into<String>) -> Self {
        Self {
            id: "manual".into(),
            label: label.into(),
            kind: DeviceKind::ManualHandoff,
        }
    }

    /// The host device name of a native descriptor.
    pub fn native_device(&self) -> Option<&str> {
        match self.kind {
            DeviceKind::NativeCommand => self.id.strip_prefix(NATIVE_ID_PREFIX),
            _ => None,
        }
    }
}

impl PartialEq for DeviceDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DeviceDescriptor {}

/// Scan resolution. Only the values scanners reliably honour are offered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Resolution {
    Dpi150,
    #[default]
    Dpi300,
    Dpi600,
}

impl Resolution {
    pub const ALL: [Resolution; 3] = [Self::Dpi150, Self::Dpi300, Self::Dpi600];

    /// Dots per inch.
    pub fn dpi(&self) -> u32 {
        match self {
            Self::Dpi150 => 150,
            Self::Dpi300 => 300,
            Self::Dpi600 => 600,
        }
    }
}

impl TryFrom<u32> for Resolution {
    type Error = String;

    fn try_from(dpi: u32) -> Result<Self, Self::Error> {
        match dpi {
            150 => Ok(Self::Dpi150),
            300 => Ok(Self::Dpi300),
            600 => Ok(Self::Dpi600),
            other => Err(format!("unsupported resolution {other} (expected 150, 300 or 600)")),
        }
    }
}

impl From<Resolution> for u32 {
    fn from(resolution: Resolution) -> Self {
        resolution.dpi()
    }
}

impl FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let dpi: u32 = s
            .trim()
            .parse()
            .map_err(|_| format!("not a resolution: {s:?}"))?;
        Self::try_from(dpi)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dpi())
    }
}

/// Colour mode requested from the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ColorMode {
    #[default]
    Color,
    Gray,
    Lineart,
}

impl ColorMode {
    pub const ALL: [ColorMode; 3] = [Self::Color, Self::Gray, Self::Lineart];

    /// The mode keyword SANE backends understand.
    pub fn sane_keyword(&self) -> &'static str {
        match self {
            Self::Color => "Color",
            Self::Gray => "Gray",
            Self::Lineart => "Lineart",
        }
    }
}

impl FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "color" | "colour" => Ok(Self::Color),
            "gray" | "grey" => Ok(Self::Gray),
            "lineart" => Ok(Self::Lineart),
            other => Err(format!("unknown scan mode {other:?} (expected Color, Gray or Lineart)")),
        }
    }
}

impl fmt::Display for ColorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sane_keyword())
    }
}

/// Settings for one acquisition call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScanSettings {
    pub resolution: Resolution,
    pub color_mode: ColorMode,
}

/// File types the manual handoff recognises in the drop folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentType {
    Png,
    Jpeg,
    Tiff,
    Pdf,
}

impl DocumentType {
    /// Infer document type from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "tif" | "tiff" => Some(Self::Tiff),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    /// Infer document type from a path's extension.
    pub fn from_path(path: &std::path::Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }
}

/// File name of the assembled document for a save at `at`.
///
/// `Scan_<YYYYMMDD_HHMMSS>.pdf`, in the timezone of `at`.
pub fn scan_file_name<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!("Scan_{}.pdf", at.format("%Y%m%d_%H%M%S"))
}

/// File name of the canonical page at `index` in a session.
pub fn canonical_page_name(index: usize) -> String {
    format!("scan_{index:03}.{CANONICAL_EXTENSION}")
}
