// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// scanfold-document: page rasters in, one PDF out.
//
// Converts whatever a capture path produced into the canonical page raster,
// assembles ordered pages into a PDF, and inspects finished PDFs.

pub mod image;
pub mod pdf;

pub use image::normalize::{RasterInfo, normalize_page};
pub use pdf::reader::PdfInspector;
pub use pdf::writer::{PageGeometry, PdfAssembler};
