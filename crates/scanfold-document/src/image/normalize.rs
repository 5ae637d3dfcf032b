// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page normalization: every captured file becomes a PNG at the session's
// canonical page path before it is tracked.

use std::path::Path;

use image::{ColorType, DynamicImage, ImageFormat, ImageReader};
use scanfold_core::error::{Result, ScanError};
use scanfold_core::types::DocumentType;
use tracing::{debug, info, instrument, warn};

use crate::pdf::reader::PdfInspector;

/// Pixel size of a normalized page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterInfo {
    pub width: u32,
    pub height: u32,
}

/// Move or convert `source` into a PNG at `target`.
///
/// PNG sources are checked and renamed. Other rasters are decoded (format
/// sniffed from content, not trusted from the extension) and re-encoded;
/// PDFs contribute their first embedded image. The source is removed once
/// the target exists.
///
/// On failure nothing is left at `target` and `source` is untouched.
#[instrument(skip_all, fields(source = %source.display(), target = %target.display()))]
pub fn normalize_page(source: &Path, target: &Path) -> Result<RasterInfo> {
    let info = match DocumentType::from_path(source) {
        Some(DocumentType::Png) => rename_png(source, target)?,
        Some(DocumentType::Pdf) => {
            let image = PdfInspector::open(source)?.first_image()?;
            encode_png(image, source, target)?
        }
        _ => {
            let image = decode_sniffed(source)?;
            encode_png(image, source, target)?
        }
    };

    info!(width = info.width, height = info.height, "page normalized");
    Ok(info)
}

fn rename_png(source: &Path, target: &Path) -> Result<RasterInfo> {
    let (width, height) = ::image::image_dimensions(source).map_err(|err| {
        ScanError::ImageError(format!("{} is not a readable PNG: {}", source.display(), err))
    })?;
    std::fs::rename(source, target)?;
    debug!("renamed PNG into place");
    Ok(RasterInfo { width, height })
}

fn decode_sniffed(source: &Path) -> Result<DynamicImage> {
    ImageReader::open(source)?
        .with_guessed_format()?
        .decode()
        .map_err(|err| ScanError::ImageError(format!("{}: {}", source.display(), err)))
}

fn encode_png(image: DynamicImage, source: &Path, target: &Path) -> Result<RasterInfo> {
    // PNG has no floating-point pixel layouts.
    let image = match image.color() {
        ColorType::Rgb32F | ColorType::Rgba32F => DynamicImage::ImageRgba8(image.to_rgba8()),
        _ => image,
    };
    let info = RasterInfo {
        width: image.width(),
        height: image.height(),
    };

    if let Err(err) = image.save_with_format(target, ImageFormat::Png) {
        let _ = std::fs::remove_file(target);
        return Err(ScanError::ImageError(format!(
            "could not write {}: {}",
            target.display(),
            err
        )));
    }

    if let Err(err) = std::fs::remove_file(source) {
        warn!(error = %err, "converted page but could not remove the original");
    }
    debug!("converted to PNG");
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn png_is_renamed() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("capture_x.png");
        let target = dir.path().join("scan_000.png");
        RgbImage::from_pixel(12, 7, Rgb([1, 2, 3])).save(&source).unwrap();

        let info = normalize_page(&source, &target).unwrap();
        assert_eq!(info, RasterInfo { width: 12, height: 7 });
        assert!(target.exists());
        assert!(!source.exists());
    }

    #[test]
    fn jpeg_is_converted_and_removed() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("capture_x.jpg");
        let target = dir.path().join("scan_000.png");
        RgbImage::from_pixel(20, 10, Rgb([90, 90, 90]))
            .save_with_format(&source, ImageFormat::Jpeg)
            .unwrap();

        let info = normalize_page(&source, &target).unwrap();
        assert_eq!((info.width, info.height), (20, 10));
        assert!(!source.exists());
        assert_eq!(ImageFormat::from_path(&target).unwrap(), ImageFormat::Png);
        assert!(::image::open(&target).is_ok());
    }

    #[test]
    fn format_is_sniffed_not_trusted() {
        let dir = tempfile::tempdir().unwrap();
        // A PNG wearing a .tiff extension.
        let source = dir.path().join("handoff.tiff");
        let target = dir.path().join("scan_003.png");
        GrayImage::from_pixel(5, 5, Luma([128]))
            .save_with_format(&source, ImageFormat::Png)
            .unwrap();

        let info = normalize_page(&source, &target).unwrap();
        assert_eq!((info.width, info.height), (5, 5));
        assert!(target.exists());
    }

    #[test]
    fn garbage_leaves_no_target_and_keeps_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("capture_x.jpeg");
        let target = dir.path().join("scan_000.png");
        std::fs::write(&source, b"this is not an image").unwrap();

        let err = normalize_page(&source, &target).unwrap_err();
        assert!(matches!(err, ScanError::ImageError(_)));
        assert!(!target.exists());
        assert!(source.exists());
    }

    #[test]
    fn broken_png_is_not_renamed() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("capture_x.png");
        let target = dir.path().join("scan_000.png");
        std::fs::write(&source, b"\x89PNG truncated").unwrap();

        assert!(normalize_page(&source, &target).is_err());
        assert!(!target.exists());
    }
}
