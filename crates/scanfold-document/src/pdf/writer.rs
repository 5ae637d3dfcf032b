// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF assembler: ordered page rasters to one multi-page document using
// `printpdf` 0.8.
//
// Page size comes from the first raster at the session resolution
// (pt = px / dpi * 72). Every later page is drawn stretched to that same box.

use std::io::Write;
use std::path::Path;

use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use scanfold_core::error::{Result, ScanError};
use tracing::{debug, info, instrument, warn};

/// PostScript points per inch.
const POINTS_PER_INCH: f32 = 72.0;

/// Title recorded in the /Info dictionary.
const DOCUMENT_TITLE: &str = "Scanned Document";

/// Physical size of every page in an assembled document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl PageGeometry {
    /// Size of a `width` x `height` pixel raster scanned at `dpi`.
    pub fn from_pixels(width: u32, height: u32, dpi: u32) -> Self {
        let dpi = dpi as f32;
        Self {
            width_pt: width as f32 / dpi * POINTS_PER_INCH,
            height_pt: height as f32 / dpi * POINTS_PER_INCH,
        }
    }
}

/// Builds a PDF with one page per raster, in the order given.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfAssembler;

impl PdfAssembler {
    pub fn new() -> Self {
        Self
    }

    // -- Assembly -------------------------------------------------------------

    /// Assemble `pages` into PDF bytes.
    ///
    /// Fails with `EmptyInput` for an empty page list, and with `ImageError`
    /// naming the page when a raster cannot be decoded.
    #[instrument(skip(self, pages), fields(pages = pages.len(), dpi))]
    pub fn assemble<P: AsRef<Path>>(&self, pages: &[P], dpi: u32) -> Result<Vec<u8>> {
        if pages.is_empty() {
            return Err(ScanError::EmptyInput);
        }
        if dpi == 0 {
            return Err(ScanError::PdfError("resolution must be positive".into()));
        }

        let mut doc = PdfDocument::new(DOCUMENT_TITLE);
        let mut geometry: Option<PageGeometry> = None;

        for (index, path) in pages.iter().enumerate() {
            let path = path.as_ref();
            let raster = ::image::open(path).map_err(|err| {
                ScanError::ImageError(format!(
                    "page {} ({}): {}",
                    index + 1,
                    path.display(),
                    err
                ))
            })?;

            let (px_w, px_h) = (raster.width(), raster.height());
            let native = PageGeometry::from_pixels(px_w, px_h, dpi);
            let page = *geometry.get_or_insert(native);

            let raw = RawImage {
                pixels: RawImageData::U8(raster.to_rgb8().into_raw()),
                width: px_w as usize,
                height: px_h as usize,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            let xobject_id = doc.add_image(&raw);

            // Stretch to the document page box; identity for the first page.
            let scale_x = page.width_pt / native.width_pt;
            let scale_y = page.height_pt / native.height_pt;

            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(0.0)),
                    translate_y: Some(Pt(0.0)),
                    scale_x: Some(scale_x),
                    scale_y: Some(scale_y),
                    dpi: Some(dpi as f32),
                    rotate: None,
                },
            }];

            doc.pages.push(PdfPage::new(
                Mm::from(Pt(page.width_pt)),
                Mm::from(Pt(page.height_pt)),
                ops,
            ));

            debug!(page = index + 1, px_w, px_h, scale_x, scale_y, "page placed");
        }

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            warn!(count = warnings.len(), "printpdf reported warnings");
        }

        info!(
            pages = pages.len(),
            bytes = output.len(),
            width_pt = geometry.map(|g| g.width_pt),
            height_pt = geometry.map(|g| g.height_pt),
            "PDF assembled"
        );
        Ok(output)
    }

    // -- File output ----------------------------------------------------------

    /// Assemble `pages` and write the PDF to `path`.
    ///
    /// Parent directories are created. The file appears atomically: bytes go
    /// to a sibling temp file which is then renamed over `path`, so a failed
    /// save never leaves a partial document behind.
    #[instrument(skip(self, pages), fields(path = %path.display()))]
    pub fn write_to_file<P: AsRef<Path>>(&self, pages: &[P], dpi: u32, path: &Path) -> Result<()> {
        let bytes = self.assemble(pages, dpi)?;

        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)?;

        let mut staging = tempfile::NamedTempFile::new_in(parent)?;
        staging.write_all(&bytes)?;
        staging.as_file().sync_all()?;
        staging.persist(path).map_err(|err| ScanError::Io(err.error))?;

        info!(bytes = bytes.len(), "Wrote PDF to {}", path.display());
        Ok(())
    }
}
