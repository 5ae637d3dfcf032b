// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF inspector: page count and page sizes of a finished document, and the
// first embedded raster of a PDF dropped into the handoff folder. Uses `lopdf`.

use std::path::Path;

use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use scanfold_core::error::{Result, ScanError};
use tracing::{debug, info, instrument};

/// Parent-chain hops followed when a page inherits its MediaBox.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// Read-only view of an existing PDF.
pub struct PdfInspector {
    document: Document,
}

impl PdfInspector {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        let document = Document::load(path_ref).map_err(|err| {
            ScanError::PdfError(format!("failed to open {}: {}", path_ref.display(), err))
        })?;
        debug!(pages = document.get_pages().len(), "PDF loaded");
        Ok(Self { document })
    }

    /// Inspect PDF bytes already in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data)
            .map_err(|err| ScanError::PdfError(format!("failed to load PDF from memory: {}", err)))?;
        Ok(Self { document })
    }

    // -- Inspection -----------------------------------------------------------

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    fn page_id(&self, page_number: u32) -> Result<ObjectId> {
        let pages = self.document.get_pages();
        pages.get(&page_number).copied().ok_or_else(|| {
            ScanError::PdfError(format!(
                "page {} out of range (document has {} pages)",
                page_number,
                pages.len()
            ))
        })
    }

    /// Width and height in points of page `page_number` (1-indexed).
    pub fn page_size_pt(&self, page_number: u32) -> Result<(f32, f32)> {
        let page_id = self.page_id(page_number)?;
        let media_box = match self.inherited(page_id, b"MediaBox")?.and_then(|o| self.resolve(o)) {
            Some(Object::Array(items)) => items,
            _ => return Err(ScanError::PdfError("page has no MediaBox".into())),
        };
        let coords: Vec<f32> = media_box
            .iter()
            .map(|o| o.as_float())
            .collect::<std::result::Result<_, _>>()
            .map_err(|err| ScanError::PdfError(format!("malformed MediaBox: {err}")))?;
        match coords.as_slice() {
            [x0, y0, x1, y1] => Ok(((x1 - x0).abs(), (y1 - y0).abs())),
            _ => Err(ScanError::PdfError("MediaBox must have four numbers".into())),
        }
    }

    /// Look up `key` on a page, following the Parent chain for inheritable
    /// attributes such as MediaBox and Resources.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Result<Option<&Object>> {
        let mut current = self.dictionary(page_id)?;
        for _ in 0..MAX_INHERITANCE_DEPTH {
            if let Ok(value) = current.get(key) {
                return Ok(Some(value));
            }
            match current.get(b"Parent").and_then(Object::as_reference) {
                Ok(parent) => current = self.dictionary(parent)?,
                Err(_) => return Ok(None),
            }
        }
        Err(ScanError::PdfError("page tree too deep".into()))
    }

    /// Follow one indirect reference. `None` for a dangling one.
    fn resolve<'a>(&'a self, object: &'a Object) -> Option<&'a Object> {
        match object {
            Object::Reference(id) => self.document.get_object(*id).ok(),
            direct => Some(direct),
        }
    }

    fn dictionary(&self, id: ObjectId) -> Result<&Dictionary> {
        self.document
            .get_dictionary(id)
            .map_err(|err| ScanError::PdfError(format!("object {id:?}: {err}")))
    }

    // -- Extraction -----------------------------------------------------------

    /// Image XObjects painted by page `page_number`'s content stream, in
    /// drawing order.
    pub(crate) fn page_images(&self, page_number: u32) -> Result<Vec<&Stream>> {
        let page_id = self.page_id(page_number)?;

        let xobjects = self
            .inherited(page_id, b"Resources")?
            .and_then(|r| self.resolve(r))
            .and_then(|r| r.as_dict().ok())
            .and_then(|r| r.get(b"XObject").ok())
            .and_then(|x| self.resolve(x))
            .and_then(|x| x.as_dict().ok());
        let Some(xobjects) = xobjects else {
            return Ok(Vec::new());
        };

        let raw = self
            .document
            .get_page_content(page_id)
            .map_err(|err| ScanError::PdfError(format!("page {page_number} content: {err}")))?;
        let content = Content::decode(&raw)
            .map_err(|err| ScanError::PdfError(format!("page {page_number} content: {err}")))?;

        let images = content
            .operations
            .iter()
            .filter(|op| op.operator == "Do")
            .filter_map(|op| match op.operands.first() {
                Some(Object::Name(name)) => xobjects.get(name).ok(),
                _ => None,
            })
            .filter_map(|obj| self.resolve(obj))
            .filter_map(|obj| obj.as_stream().ok())
            .filter(|stream| is_image(stream))
            .collect();
        Ok(images)
    }

    /// Decode the image shown on the first page.
    ///
    /// Falls back to the first image object in the file when page 1 paints
    /// none directly (for example through a form XObject). Supports JPEG
    /// (`DCTDecode`) streams and 8-bit RGB or grayscale streams that are
    /// uncompressed or `FlateDecode`d; anything else is `UnsupportedDocument`.
    #[instrument(skip(self))]
    pub fn first_image(&self) -> Result<DynamicImage> {
        let on_first_page = if self.page_count() > 0 {
            match self.page_images(1) {
                Ok(images) => images.into_iter().next(),
                Err(e) => {
                    debug!(error = %e, "page 1 content unreadable, scanning objects");
                    None
                }
            }
        } else {
            None
        };

        let stream = match on_first_page {
            Some(stream) => stream,
            None => self
                .document
                .objects
                .values()
                .filter_map(|obj| obj.as_stream().ok())
                .find(|s| is_image(s))
                .ok_or_else(|| ScanError::UnsupportedDocument("PDF contains no images".into()))?,
        };

        let image = decode_image_stream(stream)?;
        info!(width = image.width(), height = image.height(), "extracted PDF image");
        Ok(image)
    }
}

fn is_image(stream: &Stream) -> bool {
    matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Image")
}

fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|o| match o {
                Object::Name(name) => Some(name.clone()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn dimension(dict: &Dictionary, key: &[u8]) -> Result<u32> {
    dict.get(key)
        .and_then(Object::as_i64)
        .ok()
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
        .ok_or_else(|| {
            ScanError::UnsupportedDocument(format!(
                "image has no valid {}",
                String::from_utf8_lossy(key)
            ))
        })
}

fn decode_image_stream(stream: &Stream) -> Result<DynamicImage> {
    let dict = &stream.dict;
    let filters = filter_names(dict);

    if filters.len() == 1 && filters[0] == b"DCTDecode" {
        return image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
            .map_err(|err| ScanError::ImageError(format!("embedded JPEG: {err}")));
    }

    let data = match filters.as_slice() {
        [] => stream.content.clone(),
        [flate] if flate == b"FlateDecode" => stream
            .decompressed_content()
            .map_err(|err| ScanError::PdfError(format!("inflate image stream: {err}")))?,
        other => {
            let names: Vec<String> = other
                .iter()
                .map(|n| String::from_utf8_lossy(n).into_owned())
                .collect();
            return Err(ScanError::UnsupportedDocument(format!(
                "image filter {} not supported",
                names.join("+")
            )));
        }
    };

    let width = dimension(dict, b"Width")?;
    let height = dimension(dict, b"Height")?;
    let bits = dict.get(b"BitsPerComponent").and_then(Object::as_i64).unwrap_or(8);
    if bits != 8 {
        return Err(ScanError::UnsupportedDocument(format!(
            "{bits}-bit image components not supported"
        )));
    }

    let color_space = match dict.get(b"ColorSpace") {
        Ok(Object::Name(name)) => name.as_slice(),
        _ => b"".as_slice(),
    };
    let too_short = || ScanError::ImageError("image stream shorter than its dimensions".into());
    match color_space {
        b"DeviceRGB" => RgbImage::from_raw(width, height, data)
            .map(DynamicImage::ImageRgb8)
            .ok_or_else(too_short),
        b"DeviceGray" => GrayImage::from_raw(width, height, data)
            .map(DynamicImage::ImageLuma8)
            .ok_or_else(too_short),
        other => Err(ScanError::UnsupportedDocument(format!(
            "colour space {:?} not supported",
            String::from_utf8_lossy(other)
        ))),
    }
}
