// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — inspect input PDFs with `lopdf`: page count, page sizes, and
// the raster images embedded in each page (scanned documents).

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use ::image::{DynamicImage, GrayImage, RgbImage};
use idmask_core::error::{MaskError, Result};
use tracing::{debug, instrument, warn};

/// Default page size (US Letter) when no MediaBox can be found.
const FALLBACK_MEDIA_BOX: (f32, f32) = (612.0, 792.0);

/// Guards against malformed page trees whose /Parent chain loops.
const MAX_PARENT_DEPTH: usize = 32;

/// Read-only view over an input PDF.
pub struct PdfReader {
    document: Document,
}

impl PdfReader {
    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data)
            .map_err(|err| MaskError::Pdf(format!("failed to load PDF from memory: {}", err)))?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self { document })
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Page object IDs in page order.
    fn page_ids(&self) -> Vec<ObjectId> {
        // get_pages() is a BTreeMap keyed by 1-indexed page number.
        self.document.get_pages().into_values().collect()
    }

    /// Width and height of every page in PDF points, in page order.
    pub fn page_sizes(&self) -> Vec<(f32, f32)> {
        self.page_ids()
            .into_iter()
            .map(|id| self.media_box(id))
            .collect()
    }

    /// Decode the largest image XObject of every page, in page order.
    ///
    /// `None` marks a page with no decodable raster (vector-only content).
    #[instrument(skip(self))]
    pub fn page_images(&self) -> Result<Vec<Option<DynamicImage>>> {
        let mut images = Vec::new();
        for (index, page_id) in self.page_ids().into_iter().enumerate() {
            let image = self.largest_image(page_id)?;
            if image.is_none() {
                warn!(page = index, "Page has no embedded raster image");
            }
            images.push(image);
        }
        Ok(images)
    }

    // -- Helpers --------------------------------------------------------------

    fn resolve<'a>(&'a self, object: &'a Object) -> Option<&'a Object> {
        match object {
            Object::Reference(id) => self.document.get_object(*id).ok(),
            other => Some(other),
        }
    }

    fn dictionary(&self, id: ObjectId) -> Option<&Dictionary> {
        match self.document.get_object(id).ok()? {
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    /// Look up a page attribute, following /Parent for inherited values.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = self.dictionary(page_id)?;
        for _ in 0..MAX_PARENT_DEPTH {
            if let Ok(value) = current.get(key) {
                return self.resolve(value);
            }
            current = match current.get(b"Parent") {
                Ok(Object::Reference(parent)) => self.dictionary(*parent)?,
                _ => return None,
            };
        }
        None
    }

    fn media_box(&self, page_id: ObjectId) -> (f32, f32) {
        let Some(Object::Array(values)) = self.inherited(page_id, b"MediaBox") else {
            return FALLBACK_MEDIA_BOX;
        };
        let numbers: Vec<f32> = values
            .iter()
            .filter_map(|v| self.resolve(v).and_then(as_number))
            .collect();
        match numbers.as_slice() {
            [x0, y0, x1, y1] if x1 > x0 && y1 > y0 => (x1 - x0, y1 - y0),
            _ => FALLBACK_MEDIA_BOX,
        }
    }

    fn largest_image(&self, page_id: ObjectId) -> Result<Option<DynamicImage>> {
        let Some(Object::Dictionary(resources)) = self.inherited(page_id, b"Resources") else {
            return Ok(None);
        };
        let Some(Object::Dictionary(xobjects)) =
            resources.get(b"XObject").ok().and_then(|o| self.resolve(o))
        else {
            return Ok(None);
        };

        let mut best: Option<&Stream> = None;
        let mut best_area = 0u64;
        for (_, entry) in xobjects.iter() {
            let Some(Object::Stream(stream)) = self.resolve(entry) else {
                continue;
            };
            if !matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Image") {
                continue;
            }
            let (width, height) = stream_dimensions(stream);
            let area = width as u64 * height as u64;
            if area > best_area {
                best_area = area;
                best = Some(stream);
            }
        }

        best.map(|stream| self.decode_image(stream)).transpose()
    }

    fn decode_image(&self, stream: &Stream) -> Result<DynamicImage> {
        let (width, height) = stream_dimensions(stream);
        let filter = stream.dict.get(b"Filter").ok().and_then(|f| self.resolve(f));
        let is_dct = match filter {
            Some(Object::Name(name)) => name == b"DCTDecode",
            Some(Object::Array(names)) => names
                .last()
                .is_some_and(|n| matches!(n, Object::Name(name) if name == b"DCTDecode")),
            _ => false,
        };

        // JPEG payloads are self-describing; hand them straight to `image`.
        if is_dct {
            return ::image::load_from_memory(&stream.content).map_err(|err| {
                MaskError::Pdf(format!("failed to decode embedded JPEG: {}", err))
            });
        }

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());
        let bits = match stream.dict.get(b"BitsPerComponent") {
            Ok(Object::Integer(b)) => *b,
            _ => 8,
        };
        let color_space = stream
            .dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|c| self.resolve(c));
        let pixels = width as usize * height as usize;

        let raw = match color_space {
            Some(Object::Name(name)) if bits == 8 && name == b"DeviceRGB" && data.len() == pixels * 3 => {
                RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8)
            }
            Some(Object::Name(name)) if bits == 8 && name == b"DeviceGray" && data.len() == pixels => {
                GrayImage::from_raw(width, height, data).map(DynamicImage::ImageLuma8)
            }
            _ => None,
        };
        match raw {
            Some(image) => Ok(image),
            None => ::image::load_from_memory(&stream.content).map_err(|err| {
                MaskError::Pdf(format!(
                    "unsupported embedded image ({}x{}, {} bpc): {}",
                    width, height, bits, err
                ))
            }),
        }
    }
}

fn stream_dimensions(stream: &Stream) -> (u32, u32) {
    let dim = |key: &[u8]| match stream.dict.get(key) {
        Ok(Object::Integer(v)) if *v > 0 => *v as u32,
        _ => 0,
    };
    (dim(b"Width"), dim(b"Height"))
}

fn as_number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}
