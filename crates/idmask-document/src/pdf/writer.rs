// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer — build an output PDF from masked page rasters using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use idmask_core::error::{MaskError, Result};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData,
    RawImageFormat, XObjectTransform,
};
use tracing::{debug, info, instrument};

use super::raster::RenderedPage;

const MM_PER_INCH: f32 = 25.4;

/// Writes page rasters into a PDF, one raster per page, each page sized to
/// its raster at the raster's own resolution.
pub struct PdfWriter {
    /// Title metadata embedded in the PDF /Info dictionary.
    title: String,
}

impl Default for PdfWriter {
    fn default() -> Self {
        Self::new("Masked document")
    }
}

impl PdfWriter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Create a PDF with one page per raster, in the given order.
    #[instrument(skip_all, fields(pages = pages.len()))]
    pub fn create_from_pages(&self, pages: &[RenderedPage]) -> Result<Vec<u8>> {
        if pages.is_empty() {
            return Err(MaskError::Assembly("no pages to write".into()));
        }

        info!(title = %self.title, "Creating image PDF");

        let mut doc = PdfDocument::new(&self.title);
        let mut pdf_pages = Vec::with_capacity(pages.len());

        for (index, page) in pages.iter().enumerate() {
            let dpi = page.dpi();
            if !(dpi.is_finite() && dpi > 0.0) {
                return Err(MaskError::Assembly(format!(
                    "page {} has invalid resolution {}",
                    index, dpi
                )));
            }

            let rgb = page.image.to_rgb8();
            let (width, height) = rgb.dimensions();
            let raw = RawImage {
                pixels: RawImageData::U8(rgb.into_raw()),
                width: width as usize,
                height: height as usize,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            let xobject_id = doc.add_image(&raw);

            let page_w = Mm(width as f32 / dpi * MM_PER_INCH);
            let page_h = Mm(height as f32 / dpi * MM_PER_INCH);

            // At its own DPI the image covers the page exactly.
            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(0.0)),
                    translate_y: Some(Pt(0.0)),
                    scale_x: None,
                    scale_y: None,
                    dpi: Some(dpi),
                    rotate: None,
                },
            }];

            debug!(page = index, width, height, dpi, "Raster placed on page");
            pdf_pages.push(PdfPage::new(page_w, page_h, ops));
        }

        doc.with_pages(pdf_pages);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let output = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            debug!(warnings = warnings.len(), "printpdf reported warnings");
        }

        Ok(output)
    }
}
