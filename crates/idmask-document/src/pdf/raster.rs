// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rasterisation — turn each PDF page into a bitmap the recognition
// backend can read and the compositor can paint on.
//
// The default rasteriser is pure Rust and lifts the scanned image embedded in
// each page. With the `pdfium` feature, pages are rendered properly through
// the pdfium library at a configurable scale.

use ::image::DynamicImage;
use idmask_core::error::{MaskError, Result};
use tracing::{debug, info, instrument};

use super::reader::PdfReader;

/// One rasterised PDF page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub image: DynamicImage,
    /// Raster pixels per PDF point.
    pub render_scale: f32,
}

impl RenderedPage {
    pub fn new(image: DynamicImage, render_scale: f32) -> Self {
        Self {
            image,
            render_scale,
        }
    }

    /// Resolution the page should be written back at.
    pub fn dpi(&self) -> f32 {
        72.0 * self.render_scale
    }
}

/// Turns PDF bytes into one bitmap per page, in page order.
pub trait PageRasterizer: Send + Sync {
    fn name(&self) -> &str;

    fn rasterize(&self, pdf: &[u8]) -> Result<Vec<RenderedPage>>;
}

/// Extracts the largest embedded image of each page. Suitable for scanned
/// PDFs, where every page is a single full-page photograph.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedImageRasterizer;

impl PageRasterizer for EmbeddedImageRasterizer {
    fn name(&self) -> &str {
        "embedded-image"
    }

    #[instrument(skip_all, fields(bytes_len = pdf.len()))]
    fn rasterize(&self, pdf: &[u8]) -> Result<Vec<RenderedPage>> {
        let reader = PdfReader::from_bytes(pdf)?;
        let sizes = reader.page_sizes();
        let images = reader.page_images()?;

        let mut pages = Vec::with_capacity(images.len());
        for (index, (image, (width_pt, _))) in images.into_iter().zip(sizes).enumerate() {
            let image = image.ok_or_else(|| {
                MaskError::Pdf(format!(
                    "page {} has no embedded raster; vector pages need the pdfium renderer",
                    index
                ))
            })?;
            let render_scale = image.width() as f32 / width_pt;
            debug!(page = index, width = image.width(), render_scale, "Embedded image extracted");
            pages.push(RenderedPage::new(image, render_scale));
        }

        info!(pages = pages.len(), "PDF rasterised from embedded images");
        Ok(pages)
    }
}

#[cfg(feature = "pdfium")]
pub use self::pdfium::PdfiumRasterizer;

#[cfg(feature = "pdfium")]
mod pdfium {
    use std::path::PathBuf;

    use idmask_core::error::{MaskError, Result};
    use pdfium_render::prelude::*;
    use tracing::{debug, info, instrument};

    use super::{PageRasterizer, RenderedPage};

    /// Renders pages through the pdfium library.
    #[derive(Debug, Clone)]
    pub struct PdfiumRasterizer {
        /// Pixels per point (5.0 ≈ 360 DPI).
        scale: f32,
        /// Directory holding the pdfium shared library; system search when unset.
        library_dir: Option<PathBuf>,
    }

    impl PdfiumRasterizer {
        pub fn new(scale: f32) -> Self {
            Self {
                scale,
                library_dir: None,
            }
        }

        pub fn with_library_dir(mut self, dir: impl Into<PathBuf>) -> Self {
            self.library_dir = Some(dir.into());
            self
        }

        fn bind(&self) -> Result<Pdfium> {
            let bindings = match &self.library_dir {
                Some(dir) => {
                    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir))
                }
                None => Pdfium::bind_to_system_library(),
            };
            bindings
                .map(Pdfium::new)
                .map_err(|err| MaskError::Pdf(format!("pdfium library unavailable: {}", err)))
        }
    }

    impl PageRasterizer for PdfiumRasterizer {
        fn name(&self) -> &str {
            "pdfium"
        }

        #[instrument(skip_all, fields(bytes_len = pdf.len(), scale = self.scale))]
        fn rasterize(&self, pdf: &[u8]) -> Result<Vec<RenderedPage>> {
            let pdfium = self.bind()?;
            let document = pdfium
                .load_pdf_from_byte_slice(pdf, None)
                .map_err(|err| MaskError::Pdf(format!("pdfium failed to load PDF: {}", err)))?;

            let mut pages = Vec::new();
            for (index, page) in document.pages().iter().enumerate() {
                let width_pt = page.width().value;
                let height_pt = page.height().value;
                let config = PdfRenderConfig::new()
                    .set_target_width((width_pt * self.scale) as i32)
                    .set_target_height((height_pt * self.scale) as i32);
                let bitmap = page.render_with_config(&config).map_err(|err| {
                    MaskError::Pdf(format!("failed to render page {}: {}", index, err))
                })?;
                let image = bitmap.as_image();
                let render_scale = image.width() as f32 / width_pt;
                debug!(page = index, width = image.width(), height = image.height(), "Page rendered");
                pages.push(RenderedPage::new(image, render_scale));
            }

            info!(pages = pages.len(), "PDF rendered with pdfium");
            Ok(pages)
        }
    }
}
