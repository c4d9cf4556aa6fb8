// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document loader — sniff the input, enforce the page limit, and normalise
// every page into an original-resolution raster plus an analysis copy.

use std::sync::Arc;

use ::image::{DynamicImage, ImageFormat};
use idmask_core::config::MaskConfig;
use idmask_core::error::{MaskError, Result};
use idmask_core::types::{DocumentFormat, Orientation, PageGeometry};
use tracing::{debug, info, instrument};

use crate::image::frames;
use crate::image::processor::ImageProcessor;
use crate::pdf::raster::PageRasterizer;
use crate::pdf::reader::PdfReader;

/// Encoding a single-image document is written back in when the output
/// mirrors the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceEncoding {
    Jpeg,
    Png,
}

impl SourceEncoding {
    fn sniff(bytes: &[u8]) -> Self {
        match ::image::guess_format(bytes) {
            Ok(ImageFormat::Jpeg) => Self::Jpeg,
            _ => Self::Png,
        }
    }
}

/// One page at both resolutions.
#[derive(Debug, Clone)]
pub struct Page {
    /// Zero-based position in the input document.
    pub index: usize,
    pub geometry: PageGeometry,
    /// Full-resolution raster; masks are painted here.
    pub original: DynamicImage,
    /// Copy handed to the recognition backend.
    pub analysis: DynamicImage,
}

impl Page {
    fn new(index: usize, original: DynamicImage, analysis: DynamicImage, render_scale: f32) -> Self {
        let geometry = PageGeometry::new(
            (original.width(), original.height()),
            (analysis.width(), analysis.height()),
            render_scale,
        );
        Self {
            index,
            geometry,
            original,
            analysis,
        }
    }

    /// Rotate both rasters and recompute the geometry.
    pub fn reorient(self, orientation: Orientation) -> Self {
        if orientation == Orientation::Upright {
            return self;
        }
        let original = ImageProcessor::from_dynamic(self.original)
            .orient(orientation)
            .into_dynamic();
        let analysis = ImageProcessor::from_dynamic(self.analysis)
            .orient(orientation)
            .into_dynamic();
        Self::new(self.index, original, analysis, self.geometry.render_scale)
    }
}

/// A normalised input document.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub format: DocumentFormat,
    pub source_encoding: SourceEncoding,
    pub pages: Vec<Page>,
}

impl LoadedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Turns raw input bytes into a [`LoadedDocument`].
#[derive(Clone)]
pub struct DocumentLoader {
    max_pages: usize,
    analysis_max_width: u32,
    resize_threshold_bytes: usize,
    rasterizer: Arc<dyn PageRasterizer>,
}

impl DocumentLoader {
    pub fn new(config: &MaskConfig, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        Self {
            max_pages: config.max_pages,
            analysis_max_width: config.analysis_max_width,
            resize_threshold_bytes: config.resize_threshold_bytes,
            rasterizer,
        }
    }

    /// Identify the input format from its magic bytes.
    pub fn detect_format(bytes: &[u8]) -> Result<DocumentFormat> {
        if bytes.is_empty() {
            return Err(MaskError::Format("empty input".into()));
        }
        DocumentFormat::sniff(bytes)
            .ok_or_else(|| MaskError::Format("unrecognised document format".into()))
    }

    /// Count pages without decoding any pixel data beyond what the format
    /// requires to find page boundaries.
    pub fn count_pages(&self, format: DocumentFormat, bytes: &[u8]) -> Result<usize> {
        match format {
            DocumentFormat::Image => Ok(1),
            DocumentFormat::Pdf => PdfReader::from_bytes(bytes)
                .map(|reader| reader.page_count())
                .map_err(|err| match err {
                    MaskError::Pdf(reason) => MaskError::Format(reason),
                    other => other,
                }),
            DocumentFormat::MultiFrame => frames::count_frames(bytes, self.max_pages),
        }
    }

    /// Load, limit-check, and normalise a document.
    #[instrument(skip_all, fields(bytes_len = bytes.len()))]
    pub fn load(&self, bytes: &[u8]) -> Result<LoadedDocument> {
        let format = Self::detect_format(bytes)?;
        let page_count = self.count_pages(format, bytes)?;
        if page_count == 0 {
            return Err(MaskError::Format("document has no pages".into()));
        }
        if page_count > self.max_pages {
            return Err(MaskError::PageLimitExceeded {
                pages: page_count,
                max: self.max_pages,
            });
        }
        info!(%format, page_count, "Document accepted");

        let (source_encoding, pages) = match format {
            DocumentFormat::Image => {
                let original = ImageProcessor::from_bytes(bytes)?.into_dynamic();
                let analysis = self.analysis_copy(&original, bytes.len());
                (
                    SourceEncoding::sniff(bytes),
                    vec![Page::new(0, original, analysis, 1.0)],
                )
            }
            DocumentFormat::MultiFrame => {
                let pages = frames::decode_frames(bytes)?
                    .into_iter()
                    .enumerate()
                    .map(|(index, original)| {
                        let analysis = self.analysis_copy(&original, bytes.len());
                        Page::new(index, original, analysis, 1.0)
                    })
                    .collect();
                (SourceEncoding::Png, pages)
            }
            DocumentFormat::Pdf => {
                let rendered = self.rasterizer.rasterize(bytes)?;
                if rendered.len() != page_count {
                    return Err(MaskError::Pdf(format!(
                        "{} rasteriser produced {} pages for a {} page document",
                        self.rasterizer.name(),
                        rendered.len(),
                        page_count
                    )));
                }
                let pages = rendered
                    .into_iter()
                    .enumerate()
                    .map(|(index, page)| {
                        // Rendered pages are always large enough to downscale.
                        let analysis = self.downscale(&page.image);
                        Page::new(index, page.image, analysis, page.render_scale)
                    })
                    .collect();
                (SourceEncoding::Png, pages)
            }
        };

        Ok(LoadedDocument {
            format,
            source_encoding,
            pages,
        })
    }

    /// Small inputs are analysed at full size.
    fn analysis_copy(&self, original: &DynamicImage, input_len: usize) -> DynamicImage {
        if input_len > self.resize_threshold_bytes {
            self.downscale(original)
        } else {
            original.clone()
        }
    }

    fn downscale(&self, original: &DynamicImage) -> DynamicImage {
        let analysis = ImageProcessor::from_dynamic(original.clone())
            .downscale_to_width(self.analysis_max_width)
            .into_dynamic();
        debug!(
            original_width = original.width(),
            analysis_width = analysis.width(),
            "Analysis copy prepared"
        );
        analysis
    }
}

#[cfg(test)]
mod tests {
    use ::image::codecs::gif::GifEncoder;
    use ::image::{Delay, Frame, Rgb, RgbImage, Rgba, RgbaImage};

    use super::*;
    use crate::pdf::raster::EmbeddedImageRasterizer;
    use crate::pdf::reader::tests::scanned_pdf;

    fn loader(config: MaskConfig) -> DocumentLoader {
        DocumentLoader::new(&config, Arc::new(EmbeddedImageRasterizer))
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([9, 9, 9])));
        ImageProcessor::from_dynamic(image).to_png_bytes().unwrap()
    }

    fn gif(frames: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        {
            let mut encoder = GifEncoder::new(&mut bytes);
            for _ in 0..frames {
                let buffer = RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 255]));
                encoder
                    .encode_frame(Frame::from_parts(buffer, 0, 0, Delay::from_numer_denom_ms(10, 1)))
                    .unwrap();
            }
        }
        bytes
    }

    #[test]
    fn small_image_is_analysed_at_full_size() {
        let doc = loader(MaskConfig::default()).load(&png(3000, 100)).unwrap();
        assert_eq!(doc.format, DocumentFormat::Image);
        assert_eq!(doc.source_encoding, SourceEncoding::Png);
        assert_eq!(doc.pages[0].geometry.analysis_width, 3000);
        assert_eq!(doc.pages[0].geometry.scale_factor, 1.0);
    }

    #[test]
    fn large_image_is_downscaled_for_analysis() {
        let config = MaskConfig {
            resize_threshold_bytes: 0,
            ..MaskConfig::default()
        };
        let doc = loader(config).load(&png(3000, 100)).unwrap();
        let geometry = doc.pages[0].geometry;
        assert_eq!(geometry.original_width, 3000);
        assert_eq!(geometry.analysis_width, 1500);
        assert_eq!(geometry.scale_factor, 2.0);
    }

    #[test]
    fn page_limit_applies_to_pdfs() {
        let bytes = scanned_pdf(&[(10, 5, 0), (10, 5, 0), (10, 5, 0), (10, 5, 0)]);
        let err = loader(MaskConfig::default()).load(&bytes).unwrap_err();
        assert!(matches!(err, MaskError::PageLimitExceeded { pages: 4, max: 3 }));
    }

    #[test]
    fn page_limit_applies_to_frames() {
        let config = MaskConfig {
            max_pages: 2,
            ..MaskConfig::default()
        };
        let err = loader(config).load(&gif(3)).unwrap_err();
        assert!(matches!(err, MaskError::PageLimitExceeded { max: 2, .. }));
    }

    #[test]
    fn pdf_pages_carry_render_scale() {
        let bytes = scanned_pdf(&[(400, 200, 0), (400, 200, 0)]);
        let doc = loader(MaskConfig::default()).load(&bytes).unwrap();
        assert_eq!(doc.format, DocumentFormat::Pdf);
        assert_eq!(doc.page_count(), 2);
        assert_eq!(doc.pages[1].index, 1);
        assert_eq!(doc.pages[1].geometry.render_scale, 2.0);
    }

    #[test]
    fn unknown_bytes_are_a_format_error() {
        assert!(matches!(
            loader(MaskConfig::default()).load(b"plain text"),
            Err(MaskError::Format(_))
        ));
        assert!(matches!(
            loader(MaskConfig::default()).load(b""),
            Err(MaskError::Format(_))
        ));
    }

    #[test]
    fn corrupt_pdf_body_is_a_format_error() {
        let err = loader(MaskConfig::default())
            .load(b"%PDF-1.7\ntruncated garbage")
            .unwrap_err();
        assert!(matches!(err, MaskError::Format(_)), "got {err:?}");
    }

    #[test]
    fn reorient_swaps_geometry_for_quarter_turns() {
        let doc = loader(MaskConfig::default()).load(&png(40, 10)).unwrap();
        let page = doc.pages.into_iter().next().unwrap().reorient(Orientation::Cw90);
        assert_eq!((page.geometry.original_width, page.geometry.original_height), (10, 40));
        assert_eq!(page.analysis.width(), 10);
    }
}
