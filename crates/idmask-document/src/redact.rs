// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Redaction compositor — map recognition polygons from analysis space onto the
// original-resolution raster and paint them over with opaque fill.

use ::image::{DynamicImage, Rgb, Rgba};
use idmask_core::types::{CoordinateUnit, MaskRect, PageGeometry, RecognitionToken};
use imageproc::drawing::{Canvas, draw_filled_rect_mut};
use imageproc::rect::Rect;
use tracing::{debug, instrument};

/// Fill colour for masked regions (orange).
pub const MASK_COLOR: Rgb<u8> = Rgb([255, 165, 0]);

/// PDF user-space units per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// Paints mask rectangles onto page rasters.
#[derive(Debug, Clone, Copy)]
pub struct RedactionCompositor {
    color: Rgb<u8>,
}

impl Default for RedactionCompositor {
    fn default() -> Self {
        Self { color: MASK_COLOR }
    }
}

impl RedactionCompositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Backend units → original-resolution pixels.
    pub fn conversion_factor(unit: CoordinateUnit, geometry: &PageGeometry) -> f32 {
        match unit {
            CoordinateUnit::Inch => POINTS_PER_INCH * geometry.render_scale,
            CoordinateUnit::Pixel => geometry.scale_factor,
        }
    }

    /// Axis-aligned bounds of a token polygon in original pixels. `None` for
    /// an empty polygon.
    pub fn mask_rect(token: &RecognitionToken, geometry: &PageGeometry) -> Option<MaskRect> {
        let factor = Self::conversion_factor(token.unit, geometry);
        let mut points = token.polygon.iter();
        let first = points.next()?;
        let mut rect = MaskRect {
            x0: first.x,
            y0: first.y,
            x1: first.x,
            y1: first.y,
        };
        for p in points {
            rect.x0 = rect.x0.min(p.x);
            rect.y0 = rect.y0.min(p.y);
            rect.x1 = rect.x1.max(p.x);
            rect.y1 = rect.y1.max(p.y);
        }
        Some(MaskRect {
            x0: rect.x0 * factor,
            y0: rect.y0 * factor,
            x1: rect.x1 * factor,
            y1: rect.y1 * factor,
        })
    }

    /// Paint `rects` in the mask colour, keeping the page's sample depth and
    /// alpha channel. Grey pages are widened to RGB of the same depth so the
    /// fill stays orange; their existing pixel values are unchanged.
    pub fn paint(&self, page: DynamicImage, rects: &[MaskRect]) -> DynamicImage {
        let [r, g, b] = self.color.0;
        let wide = |c: u8| u16::from(c) * 257;
        let float = |c: u8| f32::from(c) / 255.0;

        let page = match page {
            DynamicImage::ImageLuma8(_) => DynamicImage::ImageRgb8(page.into_rgb8()),
            DynamicImage::ImageLumaA8(_) => DynamicImage::ImageRgba8(page.into_rgba8()),
            DynamicImage::ImageLuma16(_) => DynamicImage::ImageRgb16(page.into_rgb16()),
            DynamicImage::ImageLumaA16(_) => DynamicImage::ImageRgba16(page.into_rgba16()),
            other => other,
        };

        match page {
            DynamicImage::ImageRgb8(mut buf) => {
                fill_rects(&mut buf, rects, self.color);
                DynamicImage::ImageRgb8(buf)
            }
            DynamicImage::ImageRgba8(mut buf) => {
                fill_rects(&mut buf, rects, Rgba([r, g, b, u8::MAX]));
                DynamicImage::ImageRgba8(buf)
            }
            DynamicImage::ImageRgb16(mut buf) => {
                fill_rects(&mut buf, rects, Rgb([wide(r), wide(g), wide(b)]));
                DynamicImage::ImageRgb16(buf)
            }
            DynamicImage::ImageRgba16(mut buf) => {
                fill_rects(&mut buf, rects, Rgba([wide(r), wide(g), wide(b), u16::MAX]));
                DynamicImage::ImageRgba16(buf)
            }
            DynamicImage::ImageRgb32F(mut buf) => {
                fill_rects(&mut buf, rects, Rgb([float(r), float(g), float(b)]));
                DynamicImage::ImageRgb32F(buf)
            }
            DynamicImage::ImageRgba32F(mut buf) => {
                fill_rects(&mut buf, rects, Rgba([float(r), float(g), float(b), 1.0]));
                DynamicImage::ImageRgba32F(buf)
            }
            other => {
                let mut buf = other.into_rgba8();
                fill_rects(&mut buf, rects, Rgba([r, g, b, u8::MAX]));
                DynamicImage::ImageRgba8(buf)
            }
        }
    }

    /// Mask `tokens` on the page's original raster.
    ///
    /// Returns the painted raster and the rectangles that were applied.
    #[instrument(skip_all, fields(tokens = tokens.len()))]
    pub fn apply(
        &self,
        original: DynamicImage,
        tokens: &[&RecognitionToken],
        geometry: &PageGeometry,
    ) -> (DynamicImage, Vec<MaskRect>) {
        let rects: Vec<MaskRect> = tokens
            .iter()
            .filter_map(|token| Self::mask_rect(token, geometry))
            .collect();
        if rects.is_empty() {
            return (original, rects);
        }

        let painted = self.paint(original, &rects);
        debug!(regions = rects.len(), "Mask regions painted");
        (painted, rects)
    }
}

/// Fill every rectangle with `color`, covering `floor(x0)..ceil(x1)` by
/// `floor(y0)..ceil(y1)` clipped to the canvas.
pub fn fill_rects<C: Canvas>(canvas: &mut C, rects: &[MaskRect], color: C::Pixel) {
    let (width, height) = canvas.dimensions();
    for rect in rects {
        let x_start = rect.x0.floor().max(0.0) as i64;
        let y_start = rect.y0.floor().max(0.0) as i64;
        let x_end = (rect.x1.ceil() as i64).min(width as i64);
        let y_end = (rect.y1.ceil() as i64).min(height as i64);
        if x_end <= x_start || y_end <= y_start {
            continue;
        }
        let area = Rect::at(x_start as i32, y_start as i32)
            .of_size((x_end - x_start) as u32, (y_end - y_start) as u32);
        draw_filled_rect_mut(canvas, area, color);
    }
}
