// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — analysis downscaling, quarter-turn orientation, Gaussian
// blur pre-filter, and encoding. Operates on in-memory images using the
// `image` and `imageproc` crates.

use image::{DynamicImage, ImageFormat};
use imageproc::filter::gaussian_blur_f32;
use idmask_core::error::{MaskError, Result};
use idmask_core::types::Orientation;
use tracing::{debug, instrument};

/// Image processing pipeline operating on a single in-memory image.
///
/// Each transformation consumes `self` and returns a new `ImageProcessor`,
/// enabling method chaining:
///
/// ```ignore
/// let probe = ImageProcessor::from_dynamic(page)
///     .orient(Orientation::Ccw90)
///     .blur(1.5)
///     .into_dynamic();
/// ```
pub struct ImageProcessor {
    /// The current working image.
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data)
            .map_err(|err| MaskError::Format(format!("failed to decode image: {}", err)))?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Image decoded from bytes"
        );
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations (consume self, return new Self) -----------------------

    /// Downscale to at most `max_width` pixels wide, preserving aspect ratio.
    /// Images already narrow enough are returned untouched. Uses Lanczos3.
    #[instrument(skip(self), fields(max_width))]
    pub fn downscale_to_width(self, max_width: u32) -> Self {
        if self.image.width() <= max_width {
            return self;
        }
        let resized = self.image.resize(
            max_width,
            self.image.height(),
            image::imageops::FilterType::Lanczos3,
        );
        debug!(
            new_w = resized.width(),
            new_h = resized.height(),
            "Analysis copy downscaled"
        );
        Self { image: resized }
    }

    /// Apply a lossless quarter-turn orientation.
    pub fn orient(self, orientation: Orientation) -> Self {
        let image = match orientation {
            Orientation::Upright => return self,
            Orientation::Ccw90 => self.image.rotate270(),
            Orientation::Rotated180 => self.image.rotate180(),
            Orientation::Cw90 => self.image.rotate90(),
        };
        Self { image }
    }

    /// Grayscale Gaussian blur, used as a denoising pre-filter before
    /// re-running recognition. A non-positive sigma is a no-op.
    pub fn blur(self, sigma: f32) -> Self {
        if sigma <= 0.0 {
            return self;
        }
        let gray = self.image.to_luma8();
        Self {
            image: DynamicImage::ImageLuma8(gaussian_blur_f32(&gray, sigma)),
        }
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the current image as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Encode the current image as JPEG bytes with the given quality (1-100).
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality);
        rgb.write_with_encoder(encoder)
            .map_err(|err| MaskError::Assembly(format!("JPEG encoding failed: {}", err)))?;
        Ok(buffer)
    }
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| MaskError::Assembly(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use image::{GenericImageView, Rgba, RgbaImage};

    use super::*;

    #[test]
    fn downscale_preserves_aspect_ratio() {
        let img = DynamicImage::new_rgb8(3000, 2000);
        let out = ImageProcessor::from_dynamic(img).downscale_to_width(1500);
        assert_eq!(out.width(), 1500);
        assert_eq!(out.height(), 1000);
    }

    #[test]
    fn downscale_leaves_narrow_images_alone() {
        let img = DynamicImage::new_rgb8(800, 600);
        let out = ImageProcessor::from_dynamic(img).downscale_to_width(1500);
        assert_eq!((out.width(), out.height()), (800, 600));
    }

    #[test]
    fn quarter_turns_move_a_marker_pixel() {
        let mut img = RgbaImage::from_pixel(4, 2, Rgba([0, 0, 0, 255]));
        img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
        let base = DynamicImage::ImageRgba8(img);

        let ccw = ImageProcessor::from_dynamic(base.clone())
            .orient(Orientation::Ccw90)
            .into_dynamic();
        assert_eq!(ccw.dimensions(), (2, 4));
        // Top-left corner ends up bottom-left after a counter-clockwise turn.
        assert_eq!(ccw.get_pixel(0, 3), Rgba([255, 0, 0, 255]));

        let cw = ImageProcessor::from_dynamic(base.clone())
            .orient(Orientation::Cw90)
            .into_dynamic();
        assert_eq!(cw.get_pixel(1, 0), Rgba([255, 0, 0, 255]));

        let flipped = ImageProcessor::from_dynamic(base)
            .orient(Orientation::Rotated180)
            .into_dynamic();
        assert_eq!(flipped.get_pixel(3, 1), Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn blur_keeps_dimensions() {
        let img = DynamicImage::new_rgb8(40, 30);
        let out = ImageProcessor::from_dynamic(img).blur(1.5);
        assert_eq!((out.width(), out.height()), (40, 30));
    }

    #[test]
    fn png_round_trip_decodes() {
        let img = DynamicImage::new_rgb8(10, 10);
        let bytes = ImageProcessor::from_dynamic(img).to_png_bytes().unwrap();
        let back = ImageProcessor::from_bytes(&bytes).unwrap();
        assert_eq!((back.width(), back.height()), (10, 10));
    }

    #[test]
    fn garbage_bytes_are_a_format_error() {
        assert!(matches!(
            ImageProcessor::from_bytes(b"not an image"),
            Err(MaskError::Format(_))
        ));
    }
}
