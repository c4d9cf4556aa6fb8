// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Multi-frame raster decoding — multi-page TIFF (via the `tiff` crate) and
// animated GIF (via the `image` crate's animation decoder).
//
// Frame counts are established before any frame is decoded so the page limit
// can be enforced cheaply.

use std::io::Cursor;

use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, DynamicImage, GrayImage, RgbImage, RgbaImage};
use idmask_core::error::{MaskError, Result};
use tiff::ColorType;
use tiff::decoder::{Decoder, DecodingResult};
use tracing::debug;

/// Count the frames of a multi-frame raster without decoding pixel data for
/// more than `limit + 1` frames.
pub fn count_frames(bytes: &[u8], limit: usize) -> Result<usize> {
    if is_tiff(bytes) {
        let mut decoder = tiff_decoder(bytes)?;
        let mut count = 1;
        while decoder.more_images() && count <= limit {
            decoder
                .next_image()
                .map_err(|err| MaskError::Format(format!("corrupt TIFF directory: {}", err)))?;
            count += 1;
        }
        Ok(count)
    } else {
        let decoder = GifDecoder::new(Cursor::new(bytes))
            .map_err(|err| MaskError::Format(format!("failed to open GIF: {}", err)))?;
        let mut count = 0;
        for frame in decoder.into_frames() {
            frame.map_err(|err| MaskError::Format(format!("corrupt GIF frame: {}", err)))?;
            count += 1;
            if count > limit {
                break;
            }
        }
        Ok(count)
    }
}

/// Decode every frame in order.
pub fn decode_frames(bytes: &[u8]) -> Result<Vec<DynamicImage>> {
    let frames = if is_tiff(bytes) {
        decode_tiff(bytes)?
    } else {
        decode_gif(bytes)?
    };
    if frames.is_empty() {
        return Err(MaskError::Format("multi-frame image has no frames".into()));
    }
    debug!(frames = frames.len(), "Multi-frame image decoded");
    Ok(frames)
}

fn is_tiff(bytes: &[u8]) -> bool {
    bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*")
}

fn tiff_decoder(bytes: &[u8]) -> Result<Decoder<Cursor<&[u8]>>> {
    Decoder::new(Cursor::new(bytes))
        .map_err(|err| MaskError::Format(format!("failed to open TIFF: {}", err)))
}

fn decode_tiff(bytes: &[u8]) -> Result<Vec<DynamicImage>> {
    let mut decoder = tiff_decoder(bytes)?;
    let mut frames = Vec::new();
    loop {
        frames.push(decode_tiff_frame(&mut decoder, frames.len())?);
        if !decoder.more_images() {
            break;
        }
        decoder
            .next_image()
            .map_err(|err| MaskError::Format(format!("corrupt TIFF directory: {}", err)))?;
    }
    Ok(frames)
}

fn decode_tiff_frame(decoder: &mut Decoder<Cursor<&[u8]>>, index: usize) -> Result<DynamicImage> {
    let corrupt = |err: tiff::TiffError| {
        MaskError::Format(format!("failed to decode TIFF frame {}: {}", index, err))
    };
    let (width, height) = decoder.dimensions().map_err(corrupt)?;
    let color = decoder.colortype().map_err(corrupt)?;
    let data = match decoder.read_image().map_err(corrupt)? {
        DecodingResult::U8(data) => data,
        _ => {
            return Err(MaskError::Format(format!(
                "TIFF frame {} uses an unsupported sample depth",
                index
            )));
        }
    };

    let unsupported = || {
        MaskError::Format(format!(
            "TIFF frame {} has unsupported colour type {:?}",
            index, color
        ))
    };
    let image = match color {
        ColorType::Gray(8) => {
            DynamicImage::ImageLuma8(GrayImage::from_raw(width, height, data).ok_or_else(unsupported)?)
        }
        ColorType::RGB(8) => {
            DynamicImage::ImageRgb8(RgbImage::from_raw(width, height, data).ok_or_else(unsupported)?)
        }
        ColorType::RGBA(8) => {
            DynamicImage::ImageRgba8(RgbaImage::from_raw(width, height, data).ok_or_else(unsupported)?)
        }
        _ => return Err(unsupported()),
    };
    Ok(image)
}

fn decode_gif(bytes: &[u8]) -> Result<Vec<DynamicImage>> {
    let decoder = GifDecoder::new(Cursor::new(bytes))
        .map_err(|err| MaskError::Format(format!("failed to open GIF: {}", err)))?;
    let frames = decoder
        .into_frames()
        .collect_frames()
        .map_err(|err| MaskError::Format(format!("failed to decode GIF frames: {}", err)))?;
    Ok(frames
        .into_iter()
        .map(|frame| DynamicImage::ImageRgba8(frame.into_buffer()))
        .collect())
}
