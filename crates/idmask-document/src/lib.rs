// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// idmask-document — Document handling for the idmask redaction pipeline.
//
// Normalises inputs (single image, multi-page PDF, multi-frame raster) into
// pages at original and analysis resolution, paints redaction rectangles on
// the original rasters, and reassembles masked pages into one output artifact.

pub mod assemble;
pub mod image;
pub mod loader;
pub mod pdf;
pub mod redact;
pub mod scan;

pub use assemble::{AssembledOutput, PageAssembler};
pub use self::image::processor::ImageProcessor;
pub use loader::{DocumentLoader, LoadedDocument, Page, SourceEncoding};
pub use pdf::raster::{EmbeddedImageRasterizer, PageRasterizer, RenderedPage};
pub use pdf::reader::PdfReader;
pub use pdf::writer::PdfWriter;
pub use redact::{MASK_COLOR, RedactionCompositor};

#[cfg(feature = "pdfium")]
pub use pdf::raster::PdfiumRasterizer;

#[cfg(feature = "ocr")]
pub use scan::{OcrConfig, OcrsRecognizer};
