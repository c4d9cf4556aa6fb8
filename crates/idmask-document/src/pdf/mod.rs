// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — inspecting input PDFs, rasterising their pages, and writing
// masked pages back out as a PDF.

pub mod raster;
pub mod reader;
pub mod writer;

pub use raster::{EmbeddedImageRasterizer, PageRasterizer, RenderedPage};
pub use reader::PdfReader;
pub use writer::PdfWriter;

#[cfg(feature = "pdfium")]
pub use raster::PdfiumRasterizer;
