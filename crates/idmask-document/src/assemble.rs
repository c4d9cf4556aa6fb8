// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page assembler — re-encode masked pages into the single output artifact and
// summarise the per-page outcomes.

use idmask_core::config::{ImageOutput, OutputConfig};
use idmask_core::error::{MaskError, Result};
use idmask_core::types::{DocumentFormat, PageOutcome, PageReport};
use tracing::{info, instrument};

use crate::image::processor::ImageProcessor;
use crate::loader::SourceEncoding;
use crate::pdf::raster::RenderedPage;
use crate::pdf::writer::PdfWriter;

pub const SUMMARY_MASKED: &str = "identity number masking completed";
pub const SUMMARY_CHECKSUM_FAILED: &str = "checksum failed, invalid identity number detected";
pub const SUMMARY_NOT_FOUND: &str = "no identity number detected";

/// The encoded output document.
#[derive(Debug, Clone)]
pub struct AssembledOutput {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
}

/// Encodes masked pages according to the input format and output settings.
#[derive(Debug, Clone, Default)]
pub struct PageAssembler {
    output: OutputConfig,
}

impl PageAssembler {
    pub fn new(output: OutputConfig) -> Self {
        Self { output }
    }

    /// Encode `pages` (already in input order) into one artifact.
    ///
    /// Single images keep their encoding unless configured otherwise; PDFs and
    /// multi-frame rasters always come back as a PDF.
    #[instrument(skip_all, fields(%format, pages = pages.len()))]
    pub fn assemble(
        &self,
        format: DocumentFormat,
        encoding: SourceEncoding,
        pages: Vec<RenderedPage>,
    ) -> Result<AssembledOutput> {
        let output = match format {
            DocumentFormat::Image => self.assemble_image(encoding, pages)?,
            DocumentFormat::Pdf | DocumentFormat::MultiFrame => self.assemble_pdf(&pages)?,
        };
        info!(
            bytes = output.bytes.len(),
            mime_type = output.mime_type,
            "Output assembled"
        );
        Ok(output)
    }

    fn assemble_image(
        &self,
        encoding: SourceEncoding,
        mut pages: Vec<RenderedPage>,
    ) -> Result<AssembledOutput> {
        if pages.len() != 1 {
            return Err(MaskError::Assembly(format!(
                "image documents have exactly one page, got {}",
                pages.len()
            )));
        }
        let target = match (self.output.image_output, encoding) {
            (ImageOutput::Source, SourceEncoding::Jpeg) | (ImageOutput::Jpeg, _) => ImageOutput::Jpeg,
            (ImageOutput::Source, SourceEncoding::Png) | (ImageOutput::Png, _) => ImageOutput::Png,
            (ImageOutput::Pdf, _) => ImageOutput::Pdf,
        };

        if target == ImageOutput::Pdf {
            return self.assemble_pdf(&pages);
        }

        let page = pages.remove(0);
        let processor = ImageProcessor::from_dynamic(page.image);
        if target == ImageOutput::Jpeg {
            Ok(AssembledOutput {
                bytes: processor.to_jpeg_bytes(self.output.jpeg_quality)?,
                mime_type: "image/jpeg",
            })
        } else {
            Ok(AssembledOutput {
                bytes: processor.to_png_bytes()?,
                mime_type: "image/png",
            })
        }
    }

    fn assemble_pdf(&self, pages: &[RenderedPage]) -> Result<AssembledOutput> {
        Ok(AssembledOutput {
            bytes: PdfWriter::default().create_from_pages(pages)?,
            mime_type: "application/pdf",
        })
    }

    /// Document-level validity: true when any page was masked.
    pub fn is_valid(reports: &[PageReport]) -> bool {
        reports.iter().any(|r| r.valid)
    }

    /// One-line summary for the whole document.
    pub fn summary(reports: &[PageReport]) -> &'static str {
        if Self::is_valid(reports) {
            SUMMARY_MASKED
        } else if reports
            .iter()
            .any(|r| r.outcome == PageOutcome::ChecksumFailed)
        {
            SUMMARY_CHECKSUM_FAILED
        } else {
            SUMMARY_NOT_FOUND
        }
    }
}
