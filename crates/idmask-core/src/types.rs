// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the idmask redaction pipeline.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one masking request, carried in every log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Supported input document shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentFormat {
    /// A single raster image (JPEG, PNG, ...).
    Image,
    /// A PDF with one or more pages.
    Pdf,
    /// A multi-frame raster (multi-page TIFF, animated GIF).
    MultiFrame,
}

impl DocumentFormat {
    /// Infer the format from leading magic bytes.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(b"%PDF") {
            Some(Self::Pdf)
        } else if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
            Some(Self::MultiFrame)
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            Some(Self::MultiFrame)
        } else if image::guess_format(bytes).is_ok() {
            Some(Self::Image)
        } else {
            None
        }
    }
}

impl std::fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Image => "image",
            Self::Pdf => "pdf",
            Self::MultiFrame => "multiframe",
        };
        f.write_str(name)
    }
}

/// Unit of the coordinates a recognition backend reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateUnit {
    /// Pixels of the image handed to the backend (analysis resolution).
    #[default]
    Pixel,
    /// Inches on the physical page (document services analysing PDFs).
    Inch,
}

/// A polygon vertex in backend coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// A recognised text fragment with its bounding polygon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionToken {
    pub content: String,
    pub polygon: Vec<Point>,
    pub unit: CoordinateUnit,
}

impl RecognitionToken {
    pub fn new(content: impl Into<String>, polygon: Vec<Point>, unit: CoordinateUnit) -> Self {
        Self {
            content: content.into(),
            polygon,
            unit,
        }
    }

    /// Axis-aligned token from its top-left and bottom-right corners.
    pub fn from_rect(
        content: impl Into<String>,
        (x0, y0): (f32, f32),
        (x1, y1): (f32, f32),
        unit: CoordinateUnit,
    ) -> Self {
        let polygon = vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ];
        Self::new(content, polygon, unit)
    }
}

/// Everything a backend recognised on one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionResult {
    /// Token contents joined by a single space, in reading order.
    pub text: String,
    pub tokens: Vec<RecognitionToken>,
    pub unit: CoordinateUnit,
}

impl RecognitionResult {
    /// Build a result whose text is the trimmed token contents joined by a
    /// single space.
    pub fn from_tokens(tokens: Vec<RecognitionToken>, unit: CoordinateUnit) -> Self {
        let text = tokens
            .iter()
            .map(|t| t.content.trim())
            .filter(|c| !c.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Self { text, tokens, unit }
    }
}

/// Geometry of a loaded page at both resolutions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub original_width: u32,
    pub original_height: u32,
    pub analysis_width: u32,
    pub analysis_height: u32,
    /// Analysis → original multiplier for pixel coordinates.
    pub scale_factor: f32,
    /// Raster pixels per PDF point; 1.0 for non-PDF pages.
    pub render_scale: f32,
}

impl PageGeometry {
    pub fn new(original: (u32, u32), analysis: (u32, u32), render_scale: f32) -> Self {
        let scale_factor = if analysis.0 == 0 {
            1.0
        } else {
            original.0 as f32 / analysis.0 as f32
        };
        Self {
            original_width: original.0,
            original_height: original.1,
            analysis_width: analysis.0,
            analysis_height: analysis.1,
            scale_factor,
            render_scale,
        }
    }
}

/// Orientation applied to a page before masking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Upright,
    /// Rotated 90° counter-clockwise.
    Ccw90,
    Rotated180,
    /// Rotated 90° clockwise.
    Cw90,
}

impl Orientation {
    /// Probe order.
    pub const ALL: [Orientation; 4] = [
        Orientation::Upright,
        Orientation::Ccw90,
        Orientation::Rotated180,
        Orientation::Cw90,
    ];
}

/// A matched identity-number candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// The 12 digits with separators stripped.
    pub digits: String,
    /// The three literal 4-digit groups, left to right.
    pub groups: [String; 3],
}

impl Candidate {
    /// Groups that get redacted. The last group always stays visible.
    pub fn masked_groups(&self) -> [&str; 2] {
        [&self.groups[0], &self.groups[1]]
    }
}

/// Business outcome for one page. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageOutcome {
    /// At least one validated candidate was painted over.
    Masked,
    /// No grouped 12-digit pattern in the recognised text.
    NoMatch,
    /// A candidate was found but failed the Verhoeff check.
    ChecksumFailed,
    /// A candidate validated, but no recognition token matched its groups.
    TokensNotFound,
}

impl PageOutcome {
    pub fn is_valid(self) -> bool {
        self == Self::Masked
    }

    pub fn comment(self) -> &'static str {
        match self {
            Self::Masked => "identity number is valid and masked",
            Self::NoMatch => "no identity number detected",
            Self::ChecksumFailed => "checksum failed, invalid identity number detected",
            Self::TokensNotFound => {
                "identity number validated but no matching recognition tokens; no mask applied"
            }
        }
    }
}

/// A masking rectangle in original-resolution pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaskRect {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

/// Per-page result reported back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    /// Zero-based page index in input order.
    pub index: usize,
    pub outcome: PageOutcome,
    pub comment: String,
    pub valid: bool,
    pub masked_regions: Vec<MaskRect>,
    pub orientation: Orientation,
}

impl PageReport {
    pub fn new(index: usize, outcome: PageOutcome) -> Self {
        Self {
            index,
            outcome,
            comment: outcome.comment().to_string(),
            valid: outcome.is_valid(),
            masked_regions: Vec::new(),
            orientation: Orientation::Upright,
        }
    }
}

/// Lifecycle states of a masking request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestStage {
    Pending,
    Loading,
    Recognizing,
    Locating,
    Masking,
    Assembling,
    Done,
    Failed,
}

impl RequestStage {
    /// The stage that normally follows this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Loading),
            Self::Loading => Some(Self::Recognizing),
            Self::Recognizing => Some(Self::Locating),
            Self::Locating => Some(Self::Masking),
            Self::Masking => Some(Self::Assembling),
            Self::Assembling => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    /// Whether a request may fail while in this stage.
    pub fn can_fail(self) -> bool {
        matches!(self, Self::Loading | Self::Recognizing | Self::Assembling)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl std::fmt::Display for RequestStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Loading => "loading",
            Self::Recognizing => "recognizing",
            Self::Locating => "locating",
            Self::Masking => "masking",
            Self::Assembling => "assembling",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Classification of errors for retry logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Backend failure or timeout. Safe to retry.
    Transient,
    /// Anything that would fail again on retry.
    Permanent,
}

/// Wire response for the excluded HTTP/CLI wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskResponse {
    /// Base64 (standard alphabet) of the masked artifact.
    pub payload: String,
    pub valid: bool,
    pub comments: Vec<String>,
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_magic_bytes() {
        assert_eq!(DocumentFormat::sniff(b"%PDF-1.7\n"), Some(DocumentFormat::Pdf));
        assert_eq!(DocumentFormat::sniff(b"II*\0rest"), Some(DocumentFormat::MultiFrame));
        assert_eq!(DocumentFormat::sniff(b"MM\0*rest"), Some(DocumentFormat::MultiFrame));
        assert_eq!(DocumentFormat::sniff(b"GIF89a.."), Some(DocumentFormat::MultiFrame));
        assert_eq!(
            DocumentFormat::sniff(b"\x89PNG\r\n\x1a\n\0\0"),
            Some(DocumentFormat::Image)
        );
        assert_eq!(DocumentFormat::sniff(b"hello world"), None);
    }

    #[test]
    fn text_joins_tokens_with_single_space() {
        let result = RecognitionResult::from_tokens(
            vec![
                RecognitionToken::from_rect(" 1234", (0.0, 0.0), (1.0, 1.0), CoordinateUnit::Pixel),
                RecognitionToken::from_rect("5678 ", (0.0, 0.0), (1.0, 1.0), CoordinateUnit::Pixel),
                RecognitionToken::from_rect("  ", (0.0, 0.0), (1.0, 1.0), CoordinateUnit::Pixel),
                RecognitionToken::from_rect("9010", (0.0, 0.0), (1.0, 1.0), CoordinateUnit::Pixel),
            ],
            CoordinateUnit::Pixel,
        );
        assert_eq!(result.text, "1234 5678 9010");
        assert_eq!(result.tokens.len(), 4);
    }

    #[test]
    fn geometry_scale_factor_is_width_ratio() {
        let geometry = PageGeometry::new((3000, 2000), (1500, 1000), 1.0);
        assert_eq!(geometry.scale_factor, 2.0);
    }

    #[test]
    fn stage_machine_walks_to_done() {
        let mut stage = RequestStage::Pending;
        let mut visited = vec![stage];
        while let Some(next) = stage.next() {
            stage = next;
            visited.push(stage);
        }
        assert_eq!(stage, RequestStage::Done);
        assert_eq!(visited.len(), 7);
        assert!(!RequestStage::Locating.can_fail());
        assert!(RequestStage::Recognizing.can_fail());
    }

    #[test]
    fn only_masked_outcome_is_valid() {
        assert!(PageOutcome::Masked.is_valid());
        for outcome in [
            PageOutcome::NoMatch,
            PageOutcome::ChecksumFailed,
            PageOutcome::TokensNotFound,
        ] {
            assert!(!outcome.is_valid());
        }
        assert_ne!(
            PageOutcome::NoMatch.comment(),
            PageOutcome::TokensNotFound.comment()
        );
    }
}
