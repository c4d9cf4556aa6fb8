// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Local OCR recognition backend.
//
// Wraps the `ocrs` crate, a pure-Rust OCR engine backed by neural network
// models executed via `rten`, and reports word-level tokens with their
// rotated bounding boxes in analysis-image pixels.
//
// # Feature Gate
//
// This module is only available when the `ocr` feature is enabled:
//
// ```toml
// idmask-document = { path = "crates/idmask-document", features = ["ocr"] }
// ```
//
// # Model Setup
//
// The engine requires two model files in one directory:
//
// - **Detection model** (`text-detection.rten`): locates text regions.
// - **Recognition model** (`text-recognition.rten`): decodes characters.
//
// Running the `ocrs-cli` tool once downloads both to `~/.cache/ocrs/`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use image::DynamicImage;
use idmask_core::error::{MaskError, Result};
use idmask_core::recognition::RecognitionBackend;
use idmask_core::types::{CoordinateUnit, Point, RecognitionResult, RecognitionToken};
use ocrs::{ImageSource, OcrEngine as OcrsEngine, OcrEngineParams, TextItem};
use rten::Model;
use rten_imageproc::RotatedRect;
use tracing::{debug, info, instrument};

/// Well-known filenames for the detection and recognition models.
const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// Model locations for an [`OcrsRecognizer`].
#[derive(Debug, Clone)]
pub struct OcrConfig {
    /// Path to the text-detection model file (`.rten`).
    pub detection_model_path: PathBuf,
    /// Path to the text-recognition model file (`.rten`).
    pub recognition_model_path: PathBuf,
}

impl OcrConfig {
    /// Expects the directory to contain `text-detection.rten` and
    /// `text-recognition.rten`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    pub fn from_paths(
        detection_model: impl Into<PathBuf>,
        recognition_model: impl Into<PathBuf>,
    ) -> Self {
        Self {
            detection_model_path: detection_model.into(),
            recognition_model_path: recognition_model.into(),
        }
    }

    /// Verify that both model files exist.
    pub fn validate(&self) -> Result<()> {
        for path in [&self.detection_model_path, &self.recognition_model_path] {
            if !path.exists() {
                return Err(MaskError::Config(format!(
                    "OCR model not found at {}; run `ocrs-cli` once to download models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// Recognition backend running `ocrs` on the local CPU.
///
/// Model loading is the expensive step; construct once and share behind an
/// `Arc<dyn RecognitionBackend>`.
pub struct OcrsRecognizer {
    engine: Arc<OcrsEngine>,
}

impl OcrsRecognizer {
    /// Load both models.
    ///
    /// **Important:** `ocrs` and `rten` must be compiled in release mode;
    /// debug builds are 10-100x slower.
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: OcrConfig) -> Result<Self> {
        config.validate()?;

        info!("Loading OCR detection model");
        let detection_model = Model::load_file(&config.detection_model_path).map_err(|err| {
            MaskError::Config(format!(
                "failed to load detection model from {}: {}",
                config.detection_model_path.display(),
                err
            ))
        })?;

        info!("Loading OCR recognition model");
        let recognition_model = Model::load_file(&config.recognition_model_path).map_err(|err| {
            MaskError::Config(format!(
                "failed to load recognition model from {}: {}",
                config.recognition_model_path.display(),
                err
            ))
        })?;

        let engine = OcrsEngine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| MaskError::Config(format!("failed to initialise OCR engine: {}", err)))?;

        info!("OCR engine initialised successfully");
        Ok(Self {
            engine: Arc::new(engine),
        })
    }

    pub fn from_model_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Self::new(OcrConfig::from_dir(dir))
    }
}

/// Detect words, group them into lines, and recognise each line. Tokens are
/// emitted per word in reading order.
fn recognize_words(engine: &OcrsEngine, image: &DynamicImage) -> Result<Vec<RecognitionToken>> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();

    let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
        MaskError::Backend(format!(
            "failed to create image source ({}x{}): {}",
            width, height, err
        ))
    })?;

    let input = engine
        .prepare_input(source)
        .map_err(|err| MaskError::Backend(format!("OCR preprocessing failed: {}", err)))?;

    let word_rects = engine
        .detect_words(&input)
        .map_err(|err| MaskError::Backend(format!("word detection failed: {}", err)))?;
    let line_rects = engine.find_text_lines(&input, &word_rects);
    let lines = engine
        .recognize_text(&input, &line_rects)
        .map_err(|err| MaskError::Backend(format!("line recognition failed: {}", err)))?;

    let mut tokens = Vec::new();
    for line in lines.iter().flatten() {
        for word in line.words() {
            let content = word.to_string();
            if content.trim().is_empty() {
                continue;
            }
            let polygon = polygon(&word.rotated_rect());
            tokens.push(RecognitionToken::new(content, polygon, CoordinateUnit::Pixel));
        }
    }

    debug!(
        detected_words = word_rects.len(),
        lines = line_rects.len(),
        tokens = tokens.len(),
        "OCR recognition complete"
    );
    Ok(tokens)
}

fn polygon(rect: &RotatedRect) -> Vec<Point> {
    rect.corners()
        .iter()
        .map(|corner| Point::new(corner.x, corner.y))
        .collect()
}

#[async_trait]
impl RecognitionBackend for OcrsRecognizer {
    fn name(&self) -> &str {
        "ocrs"
    }

    /// A local engine reads upright text best and returns nothing useful for
    /// rotated scans.
    fn needs_orientation_probe(&self) -> bool {
        true
    }

    #[instrument(skip_all, fields(width = page.width(), height = page.height()))]
    async fn analyze(&self, page: &DynamicImage) -> Result<RecognitionResult> {
        let engine = Arc::clone(&self.engine);
        let image = page.clone();
        let tokens = tokio::task::spawn_blocking(move || recognize_words(&engine, &image))
            .await
            .map_err(|err| MaskError::Backend(format!("OCR task failed: {}", err)))??;
        Ok(RecognitionResult::from_tokens(tokens, CoordinateUnit::Pixel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_dir() {
        let config = OcrConfig::from_dir("/tmp/my-models");
        assert_eq!(
            config.detection_model_path,
            PathBuf::from("/tmp/my-models/text-detection.rten")
        );
        assert_eq!(
            config.recognition_model_path,
            PathBuf::from("/tmp/my-models/text-recognition.rten")
        );
    }

    #[test]
    fn config_from_paths() {
        let config = OcrConfig::from_paths("/a/detect.rten", "/b/recog.rten");
        assert_eq!(config.detection_model_path, PathBuf::from("/a/detect.rten"));
        assert_eq!(config.recognition_model_path, PathBuf::from("/b/recog.rten"));
    }

    #[test]
    fn missing_models_fail_validation() {
        let result = OcrsRecognizer::from_model_dir("/nonexistent/path/ocr-models");
        assert!(matches!(result, Err(MaskError::Config(_))));
    }
}
