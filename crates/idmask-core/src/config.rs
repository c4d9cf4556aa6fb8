// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request configuration. Passed explicitly at construction; nothing is read
// from the process environment.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MaskError, Result};

/// Which grouped-number matches on a page are considered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Only the first match in the page text.
    #[default]
    First,
    /// Every match in the page text; each validated one is masked.
    All,
}

/// How a single-image document is written back out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageOutput {
    /// Same encoding as the input (JPEG stays JPEG, everything else is PNG).
    #[default]
    Source,
    Jpeg,
    Png,
    /// Wrap the masked image as a single-page PDF.
    Pdf,
}

/// Rotation probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Allow the probe for backends that ask for it.
    pub enabled: bool,
    /// Upper bound on recognition calls the probe may spend on one page.
    pub max_attempts: usize,
    /// Gaussian sigma for the blurred retry pass.
    pub blur_sigma: f32,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 25,
            blur_sigma: 1.5,
        }
    }
}

/// Output encoding settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// JPEG quality (1-100) for JPEG output.
    pub jpeg_quality: u8,
    pub image_output: ImageOutput,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            jpeg_quality: 75,
            image_output: ImageOutput::Source,
        }
    }
}

/// Per-call retry settings for transient backend failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 250,
            max_delay_ms: 2_000,
        }
    }
}

impl RetryConfig {
    /// No retries at all.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

/// Settings for one masking request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskConfig {
    /// Page ceiling; larger documents fail before recognition.
    pub max_pages: usize,
    /// Recognition calls allowed in flight at once.
    pub max_concurrency: usize,
    /// Timeout for a single recognition call.
    pub recognition_timeout_secs: u64,
    /// Timeout for the whole request.
    pub request_timeout_secs: u64,
    /// Analysis copies are downscaled to at most this width.
    pub analysis_max_width: u32,
    /// Images encoded smaller than this are analysed at full resolution.
    pub resize_threshold_bytes: usize,
    /// Pixels per PDF point when rasterising PDF pages.
    pub pdf_render_scale: f32,
    pub match_policy: MatchPolicy,
    pub probe: ProbeConfig,
    pub output: OutputConfig,
    pub retry: RetryConfig,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            max_pages: 3,
            max_concurrency: 4,
            recognition_timeout_secs: 60,
            request_timeout_secs: 300,
            analysis_max_width: 1500,
            resize_threshold_bytes: 500 * 1024,
            pdf_render_scale: 5.0,
            match_policy: MatchPolicy::First,
            probe: ProbeConfig::default(),
            output: OutputConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl MaskConfig {
    /// Load a config from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.max_pages == 0 {
            return Err(MaskError::Config("max_pages must be at least 1".into()));
        }
        if self.max_concurrency == 0 {
            return Err(MaskError::Config("max_concurrency must be at least 1".into()));
        }
        if self.recognition_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(MaskError::Config("timeouts must be non-zero".into()));
        }
        if self.analysis_max_width == 0 {
            return Err(MaskError::Config("analysis_max_width must be non-zero".into()));
        }
        if !(self.pdf_render_scale.is_finite() && self.pdf_render_scale > 0.0) {
            return Err(MaskError::Config(format!(
                "pdf_render_scale must be positive, got {}",
                self.pdf_render_scale
            )));
        }
        if !(1..=100).contains(&self.output.jpeg_quality) {
            return Err(MaskError::Config(format!(
                "jpeg_quality must be within 1..=100, got {}",
                self.output.jpeg_quality
            )));
        }
        Ok(())
    }

    pub fn recognition_timeout(&self) -> Duration {
        Duration::from_secs(self.recognition_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
