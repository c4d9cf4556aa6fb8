// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition capability contract.
//
// Every concrete recognition engine (local optical engine, cloud document
// service, vision-language model) plugs into the pipeline through this one
// trait. Backends are shared across concurrent page tasks as
// `Arc<dyn RecognitionBackend>`.

use async_trait::async_trait;
use image::DynamicImage;

use crate::error::Result;
use crate::types::RecognitionResult;

/// A text recognition engine that returns word-level geometry.
#[async_trait]
pub trait RecognitionBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Whether this backend misreads rotated pages and should be wrapped in
    /// the rotation probe when a page yields no match.
    fn needs_orientation_probe(&self) -> bool {
        false
    }

    /// Recognise one page image.
    ///
    /// # Errors
    ///
    /// Returns [`crate::MaskError::Backend`] on any transport or processing
    /// failure.
    async fn analyze(&self, page: &DynamicImage) -> Result<RecognitionResult>;
}
