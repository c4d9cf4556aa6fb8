// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for idmask.

use thiserror::Error;

use crate::types::ErrorClass;

/// Top-level error type for all idmask operations.
///
/// "No identity number" and "checksum failed" are page outcomes, not errors;
/// see [`crate::types::PageOutcome`].
#[derive(Debug, Error)]
pub enum MaskError {
    // -- Input errors (fail before any recognition call) --
    #[error("unsupported or corrupt document: {0}")]
    Format(String),

    #[error("document has {pages} pages, limit is {max}")]
    PageLimitExceeded { pages: usize, max: usize },

    #[error("PDF operation failed: {0}")]
    Pdf(String),

    #[error("image processing failed: {0}")]
    Image(String),

    // -- Recognition backend --
    #[error("recognition backend failed: {0}")]
    Backend(String),

    #[error("recognition of page {page} timed out after {seconds}s")]
    BackendTimeout { page: usize, seconds: u64 },

    // -- Output --
    #[error("output assembly failed: {0}")]
    Assembly(String),

    #[error("request cancelled: {0}")]
    Cancelled(String),

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MaskError {
    /// Whether this error came from the recognition backend (including
    /// timeouts). These abort the request and are the only retryable kind.
    pub fn is_backend(&self) -> bool {
        matches!(self, Self::Backend(_) | Self::BackendTimeout { .. })
    }

    /// Retry classification for callers and the per-call retry loop.
    pub fn class(&self) -> ErrorClass {
        if self.is_backend() {
            ErrorClass::Transient
        } else {
            ErrorClass::Permanent
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MaskError>;
