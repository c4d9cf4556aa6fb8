// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// idmask — Core types, error definitions, checksum validation, and the
// recognition capability contract shared across all crates.

pub mod checksum;
pub mod config;
pub mod error;
pub mod integrity;
pub mod recognition;
pub mod types;

pub use config::MaskConfig;
pub use error::MaskError;
pub use recognition::RecognitionBackend;
pub use types::*;
