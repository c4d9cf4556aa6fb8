// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// idmask-pipeline — From input bytes to a masked document.
//
// Fans pages out to the recognition backend under a concurrency cap, locates
// and validates grouped identity numbers in what comes back, and drives the
// document crate to paint and reassemble the result.

pub mod locator;
pub mod masker;
pub mod orchestrator;
pub mod probe;
pub mod retry;

pub use locator::{CandidateMatch, PageEvaluation, evaluate_page, find_candidates, resolve_tokens};
pub use masker::{MaskedDocument, Masker};
pub use orchestrator::{Orchestrator, PageRecognition};
