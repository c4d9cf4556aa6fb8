// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — analysis downscaling, orientation, blur pre-filter, encoding,
// and multi-frame decoding.

pub mod frames;
pub mod processor;

pub use processor::ImageProcessor;
