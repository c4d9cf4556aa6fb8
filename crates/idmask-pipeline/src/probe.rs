// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rotation probe — for backends that only read upright text, retry recognition
// on quarter-turn and blurred variants of a page until something that looks
// like a grouped number shows up.

use std::future::Future;

use image::DynamicImage;
use idmask_core::config::ProbeConfig;
use idmask_core::error::{MaskError, Result};
use idmask_core::types::{Orientation, RecognitionResult};
use idmask_document::ImageProcessor;
use tracing::{debug, info};

use crate::orchestrator::PageRecognition;

const WINDOW: usize = 14;

/// Cheap structural check: a 14-character window with spaces at offsets 4
/// and 9 and digits everywhere else. Selects an orientation only; the
/// locator still validates whatever this accepts.
pub fn has_grouped_digits(text: &str) -> bool {
    let chars: Vec<char> = text.chars().collect();
    chars.windows(WINDOW).any(|w| {
        w.iter().enumerate().all(|(i, c)| match i {
            4 | 9 => *c == ' ',
            _ => c.is_ascii_digit(),
        })
    })
}

/// Variants in probe order: every orientation unblurred, then every
/// orientation blurred. The unblurred upright page is the initial call and
/// is not repeated.
fn variants() -> impl Iterator<Item = (Orientation, bool)> {
    [false, true]
        .into_iter()
        .flat_map(|blur| Orientation::ALL.into_iter().map(move |o| (o, blur)))
        .filter(|&(o, blur)| blur || o != Orientation::Upright)
}

async fn render_variant(
    analysis: &DynamicImage,
    orientation: Orientation,
    blur_sigma: Option<f32>,
) -> Result<DynamicImage> {
    let image = analysis.clone();
    tokio::task::spawn_blocking(move || {
        let processor = ImageProcessor::from_dynamic(image).orient(orientation);
        match blur_sigma {
            Some(sigma) => processor.blur(sigma).into_dynamic(),
            None => processor.into_dynamic(),
        }
    })
    .await
    .map_err(|err| MaskError::Image(format!("probe variant task failed: {}", err)))
}

/// Probe a page whose upright recognition found nothing.
///
/// `initial` is the result of the upright call and counts as the first
/// attempt. Returns the first variant whose text passes
/// [`has_grouped_digits`], or the upright result when none does within
/// `max_attempts` calls.
pub async fn run<F, Fut>(
    analysis: &DynamicImage,
    config: &ProbeConfig,
    initial: RecognitionResult,
    mut recognize: F,
) -> Result<PageRecognition>
where
    F: FnMut(DynamicImage) -> Fut,
    Fut: Future<Output = Result<RecognitionResult>>,
{
    let mut attempts = 1;
    for (orientation, blurred) in variants() {
        if attempts >= config.max_attempts {
            break;
        }
        let sigma = blurred.then_some(config.blur_sigma);
        let variant = render_variant(analysis, orientation, sigma).await?;
        let result = recognize(variant).await?;
        attempts += 1;

        if has_grouped_digits(&result.text) {
            info!(?orientation, blurred, attempts, "Probe found grouped digits");
            return Ok(PageRecognition {
                result,
                orientation,
                attempts,
            });
        }
        debug!(?orientation, blurred, "Probe variant had no grouped digits");
    }

    Ok(PageRecognition {
        result: initial,
        orientation: Orientation::Upright,
        attempts,
    })
}
