// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the idmask-document crate: painting mask regions
// onto a full-resolution page and preparing the analysis copy.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};

use idmask_core::types::{CoordinateUnit, PageGeometry, RecognitionToken};
use idmask_document::{ImageProcessor, RedactionCompositor};

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Two group-sized tokens on a 3000x2000 page analysed at half width, the
/// shape of a typical phone photo of an ID card.
fn bench_mask_page(c: &mut Criterion) {
    let page = DynamicImage::ImageRgb8(RgbImage::from_pixel(3000, 2000, Rgb([240, 240, 240])));
    let geometry = PageGeometry::new((3000, 2000), (1500, 1000), 1.0);
    let tokens = [
        RecognitionToken::from_rect("2341", (400.0, 600.0), (480.0, 630.0), CoordinateUnit::Pixel),
        RecognitionToken::from_rect("2341", (495.0, 600.0), (575.0, 630.0), CoordinateUnit::Pixel),
    ];
    let refs: Vec<&RecognitionToken> = tokens.iter().collect();
    let compositor = RedactionCompositor::new();

    c.bench_function("mask_page (3000x2000, 2 tokens)", |b| {
        b.iter(|| {
            let (masked, rects) = compositor.apply(black_box(page.clone()), &refs, &geometry);
            black_box((masked, rects));
        });
    });
}

fn bench_analysis_downscale(c: &mut Criterion) {
    let page = DynamicImage::ImageRgb8(RgbImage::from_pixel(3000, 2000, Rgb([240, 240, 240])));

    c.bench_function("downscale_to_width (3000 -> 1500)", |b| {
        b.iter(|| {
            let analysis = ImageProcessor::from_dynamic(black_box(page.clone()))
                .downscale_to_width(1500)
                .into_dynamic();
            black_box(analysis);
        });
    });
}

criterion_group!(benches, bench_mask_page, bench_analysis_downscale);
criterion_main!(benches);
