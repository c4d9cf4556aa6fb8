// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for Verhoeff validation in idmask-core.

use criterion::{Criterion, black_box, criterion_group, criterion_main};

use idmask_core::checksum::{check_digit, is_valid};

/// Validate a fixed authentic number.
fn bench_validate(c: &mut Criterion) {
    c.bench_function("verhoeff validate (12 digits)", |b| {
        b.iter(|| is_valid(black_box("499118665246")));
    });
}

/// Derive a check digit for an 11-digit prefix.
fn bench_check_digit(c: &mut Criterion) {
    c.bench_function("verhoeff check digit (11 digits)", |b| {
        b.iter(|| check_digit(black_box("49911866524")));
    });
}

criterion_group!(benches, bench_validate, bench_check_digit);
criterion_main!(benches);
