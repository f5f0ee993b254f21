// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.
use num_complex::Complex64;

const PHASE_STEP: f64 = 0.1;

/// Synthetic load signal: sample `i` is `(sin(i * 0.1), cos(i * 0.1))`.
pub fn generate(len: usize) -> Vec<Complex64> {
    (0..len)
        .map(|i| {
            let phase = i as f64 * PHASE_STEP;
            Complex64::new(phase.sin(), phase.cos())
        })
        .collect()
}
