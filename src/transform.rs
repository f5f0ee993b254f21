// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Recursive radix-2 Cooley-Tukey transform pair.
//!
//! The forward transform splits the input into its even and odd indexed
//! halves, transforms both recursively and recombines them with the usual
//! butterfly. Every level allocates two fresh half-length buffers; there is
//! no bit-reversal permutation. The transform is used as a CPU load
//! generator, so it favours a fixed, predictable amount of floating-point
//! work and allocation over raw speed.
//!
//! Inputs are expected to have a power-of-two length. Other lengths are not
//! rejected here: halves are taken with integer division and the trailing
//! sample of an odd-length slice is left untouched. Callers that take sizes
//! from the outside world go through [`TransformSize`], which only admits
//! powers of two.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use anyhow::Result;
use log::debug;
use num_complex::Complex64;

/// Transform sizes handed out to workers when none are given explicitly.
pub const DEFAULT_SIZES: [usize; 8] = [8, 16, 32, 64, 128, 256, 512, 1024];

/// Round-trip error the self-test tolerates.
pub const VERIFY_TOLERANCE: f64 = 1e-10;

/// A transform length which is known to be a non-zero power of two.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TransformSize(usize);

impl TransformSize {
    pub fn new(len: usize) -> Result<Self> {
        if !len.is_power_of_two() {
            bail!("transform size {} is not a power of two", len);
        }
        Ok(Self(len))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl fmt::Display for TransformSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for TransformSize {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let len = match s.trim().parse::<usize>() {
            Ok(v) => v,
            Err(e) => bail!("invalid transform size {:?} ({})", s, e),
        };
        Self::new(len)
    }
}

pub fn default_sizes() -> Vec<TransformSize> {
    DEFAULT_SIZES.iter().map(|&len| TransformSize(len)).collect()
}

/// Forward DFT of `x`, computed in place.
pub fn fft(x: &mut [Complex64]) {
    let n = x.len();
    if n <= 1 {
        return;
    }

    let half = n / 2;
    let mut even: Vec<Complex64> = (0..half).map(|i| x[2 * i]).collect();
    let mut odd: Vec<Complex64> = (0..half).map(|i| x[2 * i + 1]).collect();

    fft(&mut even);
    fft(&mut odd);

    for k in 0..half {
        let twiddle = Complex64::from_polar(1.0, -2.0 * PI * k as f64 / n as f64);
        let t = twiddle * odd[k];
        x[k] = even[k] + t;
        x[k + half] = even[k] - t;
    }
}

/// Inverse DFT of `x`, computed in place by conjugating around [`fft`].
pub fn ifft(x: &mut [Complex64]) {
    for v in x.iter_mut() {
        *v = v.conj();
    }

    fft(x);

    let scale = x.len() as f64;
    for v in x.iter_mut() {
        *v = v.conj() / scale;
    }
}

fn verify_fixture() -> [Complex64; 8] {
    let one = Complex64::new(1.0, 0.0);
    let zero = Complex64::new(0.0, 0.0);
    [one, one, one, one, zero, zero, zero, zero]
}

/// Largest sample-wise deviation after pushing the self-test fixture through
/// a forward and inverse transform.
pub fn verify_max_error() -> f64 {
    let original = verify_fixture();
    let mut data = original;

    fft(&mut data);
    ifft(&mut data);

    data.iter()
        .zip(original.iter())
        .map(|(got, want)| (got - want).norm())
        .fold(0.0, f64::max)
}

/// Self-test run once before any load is generated.
pub fn verify() -> bool {
    let max_error = verify_max_error();
    debug!("FFT self-test max round-trip error: {:e}", max_error);
    max_error < VERIFY_TOLERANCE
}
