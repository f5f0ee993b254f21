// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.
pub mod harness;
pub mod shutdown;
pub mod signal;
pub mod stats;
pub mod transform;
pub mod worker;

pub use harness::Config;
pub use shutdown::Shutdown;
pub use stats::IterationCounter;
pub use stats::Summary;
pub use transform::TransformSize;

pub const NAME: &str = "fft_stress";
