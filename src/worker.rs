// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.
use std::hint::black_box;
use std::sync::Arc;

use log::info;

use crate::shutdown::Shutdown;
use crate::signal;
use crate::stats::IterationCounter;
use crate::transform;
use crate::transform::TransformSize;

/// Round-trips a worker completes before publishing them to the shared
/// counter.
pub const FLUSH_BATCH: u64 = 10;

/// Per-thread round-trip count, published to the shared counter in batches.
///
/// The shared counter trails the local count by at most `FLUSH_BATCH - 1`
/// until [`LocalProgress::finish`] flushes the remainder.
#[derive(Debug, Default)]
pub struct LocalProgress {
    completed: u64,
}

impl LocalProgress {
    pub fn complete(&mut self, shared: &IterationCounter) {
        self.completed += 1;
        if self.completed % FLUSH_BATCH == 0 {
            shared.add(FLUSH_BATCH);
        }
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    /// Round-trips not yet visible in the shared counter.
    pub fn pending(&self) -> u64 {
        self.completed % FLUSH_BATCH
    }

    pub fn finish(self, shared: &IterationCounter) -> u64 {
        shared.add(self.pending());
        self.completed
    }
}

/// One unit of load: build a signal, transform it and transform it back.
pub fn round_trip(size: TransformSize) {
    let mut data = signal::generate(size.get());
    transform::fft(&mut data);
    transform::ifft(&mut data);
    black_box(&data);
}

pub struct Worker {
    id: usize,
    size: TransformSize,
    counter: Arc<IterationCounter>,
    shutdown: Shutdown,
}

impl Worker {
    pub fn new(
        id: usize,
        size: TransformSize,
        counter: Arc<IterationCounter>,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            id,
            size,
            counter,
            shutdown,
        }
    }

    /// Runs round-trips until shutdown is requested and returns how many
    /// completed. Shutdown is only checked between round-trips.
    pub fn run(self) -> u64 {
        info!("Worker {} started with FFT size {}", self.id, self.size);

        let mut progress = LocalProgress::default();
        while self.shutdown.is_running() {
            round_trip(self.size);
            progress.complete(&self.counter);
        }

        let total = progress.finish(&self.counter);
        info!("Worker {} stopped after {} iterations", self.id, total);
        total
    }
}
