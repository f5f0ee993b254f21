// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.

//! Orchestration of one stress run.
//!
//! [`run`] self-tests the transform, starts the reporter and one worker per
//! requested core, then blocks until every thread has drained after shutdown
//! was requested. Sizes from [`Config::sizes`] are handed out to workers
//! round-robin, so a mix of short and long round-trips runs side by side.

use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use std::time::Instant;

use anyhow::anyhow;
use anyhow::bail;
use anyhow::Context;
use anyhow::Result;
use log::info;
use log::warn;

use crate::shutdown::Shutdown;
use crate::stats::IterationCounter;
use crate::stats::Reporter;
use crate::stats::Summary;
use crate::stats::WorkerReport;
use crate::transform;
use crate::transform::TransformSize;
use crate::worker::Worker;

#[derive(Clone, Debug)]
pub struct Config {
    /// Number of worker threads, already clamped to the available CPUs.
    pub workers: usize,
    pub sizes: Vec<TransformSize>,
    pub interval: Duration,
    /// Stop on our own after this long. `None` runs until a signal arrives.
    pub duration: Option<Duration>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: available_cores(),
            sizes: transform::default_sizes(),
            interval: Duration::from_secs(2),
            duration: None,
        }
    }
}

pub fn available_cores() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

pub fn clamp_workers(requested: usize, available: usize) -> usize {
    requested.min(available)
}

fn size_for_worker(sizes: &[TransformSize], id: usize) -> TransformSize {
    sizes[id % sizes.len()]
}

type WorkerHandle = (usize, TransformSize, JoinHandle<u64>);

/// Joins every worker and then the reporter. A panicked worker requests
/// shutdown so the remaining threads still drain before the error is
/// returned.
fn join_all(
    shutdown: &Shutdown,
    handles: Vec<WorkerHandle>,
    reporter: JoinHandle<Result<()>>,
) -> Result<Vec<WorkerReport>> {
    let mut workers = Vec::with_capacity(handles.len());
    let mut failed = None;
    for (id, size, handle) in handles {
        match handle.join() {
            Ok(iterations) => workers.push(WorkerReport {
                id,
                size,
                iterations,
            }),
            Err(_) => {
                shutdown.request();
                if failed.is_none() {
                    failed = Some(anyhow!("Worker {} panicked", id));
                }
            }
        }
    }

    let reported = reporter
        .join()
        .map_err(|_| anyhow!("Reporter thread panicked"));
    if let Some(e) = failed {
        return Err(e);
    }
    reported??;
    Ok(workers)
}

pub fn run(config: &Config, shutdown: &Shutdown) -> Result<Summary> {
    run_with(config, shutdown, transform::verify)
}

/// [`run`] with the startup self-test supplied by the caller. Nothing is
/// spawned unless `verify` passes.
pub fn run_with<F>(config: &Config, shutdown: &Shutdown, verify: F) -> Result<Summary>
where
    F: FnOnce() -> bool,
{
    if config.workers == 0 {
        bail!("At least one worker is required");
    }
    if config.sizes.is_empty() {
        bail!("No transform sizes configured");
    }

    if !verify() {
        bail!(
            "FFT self-verification failed (round-trip error not below {:e})",
            transform::VERIFY_TOLERANCE
        );
    }

    info!("CPU stress test started with {} threads", config.workers);
    info!("Press Ctrl+C to stop");

    let counter = Arc::new(IterationCounter::new());
    let started_at = Instant::now();

    let reporter = Reporter::new(
        counter.clone(),
        shutdown.clone(),
        started_at,
        config.interval,
    )
    .with_deadline(config.duration);
    let reporter_handle = thread::Builder::new()
        .name("fft-reporter".into())
        .spawn(move || reporter.run(&mut std::io::stdout()))
        .context("Failed to spawn reporter thread")?;

    let mut handles = Vec::with_capacity(config.workers);
    for id in 0..config.workers {
        let size = size_for_worker(&config.sizes, id);
        let worker = Worker::new(id, size, counter.clone(), shutdown.clone());
        let handle = thread::Builder::new()
            .name(format!("fft-worker-{}", id))
            .spawn(move || worker.run());
        match handle {
            Ok(handle) => handles.push((id, size, handle)),
            Err(e) => {
                shutdown.request();
                if let Err(join_err) = join_all(shutdown, handles, reporter_handle) {
                    warn!("{:#}", join_err);
                }
                return Err(e).with_context(|| format!("Failed to spawn worker {}", id));
            }
        }
    }

    let workers = join_all(shutdown, handles, reporter_handle)?;

    Ok(Summary {
        elapsed: started_at.elapsed(),
        iterations: counter.load(),
        workers,
    })
}
