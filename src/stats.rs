// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.
use std::io::Write;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use std::time::Instant;

use anyhow::Result;
use log::info;

use crate::shutdown::Shutdown;
use crate::transform::TransformSize;

/// Upper bound on a single reporter sleep. Shutdown is noticed within one
/// slice even in the middle of a long reporting interval.
const POLL_SLICE: Duration = Duration::from_millis(100);

/// Process-wide count of completed round-trips.
///
/// Only ever grows. Workers add to it in batches, the reporter and the final
/// summary read it.
#[derive(Debug, Default)]
pub struct IterationCounter {
    total: AtomicU64,
}

impl IterationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, n: u64) {
        self.total.fetch_add(n, Ordering::Relaxed);
    }

    pub fn load(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

fn per_second(iterations: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 {
        iterations as f64 / secs
    } else {
        0.0
    }
}

#[derive(Clone, Debug, Default)]
pub struct ThroughputStats {
    pub elapsed: Duration,
    pub iterations: u64,
}

impl ThroughputStats {
    pub fn sample(counter: &IterationCounter, started_at: Instant) -> Self {
        Self {
            elapsed: started_at.elapsed(),
            iterations: counter.load(),
        }
    }

    pub fn rate(&self) -> f64 {
        per_second(self.iterations, self.elapsed)
    }

    pub fn format<W: Write>(&self, w: &mut W) -> Result<()> {
        writeln!(
            w,
            "[{}] elapsed: {:>8.2}s | iterations: {:>12} | rate: {:>12.2} it/s",
            crate::NAME,
            self.elapsed.as_secs_f64(),
            self.iterations,
            self.rate()
        )?;
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct WorkerReport {
    pub id: usize,
    pub size: TransformSize,
    pub iterations: u64,
}

/// Totals printed once after every thread has been joined.
#[derive(Clone, Debug)]
pub struct Summary {
    pub elapsed: Duration,
    pub iterations: u64,
    pub workers: Vec<WorkerReport>,
}

impl Summary {
    pub fn rate(&self) -> f64 {
        per_second(self.iterations, self.elapsed)
    }

    pub fn format<W: Write>(&self, w: &mut W) -> Result<()> {
        writeln!(w)?;
        writeln!(w, "Final statistics:")?;
        writeln!(w, "  total time:       {:.2} s", self.elapsed.as_secs_f64())?;
        writeln!(w, "  total iterations: {}", self.iterations)?;
        writeln!(w, "  average rate:     {:.2} it/s", self.rate())?;
        for worker in self.workers.iter() {
            writeln!(
                w,
                "  WORKER[{:02}] size={:<5} iterations={}",
                worker.id, worker.size, worker.iterations
            )?;
        }
        Ok(())
    }
}

/// Periodic throughput printer, run on its own thread.
pub struct Reporter {
    counter: Arc<IterationCounter>,
    shutdown: Shutdown,
    started_at: Instant,
    interval: Duration,
    deadline: Option<Duration>,
}

impl Reporter {
    pub fn new(
        counter: Arc<IterationCounter>,
        shutdown: Shutdown,
        started_at: Instant,
        interval: Duration,
    ) -> Self {
        Self {
            counter,
            shutdown,
            started_at,
            interval,
            deadline: None,
        }
    }

    /// Requests shutdown once `duration` has passed since `started_at`.
    pub fn with_deadline(mut self, duration: Option<Duration>) -> Self {
        self.deadline = duration;
        self
    }

    /// Prints a sample every `interval` until shutdown is requested or the
    /// deadline passes. Instants past the platform's representable range
    /// are treated as never reached.
    pub fn run<W: Write>(&self, out: &mut W) -> Result<()> {
        let stop_at = self.deadline.and_then(|d| self.started_at.checked_add(d));
        let mut next_report_at = self.started_at.checked_add(self.interval);

        while self.shutdown.is_running() {
            let now = Instant::now();

            if let Some(stop_at) = stop_at {
                if now >= stop_at {
                    if self.shutdown.request() {
                        info!(
                            "Run duration of {:.1}s reached, stopping workers...",
                            (stop_at - self.started_at).as_secs_f64()
                        );
                    }
                    break;
                }
            }

            if let Some(report_at) = next_report_at {
                if now >= report_at {
                    ThroughputStats::sample(&self.counter, self.started_at).format(out)?;
                    next_report_at = match report_at.checked_add(self.interval) {
                        Some(next) if next < now => now.checked_add(self.interval),
                        next => next,
                    };
                }
            }

            let wake_at = match (next_report_at, stop_at) {
                (Some(report_at), Some(stop_at)) => Some(report_at.min(stop_at)),
                (report_at, stop_at) => report_at.or(stop_at),
            };
            let nap = match wake_at {
                Some(wake_at) => wake_at.saturating_duration_since(Instant::now()),
                None => POLL_SLICE,
            };
            std::thread::sleep(nap.min(POLL_SLICE));
        }

        Ok(())
    }
}
