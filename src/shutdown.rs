// Copyright (c) Meta Platforms, Inc. and affiliates.

// This software may be used and distributed according to the terms of the
// GNU General Public License version 2.
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::Context;
use anyhow::Result;
use log::info;

/// Cooperative cancellation token shared by the workers and the reporter.
///
/// Starts out running and flips to stopped exactly once. Nobody is woken up
/// on the transition; every loop polls [`Shutdown::is_running`] at its own
/// iteration boundary.
#[derive(Clone, Debug)]
pub struct Shutdown {
    running: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Moves to the stopped state. Returns true only for the call which
    /// performed the transition.
    pub fn request(&self) -> bool {
        self.running.swap(false, Ordering::Relaxed)
    }

    /// Routes SIGINT and SIGTERM into [`Shutdown::request`].
    pub fn install_handler(&self) -> Result<()> {
        let shutdown = self.clone();
        ctrlc::set_handler(move || {
            if shutdown.request() {
                info!("Termination requested, stopping workers...");
            }
        })
        .context("Error setting Ctrl-C handler")
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
