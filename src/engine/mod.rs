// src/engine/mod.rs

//! Concurrent execution engine shared by crawl and watch.
//!
//! This module ties together:
//! - the bounded task channel between discovery and the workers
//! - the worker pool that runs the transform callback
//! - the cancellation signal and the first-error latch
//! - the lifecycle coordinator that starts both sides and drains them
//!
//! Discovery drivers (see [`crate::crawl`] and [`crate::watch`]) only ever see
//! a [`Discovery`] handle; they never touch workers directly.

use std::path::{Path, PathBuf};

pub mod cancel;
pub mod channel;
pub mod latch;
pub mod lifecycle;
pub mod pool;

pub use cancel::Cancellation;
pub use channel::{route_error, Discovery, TaskSender};
pub use latch::ErrorLatch;
pub use lifecycle::{run_pipeline, RunSpec};
pub use pool::WorkerContext;

/// Default capacity of the task channel.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// One discovered file awaiting transformation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Task {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

impl Task {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
        }
    }

    /// Directory that must exist before the transform runs.
    pub fn output_dir(&self) -> Option<&Path> {
        self.output_path.parent()
    }
}

/// Number of workers for a run.
///
/// `max_concurrency == 0` means "logical core count". A positive
/// `concurrency` is capped at the maximum; zero selects the maximum.
pub fn effective_concurrency(concurrency: usize, max_concurrency: usize) -> usize {
    let max = if max_concurrency == 0 {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
    } else {
        max_concurrency
    };

    if concurrency == 0 {
        max
    } else {
        concurrency.min(max)
    }
}
