// src/engine/pool.rs

//! Worker pool draining the task channel.

use std::fmt;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::engine::{ErrorLatch, Task};
use crate::errors::{MirrorError, Result};
use crate::exec::Transform;
use crate::fs::FileSystem;
use crate::types::Flow;

/// Shared, read-only state every worker needs.
#[derive(Clone)]
pub struct WorkerContext {
    pub transform: Arc<dyn Transform>,
    pub fs: Arc<dyn FileSystem>,
}

impl fmt::Debug for WorkerContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerContext")
            .field("fs", &self.fs)
            .finish_non_exhaustive()
    }
}

/// Spawn `count` workers into `set`. Each one owns a clone of the receiver.
pub(crate) fn spawn_workers(
    set: &mut JoinSet<()>,
    count: usize,
    ctx: Arc<WorkerContext>,
    rx: async_channel::Receiver<Task>,
    token: CancellationToken,
    latch: ErrorLatch,
) {
    for id in 0..count {
        set.spawn(worker_loop(
            id,
            Arc::clone(&ctx),
            rx.clone(),
            token.clone(),
            latch.clone(),
        ));
    }
}

/// Receive tasks until the channel closes or the run is cancelled.
///
/// Cancellation is checked before every receive, so buffered tasks are not
/// started once the run is stopping. A task that already started always runs
/// to completion; the coordinator waits for it.
async fn worker_loop(
    id: usize,
    ctx: Arc<WorkerContext>,
    rx: async_channel::Receiver<Task>,
    token: CancellationToken,
    latch: ErrorLatch,
) {
    debug!(worker = id, "worker started");

    loop {
        let task = tokio::select! {
            biased;
            _ = token.cancelled() => break,
            next = rx.recv() => match next {
                Ok(task) => task,
                // Closed and drained.
                Err(_) => break,
            },
        };

        let ctx = Arc::clone(&ctx);
        let outcome = tokio::task::spawn_blocking(move || process_task(&ctx, &task)).await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                info!(worker = id, error = %err, "worker stopping");
                latch.latch(err);
                break;
            }
            Err(join_err) => {
                latch.latch(MirrorError::Join(join_err));
                break;
            }
        }
    }

    debug!(worker = id, "worker exited");
}

/// Materialise the output directory, then hand the file to the transform.
fn process_task(ctx: &WorkerContext, task: &Task) -> Result<()> {
    if let Some(dir) = task.output_dir() {
        ctx.fs
            .create_dir_all(dir)
            .map_err(|e| MirrorError::fs("creating output directory", dir, e))?;
    }

    debug!(
        input = %task.input_path.display(),
        output = %task.output_path.display(),
        "running transform"
    );

    match ctx.transform.transform(&task.input_path, &task.output_path) {
        Ok(Flow::Continue) => Ok(()),
        Ok(Flow::Stop) => Err(MirrorError::StoppedByCallback {
            path: task.input_path.clone(),
        }),
        Err(source) => Err(MirrorError::Transform {
            path: task.input_path.clone(),
            source,
        }),
    }
}
