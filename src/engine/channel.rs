// src/engine/channel.rs

//! Producer side of the task channel, handed to discovery drivers.

use std::path::Path;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::engine::Task;
use crate::errors::{MirrorError, Result};
use crate::exec::ErrorHandler;
use crate::types::ErrorAction;

/// Bounded, cancellation-aware sender of [`Task`]s.
///
/// Dropping the last `TaskSender` closes the channel; workers then drain what
/// is buffered and exit.
#[derive(Debug)]
pub struct TaskSender {
    tx: async_channel::Sender<Task>,
    token: CancellationToken,
}

impl TaskSender {
    pub(crate) fn new(tx: async_channel::Sender<Task>, token: CancellationToken) -> Self {
        Self { tx, token }
    }

    /// Send a task, waiting for capacity if the channel is full.
    ///
    /// Returns `false` when the run was cancelled (before or while waiting) or
    /// every worker is gone; the caller should stop discovering.
    pub async fn enqueue(&self, task: Task) -> bool {
        if self.token.is_cancelled() {
            return false;
        }

        debug!(input = %task.input_path.display(), "enqueue task");
        tokio::select! {
            biased;
            _ = self.token.cancelled() => false,
            res = self.tx.send(task) => res.is_ok(),
        }
    }
}

/// Everything a discovery driver gets from the lifecycle coordinator.
#[derive(Debug)]
pub struct Discovery {
    pub tasks: TaskSender,
    pub token: CancellationToken,
}

impl Discovery {
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Offer a traversal or subscription error to the error callback.
///
/// - no callback: the error is fatal
/// - `Ok(Continue)`: logged, `Ok(())` returned, the caller skips the entry
/// - `Ok(Stop)`: the original error is fatal
/// - `Err(e)`: [`MirrorError::ErrorCallback`] is fatal
pub fn route_error(
    handler: Option<&Arc<dyn ErrorHandler>>,
    path: &Path,
    err: MirrorError,
) -> Result<()> {
    let Some(handler) = handler else {
        return Err(err);
    };

    match handler.on_error(path, &err) {
        Ok(ErrorAction::Continue) => {
            warn!(path = %path.display(), error = %err, "error callback chose to continue");
            Ok(())
        }
        Ok(ErrorAction::Stop) => Err(err),
        Err(source) => Err(MirrorError::ErrorCallback {
            path: path.to_path_buf(),
            source,
        }),
    }
}
