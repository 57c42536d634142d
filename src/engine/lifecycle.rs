// src/engine/lifecycle.rs

//! Lifecycle coordinator: starts the worker pool and one discovery driver,
//! waits for the first terminal condition, then drains everything.

use std::future::Future;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::engine::pool::spawn_workers;
use crate::engine::{Cancellation, Discovery, ErrorLatch, TaskSender, WorkerContext};
use crate::errors::{MirrorError, Result};

/// Sizing and shared state for one run.
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub workers: usize,
    pub queue_capacity: usize,
    pub ctx: Arc<WorkerContext>,
}

/// Run one crawl or watch to completion.
///
/// - Spawns `spec.workers` workers on a fresh bounded channel.
/// - Spawns the future built by `discover` as the single producer.
/// - Returns when discovery and every worker have finished, when the first
///   fatal error is latched, or when `cancel` fires (explicitly or by
///   deadline). In the last two cases the run token is cancelled and every
///   task is joined before returning, so no transform is still executing.
///
/// A fatal error latched before cancellation wins over the cancellation
/// classification.
pub async fn run_pipeline<F, Fut>(
    spec: RunSpec,
    cancel: &Cancellation,
    mode: &'static str,
    discover: F,
) -> Result<()>
where
    F: FnOnce(Discovery) -> Fut,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    let run_token = cancel.token().child_token();
    let (latch, mut err_rx) = ErrorLatch::channel(run_token.clone());
    let (tx, rx) = async_channel::bounded(spec.queue_capacity.max(1));

    info!(mode, workers = spec.workers, "run started");

    let mut tasks = JoinSet::new();
    spawn_workers(
        &mut tasks,
        spec.workers,
        Arc::clone(&spec.ctx),
        rx,
        run_token.clone(),
        latch.clone(),
    );

    let discovery = Discovery {
        tasks: TaskSender::new(tx, run_token.clone()),
        token: run_token.clone(),
    };
    let driver = discover(discovery);
    {
        let latch = latch.clone();
        tasks.spawn(async move {
            if let Err(err) = driver.await {
                latch.latch(err);
            }
        });
    }

    let outcome = tokio::select! {
        biased;
        Some(err) = err_rx.recv() => Err(err),
        reason = cancel.cancelled() => Err(reason),
        () = join_all(&mut tasks, &latch) => Ok(()),
    };

    run_token.cancel();
    join_all(&mut tasks, &latch).await;

    let result = match outcome {
        // Something may have latched between the last poll of `err_rx` and
        // the final join.
        Ok(()) => match err_rx.try_recv() {
            Ok(err) => Err(err),
            Err(_) => Ok(()),
        },
        Err(err) => Err(err),
    };

    match &result {
        Ok(()) => info!(mode, "run finished"),
        Err(err) if err.is_cancellation() => info!(mode, reason = %err, "run cancelled"),
        Err(err) => info!(mode, error = %err, "run failed"),
    }
    result
}

/// Join every task in the set. Panics are latched as run errors.
async fn join_all(tasks: &mut JoinSet<()>, latch: &ErrorLatch) {
    while let Some(res) = tasks.join_next().await {
        if let Err(join_err) = res {
            debug!(error = %join_err, "task ended abnormally");
            latch.latch(MirrorError::Join(join_err));
        }
    }
}
