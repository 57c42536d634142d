// src/engine/latch.rs

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::errors::MirrorError;

/// Single-slot holder for the first fatal error of a run.
///
/// Backed by a capacity-1 channel written with `try_send`: the first writer
/// wins, later errors are logged and dropped. Latching also cancels the run
/// token so every other worker and the discovery driver stop promptly.
#[derive(Debug, Clone)]
pub struct ErrorLatch {
    tx: mpsc::Sender<MirrorError>,
    run_token: CancellationToken,
}

impl ErrorLatch {
    pub fn channel(run_token: CancellationToken) -> (Self, mpsc::Receiver<MirrorError>) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx, run_token }, rx)
    }

    /// Offer `err` as the run's terminal error. Returns true if it was kept.
    pub fn latch(&self, err: MirrorError) -> bool {
        let kept = match self.tx.try_send(err) {
            Ok(()) => true,
            Err(TrySendError::Full(err)) | Err(TrySendError::Closed(err)) => {
                warn!(error = %err, "discarding error; run already has a terminal error");
                false
            }
        };
        self.run_token.cancel();
        kept
    }
}
