// src/engine/cancel.rs

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::MirrorError;

/// Caller-side cancellation for a crawl or watch call.
///
/// Wraps a [`CancellationToken`] plus an optional deadline, so the run can
/// report whether it was cancelled explicitly or timed out. Clones share the
/// same token.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: Some(deadline),
        }
    }

    /// Wrap an existing token, e.g. one shared with a Ctrl-C handler.
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Add (or replace) a deadline, keeping the token.
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Resolve once the token fires or the deadline passes, returning the
    /// matching error classification.
    pub async fn cancelled(&self) -> MirrorError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => MirrorError::Cancelled,
                _ = tokio::time::sleep_until(deadline) => MirrorError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                MirrorError::Cancelled
            }
        }
    }
}
