// src/exec/backend.rs

//! Pluggable callback seams.
//!
//! The worker pool talks to a [`Transform`] and discovery talks to an optional
//! [`ErrorHandler`] instead of hard-coding what happens to a file. Both are
//! implemented for plain closures, so library users rarely need a named type;
//! the binary provides its own implementations in [`super::command`] and
//! [`super::copy`].

use std::path::Path;

use crate::errors::MirrorError;
use crate::types::{ErrorAction, Flow};

/// Converts one input file into its mirrored output.
///
/// Called from a blocking worker thread, once per matched file, with the
/// guarantee that `output.parent()` already exists. Returning an error or
/// [`Flow::Stop`] ends the whole run.
pub trait Transform: Send + Sync + 'static {
    fn transform(&self, input: &Path, output: &Path) -> anyhow::Result<Flow>;
}

impl<F> Transform for F
where
    F: Fn(&Path, &Path) -> anyhow::Result<Flow> + Send + Sync + 'static,
{
    fn transform(&self, input: &Path, output: &Path) -> anyhow::Result<Flow> {
        self(input, output)
    }
}

/// Decides whether a traversal or subscription error is recoverable.
///
/// Never consulted for transform failures.
pub trait ErrorHandler: Send + Sync + 'static {
    fn on_error(&self, path: &Path, err: &MirrorError) -> anyhow::Result<ErrorAction>;
}

impl<F> ErrorHandler for F
where
    F: Fn(&Path, &MirrorError) -> anyhow::Result<ErrorAction> + Send + Sync + 'static,
{
    fn on_error(&self, path: &Path, err: &MirrorError) -> anyhow::Result<ErrorAction> {
        self(path, err)
    }
}

/// Fixed error policy, used by the binary's `[errors]` section.
#[derive(Debug, Clone, Copy)]
pub struct FixedErrorPolicy(pub ErrorAction);

impl ErrorHandler for FixedErrorPolicy {
    fn on_error(&self, path: &Path, err: &MirrorError) -> anyhow::Result<ErrorAction> {
        if self.0 == ErrorAction::Continue {
            tracing::warn!(path = %path.display(), error = %err, "skipping unreadable entry");
        }
        Ok(self.0)
    }
}
