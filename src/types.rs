// src/types.rs

use serde::Deserialize;

/// What the transform callback wants the run to do after handling a file.
///
/// `Stop` terminates the whole run (not just the current subtree) with
/// [`MirrorError::StoppedByCallback`](crate::errors::MirrorError::StoppedByCallback).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

/// Decision returned by an error callback for a traversal or subscription error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorAction {
    /// Skip the failing entry and keep going.
    #[serde(alias = "skip")]
    Continue,
    /// Abort the run with the original error.
    #[default]
    Stop,
}

/// Which built-in transform the binary runs for each matched file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformKind {
    /// Copy the input file to the output path.
    #[default]
    Copy,
    /// Run a shell command with `{input}` / `{output}` substituted.
    Command,
}
