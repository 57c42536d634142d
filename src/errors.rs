// src/errors.rs

//! Crate-wide error type.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MirrorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("invalid glob pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },

    #[error("failed {op} {path:?}: {source}")]
    Filesystem {
        path: PathBuf,
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("file watcher error: {0}")]
    Watcher(#[from] notify::Error),

    #[error("transform failed for {path:?}: {source}")]
    Transform {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("processing stopped by callback at {path:?}")]
    StoppedByCallback { path: PathBuf },

    #[error("error callback failed at {path:?}: {source}")]
    ErrorCallback {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("run cancelled")]
    Cancelled,

    #[error("run deadline exceeded")]
    DeadlineExceeded,

    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl MirrorError {
    pub(crate) fn fs(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MirrorError::Filesystem {
            path: path.into(),
            op,
            source,
        }
    }

    /// True for the two cancellation outcomes (explicit cancel or deadline).
    pub fn is_cancellation(&self) -> bool {
        matches!(self, MirrorError::Cancelled | MirrorError::DeadlineExceeded)
    }
}

pub type Result<T> = std::result::Result<T, MirrorError>;
