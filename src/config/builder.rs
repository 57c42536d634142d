// src/config/builder.rs

//! Programmatic run configuration.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::model::ConfigFile;
use crate::engine::DEFAULT_QUEUE_CAPACITY;
use crate::errors::MirrorError;
use crate::exec::{ErrorHandler, FixedErrorPolicy, Transform};
use crate::fs::{FileSystem, RealFileSystem};
use crate::types::{ErrorAction, Flow};
use crate::watch::DEFAULT_DEBOUNCE;

/// Builder for a [`Mirror`](crate::Mirror).
///
/// Nothing is validated here; [`Mirror::new`](crate::Mirror::new) checks the
/// finished configuration.
#[derive(Clone)]
pub struct MirrorConfig {
    pub(crate) input: PathBuf,
    pub(crate) output: PathBuf,
    pub(crate) include: Vec<String>,
    pub(crate) exclude: Vec<String>,
    pub(crate) concurrency: usize,
    pub(crate) max_concurrency: usize,
    pub(crate) queue_capacity: usize,
    pub(crate) debounce: Duration,
    pub(crate) transform: Option<Arc<dyn Transform>>,
    pub(crate) on_error: Option<Arc<dyn ErrorHandler>>,
    pub(crate) fs: Arc<dyn FileSystem>,
}

impl MirrorConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            include: Vec::new(),
            exclude: Vec::new(),
            concurrency: 0,
            max_concurrency: 0,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            debounce: DEFAULT_DEBOUNCE,
            transform: None,
            on_error: None,
            fs: Arc::new(RealFileSystem),
        }
    }

    /// Build from a validated config file. The transform is left unset.
    pub fn from_file(cfg: &ConfigFile) -> Self {
        let m = &cfg.mirror;
        let mut config = Self::new(&m.input, &m.output)
            .include(m.include.iter().cloned())
            .exclude(m.exclude.iter().cloned())
            .concurrency(m.concurrency)
            .max_concurrency(m.max_concurrency)
            .queue_capacity(m.queue_capacity)
            .debounce(Duration::from_millis(m.debounce_ms));

        // `stop` is the same as having no callback; only install one for skip.
        if cfg.errors.on_walk_error == ErrorAction::Continue {
            config = config.on_error_with(Arc::new(FixedErrorPolicy(ErrorAction::Continue)));
        }
        config
    }

    pub fn include<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn exclude<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.concurrency = n;
        self
    }

    pub fn max_concurrency(mut self, n: usize) -> Self {
        self.max_concurrency = n;
        self
    }

    pub fn queue_capacity(mut self, n: usize) -> Self {
        self.queue_capacity = n;
        self
    }

    /// Quiet period used by watch mode before pending files are enqueued.
    pub fn debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    pub fn transform<F>(self, f: F) -> Self
    where
        F: Fn(&Path, &Path) -> anyhow::Result<Flow> + Send + Sync + 'static,
    {
        self.transform_with(Arc::new(f))
    }

    pub fn transform_with(mut self, transform: Arc<dyn Transform>) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn on_error<F>(self, f: F) -> Self
    where
        F: Fn(&Path, &MirrorError) -> anyhow::Result<ErrorAction> + Send + Sync + 'static,
    {
        self.on_error_with(Arc::new(f))
    }

    pub fn on_error_with(mut self, handler: Arc<dyn ErrorHandler>) -> Self {
        self.on_error = Some(handler);
        self
    }

    /// Replace the filesystem used for discovery and output directories.
    pub fn filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

impl fmt::Debug for MirrorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MirrorConfig")
            .field("input", &self.input)
            .field("output", &self.output)
            .field("include", &self.include)
            .field("exclude", &self.exclude)
            .field("concurrency", &self.concurrency)
            .field("max_concurrency", &self.max_concurrency)
            .field("queue_capacity", &self.queue_capacity)
            .field("debounce", &self.debounce)
            .field("transform", &self.transform.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("fs", &self.fs)
            .finish()
    }
}
