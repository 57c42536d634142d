// src/mirror.rs

//! The public entry point: a validated configuration that can crawl or watch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::config::validate::validate_mirror_config;
use crate::config::MirrorConfig;
use crate::crawl::CrawlDriver;
use crate::engine::{
    effective_concurrency, run_pipeline, Cancellation, Discovery, RunSpec, Task, TaskSender,
    WorkerContext,
};
use crate::errors::{MirrorError, Result};
use crate::exec::ErrorHandler;
use crate::fs::FileSystem;
use crate::paths::{check_circular_reference, resolve_absolute};
use crate::patterns::{Classifier, PatternSet};
use crate::watch::{ChangeEvent, ChangeSource, NotifySource, WatchDriver};

/// A configured mirror between two directory trees.
///
/// Construction validates the configuration and compiles the patterns. Each
/// [`crawl`](Mirror::crawl) or [`watch`](Mirror::watch) call is an independent
/// run with its own worker pool, channel and error latch.
#[derive(Clone)]
pub struct Mirror {
    input_root: PathBuf,
    output_root: PathBuf,
    classifier: Arc<Classifier>,
    workers: usize,
    queue_capacity: usize,
    debounce: Duration,
    ctx: Arc<WorkerContext>,
    on_error: Option<Arc<dyn ErrorHandler>>,
}

impl std::fmt::Debug for Mirror {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mirror")
            .field("input_root", &self.input_root)
            .field("output_root", &self.output_root)
            .field("patterns", self.classifier.patterns())
            .field("workers", &self.workers)
            .field("queue_capacity", &self.queue_capacity)
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}

impl Mirror {
    pub fn new(config: MirrorConfig) -> Result<Self> {
        validate_mirror_config(&config)?;

        let patterns = PatternSet::new(&config.include, &config.exclude)?;
        let input_root = resolve_absolute(&config.input)?;
        let output_root = resolve_absolute(&config.output)?;
        let workers = effective_concurrency(config.concurrency, config.max_concurrency);

        let transform = config
            .transform
            .ok_or_else(|| MirrorError::Config("a transform callback is required".to_string()))?;

        debug!(
            input = %input_root.display(),
            output = %output_root.display(),
            workers,
            ?patterns,
            "mirror configured"
        );

        Ok(Self {
            classifier: Arc::new(Classifier::new(patterns, output_root.clone())),
            input_root,
            output_root,
            workers,
            queue_capacity: config.queue_capacity,
            debounce: config.debounce,
            ctx: Arc::new(WorkerContext {
                transform,
                fs: config.fs,
            }),
            on_error: config.on_error,
        })
    }

    pub fn input_root(&self) -> &Path {
        &self.input_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Number of workers each run starts.
    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    fn fs(&self) -> Arc<dyn FileSystem> {
        Arc::clone(&self.ctx.fs)
    }

    fn run_spec(&self) -> RunSpec {
        RunSpec {
            workers: self.workers,
            queue_capacity: self.queue_capacity,
            ctx: Arc::clone(&self.ctx),
        }
    }

    fn crawl_driver(&self) -> CrawlDriver {
        CrawlDriver {
            root: self.input_root.clone(),
            classifier: Arc::clone(&self.classifier),
            fs: self.fs(),
            on_error: self.on_error.clone(),
        }
    }

    /// Walk the input tree once and transform every matching file.
    ///
    /// Returns when every task has been processed, on the first fatal error,
    /// or when `cancel` fires. No transform is running once this returns.
    pub async fn crawl(&self, cancel: &Cancellation) -> Result<()> {
        check_circular_reference(&self.input_root, &self.output_root)?;

        let driver = self.crawl_driver();
        run_pipeline(self.run_spec(), cancel, "crawl", move |discovery| {
            driver.run(discovery)
        })
        .await
    }

    /// Watch the input tree and transform files as they are created or
    /// modified, until `cancel` fires or a fatal error occurs.
    ///
    /// Files already present when the watch starts are not processed; use
    /// [`crawl`](Mirror::crawl) first for that.
    pub async fn watch(&self, cancel: &Cancellation) -> Result<()> {
        check_circular_reference(&self.input_root, &self.output_root)?;

        let (source, events) = NotifySource::new()?;
        self.run_watch(cancel, source, events).await
    }

    /// Like [`watch`](Mirror::watch), with a caller-provided change source.
    pub async fn watch_with<S: ChangeSource>(
        &self,
        cancel: &Cancellation,
        source: S,
        events: mpsc::UnboundedReceiver<ChangeEvent>,
    ) -> Result<()> {
        check_circular_reference(&self.input_root, &self.output_root)?;
        self.run_watch(cancel, source, events).await
    }

    async fn run_watch<S: ChangeSource>(
        &self,
        cancel: &Cancellation,
        source: S,
        events: mpsc::UnboundedReceiver<ChangeEvent>,
    ) -> Result<()> {
        let driver = WatchDriver::new(
            self.input_root.clone(),
            Arc::clone(&self.classifier),
            self.fs(),
            self.on_error.clone(),
            self.debounce,
            source,
        );
        run_pipeline(self.run_spec(), cancel, "watch", move |discovery| {
            driver.run(events, discovery)
        })
        .await
    }

    /// The tasks a crawl would run, without running any transform or creating
    /// any directory.
    ///
    /// The walk is abandoned as soon as `cancel` fires or its deadline passes.
    pub async fn plan(&self, cancel: &Cancellation) -> Result<Vec<Task>> {
        check_circular_reference(&self.input_root, &self.output_root)?;

        let token = cancel.token().child_token();
        let (tx, rx) = async_channel::bounded(self.queue_capacity);

        let collector = tokio::spawn(async move {
            let mut tasks = Vec::new();
            while let Ok(task) = rx.recv().await {
                tasks.push(task);
            }
            tasks
        });

        let discovery = Discovery {
            tasks: TaskSender::new(tx, token.clone()),
            token: token.clone(),
        };
        let walked = tokio::select! {
            biased;
            err = cancel.cancelled() => Err(err),
            res = self.crawl_driver().run(discovery) => res,
        };
        if let Err(err) = walked {
            token.cancel();
            collector.abort();
            return Err(err);
        }

        let mut tasks = collector.await?;
        if cancel.is_cancelled() {
            return Err(cancel.cancelled().await);
        }

        tasks.sort_by(|a, b| a.input_path.cmp(&b.input_path));
        info!(files = tasks.len(), "planned crawl");
        Ok(tasks)
    }
}
