// src/watch/driver.rs

//! Event-driven discovery.
//!
//! Lifecycle: `Subscribing` (walk the input root and subscribe every
//! non-excluded directory) → `Active` (consume the change stream) →
//! `Draining` (cancelled: stop reading events, close the task channel) →
//! `Stopped`.
//!
//! The subscription set and the pending-file map are owned by the driver task
//! alone; nothing else reads or writes them.

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::engine::{route_error, Discovery, Task};
use crate::errors::{MirrorError, Result};
use crate::exec::ErrorHandler;
use crate::fs::{EntryKind, FileSystem};
use crate::paths::relative_str;
use crate::patterns::{Classifier, Decision};
use crate::watch::event_handler::{triage, ChangeAction};
use crate::watch::watcher::{ChangeEvent, ChangeSource};

/// Pending files are flushed at the latest this many debounce windows after
/// the first one was queued, even if events keep arriving.
const MAX_DEBOUNCE_WINDOWS: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Subscribing,
    Active,
    Draining,
    Stopped,
}

pub struct WatchDriver<S: ChangeSource> {
    root: PathBuf,
    classifier: Arc<Classifier>,
    fs: Arc<dyn FileSystem>,
    on_error: Option<Arc<dyn ErrorHandler>>,
    debounce: Duration,
    source: S,
    state: WatchState,
    subscribed: HashSet<PathBuf>,
    pending: BTreeMap<PathBuf, Task>,
    pending_since: Option<Instant>,
}

impl<S: ChangeSource> WatchDriver<S> {
    pub fn new(
        root: PathBuf,
        classifier: Arc<Classifier>,
        fs: Arc<dyn FileSystem>,
        on_error: Option<Arc<dyn ErrorHandler>>,
        debounce: Duration,
        source: S,
    ) -> Self {
        Self {
            root,
            classifier,
            fs,
            on_error,
            debounce,
            source,
            state: WatchState::Subscribing,
            subscribed: HashSet::new(),
            pending: BTreeMap::new(),
            pending_since: None,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Directories currently subscribed to.
    pub fn subscriptions(&self) -> &HashSet<PathBuf> {
        &self.subscribed
    }

    fn enter(&mut self, state: WatchState) {
        debug!(from = ?self.state, to = ?state, "watch state change");
        self.state = state;
    }

    /// Run until cancelled.
    ///
    /// Only returns `Ok(())` after cancellation; a closed event stream is a
    /// watcher error.
    pub async fn run(
        self,
        mut events: mpsc::UnboundedReceiver<ChangeEvent>,
        discovery: Discovery,
    ) -> Result<()> {
        let (mut this, subscribed) = self.blocking(Self::subscribe_root).await?;
        subscribed?;
        info!(
            root = %this.root.display(),
            dirs = this.subscribed.len(),
            "watching for changes"
        );

        this.enter(WatchState::Active);
        loop {
            let flush_at = this.flush_deadline();

            let step = tokio::select! {
                biased;
                _ = discovery.token.cancelled() => Step::Stop,
                _ = sleep_until_opt(flush_at), if flush_at.is_some() => Step::Flush,
                event = events.recv() => Step::Event(event),
            };

            match step {
                Step::Stop => break,
                Step::Flush => {
                    // Events already delivered belong to the batch being flushed.
                    while let Ok(event) = events.try_recv() {
                        this = this.handle(event).await?;
                    }
                    if !this.flush(&discovery).await? {
                        break;
                    }
                }
                Step::Event(Some(event)) => {
                    this = this.handle(event).await?;
                    if this.debounce.is_zero() && !this.flush(&discovery).await? {
                        break;
                    }
                }
                Step::Event(None) => {
                    return Err(MirrorError::Watcher(notify::Error::generic(
                        "change notification stream closed",
                    )));
                }
            }
        }

        this.enter(WatchState::Draining);
        if !this.pending.is_empty() {
            debug!(dropped = this.pending.len(), "dropping pending files on shutdown");
        }
        // Dropping `discovery` closes the task channel.
        drop(discovery);
        this.enter(WatchState::Stopped);
        Ok(())
    }

    /// Run `f` against the driver on the blocking pool.
    ///
    /// Subscribing and stat-ing touch the filesystem; the driver moves onto
    /// the blocking pool for the call and comes back with the result.
    async fn blocking<T, F>(mut self, f: F) -> Result<(Self, T)>
    where
        T: Send + 'static,
        F: FnOnce(&mut Self) -> T + Send + 'static,
    {
        let joined = tokio::task::spawn_blocking(move || {
            let out = f(&mut self);
            (self, out)
        })
        .await?;
        Ok(joined)
    }

    /// Apply one item of the change stream.
    async fn handle(self, event: ChangeEvent) -> Result<Self> {
        let change = match event {
            Ok(change) => change,
            Err(err) => {
                let path = err.paths.first().cloned().unwrap_or_else(|| self.root.clone());
                route_error(self.on_error.as_ref(), &path, MirrorError::Watcher(err))?;
                return Ok(self);
            }
        };

        let path = change.path.clone();
        let (mut this, triaged) = self
            .blocking(move |d| triage(&change, &d.root, &d.classifier, d.fs.as_ref()))
            .await?;
        let action = match triaged {
            Ok(action) => action,
            Err(err) => {
                route_error(this.on_error.as_ref(), &path, err)?;
                ChangeAction::Ignore
            }
        };

        match action {
            ChangeAction::Ignore => Ok(this),
            ChangeAction::Queue(task) => {
                this.queue(task);
                Ok(this)
            }
            ChangeAction::Forget(gone) => {
                this.forget(&gone);
                Ok(this)
            }
            // Attribute changes on a watched directory are not new content.
            ChangeAction::Subscribe(dir) if this.subscribed.contains(&dir) => Ok(this),
            ChangeAction::Subscribe(dir) => {
                let (this, res) = this.blocking(move |d| d.subscribe_tree(dir, true)).await?;
                res?;
                Ok(this)
            }
        }
    }

    fn subscribe_root(&mut self) -> Result<()> {
        match self.fs.stat(&self.root) {
            Ok(EntryKind::Dir) => {}
            Ok(_) => {
                return Err(MirrorError::Config(format!(
                    "input root {:?} is not a directory",
                    self.root
                )));
            }
            Err(e) => {
                let err = MirrorError::fs("reading metadata of", &self.root, e);
                return route_error(self.on_error.as_ref(), &self.root, err);
            }
        }
        self.subscribe_tree(self.root.clone(), false)
    }

    /// Drop `gone` and everything below it from the subscription set, so a
    /// directory recreated under the same name is scanned again.
    fn forget(&mut self, gone: &Path) {
        let before = self.subscribed.len();
        self.subscribed.retain(|dir| !dir.starts_with(gone));
        if self.subscribed.len() != before {
            debug!(
                path = %gone.display(),
                released = before - self.subscribed.len(),
                "subscriptions released"
            );
        }
    }

    fn queue(&mut self, task: Task) {
        self.pending_since.get_or_insert_with(Instant::now);
        self.pending.insert(task.input_path.clone(), task);
    }

    /// Subscribe `top` and every non-excluded directory below it.
    ///
    /// With `queue_files`, files already present are queued too: a directory
    /// that appears while watching may have been populated before its
    /// subscription took effect.
    fn subscribe_tree(&mut self, top: PathBuf, queue_files: bool) -> Result<()> {
        let mut stack = vec![top];

        while let Some(dir) = stack.pop() {
            if let Err(err) = self.source.subscribe(&dir) {
                route_error(self.on_error.as_ref(), &dir, err)?;
                continue;
            }
            if self.subscribed.insert(dir.clone()) {
                debug!(dir = %dir.display(), "subscribed");
            }

            let entries = match self.fs.read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    let err = MirrorError::fs("reading directory", &dir, e);
                    route_error(self.on_error.as_ref(), &dir, err)?;
                    continue;
                }
            };

            for path in entries {
                let kind = match self.fs.stat(&path) {
                    Ok(kind) => kind,
                    Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                    Err(e) => {
                        let err = MirrorError::fs("reading metadata of", &path, e);
                        route_error(self.on_error.as_ref(), &path, err)?;
                        continue;
                    }
                };
                if kind == EntryKind::Other || (kind == EntryKind::File && !queue_files) {
                    continue;
                }
                let Some(rel) = relative_str(&self.root, &path) else {
                    continue;
                };

                match self.classifier.classify(&path, &rel, kind == EntryKind::Dir) {
                    Decision::Descend => stack.push(path),
                    Decision::Enqueue(task) => self.queue(task),
                    Decision::Skip | Decision::SkipSubtree => {}
                }
            }
        }

        Ok(())
    }

    /// When the pending files should be flushed, if any are pending.
    fn flush_deadline(&self) -> Option<Instant> {
        let since = self.pending_since?;
        let cap = since + self.debounce * MAX_DEBOUNCE_WINDOWS;
        Some((Instant::now() + self.debounce).min(cap))
    }

    /// Enqueue every pending file that still exists.
    ///
    /// Returns `Ok(false)` if the run was cancelled while enqueueing.
    async fn flush(&mut self, discovery: &Discovery) -> Result<bool> {
        let pending = std::mem::take(&mut self.pending);
        self.pending_since = None;

        let fs = Arc::clone(&self.fs);
        let ready = tokio::task::spawn_blocking(move || {
            pending
                .into_values()
                .filter(|task| {
                    let present = fs.exists(&task.input_path);
                    if !present {
                        debug!(path = %task.input_path.display(), "pending file vanished; skipping");
                    }
                    present
                })
                .collect::<Vec<_>>()
        })
        .await?;

        for task in ready {
            if !discovery.tasks.enqueue(task).await {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// What woke the active loop.
enum Step {
    Stop,
    Flush,
    Event(Option<ChangeEvent>),
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

impl<S: ChangeSource> std::fmt::Debug for WatchDriver<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchDriver")
            .field("root", &self.root)
            .field("state", &self.state)
            .field("subscribed", &self.subscribed.len())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}
