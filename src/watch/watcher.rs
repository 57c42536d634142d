// src/watch/watcher.rs

use std::path::{Path, PathBuf};

use notify::event::{ModifyKind, RenameMode};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::errors::{MirrorError, Result};

/// Operation reported for a changed path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Create,
    Modify,
    Remove,
    Rename,
}

/// One path-level change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl FsChange {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// Item of the merged change stream: a change or a subscription-layer error.
pub type ChangeEvent = std::result::Result<FsChange, notify::Error>;

/// Something that can watch individual directories (non-recursively).
///
/// Events for subscribed directories arrive on the receiver created alongside
/// the source. Subscribing an already watched directory is harmless.
pub trait ChangeSource: Send + 'static {
    fn subscribe(&mut self, dir: &Path) -> Result<()>;
}

/// Production [`ChangeSource`] backed by `notify`.
///
/// Dropping this stops file watching.
pub struct NotifySource {
    inner: RecommendedWatcher,
}

impl std::fmt::Debug for NotifySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifySource").finish()
    }
}

impl NotifySource {
    /// Create the watcher and the channel its events are forwarded into.
    pub fn new() -> Result<(Self, mpsc::UnboundedReceiver<ChangeEvent>)> {
        // Channel from the blocking notify callback into the async world.
        let (event_tx, event_rx) = mpsc::unbounded_channel::<ChangeEvent>();

        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for change in changes_from_event(event) {
                        // Receiver gone means the run is over.
                        if event_tx.send(Ok(change)).is_err() {
                            return;
                        }
                    }
                }
                Err(err) => {
                    let _ = event_tx.send(Err(err));
                }
            },
            Config::default(),
        )?;

        Ok((Self { inner: watcher }, event_rx))
    }
}

impl ChangeSource for NotifySource {
    fn subscribe(&mut self, dir: &Path) -> Result<()> {
        self.inner
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(MirrorError::Watcher)
    }
}

/// Flatten a notify event into per-path changes.
///
/// A rename *into* a watched directory is reported as a create of the new
/// name; the old name is a rename. Access and unclassified events are dropped.
pub fn changes_from_event(event: Event) -> Vec<FsChange> {
    let Event { kind, paths, .. } = event;

    let uniform = |kind: ChangeKind| -> Vec<FsChange> {
        paths.iter().map(|p| FsChange::new(p, kind)).collect()
    };

    match kind {
        EventKind::Create(_) => uniform(ChangeKind::Create),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => uniform(ChangeKind::Create),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => paths
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let kind = if i == 0 {
                    ChangeKind::Rename
                } else {
                    ChangeKind::Create
                };
                FsChange::new(p, kind)
            })
            .collect(),
        EventKind::Modify(ModifyKind::Name(_)) => uniform(ChangeKind::Rename),
        EventKind::Modify(_) => uniform(ChangeKind::Modify),
        EventKind::Remove(_) => uniform(ChangeKind::Remove),
        _ => Vec::new(),
    }
}
