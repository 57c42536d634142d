// src/watch/event_handler.rs

//! Turns a single change notification into an action for the watch driver.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::engine::Task;
use crate::errors::{MirrorError, Result};
use crate::fs::{EntryKind, FileSystem};
use crate::paths::relative_str;
use crate::patterns::{Classifier, Decision};
use crate::watch::watcher::{ChangeKind, FsChange};

/// What the driver should do about one change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeAction {
    /// Nothing to do: vanished, excluded or unmatched path.
    Ignore,
    /// A path went away (removed or renamed); drop any subscription at or
    /// below it.
    Forget(PathBuf),
    /// A non-excluded directory. Subscribed and scanned unless it already is.
    Subscribe(PathBuf),
    /// A matching file to hand to a worker once the debounce window closes.
    Queue(Task),
}

/// Decide what to do about `change`.
///
/// Removals and renames only release subscriptions; creations and
/// modifications are acted on. The path is stat-ed here;
/// if it disappeared in the meantime the change is ignored. Any other stat
/// failure is returned for the error callback.
pub fn triage(
    change: &FsChange,
    root: &Path,
    classifier: &Classifier,
    fs: &dyn FileSystem,
) -> Result<ChangeAction> {
    if matches!(change.kind, ChangeKind::Remove | ChangeKind::Rename) {
        return Ok(ChangeAction::Forget(change.path.clone()));
    }

    let path = &change.path;
    let kind = match fs.stat(path) {
        Ok(kind) => kind,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "changed path vanished before stat");
            return Ok(ChangeAction::Ignore);
        }
        Err(e) => return Err(MirrorError::fs("reading metadata of", path, e)),
    };

    let Some(rel) = relative_str(root, path) else {
        warn!(
            "could not relativize path {:?} against root {:?}",
            path, root
        );
        return Ok(ChangeAction::Ignore);
    };

    let action = match (kind, classifier.classify(path, &rel, kind == EntryKind::Dir)) {
        (EntryKind::Other, _) => ChangeAction::Ignore,
        (_, Decision::Descend) => ChangeAction::Subscribe(path.clone()),
        (_, Decision::Enqueue(task)) => ChangeAction::Queue(task),
        (_, Decision::Skip) | (_, Decision::SkipSubtree) => ChangeAction::Ignore,
    };

    debug!(path = %rel, kind = ?change.kind, ?action, "triaged change");
    Ok(action)
}
