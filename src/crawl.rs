// src/crawl.rs

//! One-shot discovery: walk the input tree and enqueue every matching file.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::engine::{route_error, Discovery};
use crate::errors::{MirrorError, Result};
use crate::exec::ErrorHandler;
use crate::fs::{EntryKind, FileSystem};
use crate::paths::relative_str;
use crate::patterns::{Classifier, Decision};

/// Directory listing with each entry's kind (or the error stat-ing it).
type Listing = Vec<(PathBuf, io::Result<EntryKind>)>;

/// Depth-first walker over the input root.
#[derive(Clone)]
pub struct CrawlDriver {
    pub root: PathBuf,
    pub classifier: Arc<Classifier>,
    pub fs: Arc<dyn FileSystem>,
    pub on_error: Option<Arc<dyn ErrorHandler>>,
}

impl CrawlDriver {
    /// Walk the whole tree, feeding tasks into `discovery`.
    ///
    /// Returns `Ok(())` when the walk completes or the run is cancelled; the
    /// task channel closes when `discovery` is dropped at the end.
    pub async fn run(self, discovery: Discovery) -> Result<()> {
        if !self.check_root().await? {
            return Ok(());
        }

        let mut stack = vec![self.root.clone()];
        let mut enqueued = 0usize;

        while let Some(dir) = stack.pop() {
            if discovery.is_cancelled() {
                debug!("crawl cancelled");
                return Ok(());
            }

            let listing = match self.list(&dir).await? {
                Ok(listing) => listing,
                Err(err) => {
                    route_error(self.on_error.as_ref(), &dir, err)?;
                    continue;
                }
            };

            let mut subdirs = Vec::new();
            for (path, kind) in listing {
                let kind = match kind {
                    Ok(kind) => kind,
                    // Removed between listing and stat.
                    Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                    Err(e) => {
                        let err = MirrorError::fs("reading metadata of", &path, e);
                        route_error(self.on_error.as_ref(), &path, err)?;
                        continue;
                    }
                };
                if kind == EntryKind::Other {
                    continue;
                }

                let Some(rel) = relative_str(&self.root, &path) else {
                    continue;
                };

                match self.classifier.classify(&path, &rel, kind == EntryKind::Dir) {
                    Decision::Descend => subdirs.push(path),
                    Decision::SkipSubtree => debug!(path = %rel, "excluded directory"),
                    Decision::Skip => {}
                    Decision::Enqueue(task) => {
                        if !discovery.tasks.enqueue(task).await {
                            debug!("crawl stopped while enqueueing");
                            return Ok(());
                        }
                        enqueued += 1;
                    }
                }
            }
            // Reversed so the stack pops children in name order.
            stack.extend(subdirs.into_iter().rev());
        }

        info!(root = %self.root.display(), enqueued, "crawl finished discovering files");
        Ok(())
    }

    /// Stat the root. `Ok(false)` means the error callback chose to skip it.
    async fn check_root(&self) -> Result<bool> {
        let fs = Arc::clone(&self.fs);
        let root = self.root.clone();
        let stat = tokio::task::spawn_blocking(move || fs.stat(&root)).await?;

        match stat {
            Ok(EntryKind::Dir) => Ok(true),
            Ok(_) => Err(MirrorError::Config(format!(
                "input root {:?} is not a directory",
                self.root
            ))),
            Err(e) => {
                let err = MirrorError::fs("reading metadata of", &self.root, e);
                route_error(self.on_error.as_ref(), &self.root, err)?;
                Ok(false)
            }
        }
    }

    /// List `dir` and stat each entry on the blocking pool.
    ///
    /// The outer `Result` is a join failure; the inner one a listing failure
    /// to be offered to the error callback.
    async fn list(&self, dir: &Path) -> Result<std::result::Result<Listing, MirrorError>> {
        let fs = Arc::clone(&self.fs);
        let dir = dir.to_path_buf();

        let listing = tokio::task::spawn_blocking(move || -> std::result::Result<Listing, MirrorError> {
            let entries = fs
                .read_dir(&dir)
                .map_err(|e| MirrorError::fs("reading directory", &dir, e))?;
            Ok(entries
                .into_iter()
                .map(|path| {
                    let kind = fs.stat(&path);
                    (path, kind)
                })
                .collect())
        })
        .await?;

        Ok(listing)
    }
}
