// src/patterns.rs

//! Include/exclude glob patterns and the path classifier.
//!
//! Patterns are relative to the input root and always use `/` as separator.
//! `*` and `?` never cross a separator; `**` matches any number of
//! directories and `{a,b}` alternates.

use std::fmt;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::engine::Task;
use crate::errors::{MirrorError, Result};

/// Outcome of classifying one discovered filesystem entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// File that is excluded or matches no include pattern.
    Skip,
    /// Excluded directory: do not look at anything below it.
    SkipSubtree,
    /// Directory that should be traversed (or subscribed to).
    Descend,
    /// Matching file, ready for a worker.
    Enqueue(Task),
}

/// Compiled include/exclude pattern sets.
#[derive(Clone)]
pub struct PatternSet {
    include: GlobSet,
    exclude: Option<GlobSet>,
    include_src: Vec<String>,
    exclude_src: Vec<String>,
}

impl fmt::Debug for PatternSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternSet")
            .field("include", &self.include_src)
            .field("exclude", &self.exclude_src)
            .finish()
    }
}

impl PatternSet {
    /// Compile both pattern lists. The first malformed pattern fails the whole
    /// set with [`MirrorError::Pattern`].
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include_set = build_globset(include)?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(build_globset(exclude)?)
        };

        Ok(Self {
            include: include_set,
            exclude: exclude_set,
            include_src: include.to_vec(),
            exclude_src: exclude.to_vec(),
        })
    }

    pub fn include_patterns(&self) -> &[String] {
        &self.include_src
    }

    pub fn exclude_patterns(&self) -> &[String] {
        &self.exclude_src
    }

    pub fn is_excluded(&self, rel_path: &str) -> bool {
        self.exclude
            .as_ref()
            .is_some_and(|set| set.is_match(rel_path))
    }

    /// Like [`is_excluded`](PatternSet::is_excluded), for a directory.
    ///
    /// The directory is also tested with a trailing `/`, so `temp/**` prunes
    /// `temp` itself and not only what lies below it.
    pub fn is_dir_excluded(&self, rel_path: &str) -> bool {
        self.exclude.as_ref().is_some_and(|set| {
            set.is_match(rel_path) || set.is_match(format!("{rel_path}/"))
        })
    }

    pub fn is_included(&self, rel_path: &str) -> bool {
        self.include.is_match(rel_path)
    }
}

/// Build a GlobSet where wildcards do not cross `/`.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .map_err(|source| MirrorError::Pattern {
                pattern: pat.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| MirrorError::Pattern {
        pattern: patterns.join(", "),
        source,
    })
}

/// Turns discovered paths into [`Decision`]s for one run configuration.
#[derive(Debug, Clone)]
pub struct Classifier {
    patterns: PatternSet,
    output_root: PathBuf,
}

impl Classifier {
    pub fn new(patterns: PatternSet, output_root: impl Into<PathBuf>) -> Self {
        Self {
            patterns,
            output_root: output_root.into(),
        }
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Classify `path`, whose location relative to the input root is
    /// `rel_path`. The input root itself (`rel_path == ""`) always descends.
    pub fn classify(&self, path: &Path, rel_path: &str, is_dir: bool) -> Decision {
        if rel_path.is_empty() {
            return Decision::Descend;
        }

        if is_dir {
            return if self.patterns.is_dir_excluded(rel_path) {
                Decision::SkipSubtree
            } else {
                Decision::Descend
            };
        }

        if self.patterns.is_excluded(rel_path) {
            return Decision::Skip;
        }

        if !self.patterns.is_included(rel_path) {
            return Decision::Skip;
        }

        Decision::Enqueue(Task::new(path, self.output_root.join(rel_path)))
    }
}
