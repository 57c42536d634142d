// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::engine::DEFAULT_QUEUE_CAPACITY;
use crate::types::{ErrorAction, TransformKind};

/// Configuration file as deserialized, before validation.
///
/// ```toml
/// [mirror]
/// input = "images"
/// output = "out"
/// include = ["**/*.jpg", "**/*.png"]
/// exclude = ["temp/**"]
/// concurrency = 4
///
/// [transform]
/// kind = "command"
/// cmd = "convert {input} {output}.webp"
///
/// [errors]
/// on_walk_error = "skip"
/// ```
///
/// Every section is optional at the TOML level; validation decides what is
/// actually required.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub mirror: MirrorSection,

    #[serde(default)]
    pub transform: TransformSection,

    #[serde(default)]
    pub errors: ErrorsSection,
}

/// Validated configuration. Only constructible through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub mirror: MirrorSection,
    pub transform: TransformSection,
    pub errors: ErrorsSection,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        mirror: MirrorSection,
        transform: TransformSection,
        errors: ErrorsSection,
    ) -> Self {
        Self {
            mirror,
            transform,
            errors,
        }
    }

    /// Resolve relative `input` / `output` against `base`.
    pub fn resolve_roots(&mut self, base: &Path) {
        self.mirror.input = join_relative(base, &self.mirror.input);
        self.mirror.output = join_relative(base, &self.mirror.output);
    }
}

fn join_relative(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// `[mirror]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorSection {
    #[serde(default)]
    pub input: PathBuf,

    #[serde(default)]
    pub output: PathBuf,

    #[serde(default)]
    pub include: Vec<String>,

    #[serde(default)]
    pub exclude: Vec<String>,

    /// Requested worker count; `0` means "use `max_concurrency`".
    #[serde(default)]
    pub concurrency: usize,

    /// Upper bound on workers; `0` means the logical core count.
    #[serde(default)]
    pub max_concurrency: usize,

    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,

    /// Watch-mode debounce window in milliseconds.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_debounce_ms() -> u64 {
    crate::watch::DEFAULT_DEBOUNCE.as_millis() as u64
}

impl Default for MirrorSection {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output: PathBuf::new(),
            include: Vec::new(),
            exclude: Vec::new(),
            concurrency: 0,
            max_concurrency: 0,
            queue_capacity: default_queue_capacity(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// `[transform]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TransformSection {
    #[serde(default)]
    pub kind: TransformKind,

    /// Shell command template; required when `kind = "command"`.
    ///
    /// `{input}` and `{output}` are replaced with the quoted paths.
    #[serde(default)]
    pub cmd: Option<String>,
}

/// `[errors]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ErrorsSection {
    /// What to do when a directory cannot be read or an entry cannot be
    /// stat-ed: `"skip"` or `"stop"` (default).
    #[serde(default)]
    pub on_walk_error: ErrorAction,
}
