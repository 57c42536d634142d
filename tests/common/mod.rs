#![allow(dead_code)]

pub use treemirror_test_utils::builders::{Tree, TreeBuilder};
pub use treemirror_test_utils::recording::{Call, RecordingTransform};
pub use treemirror_test_utils::{init_tracing, wait_until, with_timeout};

use std::sync::Arc;

use treemirror::{Mirror, MirrorConfig};

/// Config over `tree` with the given patterns and a shared recorder.
pub fn config_for(
    tree: &Tree,
    include: &[&str],
    exclude: &[&str],
    transform: &RecordingTransform,
) -> MirrorConfig {
    MirrorConfig::new(&tree.input, &tree.output)
        .include(include.iter().copied())
        .exclude(exclude.iter().copied())
        .transform_with(Arc::new(transform.clone()))
}

pub fn mirror_for(
    tree: &Tree,
    include: &[&str],
    exclude: &[&str],
    transform: &RecordingTransform,
) -> Mirror {
    Mirror::new(config_for(tree, include, exclude, transform)).expect("valid mirror config")
}
