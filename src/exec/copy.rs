// src/exec/copy.rs

use std::path::Path;

use anyhow::Context;
use tracing::debug;

use crate::exec::Transform;
use crate::types::Flow;

/// Copies each input file to its output path.
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyTransform;

impl Transform for CopyTransform {
    fn transform(&self, input: &Path, output: &Path) -> anyhow::Result<Flow> {
        let bytes = std::fs::copy(input, output)
            .with_context(|| format!("copying {:?} to {:?}", input, output))?;
        debug!(input = %input.display(), bytes, "copied");
        Ok(Flow::Continue)
    }
}
