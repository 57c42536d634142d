// src/config/validate.rs

use crate::config::builder::MirrorConfig;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{MirrorError, Result};
use crate::types::TransformKind;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = MirrorError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.mirror, raw.transform, raw.errors))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_mirror_section(cfg)?;
    validate_transform_section(cfg)?;
    Ok(())
}

fn validate_mirror_section(cfg: &RawConfigFile) -> Result<()> {
    let m = &cfg.mirror;

    if m.input.as_os_str().is_empty() {
        return Err(MirrorError::Config(
            "[mirror].input must be set".to_string(),
        ));
    }
    if m.output.as_os_str().is_empty() {
        return Err(MirrorError::Config(
            "[mirror].output must be set".to_string(),
        ));
    }
    if m.include.is_empty() {
        return Err(MirrorError::Config(
            "[mirror].include must contain at least one pattern".to_string(),
        ));
    }
    if m.queue_capacity == 0 {
        return Err(MirrorError::Config(
            "[mirror].queue_capacity must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_transform_section(cfg: &RawConfigFile) -> Result<()> {
    if cfg.transform.kind == TransformKind::Command {
        let has_cmd = cfg
            .transform
            .cmd
            .as_deref()
            .is_some_and(|c| !c.trim().is_empty());
        if !has_cmd {
            return Err(MirrorError::Config(
                "[transform].cmd is required when kind = \"command\"".to_string(),
            ));
        }
    }
    Ok(())
}

/// Checks run by [`Mirror::new`](crate::Mirror::new) before anything is
/// compiled or resolved.
pub(crate) fn validate_mirror_config(cfg: &MirrorConfig) -> Result<()> {
    if cfg.input.as_os_str().is_empty() {
        return Err(MirrorError::Config("input directory is required".to_string()));
    }
    if cfg.output.as_os_str().is_empty() {
        return Err(MirrorError::Config("output directory is required".to_string()));
    }
    if cfg.include.is_empty() {
        return Err(MirrorError::Config(
            "at least one include pattern is required".to_string(),
        ));
    }
    if cfg.transform.is_none() {
        return Err(MirrorError::Config("a transform callback is required".to_string()));
    }
    if cfg.queue_capacity == 0 {
        return Err(MirrorError::Config(
            "queue capacity must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}
