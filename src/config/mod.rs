// src/config/mod.rs

//! Configuration for treemirror.
//!
//! Responsibilities:
//! - The programmatic [`MirrorConfig`] builder used by library callers.
//! - The TOML-backed data model for the binary (`model.rs`).
//! - Loading a config file from disk (`loader.rs`).
//! - Validating both (`validate.rs`).

pub mod builder;
pub mod loader;
pub mod model;
pub mod validate;

pub use builder::MirrorConfig;
pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, ErrorsSection, MirrorSection, RawConfigFile, TransformSection};
