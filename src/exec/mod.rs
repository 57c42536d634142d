// src/exec/mod.rs

//! Per-file work.
//!
//! - [`backend`] defines the [`Transform`] and [`ErrorHandler`] seams the
//!   engine calls into, implemented for plain closures.
//! - [`copy`] and [`command`] are the transforms the binary offers.

pub mod backend;
pub mod command;
pub mod copy;

pub use backend::{ErrorHandler, FixedErrorPolicy, Transform};
pub use command::CommandTransform;
pub use copy::CopyTransform;
