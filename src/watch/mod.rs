// src/watch/mod.rs

//! Watch mode: event-driven discovery.
//!
//! This module is responsible for:
//! - Wrapping `notify` behind the [`ChangeSource`] trait, one non-recursive
//!   subscription per directory.
//! - Turning raw notifications into [`FsChange`]s and then into driver actions.
//! - Growing the subscription set as new directories appear, and debouncing
//!   file events so each new file becomes a single task.
//!
//! It does **not** run transforms; it only feeds the task channel.

pub mod driver;
pub mod event_handler;
pub mod watcher;

pub use driver::{WatchDriver, WatchState};
pub use event_handler::{triage, ChangeAction};
pub use watcher::{changes_from_event, ChangeEvent, ChangeKind, ChangeSource, FsChange, NotifySource};

/// Default quiet period before pending file events are flushed.
pub const DEFAULT_DEBOUNCE: std::time::Duration = std::time::Duration::from_millis(50);
