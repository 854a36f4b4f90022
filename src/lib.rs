#![deny(missing_docs)]
//! Progress task
//!
//! A background worker that reports incremental progress to an observer
//! which may attach immediately, late, or never.

/// Settings loaded from config files and the environment.
pub mod config;
/// The progress task, its channel and the observer loop.
pub mod task;

pub use config::TaskSettings;
pub use task::{
    observe, CompletionMode, ObserverReport, Percent, ProgressError, ProgressReceiver,
    ProgressTask, TaskOptions, TaskOutcome,
};
