//! Progress-reporting task
//!
//! Runs a paced unit of work in the background and reports its progress to
//! at most one observer over a lazily created channel.

pub mod channel;
pub mod observer;
pub mod progress_task;
pub mod types;

pub use channel::ProgressReceiver;
pub use observer::{observe, ObserverReport};
pub use progress_task::ProgressTask;
pub use types::{
    progress_steps, CompletionMode, Percent, ProgressError, TaskOptions, TaskOutcome,
    DEFAULT_STEP_INTERVAL, PROGRESS_MAX, PROGRESS_STEP,
};
