//! Types shared by the progress task and its observers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A progress value in percent (0-100).
pub type Percent = u8;

/// Increment between two emitted progress values.
pub const PROGRESS_STEP: Percent = 10;

/// Final progress value emitted by the work routine.
pub const PROGRESS_MAX: Percent = 100;

/// Default pacing between two emissions.
pub const DEFAULT_STEP_INTERVAL: Duration = Duration::from_millis(50);

/// Progress values emitted by the work routine, in order: `0, 10, ..., 100`.
pub fn progress_steps() -> impl Iterator<Item = Percent> {
    (0..=PROGRESS_MAX).step_by(usize::from(PROGRESS_STEP))
}

/// How the work routine announces that it has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionMode {
    /// Raise the completion signal and leave the progress channel open.
    Signal,
    /// Close the progress channel, creating an already-closed one if no observer exists.
    #[default]
    Close,
}

impl CompletionMode {
    /// Configuration spelling of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Signal => "signal",
            Self::Close => "close",
        }
    }
}

impl fmt::Display for CompletionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-task execution options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskOptions {
    /// Delay after each emitted value.
    pub step_interval: Duration,
    /// Completion protocol used by the task.
    pub completion: CompletionMode,
}

impl Default for TaskOptions {
    fn default() -> Self {
        Self {
            step_interval: DEFAULT_STEP_INTERVAL,
            completion: CompletionMode::default(),
        }
    }
}

impl TaskOptions {
    /// Override the pacing interval.
    #[must_use]
    pub fn with_step_interval(mut self, step_interval: Duration) -> Self {
        self.step_interval = step_interval;
        self
    }

    /// Override the completion protocol.
    #[must_use]
    pub fn with_completion(mut self, completion: CompletionMode) -> Self {
        self.completion = completion;
        self
    }
}

/// Summary of a finished work routine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskOutcome {
    /// Values produced by the loop, delivered or not.
    pub emitted: usize,
    /// Values an observer took before the routine moved on.
    pub delivered: usize,
    /// Whether the loop stopped early on cancellation.
    pub cancelled: bool,
}

impl TaskOutcome {
    /// Values the observer did not take: emitted while no channel existed,
    /// or left pending when cancellation interrupted a send.
    #[must_use]
    pub const fn dropped(&self) -> usize {
        self.emitted.saturating_sub(self.delivered)
    }
}

/// Errors produced by the progress task.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProgressError {
    /// The work routine runs at most once per task.
    #[error("Task {task} has already been started")]
    AlreadyStarted {
        /// Task name.
        task: String,
    },
    /// A value was sent on a channel that has been closed.
    #[error("Progress channel is closed")]
    ChannelClosed,
}
