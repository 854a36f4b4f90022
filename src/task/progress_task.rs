//! Progress-reporting worker.
//!
//! A [`ProgressTask`] runs a paced work routine and hands its progress to
//! at most one observer. The progress channel is created lazily, on the
//! first call to [`ProgressTask::observe_progress`], so that a task nobody
//! watches never blocks on a send.

use super::channel::{ProgressChannel, ProgressReceiver};
use super::types::{
    progress_steps, CompletionMode, Percent, ProgressError, TaskOptions, TaskOutcome,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A unit of work that reports its progress to a lazily attached observer.
#[derive(Debug)]
pub struct ProgressTask {
    name: String,
    options: TaskOptions,
    /// Absent until an observer asks for it (or, in close mode, until the
    /// routine finishes). Never replaced once set.
    progress: OnceLock<Arc<ProgressChannel>>,
    /// Serializes the absent -> present transition of `progress`.
    init_lock: Mutex<()>,
    done: watch::Sender<bool>,
    started: AtomicBool,
}

impl ProgressTask {
    /// Create a task with default options.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, TaskOptions::default())
    }

    /// Create a task with explicit options.
    #[must_use]
    pub fn with_options(name: impl Into<String>, options: TaskOptions) -> Self {
        let (done, _) = watch::channel(false);
        Self {
            name: name.into(),
            options,
            progress: OnceLock::new(),
            init_lock: Mutex::new(()),
            done,
            started: AtomicBool::new(false),
        }
    }

    /// Task name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Completion protocol of this task.
    #[must_use]
    pub const fn completion_mode(&self) -> CompletionMode {
        self.options.completion
    }

    /// Return the progress channel, creating it on first use.
    ///
    /// Safe to call from any thread and any number of times: every call
    /// returns a handle to the same channel.
    pub fn observe_progress(&self) -> ProgressReceiver {
        if let Some(channel) = self.progress.get() {
            return ProgressReceiver::new(Arc::clone(channel));
        }

        let _guard = self.lock_init();
        // Another caller may have won the race while we waited for the lock.
        let channel = match self.progress.get() {
            Some(channel) => Arc::clone(channel),
            None => {
                let channel = Arc::new(ProgressChannel::new());
                self.publish(Arc::clone(&channel));
                info!(task = %self.name, "Progress channel created");
                channel
            }
        };
        ProgressReceiver::new(channel)
    }

    /// Whether the work routine has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        *self.done.borrow()
    }

    /// Wait until the work routine has finished.
    ///
    /// Resolves immediately when the task is already done.
    pub async fn wait_finished(&self) {
        let mut done = self.done.subscribe();
        // The sender lives in `self`, so the wait cannot observe a dropped signal.
        let _ = done.wait_for(|finished| *finished).await;
    }

    /// Launch the work routine on the Tokio runtime.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<Result<TaskOutcome, ProgressError>> {
        self.spawn_with_cancel(CancellationToken::new())
    }

    /// Attach an observer, then launch the work routine.
    ///
    /// The channel exists before the routine starts, so the observer
    /// receives every value from `0` on, whichever worker runs the routine.
    pub fn spawn_observed(
        self: &Arc<Self>,
    ) -> (
        ProgressReceiver,
        JoinHandle<Result<TaskOutcome, ProgressError>>,
    ) {
        let progress = self.observe_progress();
        (progress, self.spawn())
    }

    /// Launch the work routine on the Tokio runtime with a cancellation token.
    pub fn spawn_with_cancel(
        self: &Arc<Self>,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<TaskOutcome, ProgressError>> {
        let task = Arc::clone(self);
        tokio::spawn(async move { task.run_until_cancelled(cancel).await })
    }

    /// Run the work routine to completion.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::AlreadyStarted`] if the routine has run before.
    pub async fn run(&self) -> Result<TaskOutcome, ProgressError> {
        self.run_until_cancelled(CancellationToken::new()).await
    }

    /// Run the work routine until it completes or `cancel` fires.
    ///
    /// The completion protocol runs in both cases, so observers always
    /// terminate.
    ///
    /// # Errors
    ///
    /// Returns [`ProgressError::AlreadyStarted`] if the routine has run before.
    pub async fn run_until_cancelled(
        &self,
        cancel: CancellationToken,
    ) -> Result<TaskOutcome, ProgressError> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(ProgressError::AlreadyStarted {
                task: self.name.clone(),
            });
        }

        info!(task = %self.name, mode = %self.options.completion, "Task is running");
        let mut outcome = TaskOutcome::default();

        for percent in progress_steps() {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }
            outcome.emitted += 1;

            match self.emit(percent, &cancel).await {
                Emission::Delivered => outcome.delivered += 1,
                Emission::Dropped => {}
                Emission::Cancelled => {
                    outcome.cancelled = true;
                    break;
                }
            }

            tokio::select! {
                () = cancel.cancelled() => {
                    outcome.cancelled = true;
                    break;
                }
                () = tokio::time::sleep(self.options.step_interval) => {}
            }
        }

        if outcome.cancelled {
            warn!(task = %self.name, emitted = outcome.emitted, "Task cancelled");
        }
        self.finish();
        info!(
            task = %self.name,
            delivered = outcome.delivered,
            dropped = outcome.dropped(),
            "Task routine exits"
        );
        Ok(outcome)
    }

    /// Send `percent` if a channel exists; never creates one.
    async fn emit(&self, percent: Percent, cancel: &CancellationToken) -> Emission {
        let Some(channel) = self.progress.get() else {
            debug!(task = %self.name, percent, "No observer, progress dropped");
            return Emission::Dropped;
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Emission::Cancelled,
            result = channel.send(percent) => match result {
                Ok(()) => Emission::Delivered,
                // Only reachable if the channel was closed while the loop
                // still runs; `finish` closes it after the last emission.
                Err(err) => {
                    debug!(
                        task = %self.name,
                        percent,
                        error = %err,
                        "Progress channel closed, value dropped"
                    );
                    Emission::Dropped
                }
            },
        }
    }

    fn finish(&self) {
        if self.options.completion == CompletionMode::Close {
            self.close_progress();
        }
        self.done.send_replace(true);
    }

    /// Close the progress channel, installing a closed placeholder when no
    /// observer ever created one.
    fn close_progress(&self) {
        let _guard = self.lock_init();
        if let Some(channel) = self.progress.get() {
            channel.close();
            debug!(task = %self.name, "Progress channel closed");
            return;
        }

        self.publish(Arc::new(ProgressChannel::closed()));
        info!(task = %self.name, "Closed placeholder progress channel created");
    }

    /// Store a freshly created channel. Callers hold `init_lock` and have
    /// checked that the slot is empty.
    fn publish(&self, channel: Arc<ProgressChannel>) {
        if self.progress.set(channel).is_err() {
            warn!(task = %self.name, "Progress channel already installed");
        }
    }

    fn lock_init(&self) -> MutexGuard<'_, ()> {
        self.init_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

enum Emission {
    Delivered,
    Dropped,
    Cancelled,
}
