//! Observer loop for a progress task.

use super::progress_task::ProgressTask;
use super::types::{CompletionMode, Percent};
use tracing::info;

/// What an observer saw before the task finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserverReport {
    /// Name of the observed task.
    pub task: String,
    /// Progress values received, in delivery order.
    pub received: Vec<Percent>,
}

/// Attach to `task` and consume its progress until it finishes.
///
/// Signal-mode tasks are watched with a selective wait over the progress
/// channel and the completion signal; close-mode tasks are read until the
/// channel reports end-of-stream. Either way the loop terminates, even when
/// the task finished before the observer attached.
pub async fn observe<F>(task: &ProgressTask, mut on_progress: F) -> ObserverReport
where
    F: FnMut(Percent),
{
    let progress = task.observe_progress();
    let mut received = Vec::new();
    let mut deliver = |percent: Percent| {
        info!(task = %task.name(), percent, "Task: {}: {percent}%", task.name());
        on_progress(percent);
        received.push(percent);
    };

    match task.completion_mode() {
        CompletionMode::Signal => loop {
            tokio::select! {
                biased;
                Some(percent) = progress.recv() => deliver(percent),
                () = task.wait_finished() => break,
            }
        },
        CompletionMode::Close => {
            while let Some(percent) = progress.recv().await {
                deliver(percent);
            }
        }
    }

    info!(task = %task.name(), "Task: {}: done", task.name());
    ObserverReport {
        task: task.name().to_string(),
        received,
    }
}
