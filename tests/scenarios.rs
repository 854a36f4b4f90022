use progress_task::task::progress_steps;
use progress_task::{observe, CompletionMode, ObserverReport, Percent, ProgressTask, TaskOptions};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};

const MODES: [CompletionMode; 2] = [CompletionMode::Signal, CompletionMode::Close];

fn task(name: &str, mode: CompletionMode, step_ms: u64) -> Arc<ProgressTask> {
    let options = TaskOptions::default()
        .with_step_interval(Duration::from_millis(step_ms))
        .with_completion(mode);
    Arc::new(ProgressTask::with_options(name, options))
}

async fn observe_with_deadline(task: &ProgressTask) -> ObserverReport {
    match timeout(Duration::from_secs(5), observe(task, |_| {})).await {
        Ok(report) => report,
        Err(_) => panic!("observer of {} never terminated", task.name()),
    }
}

fn all_steps() -> Vec<Percent> {
    progress_steps().collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn scenario_a_immediate_observer_sees_everything() {
    for mode in MODES {
        for _ in 0..50 {
            let task = task("A", mode, 1);
            let (progress, handle) = task.spawn_observed();

            let report = observe_with_deadline(&task).await;

            assert_eq!(report.received, all_steps(), "mode {mode}");
            assert_eq!(progress, task.observe_progress());
            match handle.await {
                Ok(Ok(outcome)) => {
                    assert_eq!(outcome.delivered, 11);
                    assert_eq!(outcome.dropped(), 0);
                }
                other => panic!("task A failed: {other:?}"),
            }
        }
    }
}

#[tokio::test]
async fn early_attach_before_launch_receives_all_values() {
    for mode in MODES {
        let task = task("P5", mode, 1);
        let _ = task.observe_progress();
        let handle = task.spawn();

        let report = observe_with_deadline(&task).await;

        assert_eq!(report.received, all_steps(), "mode {mode}");
        assert!(handle.await.is_ok());
    }
}

#[tokio::test]
async fn scenario_b_delayed_observer_misses_early_values() {
    for mode in MODES {
        let task = task("B", mode, 20);
        let handle = task.spawn();

        sleep(Duration::from_millis(80)).await;
        let report = observe_with_deadline(&task).await;

        let Some(&first) = report.received.first() else {
            panic!("delayed observer received nothing in mode {mode}");
        };
        assert!(first > 0, "value 0 must have been dropped (mode {mode})");
        let expected: Vec<Percent> = progress_steps().filter(|p| *p >= first).collect();
        assert_eq!(report.received, expected, "gap after attach (mode {mode})");

        match handle.await {
            Ok(Ok(outcome)) => {
                assert_eq!(outcome.emitted, 11);
                assert_eq!(outcome.delivered, report.received.len());
            }
            other => panic!("task B failed: {other:?}"),
        }
    }
}

#[tokio::test]
async fn scenario_c_late_observer_terminates_without_values() {
    for mode in MODES {
        let task = task("C", mode, 1);
        let handle = task.spawn();

        match timeout(Duration::from_secs(2), task.wait_finished()).await {
            Ok(()) => {}
            Err(_) => panic!("task C never finished (mode {mode})"),
        }
        assert!(handle.await.is_ok());

        let report = observe_with_deadline(&task).await;
        assert!(report.received.is_empty(), "mode {mode}: {report:?}");

        if mode == CompletionMode::Close {
            assert!(task.observe_progress().is_closed());
        }
    }
}

#[tokio::test]
async fn scenario_c_after_sleeping_past_total_runtime() {
    for mode in MODES {
        let task = task("C-sleep", mode, 1);
        let handle = task.spawn();

        sleep(Duration::from_millis(200)).await;
        let report = observe_with_deadline(&task).await;

        assert!(report.received.is_empty(), "mode {mode}: {report:?}");
        assert!(handle.await.is_ok());
    }
}
