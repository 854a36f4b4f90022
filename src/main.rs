use anyhow::{Context, Result};
use dotenvy::dotenv;
use progress_task::{observe, ObserverReport, ProgressTask, TaskSettings};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

/// When the demo observer attaches to its task.
#[derive(Debug, Clone, Copy)]
enum Attach {
    /// Right after the task is launched.
    Immediately,
    /// After a fixed delay.
    After(Duration),
    /// Never; the caller only waits for completion.
    Never,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    init_logging();

    let settings = TaskSettings::from_env();
    info!(
        step_interval_ms = settings.step_interval_ms,
        mode = %settings.completion_mode,
        "Configuration loaded"
    );

    // Observer attaches before the first emission and sees 0..=100.
    run_scenario(&settings, "A", Attach::Immediately).await?;
    // Observer attaches mid-run; earlier values are dropped.
    run_scenario(&settings, "B", Attach::After(settings.delayed_attach())).await?;
    // Observer attaches after the task is done and sees nothing.
    run_scenario(&settings, "C", Attach::After(settings.late_attach())).await?;
    // Nobody observes; the task must still run to completion.
    run_scenario(&settings, "D", Attach::Never).await?;

    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run_scenario(settings: &TaskSettings, name: &str, attach: Attach) -> Result<()> {
    let task = Arc::new(ProgressTask::with_options(name, settings.task_options()));
    let handle = if matches!(attach, Attach::Immediately) {
        task.spawn_observed().1
    } else {
        task.spawn()
    };

    let report = match attach {
        Attach::Immediately => Some(observe(&task, |_| {}).await),
        Attach::After(delay) => {
            tokio::time::sleep(delay).await;
            Some(observe(&task, |_| {}).await)
        }
        Attach::Never => {
            task.wait_finished().await;
            None
        }
    };

    let outcome = handle
        .await
        .with_context(|| format!("task {name} panicked"))?
        .with_context(|| format!("task {name} failed"))?;

    let received = report.as_ref().map_or(0, |r: &ObserverReport| r.received.len());
    info!(
        task = name,
        emitted = outcome.emitted,
        delivered = outcome.delivered,
        received,
        "Scenario finished"
    );
    Ok(())
}
