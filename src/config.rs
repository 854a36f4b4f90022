//! Configuration for progress tasks.
//!
//! Loads settings from config files and environment variables.

use crate::task::{CompletionMode, TaskOptions};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Progress task settings loaded from env/files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSettings {
    /// Pause after each progress emission (milliseconds)
    #[serde(rename = "progress_step_interval_ms")]
    pub step_interval_ms: u64,

    /// Completion protocol: `signal` or `close`
    #[serde(rename = "progress_completion_mode")]
    pub completion_mode: CompletionMode,

    /// Observer attach delay for the delayed-attach demo (milliseconds)
    #[serde(rename = "progress_delayed_attach_ms")]
    pub delayed_attach_ms: u64,
    /// Observer attach delay for the late-attach demo (milliseconds)
    #[serde(rename = "progress_late_attach_ms")]
    pub late_attach_ms: u64,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            step_interval_ms: 50,
            completion_mode: CompletionMode::default(),
            delayed_attach_ms: 200,
            late_attach_ms: 1000,
        }
    }
}

impl TaskSettings {
    /// Load settings from config files and environment variables.
    ///
    /// Priority: env vars → config files → defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let builder = Config::builder()
            .set_default("progress_step_interval_ms", defaults.step_interval_ms)
            .and_then(|b| {
                b.set_default(
                    "progress_completion_mode",
                    defaults.completion_mode.as_str(),
                )
            })
            .and_then(|b| b.set_default("progress_delayed_attach_ms", defaults.delayed_attach_ms))
            .and_then(|b| b.set_default("progress_late_attach_ms", defaults.late_attach_ms))
            .map(|b| {
                b.add_source(File::with_name("config/default").required(false))
                    .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
                    .add_source(File::with_name("config/local").required(false))
                    .add_source(Environment::default().ignore_empty(true))
            });

        let config = match builder {
            Ok(builder) => builder.build(),
            Err(err) => return Self::warn_and_default(err),
        };

        match config.and_then(Config::try_deserialize) {
            Ok(settings) => settings,
            Err(err) => Self::warn_and_default(err),
        }
    }

    /// Pacing interval as a `Duration`.
    #[must_use]
    pub const fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_interval_ms)
    }

    /// Delay before the delayed-attach demo observer attaches.
    #[must_use]
    pub const fn delayed_attach(&self) -> Duration {
        Duration::from_millis(self.delayed_attach_ms)
    }

    /// Delay before the late-attach demo observer attaches.
    #[must_use]
    pub const fn late_attach(&self) -> Duration {
        Duration::from_millis(self.late_attach_ms)
    }

    /// Task options derived from these settings.
    #[must_use]
    pub fn task_options(&self) -> TaskOptions {
        TaskOptions::default()
            .with_step_interval(self.step_interval())
            .with_completion(self.completion_mode)
    }

    fn warn_and_default(err: ConfigError) -> Self {
        warn!(error = %err, "Failed to load progress task config, using defaults");
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    // Single test touching the environment to avoid races between tests.
    #[test]
    fn env_overrides_defaults() {
        let defaults = TaskSettings::from_env();
        assert_eq!(defaults, TaskSettings::default());

        env::set_var("PROGRESS_STEP_INTERVAL_MS", "5");
        env::set_var("PROGRESS_COMPLETION_MODE", "signal");

        let settings = TaskSettings::from_env();
        assert_eq!(settings.step_interval_ms, 5);
        assert_eq!(settings.completion_mode, CompletionMode::Signal);
        assert_eq!(settings.delayed_attach_ms, 200);

        // Unknown modes fall back to defaults instead of failing.
        env::set_var("PROGRESS_COMPLETION_MODE", "broadcast");
        assert_eq!(TaskSettings::from_env(), TaskSettings::default());

        env::remove_var("PROGRESS_STEP_INTERVAL_MS");
        env::remove_var("PROGRESS_COMPLETION_MODE");
    }

    #[test]
    fn task_options_follow_settings() {
        let settings = TaskSettings {
            step_interval_ms: 7,
            completion_mode: CompletionMode::Signal,
            ..TaskSettings::default()
        };

        let options = settings.task_options();
        assert_eq!(options.step_interval, Duration::from_millis(7));
        assert_eq!(options.completion, CompletionMode::Signal);
    }
}
