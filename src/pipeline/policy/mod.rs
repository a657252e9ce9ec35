
use async_trait::async_trait;
use std::time::Duration;

use crate::config::PipelineApiConfig;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Completed,
    Failed,
    Pending,
}

/// How often to poll, how many times, and which task statuses end the loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    completed: Vec<String>,
    failed: Vec<String>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
            completed: vec!["Completed".to_string(), "Done".to_string()],
            failed: vec!["Error".to_string(), "Failed".to_string()],
        }
    }
}

impl PollPolicy {
    #[inline]
    pub fn from_config(config: &PipelineApiConfig) -> Self {
        Self::default()
            .with_interval(config.poll_interval())
            .with_max_attempts(config.max_poll_attempts)
    }

    #[inline]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[inline]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Replace the task statuses treated as terminal
    #[inline]
    pub fn with_terminal_statuses(mut self, completed: &[&str], failed: &[&str]) -> Self {
        self.completed = completed.iter().map(|s| (*s).to_string()).collect();
        self.failed = failed.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Classify a poll response's task status. A missing status is still pending.
    #[inline]
    pub fn classify(&self, status: Option<&str>) -> PollOutcome {
        match status {
            Some(status) if self.completed.iter().any(|s| s == status) => PollOutcome::Completed,
            Some(status) if self.failed.iter().any(|s| s == status) => PollOutcome::Failed,
            _ => PollOutcome::Pending,
        }
    }
}

/// Waits between polls. Swapped out in tests to avoid real delays.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
