// Retry logic for scheduled task delivery
use crate::domain::{ScheduledTask, TaskState};
use crate::port::TimeProvider;
use chrono::Duration;
use std::sync::Arc;
use tracing::{info, warn};

/// Retry decision result
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry the task (with backoff delay in ms)
    Retry(i64),
    /// Do not retry, task has failed permanently
    Failed,
}

/// Retry policy
///
/// Determines if a task should be retried based on:
/// - Attempts already made
/// - Maximum attempts allowed
/// - Backoff factor for exponential delay
pub struct RetryPolicy {
    time_provider: Arc<dyn TimeProvider>,
    base_delay_ms: i64,
}

impl RetryPolicy {
    /// Create a new retry policy
    ///
    /// # Arguments
    /// * `time_provider` - Time provider for current time
    /// * `base_delay_ms` - Base delay in milliseconds (default: 1000)
    pub fn new(time_provider: Arc<dyn TimeProvider>, base_delay_ms: i64) -> Self {
        Self {
            time_provider,
            base_delay_ms,
        }
    }

    /// Decide what happens after a failed delivery.
    ///
    /// `task.attempts` counts deliveries already made, including the one that
    /// just failed.
    ///
    /// Backoff formula:
    /// delay = base_delay * (backoff_factor ^ (attempts - 1)) * (1.0 ± 0.1)
    pub fn should_retry(&self, task: &ScheduledTask) -> RetryDecision {
        if task.attempts >= task.max_attempts {
            warn!(
                task_id = %task.id,
                attempts = %task.attempts,
                max_attempts = %task.max_attempts,
                "Max retry attempts reached"
            );
            return RetryDecision::Failed;
        }

        let exponent = (task.attempts - 1).max(0);
        let base_delay_ms = self.base_delay_ms as f64 * task.backoff_factor.powi(exponent);

        // ±10% jitter, seeded by the task id so it is deterministic per task
        let jitter_seed = task.id.chars().map(|c| c as u32).sum::<u32>();
        let jitter_factor = 0.9 + ((jitter_seed % 21) as f64 / 100.0); // 0.9 to 1.1

        let delay_ms = (base_delay_ms * jitter_factor) as i64;

        info!(
            task_id = %task.id,
            attempt = %task.attempts,
            max_attempts = %task.max_attempts,
            delay_ms = %delay_ms,
            "Scheduling retry"
        );

        RetryDecision::Retry(delay_ms)
    }

    /// Put a task back in the queue `delay_ms` from now
    pub fn prepare_for_retry(&self, task: &mut ScheduledTask, delay_ms: i64, error: &str) {
        task.state = TaskState::Pending;
        task.fire_at = self.time_provider.now() + Duration::milliseconds(delay_ms);
        task.started_at = None;
        task.last_error = Some(error.to_string());

        info!(
            task_id = %task.id,
            attempt = %task.attempts,
            fire_at = %task.fire_at,
            "Task prepared for retry"
        );
    }
}
