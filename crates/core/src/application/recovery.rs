// Crash recovery logic
use crate::domain::TaskState;
use crate::port::{TaskRepository, TimeProvider};
use chrono::Duration;
use std::sync::Arc;
use tracing::{info, warn};

use crate::application::dispatcher::constants::DEFAULT_RECOVERY_WINDOW_MS;

/// Crash recovery service
///
/// On daemon startup, returns tasks that were RUNNING when the daemon died
/// to PENDING. Every handler re-validates state, so re-delivery is safe.
pub struct RecoveryService {
    task_repo: Arc<dyn TaskRepository>,
    time_provider: Arc<dyn TimeProvider>,
    recovery_window_ms: i64,
}

impl RecoveryService {
    /// Create a new recovery service
    ///
    /// # Arguments
    /// * `task_repo` - Task repository
    /// * `time_provider` - Time provider
    /// * `recovery_window_ms` - Optional custom recovery window (default: 5 minutes)
    pub fn new(
        task_repo: Arc<dyn TaskRepository>,
        time_provider: Arc<dyn TimeProvider>,
        recovery_window_ms: Option<i64>,
    ) -> Self {
        Self {
            task_repo,
            time_provider,
            recovery_window_ms: recovery_window_ms.unwrap_or(DEFAULT_RECOVERY_WINDOW_MS),
        }
    }

    /// Requeue RUNNING tasks claimed before `now - recovery_window`.
    ///
    /// # Returns
    /// Number of tasks recovered
    pub async fn recover_orphaned_tasks(&self) -> crate::error::Result<usize> {
        let now = self.time_provider.now();
        let cutoff = now - Duration::milliseconds(self.recovery_window_ms);

        info!(
            cutoff_time = %cutoff,
            recovery_window_ms = %self.recovery_window_ms,
            "Starting orphaned task recovery"
        );

        let running = self.task_repo.find_by_state(TaskState::Running).await?;
        let mut recovered_count = 0;

        for mut task in running {
            match task.started_at {
                Some(started_at) if started_at >= cutoff => continue,
                Some(started_at) => {
                    info!(
                        task_id = %task.id,
                        job = %task.job,
                        started_at = %started_at,
                        "Recovering orphaned task"
                    );
                }
                None => {
                    warn!(task_id = %task.id, "RUNNING task without started_at, requeuing");
                }
            }

            task.state = TaskState::Pending;
            task.started_at = None;
            if self.task_repo.update(&task, TaskState::Running).await? {
                recovered_count += 1;
            }
        }

        info!(recovered_count = %recovered_count, "Orphaned task recovery complete");
        Ok(recovered_count)
    }
}
