// Scheduled Task Repository Port (Interface)

use crate::domain::{ScheduledTask, TaskState};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Repository interface used by the dispatcher and recovery
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Find task by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<ScheduledTask>>;

    /// Persist state, attempts, fire_at, error and timestamps, but only while
    /// the stored row is still in `expected` state.
    ///
    /// Returns false when the row moved on (e.g. it was superseded or
    /// requeued meanwhile); fails with NotFound when it does not exist.
    async fn update(&self, task: &ScheduledTask, expected: TaskState) -> Result<bool>;

    /// Claim one specific task for delivery (PENDING or DELIVERED -> RUNNING)
    /// if it is due. None when the task is in any other state or not due.
    async fn claim(&self, id: &str, now: DateTime<Utc>) -> Result<Option<ScheduledTask>>;

    /// Atomically claim the earliest due PENDING task (PENDING -> RUNNING).
    ///
    /// Ordered by fire_at, then creation time, then id.
    async fn claim_next(&self, now: DateTime<Utc>) -> Result<Option<ScheduledTask>>;

    /// Find all tasks by state (for recovery)
    async fn find_by_state(&self, state: TaskState) -> Result<Vec<ScheduledTask>>;

    /// All tasks of a subject ("{JOB}:{entity}"), oldest first
    async fn find_by_subject(&self, subject_key: &str) -> Result<Vec<ScheduledTask>>;

    /// Earliest fire_at among PENDING tasks
    async fn next_fire_at(&self) -> Result<Option<DateTime<Utc>>>;
}
