// Scheduled Task Domain Model (durable deferred jobs, outbox rows)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Task ID (UUID v4)
pub type TaskId = String;

/// Subject Key (for supersede logic): "{JOB}:{entity_id}"
pub type SubjectKey = String;

/// Named deferred jobs understood by the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobName {
    EnforceClockIn,
    EnforceClockOut,
    SendReminder,
    SuspendUser,
    ReactivateUser,
}

impl JobName {
    pub const ALL: [JobName; 5] = [
        JobName::EnforceClockIn,
        JobName::EnforceClockOut,
        JobName::SendReminder,
        JobName::SuspendUser,
        JobName::ReactivateUser,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobName::EnforceClockIn => "ENFORCE_CLOCK_IN",
            JobName::EnforceClockOut => "ENFORCE_CLOCK_OUT",
            JobName::SendReminder => "SEND_REMINDER",
            JobName::SuspendUser => "SUSPEND_USER",
            JobName::ReactivateUser => "REACTIVATE_USER",
        }
    }

    /// Jobs where a newer schedule replaces older pending ones
    pub fn supersedes_previous(&self) -> bool {
        matches!(
            self,
            JobName::SendReminder | JobName::SuspendUser | JobName::ReactivateUser
        )
    }
}

impl std::fmt::Display for JobName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobName {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        JobName::ALL
            .into_iter()
            .find(|job| job.as_str() == s)
            .ok_or_else(|| format!("unknown job name: {}", s))
    }
}

/// Task State
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    Running,
    Delivered,
    Failed,
    Superseded,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Pending => write!(f, "PENDING"),
            TaskState::Running => write!(f, "RUNNING"),
            TaskState::Delivered => write!(f, "DELIVERED"),
            TaskState::Failed => write!(f, "FAILED"),
            TaskState::Superseded => write!(f, "SUPERSEDED"),
        }
    }
}

impl std::str::FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TaskState::Pending),
            "RUNNING" => Ok(TaskState::Running),
            "DELIVERED" => Ok(TaskState::Delivered),
            "FAILED" => Ok(TaskState::Failed),
            "SUPERSEDED" => Ok(TaskState::Superseded),
            other => Err(format!("unknown task state: {}", other)),
        }
    }
}

/// Small key/value payload. Handlers only trust immutable identifiers from
/// it; everything else is re-read from the store when the task fires.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskPayload(BTreeMap<String, String>);

impl TaskPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn subject_key(job: JobName, entity_id: &str) -> SubjectKey {
    format!("{}:{}", job, entity_id)
}

/// Scheduled Task Entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledTask {
    pub id: TaskId,
    pub job: JobName,
    /// Shift id, or user id for SUSPEND_USER and REACTIVATE_USER
    pub entity_id: String,
    pub subject_key: SubjectKey,
    pub fire_at: DateTime<Utc>,
    pub payload: TaskPayload,
    pub state: TaskState,

    // Retry
    pub attempts: i32,
    pub max_attempts: i32,
    pub backoff_factor: f64,
    pub last_error: Option<String>,

    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl ScheduledTask {
    /// Create a new pending task
    ///
    /// # Arguments
    ///
    /// * `id` - Unique task ID (injected, not generated)
    /// * `job` - Job to run
    /// * `entity_id` - Entity the job re-validates when it fires
    /// * `fire_at` - Earliest delivery instant
    /// * `payload` - Immutable identifiers captured at scheduling time
    /// * `created_at` - Creation timestamp (injected, not system time)
    pub fn new(
        id: impl Into<String>,
        job: JobName,
        entity_id: impl Into<String>,
        fire_at: DateTime<Utc>,
        payload: TaskPayload,
        created_at: DateTime<Utc>,
    ) -> Self {
        let entity_id = entity_id.into();
        Self {
            id: id.into(),
            job,
            subject_key: subject_key(job, &entity_id),
            entity_id,
            fire_at,
            payload,
            state: TaskState::Pending,
            attempts: 0,
            max_attempts: 3,
            backoff_factor: 2.0,
            last_error: None,
            created_at,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn with_retry(mut self, max_attempts: i32, backoff_factor: f64) -> Self {
        self.max_attempts = max_attempts;
        self.backoff_factor = backoff_factor;
        self
    }

    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        now >= self.fire_at
    }

    /// The "delivered flag"
    pub fn is_delivered(&self) -> bool {
        self.state == TaskState::Delivered
    }
}
