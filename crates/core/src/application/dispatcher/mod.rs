// Task Dispatcher - durable, at-least-once deferred execution

pub mod constants;
mod handlers;
mod shutdown;

use constants::*;
pub use handlers::HandlerOutcome;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::context::EngineContext;
use crate::application::retry::{RetryDecision, RetryPolicy};
use crate::domain::{DomainError, JobName, ScheduledTask, TaskId, TaskPayload, TaskState};
use crate::error::Result;
use crate::port::TaskRepository;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireOutcome {
    /// Handler mutated state or notified someone
    Applied,
    /// Handler found its precondition already false
    NoOp(String),
    /// `fire_at` is still in the future; nothing was run
    NotDue(DateTime<Utc>),
    /// Task is SUPERSEDED or FAILED; nothing was run
    Skipped(TaskState),
    /// Handler failed; task requeued for a later attempt
    Retrying { attempt: i32, fire_at: DateTime<Utc> },
    /// Handler failed for the last time (or panicked)
    Failed(String),
}

impl From<HandlerOutcome> for FireOutcome {
    fn from(outcome: HandlerOutcome) -> Self {
        match outcome {
            HandlerOutcome::Applied => FireOutcome::Applied,
            HandlerOutcome::NoOp(reason) => FireOutcome::NoOp(reason),
        }
    }
}

pub struct TaskDispatcher {
    ctx: EngineContext,
    task_repo: Arc<dyn TaskRepository>,
    retry_policy: RetryPolicy,
    poll_interval: Duration,
}

impl TaskDispatcher {
    pub fn new(ctx: EngineContext, task_repo: Arc<dyn TaskRepository>) -> Self {
        let retry_policy = RetryPolicy::new(ctx.time_provider.clone(), DEFAULT_RETRY_BASE_DELAY_MS);
        Self {
            ctx,
            task_repo,
            retry_policy,
            poll_interval: IDLE_SLEEP_DURATION,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_retry_base_delay(mut self, base_delay_ms: i64) -> Self {
        self.retry_policy = RetryPolicy::new(self.ctx.time_provider.clone(), base_delay_ms);
        self
    }

    /// Persist a task on its own (outside any shift transition)
    pub async fn schedule(
        &self,
        job: JobName,
        entity_id: &str,
        fire_at: DateTime<Utc>,
        payload: TaskPayload,
    ) -> Result<TaskId> {
        let mut tx = self.ctx.store.begin_transaction().await?;
        let task_id = self
            .ctx
            .enqueue(tx.as_mut(), job, entity_id, fire_at, payload)
            .await?;
        tx.commit().await?;
        Ok(task_id)
    }

    /// Deliver one specific task, as a timer or queue runtime would.
    ///
    /// A DELIVERED task is delivered again: consumers are idempotent.
    pub async fn on_fire(&self, task_id: &str) -> Result<FireOutcome> {
        let task = self.find_task(task_id).await?;

        if matches!(task.state, TaskState::Superseded | TaskState::Failed) {
            info!(task_id = %task.id, state = %task.state, "Task not deliverable, skipped");
            return Ok(FireOutcome::Skipped(task.state));
        }
        let now = self.ctx.now();
        if !task.is_due(now) {
            return Ok(FireOutcome::NotDue(task.fire_at));
        }

        // The row may have moved on since it was read
        let Some(task) = self.task_repo.claim(task_id, now).await? else {
            let current = self.find_task(task_id).await?;
            info!(task_id = %current.id, state = %current.state, "Task changed state before delivery, skipped");
            return Ok(FireOutcome::Skipped(current.state));
        };
        self.deliver(task).await
    }

    async fn find_task(&self, task_id: &str) -> Result<ScheduledTask> {
        self.task_repo
            .find_by_id(task_id)
            .await?
            .ok_or_else(|| DomainError::not_found("ScheduledTask", task_id).into())
    }

    /// Claim and deliver the earliest due task (returns true if one ran)
    pub async fn process_next_task(&self) -> Result<bool> {
        let now = self.ctx.now();
        let Some(task) = self.task_repo.claim_next(now).await? else {
            return Ok(false);
        };
        self.deliver(task).await?;
        Ok(true)
    }

    /// Deliver every task due now; returns how many ran
    pub async fn drain_due(&self) -> Result<usize> {
        let mut delivered = 0;
        while self.process_next_task().await? {
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Run dispatcher loop with graceful shutdown support
    pub async fn run(&self, mut shutdown: ShutdownToken) -> Result<()> {
        info!(poll_interval_ms = self.poll_interval.as_millis() as u64, "Dispatcher started");
        loop {
            if shutdown.is_shutdown() {
                info!("Dispatcher shutting down");
                break;
            }
            match self.process_next_task().await {
                Ok(true) => {}
                Ok(false) => {
                    tokio::select! {
                        _ = sleep(self.poll_interval) => {},
                        _ = shutdown.wait() => {
                            info!("Dispatcher interrupted during idle");
                            break;
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "Dispatcher error");
                    tokio::select! {
                        _ = sleep(ERROR_RECOVERY_SLEEP_DURATION) => {},
                        _ = shutdown.wait() => {
                            info!("Dispatcher interrupted during error recovery");
                            break;
                        }
                    }
                }
            }
        }
        info!("Dispatcher stopped");
        Ok(())
    }

    /// Run the handler of a RUNNING task and record the result.
    async fn deliver(&self, mut task: ScheduledTask) -> Result<FireOutcome> {
        task.attempts += 1;
        info!(task_id = %task.id, job = %task.job, entity_id = %task.entity_id, attempt = task.attempts, "Delivering task");

        // Handler panics must not kill the dispatcher
        let ctx = self.ctx.clone();
        let task_for_exec = task.clone();
        let handle = tokio::task::spawn(async move { handlers::handle(&ctx, &task_for_exec).await });
        let execution_result = handle.await;
        let now = self.ctx.now();

        let outcome = match execution_result {
            Ok(Ok(outcome)) => {
                task.state = TaskState::Delivered;
                task.finished_at = Some(now);
                task.last_error = None;
                info!(task_id = %task.id, job = %task.job, outcome = ?outcome, "Task delivered");
                FireOutcome::from(outcome)
            }
            Ok(Err(e)) => match self.retry_policy.should_retry(&task) {
                RetryDecision::Retry(delay_ms) => {
                    warn!(task_id = %task.id, job = %task.job, error = %e, "Task failed, will retry");
                    self.retry_policy
                        .prepare_for_retry(&mut task, delay_ms, &e.to_string());
                    FireOutcome::Retrying {
                        attempt: task.attempts,
                        fire_at: task.fire_at,
                    }
                }
                RetryDecision::Failed => {
                    error!(task_id = %task.id, job = %task.job, error = %e, "Task failed after max retries");
                    task.state = TaskState::Failed;
                    task.finished_at = Some(now);
                    task.last_error = Some(e.to_string());
                    FireOutcome::Failed(e.to_string())
                }
            },
            Err(join_err) => {
                let reason = if join_err.is_panic() {
                    "handler panicked".to_string()
                } else {
                    "handler cancelled".to_string()
                };
                error!(task_id = %task.id, job = %task.job, error = ?join_err, "{}", reason);
                task.state = TaskState::Failed;
                task.finished_at = Some(now);
                task.last_error = Some(reason.clone());
                FireOutcome::Failed(reason)
            }
        };

        if !self.task_repo.update(&task, TaskState::Running).await? {
            warn!(task_id = %task.id, job = %task.job, "Task changed state while running, result not recorded");
        }
        Ok(outcome)
    }
}
