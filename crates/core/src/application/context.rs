// Shared collaborators of the shift services, penalty service and dispatcher

use crate::config::EngineConfig;
use crate::domain::{
    BillingCalculator, DomainError, JobName, Notification, NotificationPreferences,
    ScheduledTask, Shift, TaskId, TaskPayload,
};
use crate::error::{AppError, Result};
use crate::port::{
    AccountService, HotelService, IdProvider, NotificationService, ShiftRepository,
    ShiftStoreTransaction, TimeProvider, TransactionalShiftStore,
};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything a transition needs. Cheap to clone (all handles are `Arc`).
#[derive(Clone)]
pub struct EngineContext {
    pub store: Arc<dyn TransactionalShiftStore>,
    pub shifts: Arc<dyn ShiftRepository>,
    pub accounts: Arc<dyn AccountService>,
    pub hotels: Arc<dyn HotelService>,
    pub notifier: Arc<dyn NotificationService>,
    pub id_provider: Arc<dyn IdProvider>,
    pub time_provider: Arc<dyn TimeProvider>,
    pub config: Arc<EngineConfig>,
}

impl EngineContext {
    pub fn now(&self) -> DateTime<Utc> {
        self.time_provider.now()
    }

    pub fn billing(&self) -> BillingCalculator {
        BillingCalculator::new(self.config.platform_percentage)
    }

    /// Read a shift inside the transaction or fail with NotFound
    pub(crate) async fn load_shift(
        &self,
        tx: &mut dyn ShiftStoreTransaction,
        shift_id: &str,
    ) -> Result<Shift> {
        tx.get_shift(shift_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Shift", shift_id).into())
    }

    /// CAS write; keeps the in-memory version in step with the store
    pub(crate) async fn save_shift(
        &self,
        tx: &mut dyn ShiftStoreTransaction,
        shift: &mut Shift,
    ) -> Result<()> {
        shift.version = tx.update_shift(shift).await?;
        Ok(())
    }

    /// Write a deferred task row into the transition's transaction.
    ///
    /// SEND_REMINDER and REACTIVATE_USER replace older pending tasks of the
    /// same subject. A failed insert fails the transition.
    pub(crate) async fn enqueue(
        &self,
        tx: &mut dyn ShiftStoreTransaction,
        job: JobName,
        entity_id: &str,
        fire_at: DateTime<Utc>,
        payload: TaskPayload,
    ) -> Result<TaskId> {
        let task = ScheduledTask::new(
            self.id_provider.generate_id(),
            job,
            entity_id,
            fire_at,
            payload,
            self.now(),
        )
        .with_retry(self.config.task_max_attempts, self.config.task_backoff_factor);

        if job.supersedes_previous() {
            let superseded = tx
                .supersede_pending(&task.subject_key)
                .await
                .map_err(scheduling_failure)?;
            if superseded > 0 {
                debug!(subject_key = %task.subject_key, superseded, "Superseded pending tasks");
            }
        }

        tx.insert_task(&task).await.map_err(scheduling_failure)?;
        debug!(
            task_id = %task.id,
            job = %job,
            entity_id = %entity_id,
            fire_at = %fire_at,
            "Task scheduled"
        );
        Ok(task.id)
    }

    /// Preferences of a user, falling back to defaults when the account
    /// service does not know them.
    pub(crate) async fn preferences(&self, user_id: &str) -> NotificationPreferences {
        match self.accounts.get(user_id).await {
            Ok(Some(account)) => account.preferences,
            Ok(None) => NotificationPreferences::default(),
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Account lookup failed, using default preferences");
                NotificationPreferences::default()
            }
        }
    }

    /// Post-commit delivery. Manager-facing kinds honour the recipient's opt-ins.
    pub(crate) async fn deliver(&self, notifications: Vec<Notification>) {
        for notification in notifications {
            let prefs = self.preferences(&notification.user_id).await;
            if !notification.kind.manager_opted_in(&prefs) {
                debug!(
                    user_id = %notification.user_id,
                    kind = ?notification.kind,
                    "Notification suppressed by preferences"
                );
                continue;
            }
            self.notifier.notify(notification).await;
        }
    }
}

fn scheduling_failure(e: AppError) -> AppError {
    match e {
        AppError::Scheduling(_) => e,
        other => AppError::Scheduling(other.to_string()),
    }
}
