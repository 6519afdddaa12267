// Cancellation Penalty Service
//
// assess_and_apply runs inside the cancel transaction (history read and
// suspension/reactivation outbox rows); enforce runs after commit (account
// calls and notices). A suspension that fails after commit is finished by
// its SUSPEND_USER job.

use crate::application::context::EngineContext;
use crate::domain::{
    subject_key, CancellationRecord, DomainError, JobName, Notification, PenaltyAssessment,
    PenaltyPreview, PenaltyTier, TaskPayload,
};
use crate::error::Result;
use crate::port::ShiftStoreTransaction;
use chrono::{DateTime, Utc};
use tracing::{error, info, warn};

pub struct PenaltyService {
    ctx: EngineContext,
}

impl PenaltyService {
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// Evaluate the ladder for a cancellation that was just inserted in `tx`
    /// for a shift starting at `shift_start`.
    ///
    /// Only a late cancellation can trigger the ladder. Every suspending tier
    /// schedules SUSPEND_USER due now. A timed suspension also schedules
    /// REACTIVATE_USER (superseding older ones); an indefinite one supersedes
    /// any pending reactivation.
    pub async fn assess_and_apply(
        &self,
        tx: &mut dyn ShiftStoreTransaction,
        user_id: &str,
        shift_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<PenaltyAssessment> {
        let policy = &self.ctx.config.penalty;
        let history = tx.cancellation_history(user_id).await?;

        if !policy.is_late(&CancellationRecord::new(now, shift_start)) {
            let late_count = policy.late_cancellations(&history).len();
            info!(user_id = %user_id, late_count, "Cancellation outside the late window, no penalty");
            return Ok(PenaltyAssessment {
                late_count,
                tier: PenaltyTier::NoAction,
            });
        }

        let assessment = policy.assess(&history, now);
        if assessment.tier.suspends() {
            self.ctx
                .enqueue(
                    tx,
                    JobName::SuspendUser,
                    user_id,
                    now,
                    TaskPayload::new().with("user_id", user_id),
                )
                .await?;
        }
        match assessment.tier.reactivate_after() {
            Some(after) => {
                self.ctx
                    .enqueue(
                        tx,
                        JobName::ReactivateUser,
                        user_id,
                        now + after,
                        TaskPayload::new().with("user_id", user_id),
                    )
                    .await?;
            }
            None if assessment.tier.is_indefinite() => {
                tx.supersede_pending(&subject_key(JobName::ReactivateUser, user_id))
                    .await?;
            }
            None => {}
        }

        info!(
            user_id = %user_id,
            late_count = assessment.late_count,
            tier = ?assessment.tier,
            "Penalty assessed"
        );
        Ok(assessment)
    }

    /// Apply a committed assessment: suspend when required and tell the actor.
    ///
    /// Never fails. When the account service refuses the suspension the
    /// pending SUSPEND_USER job retries it; on success that job is superseded.
    pub async fn enforce(&self, user_id: &str, assessment: &PenaltyAssessment) {
        if assessment.tier.suspends() {
            match self.suspend(user_id).await {
                Ok(()) => {
                    if let Err(e) = self.settle_suspension(user_id).await {
                        warn!(user_id = %user_id, error = %e, "Could not retire SUSPEND_USER job, it will re-apply the suspension");
                    }
                }
                Err(e) => {
                    error!(user_id = %user_id, error = %e, "Suspension failed, left to the SUSPEND_USER job");
                }
            }
        }
        if let Some((title, message)) = assessment.tier.notice(assessment.late_count) {
            self.ctx
                .deliver(vec![Notification::penalty(user_id, title, message)])
                .await;
        }
    }

    async fn settle_suspension(&self, user_id: &str) -> Result<()> {
        let mut tx = self.ctx.store.begin_transaction().await?;
        tx.supersede_pending(&subject_key(JobName::SuspendUser, user_id))
            .await?;
        tx.commit().await
    }

    /// Shared suspension primitive: deactivate, unverify, kill sessions.
    /// Every write is safe to repeat.
    pub async fn suspend(&self, user_id: &str) -> Result<()> {
        self.ctx.accounts.set_active(user_id, false).await?;
        self.ctx.accounts.set_verified(user_id, false).await?;
        self.ctx.accounts.invalidate_sessions(user_id).await?;
        warn!(user_id = %user_id, "Account suspended");
        Ok(())
    }

    /// Lift a suspension. Returns false when the account was already active
    /// and verified; otherwise applies whichever of the two writes is missing.
    pub async fn reactivate(&self, user_id: &str) -> Result<bool> {
        let account = self
            .ctx
            .accounts
            .get(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Account", user_id))?;
        if account.active && account.verified {
            info!(user_id = %user_id, "Account already active, reactivation skipped");
            return Ok(false);
        }
        if !account.active {
            self.ctx.accounts.set_active(user_id, true).await?;
        }
        if !account.verified {
            self.ctx.accounts.set_verified(user_id, true).await?;
        }
        info!(user_id = %user_id, "Account reactivated");
        Ok(true)
    }

    /// Consequence of `user_id` cancelling `shift_id` now. Read-only.
    pub async fn preview(&self, user_id: &str, shift_id: &str) -> Result<PenaltyPreview> {
        let shift = self
            .ctx
            .shifts
            .find_by_id(shift_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Shift", shift_id))?;
        let history = self.ctx.shifts.cancellation_history(user_id).await?;
        Ok(self
            .ctx
            .config
            .penalty
            .preview(&history, shift.scheduled_start, self.ctx.now()))
    }
}
