// Job handlers
//
// Each handler re-reads the entity and re-checks the condition that
// justified scheduling it. Only immutable ids are taken from the payload.

use crate::application::context::EngineContext;
use crate::application::penalty::PenaltyService;
use crate::application::shift::attendance;
use crate::domain::{
    subject_key, Actor, GeoPoint, JobName, Notification, ScheduledTask, ShiftStatus,
};
use crate::error::{AppError, Result};
use tracing::{info, warn};

/// What a delivered job did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// The job mutated state or sent something
    Applied,
    /// The triggering condition no longer holds
    NoOp(String),
}

pub(super) async fn handle(ctx: &EngineContext, task: &ScheduledTask) -> Result<HandlerOutcome> {
    match task.job {
        JobName::EnforceClockIn => enforce_clock_in(ctx, &task.entity_id).await,
        JobName::EnforceClockOut => enforce_clock_out(ctx, &task.entity_id).await,
        JobName::SendReminder => {
            let contractor_id = task.payload.get("contractor_id").ok_or_else(|| {
                AppError::Validation(format!("task {} has no contractor_id", task.id))
            })?;
            send_reminder(ctx, &task.entity_id, contractor_id).await
        }
        JobName::SuspendUser => suspend_user(ctx, &task.entity_id).await,
        JobName::ReactivateUser => reactivate_user(ctx, &task.entity_id).await,
    }
}

fn no_op(job: JobName, entity_id: &str, reason: impl Into<String>) -> HandlerOutcome {
    let reason = reason.into();
    info!(job = %job, entity_id = %entity_id, reason = %reason, "Job no-op");
    HandlerOutcome::NoOp(reason)
}

/// Shift not started on time: rescind the offer and withdraw the shift
async fn enforce_clock_in(ctx: &EngineContext, shift_id: &str) -> Result<HandlerOutcome> {
    let job = JobName::EnforceClockIn;
    let mut tx = ctx.store.begin_transaction().await?;
    let Some(mut shift) = tx.get_shift(shift_id).await? else {
        return Ok(no_op(job, shift_id, "shift not found"));
    };
    if !shift.awaits_rescind() {
        return Ok(no_op(
            job,
            shift_id,
            format!("shift is {} (active={})", shift.status, shift.active),
        ));
    }

    let previous = shift.rescind(ctx.now())?;
    ctx.save_shift(tx.as_mut(), &mut shift).await?;
    tx.supersede_pending(&subject_key(JobName::SendReminder, &shift.id))
        .await?;
    tx.commit().await?;

    warn!(shift_id = %shift.id, contractor_id = ?previous, "Shift not started on time, offer rescinded");
    if let Some(contractor_id) = previous {
        ctx.deliver(vec![
            Notification::rescinded(&shift, &contractor_id),
            Notification::rescinded(&shift, &shift.created_by),
        ])
        .await;
    }
    Ok(HandlerOutcome::Applied)
}

/// Contractor forgot to clock out: automatic clock-out at zeroed location
async fn enforce_clock_out(ctx: &EngineContext, shift_id: &str) -> Result<HandlerOutcome> {
    let job = JobName::EnforceClockOut;
    let mut tx = ctx.store.begin_transaction().await?;
    let Some(mut shift) = tx.get_shift(shift_id).await? else {
        return Ok(no_op(job, shift_id, "shift not found"));
    };
    let contractor_id = match (&shift.status, &shift.contractor_id) {
        (ShiftStatus::Ongoing, Some(contractor_id)) => contractor_id.clone(),
        (ShiftStatus::Accepted, _) => {
            warn!(shift_id = %shift_id, "Accepted shift reached its end without a clock-in");
            return Ok(no_op(job, shift_id, "shift never started"));
        }
        (status, contractor) => {
            return Ok(no_op(
                job,
                shift_id,
                format!("shift is {} (contractor={:?})", status, contractor),
            ))
        }
    };

    let actor = Actor::contractor(contractor_id.clone());
    let billing = attendance::finish(
        ctx,
        tx.as_mut(),
        &mut shift,
        &actor,
        ctx.now(),
        GeoPoint::ZERO,
    )
    .await?;
    tx.commit().await?;

    info!(
        shift_id = %shift.id,
        contractor_id = %contractor_id,
        hours = billing.duration_hours,
        "Automatic clock-out"
    );
    let mut notices = attendance::completion_notices(&shift, &contractor_id, &billing);
    notices.push(Notification::rate_hotel(&shift, &contractor_id));
    ctx.deliver(notices).await;
    Ok(HandlerOutcome::Applied)
}

async fn send_reminder(ctx: &EngineContext, shift_id: &str, contractor_id: &str) -> Result<HandlerOutcome> {
    let job = JobName::SendReminder;
    let Some(shift) = ctx.shifts.find_by_id(shift_id).await? else {
        return Ok(no_op(job, shift_id, "shift not found"));
    };
    if !matches!(shift.status, ShiftStatus::Accepted | ShiftStatus::Ongoing) {
        return Ok(no_op(job, shift_id, format!("shift is {}", shift.status)));
    }
    if !shift.is_assigned_to(contractor_id) {
        return Ok(no_op(job, shift_id, "contractor reassigned"));
    }

    ctx.deliver(vec![Notification::reminder(&shift, contractor_id)])
        .await;
    Ok(HandlerOutcome::Applied)
}

/// Finish a suspension the cancel path could not apply
async fn suspend_user(ctx: &EngineContext, user_id: &str) -> Result<HandlerOutcome> {
    PenaltyService::new(ctx.clone()).suspend(user_id).await?;
    Ok(HandlerOutcome::Applied)
}

async fn reactivate_user(ctx: &EngineContext, user_id: &str) -> Result<HandlerOutcome> {
    let penalties = PenaltyService::new(ctx.clone());
    if penalties.reactivate(user_id).await? {
        Ok(HandlerOutcome::Applied)
    } else {
        Ok(no_op(JobName::ReactivateUser, user_id, "account already active"))
    }
}
