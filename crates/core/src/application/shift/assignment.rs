// Award / accept / decline

use crate::application::context::EngineContext;
use crate::domain::{
    subject_key, Actor, DomainError, JobName, Notification, Shift, TaskPayload,
};
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::info;

/// Only verified, active contractors can be offered work
pub(super) async fn ensure_verified_contractor(ctx: &EngineContext, contractor_id: &str) -> Result<()> {
    match ctx.accounts.get(contractor_id).await? {
        Some(account) if account.is_verified_contractor() => Ok(()),
        _ => Err(DomainError::not_found("Contractor", contractor_id).into()),
    }
}

pub(super) async fn award(
    ctx: &EngineContext,
    shift_id: &str,
    contractor_id: &str,
    actor: &Actor,
) -> Result<Shift> {
    // Collaborator lookups happen before the transaction is opened
    ensure_verified_contractor(ctx, contractor_id).await?;

    let mut tx = ctx.store.begin_transaction().await?;
    let mut shift = ctx.load_shift(tx.as_mut(), shift_id).await?;
    shift.ensure_owner(actor)?;
    shift.award(contractor_id, ctx.now())?;
    ctx.save_shift(tx.as_mut(), &mut shift).await?;
    tx.commit().await?;

    info!(shift_id = %shift.id, contractor_id = %contractor_id, "Shift awarded");
    ctx.deliver(vec![Notification::awarded(&shift, contractor_id)])
        .await;
    Ok(shift)
}

/// When the reminder should go out: `reminder_hours` before the start, or
/// shortly from now when that instant has already passed.
pub(crate) fn reminder_fire_at(
    scheduled_start: DateTime<Utc>,
    reminder_hours: i64,
    now: DateTime<Utc>,
    fallback: Duration,
) -> DateTime<Utc> {
    let fire_at = scheduled_start - Duration::hours(reminder_hours);
    if fire_at <= now {
        now + fallback
    } else {
        fire_at
    }
}

pub(super) async fn accept(ctx: &EngineContext, shift_id: &str, actor: &Actor) -> Result<Shift> {
    let reminder_hours = match ctx.accounts.get(&actor.user_id).await? {
        Some(account) => account.preferences.reminder_hours,
        None => ctx.config.default_reminder_hours,
    };

    let mut tx = ctx.store.begin_transaction().await?;
    let mut shift = ctx.load_shift(tx.as_mut(), shift_id).await?;
    let now = ctx.now();
    shift.accept(actor, now)?;
    ctx.save_shift(tx.as_mut(), &mut shift).await?;

    let fire_at = reminder_fire_at(
        shift.scheduled_start,
        reminder_hours,
        now,
        ctx.config.reminder_fallback,
    );
    ctx.enqueue(
        tx.as_mut(),
        JobName::SendReminder,
        &shift.id,
        fire_at,
        TaskPayload::new()
            .with("shift_id", shift.id.clone())
            .with("contractor_id", actor.user_id.clone()),
    )
    .await?;
    tx.commit().await?;

    info!(
        shift_id = %shift.id,
        contractor_id = %actor.user_id,
        reminder_at = %fire_at,
        "Shift accepted"
    );
    ctx.deliver(vec![Notification::accepted(&shift, &actor.user_id)])
        .await;
    Ok(shift)
}

pub(super) async fn decline(ctx: &EngineContext, shift_id: &str, actor: &Actor) -> Result<Shift> {
    let mut tx = ctx.store.begin_transaction().await?;
    let mut shift = ctx.load_shift(tx.as_mut(), shift_id).await?;
    shift.decline(actor, ctx.now())?;
    ctx.save_shift(tx.as_mut(), &mut shift).await?;
    tx.supersede_pending(&subject_key(JobName::SendReminder, &shift.id))
        .await?;
    tx.commit().await?;

    info!(shift_id = %shift.id, contractor_id = %actor.user_id, audience = %shift.audience, "Shift declined");
    ctx.deliver(vec![Notification::declined(&shift, &actor.user_id)])
        .await;
    Ok(shift)
}
