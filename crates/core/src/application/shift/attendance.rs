// Clock-in / clock-out / confirmation

use crate::application::context::EngineContext;
use crate::domain::{Actor, Billing, GeoPoint, Notification, Shift};
use crate::error::Result;
use crate::port::ShiftStoreTransaction;
use chrono::{DateTime, Utc};
use tracing::info;

/// A finished shift and its settlement
#[derive(Debug, Clone)]
pub struct Completion {
    pub shift: Shift,
    pub billing: Billing,
}

pub(super) async fn clock_in(
    ctx: &EngineContext,
    shift_id: &str,
    actor: &Actor,
    location: GeoPoint,
) -> Result<Shift> {
    let mut tx = ctx.store.begin_transaction().await?;
    let mut shift = ctx.load_shift(tx.as_mut(), shift_id).await?;
    shift.clock_in(actor, ctx.now(), location, ctx.config.early_clock_in)?;
    ctx.save_shift(tx.as_mut(), &mut shift).await?;
    tx.commit().await?;

    info!(shift_id = %shift.id, contractor_id = %actor.user_id, "Clocked in");
    ctx.deliver(vec![Notification::started(&shift, &actor.user_id)])
        .await;
    Ok(shift)
}

/// Clock-out and billing, shared by manual and automatic clock-outs.
/// Runs inside the caller's transaction.
pub(crate) async fn finish(
    ctx: &EngineContext,
    tx: &mut dyn ShiftStoreTransaction,
    shift: &mut Shift,
    actor: &Actor,
    now: DateTime<Utc>,
    location: GeoPoint,
) -> Result<Billing> {
    shift.clock_out(actor, now, location)?;
    let billing = ctx
        .billing()
        .bill(shift, ctx.id_provider.generate_id(), actor.user_id.clone(), now)?;
    ctx.save_shift(tx, shift).await?;
    tx.insert_billing(&billing).await?;
    Ok(billing)
}

/// Notices for a completed shift: contractor and hotel manager
pub(crate) fn completion_notices(shift: &Shift, contractor_id: &str, billing: &Billing) -> Vec<Notification> {
    vec![
        Notification::completed(shift, contractor_id, billing),
        Notification::completed(shift, &shift.created_by, billing),
    ]
}

pub(super) async fn clock_out(
    ctx: &EngineContext,
    shift_id: &str,
    actor: &Actor,
    location: GeoPoint,
) -> Result<Completion> {
    let mut tx = ctx.store.begin_transaction().await?;
    let mut shift = ctx.load_shift(tx.as_mut(), shift_id).await?;
    let billing = finish(ctx, tx.as_mut(), &mut shift, actor, ctx.now(), location).await?;
    tx.commit().await?;

    info!(
        shift_id = %shift.id,
        contractor_id = %actor.user_id,
        hours = billing.duration_hours,
        gross = billing.gross,
        "Clocked out"
    );
    ctx.deliver(completion_notices(&shift, &actor.user_id, &billing))
        .await;
    Ok(Completion { shift, billing })
}

pub(super) async fn confirm(ctx: &EngineContext, shift_id: &str, actor: &Actor) -> Result<Shift> {
    let mut tx = ctx.store.begin_transaction().await?;
    let mut shift = ctx.load_shift(tx.as_mut(), shift_id).await?;
    shift.confirm(actor, ctx.now())?;
    ctx.save_shift(tx.as_mut(), &mut shift).await?;
    tx.commit().await?;

    info!(shift_id = %shift.id, confirmed_by = %actor.user_id, "Shift completion confirmed");
    Ok(shift)
}
