// Cancel Shift Use Case (+ cancellation reason edits)

use crate::application::context::EngineContext;
use crate::application::penalty::PenaltyService;
use crate::domain::{
    subject_key, Actor, DomainError, JobName, Notification, Role, ShiftCancellation,
};
use crate::error::Result;
use tracing::info;

/// Release the shift, record the cancellation and run the penalty ladder,
/// all in one transaction so the history read sees the new row.
pub(super) async fn execute(
    ctx: &EngineContext,
    penalties: &PenaltyService,
    shift_id: &str,
    actor: &Actor,
    reason: Option<String>,
) -> Result<ShiftCancellation> {
    let now = ctx.now();

    let mut tx = ctx.store.begin_transaction().await?;
    let mut shift = ctx.load_shift(tx.as_mut(), shift_id).await?;
    let previous = shift.release(actor, now)?;
    ctx.save_shift(tx.as_mut(), &mut shift).await?;
    tx.supersede_pending(&subject_key(JobName::SendReminder, &shift.id))
        .await?;

    let cancellation = ShiftCancellation::new(
        ctx.id_provider.generate_id(),
        shift.id.clone(),
        actor.user_id.clone(),
        reason,
        now,
    );
    tx.insert_cancellation(&cancellation).await?;

    let assessment = if actor.role == Role::Contractor {
        Some(
            penalties
                .assess_and_apply(tx.as_mut(), &actor.user_id, shift.scheduled_start, now)
                .await?,
        )
    } else {
        None
    };
    tx.commit().await?;

    info!(
        shift_id = %shift.id,
        cancellation_id = %cancellation.id,
        cancelled_by = %actor.user_id,
        contractor_id = %previous,
        late_count = assessment.map(|a| a.late_count),
        tier = ?assessment.map(|a| a.tier),
        "Shift cancelled"
    );

    if let Some(assessment) = assessment {
        penalties.enforce(&actor.user_id, &assessment).await;
    }
    ctx.deliver(vec![Notification::cancelled(&shift, &previous)])
        .await;
    Ok(cancellation)
}

/// The only mutation a cancellation record allows
pub(super) async fn edit_reason(
    ctx: &EngineContext,
    cancellation_id: &str,
    actor: &Actor,
    reason: Option<String>,
) -> Result<ShiftCancellation> {
    let mut tx = ctx.store.begin_transaction().await?;
    let mut cancellation = tx
        .get_cancellation(cancellation_id)
        .await?
        .ok_or_else(|| DomainError::not_found("ShiftCancellation", cancellation_id))?;

    if !actor.is_admin() && cancellation.cancelled_by != actor.user_id {
        return Err(DomainError::NotAllowed(format!(
            "{} cannot edit cancellation {}",
            actor.user_id, cancellation_id
        ))
        .into());
    }

    cancellation.reason = reason.filter(|r| !r.trim().is_empty());
    tx.update_cancellation_reason(&cancellation.id, cancellation.reason.as_deref())
        .await?;
    tx.commit().await?;

    info!(cancellation_id = %cancellation.id, edited_by = %actor.user_id, "Cancellation reason edited");
    Ok(cancellation)
}
