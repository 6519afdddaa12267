// Delete Shift Use Case (hotel-initiated soft delete)

use crate::application::context::EngineContext;
use crate::domain::{subject_key, Actor, JobName, Notification, Shift};
use crate::error::Result;
use tracing::info;

/// No ShiftCancellation is recorded: this is not a contractor cancellation.
pub(super) async fn execute(ctx: &EngineContext, shift_id: &str, actor: &Actor) -> Result<Shift> {
    let mut tx = ctx.store.begin_transaction().await?;
    let mut shift = ctx.load_shift(tx.as_mut(), shift_id).await?;
    let previous = shift.withdraw(actor, ctx.now(), ctx.config.removal_notice)?;
    ctx.save_shift(tx.as_mut(), &mut shift).await?;
    tx.supersede_pending(&subject_key(JobName::SendReminder, &shift.id))
        .await?;
    tx.commit().await?;

    info!(
        shift_id = %shift.id,
        deleted_by = %actor.user_id,
        contractor_id = ?previous,
        "Shift deleted"
    );
    if let Some(contractor_id) = previous {
        ctx.deliver(vec![Notification::removed(&shift, &contractor_id)])
            .await;
    }
    Ok(shift)
}
