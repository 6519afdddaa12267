// Create Shift Use Case

use crate::application::context::EngineContext;
use crate::domain::{
    Actor, AudienceMode, DomainError, JobName, NewShift, Notification, Role, Shift, TaskPayload,
};
use crate::error::Result;
use std::collections::HashSet;
use tracing::info;

/// Validate, persist and arm both enforcement jobs in one transaction.
pub(super) async fn execute(ctx: &EngineContext, actor: &Actor, request: NewShift) -> Result<Shift> {
    if !matches!(actor.role, Role::Manager | Role::Admin) {
        return Err(DomainError::NotAllowed(format!(
            "{} cannot create shifts",
            actor.user_id
        ))
        .into());
    }

    let favourites = if request.audience == AudienceMode::Favourite {
        ctx.hotels.favourites(&request.hotel_id).await?
    } else {
        HashSet::new()
    };
    request.validate(&favourites)?;

    if let Some(contractor_id) = &request.contractor_id {
        super::assignment::ensure_verified_contractor(ctx, contractor_id).await?;
    }

    let now = ctx.now();
    let shift = Shift::new(ctx.id_provider.generate_id(), actor.user_id.clone(), now, request);
    let payload = TaskPayload::new().with("shift_id", shift.id.clone());
    let grace = ctx.config.enforcement_grace;

    let mut tx = ctx.store.begin_transaction().await?;
    tx.insert_shift(&shift).await?;
    ctx.enqueue(
        tx.as_mut(),
        JobName::EnforceClockIn,
        &shift.id,
        shift.scheduled_start + grace,
        payload.clone(),
    )
    .await?;
    ctx.enqueue(
        tx.as_mut(),
        JobName::EnforceClockOut,
        &shift.id,
        shift.scheduled_end + grace,
        payload,
    )
    .await?;
    tx.commit().await?;

    info!(
        shift_id = %shift.id,
        hotel_id = %shift.hotel_id,
        audience = %shift.audience,
        created_by = %actor.user_id,
        "Shift created"
    );

    if let Some(contractor_id) = &shift.contractor_id {
        ctx.deliver(vec![Notification::awarded(&shift, contractor_id)])
            .await;
    }
    Ok(shift)
}
