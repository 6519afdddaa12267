// Shift Service - state machine use cases
//
// Every operation is one short transaction: read, guard, CAS write, outbox
// rows, commit. Notifications and account-service calls run after commit.

mod assignment;
pub(crate) mod attendance;
mod cancel;
mod create;
mod removal;

pub use attendance::Completion;

use crate::application::context::EngineContext;
use crate::application::penalty::PenaltyService;
use crate::domain::{Actor, DomainError, GeoPoint, NewShift, PenaltyPreview, Shift, ShiftCancellation};
use crate::error::Result;

pub struct ShiftService {
    ctx: EngineContext,
    penalties: PenaltyService,
}

impl ShiftService {
    pub fn new(ctx: EngineContext) -> Self {
        let penalties = PenaltyService::new(ctx.clone());
        Self { ctx, penalties }
    }

    pub async fn create_shift(&self, actor: &Actor, request: NewShift) -> Result<Shift> {
        create::execute(&self.ctx, actor, request).await
    }

    pub async fn award_shift(&self, shift_id: &str, contractor_id: &str, actor: &Actor) -> Result<Shift> {
        assignment::award(&self.ctx, shift_id, contractor_id, actor).await
    }

    pub async fn accept_shift(&self, shift_id: &str, actor: &Actor) -> Result<Shift> {
        assignment::accept(&self.ctx, shift_id, actor).await
    }

    pub async fn decline_shift(&self, shift_id: &str, actor: &Actor) -> Result<Shift> {
        assignment::decline(&self.ctx, shift_id, actor).await
    }

    pub async fn cancel_shift(
        &self,
        shift_id: &str,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<ShiftCancellation> {
        cancel::execute(&self.ctx, &self.penalties, shift_id, actor, reason).await
    }

    pub async fn edit_cancellation_reason(
        &self,
        cancellation_id: &str,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<ShiftCancellation> {
        cancel::edit_reason(&self.ctx, cancellation_id, actor, reason).await
    }

    pub async fn clock_in(&self, shift_id: &str, actor: &Actor, location: GeoPoint) -> Result<Shift> {
        attendance::clock_in(&self.ctx, shift_id, actor, location).await
    }

    pub async fn clock_out(&self, shift_id: &str, actor: &Actor, location: GeoPoint) -> Result<Completion> {
        attendance::clock_out(&self.ctx, shift_id, actor, location).await
    }

    pub async fn confirm_completion(&self, shift_id: &str, actor: &Actor) -> Result<Shift> {
        attendance::confirm(&self.ctx, shift_id, actor).await
    }

    pub async fn delete_shift(&self, shift_id: &str, actor: &Actor) -> Result<Shift> {
        removal::execute(&self.ctx, shift_id, actor).await
    }

    /// Dry-run of `cancel_shift` for `actor`
    pub async fn penalty_preview(&self, actor: &Actor, shift_id: &str) -> Result<PenaltyPreview> {
        self.penalties.preview(&actor.user_id, shift_id).await
    }

    pub async fn get_shift(&self, shift_id: &str) -> Result<Shift> {
        self.ctx
            .shifts
            .find_by_id(shift_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Shift", shift_id).into())
    }
}
