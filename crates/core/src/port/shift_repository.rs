// Shift Repository Port (read side)

use crate::domain::{Billing, CancellationRecord, Shift, ShiftCancellation};
use crate::error::Result;
use async_trait::async_trait;

/// Read-only queries outside a transition
#[async_trait]
pub trait ShiftRepository: Send + Sync {
    /// Find shift by ID
    async fn find_by_id(&self, id: &str) -> Result<Option<Shift>>;

    /// Billing produced by the shift's clock-out
    async fn find_billing(&self, shift_id: &str) -> Result<Option<Billing>>;

    /// Cancellations made by `user_id`, newest first
    async fn find_cancellations_by(&self, user_id: &str) -> Result<Vec<ShiftCancellation>>;

    /// Penalty input for `user_id`, newest first
    async fn cancellation_history(&self, user_id: &str) -> Result<Vec<CancellationRecord>>;
}
