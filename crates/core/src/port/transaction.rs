// Transaction port for atomic operations
//
// A shift transition writes the state change, its audit rows and its
// deferred task rows (outbox) through one ShiftStoreTransaction.

use crate::domain::{
    Billing, CancellationRecord, ScheduledTask, Shift, ShiftCancellation,
};
use crate::error::Result;
use async_trait::async_trait;

/// Transaction trait for atomic multi-step operations
#[async_trait]
pub trait Transaction: Send {
    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Entry point of the shift store
#[async_trait]
pub trait TransactionalShiftStore: Send + Sync {
    /// Begin a new transaction
    async fn begin_transaction(&self) -> Result<Box<dyn ShiftStoreTransaction>>;
}

/// Shift store operations within a transaction
#[async_trait]
pub trait ShiftStoreTransaction: Transaction {
    async fn get_shift(&mut self, id: &str) -> Result<Option<Shift>>;

    async fn insert_shift(&mut self, shift: &Shift) -> Result<()>;

    /// Compare-and-swap on `shift.version`.
    ///
    /// Returns the new version. Fails with `AppError::Conflict` when the
    /// stored version moved on since `shift` was read.
    async fn update_shift(&mut self, shift: &Shift) -> Result<i64>;

    async fn insert_cancellation(&mut self, cancellation: &ShiftCancellation) -> Result<()>;

    async fn get_cancellation(&mut self, id: &str) -> Result<Option<ShiftCancellation>>;

    async fn update_cancellation_reason(&mut self, id: &str, reason: Option<&str>) -> Result<()>;

    /// Every cancellation by `user_id` joined with its shift's scheduled
    /// start, newest first. Sees rows inserted earlier in this transaction.
    async fn cancellation_history(&mut self, user_id: &str) -> Result<Vec<CancellationRecord>>;

    async fn insert_billing(&mut self, billing: &Billing) -> Result<()>;

    /// Outbox insert
    async fn insert_task(&mut self, task: &ScheduledTask) -> Result<()>;

    /// Mark PENDING tasks of `subject_key` SUPERSEDED
    async fn supersede_pending(&mut self, subject_key: &str) -> Result<u64>;
}
