// SQLite Transaction Implementation

use crate::queries;
use crate::rows::map_sqlx_error;
use async_trait::async_trait;
use shiftline_core::domain::{
    Billing, CancellationRecord, ScheduledTask, Shift, ShiftCancellation,
};
use shiftline_core::error::Result;
use shiftline_core::port::{ShiftStoreTransaction, TimeProvider, Transaction};
use sqlx::{Sqlite, Transaction as SqlxTransaction};
use std::sync::Arc;

/// One shift transition. Dropping it without `commit` rolls back.
pub struct SqliteShiftTransaction<'a> {
    tx: SqlxTransaction<'a, Sqlite>,
    time_provider: Arc<dyn TimeProvider>,
}

impl<'a> SqliteShiftTransaction<'a> {
    pub fn new(tx: SqlxTransaction<'a, Sqlite>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self { tx, time_provider }
    }
}

#[async_trait]
impl Transaction for SqliteShiftTransaction<'_> {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(map_sqlx_error)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(map_sqlx_error)
    }
}

#[async_trait]
impl ShiftStoreTransaction for SqliteShiftTransaction<'_> {
    async fn get_shift(&mut self, id: &str) -> Result<Option<Shift>> {
        queries::fetch_shift(&mut *self.tx, id).await
    }

    async fn insert_shift(&mut self, shift: &Shift) -> Result<()> {
        queries::insert_shift(&mut *self.tx, shift).await
    }

    async fn update_shift(&mut self, shift: &Shift) -> Result<i64> {
        queries::update_shift(&mut *self.tx, shift).await
    }

    async fn insert_cancellation(&mut self, cancellation: &ShiftCancellation) -> Result<()> {
        queries::insert_cancellation(&mut *self.tx, cancellation).await
    }

    async fn get_cancellation(&mut self, id: &str) -> Result<Option<ShiftCancellation>> {
        queries::fetch_cancellation(&mut *self.tx, id).await
    }

    async fn update_cancellation_reason(&mut self, id: &str, reason: Option<&str>) -> Result<()> {
        queries::update_cancellation_reason(&mut *self.tx, id, reason).await
    }

    async fn cancellation_history(&mut self, user_id: &str) -> Result<Vec<CancellationRecord>> {
        queries::cancellation_history(&mut *self.tx, user_id).await
    }

    async fn insert_billing(&mut self, billing: &Billing) -> Result<()> {
        queries::insert_billing(&mut *self.tx, billing).await
    }

    async fn insert_task(&mut self, task: &ScheduledTask) -> Result<()> {
        queries::insert_task(&mut *self.tx, task).await
    }

    async fn supersede_pending(&mut self, subject_key: &str) -> Result<u64> {
        let now = self.time_provider.now();
        queries::supersede_pending(&mut *self.tx, subject_key, now).await
    }
}
