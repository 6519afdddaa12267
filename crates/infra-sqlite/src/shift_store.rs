// SQLite shift store: transition entry point and read-side queries

use crate::queries;
use crate::rows::map_sqlx_error;
use crate::SqliteShiftTransaction;
use async_trait::async_trait;
use shiftline_core::domain::{Billing, CancellationRecord, Shift, ShiftCancellation};
use shiftline_core::error::Result;
use shiftline_core::port::{
    ShiftRepository, ShiftStoreTransaction, TimeProvider, TransactionalShiftStore,
};
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct SqliteShiftStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteShiftStore {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }
}

#[async_trait]
impl TransactionalShiftStore for SqliteShiftStore {
    async fn begin_transaction(&self) -> Result<Box<dyn ShiftStoreTransaction>> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Box::new(SqliteShiftTransaction::new(
            tx,
            Arc::clone(&self.time_provider),
        )))
    }
}

#[async_trait]
impl ShiftRepository for SqliteShiftStore {
    async fn find_by_id(&self, id: &str) -> Result<Option<Shift>> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        queries::fetch_shift(&mut conn, id).await
    }

    async fn find_billing(&self, shift_id: &str) -> Result<Option<Billing>> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        queries::fetch_billing(&mut conn, shift_id).await
    }

    async fn find_cancellations_by(&self, user_id: &str) -> Result<Vec<ShiftCancellation>> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        queries::cancellations_by(&mut conn, user_id).await
    }

    async fn cancellation_history(&self, user_id: &str) -> Result<Vec<CancellationRecord>> {
        let mut conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        queries::cancellation_history(&mut conn, user_id).await
    }
}
