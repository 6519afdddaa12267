// SQLite account directory: local stand-in for the account and hotel services

use crate::rows::map_sqlx_error;
use async_trait::async_trait;
use shiftline_core::domain::{Account, DomainError, NotificationPreferences, Role, UserId};
use shiftline_core::error::{AppError, Result};
use shiftline_core::port::{AccountService, HotelService};
use sqlx::SqlitePool;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, sqlx::FromRow)]
struct AccountRow {
    user_id: String,
    role: String,
    active: i64,
    verified: i64,
    reminder_hours: i64,
    notify_accepted: i64,
    notify_declined: i64,
    notify_cancelled: i64,
    notify_started: i64,
    notify_ended: i64,
}

impl AccountRow {
    fn into_account(self) -> Result<Account> {
        let role = self.role.parse::<Role>().map_err(AppError::Database)?;
        Ok(Account {
            user_id: self.user_id,
            role,
            active: self.active != 0,
            verified: self.verified != 0,
            preferences: NotificationPreferences {
                reminder_hours: self.reminder_hours,
                shift_accepted: self.notify_accepted != 0,
                shift_declined: self.notify_declined != 0,
                shift_cancelled: self.notify_cancelled != 0,
                shift_started: self.notify_started != 0,
                shift_ended: self.notify_ended != 0,
            },
        })
    }
}

pub struct SqliteAccountDirectory {
    pool: SqlitePool,
}

impl SqliteAccountDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert or replace an account snapshot
    pub async fn upsert_account(&self, account: &Account) -> Result<()> {
        let prefs = &account.preferences;
        sqlx::query(
            r#"
            INSERT INTO accounts (
                user_id, role, active, verified, reminder_hours,
                notify_accepted, notify_declined, notify_cancelled, notify_started, notify_ended
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                role = excluded.role,
                active = excluded.active,
                verified = excluded.verified,
                reminder_hours = excluded.reminder_hours,
                notify_accepted = excluded.notify_accepted,
                notify_declined = excluded.notify_declined,
                notify_cancelled = excluded.notify_cancelled,
                notify_started = excluded.notify_started,
                notify_ended = excluded.notify_ended
            "#,
        )
        .bind(&account.user_id)
        .bind(account.role.to_string())
        .bind(account.active)
        .bind(account.verified)
        .bind(prefs.reminder_hours)
        .bind(prefs.shift_accepted)
        .bind(prefs.shift_declined)
        .bind(prefs.shift_cancelled)
        .bind(prefs.shift_started)
        .bind(prefs.shift_ended)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    pub async fn add_favourite(&self, hotel_id: &str, contractor_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT OR IGNORE INTO hotel_favourites (hotel_id, contractor_id) VALUES (?, ?)",
        )
        .bind(hotel_id)
        .bind(contractor_id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;
        Ok(())
    }

    /// Current session epoch; bumped by every invalidation
    pub async fn session_epoch(&self, user_id: &str) -> Result<Option<i64>> {
        sqlx::query_scalar("SELECT session_epoch FROM accounts WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn set_flag(&self, user_id: &str, column: &str, value: bool) -> Result<()> {
        let sql = format!("UPDATE accounts SET {} = ? WHERE user_id = ?", column);
        let result = sqlx::query(&sql)
            .bind(value)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Account", user_id).into());
        }
        debug!(user_id = %user_id, column = column, value = value, "Account flag updated");
        Ok(())
    }
}

#[async_trait]
impl AccountService for SqliteAccountDirectory {
    async fn get(&self, user_id: &str) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(
            r#"
            SELECT user_id, role, active, verified, reminder_hours,
                   notify_accepted, notify_declined, notify_cancelled, notify_started, notify_ended
            FROM accounts WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(AccountRow::into_account).transpose()
    }

    async fn set_active(&self, user_id: &str, active: bool) -> Result<()> {
        self.set_flag(user_id, "active", active).await
    }

    async fn set_verified(&self, user_id: &str, verified: bool) -> Result<()> {
        self.set_flag(user_id, "verified", verified).await
    }

    async fn invalidate_sessions(&self, user_id: &str) -> Result<()> {
        let result =
            sqlx::query("UPDATE accounts SET session_epoch = session_epoch + 1 WHERE user_id = ?")
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("Account", user_id).into());
        }
        Ok(())
    }
}

#[async_trait]
impl HotelService for SqliteAccountDirectory {
    async fn favourites(&self, hotel_id: &str) -> Result<HashSet<UserId>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT contractor_id FROM hotel_favourites WHERE hotel_id = ?")
                .bind(hotel_id)
                .fetch_all(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(ids.into_iter().collect())
    }
}
