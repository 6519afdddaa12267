// SQL shared by the pooled repositories and the transaction adapter.
// Every function takes a plain connection so it runs the same inside or
// outside a transaction.

use crate::rows::{
    from_millis, map_sqlx_error, to_millis, BillingRow, CancellationRow, ShiftRow,
};
use chrono::{DateTime, Utc};
use shiftline_core::domain::{
    Billing, CancellationRecord, DomainError, ScheduledTask, Shift, ShiftCancellation, TaskState,
};
use shiftline_core::error::{AppError, Result};
use sqlx::SqliteConnection;

pub(crate) async fn fetch_shift(conn: &mut SqliteConnection, id: &str) -> Result<Option<Shift>> {
    let row = sqlx::query_as::<_, ShiftRow>("SELECT * FROM shifts WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

    let Some(row) = row else {
        return Ok(None);
    };

    let audience: Vec<String> = sqlx::query_scalar(
        "SELECT contractor_id FROM shift_audience WHERE shift_id = ? ORDER BY rowid",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    row.into_shift(audience).map(Some)
}

async fn replace_audience(conn: &mut SqliteConnection, shift: &Shift) -> Result<()> {
    sqlx::query("DELETE FROM shift_audience WHERE shift_id = ?")
        .bind(&shift.id)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

    for contractor_id in &shift.target_audience {
        sqlx::query("INSERT OR IGNORE INTO shift_audience (shift_id, contractor_id) VALUES (?, ?)")
            .bind(&shift.id)
            .bind(contractor_id)
            .execute(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;
    }
    Ok(())
}

pub(crate) async fn insert_shift(conn: &mut SqliteConnection, shift: &Shift) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO shifts (
            id, name, hotel_id, created_by, pay_rate,
            scheduled_start, scheduled_end, actual_clock_in, actual_clock_out,
            clock_in_latitude, clock_in_longitude, clock_out_latitude, clock_out_longitude,
            status, contractor_id, audience, confirmed, active,
            version, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&shift.id)
    .bind(&shift.name)
    .bind(&shift.hotel_id)
    .bind(&shift.created_by)
    .bind(shift.pay_rate)
    .bind(to_millis(shift.scheduled_start))
    .bind(to_millis(shift.scheduled_end))
    .bind(shift.actual_clock_in.map(to_millis))
    .bind(shift.actual_clock_out.map(to_millis))
    .bind(shift.clock_in_location.map(|g| g.latitude))
    .bind(shift.clock_in_location.map(|g| g.longitude))
    .bind(shift.clock_out_location.map(|g| g.latitude))
    .bind(shift.clock_out_location.map(|g| g.longitude))
    .bind(shift.status.to_string())
    .bind(&shift.contractor_id)
    .bind(shift.audience.to_string())
    .bind(shift.confirmed)
    .bind(shift.active)
    .bind(shift.version)
    .bind(to_millis(shift.created_at))
    .bind(to_millis(shift.updated_at))
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    replace_audience(conn, shift).await
}

/// Conditional write keyed on `version`; returns the new version
pub(crate) async fn update_shift(conn: &mut SqliteConnection, shift: &Shift) -> Result<i64> {
    let result = sqlx::query(
        r#"
        UPDATE shifts
        SET name = ?, pay_rate = ?,
            actual_clock_in = ?, actual_clock_out = ?,
            clock_in_latitude = ?, clock_in_longitude = ?,
            clock_out_latitude = ?, clock_out_longitude = ?,
            status = ?, contractor_id = ?, audience = ?,
            confirmed = ?, active = ?, updated_at = ?,
            version = version + 1
        WHERE id = ? AND version = ?
        "#,
    )
    .bind(&shift.name)
    .bind(shift.pay_rate)
    .bind(shift.actual_clock_in.map(to_millis))
    .bind(shift.actual_clock_out.map(to_millis))
    .bind(shift.clock_in_location.map(|g| g.latitude))
    .bind(shift.clock_in_location.map(|g| g.longitude))
    .bind(shift.clock_out_location.map(|g| g.latitude))
    .bind(shift.clock_out_location.map(|g| g.longitude))
    .bind(shift.status.to_string())
    .bind(&shift.contractor_id)
    .bind(shift.audience.to_string())
    .bind(shift.confirmed)
    .bind(shift.active)
    .bind(to_millis(shift.updated_at))
    .bind(&shift.id)
    .bind(shift.version)
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    if result.rows_affected() == 0 {
        let current: Option<i64> = sqlx::query_scalar("SELECT version FROM shifts WHERE id = ?")
            .bind(&shift.id)
            .fetch_optional(&mut *conn)
            .await
            .map_err(map_sqlx_error)?;

        return match current {
            None => Err(DomainError::not_found("Shift", shift.id.clone()).into()),
            Some(current) => Err(AppError::Conflict(format!(
                "shift {} is at version {}, update was based on version {}",
                shift.id, current, shift.version
            ))),
        };
    }

    replace_audience(conn, shift).await?;
    Ok(shift.version + 1)
}

pub(crate) async fn insert_cancellation(
    conn: &mut SqliteConnection,
    cancellation: &ShiftCancellation,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO shift_cancellations (id, shift_id, cancelled_by, reason, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&cancellation.id)
    .bind(&cancellation.shift_id)
    .bind(&cancellation.cancelled_by)
    .bind(&cancellation.reason)
    .bind(to_millis(cancellation.created_at))
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;
    Ok(())
}

pub(crate) async fn fetch_cancellation(
    conn: &mut SqliteConnection,
    id: &str,
) -> Result<Option<ShiftCancellation>> {
    let row = sqlx::query_as::<_, CancellationRow>("SELECT * FROM shift_cancellations WHERE id = ?")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    row.map(CancellationRow::into_cancellation).transpose()
}

pub(crate) async fn update_cancellation_reason(
    conn: &mut SqliteConnection,
    id: &str,
    reason: Option<&str>,
) -> Result<()> {
    let result = sqlx::query("UPDATE shift_cancellations SET reason = ? WHERE id = ?")
        .bind(reason)
        .bind(id)
        .execute(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;

    if result.rows_affected() == 0 {
        return Err(DomainError::not_found("ShiftCancellation", id).into());
    }
    Ok(())
}

pub(crate) async fn cancellations_by(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Vec<ShiftCancellation>> {
    let rows: Vec<CancellationRow> = sqlx::query_as(
        r#"
        SELECT * FROM shift_cancellations
        WHERE cancelled_by = ?
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    rows.into_iter()
        .map(CancellationRow::into_cancellation)
        .collect()
}

/// Cancellations of `user_id` with their shift's scheduled start, newest first
pub(crate) async fn cancellation_history(
    conn: &mut SqliteConnection,
    user_id: &str,
) -> Result<Vec<CancellationRecord>> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        r#"
        SELECT c.created_at, s.scheduled_start
        FROM shift_cancellations c
        JOIN shifts s ON s.id = c.shift_id
        WHERE c.cancelled_by = ?
        ORDER BY c.created_at DESC, c.rowid DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    rows.into_iter()
        .map(|(cancelled_at, shift_start)| {
            Ok(CancellationRecord::new(
                from_millis("created_at", cancelled_at)?,
                from_millis("scheduled_start", shift_start)?,
            ))
        })
        .collect()
}

pub(crate) async fn insert_billing(conn: &mut SqliteConnection, billing: &Billing) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO billings (
            id, shift_id, hotel_id, status, duration_hours, gross,
            platform_share, contractor_share, payment_reference, created_by, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&billing.id)
    .bind(&billing.shift_id)
    .bind(&billing.hotel_id)
    .bind(billing.status.to_string())
    .bind(billing.duration_hours)
    .bind(billing.gross)
    .bind(billing.platform_share)
    .bind(billing.contractor_share)
    .bind(&billing.payment_reference)
    .bind(&billing.created_by)
    .bind(to_millis(billing.created_at))
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;
    Ok(())
}

pub(crate) async fn fetch_billing(
    conn: &mut SqliteConnection,
    shift_id: &str,
) -> Result<Option<Billing>> {
    let row = sqlx::query_as::<_, BillingRow>("SELECT * FROM billings WHERE shift_id = ?")
        .bind(shift_id)
        .fetch_optional(&mut *conn)
        .await
        .map_err(map_sqlx_error)?;
    row.map(BillingRow::into_billing).transpose()
}

pub(crate) async fn insert_task(conn: &mut SqliteConnection, task: &ScheduledTask) -> Result<()> {
    let payload = serde_json::to_string(&task.payload)?;
    sqlx::query(
        r#"
        INSERT INTO scheduled_tasks (
            id, job, entity_id, subject_key, fire_at, payload, state,
            attempts, max_attempts, backoff_factor, last_error,
            created_at, started_at, finished_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&task.id)
    .bind(task.job.as_str())
    .bind(&task.entity_id)
    .bind(&task.subject_key)
    .bind(to_millis(task.fire_at))
    .bind(payload)
    .bind(task.state.to_string())
    .bind(task.attempts)
    .bind(task.max_attempts)
    .bind(task.backoff_factor)
    .bind(&task.last_error)
    .bind(to_millis(task.created_at))
    .bind(task.started_at.map(to_millis))
    .bind(task.finished_at.map(to_millis))
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;
    Ok(())
}

pub(crate) async fn supersede_pending(
    conn: &mut SqliteConnection,
    subject_key: &str,
    now: DateTime<Utc>,
) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE scheduled_tasks
        SET state = ?, finished_at = ?
        WHERE subject_key = ? AND state = ?
        "#,
    )
    .bind(TaskState::Superseded.to_string())
    .bind(to_millis(now))
    .bind(subject_key)
    .bind(TaskState::Pending.to_string())
    .execute(&mut *conn)
    .await
    .map_err(map_sqlx_error)?;

    Ok(result.rows_affected())
}
