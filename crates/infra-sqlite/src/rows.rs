// Row types and column conversions

use chrono::{DateTime, Utc};
use shiftline_core::domain::{
    AudienceMode, Billing, BillingStatus, GeoPoint, JobName, ScheduledTask, Shift,
    ShiftCancellation, ShiftStatus, TaskPayload, TaskState,
};
use shiftline_core::error::{AppError, Result};

// Helper to convert sqlx::Error to AppError with structured information
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            if let Some(code) = db_err.code() {
                let code_str = code.as_ref();

                // SQLite error codes: https://www.sqlite.org/rescode.html
                match code_str {
                    "2067" | "1555" => AppError::Database(format!(
                        "Unique constraint violation: {} ({})",
                        db_err.message(),
                        code_str
                    )),
                    "787" | "3850" => AppError::Database(format!(
                        "Foreign key constraint violation: {} ({})",
                        db_err.message(),
                        code_str
                    )),
                    "275" => AppError::Database(format!(
                        "Check constraint violation: {}",
                        db_err.message()
                    )),
                    // SQLITE_BUSY / SQLITE_BUSY_SNAPSHOT: another writer won the race
                    "5" | "517" => AppError::Conflict(format!(
                        "Database busy, retry from a fresh read: {}",
                        db_err.message()
                    )),
                    "13" => AppError::Database(format!("Database full: {}", db_err.message())),
                    _ => AppError::Database(format!(
                        "Database error [{}]: {}",
                        code_str,
                        db_err.message()
                    )),
                }
            } else {
                AppError::Database(format!("Database error: {}", db_err.message()))
            }
        }
        sqlx::Error::RowNotFound => AppError::Database("Row not found".to_string()),
        sqlx::Error::ColumnNotFound(col) => {
            AppError::Database(format!("Column not found: {}", col))
        }
        _ => AppError::Database(err.to_string()),
    }
}

pub(crate) fn to_millis(instant: DateTime<Utc>) -> i64 {
    instant.timestamp_millis()
}

pub(crate) fn from_millis(column: &str, ms: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| AppError::Database(format!("{} out of range: {}", column, ms)))
}

fn from_millis_opt(column: &str, ms: Option<i64>) -> Result<Option<DateTime<Utc>>> {
    ms.map(|ms| from_millis(column, ms)).transpose()
}

fn parse_enum<T: std::str::FromStr<Err = String>>(value: &str) -> Result<T> {
    value.parse::<T>().map_err(AppError::Database)
}

fn geo(latitude: Option<f64>, longitude: Option<f64>) -> Option<GeoPoint> {
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Some(GeoPoint::new(latitude, longitude)),
        _ => None,
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ShiftRow {
    id: String,
    name: String,
    hotel_id: String,
    created_by: String,
    pay_rate: f64,
    scheduled_start: i64,
    scheduled_end: i64,
    actual_clock_in: Option<i64>,
    actual_clock_out: Option<i64>,
    clock_in_latitude: Option<f64>,
    clock_in_longitude: Option<f64>,
    clock_out_latitude: Option<f64>,
    clock_out_longitude: Option<f64>,
    status: String,
    contractor_id: Option<String>,
    audience: String,
    confirmed: i64, // SQLite boolean as integer
    active: i64,    // SQLite boolean as integer
    version: i64,
    created_at: i64,
    updated_at: i64,
}

impl ShiftRow {
    /// `target_audience` comes from the shift_audience join table
    pub(crate) fn into_shift(self, target_audience: Vec<String>) -> Result<Shift> {
        Ok(Shift {
            scheduled_start: from_millis("scheduled_start", self.scheduled_start)?,
            scheduled_end: from_millis("scheduled_end", self.scheduled_end)?,
            actual_clock_in: from_millis_opt("actual_clock_in", self.actual_clock_in)?,
            actual_clock_out: from_millis_opt("actual_clock_out", self.actual_clock_out)?,
            clock_in_location: geo(self.clock_in_latitude, self.clock_in_longitude),
            clock_out_location: geo(self.clock_out_latitude, self.clock_out_longitude),
            status: parse_enum::<ShiftStatus>(&self.status)?,
            audience: parse_enum::<AudienceMode>(&self.audience)?,
            created_at: from_millis("created_at", self.created_at)?,
            updated_at: from_millis("updated_at", self.updated_at)?,
            id: self.id,
            name: self.name,
            hotel_id: self.hotel_id,
            created_by: self.created_by,
            pay_rate: self.pay_rate,
            contractor_id: self.contractor_id,
            target_audience,
            confirmed: self.confirmed != 0,
            active: self.active != 0,
            version: self.version,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CancellationRow {
    id: String,
    shift_id: String,
    cancelled_by: String,
    reason: Option<String>,
    created_at: i64,
}

impl CancellationRow {
    pub(crate) fn into_cancellation(self) -> Result<ShiftCancellation> {
        Ok(ShiftCancellation {
            created_at: from_millis("created_at", self.created_at)?,
            id: self.id,
            shift_id: self.shift_id,
            cancelled_by: self.cancelled_by,
            reason: self.reason,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct BillingRow {
    id: String,
    shift_id: String,
    hotel_id: String,
    status: String,
    duration_hours: f64,
    gross: f64,
    platform_share: f64,
    contractor_share: f64,
    payment_reference: Option<String>,
    created_by: String,
    created_at: i64,
}

impl BillingRow {
    pub(crate) fn into_billing(self) -> Result<Billing> {
        Ok(Billing {
            status: parse_enum::<BillingStatus>(&self.status)?,
            created_at: from_millis("created_at", self.created_at)?,
            id: self.id,
            shift_id: self.shift_id,
            hotel_id: self.hotel_id,
            duration_hours: self.duration_hours,
            gross: self.gross,
            platform_share: self.platform_share,
            contractor_share: self.contractor_share,
            payment_reference: self.payment_reference,
            created_by: self.created_by,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct TaskRow {
    id: String,
    job: String,
    entity_id: String,
    subject_key: String,
    fire_at: i64,
    payload: String,
    state: String,
    attempts: i32,
    max_attempts: i32,
    backoff_factor: f64,
    last_error: Option<String>,
    created_at: i64,
    started_at: Option<i64>,
    finished_at: Option<i64>,
}

impl TaskRow {
    pub(crate) fn into_task(self) -> Result<ScheduledTask> {
        let payload: TaskPayload = serde_json::from_str(&self.payload)?;
        Ok(ScheduledTask {
            job: parse_enum::<JobName>(&self.job)?,
            state: parse_enum::<TaskState>(&self.state)?,
            fire_at: from_millis("fire_at", self.fire_at)?,
            created_at: from_millis("created_at", self.created_at)?,
            started_at: from_millis_opt("started_at", self.started_at)?,
            finished_at: from_millis_opt("finished_at", self.finished_at)?,
            id: self.id,
            entity_id: self.entity_id,
            subject_key: self.subject_key,
            payload,
            attempts: self.attempts,
            max_attempts: self.max_attempts,
            backoff_factor: self.backoff_factor,
            last_error: self.last_error,
        })
    }
}
