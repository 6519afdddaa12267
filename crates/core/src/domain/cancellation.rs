// Shift cancellation audit records (append-only)

use super::account::UserId;
use super::shift::ShiftId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cancellation ID (UUID v4)
pub type CancellationId = String;

/// One contractor (or admin) cancellation event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftCancellation {
    pub id: CancellationId,
    pub shift_id: ShiftId,
    /// Actor who cancelled; penalty history is keyed by this id
    pub cancelled_by: UserId,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ShiftCancellation {
    pub fn new(
        id: impl Into<String>,
        shift_id: impl Into<String>,
        cancelled_by: impl Into<String>,
        reason: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            shift_id: shift_id.into(),
            cancelled_by: cancelled_by.into(),
            reason: reason.filter(|r| !r.trim().is_empty()),
            created_at,
        }
    }
}

/// A cancellation joined with the scheduled start of the shift it cancelled.
///
/// The penalty evaluator only needs these two instants per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancellationRecord {
    pub cancelled_at: DateTime<Utc>,
    pub shift_start: DateTime<Utc>,
}

impl CancellationRecord {
    pub fn new(cancelled_at: DateTime<Utc>, shift_start: DateTime<Utc>) -> Self {
        Self {
            cancelled_at,
            shift_start,
        }
    }
}
