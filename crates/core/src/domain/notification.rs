// Outgoing notifications (delivery is owned by an external service)

use super::account::{NotificationPreferences, UserId};
use super::billing::Billing;
use super::shift::Shift;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    ShiftAwarded,
    ShiftAccepted,
    ShiftDeclined,
    ShiftCancelled,
    ShiftStarted,
    ShiftCompleted,
    ShiftReminder,
    OfferRescinded,
    ShiftRemoved,
    RateHotel,
    Penalty,
}

impl NotificationKind {
    /// Whether a manager with `prefs` wants this event. Contractor-facing
    /// kinds are always delivered.
    pub fn manager_opted_in(&self, prefs: &NotificationPreferences) -> bool {
        match self {
            NotificationKind::ShiftAccepted => prefs.shift_accepted,
            NotificationKind::ShiftDeclined => prefs.shift_declined,
            NotificationKind::ShiftCancelled => prefs.shift_cancelled,
            NotificationKind::ShiftStarted => prefs.shift_started,
            NotificationKind::ShiftCompleted => prefs.shift_ended,
            _ => true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub payload: Option<serde_json::Value>,
}

impl Notification {
    pub fn new(
        user_id: impl Into<String>,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            kind,
            title: title.into(),
            message: message.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    fn for_shift(user_id: &str, kind: NotificationKind, title: &str, message: String, shift: &Shift) -> Self {
        Self::new(user_id, kind, title, message)
            .with_payload(serde_json::json!({ "shift_id": shift.id }))
    }

    pub fn awarded(shift: &Shift, contractor: &str) -> Self {
        Self::for_shift(
            contractor,
            NotificationKind::ShiftAwarded,
            "You have been awarded a Shift",
            format!(
                "You have been awarded the shift {} starting at {}",
                shift.name, shift.scheduled_start
            ),
            shift,
        )
    }

    pub fn accepted(shift: &Shift, contractor: &str) -> Self {
        Self::for_shift(
            &shift.created_by,
            NotificationKind::ShiftAccepted,
            "Your shift has been accepted",
            format!("{} accepted the shift {}", contractor, shift.name),
            shift,
        )
    }

    pub fn declined(shift: &Shift, contractor: &str) -> Self {
        Self::for_shift(
            &shift.created_by,
            NotificationKind::ShiftDeclined,
            "Your shift has been declined",
            format!("{} declined the shift {}", contractor, shift.name),
            shift,
        )
    }

    pub fn cancelled(shift: &Shift, contractor: &str) -> Self {
        Self::for_shift(
            &shift.created_by,
            NotificationKind::ShiftCancelled,
            "A Shift has been Cancelled",
            format!("{} cancelled the shift {}", contractor, shift.name),
            shift,
        )
    }

    pub fn started(shift: &Shift, contractor: &str) -> Self {
        Self::for_shift(
            &shift.created_by,
            NotificationKind::ShiftStarted,
            "A Shift has Started",
            format!("{} clocked in to the shift {}", contractor, shift.name),
            shift,
        )
    }

    /// Completion notice with the settlement, sent to contractor and manager
    pub fn completed(shift: &Shift, recipient: &str, billing: &Billing) -> Self {
        Self::new(
            recipient,
            NotificationKind::ShiftCompleted,
            "A Shift has been Completed",
            format!(
                "The shift {} has been completed: {:.2} hours, contractor share {:.2}",
                shift.name, billing.duration_hours, billing.contractor_share
            ),
        )
        .with_payload(serde_json::json!({
            "shift_id": shift.id,
            "billing_id": billing.id,
        }))
    }

    pub fn reminder(shift: &Shift, contractor: &str) -> Self {
        Self::for_shift(
            contractor,
            NotificationKind::ShiftReminder,
            "You have an upcoming Shift",
            format!(
                "Your shift {} starts at {}",
                shift.name, shift.scheduled_start
            ),
            shift,
        )
    }

    pub fn rescinded(shift: &Shift, recipient: &str) -> Self {
        Self::for_shift(
            recipient,
            NotificationKind::OfferRescinded,
            "Shift offer Rescinded",
            format!(
                "The shift {} was not started on time and the offer has been rescinded",
                shift.name
            ),
            shift,
        )
    }

    pub fn removed(shift: &Shift, contractor: &str) -> Self {
        Self::for_shift(
            contractor,
            NotificationKind::ShiftRemoved,
            "A Shift has been Cancelled",
            format!("The hotel has removed the shift {}", shift.name),
            shift,
        )
    }

    pub fn rate_hotel(shift: &Shift, contractor: &str) -> Self {
        Self::for_shift(
            contractor,
            NotificationKind::RateHotel,
            "Shift Ended",
            format!(
                "Your shift {} has ended and you were clocked out automatically. Please rate the hotel",
                shift.name
            ),
            shift,
        )
    }

    pub fn penalty(user_id: &str, title: &str, message: String) -> Self {
        Self::new(user_id, NotificationKind::Penalty, title, message)
    }
}
