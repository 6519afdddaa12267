// Domain Layer - Pure business logic and entities

pub mod account;
pub mod billing;
pub mod cancellation;
pub mod error;
pub mod notification;
pub mod penalty;
pub mod shift;
pub mod task;

// Re-exports
pub use account::{Account, Actor, NotificationPreferences, Role, UserId};
pub use billing::{Billing, BillingCalculator, BillingId, BillingSplit, BillingStatus};
pub use cancellation::{CancellationId, CancellationRecord, ShiftCancellation};
pub use error::DomainError;
pub use notification::{Notification, NotificationKind};
pub use penalty::{PenaltyAssessment, PenaltyPolicy, PenaltyPreview, PenaltyTier};
pub use shift::{AudienceMode, GeoPoint, HotelId, NewShift, Shift, ShiftId, ShiftStatus};
pub use task::{subject_key, JobName, ScheduledTask, SubjectKey, TaskId, TaskPayload, TaskState};
