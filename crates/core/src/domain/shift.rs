// Shift Domain Model
//
// Status transitions are guarded here; side effects (jobs, billing,
// notifications) are orchestrated by application::shift.

use super::account::{Actor, Role, UserId};
use super::error::{DomainError, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Shift ID (UUID v4)
pub type ShiftId = String;

/// Hotel identifier
pub type HotelId = String;

/// Shift status. Cancellation and rescinding are events that return the
/// shift to `Pending`; `Completed` is the only terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShiftStatus {
    Pending,
    Accepted,
    Ongoing,
    Completed,
}

impl ShiftStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ShiftStatus::Completed)
    }
}

impl std::fmt::Display for ShiftStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShiftStatus::Pending => write!(f, "PENDING"),
            ShiftStatus::Accepted => write!(f, "ACCEPTED"),
            ShiftStatus::Ongoing => write!(f, "ONGOING"),
            ShiftStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

impl std::str::FromStr for ShiftStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(ShiftStatus::Pending),
            "ACCEPTED" => Ok(ShiftStatus::Accepted),
            "ONGOING" => Ok(ShiftStatus::Ongoing),
            "COMPLETED" => Ok(ShiftStatus::Completed),
            other => Err(format!("unknown shift status: {}", other)),
        }
    }
}

/// Which contractors may see an unassigned shift
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AudienceMode {
    /// Every contractor
    Market,
    /// A single pre-selected contractor
    Manual,
    /// A hotel-curated list of favourite contractors
    Favourite,
}

impl std::fmt::Display for AudienceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudienceMode::Market => write!(f, "MARKET"),
            AudienceMode::Manual => write!(f, "MANUAL"),
            AudienceMode::Favourite => write!(f, "FAVOURITE"),
        }
    }
}

impl std::str::FromStr for AudienceMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "MARKET" => Ok(AudienceMode::Market),
            "MANUAL" => Ok(AudienceMode::Manual),
            "FAVOURITE" => Ok(AudienceMode::Favourite),
            other => Err(format!("unknown audience mode: {}", other)),
        }
    }
}

/// Clock-in / clock-out geolocation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Used for automatic clock-outs
    pub const ZERO: GeoPoint = GeoPoint {
        latitude: 0.0,
        longitude: 0.0,
    };

    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Shift creation request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewShift {
    pub name: String,
    pub hotel_id: HotelId,
    /// Currency per hour
    pub pay_rate: f64,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,
    pub audience: AudienceMode,
    #[serde(default)]
    pub target_audience: Option<Vec<UserId>>,
    /// Pre-assigned contractor (MANUAL only)
    #[serde(default)]
    pub contractor_id: Option<UserId>,
}

impl NewShift {
    /// Validate field constraints and audience-mode rules.
    ///
    /// `favourites` is the hotel's favourite contractor set; it is only
    /// consulted for FAVOURITE shifts.
    pub fn validate(&self, favourites: &HashSet<UserId>) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::ValidationError(
                "shift name cannot be empty".to_string(),
            ));
        }
        if !self.pay_rate.is_finite() || self.pay_rate <= 0.0 {
            return Err(DomainError::ValidationError(format!(
                "pay rate must be positive, got {}",
                self.pay_rate
            )));
        }
        if self.scheduled_end <= self.scheduled_start {
            return Err(DomainError::ValidationError(
                "scheduled end must be after scheduled start".to_string(),
            ));
        }

        let targets = self
            .target_audience
            .as_deref()
            .filter(|targets| !targets.is_empty());

        match self.audience {
            AudienceMode::Market => {
                if targets.is_some() {
                    return Err(DomainError::ValidationError(
                        "audience MARKET must not have a target audience".to_string(),
                    ));
                }
                if self.contractor_id.is_some() {
                    return Err(DomainError::ValidationError(
                        "only audience MANUAL may pre-assign a contractor".to_string(),
                    ));
                }
            }
            AudienceMode::Manual => {
                if targets.is_some() {
                    return Err(DomainError::ValidationError(
                        "audience MANUAL must not have a target audience".to_string(),
                    ));
                }
            }
            AudienceMode::Favourite => {
                if self.contractor_id.is_some() {
                    return Err(DomainError::ValidationError(
                        "only audience MANUAL may pre-assign a contractor".to_string(),
                    ));
                }
                let Some(targets) = targets else {
                    return Err(DomainError::ValidationError(
                        "audience FAVOURITE requires a target audience".to_string(),
                    ));
                };
                if let Some(outsider) = targets.iter().find(|id| !favourites.contains(*id)) {
                    return Err(DomainError::ValidationError(format!(
                        "target audience id {} is not a favourite of hotel {}",
                        outsider, self.hotel_id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Shift Entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shift {
    pub id: ShiftId,
    pub name: String,
    pub hotel_id: HotelId,
    /// Hotel manager who created the shift
    pub created_by: UserId,

    pub pay_rate: f64,
    pub scheduled_start: DateTime<Utc>,
    pub scheduled_end: DateTime<Utc>,

    pub actual_clock_in: Option<DateTime<Utc>>,
    pub actual_clock_out: Option<DateTime<Utc>>,
    pub clock_in_location: Option<GeoPoint>,
    pub clock_out_location: Option<GeoPoint>,

    pub status: ShiftStatus,
    pub contractor_id: Option<UserId>,
    pub audience: AudienceMode,
    pub target_audience: Vec<UserId>,
    pub confirmed: bool,
    /// Soft-delete marker
    pub active: bool,

    /// Optimistic concurrency token, bumped by the store on every update
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Shift {
    /// Create a new shift
    ///
    /// # Arguments
    ///
    /// * `id` - Unique shift ID (injected, not generated)
    /// * `created_by` - Manager creating the shift
    /// * `now` - Creation timestamp (injected, not system time)
    /// * `request` - Validated creation request
    pub fn new(id: impl Into<String>, created_by: impl Into<String>, now: DateTime<Utc>, request: NewShift) -> Self {
        Self {
            id: id.into(),
            name: request.name,
            hotel_id: request.hotel_id,
            created_by: created_by.into(),
            pay_rate: request.pay_rate,
            scheduled_start: request.scheduled_start,
            scheduled_end: request.scheduled_end,
            actual_clock_in: None,
            actual_clock_out: None,
            clock_in_location: None,
            clock_out_location: None,
            status: ShiftStatus::Pending,
            contractor_id: request.contractor_id,
            audience: request.audience,
            target_audience: request.target_audience.unwrap_or_default(),
            confirmed: false,
            active: true,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_assigned_to(&self, user_id: &str) -> bool {
        self.contractor_id.as_deref() == Some(user_id)
    }

    /// Managers may act on shifts they created; admins on any shift.
    pub fn ensure_owner(&self, actor: &Actor) -> Result<()> {
        match actor.role {
            Role::Admin => Ok(()),
            Role::Manager if self.created_by == actor.user_id => Ok(()),
            _ => Err(DomainError::NotOwner {
                shift_id: self.id.clone(),
                actor: actor.user_id.clone(),
            }),
        }
    }

    fn ensure_assignee(&self, actor: &Actor) -> Result<()> {
        if actor.role == Role::Contractor && self.is_assigned_to(&actor.user_id) {
            Ok(())
        } else {
            Err(DomainError::NotAssigned {
                shift_id: self.id.clone(),
                actor: actor.user_id.clone(),
            })
        }
    }

    fn invalid_transition(&self, to: &str) -> DomainError {
        DomainError::InvalidStateTransition {
            from: self.status.to_string(),
            to: to.to_string(),
        }
    }

    /// Offer the shift to a contractor (status stays PENDING)
    pub fn award(&mut self, contractor_id: impl Into<String>, now: DateTime<Utc>) -> Result<()> {
        if !self.active {
            return Err(DomainError::Inactive(self.id.clone()));
        }
        if self.status != ShiftStatus::Pending {
            return Err(self.invalid_transition("PENDING (awarded)"));
        }
        self.contractor_id = Some(contractor_id.into());
        self.updated_at = now;
        Ok(())
    }

    /// PENDING(assigned) -> ACCEPTED
    pub fn accept(&mut self, actor: &Actor, now: DateTime<Utc>) -> Result<()> {
        self.ensure_assignee(actor)?;
        match self.status {
            ShiftStatus::Pending => {}
            ShiftStatus::Accepted => return Err(DomainError::AlreadyAccepted(self.id.clone())),
            ShiftStatus::Ongoing | ShiftStatus::Completed => {
                return Err(self.invalid_transition("ACCEPTED"))
            }
        }
        self.status = ShiftStatus::Accepted;
        self.updated_at = now;
        Ok(())
    }

    /// PENDING(assigned) | ACCEPTED -> PENDING, assignment cleared.
    /// A MANUAL shift goes back to the open market.
    pub fn decline(&mut self, actor: &Actor, now: DateTime<Utc>) -> Result<()> {
        self.ensure_assignee(actor)?;
        if !matches!(self.status, ShiftStatus::Pending | ShiftStatus::Accepted) {
            return Err(self.invalid_transition("PENDING"));
        }
        self.contractor_id = None;
        self.status = ShiftStatus::Pending;
        if self.audience == AudienceMode::Manual {
            self.audience = AudienceMode::Market;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Cancellation: PENDING(assigned) | ACCEPTED -> PENDING.
    ///
    /// Returns the contractor that held the shift.
    pub fn release(&mut self, actor: &Actor, now: DateTime<Utc>) -> Result<UserId> {
        let allowed_actor = actor.is_admin() || self.ensure_assignee(actor).is_ok();
        if !allowed_actor {
            return Err(DomainError::NotAllowed(format!(
                "{} cannot cancel shift {} they have not been awarded",
                actor.user_id, self.id
            )));
        }
        if !matches!(self.status, ShiftStatus::Pending | ShiftStatus::Accepted) {
            return Err(DomainError::NotAllowed(format!(
                "shift {} is {} and can no longer be cancelled",
                self.id, self.status
            )));
        }
        let Some(previous) = self.contractor_id.take() else {
            return Err(DomainError::NotAllowed(format!(
                "shift {} has no assigned contractor",
                self.id
            )));
        };
        self.status = ShiftStatus::Pending;
        self.updated_at = now;
        Ok(previous)
    }

    /// Earliest instant a clock-in is accepted
    pub fn earliest_clock_in(&self, early_allowance: Duration) -> DateTime<Utc> {
        self.scheduled_start - early_allowance
    }

    /// ACCEPTED -> ONGOING
    pub fn clock_in(
        &mut self,
        actor: &Actor,
        now: DateTime<Utc>,
        location: GeoPoint,
        early_allowance: Duration,
    ) -> Result<()> {
        self.ensure_assignee(actor)?;
        if self.actual_clock_in.is_some() {
            return Err(DomainError::AlreadyStarted(self.id.clone()));
        }
        if self.status != ShiftStatus::Accepted {
            return Err(self.invalid_transition("ONGOING"));
        }
        let earliest = self.earliest_clock_in(early_allowance);
        if now < earliest {
            return Err(DomainError::TooEarly {
                shift_id: self.id.clone(),
                earliest,
            });
        }
        self.actual_clock_in = Some(now);
        self.clock_in_location = Some(location);
        self.status = ShiftStatus::Ongoing;
        self.updated_at = now;
        Ok(())
    }

    /// ONGOING -> COMPLETED. The recorded clock-out is capped at the
    /// scheduled end; returns the recorded instant.
    pub fn clock_out(
        &mut self,
        actor: &Actor,
        now: DateTime<Utc>,
        location: GeoPoint,
    ) -> Result<DateTime<Utc>> {
        self.ensure_assignee(actor)?;
        if self.actual_clock_in.is_none() {
            return Err(DomainError::NotStarted(self.id.clone()));
        }
        if self.actual_clock_out.is_some() || self.status != ShiftStatus::Ongoing {
            return Err(self.invalid_transition("COMPLETED"));
        }
        let recorded = now.min(self.scheduled_end);
        self.actual_clock_out = Some(recorded);
        self.clock_out_location = Some(location);
        self.status = ShiftStatus::Completed;
        self.updated_at = now;
        Ok(recorded)
    }

    /// COMPLETED(unconfirmed) -> COMPLETED(confirmed)
    pub fn confirm(&mut self, actor: &Actor, now: DateTime<Utc>) -> Result<()> {
        self.ensure_owner(actor)?;
        if self.status != ShiftStatus::Completed {
            return Err(DomainError::NotCompleted(self.id.clone()));
        }
        if self.confirmed {
            return Err(DomainError::AlreadyConfirmed(self.id.clone()));
        }
        self.confirmed = true;
        self.updated_at = now;
        Ok(())
    }

    /// True when the shift failed to start and has not been rescinded yet
    pub fn awaits_rescind(&self) -> bool {
        if matches!(self.status, ShiftStatus::Ongoing | ShiftStatus::Completed) {
            return false;
        }
        self.active || self.contractor_id.is_some() || self.status != ShiftStatus::Pending
    }

    /// Missed clock-in: back to an inactive, unassigned market shift.
    ///
    /// Returns the contractor whose offer was rescinded, if any.
    pub fn rescind(&mut self, now: DateTime<Utc>) -> Result<Option<UserId>> {
        if matches!(self.status, ShiftStatus::Ongoing | ShiftStatus::Completed) {
            return Err(self.invalid_transition("PENDING (rescinded)"));
        }
        let previous = self.contractor_id.take();
        self.status = ShiftStatus::Pending;
        self.audience = AudienceMode::Market;
        self.target_audience.clear();
        self.active = false;
        self.updated_at = now;
        Ok(previous)
    }

    /// Hotel-initiated removal (soft delete).
    ///
    /// Returns the contractor that held the shift, if any.
    pub fn withdraw(
        &mut self,
        actor: &Actor,
        now: DateTime<Utc>,
        notice: Duration,
    ) -> Result<Option<UserId>> {
        self.ensure_owner(actor)?;
        if matches!(self.status, ShiftStatus::Ongoing | ShiftStatus::Completed) {
            return Err(DomainError::NotAllowed(format!(
                "shift {} is {} and cannot be deleted",
                self.id, self.status
            )));
        }
        if self.contractor_id.is_some() && now > self.scheduled_start - notice {
            return Err(DomainError::NotAllowed(format!(
                "an awarded shift can only be deleted {} hours before it starts",
                notice.num_hours()
            )));
        }
        let previous = self.contractor_id.take();
        self.status = ShiftStatus::Pending;
        self.active = false;
        self.updated_at = now;
        Ok(previous)
    }
}
