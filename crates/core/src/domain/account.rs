// Actors and account view (accounts themselves are owned by an external service)

use serde::{Deserialize, Serialize};

/// User ID (accounts are keyed by user id for every role)
pub type UserId = String;

/// Role of the user invoking an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Contractor,
    Manager,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Contractor => write!(f, "CONTRACTOR"),
            Role::Manager => write!(f, "MANAGER"),
            Role::Admin => write!(f, "ADMIN"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONTRACTOR" => Ok(Role::Contractor),
            "MANAGER" => Ok(Role::Manager),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}

/// The authenticated caller of a state machine operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn contractor(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::Contractor)
    }

    pub fn manager(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::Manager)
    }

    pub fn admin(user_id: impl Into<String>) -> Self {
        Self::new(user_id, Role::Admin)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Per-user notification preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    /// Hours before shift start to send the upcoming-shift reminder
    pub reminder_hours: i64,
    pub shift_accepted: bool,
    pub shift_declined: bool,
    pub shift_cancelled: bool,
    pub shift_started: bool,
    pub shift_ended: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            reminder_hours: 1,
            shift_accepted: true,
            shift_declined: true,
            shift_cancelled: true,
            shift_started: true,
            shift_ended: true,
        }
    }
}

/// Account snapshot as reported by the account service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: UserId,
    pub role: Role,
    pub active: bool,
    /// Contractor verification; only meaningful for contractors
    pub verified: bool,
    pub preferences: NotificationPreferences,
}

impl Account {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            active: true,
            verified: true,
            preferences: NotificationPreferences::default(),
        }
    }

    /// Contractor that may be awarded work
    pub fn is_verified_contractor(&self) -> bool {
        self.role == Role::Contractor && self.verified && self.active
    }
}
