// Cancellation penalty ladder (pure, shared by the live path and the dry-run preview)

use super::cancellation::CancellationRecord;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Escalation ladder parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PenaltyPolicy {
    /// A cancellation this close to its shift's start is "late"
    pub late_window: Duration,
    /// Oldest counted late cancellation must be this recent for N=2/N=3 suspensions
    pub escalation_window: Duration,
    /// Suspension length at N=2
    pub first_suspension: Duration,
    /// Suspension length at N=3
    pub second_suspension: Duration,
}

impl Default for PenaltyPolicy {
    fn default() -> Self {
        Self {
            late_window: Duration::hours(12),
            escalation_window: Duration::days(45),
            first_suspension: Duration::days(14),
            second_suspension: Duration::days(30),
        }
    }
}

/// Consequence of a late-cancellation count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PenaltyTier {
    /// Not late, or the counted cancellations fall outside the escalation window
    NoAction,
    /// First late cancellation: the actor is told to contact support
    Warning,
    /// Suspension lifted by a REACTIVATE_USER job after `days`
    Suspension { days: i64 },
    /// No reactivation is scheduled
    IndefiniteSuspension,
    /// Indefinite suspension with an explicit ban notice
    Ban,
}

impl PenaltyTier {
    pub fn suspends(&self) -> bool {
        matches!(
            self,
            PenaltyTier::Suspension { .. } | PenaltyTier::IndefiniteSuspension | PenaltyTier::Ban
        )
    }

    pub fn reactivate_after(&self) -> Option<Duration> {
        match self {
            PenaltyTier::Suspension { days } => Some(Duration::days(*days)),
            _ => None,
        }
    }

    pub fn is_indefinite(&self) -> bool {
        matches!(self, PenaltyTier::IndefiniteSuspension | PenaltyTier::Ban)
    }

    /// Notice sent to the actor after a cancellation, if any
    pub fn notice(&self, late_count: usize) -> Option<(&'static str, String)> {
        const TITLE: &str = "You have cancelled a Shift";
        let message = match self {
            PenaltyTier::NoAction => return None,
            PenaltyTier::Warning => "You must call support and explain why you cancelled a shift \
                 less than 12 hours before it starts"
                .to_string(),
            PenaltyTier::Suspension { days } => format!(
                "This is the {} shift you have cancelled in a 45 day period, therefore your \
                 account has been suspended for {} days",
                ordinal(late_count),
                days
            ),
            PenaltyTier::IndefiniteSuspension => format!(
                "This is the {} shift you have cancelled in a 45 day period, therefore your \
                 account has been suspended",
                ordinal(late_count)
            ),
            PenaltyTier::Ban => {
                "Your account has been suspended indefinitely and banned from this platform"
                    .to_string()
            }
        };
        Some((TITLE, message))
    }

    /// Message shown by the dry-run preview
    pub fn projected_message(&self) -> String {
        match self {
            PenaltyTier::NoAction | PenaltyTier::Warning => {
                "You will need to call support and explain".to_string()
            }
            PenaltyTier::Suspension { days } => format!("You will be suspended for {} days", days),
            PenaltyTier::IndefiniteSuspension => {
                "You will be suspended indefinitely. You can also call support and explain"
                    .to_string()
            }
            PenaltyTier::Ban => "You will be banned from this platform".to_string(),
        }
    }
}

fn ordinal(n: usize) -> String {
    match n {
        1 => "first".to_string(),
        2 => "second".to_string(),
        3 => "third".to_string(),
        4 => "fourth".to_string(),
        n => format!("{}th", n),
    }
}

/// Live-path evaluation result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PenaltyAssessment {
    pub late_count: usize,
    pub tier: PenaltyTier,
}

/// Dry-run result for a cancellation that has not happened yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PenaltyPreview {
    /// Late cancellations already on record
    pub qualifying_count: usize,
    /// Cancelling at or after this instant counts as late
    pub window_deadline: DateTime<Utc>,
    pub projected_tier: PenaltyTier,
    pub projected_message: String,
}

pub const NO_PENALTY_MESSAGE: &str = "No penalty";

impl PenaltyPolicy {
    /// Instant from which cancelling a shift starting at `shift_start` is late
    pub fn late_deadline(&self, shift_start: DateTime<Utc>) -> DateTime<Utc> {
        shift_start - self.late_window
    }

    pub fn is_late(&self, record: &CancellationRecord) -> bool {
        record.cancelled_at >= self.late_deadline(record.shift_start)
    }

    /// Instants of the late cancellations, newest first
    pub fn late_cancellations(&self, history: &[CancellationRecord]) -> Vec<DateTime<Utc>> {
        let mut late: Vec<DateTime<Utc>> = history
            .iter()
            .filter(|record| self.is_late(record))
            .map(|record| record.cancelled_at)
            .collect();
        late.sort_unstable_by(|a, b| b.cmp(a));
        late
    }

    /// Ladder for `count` late cancellations whose oldest happened at `oldest`.
    ///
    /// The 45-day check is always anchored at the oldest counted cancellation
    /// and compares whole elapsed days, so 45 days and some hours still count.
    pub fn tier_for(&self, count: usize, oldest: DateTime<Utc>, now: DateTime<Utc>) -> PenaltyTier {
        let within_window = (now - oldest).num_days() <= self.escalation_window.num_days();
        match count {
            0 => PenaltyTier::NoAction,
            1 => PenaltyTier::Warning,
            2 if within_window => PenaltyTier::Suspension {
                days: self.first_suspension.num_days(),
            },
            3 if within_window => PenaltyTier::Suspension {
                days: self.second_suspension.num_days(),
            },
            2 | 3 => PenaltyTier::NoAction,
            4 => PenaltyTier::IndefiniteSuspension,
            _ => PenaltyTier::Ban,
        }
    }

    /// Evaluate a history that already contains the cancellation just made.
    pub fn assess(&self, history: &[CancellationRecord], now: DateTime<Utc>) -> PenaltyAssessment {
        let late = self.late_cancellations(history);
        let tier = match late.last() {
            Some(oldest) => self.tier_for(late.len(), *oldest, now),
            None => PenaltyTier::NoAction,
        };
        PenaltyAssessment {
            late_count: late.len(),
            tier,
        }
    }

    /// What would happen if the actor cancelled a shift starting at
    /// `shift_start` right now. Never mutates anything.
    pub fn preview(
        &self,
        history: &[CancellationRecord],
        shift_start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> PenaltyPreview {
        let late = self.late_cancellations(history);
        let window_deadline = self.late_deadline(shift_start);

        if now < window_deadline {
            return PenaltyPreview {
                qualifying_count: late.len(),
                window_deadline,
                projected_tier: PenaltyTier::NoAction,
                projected_message: NO_PENALTY_MESSAGE.to_string(),
            };
        }

        let oldest = late.last().copied().unwrap_or(now).min(now);
        let projected_tier = self.tier_for(late.len() + 1, oldest, now);
        PenaltyPreview {
            qualifying_count: late.len(),
            window_deadline,
            projected_tier,
            projected_message: projected_tier.projected_message(),
        }
    }
}
