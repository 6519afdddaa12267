// Engine configuration (no magic values in the state machine)

use crate::domain::PenaltyPolicy;
use crate::error::{AppError, Result};
use chrono::Duration;

/// Default platform share of gross pay (percent)
pub const DEFAULT_PLATFORM_PERCENTAGE: f64 = 45.0;

/// Tunables for the shift state machine, billing and deferred jobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Platform share of gross pay, in percent (0..=100)
    pub platform_percentage: f64,

    /// ENFORCE_CLOCK_IN fires this long after scheduled start,
    /// ENFORCE_CLOCK_OUT this long after scheduled end
    pub enforcement_grace: Duration,

    /// How early before scheduled start a contractor may clock in
    pub early_clock_in: Duration,

    /// Reminder lead used when the contractor has no preference
    pub default_reminder_hours: i64,

    /// Delay used when the reminder instant is already in the past
    pub reminder_fallback: Duration,

    /// An assigned shift may only be removed this long before its start
    pub removal_notice: Duration,

    /// Cancellation escalation ladder
    pub penalty: PenaltyPolicy,

    /// Delivery attempts per scheduled task before it is marked FAILED
    pub task_max_attempts: i32,

    /// Exponential backoff factor between task attempts
    pub task_backoff_factor: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            platform_percentage: DEFAULT_PLATFORM_PERCENTAGE,
            enforcement_grace: Duration::minutes(15),
            early_clock_in: Duration::minutes(10),
            default_reminder_hours: 1,
            reminder_fallback: Duration::seconds(30),
            removal_notice: Duration::hours(24),
            penalty: PenaltyPolicy::default(),
            task_max_attempts: 3,
            task_backoff_factor: 2.0,
        }
    }
}

impl EngineConfig {
    /// Reject values that would make the engine misbehave silently.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.platform_percentage) {
            return Err(AppError::Config(format!(
                "platform_percentage must be within 0..=100, got {}",
                self.platform_percentage
            )));
        }
        if self.enforcement_grace < Duration::zero() || self.early_clock_in < Duration::zero() {
            return Err(AppError::Config(
                "enforcement_grace and early_clock_in must not be negative".to_string(),
            ));
        }
        if self.default_reminder_hours < 0 {
            return Err(AppError::Config(
                "default_reminder_hours must not be negative".to_string(),
            ));
        }
        if self.task_max_attempts < 1 {
            return Err(AppError::Config(format!(
                "task_max_attempts must be at least 1, got {}",
                self.task_max_attempts
            )));
        }
        if self.task_backoff_factor < 1.0 {
            return Err(AppError::Config(format!(
                "task_backoff_factor must be >= 1.0, got {}",
                self.task_backoff_factor
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_platform_percentage_out_of_range() {
        let config = EngineConfig {
            platform_percentage: 120.0,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("platform_percentage"));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let config = EngineConfig {
            task_max_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
