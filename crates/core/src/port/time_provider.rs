// Time Provider Port (for testability)

use chrono::{DateTime, Utc};

/// Time provider interface (allows mocking in tests)
pub trait TimeProvider: Send + Sync {
    /// Current instant
    fn now(&self) -> DateTime<Utc>;

    /// Get current time in milliseconds since epoch
    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

/// System time provider (production)
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use chrono::Duration;
    use std::sync::Mutex;

    /// Clock that only moves when told to
    pub struct ManualTimeProvider {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualTimeProvider {
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(start),
            }
        }

        pub fn set(&self, instant: DateTime<Utc>) {
            *self.now.lock().unwrap_or_else(|e| e.into_inner()) = instant;
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
            *now += by;
        }
    }

    impl TimeProvider for ManualTimeProvider {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap_or_else(|e| e.into_inner())
        }
    }
}
