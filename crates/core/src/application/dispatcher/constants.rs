// Dispatcher constants (no magic values)
use std::time::Duration;

/// Sleep duration when no task is due (1s)
pub const IDLE_SLEEP_DURATION: Duration = Duration::from_secs(1);

/// Sleep duration after a dispatcher error before retry (5s)
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(5);

/// Default retry base delay (1000ms = 1s)
pub const DEFAULT_RETRY_BASE_DELAY_MS: i64 = 1000;

/// Default recovery window for orphaned tasks (5 minutes)
pub const DEFAULT_RECOVERY_WINDOW_MS: i64 = 5 * 60 * 1000;
