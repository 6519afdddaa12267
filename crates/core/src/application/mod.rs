// Application Layer - Use Cases and Business Logic

pub mod context;
pub mod dispatcher;
pub mod penalty;
pub mod recovery;
pub mod retry;
pub mod shift;

// Re-exports
pub use context::EngineContext;
pub use dispatcher::{shutdown_channel, FireOutcome, ShutdownSender, ShutdownToken, TaskDispatcher};
pub use penalty::PenaltyService;
pub use recovery::RecoveryService;
pub use shift::{Completion, ShiftService};
