// Port Layer - Interfaces for external dependencies

pub mod account_service;
pub mod hotel_service;
pub mod id_provider; // For deterministic testing
pub mod notifier;
pub mod shift_repository;
pub mod task_repository;
pub mod time_provider;
pub mod transaction;

// Re-exports
pub use account_service::AccountService;
pub use hotel_service::HotelService;
pub use id_provider::IdProvider;
pub use notifier::NotificationService;
pub use shift_repository::ShiftRepository;
pub use task_repository::TaskRepository;
pub use time_provider::TimeProvider;
pub use transaction::{ShiftStoreTransaction, Transaction, TransactionalShiftStore};
