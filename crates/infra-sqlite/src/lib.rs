// Shiftline Infrastructure - SQLite Adapter
// Implements: TransactionalShiftStore, ShiftRepository, TaskRepository,
// AccountService and HotelService

mod account_directory;
mod connection;
mod migration;
mod queries;
mod rows;
mod shift_store;
mod task_repository;
mod transaction;

pub use account_directory::SqliteAccountDirectory;
pub use connection::create_pool;
pub use migration::run_migrations;
pub use shift_store::SqliteShiftStore;
pub use task_repository::SqliteTaskRepository;
pub use transaction::SqliteShiftTransaction;

// Note: sqlx::Error conversion is handled by rows::map_sqlx_error
// due to Rust's orphan rules (cannot implement From<sqlx::Error> for AppError here)
