//! Shiftline - Shift Lifecycle & Penalty Scheduling Engine
//! Daemon entry point: wires the SQLite adapters into the engine and runs
//! the task dispatcher until Ctrl+C.

mod config;
mod notifier;
mod telemetry;

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};

use config::DaemonConfig;
use notifier::TracingNotifier;
use shiftline_core::application::{shutdown_channel, EngineContext, RecoveryService, TaskDispatcher};
use shiftline_core::port::id_provider::UuidProvider;
use shiftline_core::port::time_provider::SystemTimeProvider;
use shiftline_core::port::{TaskRepository, TimeProvider};
use shiftline_infra_sqlite::{
    create_pool, run_migrations, SqliteAccountDirectory, SqliteShiftStore, SqliteTaskRepository,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load configuration
    let config = DaemonConfig::from_env()?;

    // 2. Initialize logging
    let _log_guard = telemetry::init_logging(&config.log_format, config.log_dir.as_deref())?;
    info!("Shiftline v{} starting...", shiftline_core::VERSION);
    info!(database_url = %config.database_url, "Initializing database...");

    // 3. Initialize database
    let pool = create_pool(&config.database_url)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 4. Setup dependencies (DI wiring)
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let shift_store = Arc::new(SqliteShiftStore::new(pool.clone(), time_provider.clone()));
    let task_repo: Arc<dyn TaskRepository> = Arc::new(SqliteTaskRepository::new(pool.clone()));
    let directory = Arc::new(SqliteAccountDirectory::new(pool.clone()));

    let ctx = EngineContext {
        store: shift_store.clone(),
        shifts: shift_store,
        accounts: directory.clone(),
        hotels: directory,
        notifier: Arc::new(TracingNotifier),
        id_provider: Arc::new(UuidProvider),
        time_provider: time_provider.clone(),
        config: Arc::new(config.engine.clone()),
    };

    // 5. Run crash recovery
    info!("Running crash recovery...");
    let recovery_service = RecoveryService::new(task_repo.clone(), time_provider, None);
    match recovery_service.recover_orphaned_tasks().await {
        Ok(count) => info!(recovered_tasks = count, "Crash recovery completed"),
        Err(e) => error!(error = %e, "Crash recovery failed"),
    }

    // 6. Start the dispatcher
    info!("Starting dispatcher...");
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let dispatcher = TaskDispatcher::new(ctx, task_repo).with_poll_interval(config.poll_interval);

    let dispatcher_handle = tokio::spawn(async move {
        if let Err(e) = dispatcher.run(shutdown_rx).await {
            error!(error = %e, "Dispatcher failed");
        }
    });

    info!("System ready. Press Ctrl+C to shutdown");

    // 7. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 8. Graceful shutdown
    shutdown_tx.shutdown();
    if tokio::time::timeout(std::time::Duration::from_secs(5), dispatcher_handle)
        .await
        .is_err()
    {
        error!("Dispatcher did not stop within 5s");
    }
    pool.close().await;

    info!("Shutdown complete.");
    Ok(())
}
