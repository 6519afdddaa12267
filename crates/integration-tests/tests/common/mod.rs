//! Shared fixture: in-memory SQLite adapters, a manual clock and mock
//! collaborators wired into one engine.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use shiftline_core::application::{EngineContext, ShiftService, TaskDispatcher};
use shiftline_core::domain::{
    Account, Actor, AudienceMode, GeoPoint, NewShift, Role, ScheduledTask, Shift,
};
use shiftline_core::port::account_service::mocks::InMemoryAccountService;
use shiftline_core::port::hotel_service::mocks::StaticHotelService;
use shiftline_core::port::id_provider::mocks::SequentialIdProvider;
use shiftline_core::port::notifier::mocks::RecordingNotifier;
use shiftline_core::port::time_provider::mocks::ManualTimeProvider;
use shiftline_core::port::{AccountService, NotificationService, TaskRepository};
use shiftline_core::{AppError, EngineConfig};
use shiftline_infra_sqlite::{create_pool, run_migrations, SqliteShiftStore, SqliteTaskRepository};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const MANAGER: &str = "manager-1";
pub const ADMIN: &str = "admin-1";
pub const HOTEL: &str = "hotel-1";
pub const C1: &str = "c-1";
pub const C2: &str = "c-2";
pub const C3: &str = "c-3";

/// 2026-03-02 at `h:m` UTC. Shifts default to 09:00-17:00 on this day.
pub fn at(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, h, m, 0).unwrap()
}

pub fn manager() -> Actor {
    Actor::manager(MANAGER)
}

pub fn admin() -> Actor {
    Actor::admin(ADMIN)
}

pub fn contractor(id: &str) -> Actor {
    Actor::contractor(id)
}

pub fn here() -> GeoPoint {
    GeoPoint::new(51.5072, -0.1276)
}

pub fn new_shift(start: DateTime<Utc>, end: DateTime<Utc>, audience: AudienceMode) -> NewShift {
    NewShift {
        name: "Banqueting".to_string(),
        hotel_id: HOTEL.to_string(),
        pay_rate: 50.0,
        scheduled_start: start,
        scheduled_end: end,
        audience,
        target_audience: None,
        contractor_id: None,
    }
}

/// Account service call that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountCall {
    Get,
    Activate,
    Deactivate,
    Verify,
    Unverify,
    InvalidateSessions,
}

/// Wraps the in-memory accounts and fails chosen calls a set number of times
pub struct FlakyAccountService {
    inner: Arc<InMemoryAccountService>,
    failures: Mutex<HashMap<AccountCall, u32>>,
}

impl FlakyAccountService {
    pub fn new(inner: Arc<InMemoryAccountService>) -> Self {
        Self {
            inner,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// The next `times` calls of `call` fail
    pub fn fail_next(&self, call: AccountCall, times: u32) {
        self.failures.lock().unwrap().insert(call, times);
    }

    fn check(&self, call: AccountCall) -> shiftline_core::Result<()> {
        let mut failures = self.failures.lock().unwrap();
        match failures.get_mut(&call) {
            Some(left) if *left > 0 => {
                *left -= 1;
                Err(AppError::Collaborator("account service down".to_string()))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl AccountService for FlakyAccountService {
    async fn get(&self, user_id: &str) -> shiftline_core::Result<Option<Account>> {
        self.check(AccountCall::Get)?;
        self.inner.get(user_id).await
    }

    async fn set_active(&self, user_id: &str, active: bool) -> shiftline_core::Result<()> {
        self.check(if active {
            AccountCall::Activate
        } else {
            AccountCall::Deactivate
        })?;
        self.inner.set_active(user_id, active).await
    }

    async fn set_verified(&self, user_id: &str, verified: bool) -> shiftline_core::Result<()> {
        self.check(if verified {
            AccountCall::Verify
        } else {
            AccountCall::Unverify
        })?;
        self.inner.set_verified(user_id, verified).await
    }

    async fn invalidate_sessions(&self, user_id: &str) -> shiftline_core::Result<()> {
        self.check(AccountCall::InvalidateSessions)?;
        self.inner.invalidate_sessions(user_id).await
    }
}

pub struct Harness {
    pub pool: SqlitePool,
    pub clock: Arc<ManualTimeProvider>,
    /// Account state as stored
    pub accounts: Arc<InMemoryAccountService>,
    /// What the engine talks to; inject failures here
    pub flaky: Arc<FlakyAccountService>,
    pub notifier: Arc<RecordingNotifier>,
    pub tasks: Arc<SqliteTaskRepository>,
    pub store: Arc<SqliteShiftStore>,
    pub ctx: EngineContext,
    pub shifts: ShiftService,
    pub dispatcher: TaskDispatcher,
}

impl Harness {
    pub async fn new() -> Self {
        let notifier = Arc::new(RecordingNotifier::new());
        Self::build(notifier.clone(), notifier).await
    }

    /// Same wiring, but notifications go to `sink` (the recorder stays empty)
    pub async fn with_notifier(sink: Arc<dyn NotificationService>) -> Self {
        Self::build(Arc::new(RecordingNotifier::new()), sink).await
    }

    async fn build(recorder: Arc<RecordingNotifier>, sink: Arc<dyn NotificationService>) -> Self {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        let clock = Arc::new(ManualTimeProvider::new(at(6, 0)));
        let accounts = Arc::new(InMemoryAccountService::with_accounts([
            Account::new(MANAGER, Role::Manager),
            Account::new(ADMIN, Role::Admin),
            Account::new(C1, Role::Contractor),
            Account::new(C2, Role::Contractor),
            Account::new(C3, Role::Contractor),
        ]));
        let flaky = Arc::new(FlakyAccountService::new(accounts.clone()));
        let hotels = Arc::new(StaticHotelService::new().with_favourites(HOTEL, [C1, C2]));
        let store = Arc::new(SqliteShiftStore::new(pool.clone(), clock.clone()));
        let tasks = Arc::new(SqliteTaskRepository::new(pool.clone()));

        let ctx = EngineContext {
            store: store.clone(),
            shifts: store.clone(),
            accounts: flaky.clone(),
            hotels,
            notifier: sink,
            id_provider: Arc::new(SequentialIdProvider::new("id")),
            time_provider: clock.clone(),
            config: Arc::new(EngineConfig::default()),
        };

        Self {
            shifts: ShiftService::new(ctx.clone()),
            dispatcher: TaskDispatcher::new(ctx.clone(), tasks.clone()).with_retry_base_delay(1000),
            pool,
            clock,
            accounts,
            flaky,
            notifier: recorder,
            tasks,
            store,
            ctx,
        }
    }

    pub fn set_time(&self, instant: DateTime<Utc>) {
        self.clock.set(instant);
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// MARKET shift 09:00-17:00 at 50/h
    pub async fn market_shift(&self) -> Shift {
        self.shifts
            .create_shift(&manager(), new_shift(at(9, 0), at(17, 0), AudienceMode::Market))
            .await
            .unwrap()
    }

    /// Market shift awarded to and accepted by `contractor_id`
    pub async fn accepted_shift(&self, contractor_id: &str) -> Shift {
        let shift = self.market_shift().await;
        self.shifts
            .award_shift(&shift.id, contractor_id, &manager())
            .await
            .unwrap();
        self.shifts
            .accept_shift(&shift.id, &contractor(contractor_id))
            .await
            .unwrap()
    }

    pub async fn reload(&self, shift_id: &str) -> Shift {
        self.shifts.get_shift(shift_id).await.unwrap()
    }

    /// All tasks of `job:entity`, oldest first
    pub async fn tasks_for(&self, subject_key: &str) -> Vec<ScheduledTask> {
        self.tasks.find_by_subject(subject_key).await.unwrap()
    }

    pub async fn task_for(&self, subject_key: &str) -> ScheduledTask {
        let mut tasks = self.tasks_for(subject_key).await;
        assert_eq!(tasks.len(), 1, "expected one task for {}", subject_key);
        tasks.remove(0)
    }
}
