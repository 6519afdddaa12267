//! Deferred job delivery
//!
//! Enforcement jobs, reminders, retries, panic isolation, crash recovery and
//! the polling loop.

mod common;

use async_trait::async_trait;
use chrono::Duration;
use common::*;
use shiftline_core::application::{
    shutdown_channel, FireOutcome, RecoveryService, TaskDispatcher,
};
use shiftline_core::domain::{
    AudienceMode, GeoPoint, JobName, Notification, NotificationKind, ShiftStatus, TaskPayload,
    TaskState,
};
use shiftline_core::port::{NotificationService, ShiftRepository, TaskRepository};
use std::sync::Arc;

/// A shift nobody clocked in to is withdrawn once, and only once
#[tokio::test]
async fn test_enforce_clock_in_rescinds_and_is_idempotent() {
    let h = Harness::new().await;
    let shift = h.accepted_shift(C1).await;

    h.set_time(at(9, 15));
    // Reminder (08:00) and clock-in enforcement (09:15) are due
    assert_eq!(h.dispatcher.drain_due().await.unwrap(), 2);

    let rescinded = h.reload(&shift.id).await;
    assert_eq!(rescinded.status, ShiftStatus::Pending);
    assert!(rescinded.contractor_id.is_none());
    assert!(!rescinded.active);
    assert_eq!(rescinded.audience, AudienceMode::Market);

    let rescind_notices: Vec<_> = h
        .notifier
        .sent()
        .into_iter()
        .filter(|n| n.kind == NotificationKind::OfferRescinded)
        .collect();
    assert_eq!(rescind_notices.len(), 2);
    assert!(rescind_notices.iter().any(|n| n.user_id == C1));
    assert!(rescind_notices.iter().any(|n| n.user_id == MANAGER));
    assert_eq!(rescind_notices[0].title, "Shift offer Rescinded");

    // Second delivery of the same job changes nothing
    let job = h.task_for(&format!("ENFORCE_CLOCK_IN:{}", shift.id)).await;
    assert_eq!(job.state, TaskState::Delivered);
    let outcome = h.dispatcher.on_fire(&job.id).await.unwrap();
    assert!(matches!(outcome, FireOutcome::NoOp(_)));
    assert_eq!(h.reload(&shift.id).await.version, rescinded.version);
    assert_eq!(h.notifier.count_of(NotificationKind::OfferRescinded), 2);

    // A rescinded shift can no longer be awarded
    assert!(h.shifts.award_shift(&shift.id, C2, &manager()).await.is_err());
}

#[tokio::test]
async fn test_enforce_clock_in_after_clock_in_is_noop() {
    let h = Harness::new().await;
    let shift = h.accepted_shift(C1).await;

    h.set_time(at(9, 5));
    h.shifts.clock_in(&shift.id, &contractor(C1), here()).await.unwrap();

    h.set_time(at(9, 15));
    let job = h.task_for(&format!("ENFORCE_CLOCK_IN:{}", shift.id)).await;
    let outcome = h.dispatcher.on_fire(&job.id).await.unwrap();
    assert!(matches!(outcome, FireOutcome::NoOp(_)));
    assert_eq!(h.reload(&shift.id).await.status, ShiftStatus::Ongoing);
}

/// Contractor forgot to clock out
#[tokio::test]
async fn test_enforce_clock_out_completes_and_bills_once() {
    let h = Harness::new().await;
    let shift = h.accepted_shift(C1).await;
    h.set_time(at(9, 0));
    h.shifts.clock_in(&shift.id, &contractor(C1), here()).await.unwrap();

    let job = h.task_for(&format!("ENFORCE_CLOCK_OUT:{}", shift.id)).await;
    h.set_time(at(17, 15));
    let outcome = h.dispatcher.on_fire(&job.id).await.unwrap();
    assert_eq!(outcome, FireOutcome::Applied);

    let completed = h.reload(&shift.id).await;
    assert_eq!(completed.status, ShiftStatus::Completed);
    assert_eq!(completed.actual_clock_out, Some(at(17, 0)));
    assert_eq!(completed.clock_out_location, Some(GeoPoint::ZERO));

    let billing = h.store.find_billing(&shift.id).await.unwrap().unwrap();
    assert_eq!(billing.gross, 400.0);
    assert_eq!(billing.contractor_share, 220.0);

    let rate = h.notifier.sent_to(C1);
    let rate = rate.last().unwrap();
    assert_eq!(rate.kind, NotificationKind::RateHotel);
    assert_eq!(rate.title, "Shift Ended");

    // Re-delivery finds a completed shift
    let outcome = h.dispatcher.on_fire(&job.id).await.unwrap();
    assert!(matches!(outcome, FireOutcome::NoOp(_)));
    let bills: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM billings")
        .fetch_one(&h.pool)
        .await
        .unwrap();
    assert_eq!(bills, 1);
}

#[tokio::test]
async fn test_enforce_clock_out_on_unstarted_shift_is_noop() {
    let h = Harness::new().await;
    let shift = h.market_shift().await;

    let job = h.task_for(&format!("ENFORCE_CLOCK_OUT:{}", shift.id)).await;
    h.set_time(at(17, 15));
    let outcome = h.dispatcher.on_fire(&job.id).await.unwrap();
    assert!(matches!(outcome, FireOutcome::NoOp(_)));
    assert_eq!(h.reload(&shift.id).await.status, ShiftStatus::Pending);
}

#[tokio::test]
async fn test_fire_before_due_does_nothing() {
    let h = Harness::new().await;
    let shift = h.market_shift().await;
    let job = h.task_for(&format!("ENFORCE_CLOCK_IN:{}", shift.id)).await;

    let outcome = h.dispatcher.on_fire(&job.id).await.unwrap();
    assert_eq!(outcome, FireOutcome::NotDue(at(9, 15)));
    assert_eq!(h.dispatcher.drain_due().await.unwrap(), 0);

    let untouched = h.tasks.find_by_id(&job.id).await.unwrap().unwrap();
    assert_eq!(untouched.state, TaskState::Pending);
    assert_eq!(untouched.attempts, 0);
    assert_eq!(h.tasks.next_fire_at().await.unwrap(), Some(at(9, 15)));
}

#[tokio::test]
async fn test_reminder_delivered_to_current_assignee_only() {
    let h = Harness::new().await;
    let shift = h.accepted_shift(C1).await;

    h.set_time(at(8, 0));
    let reminder = h.task_for(&format!("SEND_REMINDER:{}", shift.id)).await;
    assert_eq!(h.dispatcher.on_fire(&reminder.id).await.unwrap(), FireOutcome::Applied);
    assert_eq!(h.notifier.sent_to(C1).last().unwrap().kind, NotificationKind::ShiftReminder);

    // A stale reminder for someone else re-validates to a no-op
    let stale = h
        .dispatcher
        .schedule(
            JobName::SendReminder,
            &shift.id,
            at(8, 0),
            TaskPayload::new()
                .with("shift_id", shift.id.clone())
                .with("contractor_id", C2),
        )
        .await
        .unwrap();
    let outcome = h.dispatcher.on_fire(&stale).await.unwrap();
    assert!(matches!(outcome, FireOutcome::NoOp(_)));
    assert!(h.notifier.sent_to(C2).is_empty());

    // The delivered reminder was not pending, so nothing was superseded
    let all = h.tasks_for(&format!("SEND_REMINDER:{}", shift.id)).await;
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].state, TaskState::Delivered);
    assert_eq!(all[1].state, TaskState::Delivered);
}

#[tokio::test]
async fn test_superseded_reminder_is_skipped() {
    let h = Harness::new().await;
    let shift = h.accepted_shift(C1).await;
    h.shifts.decline_shift(&shift.id, &contractor(C1)).await.unwrap();

    h.set_time(at(8, 0));
    let reminder = h.task_for(&format!("SEND_REMINDER:{}", shift.id)).await;
    assert_eq!(
        h.dispatcher.on_fire(&reminder.id).await.unwrap(),
        FireOutcome::Skipped(TaskState::Superseded)
    );

    // Re-accepting arms a fresh reminder next to the superseded one
    h.set_time(at(6, 30));
    h.shifts.award_shift(&shift.id, C1, &manager()).await.unwrap();
    h.shifts.accept_shift(&shift.id, &contractor(C1)).await.unwrap();
    let reminders = h.tasks_for(&format!("SEND_REMINDER:{}", shift.id)).await;
    assert_eq!(reminders.len(), 2);
    assert_eq!(reminders[0].state, TaskState::Superseded);
    assert_eq!(reminders[1].state, TaskState::Pending);
    assert_eq!(h.notifier.count_of(NotificationKind::ShiftReminder), 0);
}

#[tokio::test]
async fn test_failing_job_retries_with_backoff_then_fails() {
    let h = Harness::new().await;
    let task_id = h
        .dispatcher
        .schedule(
            JobName::ReactivateUser,
            "ghost",
            at(6, 0),
            TaskPayload::new().with("user_id", "ghost"),
        )
        .await
        .unwrap();

    let first = h.dispatcher.on_fire(&task_id).await.unwrap();
    let FireOutcome::Retrying { attempt, fire_at } = first else {
        panic!("expected a retry, got {:?}", first);
    };
    assert_eq!(attempt, 1);
    assert!(fire_at >= at(6, 0) + Duration::milliseconds(900));
    assert!(fire_at <= at(6, 0) + Duration::milliseconds(1100));

    let requeued = h.tasks.find_by_id(&task_id).await.unwrap().unwrap();
    assert_eq!(requeued.state, TaskState::Pending);
    assert!(requeued.last_error.is_some());

    h.advance(Duration::seconds(5));
    let second = h.dispatcher.on_fire(&task_id).await.unwrap();
    assert!(matches!(second, FireOutcome::Retrying { attempt: 2, .. }));

    h.advance(Duration::seconds(5));
    let third = h.dispatcher.on_fire(&task_id).await.unwrap();
    assert!(matches!(third, FireOutcome::Failed(_)));

    let failed = h.tasks.find_by_id(&task_id).await.unwrap().unwrap();
    assert_eq!(failed.state, TaskState::Failed);
    assert_eq!(failed.attempts, 3);
    assert!(failed.finished_at.is_some());

    // Failed tasks are kept but never delivered again
    assert_eq!(
        h.dispatcher.on_fire(&task_id).await.unwrap(),
        FireOutcome::Skipped(TaskState::Failed)
    );
}

/// Panics while sending reminders
struct ExplodingNotifier;

#[async_trait]
impl NotificationService for ExplodingNotifier {
    async fn notify(&self, notification: Notification) {
        if notification.kind == NotificationKind::ShiftReminder {
            panic!("notification backend exploded");
        }
    }
}

/// A panicking handler fails its own task and the dispatcher keeps going
#[tokio::test]
async fn test_handler_panic_is_isolated() {
    let h = Harness::with_notifier(Arc::new(ExplodingNotifier)).await;
    let shift = h.accepted_shift(C1).await;

    h.set_time(at(9, 15));
    assert_eq!(h.dispatcher.drain_due().await.unwrap(), 2);

    let reminder = h.task_for(&format!("SEND_REMINDER:{}", shift.id)).await;
    assert_eq!(reminder.state, TaskState::Failed);
    assert_eq!(reminder.last_error.as_deref(), Some("handler panicked"));

    let enforcement = h.task_for(&format!("ENFORCE_CLOCK_IN:{}", shift.id)).await;
    assert_eq!(enforcement.state, TaskState::Delivered);
    assert!(!h.reload(&shift.id).await.active);
    println!("✅ Handler panic isolated, dispatcher continued");
}

#[tokio::test]
async fn test_recovery_requeues_stale_running_tasks() {
    let h = Harness::new().await;
    let shift = h.market_shift().await;

    // Claimed at 09:15, then the process died
    h.set_time(at(9, 15));
    let orphan = h.tasks.claim_next(at(9, 15)).await.unwrap().unwrap();
    assert_eq!(orphan.state, TaskState::Running);

    let recovery = RecoveryService::new(h.tasks.clone(), h.clock.clone(), None);

    // Still inside the recovery window
    h.set_time(at(9, 17));
    assert_eq!(recovery.recover_orphaned_tasks().await.unwrap(), 0);

    h.set_time(at(9, 30));
    assert_eq!(recovery.recover_orphaned_tasks().await.unwrap(), 1);
    let requeued = h.tasks.find_by_id(&orphan.id).await.unwrap().unwrap();
    assert_eq!(requeued.state, TaskState::Pending);
    assert!(requeued.started_at.is_none());

    // Handlers are idempotent, so the recovered task simply runs again
    assert_eq!(h.dispatcher.drain_due().await.unwrap(), 1);
    assert!(!h.reload(&shift.id).await.active);
}

#[tokio::test]
async fn test_run_loop_delivers_and_stops_on_shutdown() {
    let h = Harness::new().await;
    let shift = h.accepted_shift(C1).await;
    h.set_time(at(9, 15));

    let dispatcher = TaskDispatcher::new(h.ctx.clone(), h.tasks.clone())
        .with_poll_interval(std::time::Duration::from_millis(10));
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let handle = tokio::spawn(async move { dispatcher.run(shutdown_rx).await });

    let mut rescinded = false;
    for _ in 0..200 {
        if !h.reload(&shift.id).await.active {
            rescinded = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert!(rescinded, "dispatcher loop never delivered the due job");

    shutdown_tx.shutdown();
    let result = tokio::time::timeout(std::time::Duration::from_secs(2), handle)
        .await
        .expect("dispatcher did not stop")
        .unwrap();
    assert!(result.is_ok());
}

/// Preference lookups failing after commit fall back to defaults
#[tokio::test]
async fn test_rescind_notices_survive_account_lookup_failure() {
    let h = Harness::new().await;
    let shift = h.accepted_shift(C1).await;
    let job = h.task_for(&format!("ENFORCE_CLOCK_IN:{}", shift.id)).await;

    h.flaky.fail_next(AccountCall::Get, 2);
    h.set_time(at(9, 15));
    assert_eq!(h.dispatcher.on_fire(&job.id).await.unwrap(), FireOutcome::Applied);

    assert!(!h.reload(&shift.id).await.active);
    assert_eq!(h.notifier.count_of(NotificationKind::OfferRescinded), 2);
}

/// A task already claimed by another dispatcher is not run a second time
#[tokio::test]
async fn test_fire_skips_task_claimed_elsewhere() {
    let h = Harness::new().await;
    let shift = h.market_shift().await;
    let job = h.task_for(&format!("ENFORCE_CLOCK_IN:{}", shift.id)).await;

    h.set_time(at(9, 15));
    let claimed = h.tasks.claim_next(at(9, 15)).await.unwrap().unwrap();
    assert_eq!(claimed.id, job.id);

    assert_eq!(
        h.dispatcher.on_fire(&job.id).await.unwrap(),
        FireOutcome::Skipped(TaskState::Running)
    );
    assert!(h.reload(&shift.id).await.active);
    let stored = h.tasks.find_by_id(&job.id).await.unwrap().unwrap();
    assert_eq!(stored.state, TaskState::Running);
    assert_eq!(stored.attempts, 0);
}
