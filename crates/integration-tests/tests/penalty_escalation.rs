//! Late-cancellation ladder
//!
//! Every shift is awarded up front (suspended accounts cannot be awarded)
//! and cancelled two hours before it starts.

mod common;

use chrono::{DateTime, Duration, Utc};
use common::*;
use shiftline_core::application::FireOutcome;
use shiftline_core::domain::{
    subject_key, AudienceMode, JobName, NotificationKind, PenaltyTier, Shift, ShiftStatus,
    TaskState,
};
use shiftline_core::port::{ShiftRepository, TaskRepository};

/// `h:00` on day `d` after the fixture's base date
fn day(d: i64, h: u32) -> DateTime<Utc> {
    at(h, 0) + Duration::days(d)
}

/// 12:00-14:00 shift on day `d`, accepted by `contractor_id`
async fn booked(h: &Harness, contractor_id: &str, d: i64) -> Shift {
    let shift = h
        .shifts
        .create_shift(&manager(), new_shift(day(d, 12), day(d, 14), AudienceMode::Market))
        .await
        .unwrap();
    h.shifts
        .award_shift(&shift.id, contractor_id, &manager())
        .await
        .unwrap();
    h.shifts
        .accept_shift(&shift.id, &contractor(contractor_id))
        .await
        .unwrap()
}

async fn cancel_late(h: &Harness, shift: &Shift, d: i64) {
    h.set_time(day(d, 10));
    h.shifts
        .cancel_shift(&shift.id, &contractor(C1), Some("sick".to_string()))
        .await
        .unwrap();
}

fn reactivations(subject: &str) -> String {
    subject_key(JobName::ReactivateUser, subject)
}

fn last_penalty_message(h: &Harness) -> String {
    h.notifier
        .sent_to(C1)
        .into_iter()
        .filter(|n| n.kind == NotificationKind::Penalty)
        .last()
        .map(|n| n.message)
        .unwrap_or_default()
}

#[tokio::test]
async fn test_ladder_escalates_from_warning_to_ban() {
    let h = Harness::new().await;
    let mut shifts = Vec::new();
    for d in [0, 10, 20, 30, 40] {
        shifts.push(booked(&h, C1, d).await);
    }

    // First: warning only
    cancel_late(&h, &shifts[0], 0).await;
    assert!(last_penalty_message(&h).contains("call support"));
    assert!(h.accounts.account(C1).unwrap().active);
    assert!(h.tasks_for(&reactivations(C1)).await.is_empty());

    // Second inside 45 days: 14 day suspension
    cancel_late(&h, &shifts[1], 10).await;
    let account = h.accounts.account(C1).unwrap();
    assert!(!account.active);
    assert!(!account.verified);
    assert_eq!(h.accounts.invalidations(C1), 1);
    assert!(last_penalty_message(&h).contains("suspended for 14 days"));
    let first_reactivation = h.task_for(&reactivations(C1)).await;
    assert_eq!(first_reactivation.fire_at, day(24, 10));

    // Third: 30 days, replacing the pending reactivation
    cancel_late(&h, &shifts[2], 20).await;
    assert_eq!(h.accounts.invalidations(C1), 2);
    assert!(last_penalty_message(&h).contains("third"));
    let reactivation_tasks = h.tasks_for(&reactivations(C1)).await;
    assert_eq!(reactivation_tasks.len(), 2);
    assert_eq!(reactivation_tasks[0].state, TaskState::Superseded);
    assert_eq!(reactivation_tasks[1].state, TaskState::Pending);
    assert_eq!(reactivation_tasks[1].fire_at, day(50, 10));

    // Fourth: indefinite, nothing left to reactivate the account
    cancel_late(&h, &shifts[3], 30).await;
    assert!(last_penalty_message(&h).contains("fourth"));
    assert!(h
        .tasks_for(&reactivations(C1))
        .await
        .iter()
        .all(|t| t.state == TaskState::Superseded));
    assert!(!h.accounts.account(C1).unwrap().active);

    // Fifth: ban
    cancel_late(&h, &shifts[4], 40).await;
    assert!(last_penalty_message(&h).contains("banned"));
    assert_eq!(h.accounts.invalidations(C1), 4);
    assert_eq!(h.notifier.count_of(NotificationKind::Penalty), 5);

    let history = h.store.find_cancellations_by(C1).await.unwrap();
    assert_eq!(history.len(), 5);
    assert_eq!(history[0].shift_id, shifts[4].id);
    assert_eq!(history[0].reason.as_deref(), Some("sick"));

    // Every cancelled shift went back to the market
    for shift in &shifts {
        let reopened = h.reload(&shift.id).await;
        assert_eq!(reopened.status, ShiftStatus::Pending);
        assert!(reopened.contractor_id.is_none());
    }
}

#[tokio::test]
async fn test_suspension_lifted_by_reactivation_job() {
    let h = Harness::new().await;
    let first = booked(&h, C1, 0).await;
    let second = booked(&h, C1, 10).await;

    cancel_late(&h, &first, 0).await;
    cancel_late(&h, &second, 10).await;
    assert!(!h.accounts.account(C1).unwrap().active);

    // Not yet
    h.set_time(day(24, 9));
    let reactivation = h.task_for(&reactivations(C1)).await;
    assert!(matches!(
        h.dispatcher.on_fire(&reactivation.id).await.unwrap(),
        FireOutcome::NotDue(_)
    ));
    assert!(!h.accounts.account(C1).unwrap().active);

    h.set_time(day(24, 10));
    h.dispatcher.drain_due().await.unwrap();
    let account = h.accounts.account(C1).unwrap();
    assert!(account.active);
    assert!(account.verified);

    // Delivering it again changes nothing
    let outcome = h.dispatcher.on_fire(&reactivation.id).await.unwrap();
    assert_eq!(outcome, FireOutcome::NoOp("account already active".to_string()));
    assert!(h.accounts.account(C1).unwrap().active);

    // The reactivated contractor can be awarded again
    let next = booked(&h, C1, 30).await;
    assert_eq!(next.status, ShiftStatus::Accepted);
}

/// Two late cancellations 50 days apart fall outside the window
#[tokio::test]
async fn test_escalation_window_anchored_at_oldest_cancellation() {
    let h = Harness::new().await;
    let first = booked(&h, C1, 0).await;
    let second = booked(&h, C1, 50).await;

    cancel_late(&h, &first, 0).await;
    cancel_late(&h, &second, 50).await;

    assert!(h.accounts.account(C1).unwrap().active);
    assert_eq!(h.accounts.invalidations(C1), 0);
    assert!(h.tasks_for(&reactivations(C1)).await.is_empty());
    assert_eq!(h.notifier.count_of(NotificationKind::Penalty), 1);
}

#[tokio::test]
async fn test_early_cancellation_does_not_count() {
    let h = Harness::new().await;
    let early = booked(&h, C1, 1).await;
    let late = booked(&h, C1, 10).await;

    // 30 hours ahead of the shift
    h.set_time(day(0, 6));
    h.shifts
        .cancel_shift(&early.id, &contractor(C1), None)
        .await
        .unwrap();
    assert_eq!(h.notifier.count_of(NotificationKind::Penalty), 0);

    cancel_late(&h, &late, 10).await;
    assert!(h.accounts.account(C1).unwrap().active);
    assert!(last_penalty_message(&h).contains("call support"));
    assert_eq!(h.store.find_cancellations_by(C1).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_admin_cancellation_carries_no_penalty() {
    let h = Harness::new().await;
    let first = booked(&h, C1, 0).await;
    let second = booked(&h, C1, 10).await;

    for (shift, d) in [(&first, 0), (&second, 10)] {
        h.set_time(day(d, 10));
        h.shifts.cancel_shift(&shift.id, &admin(), None).await.unwrap();
    }

    assert!(h.accounts.account(C1).unwrap().active);
    assert_eq!(h.notifier.count_of(NotificationKind::Penalty), 0);
    assert!(h.store.find_cancellations_by(C1).await.unwrap().is_empty());
    assert_eq!(h.store.find_cancellations_by(ADMIN).await.unwrap().len(), 2);

    // Admin cancellations never feed the contractor's ladder
    let third = booked(&h, C1, 20).await;
    cancel_late(&h, &third, 20).await;
    assert!(h.accounts.account(C1).unwrap().active);
    assert!(last_penalty_message(&h).contains("call support"));
}

#[tokio::test]
async fn test_preview_projects_without_mutating() {
    let h = Harness::new().await;
    let prior = booked(&h, C1, 0).await;
    let upcoming = booked(&h, C1, 2).await;

    // Well ahead of the late window
    let preview = h.shifts.penalty_preview(&contractor(C1), &upcoming.id).await.unwrap();
    assert_eq!(preview.projected_tier, PenaltyTier::NoAction);
    assert_eq!(preview.projected_message, "No penalty");
    assert_eq!(preview.window_deadline, day(2, 0));
    assert_eq!(preview.qualifying_count, 0);

    cancel_late(&h, &prior, 0).await;

    h.set_time(day(2, 1));
    let preview = h.shifts.penalty_preview(&contractor(C1), &upcoming.id).await.unwrap();
    assert_eq!(preview.qualifying_count, 1);
    assert_eq!(preview.projected_tier, PenaltyTier::Suspension { days: 14 });
    assert_eq!(preview.projected_message, "You will be suspended for 14 days");

    // Nothing happened
    assert_eq!(h.reload(&upcoming.id).await.status, ShiftStatus::Accepted);
    assert!(h.accounts.account(C1).unwrap().active);
    assert_eq!(h.store.find_cancellations_by(C1).await.unwrap().len(), 1);
    assert!(h.tasks_for(&reactivations(C1)).await.is_empty());
}

fn suspensions(user_id: &str) -> String {
    subject_key(JobName::SuspendUser, user_id)
}

/// The cancellation commits even when the account service is down; the
/// suspension is finished by its job.
#[tokio::test]
async fn test_suspension_completed_by_job_after_account_outage() {
    let h = Harness::new().await;
    let first = booked(&h, C1, 0).await;
    let second = booked(&h, C1, 10).await;
    cancel_late(&h, &first, 0).await;

    h.flaky.fail_next(AccountCall::Deactivate, 2);
    cancel_late(&h, &second, 10).await;

    // Nothing suspended yet, but the decision and every notice are recorded
    assert!(h.accounts.account(C1).unwrap().active);
    assert_eq!(h.notifier.count_of(NotificationKind::ShiftCancelled), 2);
    assert!(last_penalty_message(&h).contains("suspended for 14 days"));
    assert_eq!(h.task_for(&reactivations(C1)).await.fire_at, day(24, 10));
    let suspension = h.task_for(&suspensions(C1)).await;
    assert_eq!(suspension.state, TaskState::Pending);
    assert_eq!(suspension.fire_at, day(10, 10));

    // Outage lasts one more attempt
    let outcome = h.dispatcher.on_fire(&suspension.id).await.unwrap();
    assert!(matches!(outcome, FireOutcome::Retrying { attempt: 1, .. }));
    assert!(h.accounts.account(C1).unwrap().active);

    h.advance(Duration::seconds(5));
    assert_eq!(h.dispatcher.on_fire(&suspension.id).await.unwrap(), FireOutcome::Applied);
    let account = h.accounts.account(C1).unwrap();
    assert!(!account.active);
    assert!(!account.verified);
    assert_eq!(h.accounts.invalidations(C1), 1);
}

#[tokio::test]
async fn test_applied_suspension_retires_its_job() {
    let h = Harness::new().await;
    let first = booked(&h, C1, 0).await;
    let second = booked(&h, C1, 10).await;
    cancel_late(&h, &first, 0).await;
    cancel_late(&h, &second, 10).await;

    assert_eq!(
        h.task_for(&suspensions(C1)).await.state,
        TaskState::Superseded
    );
    h.dispatcher.drain_due().await.unwrap();
    assert_eq!(h.accounts.invalidations(C1), 1);
}

/// Reactivation writes active then verified; a failure in between is
/// finished on retry instead of being mistaken for "already active".
#[tokio::test]
async fn test_reactivation_retry_finishes_partial_write() {
    let h = Harness::new().await;
    let first = booked(&h, C1, 0).await;
    let second = booked(&h, C1, 10).await;
    cancel_late(&h, &first, 0).await;
    cancel_late(&h, &second, 10).await;

    h.set_time(day(24, 10));
    let reactivation = h.task_for(&reactivations(C1)).await;
    h.flaky.fail_next(AccountCall::Verify, 1);

    let outcome = h.dispatcher.on_fire(&reactivation.id).await.unwrap();
    assert!(matches!(outcome, FireOutcome::Retrying { attempt: 1, .. }));
    let halfway = h.accounts.account(C1).unwrap();
    assert!(halfway.active);
    assert!(!halfway.verified);

    h.advance(Duration::seconds(5));
    assert_eq!(h.dispatcher.on_fire(&reactivation.id).await.unwrap(), FireOutcome::Applied);
    let account = h.accounts.account(C1).unwrap();
    assert!(account.active);
    assert!(account.verified);

    let outcome = h.dispatcher.on_fire(&reactivation.id).await.unwrap();
    assert_eq!(outcome, FireOutcome::NoOp("account already active".to_string()));

    // Verified again, so awardable again
    let next = booked(&h, C1, 30).await;
    assert_eq!(next.status, ShiftStatus::Accepted);
}
