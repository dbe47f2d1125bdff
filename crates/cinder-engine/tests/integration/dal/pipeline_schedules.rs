/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use chrono::{Duration, Utc};
use cinder_engine::services::{
    AdvanceOutcome, ChannelDispatcher, LoggingRunHandler, PipelineScheduleService, RunDecision,
    ScheduledRun, ScheduledRunGuard,
};
use cinder_engine::store::ScheduleStore;
use std::sync::Arc;

#[test]
fn test_create_schedule_computes_next_run() {
    let fixture = fixture_or_skip!();
    let project = fixture.insert_test_project();
    let now = Utc::now();

    let schedule = fixture.insert_test_schedule(project.id, "*/5 * * * *", now);

    let next = schedule.next_run_at.expect("next_run_at should be set");
    assert!(next > now);
    assert!(next <= now + Duration::minutes(5));
    assert!(schedule.active);
}

#[test]
fn test_list_runnable_returns_due_active_schedules() {
    let fixture = fixture_or_skip!();
    let project = fixture.insert_test_project();
    let now = Utc::now();

    let due = fixture.insert_test_schedule(project.id, "0 3 * * *", now - Duration::days(2));
    let inactive = fixture.insert_test_schedule(project.id, "0 3 * * *", now - Duration::days(2));
    fixture
        .dal
        .pipeline_schedules()
        .set_active(inactive.id, false)
        .expect("Failed to deactivate schedule");
    fixture.insert_test_schedule(project.id, "0 3 * * *", now + Duration::days(2));

    let runnable = fixture
        .dal
        .pipeline_schedules()
        .list_runnable(now, 10)
        .expect("Failed to list runnable schedules");

    assert_eq!(runnable.iter().map(|s| s.id).collect::<Vec<_>>(), vec![due.id]);
}

#[test]
fn test_advance_persists_then_dispatches() {
    let fixture = fixture_or_skip!();
    let project = fixture.insert_test_project();
    let now = Utc::now();
    let schedule = fixture.insert_test_schedule(project.id, "0 3 * * *", now - Duration::days(2));
    let (dispatcher, mut receiver) = ChannelDispatcher::new(4);

    let outcome = PipelineScheduleService::new(&fixture.dal, &dispatcher)
        .advance_at(&schedule, schedule.owner_id, now)
        .expect("Failed to advance schedule");

    let AdvanceOutcome::Advanced { next_run_at } = outcome else {
        panic!("expected the schedule to advance, got {:?}", outcome);
    };
    assert!(next_run_at > now);

    let stored = fixture
        .dal
        .pipeline_schedules()
        .find(schedule.id)
        .expect("Query failed")
        .expect("Schedule should exist");
    assert_eq!(stored.next_run_at, Some(next_run_at));

    let run = receiver.try_recv().expect("A run should be dispatched");
    assert_eq!(run.schedule_id, schedule.id);
    assert_eq!(run.actor_id, Some(42));
    assert!(run.next_run_scheduled);
}

#[test]
fn test_advance_skips_schedules_of_inactive_projects() {
    let fixture = fixture_or_skip!();
    let project = fixture.insert_test_project();
    let now = Utc::now();
    let schedule = fixture.insert_test_schedule(project.id, "0 3 * * *", now - Duration::days(2));
    fixture
        .dal
        .projects()
        .mark_pending_delete(project.id)
        .expect("Failed to mark project");
    let (dispatcher, mut receiver) = ChannelDispatcher::new(4);

    let outcome = PipelineScheduleService::new(&fixture.dal, &dispatcher)
        .advance_at(&schedule, schedule.owner_id, now)
        .expect("Advance should not fail");

    assert_eq!(outcome, AdvanceOutcome::Skipped);
    assert!(receiver.try_recv().is_err());
    let stored = fixture
        .dal
        .pipeline_schedules()
        .find(schedule.id)
        .expect("Query failed")
        .expect("Schedule should exist");
    assert_eq!(stored.next_run_at, schedule.next_run_at);
}

#[test]
fn test_run_due_advances_each_schedule_once() {
    let fixture = fixture_or_skip!();
    let project = fixture.insert_test_project();
    let now = Utc::now();
    fixture.insert_test_schedule(project.id, "0 3 * * *", now - Duration::days(2));
    fixture.insert_test_schedule(project.id, "30 4 * * *", now - Duration::days(3));
    let (dispatcher, _receiver) = ChannelDispatcher::new(8);
    let service = PipelineScheduleService::new(&fixture.dal, &dispatcher);

    assert_eq!(service.run_due(now, 10).expect("run_due failed"), 2);
    assert_eq!(service.run_due(now, 10).expect("run_due failed"), 0);
}

#[test]
fn test_manual_run_through_guard_advances_due_schedule() {
    let fixture = fixture_or_skip!();
    let project = fixture.insert_test_project();
    let now = Utc::now();
    let schedule = fixture.insert_test_schedule(project.id, "0 3 * * *", now - Duration::days(2));
    let guard = ScheduledRunGuard::new(Arc::new(fixture.dal.clone()), Arc::new(LoggingRunHandler));

    let decision = guard
        .handle_at(
            ScheduledRun {
                schedule_id: schedule.id,
                actor_id: None,
                next_run_scheduled: false,
            },
            now,
        )
        .expect("Failed to handle run");

    assert_eq!(decision, RunDecision::Run);
    let stored = fixture
        .dal
        .find_schedule(schedule.id)
        .expect("Query failed")
        .expect("Schedule should exist");
    assert!(stored.next_run_at.expect("next_run_at should be set") > now);
}

#[test]
fn test_deactivated_schedule_is_no_longer_runnable() {
    let fixture = fixture_or_skip!();
    let project = fixture.insert_test_project();
    let now = Utc::now();
    let schedule = fixture.insert_test_schedule(project.id, "0 3 * * *", now - Duration::days(2));

    fixture
        .dal
        .deactivate(schedule.id)
        .expect("Failed to deactivate schedule");

    assert!(fixture
        .dal
        .runnable(now, 10)
        .expect("Query failed")
        .is_empty());
}
