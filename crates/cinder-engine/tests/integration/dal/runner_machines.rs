/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use chrono::{Duration, Utc};
use cinder_engine::services::{CleanupOutcome, StaleMachinesCleanupService};

#[test]
fn test_stale_ids_applies_staleness_predicate() {
    let fixture = fixture_or_skip!();
    let now = Utc::now();
    let cutoff = now - Duration::days(7);

    let never_contacted = fixture.insert_test_machine(now - Duration::days(30), None);
    let silent = fixture.insert_test_machine(
        now - Duration::days(30),
        Some(now - Duration::days(10)),
    );
    fixture.insert_test_machine(now - Duration::days(30), Some(now - Duration::hours(1)));
    fixture.insert_test_machine(now - Duration::days(1), None);

    let ids = fixture
        .dal
        .runner_machines()
        .stale_ids(cutoff, 10)
        .expect("Failed to select stale machines");

    assert_eq!(ids, vec![never_contacted.id, silent.id]);
    assert_eq!(
        fixture
            .dal
            .runner_machines()
            .stale_ids(cutoff, 1)
            .expect("Failed to select stale machines"),
        vec![never_contacted.id]
    );
}

#[test]
fn test_delete_by_ids_removes_exactly_the_given_rows() {
    let fixture = fixture_or_skip!();
    let now = Utc::now();
    let a = fixture.insert_test_machine(now, None);
    let b = fixture.insert_test_machine(now, None);

    let machines = fixture.dal.runner_machines();
    assert_eq!(machines.delete_by_ids(&[]).unwrap(), 0);
    assert_eq!(machines.delete_by_ids(&[a.id, a.id, -1]).unwrap(), 1);
    assert!(machines.find(a.id).unwrap().is_none());
    assert!(machines.find(b.id).unwrap().is_some());
}

#[test]
fn test_reap_removes_stale_machines_in_batches() {
    let fixture = fixture_or_skip!();
    let now = Utc::now();
    for _ in 0..5 {
        fixture.insert_test_machine(now - Duration::days(30), None);
    }
    let fresh = fixture.insert_test_machine(now - Duration::days(30), Some(now));

    let outcome = StaleMachinesCleanupService::new(&fixture.dal)
        .with_limits(4, 2)
        .reap_at(now)
        .expect("Cleanup failed");

    assert_eq!(outcome, CleanupOutcome { deleted: true });
    assert_eq!(fixture.dal.runner_machines().count().unwrap(), 2);
    assert!(fixture.dal.runner_machines().find(fresh.id).unwrap().is_some());

    let outcome = StaleMachinesCleanupService::new(&fixture.dal)
        .reap_at(now)
        .expect("Cleanup failed");
    assert_eq!(outcome, CleanupOutcome { deleted: true });
    assert_eq!(fixture.dal.runner_machines().count().unwrap(), 1);

    let outcome = StaleMachinesCleanupService::new(&fixture.dal)
        .reap_at(now)
        .expect("Cleanup failed");
    assert_eq!(outcome, CleanupOutcome { deleted: false });
}

#[test]
fn test_touch_keeps_machine_fresh() {
    let fixture = fixture_or_skip!();
    let now = Utc::now();
    let machine = fixture.insert_test_machine(now - Duration::days(30), None);

    fixture
        .dal
        .runner_machines()
        .touch(machine.id, now)
        .expect("Failed to touch machine");

    let ids = fixture
        .dal
        .runner_machines()
        .stale_ids(now - Duration::days(7), 10)
        .unwrap();
    assert!(!ids.contains(&machine.id));
}
