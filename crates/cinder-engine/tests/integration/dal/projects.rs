/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use cinder_engine::store::ScheduleStore;

#[test]
fn test_create_and_find_project() {
    let fixture = fixture_or_skip!();

    let project = fixture.insert_test_project();
    let found = fixture
        .dal
        .projects()
        .find(project.id)
        .expect("Query failed")
        .expect("Project should exist");

    assert_eq!(found.name, project.name);
    assert!(found.is_active());
}

#[test]
fn test_project_activity_follows_deletion_flags() {
    let fixture = fixture_or_skip!();
    let pending = fixture.insert_test_project();
    let deleted = fixture.insert_test_project();
    let active = fixture.insert_test_project();

    fixture
        .dal
        .projects()
        .mark_pending_delete(pending.id)
        .expect("Failed to mark project");
    fixture
        .dal
        .projects()
        .soft_delete(deleted.id)
        .expect("Failed to delete project");

    assert!(!fixture.dal.project_active(pending.id).unwrap());
    assert!(!fixture.dal.project_active(deleted.id).unwrap());
    assert!(fixture.dal.project_active(active.id).unwrap());
    assert!(!fixture.dal.project_active(-1).unwrap());
}
