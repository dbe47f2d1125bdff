/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use cinder_engine::error::WriteError;
use cinder_engine::services::{EnqueueJobService, ResetSkippedJobsService};
use cinder_models::models::{JobStatus, JobVariables};

#[test]
fn test_create_and_find_job() {
    let fixture = fixture_or_skip!();
    let project = fixture.insert_test_project();

    let created = fixture.insert_test_job(project.id, 1, 0, JobStatus::Created);
    let found = fixture
        .dal
        .jobs()
        .find(created.id)
        .expect("Failed to find job")
        .expect("Job should exist");

    assert_eq!(found, created);
    assert_eq!(found.lock_version, 0);
    assert_eq!(found.status, JobStatus::Created);
    assert!(found.variables().is_empty());
}

#[test]
fn test_find_missing_job() {
    let fixture = fixture_or_skip!();

    assert!(fixture.dal.jobs().find(-1).expect("Query failed").is_none());
}

#[test]
fn test_update_if_version_bumps_version() {
    let fixture = fixture_or_skip!();
    let project = fixture.insert_test_project();
    let mut job = fixture.insert_test_job(project.id, 1, 0, JobStatus::Created);

    job.status = JobStatus::Pending;
    job.user_id = Some(7);
    let saved = fixture
        .dal
        .jobs()
        .update_if_version(&job, 0)
        .expect("Failed to update job");

    assert_eq!(saved.lock_version, 1);
    assert_eq!(saved.status, JobStatus::Pending);
    assert_eq!(saved.user_id, Some(7));
}

#[test]
fn test_update_if_version_detects_stale_copy() {
    let fixture = fixture_or_skip!();
    let project = fixture.insert_test_project();
    let job = fixture.insert_test_job(project.id, 1, 0, JobStatus::Created);

    fixture
        .dal
        .jobs()
        .update_if_version(&job, 0)
        .expect("First write should succeed");
    let result = fixture.dal.jobs().update_if_version(&job, 0);

    assert!(matches!(result, Err(WriteError::VersionConflict)));
}

#[test]
fn test_list_skipped_after_stage() {
    let fixture = fixture_or_skip!();
    let project = fixture.insert_test_project();
    fixture.insert_test_job(project.id, 5, 0, JobStatus::Skipped);
    let later = fixture.insert_test_job(project.id, 5, 1, JobStatus::Skipped);
    fixture.insert_test_job(project.id, 5, 2, JobStatus::Created);
    fixture.insert_test_job(project.id, 6, 3, JobStatus::Skipped);

    let skipped = fixture
        .dal
        .jobs()
        .list_skipped_after_stage(5, 0)
        .expect("Failed to list skipped jobs");

    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].id, later.id);
}

#[test]
fn test_enqueue_job_end_to_end() {
    let fixture = fixture_or_skip!();
    let project = fixture.insert_test_project();
    let job = fixture.insert_test_job(project.id, 9, 0, JobStatus::Manual);
    let skipped = fixture.insert_test_job(project.id, 9, 1, JobStatus::Skipped);

    let mut variables = JobVariables::new();
    variables.insert("DEPLOY_ENV".to_string(), "staging".to_string());

    let resetter = ResetSkippedJobsService::new(&fixture.dal);
    let saved = EnqueueJobService::new(&fixture.dal, &resetter)
        .enqueue(job, 31, Some(variables.clone()))
        .expect("Failed to enqueue job");

    assert_eq!(saved.status, JobStatus::Pending);
    assert_eq!(saved.user_id, Some(31));
    assert_eq!(saved.lock_version, 1);
    assert_eq!(saved.variables(), variables);

    let reset = fixture
        .dal
        .jobs()
        .find(skipped.id)
        .expect("Query failed")
        .expect("Job should exist");
    assert_eq!(reset.status, JobStatus::Created);
    assert_eq!(reset.lock_version, 1);
}

#[test]
fn test_enqueue_with_stale_copy_retries_on_fresh_state() {
    let fixture = fixture_or_skip!();
    let project = fixture.insert_test_project();
    let job = fixture.insert_test_job(project.id, 11, 0, JobStatus::Created);

    let mut competing = job.clone();
    competing.user_id = Some(1);
    fixture
        .dal
        .jobs()
        .update_if_version(&competing, 0)
        .expect("Competing write should succeed");

    let resetter = ResetSkippedJobsService::new(&fixture.dal);
    let saved = EnqueueJobService::new(&fixture.dal, &resetter)
        .enqueue(job, 2, None)
        .expect("Failed to enqueue job");

    assert_eq!(saved.status, JobStatus::Pending);
    assert_eq!(saved.user_id, Some(2));
    assert_eq!(saved.lock_version, 2);
}
