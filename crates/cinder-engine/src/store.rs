/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Persistence capabilities the services are written against.
//!
//! The services never touch the connection pool directly; [`crate::dal::DAL`]
//! implements these traits for PostgreSQL and the unit tests implement them in
//! memory.

use crate::error::{StoreError, WriteError};
use chrono::{DateTime, Utc};
use cinder_models::models::{Job, PipelineSchedule};

/// A record carrying an optimistic lock version.
pub trait VersionedRecord: Clone {
    fn id(&self) -> i64;
    fn lock_version(&self) -> i32;
}

impl VersionedRecord for Job {
    fn id(&self) -> i64 {
        self.id
    }

    fn lock_version(&self) -> i32 {
        self.lock_version
    }
}

/// Compare-and-swap access to versioned records.
pub trait VersionedStore<T: VersionedRecord> {
    /// Reads the current stored state of a record.
    fn read(&self, id: i64) -> Result<Option<T>, StoreError>;

    /// Persists `record` only if the stored version still equals
    /// `expected_version`. The stored version becomes `expected_version + 1`
    /// and the saved record is returned.
    fn write_if_version(&self, record: &T, expected_version: i32) -> Result<T, WriteError>;
}

/// Job lookups needed beyond compare-and-swap.
pub trait JobStore: VersionedStore<Job> {
    /// Skipped jobs of `pipeline_id` in stages after `stage_idx`.
    fn skipped_after_stage(&self, pipeline_id: i64, stage_idx: i32)
        -> Result<Vec<Job>, StoreError>;
}

pub trait ScheduleStore {
    fn find_schedule(&self, schedule_id: i64) -> Result<Option<PipelineSchedule>, StoreError>;

    /// Whether the project exists and is neither deleted nor pending deletion.
    fn project_active(&self, project_id: i64) -> Result<bool, StoreError>;

    fn set_next_run_at(
        &self,
        schedule_id: i64,
        next_run_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Active schedules whose `next_run_at` is at or before `now`.
    fn runnable(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<PipelineSchedule>, StoreError>;

    /// Stops a schedule from being picked up again.
    fn deactivate(&self, schedule_id: i64) -> Result<(), StoreError>;
}

/// Bounded selection and deletion of stale runner machines.
pub trait StaleMachineStore {
    /// Ids of at most `limit` machines created and last contacted at or before `cutoff`.
    fn stale_ids(&self, cutoff: DateTime<Utc>, limit: i64) -> Result<Vec<i64>, StoreError>;

    /// Deletes exactly the given ids, returning the number of rows removed.
    fn delete_by_ids(&self, ids: &[i64]) -> Result<usize, StoreError>;
}
