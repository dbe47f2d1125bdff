/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Data Access Layer
//!
//! PostgreSQL access for the Cinder engine, built on diesel and an r2d2
//! connection pool.
//!
//! [`DAL`] hands out one accessor per table. Each accessor borrows the DAL and
//! checks a connection out of the pool per call. The DAL also implements the
//! store traits from [`crate::store`], so it can be passed straight to the
//! services.

use crate::db::ConnectionPool;
use crate::error::{StoreError, WriteError};
use crate::store::{JobStore, ScheduleStore, StaleMachineStore, VersionedStore};
use chrono::{DateTime, Utc};
use cinder_models::models::{Job, PipelineSchedule};

pub mod jobs;
pub mod pipeline_schedules;
pub mod projects;
pub mod runner_machines;

pub use jobs::JobsDAL;
pub use pipeline_schedules::PipelineSchedulesDAL;
pub use projects::ProjectsDAL;
pub use runner_machines::RunnerMachinesDAL;

/// The main Data Access Layer struct.
#[derive(Clone)]
pub struct DAL {
    pub pool: ConnectionPool,
}

impl DAL {
    /// Creates a new DAL instance with the given connection pool.
    ///
    /// # Arguments
    ///
    /// * `pool` - A connection pool for PostgreSQL database connections.
    ///
    /// # Returns
    ///
    /// A new DAL instance.
    pub fn new(pool: ConnectionPool) -> Self {
        DAL { pool }
    }

    /// Provides access to the Jobs Data Access Layer.
    pub fn jobs(&self) -> JobsDAL {
        JobsDAL { dal: self }
    }

    /// Provides access to the Pipeline Schedules Data Access Layer.
    pub fn pipeline_schedules(&self) -> PipelineSchedulesDAL {
        PipelineSchedulesDAL { dal: self }
    }

    /// Provides access to the Projects Data Access Layer.
    pub fn projects(&self) -> ProjectsDAL {
        ProjectsDAL { dal: self }
    }

    /// Provides access to the Runner Machines Data Access Layer.
    pub fn runner_machines(&self) -> RunnerMachinesDAL {
        RunnerMachinesDAL { dal: self }
    }
}

// =============================================================================
// STORE TRAIT IMPLEMENTATIONS
// =============================================================================

impl VersionedStore<Job> for DAL {
    fn read(&self, id: i64) -> Result<Option<Job>, StoreError> {
        self.jobs().find(id)
    }

    fn write_if_version(&self, record: &Job, expected_version: i32) -> Result<Job, WriteError> {
        self.jobs().update_if_version(record, expected_version)
    }
}

impl JobStore for DAL {
    fn skipped_after_stage(
        &self,
        pipeline_id: i64,
        stage_idx: i32,
    ) -> Result<Vec<Job>, StoreError> {
        self.jobs().list_skipped_after_stage(pipeline_id, stage_idx)
    }
}

impl ScheduleStore for DAL {
    fn find_schedule(&self, schedule_id: i64) -> Result<Option<PipelineSchedule>, StoreError> {
        self.pipeline_schedules().find(schedule_id)
    }

    fn project_active(&self, project_id: i64) -> Result<bool, StoreError> {
        Ok(self
            .projects()
            .find(project_id)?
            .is_some_and(|project| project.is_active()))
    }

    fn set_next_run_at(
        &self,
        schedule_id: i64,
        next_run_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.pipeline_schedules()
            .set_next_run_at(schedule_id, next_run_at)
            .map(|_| ())
    }

    fn runnable(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PipelineSchedule>, StoreError> {
        self.pipeline_schedules().list_runnable(now, limit)
    }

    fn deactivate(&self, schedule_id: i64) -> Result<(), StoreError> {
        self.pipeline_schedules()
            .set_active(schedule_id, false)
            .map(|_| ())
    }
}

impl StaleMachineStore for DAL {
    fn stale_ids(&self, cutoff: DateTime<Utc>, limit: i64) -> Result<Vec<i64>, StoreError> {
        self.runner_machines().stale_ids(cutoff, limit)
    }

    fn delete_by_ids(&self, ids: &[i64]) -> Result<usize, StoreError> {
        self.runner_machines().delete_by_ids(ids)
    }
}
