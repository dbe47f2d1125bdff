/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Data Access Layer for Job entities (`ci_builds`).
//!
//! Jobs are never deleted. Every update after creation goes through
//! [`JobsDAL::update_if_version`], which only succeeds while the stored
//! `lock_version` still matches the caller's copy.

use crate::dal::DAL;
use crate::error::{StoreError, WriteError};
use cinder_models::models::{Job, JobStatus, NewJob};
use diesel::prelude::*;

/// Handles database operations for Job entities.
pub struct JobsDAL<'a> {
    /// Reference to the main DAL instance.
    pub(crate) dal: &'a DAL,
}

impl<'a> JobsDAL<'a> {
    /// Creates a new job in the database.
    ///
    /// # Arguments
    ///
    /// * `new_job` - A reference to the NewJob struct containing the job details.
    ///
    /// # Returns
    ///
    /// Returns the created Job on success, or a `StoreError` on failure.
    pub fn create(&self, new_job: &NewJob) -> Result<Job, StoreError> {
        use cinder_models::schema::ci_builds::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::insert_into(ci_builds)
            .values(new_job)
            .returning(Job::as_returning())
            .get_result(conn)?)
    }

    /// Retrieves a job by its ID, or `None` if it does not exist.
    pub fn find(&self, job_id: i64) -> Result<Option<Job>, StoreError> {
        use cinder_models::schema::ci_builds::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(ci_builds
            .filter(id.eq(job_id))
            .select(Job::as_select())
            .first(conn)
            .optional()?)
    }

    /// Lists the jobs of a pipeline ordered by stage and id.
    pub fn list_for_pipeline(&self, pipeline: i64) -> Result<Vec<Job>, StoreError> {
        use cinder_models::schema::ci_builds::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(ci_builds
            .filter(pipeline_id.eq(pipeline))
            .order((stage_idx.asc(), id.asc()))
            .select(Job::as_select())
            .load(conn)?)
    }

    /// Lists skipped jobs of a pipeline in stages after `after_stage`.
    ///
    /// # Arguments
    ///
    /// * `pipeline` - The pipeline whose jobs are searched.
    /// * `after_stage` - Only jobs with a strictly greater `stage_idx` are returned.
    ///
    /// # Returns
    ///
    /// The matching jobs ordered by stage and id.
    pub fn list_skipped_after_stage(
        &self,
        pipeline: i64,
        after_stage: i32,
    ) -> Result<Vec<Job>, StoreError> {
        use cinder_models::schema::ci_builds::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(ci_builds
            .filter(pipeline_id.eq(pipeline))
            .filter(stage_idx.gt(after_stage))
            .filter(status.eq(JobStatus::Skipped))
            .order((stage_idx.asc(), id.asc()))
            .select(Job::as_select())
            .load(conn)?)
    }

    /// Persists `job` if the stored row still carries `expected_version`.
    ///
    /// The status, actor and variables of `job` are written and the stored
    /// `lock_version` becomes `expected_version + 1`.
    ///
    /// # Returns
    ///
    /// The saved job, `WriteError::VersionConflict` when the row was changed
    /// (or removed) since it was read, or `WriteError::Store` on failure.
    pub fn update_if_version(&self, job: &Job, expected_version: i32) -> Result<Job, WriteError> {
        use cinder_models::schema::ci_builds::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        let saved = diesel::update(
            ci_builds
                .filter(id.eq(job.id))
                .filter(lock_version.eq(expected_version)),
        )
        .set((
            status.eq(job.status),
            user_id.eq(job.user_id),
            variables.eq(&job.variables),
            lock_version.eq(expected_version + 1),
        ))
        .returning(Job::as_returning())
        .get_result(conn)
        .optional()?;

        saved.ok_or(WriteError::VersionConflict)
    }
}
