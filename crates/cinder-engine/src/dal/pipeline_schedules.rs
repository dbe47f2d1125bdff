/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Data Access Layer for pipeline schedules.

use crate::dal::DAL;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use cinder_models::models::{NewPipelineSchedule, PipelineSchedule};
use diesel::prelude::*;

/// Handles database operations for PipelineSchedule entities.
pub struct PipelineSchedulesDAL<'a> {
    /// Reference to the main DAL instance.
    pub(crate) dal: &'a DAL,
}

impl<'a> PipelineSchedulesDAL<'a> {
    /// Creates a new pipeline schedule.
    ///
    /// # Arguments
    ///
    /// * `new_schedule` - The schedule to insert. Its `next_run_at` is stored as given.
    ///
    /// # Returns
    ///
    /// Returns the created PipelineSchedule, or a `StoreError` on failure.
    pub fn create(&self, new_schedule: &NewPipelineSchedule) -> Result<PipelineSchedule, StoreError> {
        use cinder_models::schema::ci_pipeline_schedules::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::insert_into(ci_pipeline_schedules)
            .values(new_schedule)
            .returning(PipelineSchedule::as_returning())
            .get_result(conn)?)
    }

    /// Retrieves a schedule by its ID, or `None` if it does not exist.
    pub fn find(&self, schedule_id: i64) -> Result<Option<PipelineSchedule>, StoreError> {
        use cinder_models::schema::ci_pipeline_schedules::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(ci_pipeline_schedules
            .filter(id.eq(schedule_id))
            .select(PipelineSchedule::as_select())
            .first(conn)
            .optional()?)
    }

    /// Lists every schedule of a project.
    pub fn list_for_project(&self, project: i64) -> Result<Vec<PipelineSchedule>, StoreError> {
        use cinder_models::schema::ci_pipeline_schedules::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(ci_pipeline_schedules
            .filter(project_id.eq(project))
            .order(id.asc())
            .select(PipelineSchedule::as_select())
            .load(conn)?)
    }

    /// Lists active schedules that are due at `now`.
    ///
    /// # Arguments
    ///
    /// * `now` - Schedules with `next_run_at <= now` are due.
    /// * `limit` - Maximum number of schedules returned.
    ///
    /// # Returns
    ///
    /// Due schedules, earliest `next_run_at` first.
    pub fn list_runnable(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<PipelineSchedule>, StoreError> {
        use cinder_models::schema::ci_pipeline_schedules::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(ci_pipeline_schedules
            .filter(active.eq(true))
            .filter(next_run_at.le(now))
            .order((next_run_at.asc(), id.asc()))
            .limit(limit)
            .select(PipelineSchedule::as_select())
            .load(conn)?)
    }

    /// Stores the next time a schedule is due.
    pub fn set_next_run_at(
        &self,
        schedule_id: i64,
        next: DateTime<Utc>,
    ) -> Result<PipelineSchedule, StoreError> {
        use cinder_models::schema::ci_pipeline_schedules::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::update(ci_pipeline_schedules.filter(id.eq(schedule_id)))
            .set(next_run_at.eq(Some(next)))
            .returning(PipelineSchedule::as_returning())
            .get_result(conn)?)
    }

    /// Activates or deactivates a schedule.
    pub fn set_active(&self, schedule_id: i64, is_active: bool) -> Result<PipelineSchedule, StoreError> {
        use cinder_models::schema::ci_pipeline_schedules::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::update(ci_pipeline_schedules.filter(id.eq(schedule_id)))
            .set(active.eq(is_active))
            .returning(PipelineSchedule::as_returning())
            .get_result(conn)?)
    }
}
