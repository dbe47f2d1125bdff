/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Data Access Layer for runner machine registrations.
//!
//! Stale machines are removed in bounded batches: [`RunnerMachinesDAL::stale_ids`]
//! selects a batch and [`RunnerMachinesDAL::delete_by_ids`] removes exactly that
//! id set, so a machine that contacts the server between the two calls is
//! still removed only if it was selected.

use crate::dal::DAL;
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use cinder_models::models::{NewRunnerMachine, RunnerMachine};
use diesel::prelude::*;

/// Handles database operations for RunnerMachine entities.
pub struct RunnerMachinesDAL<'a> {
    /// Reference to the main DAL instance.
    pub(crate) dal: &'a DAL,
}

impl<'a> RunnerMachinesDAL<'a> {
    /// Registers a runner machine.
    ///
    /// # Arguments
    ///
    /// * `new_machine` - The machine to insert.
    ///
    /// # Returns
    ///
    /// Returns the created RunnerMachine, or a `StoreError` on failure
    /// (including a repeated `(runner_id, system_xid)` pair).
    pub fn create(&self, new_machine: &NewRunnerMachine) -> Result<RunnerMachine, StoreError> {
        use cinder_models::schema::ci_runner_machines::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::insert_into(ci_runner_machines)
            .values(new_machine)
            .returning(RunnerMachine::as_returning())
            .get_result(conn)?)
    }

    pub fn find(&self, machine_id: i64) -> Result<Option<RunnerMachine>, StoreError> {
        use cinder_models::schema::ci_runner_machines::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(ci_runner_machines
            .filter(id.eq(machine_id))
            .select(RunnerMachine::as_select())
            .first(conn)
            .optional()?)
    }

    /// Records contact from a machine.
    pub fn touch(&self, machine_id: i64, at: DateTime<Utc>) -> Result<RunnerMachine, StoreError> {
        use cinder_models::schema::ci_runner_machines::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::update(ci_runner_machines.filter(id.eq(machine_id)))
            .set(contacted_at.eq(Some(at)))
            .returning(RunnerMachine::as_returning())
            .get_result(conn)?)
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        use cinder_models::schema::ci_runner_machines::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(ci_runner_machines.count().get_result(conn)?)
    }

    /// Selects the ids of stale machines.
    ///
    /// # Arguments
    ///
    /// * `cutoff` - Machines created at or before this time and not contacted
    ///   after it are stale.
    /// * `limit` - Maximum number of ids returned.
    ///
    /// # Returns
    ///
    /// Up to `limit` ids in ascending order.
    pub fn stale_ids(&self, cutoff: DateTime<Utc>, limit: i64) -> Result<Vec<i64>, StoreError> {
        use cinder_models::schema::ci_runner_machines::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(ci_runner_machines
            .filter(created_at.le(cutoff))
            .filter(contacted_at.is_null().or(contacted_at.le(cutoff)))
            .order(id.asc())
            .limit(limit)
            .select(id)
            .load(conn)?)
    }

    /// Deletes exactly the machines in `ids`, returning the number of rows removed.
    pub fn delete_by_ids(&self, ids: &[i64]) -> Result<usize, StoreError> {
        use cinder_models::schema::ci_runner_machines::dsl::*;

        if ids.is_empty() {
            return Ok(0);
        }

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::delete(ci_runner_machines.filter(id.eq_any(ids))).execute(conn)?)
    }
}
