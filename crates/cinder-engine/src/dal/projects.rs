/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::dal::DAL;
use crate::error::StoreError;
use chrono::Utc;
use cinder_models::models::{NewProject, Project};
use diesel::prelude::*;

/// Handles database operations for Project entities.
pub struct ProjectsDAL<'a> {
    pub(crate) dal: &'a DAL,
}

impl<'a> ProjectsDAL<'a> {
    pub fn create(&self, new_project: &NewProject) -> Result<Project, StoreError> {
        use cinder_models::schema::projects::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::insert_into(projects)
            .values(new_project)
            .returning(Project::as_returning())
            .get_result(conn)?)
    }

    pub fn find(&self, project_id: i64) -> Result<Option<Project>, StoreError> {
        use cinder_models::schema::projects::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(projects
            .filter(id.eq(project_id))
            .select(Project::as_select())
            .first(conn)
            .optional()?)
    }

    /// Flags a project for deletion. Its schedules stop firing from then on.
    pub fn mark_pending_delete(&self, project_id: i64) -> Result<Project, StoreError> {
        use cinder_models::schema::projects::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::update(projects.filter(id.eq(project_id)))
            .set(pending_delete.eq(true))
            .returning(Project::as_returning())
            .get_result(conn)?)
    }

    /// Soft deletes a project by setting its deleted_at timestamp to the current time.
    pub fn soft_delete(&self, project_id: i64) -> Result<Project, StoreError> {
        use cinder_models::schema::projects::dsl::*;

        let conn = &mut self.dal.pool.get()?;

        Ok(diesel::update(projects.filter(id.eq(project_id)))
            .set(deleted_at.eq(Some(Utc::now())))
            .returning(Project::as_returning())
            .get_result(conn)?)
    }
}
