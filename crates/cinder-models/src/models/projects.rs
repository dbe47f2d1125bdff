/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// Represents a project row. Projects own jobs and pipeline schedules.
#[derive(
    Queryable, Selectable, Identifiable, AsChangeset, Debug, Clone, Serialize, Deserialize, PartialEq,
)]
#[diesel(table_name = crate::schema::projects)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Project {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub name: String,
    /// Set while the project is being removed.
    pub pending_delete: bool,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Project {
    /// A project is active when it is neither deleted nor queued for deletion.
    pub fn is_active(&self) -> bool {
        !self.pending_delete && self.deleted_at.is_none()
    }
}

#[derive(Insertable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::projects)]
pub struct NewProject {
    pub name: String,
}

impl NewProject {
    pub fn new(name: String) -> Result<Self, String> {
        if name.trim().is_empty() {
            return Err("Project name cannot be empty".to_string());
        }
        Ok(NewProject { name })
    }
}
