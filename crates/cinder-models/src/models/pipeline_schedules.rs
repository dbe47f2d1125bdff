/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Pipeline Schedules Module
//!
//! A pipeline schedule triggers a pipeline on a recurring cadence. The
//! `next_run_at` column is always written before a run is dispatched, so a
//! second worker reading the schedule sees the advanced value.

use crate::models::cadence::{Cadence, CadenceError};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// Represents a pipeline schedule row.
#[derive(
    Queryable, Selectable, Identifiable, AsChangeset, Debug, Clone, Serialize, Deserialize, PartialEq,
)]
#[diesel(table_name = crate::schema::ci_pipeline_schedules)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PipelineSchedule {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Project that owns the schedule.
    pub project_id: i64,
    /// User the scheduled pipelines run as.
    pub owner_id: Option<i64>,
    pub description: String,
    /// Git ref the pipeline is created for.
    pub ref_name: String,
    /// Cron cadence expression.
    pub cron: String,
    /// Next time the schedule is due.
    pub next_run_at: Option<DateTime<Utc>>,
    pub active: bool,
}

impl PipelineSchedule {
    pub fn cadence(&self) -> Result<Cadence, CadenceError> {
        Cadence::parse(&self.cron)
    }

    /// Whether the cron worker should pick this schedule up at `now`.
    pub fn is_runnable_at(&self, now: DateTime<Utc>) -> bool {
        self.active && self.next_run_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// Represents a new pipeline schedule to be inserted.
#[derive(Insertable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::ci_pipeline_schedules)]
pub struct NewPipelineSchedule {
    pub project_id: i64,
    pub owner_id: Option<i64>,
    pub description: String,
    pub ref_name: String,
    pub cron: String,
    pub next_run_at: Option<DateTime<Utc>>,
    pub active: bool,
}

impl NewPipelineSchedule {
    /// Creates a new `NewPipelineSchedule`, validating the cadence and computing
    /// the first `next_run_at` from `now`.
    pub fn new(
        project_id: i64,
        owner_id: Option<i64>,
        description: String,
        ref_name: String,
        cron: String,
        now: DateTime<Utc>,
    ) -> Result<Self, String> {
        if ref_name.trim().is_empty() {
            return Err("Ref cannot be empty".to_string());
        }

        let cadence = Cadence::parse(&cron).map_err(|e| e.to_string())?;
        let next_run_at = cadence.next_after(now);

        Ok(NewPipelineSchedule {
            project_id,
            owner_id,
            description,
            ref_name,
            cron,
            next_run_at,
            active: true,
        })
    }
}
