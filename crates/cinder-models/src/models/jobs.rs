/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Jobs Module
//!
//! A job is the unit of schedulable CI work. Jobs are never deleted; they move
//! through a fixed state machine and every persisted mutation bumps
//! `lock_version`, which is what optimistic locking compares against.
//!
//! ## Status Flow
//!
//! - `created`, `scheduled`, `manual`, `skipped`: queued, waiting to be enqueued
//! - `pending`: enqueued, waiting for a runner
//! - `running`: picked up by a runner
//! - `success`, `failed`, `canceled`: terminal
//!
//! | event     | from                                   | to         |
//! |-----------|----------------------------------------|------------|
//! | `enqueue` | `created`, `scheduled`, `manual`, `skipped` | `pending` |
//! | `run`     | `pending`                              | `running`  |
//! | `succeed` | `running`                              | `success`  |
//! | `fail`    | `pending`, `running`                   | `failed`   |
//! | `cancel`  | any non-terminal                       | `canceled` |
//! | `reset`   | `skipped`                              | `created`  |

use chrono::{DateTime, Utc};
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::pg::{Pg, PgValue};
use diesel::prelude::*;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Named runtime variables attached to a job when it is enqueued.
pub type JobVariables = BTreeMap<String, String>;

/// Lifecycle state of a job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Created,
    Scheduled,
    Manual,
    Skipped,
    Pending,
    Running,
    Success,
    Failed,
    Canceled,
}

/// Events that drive the job state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobEvent {
    Enqueue,
    Run,
    Succeed,
    Fail,
    Cancel,
    Reset,
}

/// Returned when an event is not allowed from the job's current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: JobStatus,
    pub event: JobEvent,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cannot transition status via :{} from :{}",
            self.event.as_str(),
            self.from.as_str()
        )
    }
}

impl std::error::Error for InvalidTransition {}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Created => "created",
            JobStatus::Scheduled => "scheduled",
            JobStatus::Manual => "manual",
            JobStatus::Skipped => "skipped",
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
            JobStatus::Canceled => "canceled",
        }
    }

    /// Statuses a job sits in before it has been enqueued.
    pub fn is_queued(&self) -> bool {
        matches!(
            self,
            JobStatus::Created | JobStatus::Scheduled | JobStatus::Manual | JobStatus::Skipped
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Failed | JobStatus::Canceled
        )
    }

    /// Computes the status reached by firing `event`, without mutating anything.
    pub fn fire(self, event: JobEvent) -> Result<JobStatus, InvalidTransition> {
        let next = match (event, self) {
            (JobEvent::Enqueue, from) if from.is_queued() => JobStatus::Pending,
            (JobEvent::Run, JobStatus::Pending) => JobStatus::Running,
            (JobEvent::Succeed, JobStatus::Running) => JobStatus::Success,
            (JobEvent::Fail, JobStatus::Pending | JobStatus::Running) => JobStatus::Failed,
            (JobEvent::Cancel, from) if !from.is_terminal() => JobStatus::Canceled,
            (JobEvent::Reset, JobStatus::Skipped) => JobStatus::Created,
            _ => return Err(InvalidTransition { from: self, event }),
        };
        Ok(next)
    }
}

impl JobEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobEvent::Enqueue => "enqueue",
            JobEvent::Run => "run",
            JobEvent::Succeed => "succeed",
            JobEvent::Fail => "fail",
            JobEvent::Cancel => "cancel",
            JobEvent::Reset => "reset",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(JobStatus::Created),
            "scheduled" => Ok(JobStatus::Scheduled),
            "manual" => Ok(JobStatus::Manual),
            "skipped" => Ok(JobStatus::Skipped),
            "pending" => Ok(JobStatus::Pending),
            "running" => Ok(JobStatus::Running),
            "success" => Ok(JobStatus::Success),
            "failed" => Ok(JobStatus::Failed),
            "canceled" => Ok(JobStatus::Canceled),
            other => Err(format!("Unknown job status: {}", other)),
        }
    }
}

impl ToSql<Text, Pg> for JobStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for JobStatus {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let raw = <String as FromSql<Text, Pg>>::from_sql(bytes)?;
        raw.parse().map_err(Into::into)
    }
}

/// Represents a job row.
#[derive(
    Queryable, Selectable, Identifiable, AsChangeset, Debug, Clone, Serialize, Deserialize, PartialEq,
)]
#[diesel(table_name = crate::schema::ci_builds)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Job {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub pipeline_id: i64,
    pub project_id: i64,
    pub name: String,
    /// Position of the job's stage inside its pipeline.
    pub stage_idx: i32,
    pub status: JobStatus,
    /// The actor that last triggered the job.
    pub user_id: Option<i64>,
    /// Optimistic locking counter.
    pub lock_version: i32,
    /// JSON object of runtime variables.
    pub variables: serde_json::Value,
}

impl Job {
    /// Fires `event` against the in-memory record.
    pub fn fire(&mut self, event: JobEvent) -> Result<(), InvalidTransition> {
        self.status = self.status.fire(event)?;
        Ok(())
    }

    pub fn enqueue(&mut self) -> Result<(), InvalidTransition> {
        self.fire(JobEvent::Enqueue)
    }

    /// Runtime variables as a map. Non-string JSON values are rendered as JSON text.
    pub fn variables(&self) -> JobVariables {
        match &self.variables {
            serde_json::Value::Object(map) => map
                .iter()
                .map(|(k, v)| match v {
                    serde_json::Value::String(s) => (k.clone(), s.clone()),
                    other => (k.clone(), other.to_string()),
                })
                .collect(),
            _ => JobVariables::new(),
        }
    }

    /// Replaces the job's runtime variables.
    pub fn set_variables(&mut self, variables: &JobVariables) {
        self.variables = variables_to_json(variables);
    }
}

pub fn variables_to_json(variables: &JobVariables) -> serde_json::Value {
    serde_json::Value::Object(
        variables
            .iter()
            .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
            .collect(),
    )
}

/// Represents a new job to be inserted.
#[derive(Insertable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::ci_builds)]
pub struct NewJob {
    pub pipeline_id: i64,
    pub project_id: i64,
    pub name: String,
    pub stage_idx: i32,
    pub status: JobStatus,
}

impl NewJob {
    /// Creates a new `NewJob` instance with validation.
    ///
    /// Only queued statuses are accepted: a job is always submitted before it is enqueued.
    pub fn new(
        pipeline_id: i64,
        project_id: i64,
        name: String,
        stage_idx: i32,
        status: Option<JobStatus>,
    ) -> Result<Self, String> {
        if name.trim().is_empty() {
            return Err("Job name cannot be empty".to_string());
        }

        if stage_idx < 0 {
            return Err("stage_idx must be non-negative".to_string());
        }

        let status = status.unwrap_or(JobStatus::Created);
        if !status.is_queued() {
            return Err(format!("Job cannot be created with status {}", status));
        }

        Ok(NewJob {
            pipeline_id,
            project_id,
            name,
            stage_idx,
            status,
        })
    }
}
