/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Runner Machines Module
//!
//! A runner machine is the registration of one host behind a runner. Machines
//! that registered a while ago and have not contacted the server since are
//! stale and get reclaimed in bounded batches.

use chrono::{DateTime, Duration, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// Default age, in days, after which a silent machine is stale.
pub const STALE_MACHINE_TIMEOUT_DAYS: i64 = 7;

/// Represents a runner machine row.
#[derive(
    Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash,
)]
#[diesel(table_name = crate::schema::ci_runner_machines)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct RunnerMachine {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub runner_id: i64,
    /// Identifier the runner reports for the host.
    pub system_xid: String,
    /// Last time the machine talked to the server.
    pub contacted_at: Option<DateTime<Utc>>,
}

impl RunnerMachine {
    /// Staleness predicate: created before the cutoff and silent since the cutoff.
    pub fn is_stale(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        let cutoff = now - timeout;
        self.created_at <= cutoff && self.contacted_at.map(|at| at <= cutoff).unwrap_or(true)
    }
}

#[derive(Insertable, Debug, Clone, Serialize, Deserialize)]
#[diesel(table_name = crate::schema::ci_runner_machines)]
pub struct NewRunnerMachine {
    pub runner_id: i64,
    pub system_xid: String,
    pub contacted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl NewRunnerMachine {
    pub fn new(
        runner_id: i64,
        system_xid: String,
        contacted_at: Option<DateTime<Utc>>,
    ) -> Result<Self, String> {
        if system_xid.trim().is_empty() {
            return Err("System ID cannot be empty".to_string());
        }
        if system_xid.len() > 64 {
            return Err("System ID cannot exceed 64 characters".to_string());
        }

        Ok(NewRunnerMachine {
            runner_id,
            system_xid,
            contacted_at,
            created_at: Utc::now(),
        })
    }
}
