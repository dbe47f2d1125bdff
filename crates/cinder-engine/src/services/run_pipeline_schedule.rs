/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Last check on a scheduled run before a pipeline is created for it.
//!
//! Runs queued by the schedule task already moved `next_run_at`. Manual runs
//! did not, so the guard refuses them while the schedule is not due and
//! otherwise advances the schedule before passing the run on.

use crate::error::ServiceError;
use crate::metrics;
use crate::services::dispatch::{ScheduledRun, ScheduledRunHandler};
use crate::store::ScheduleStore;
use chrono::{DateTime, Utc};
use cinder_models::models::CadenceError;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunDecision {
    /// The schedule or its project is gone.
    Dropped,
    /// A manual run arrived before the schedule was due.
    NotDue,
    Run,
}

/// Screens runs against the stored schedule, then hands them to `next`.
pub struct ScheduledRunGuard<S: ?Sized, H: ?Sized> {
    store: Arc<S>,
    next: Arc<H>,
}

impl<S, H> ScheduledRunGuard<S, H>
where
    S: ScheduleStore + ?Sized,
    H: ScheduledRunHandler + ?Sized,
{
    pub fn new(store: Arc<S>, next: Arc<H>) -> Self {
        ScheduledRunGuard { store, next }
    }

    /// Decides whether `run` goes ahead as of `now`, advancing the schedule of
    /// a due manual run.
    pub fn check_at(
        &self,
        run: &ScheduledRun,
        now: DateTime<Utc>,
    ) -> Result<RunDecision, ServiceError> {
        let Some(schedule) = self.store.find_schedule(run.schedule_id)? else {
            debug!("Schedule {} no longer exists", run.schedule_id);
            return Ok(RunDecision::Dropped);
        };
        if !self.store.project_active(schedule.project_id)? {
            debug!(
                "Project {} of schedule {} is not active",
                schedule.project_id, schedule.id
            );
            return Ok(RunDecision::Dropped);
        }
        if run.next_run_scheduled {
            return Ok(RunDecision::Run);
        }

        if schedule.next_run_at.is_some_and(|at| at > now) {
            return Ok(RunDecision::NotDue);
        }
        let next_run_at = schedule
            .cadence()?
            .next_after(now)
            .ok_or_else(|| CadenceError {
                expression: schedule.cron.clone(),
                message: "no upcoming run".to_string(),
            })?;
        self.store.set_next_run_at(schedule.id, next_run_at)?;
        Ok(RunDecision::Run)
    }

    pub fn handle_at(
        &self,
        run: ScheduledRun,
        now: DateTime<Utc>,
    ) -> Result<RunDecision, ServiceError> {
        let decision = self.check_at(&run, now)?;
        match decision {
            RunDecision::Run => self.next.handle(run)?,
            RunDecision::Dropped => metrics::SCHEDULED_RUNS_SKIPPED_TOTAL
                .with_label_values(&["missing"])
                .inc(),
            RunDecision::NotDue => {
                metrics::SCHEDULED_RUNS_SKIPPED_TOTAL
                    .with_label_values(&["not_due"])
                    .inc();
                info!("Manual run of schedule {} is not due yet", run.schedule_id);
            }
        }
        Ok(decision)
    }
}

impl<S, H> ScheduledRunHandler for ScheduledRunGuard<S, H>
where
    S: ScheduleStore + Send + Sync + ?Sized,
    H: ScheduledRunHandler + ?Sized,
{
    fn handle(&self, run: ScheduledRun) -> Result<(), ServiceError> {
        self.handle_at(run, Utc::now()).map(|_| ())
    }
}
