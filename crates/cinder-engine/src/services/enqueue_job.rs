/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Moves a queued job into `pending`.
//!
//! The actor and runtime variables are applied inside the locked mutation so
//! that every retry re-applies them to the freshly read record. Once the
//! transition is saved, skipped jobs waiting on this one are re-evaluated.

use crate::error::ServiceError;
use crate::metrics;
use crate::services::optimistic_lock::{retry_lock, DEFAULT_MAX_RETRIES};
use crate::store::VersionedStore;
use cinder_models::models::{InvalidTransition, Job, JobVariables};
use tracing::info;

/// Operation name used for optimistic lock diagnostics.
pub const ENQUEUE_OPERATION: &str = "ci_enqueue_job";

/// Re-evaluates jobs that were skipped because of an earlier job's state.
pub trait SkippedJobsResetter {
    /// Returns how many jobs were reset.
    fn reset_skipped(&self, job: &Job) -> Result<usize, ServiceError>;
}

pub struct EnqueueJobService<'a, S: ?Sized, R: ?Sized> {
    store: &'a S,
    resetter: &'a R,
    max_retries: u32,
}

impl<'a, S, R> EnqueueJobService<'a, S, R>
where
    S: VersionedStore<Job> + ?Sized,
    R: SkippedJobsResetter + ?Sized,
{
    pub fn new(store: &'a S, resetter: &'a R) -> Self {
        EnqueueJobService {
            store,
            resetter,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Enqueues `job` on behalf of `actor_id`, replacing its variables when given.
    pub fn enqueue(
        &self,
        job: Job,
        actor_id: i64,
        variables: Option<JobVariables>,
    ) -> Result<Job, ServiceError> {
        self.enqueue_with(job, actor_id, variables, Job::enqueue)
    }

    /// Like [`enqueue`](Self::enqueue) with a caller supplied transition.
    pub fn enqueue_with<F>(
        &self,
        job: Job,
        actor_id: i64,
        variables: Option<JobVariables>,
        transition: F,
    ) -> Result<Job, ServiceError>
    where
        F: Fn(&mut Job) -> Result<(), InvalidTransition>,
    {
        let job_id = job.id;
        let saved = retry_lock(
            self.store,
            job,
            ENQUEUE_OPERATION,
            self.max_retries,
            |candidate| {
                candidate.user_id = Some(actor_id);
                if let Some(ref vars) = variables {
                    candidate.set_variables(vars);
                }
                transition(candidate)?;
                Ok(())
            },
        )?;

        metrics::JOBS_ENQUEUED_TOTAL.inc();
        info!(
            "Job {} moved to {} by user {} (version {})",
            job_id, saved.status, actor_id, saved.lock_version
        );

        self.resetter.reset_skipped(&saved)?;

        Ok(saved)
    }
}
