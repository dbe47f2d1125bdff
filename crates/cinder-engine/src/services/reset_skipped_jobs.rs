/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::error::ServiceError;
use crate::metrics;
use crate::services::enqueue_job::SkippedJobsResetter;
use crate::services::optimistic_lock::{retry_lock, DEFAULT_MAX_RETRIES};
use crate::store::JobStore;
use cinder_models::models::{Job, JobEvent};
use tracing::debug;

pub const RESET_OPERATION: &str = "ci_reset_skipped_jobs";

/// Resets skipped jobs in later stages of the same pipeline back to `created`
/// so they are processed again now that an earlier job is running.
pub struct ResetSkippedJobsService<'a, S: ?Sized> {
    store: &'a S,
    max_retries: u32,
}

impl<'a, S: JobStore + ?Sized> ResetSkippedJobsService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        ResetSkippedJobsService {
            store,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

impl<S: JobStore + ?Sized> SkippedJobsResetter for ResetSkippedJobsService<'_, S> {
    fn reset_skipped(&self, job: &Job) -> Result<usize, ServiceError> {
        let skipped = self
            .store
            .skipped_after_stage(job.pipeline_id, job.stage_idx)?;

        let mut reset = 0;
        for sibling in skipped {
            let sibling_id = sibling.id;
            match retry_lock(
                self.store,
                sibling,
                RESET_OPERATION,
                self.max_retries,
                |candidate| candidate.fire(JobEvent::Reset).map_err(ServiceError::from),
            ) {
                Ok(_) => reset += 1,
                // Someone else already moved it on.
                Err(ServiceError::InvalidTransition(_)) => {
                    debug!("Job {} left skipped state concurrently", sibling_id)
                }
                Err(e) => return Err(e),
            }
        }

        if reset > 0 {
            metrics::SKIPPED_JOBS_RESET_TOTAL.inc_by(reset as u64);
            debug!(
                "Reset {} skipped jobs in pipeline {} after job {}",
                reset, job.pipeline_id, job.id
            );
        }

        Ok(reset)
    }
}
