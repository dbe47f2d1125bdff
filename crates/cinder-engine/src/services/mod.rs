/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Job, schedule and cleanup services.
//!
//! Every service is generic over the capabilities in [`crate::store`] so it can
//! run against PostgreSQL in production and in-memory stores in tests.

pub mod dispatch;
pub mod enqueue_job;
pub mod optimistic_lock;
pub mod pipeline_schedule;
pub mod reset_skipped_jobs;
pub mod run_pipeline_schedule;
pub mod stale_machines_cleanup;

pub use dispatch::{
    start_scheduled_run_consumer, ChannelDispatcher, LoggingRunHandler, ScheduleDispatcher,
    ScheduledRun, ScheduledRunHandler,
};
pub use enqueue_job::{EnqueueJobService, SkippedJobsResetter};
pub use optimistic_lock::{retry_lock, DEFAULT_MAX_RETRIES};
pub use pipeline_schedule::{AdvanceOutcome, PipelineScheduleService};
pub use reset_skipped_jobs::ResetSkippedJobsService;
pub use run_pipeline_schedule::{RunDecision, ScheduledRunGuard};
pub use stale_machines_cleanup::{CleanupOutcome, StaleMachinesCleanupService};
