/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Background tasks for the Cinder engine.
//!
//! Each task owns a clone of the [`DAL`] and runs on a tokio interval until
//! the runtime shuts down or its handle is aborted.

use crate::dal::DAL;
use crate::metrics;
use crate::services::{
    ChannelDispatcher, PipelineScheduleService, StaleMachinesCleanupService,
};
use chrono::Utc;
use cinder_utils::config::{Cleanup, Metrics, Scheduler};
use std::path::PathBuf;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info};

/// Configuration for the pipeline schedule task.
#[derive(Debug, Clone)]
pub struct ScheduleTaskConfig {
    /// How often to look for due schedules (in seconds).
    pub interval_seconds: u64,
    /// Maximum number of schedules advanced per tick.
    pub batch_size: i64,
}

impl Default for ScheduleTaskConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 60,
            batch_size: 100,
        }
    }
}

impl From<&Scheduler> for ScheduleTaskConfig {
    fn from(settings: &Scheduler) -> Self {
        Self {
            interval_seconds: settings.schedule_interval_seconds,
            batch_size: settings.schedule_batch_size,
        }
    }
}

/// Starts the pipeline schedule task.
///
/// On every tick the task loads the runnable schedules and advances each one
/// on behalf of its owner, handing the runs to `dispatcher`.
///
/// # Arguments
/// * `dal` - The Data Access Layer instance
/// * `dispatcher` - Where fired runs are sent
/// * `config` - Configuration for the task
pub fn start_schedule_task(
    dal: DAL,
    dispatcher: ChannelDispatcher,
    config: ScheduleTaskConfig,
) -> JoinHandle<()> {
    info!(
        "Starting pipeline schedule task (interval: {}s, batch_size: {})",
        config.interval_seconds, config.batch_size
    );

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(config.interval_seconds.max(1)));

        loop {
            ticker.tick().await;

            let service = PipelineScheduleService::new(&dal, &dispatcher);
            match service.run_due(Utc::now(), config.batch_size) {
                Ok(0) => debug!("No pipeline schedules due"),
                Ok(advanced) => info!("Advanced {} pipeline schedules", advanced),
                Err(e) => error!("Failed to load runnable pipeline schedules: {}", e),
            }
        }
    })
}

/// Configuration for the stale runner machine cleanup task.
#[derive(Debug, Clone)]
pub struct StaleMachineCleanupConfig {
    /// How often to run the cleanup (in seconds).
    pub interval_seconds: u64,
    /// Maximum rows removed per run.
    pub max_deletions: i64,
    /// Rows selected and deleted per batch.
    pub sub_batch_size: i64,
    /// Days without contact after which a machine is stale.
    pub stale_timeout_days: i64,
}

impl Default for StaleMachineCleanupConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 3600, // Every hour
            max_deletions: 1000,
            sub_batch_size: 100,
            stale_timeout_days: 7,
        }
    }
}

impl From<&Cleanup> for StaleMachineCleanupConfig {
    fn from(settings: &Cleanup) -> Self {
        Self {
            interval_seconds: settings.interval_seconds,
            max_deletions: settings.max_deletions,
            sub_batch_size: settings.sub_batch_size,
            stale_timeout_days: settings.stale_timeout_days,
        }
    }
}

/// Starts the stale runner machine cleanup task.
///
/// # Arguments
/// * `dal` - The Data Access Layer instance
/// * `config` - Configuration for the cleanup task
pub fn start_stale_machine_cleanup_task(
    dal: DAL,
    config: StaleMachineCleanupConfig,
) -> JoinHandle<()> {
    info!(
        "Starting stale runner machine cleanup task (interval: {}s, max_deletions: {}, sub_batch_size: {})",
        config.interval_seconds, config.max_deletions, config.sub_batch_size
    );

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(config.interval_seconds.max(1)));

        loop {
            ticker.tick().await;

            let service = StaleMachinesCleanupService::new(&dal)
                .with_limits(config.max_deletions, config.sub_batch_size)
                .with_timeout(chrono::Duration::days(config.stale_timeout_days));
            match service.reap() {
                Ok(outcome) => info!(
                    status = "success",
                    deleted = outcome.deleted,
                    "Stale runner machine cleanup finished"
                ),
                Err(e) => error!(
                    status = "error",
                    "Stale runner machine cleanup failed: {}", e
                ),
            }
        }
    })
}

/// Configuration for the metrics textfile task.
#[derive(Debug, Clone)]
pub struct MetricsFlushConfig {
    /// File the metrics are written to.
    pub path: PathBuf,
    /// How often to rewrite the file (in seconds).
    pub interval_seconds: u64,
}

impl MetricsFlushConfig {
    /// Builds the task configuration, or `None` when no textfile is configured.
    pub fn from_settings(settings: &Metrics) -> Option<Self> {
        settings.textfile_path.as_ref().map(|path| Self {
            path: PathBuf::from(path),
            interval_seconds: settings.flush_interval_seconds,
        })
    }
}

/// Starts the task that periodically writes the metrics registry to a
/// Prometheus textfile.
pub fn start_metrics_flush_task(config: MetricsFlushConfig) -> JoinHandle<()> {
    info!(
        "Starting metrics textfile task (path: {}, interval: {}s)",
        config.path.display(),
        config.interval_seconds
    );

    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(config.interval_seconds.max(1)));

        loop {
            ticker.tick().await;

            if let Err(e) = metrics::write_textfile(&config.path) {
                error!(
                    "Failed to write metrics textfile {}: {}",
                    config.path.display(),
                    e
                );
            }
        }
    })
}
