/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use crate::ci_config::{strategy_for, ConfigProcessor, FileSystemFetcher, ResolverConfig};
use crate::dal::DAL;
use crate::db::{create_shared_connection_pool, ConnectionPool};
use crate::error::ServiceError;
use crate::services::{
    start_scheduled_run_consumer, ChannelDispatcher, EnqueueJobService, LoggingRunHandler,
    PipelineScheduleService, ResetSkippedJobsService, ScheduledRunGuard, ScheduledRunHandler,
};
use crate::utils;
use crate::utils::background_tasks::{
    MetricsFlushConfig, ScheduleTaskConfig, StaleMachineCleanupConfig,
};
use cinder_models::models::JobVariables;
use cinder_utils::config::Settings;
use cinder_utils::telemetry::prelude::*;
use std::path::PathBuf;
use std::sync::Arc;

type CommandResult = Result<(), Box<dyn std::error::Error>>;

fn connect(config: &Settings) -> Result<ConnectionPool, Box<dyn std::error::Error>> {
    info!("Creating database connection pool");
    let pool = create_shared_connection_pool(
        &config.database.url,
        config.database.pool_size,
        config.database.schema.as_deref(),
    )?;
    info!("Database connection pool created successfully");
    Ok(pool)
}

/// Runs the engine until a shutdown signal arrives.
///
/// Applies pending migrations, then starts the scheduled run consumer and the
/// schedule, stale machine cleanup and metrics textfile background tasks.
pub async fn serve(config: &Settings) -> CommandResult {
    info!("Starting Cinder engine");

    let pool = connect(config)?;

    info!("Running pending database migrations");
    let applied = pool.run_migrations()?;
    info!("Database migrations completed successfully ({} applied)", applied);

    info!("Initializing Data Access Layer");
    let dal = DAL::new(pool);

    info!("Starting background tasks");
    let (dispatcher, receiver) = ChannelDispatcher::new(config.scheduler.dispatch_queue_capacity);
    let handler: Arc<dyn ScheduledRunHandler> = Arc::new(ScheduledRunGuard::new(
        Arc::new(dal.clone()),
        Arc::new(LoggingRunHandler),
    ));
    let consumer = start_scheduled_run_consumer(receiver, handler);

    let mut tasks = vec![
        utils::background_tasks::start_schedule_task(
            dal.clone(),
            dispatcher,
            ScheduleTaskConfig::from(&config.scheduler),
        ),
        utils::background_tasks::start_stale_machine_cleanup_task(
            dal.clone(),
            StaleMachineCleanupConfig::from(&config.cleanup),
        ),
    ];
    if let Some(metrics_config) = MetricsFlushConfig::from_settings(&config.metrics) {
        tasks.push(utils::background_tasks::start_metrics_flush_task(
            metrics_config,
        ));
    }

    info!("Cinder engine is now running");
    utils::shutdown_signal().await;

    for task in &tasks {
        task.abort();
    }
    // The schedule task owned the last sender; the consumer drains and exits.
    if let Err(e) = consumer.await {
        warn!("Scheduled run consumer ended abnormally: {}", e);
    }

    info!("Cinder engine stopped");
    Ok(())
}

/// Applies pending migrations and exits.
pub fn migrate(config: &Settings) -> CommandResult {
    let pool = connect(config)?;
    let applied = pool.run_migrations()?;
    info!("Applied {} pending migrations", applied);
    Ok(())
}

/// Enqueues a job on behalf of `actor_id`.
pub fn enqueue_job(
    config: &Settings,
    job_id: i64,
    actor_id: i64,
    variables: Vec<(String, String)>,
) -> CommandResult {
    let dal = DAL::new(connect(config)?);

    let job = dal.jobs().find(job_id)?.ok_or(ServiceError::NotFound {
        entity: "Job",
        id: job_id,
    })?;
    let variables: Option<JobVariables> =
        (!variables.is_empty()).then(|| variables.into_iter().collect());

    let max_retries = config.scheduler.optimistic_lock_max_retries;
    let resetter = ResetSkippedJobsService::new(&dal).with_max_retries(max_retries);
    let saved = EnqueueJobService::new(&dal, &resetter)
        .with_max_retries(max_retries)
        .enqueue(job, actor_id, variables)?;

    println!(
        "Job {} is {} (version {})",
        saved.id, saved.status, saved.lock_version
    );
    Ok(())
}

/// Fires a pipeline schedule immediately and advances it to its next run.
///
/// With `manual` the run is queued as a manual one: it only goes ahead when the
/// schedule is due.
pub fn advance_schedule(
    config: &Settings,
    schedule_id: i64,
    actor_id: Option<i64>,
    manual: bool,
) -> CommandResult {
    let dal = DAL::new(connect(config)?);

    let schedule = dal
        .pipeline_schedules()
        .find(schedule_id)?
        .ok_or(ServiceError::NotFound {
            entity: "Pipeline schedule",
            id: schedule_id,
        })?;

    let actor_id = actor_id.or(schedule.owner_id);
    let (dispatcher, mut receiver) = ChannelDispatcher::new(1);
    let service = PipelineScheduleService::new(&dal, &dispatcher);
    if manual {
        service.trigger(&schedule, actor_id)?;
    } else {
        let outcome = service.advance(&schedule, actor_id)?;
        println!("Schedule {}: {:?}", schedule_id, outcome);
    }

    let guard = ScheduledRunGuard::new(Arc::new(dal.clone()), Arc::new(LoggingRunHandler));
    while let Ok(run) = receiver.try_recv() {
        let decision = guard.handle_at(run, chrono::Utc::now())?;
        println!("Schedule {} run: {:?}", schedule_id, decision);
    }
    Ok(())
}

/// Runs one stale runner machine cleanup pass.
pub fn reap_stale_machines(config: &Settings) -> CommandResult {
    let dal = DAL::new(connect(config)?);
    let cleanup = StaleMachineCleanupConfig::from(&config.cleanup);

    let outcome = crate::services::StaleMachinesCleanupService::new(&dal)
        .with_limits(cleanup.max_deletions, cleanup.sub_batch_size)
        .with_timeout(chrono::Duration::days(cleanup.stale_timeout_days))
        .reap()?;

    println!("{}", serde_json::json!({ "status": "success", "payload": outcome }));
    Ok(())
}

/// Resolves the includes of `file` and prints the merged configuration.
pub fn resolve_config(
    config: &Settings,
    file: PathBuf,
    root_dir: Option<PathBuf>,
    strategy: Option<String>,
) -> CommandResult {
    let root_yaml = std::fs::read_to_string(&file)?;
    let root_dir = root_dir.unwrap_or_else(|| PathBuf::from(&config.ci_config.root_dir));
    let strategy_name = strategy.unwrap_or_else(|| config.ci_config.strategy.clone());
    let strategy = strategy_for(&strategy_name)
        .ok_or_else(|| format!("Unknown include strategy '{}'", strategy_name))?;

    let fetcher = FileSystemFetcher::new(root_dir);
    let processor = ConfigProcessor::new(
        &fetcher,
        strategy,
        ResolverConfig::from_settings(&config.ci_config),
    );
    let merged = processor.perform(&root_yaml)?;

    print!("{}", serde_yaml::to_string(&merged)?);
    Ok(())
}
