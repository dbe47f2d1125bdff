/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Cinder CLI application
//!
//! Entry point of the `cinder` binary: loads the configuration, initializes
//! telemetry and dispatches to the selected command.

use cinder_engine::cli::{commands, parse_cli, Commands};
use cinder_utils::config::Settings;
use cinder_utils::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let cli = parse_cli();

    let config = Settings::new(cli.config.clone())?;

    telemetry::init(&config.telemetry, &config.log.level, &config.log.format)?;

    let result = match cli.command {
        Commands::Serve => commands::serve(&config).await,
        Commands::Migrate => commands::migrate(&config),
        Commands::EnqueueJob {
            job_id,
            actor_id,
            variables,
        } => commands::enqueue_job(&config, job_id, actor_id, variables),
        Commands::AdvanceSchedule {
            schedule_id,
            actor_id,
            manual,
        } => commands::advance_schedule(&config, schedule_id, actor_id, manual),
        Commands::ReapStaleMachines => commands::reap_stale_machines(&config),
        Commands::ResolveConfig {
            file,
            root_dir,
            strategy,
        } => commands::resolve_config(&config, file, root_dir, strategy),
    };

    telemetry::shutdown();
    result
}
