/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
/// Cinder CLI
///
/// Runs the Cinder scheduling engine and its one-shot maintenance commands.
pub struct Cli {
    /// Configuration file layered over the built-in defaults
    #[arg(long, global = true, env = "CINDER_CONFIG")]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the schedule, cleanup and metrics background tasks
    Serve,

    /// Apply pending database migrations
    Migrate,

    /// Enqueue a job on behalf of a user
    EnqueueJob {
        /// ID of the job
        #[arg(long)]
        job_id: i64,
        /// ID of the user enqueueing the job
        #[arg(long)]
        actor_id: i64,
        /// Variable to set on the job, as KEY=VALUE (repeatable)
        #[arg(long = "var", value_parser = parse_key_val)]
        variables: Vec<(String, String)>,
    },

    /// Fire a pipeline schedule now and move it to its next run
    AdvanceSchedule {
        /// ID of the schedule
        #[arg(long)]
        schedule_id: i64,
        /// User the run is triggered by; defaults to the schedule owner
        #[arg(long)]
        actor_id: Option<i64>,
        /// Queue a manual run, which only goes ahead once the schedule is due
        #[arg(long)]
        manual: bool,
    },

    /// Delete stale runner machines once
    ReapStaleMachines,

    /// Resolve the includes of a CI configuration file and print the result
    ResolveConfig {
        /// Path of the root configuration file
        file: PathBuf,
        /// Directory included files are read from; defaults to `ci_config.root_dir`
        #[arg(long)]
        root_dir: Option<PathBuf>,
        /// Resolution strategy (`legacy` or `staged`); defaults to `ci_config.strategy`
        #[arg(long)]
        strategy: Option<String>,
    },
}

/// Parses a `KEY=VALUE` pair.
pub fn parse_key_val(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no `=` found in `{}`", s))?;
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in `{}`", s));
    }
    Ok((key.to_string(), value.to_string()))
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("DEPLOY_ENV=production").unwrap(),
            ("DEPLOY_ENV".to_string(), "production".to_string())
        );
        assert_eq!(
            parse_key_val("EMPTY=").unwrap(),
            ("EMPTY".to_string(), String::new())
        );
        assert!(parse_key_val("novalue").is_err());
        assert!(parse_key_val("=value").is_err());
    }

    #[test]
    fn test_enqueue_job_arguments() {
        let cli = Cli::try_parse_from([
            "cinder",
            "enqueue-job",
            "--job-id",
            "12",
            "--actor-id",
            "7",
            "--var",
            "A=1",
            "--var",
            "B=two",
        ])
        .unwrap();

        match cli.command {
            Commands::EnqueueJob {
                job_id,
                actor_id,
                variables,
            } => {
                assert_eq!(job_id, 12);
                assert_eq!(actor_id, 7);
                assert_eq!(
                    variables,
                    vec![
                        ("A".to_string(), "1".to_string()),
                        ("B".to_string(), "two".to_string())
                    ]
                );
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_advance_schedule_manual_flag() {
        let cli = Cli::try_parse_from([
            "cinder",
            "advance-schedule",
            "--schedule-id",
            "3",
            "--manual",
        ])
        .unwrap();

        assert!(matches!(
            cli.command,
            Commands::AdvanceSchedule {
                schedule_id: 3,
                actor_id: None,
                manual: true,
            }
        ));
    }

    #[test]
    fn test_resolve_config_arguments() {
        let cli = Cli::try_parse_from([
            "cinder",
            "--config",
            "cinder.toml",
            "resolve-config",
            ".gitlab-ci.yml",
            "--strategy",
            "legacy",
        ])
        .unwrap();

        assert_eq!(cli.config.as_deref(), Some("cinder.toml"));
        assert!(matches!(
            cli.command,
            Commands::ResolveConfig { ref strategy, .. } if strategy.as_deref() == Some("legacy")
        ));
    }
}
