/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

pub mod cadence;
pub mod jobs;
pub mod pipeline_schedules;
pub mod projects;
pub mod runner_machines;

pub use cadence::{Cadence, CadenceError};
pub use jobs::{InvalidTransition, Job, JobEvent, JobStatus, JobVariables, NewJob};
pub use pipeline_schedules::{NewPipelineSchedule, PipelineSchedule};
pub use projects::{NewProject, Project};
pub use runner_machines::{NewRunnerMachine, RunnerMachine, STALE_MACHINE_TIMEOUT_DAYS};
