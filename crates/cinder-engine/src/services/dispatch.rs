/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Asynchronous hand-off of scheduled pipeline runs.
//!
//! [`ChannelDispatcher`] pushes runs onto a bounded tokio channel without
//! blocking the caller; a consumer task drains the channel and passes every run
//! to a [`ScheduledRunHandler`].

use crate::error::ServiceError;
use crate::metrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// A run request produced when a schedule fires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledRun {
    pub schedule_id: i64,
    pub actor_id: Option<i64>,
    /// Set for cadence-driven runs, clear for manual ones.
    pub next_run_scheduled: bool,
}

pub trait ScheduleDispatcher {
    fn dispatch(&self, run: ScheduledRun) -> Result<(), ServiceError>;
}

pub trait ScheduledRunHandler: Send + Sync {
    fn handle(&self, run: ScheduledRun) -> Result<(), ServiceError>;
}

#[derive(Clone)]
pub struct ChannelDispatcher {
    sender: mpsc::Sender<ScheduledRun>,
}

impl ChannelDispatcher {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ScheduledRun>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (ChannelDispatcher { sender }, receiver)
    }
}

impl ScheduleDispatcher for ChannelDispatcher {
    fn dispatch(&self, run: ScheduledRun) -> Result<(), ServiceError> {
        self.sender.try_send(run).map_err(|e| match e {
            TrySendError::Full(run) => ServiceError::Dispatch(format!(
                "queue full, dropped run for schedule {}",
                run.schedule_id
            )),
            TrySendError::Closed(run) => ServiceError::Dispatch(format!(
                "queue closed, dropped run for schedule {}",
                run.schedule_id
            )),
        })
    }
}

/// Final step for runs that passed the guard. Pipeline creation itself lives
/// outside this engine, so the run is only logged.
pub struct LoggingRunHandler;

impl ScheduledRunHandler for LoggingRunHandler {
    fn handle(&self, run: ScheduledRun) -> Result<(), ServiceError> {
        info!(
            schedule_id = run.schedule_id,
            actor_id = ?run.actor_id,
            next_run_scheduled = run.next_run_scheduled,
            "Scheduled pipeline run triggered"
        );
        Ok(())
    }
}

/// Spawns the task that drains `receiver` until every sender is dropped.
pub fn start_scheduled_run_consumer<H>(
    mut receiver: mpsc::Receiver<ScheduledRun>,
    handler: Arc<H>,
) -> JoinHandle<()>
where
    H: ScheduledRunHandler + 'static + ?Sized,
{
    tokio::spawn(async move {
        info!("Scheduled run consumer started");
        while let Some(run) = receiver.recv().await {
            let schedule_id = run.schedule_id;
            metrics::SCHEDULED_RUNS_HANDLED_TOTAL.inc();
            if let Err(e) = handler.handle(run) {
                error!("Scheduled run for schedule {} failed: {}", schedule_id, e);
            }
        }
        info!("Scheduled run consumer stopped");
    })
}
