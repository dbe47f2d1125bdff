/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Advances pipeline schedules.
//!
//! The next trigger time is persisted before the run is dispatched. A second
//! caller reading the schedule afterwards sees the new `next_run_at` and does
//! not fire the same interval again.

use crate::error::ServiceError;
use crate::metrics;
use crate::services::dispatch::{ScheduleDispatcher, ScheduledRun};
use crate::store::ScheduleStore;
use chrono::{DateTime, Utc};
use cinder_models::models::{CadenceError, PipelineSchedule};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceOutcome {
    /// The owning project is inactive; nothing was written or dispatched.
    Skipped,
    Advanced { next_run_at: DateTime<Utc> },
}

pub struct PipelineScheduleService<'a, S: ?Sized, D: ?Sized> {
    store: &'a S,
    dispatcher: &'a D,
}

impl<'a, S, D> PipelineScheduleService<'a, S, D>
where
    S: ScheduleStore + ?Sized,
    D: ScheduleDispatcher + ?Sized,
{
    pub fn new(store: &'a S, dispatcher: &'a D) -> Self {
        PipelineScheduleService { store, dispatcher }
    }

    pub fn advance(
        &self,
        schedule: &PipelineSchedule,
        actor_id: Option<i64>,
    ) -> Result<AdvanceOutcome, ServiceError> {
        self.advance_at(schedule, actor_id, Utc::now())
    }

    /// Advances `schedule` as of `now`.
    pub fn advance_at(
        &self,
        schedule: &PipelineSchedule,
        actor_id: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<AdvanceOutcome, ServiceError> {
        if !self.store.project_active(schedule.project_id)? {
            metrics::SCHEDULE_ADVANCES_TOTAL
                .with_label_values(&["skipped"])
                .inc();
            debug!(
                "Schedule {} skipped, project {} is not active",
                schedule.id, schedule.project_id
            );
            return Ok(AdvanceOutcome::Skipped);
        }

        let next_run_at = schedule
            .cadence()?
            .next_after(now)
            .ok_or_else(|| CadenceError {
                expression: schedule.cron.clone(),
                message: "no upcoming run".to_string(),
            })?;

        self.store.set_next_run_at(schedule.id, next_run_at)?;

        self.dispatcher.dispatch(ScheduledRun {
            schedule_id: schedule.id,
            actor_id,
            next_run_scheduled: true,
        })?;

        metrics::SCHEDULE_ADVANCES_TOTAL
            .with_label_values(&["advanced"])
            .inc();
        info!(
            "Schedule {} advanced, next run at {}",
            schedule.id, next_run_at
        );

        Ok(AdvanceOutcome::Advanced { next_run_at })
    }

    /// Queues a manual run of `schedule` without touching `next_run_at`.
    ///
    /// The run handler advances the schedule when the run is taken, and drops
    /// the run if the schedule is not due yet.
    pub fn trigger(
        &self,
        schedule: &PipelineSchedule,
        actor_id: Option<i64>,
    ) -> Result<(), ServiceError> {
        self.dispatcher.dispatch(ScheduledRun {
            schedule_id: schedule.id,
            actor_id,
            next_run_scheduled: false,
        })
    }

    /// Advances every runnable schedule, each on behalf of its owner.
    ///
    /// A failure on one schedule is logged and does not stop the others. A
    /// schedule whose cron expression no longer parses is deactivated so it
    /// stops occupying the batch. Returns the number of schedules advanced.
    pub fn run_due(&self, now: DateTime<Utc>, limit: i64) -> Result<usize, ServiceError> {
        let due = self.store.runnable(now, limit)?;
        let mut advanced = 0;

        for schedule in &due {
            match self.advance_at(schedule, schedule.owner_id, now) {
                Ok(AdvanceOutcome::Advanced { .. }) => advanced += 1,
                Ok(AdvanceOutcome::Skipped) => {}
                Err(ServiceError::InvalidCadence(e)) => {
                    metrics::SCHEDULE_ADVANCES_TOTAL
                        .with_label_values(&["deactivated"])
                        .inc();
                    warn!("Deactivating schedule {}: {}", schedule.id, e);
                    self.store.deactivate(schedule.id)?;
                }
                Err(e) => {
                    metrics::SCHEDULE_ADVANCES_TOTAL
                        .with_label_values(&["failed"])
                        .inc();
                    error!("Failed to advance schedule {}: {}", schedule.id, e);
                }
            }
        }

        Ok(advanced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{
        schedule, EventLog, MemoryScheduleStore, RecordingDispatcher,
    };
    use chrono::{Duration, TimeZone};

    fn events() -> EventLog {
        EventLog::default()
    }

    #[test]
    fn test_advance_persists_before_dispatch() {
        let log = events();
        let t0 = Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap();
        let t1 = t0 + Duration::minutes(5);
        let mut s = schedule(7, 1, "0 * * * *");
        s.next_run_at = Some(t0);
        let store = MemoryScheduleStore::new(log.clone())
            .with_project(1, true)
            .with_schedule(s.clone());
        let dispatcher = RecordingDispatcher::new(log.clone());
        let service = PipelineScheduleService::new(&store, &dispatcher);

        let outcome = service.advance_at(&s, Some(42), t1).unwrap();

        let t2 = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        assert_eq!(outcome, AdvanceOutcome::Advanced { next_run_at: t2 });
        assert!(t2 > t1);
        assert_eq!(store.get(7).next_run_at, Some(t2));
        assert_eq!(*log.lock().unwrap(), vec!["persist:7", "dispatch:7"]);
        assert_eq!(
            *dispatcher.runs.lock().unwrap(),
            vec![ScheduledRun {
                schedule_id: 7,
                actor_id: Some(42),
                next_run_scheduled: true,
            }]
        );
    }

    #[test]
    fn test_inactive_project_is_a_no_op() {
        let log = events();
        let s = schedule(7, 1, "0 * * * *");
        let store = MemoryScheduleStore::new(log.clone())
            .with_project(1, false)
            .with_schedule(s.clone());
        let dispatcher = RecordingDispatcher::new(log.clone());
        let service = PipelineScheduleService::new(&store, &dispatcher);

        let outcome = service.advance(&s, None).unwrap();

        assert_eq!(outcome, AdvanceOutcome::Skipped);
        assert!(log.lock().unwrap().is_empty());
        assert_eq!(store.get(7).next_run_at, None);
    }

    #[test]
    fn test_missing_project_is_a_no_op() {
        let log = events();
        let s = schedule(7, 99, "0 * * * *");
        let store = MemoryScheduleStore::new(log.clone()).with_schedule(s.clone());
        let dispatcher = RecordingDispatcher::new(log.clone());
        let service = PipelineScheduleService::new(&store, &dispatcher);

        assert_eq!(service.advance(&s, None).unwrap(), AdvanceOutcome::Skipped);
        assert!(dispatcher.runs.lock().unwrap().is_empty());
    }

    #[test]
    fn test_invalid_cadence_writes_nothing() {
        let log = events();
        let s = schedule(7, 1, "whenever");
        let store = MemoryScheduleStore::new(log.clone())
            .with_project(1, true)
            .with_schedule(s.clone());
        let dispatcher = RecordingDispatcher::new(log.clone());
        let service = PipelineScheduleService::new(&store, &dispatcher);

        let err = service.advance(&s, None).unwrap_err();

        assert!(matches!(err, ServiceError::InvalidCadence(_)));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_second_advance_of_same_interval_is_not_due() {
        let log = events();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap();
        let mut s = schedule(7, 1, "0 * * * *");
        s.next_run_at = Some(now - Duration::minutes(30));
        let store = MemoryScheduleStore::new(log.clone())
            .with_project(1, true)
            .with_schedule(s);
        let dispatcher = RecordingDispatcher::new(log.clone());
        let service = PipelineScheduleService::new(&store, &dispatcher);

        assert_eq!(service.run_due(now, 10).unwrap(), 1);
        assert_eq!(service.run_due(now, 10).unwrap(), 0);
        assert_eq!(dispatcher.runs.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_run_due_uses_owner_and_continues_past_failures() {
        let log = events();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap();
        let mut broken = schedule(1, 1, "bogus");
        broken.next_run_at = Some(now);
        let mut good = schedule(2, 1, "*/10 * * * *");
        good.next_run_at = Some(now);
        let mut future = schedule(3, 1, "*/10 * * * *");
        future.next_run_at = Some(now + Duration::hours(1));
        let store = MemoryScheduleStore::new(log.clone())
            .with_project(1, true)
            .with_schedule(broken)
            .with_schedule(good)
            .with_schedule(future);
        let dispatcher = RecordingDispatcher::new(log.clone());
        let service = PipelineScheduleService::new(&store, &dispatcher);

        assert_eq!(service.run_due(now, 10).unwrap(), 1);

        let runs = dispatcher.runs.lock().unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].schedule_id, 2);
        assert_eq!(runs[0].actor_id, Some(42));
    }

    #[test]
    fn test_invalid_cron_is_deactivated_and_frees_the_batch() {
        let log = events();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 9, 30, 0).unwrap();
        let mut broken = schedule(1, 1, "bogus");
        broken.next_run_at = Some(now - Duration::hours(1));
        let mut good = schedule(2, 1, "*/10 * * * *");
        good.next_run_at = Some(now);
        let store = MemoryScheduleStore::new(log.clone())
            .with_project(1, true)
            .with_schedule(broken)
            .with_schedule(good);
        let dispatcher = RecordingDispatcher::new(log.clone());
        let service = PipelineScheduleService::new(&store, &dispatcher);

        assert_eq!(service.run_due(now, 1).unwrap(), 0);
        assert!(!store.get(1).active);
        assert_eq!(*log.lock().unwrap(), vec!["deactivate:1"]);

        assert_eq!(service.run_due(now, 1).unwrap(), 1);
        assert_eq!(dispatcher.runs.lock().unwrap()[0].schedule_id, 2);
    }

    #[test]
    fn test_trigger_queues_manual_run_without_writing() {
        let log = events();
        let s = schedule(7, 1, "0 * * * *");
        let store = MemoryScheduleStore::new(log.clone())
            .with_project(1, true)
            .with_schedule(s.clone());
        let dispatcher = RecordingDispatcher::new(log.clone());
        let service = PipelineScheduleService::new(&store, &dispatcher);

        service.trigger(&s, Some(5)).unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["dispatch:7"]);
        assert_eq!(
            *dispatcher.runs.lock().unwrap(),
            vec![ScheduledRun {
                schedule_id: 7,
                actor_id: Some(5),
                next_run_scheduled: false,
            }]
        );
    }
}
