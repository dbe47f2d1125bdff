/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Deletes stale runner machines in bounded sub-batches.
//!
//! Each iteration re-queries the staleness predicate and deletes exactly the
//! ids it returned, never asking for more than the cap still allows. The loop
//! ends on an empty batch or once the running total reaches the cap. The stale query may report the same machine more than
//! once, so the outcome only says whether anything was deleted.

use crate::error::StoreError;
use crate::metrics;
use crate::store::StaleMachineStore;
use chrono::{DateTime, Duration, Utc};
use cinder_models::models::STALE_MACHINE_TIMEOUT_DAYS;
use serde::Serialize;
use tracing::info;

pub const MAX_DELETIONS: i64 = 1000;
pub const SUB_BATCH_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CleanupOutcome {
    pub deleted: bool,
}

pub struct StaleMachinesCleanupService<'a, S: ?Sized> {
    store: &'a S,
    max_deletions: i64,
    sub_batch_size: i64,
    timeout: Duration,
}

impl<'a, S: StaleMachineStore + ?Sized> StaleMachinesCleanupService<'a, S> {
    pub fn new(store: &'a S) -> Self {
        StaleMachinesCleanupService {
            store,
            max_deletions: MAX_DELETIONS,
            sub_batch_size: SUB_BATCH_SIZE,
            timeout: Duration::days(STALE_MACHINE_TIMEOUT_DAYS),
        }
    }

    pub fn with_limits(mut self, max_deletions: i64, sub_batch_size: i64) -> Self {
        self.max_deletions = max_deletions.max(0);
        self.sub_batch_size = sub_batch_size.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn reap(&self) -> Result<CleanupOutcome, StoreError> {
        self.reap_at(Utc::now())
    }

    pub fn reap_at(&self, now: DateTime<Utc>) -> Result<CleanupOutcome, StoreError> {
        let cutoff = now - self.timeout;
        let mut total: i64 = 0;

        while total < self.max_deletions {
            let batch_size = self.sub_batch_size.min(self.max_deletions - total);
            let ids = self.store.stale_ids(cutoff, batch_size)?;
            if ids.is_empty() {
                break;
            }

            let deleted = self.store.delete_by_ids(&ids)? as i64;
            if deleted == 0 {
                break;
            }
            total += deleted;
        }

        metrics::RUNNER_MACHINES_REAPED_TOTAL.inc_by(total as u64);
        info!("Stale runner machine cleanup removed {} rows", total);

        Ok(CleanupOutcome { deleted: total > 0 })
    }
}
