/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Compare-and-swap mutation of versioned records with bounded retry.
//!
//! The mutation is applied to a copy of the record and written back only if
//! the stored version is unchanged. On a conflict the record is re-read and the
//! mutation applied again, so mutations must be safe to run more than once.

use crate::error::{ServiceError, WriteError};
use crate::metrics;
use crate::store::{VersionedRecord, VersionedStore};
use tracing::{debug, warn};

/// Retries allowed after the first attempt before giving up.
pub const DEFAULT_MAX_RETRIES: u32 = 100;

/// Applies `mutation` to `record` and persists it under optimistic locking.
///
/// # Arguments
///
/// * `store` - Store providing `read` and `write_if_version`.
/// * `record` - The record as last read by the caller.
/// * `name` - Operation name used in logs, metrics and the exhaustion error.
/// * `max_retries` - Conflicts tolerated before failing.
/// * `mutation` - Change to apply. An error from it is returned as-is.
///
/// # Returns
///
/// The saved record, with its version advanced by one.
pub fn retry_lock<T, S, F>(
    store: &S,
    record: T,
    name: &str,
    max_retries: u32,
    mut mutation: F,
) -> Result<T, ServiceError>
where
    T: VersionedRecord,
    S: VersionedStore<T> + ?Sized,
    F: FnMut(&mut T) -> Result<(), ServiceError>,
{
    let mut current = record;
    let mut retries = 0;

    loop {
        let mut candidate = current.clone();
        mutation(&mut candidate)?;

        match store.write_if_version(&candidate, current.lock_version()) {
            Ok(saved) => {
                debug!(
                    "{} saved record {} at version {} after {} retries",
                    name,
                    saved.id(),
                    saved.lock_version(),
                    retries
                );
                return Ok(saved);
            }
            Err(WriteError::VersionConflict) => {
                if retries >= max_retries {
                    metrics::OPTIMISTIC_LOCK_EXHAUSTED_TOTAL
                        .with_label_values(&[name])
                        .inc();
                    warn!(
                        "{} gave up on record {} after {} attempts",
                        name,
                        current.id(),
                        retries + 1
                    );
                    return Err(ServiceError::ConcurrentModification {
                        operation: name.to_string(),
                        attempts: retries + 1,
                    });
                }

                retries += 1;
                metrics::OPTIMISTIC_LOCK_RETRIES_TOTAL
                    .with_label_values(&[name])
                    .inc();
                debug!(
                    "{} hit a version conflict on record {}, retry {}",
                    name,
                    current.id(),
                    retries
                );

                let id = current.id();
                current = store.read(id)?.ok_or(ServiceError::NotFound {
                    entity: "record",
                    id,
                })?;
            }
            Err(WriteError::Store(e)) => return Err(e.into()),
        }
    }
}
