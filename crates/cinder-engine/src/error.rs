/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Error types shared by the store adapters and the services.

use cinder_models::models::{CadenceError, InvalidTransition};
use std::fmt;

/// Failure reported by a persistence adapter.
#[derive(Debug)]
pub enum StoreError {
    /// A query failed.
    Database(diesel::result::Error),
    /// No connection could be checked out of the pool.
    Pool(String),
    /// Any other backend failure.
    Backend(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Database(e) => write!(f, "Database error: {}", e),
            StoreError::Pool(e) => write!(f, "Connection pool error: {}", e),
            StoreError::Backend(e) => write!(f, "Store error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<diesel::result::Error> for StoreError {
    fn from(e: diesel::result::Error) -> Self {
        StoreError::Database(e)
    }
}

impl From<r2d2::Error> for StoreError {
    fn from(e: r2d2::Error) -> Self {
        StoreError::Pool(e.to_string())
    }
}

/// Outcome of a failed compare-and-swap write.
#[derive(Debug)]
pub enum WriteError {
    /// The stored version no longer matches the expected one.
    VersionConflict,
    Store(StoreError),
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::VersionConflict => write!(f, "Record was modified concurrently"),
            WriteError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for WriteError {}

impl From<StoreError> for WriteError {
    fn from(e: StoreError) -> Self {
        WriteError::Store(e)
    }
}

impl From<diesel::result::Error> for WriteError {
    fn from(e: diesel::result::Error) -> Self {
        WriteError::Store(StoreError::Database(e))
    }
}

impl From<r2d2::Error> for WriteError {
    fn from(e: r2d2::Error) -> Self {
        WriteError::Store(StoreError::from(e))
    }
}

/// Errors surfaced by the job, schedule and cleanup services.
#[derive(Debug)]
pub enum ServiceError {
    /// Optimistic lock retries were exhausted.
    ConcurrentModification { operation: String, attempts: u32 },
    InvalidTransition(InvalidTransition),
    InvalidCadence(CadenceError),
    NotFound { entity: &'static str, id: i64 },
    /// The asynchronous hand-off was refused.
    Dispatch(String),
    Store(StoreError),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceError::ConcurrentModification {
                operation,
                attempts,
            } => write!(
                f,
                "Concurrent modification of {} after {} attempts",
                operation, attempts
            ),
            ServiceError::InvalidTransition(e) => write!(f, "{}", e),
            ServiceError::InvalidCadence(e) => write!(f, "{}", e),
            ServiceError::NotFound { entity, id } => write!(f, "{} {} not found", entity, id),
            ServiceError::Dispatch(e) => write!(f, "Dispatch failed: {}", e),
            ServiceError::Store(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        ServiceError::Store(e)
    }
}

impl From<InvalidTransition> for ServiceError {
    fn from(e: InvalidTransition) -> Self {
        ServiceError::InvalidTransition(e)
    }
}

impl From<CadenceError> for ServiceError {
    fn from(e: CadenceError) -> Self {
        ServiceError::InvalidCadence(e)
    }
}
