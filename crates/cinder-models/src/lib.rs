/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Cinder Models
//!
//! Database models, table definitions and the pure domain rules (job state
//! machine, schedule cadence, machine staleness) shared by the Cinder crates.

pub mod models;
pub mod schema;
