/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Cinder Engine
//!
//! The scheduling and configuration core of the Cinder CI system: optimistic
//! job enqueueing, pipeline schedule advancement, bounded cleanup of stale
//! runner machines and resolution of CI configuration includes.
//!
//! Services are written against the traits in [`store`]; [`dal::DAL`]
//! implements them on PostgreSQL.

pub mod ci_config;
pub mod cli;
pub mod dal;
pub mod db;
pub mod error;
pub mod metrics;
pub mod services;
pub mod store;
pub mod utils;
