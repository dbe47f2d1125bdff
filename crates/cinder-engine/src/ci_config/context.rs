/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use super::location::Location;
use super::ResolveError;
use cinder_utils::config::CiConfig;
use std::collections::{BTreeSet, HashSet};
use std::time::{Duration, Instant};

/// Identity of an include in the expand set.
///
/// The same file included with different inputs renders different content, so
/// the inputs are part of the key. Missing and empty inputs are the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub location: Location,
    inputs: String,
}

impl NodeKey {
    pub fn new(location: Location, inputs: &serde_json::Value) -> Self {
        let inputs = match inputs {
            serde_json::Value::Null => String::new(),
            serde_json::Value::Object(map) if map.is_empty() => String::new(),
            other => other.to_string(),
        };
        NodeKey { location, inputs }
    }
}

/// Limits and permissions shared by every resolution a processor runs.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub max_includes: usize,
    pub timeout: Duration,
    pub allow_remote: bool,
    pub allowed_projects: BTreeSet<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        ResolverConfig {
            max_includes: 150,
            timeout: Duration::from_secs(30),
            allow_remote: false,
            allowed_projects: BTreeSet::new(),
        }
    }
}

impl ResolverConfig {
    pub fn from_settings(settings: &CiConfig) -> Self {
        ResolverConfig {
            max_includes: settings.max_includes,
            timeout: Duration::from_secs(settings.timeout_seconds),
            allow_remote: settings.allow_remote,
            allowed_projects: settings.allowed_projects.iter().cloned().collect(),
        }
    }

    /// Starts the clock on a fresh resolution.
    pub fn context(&self) -> ResolutionContext {
        ResolutionContext {
            expandset: HashSet::new(),
            max_includes: self.max_includes,
            started_at: Instant::now(),
            timeout: self.timeout,
            allow_remote: self.allow_remote,
            allowed_projects: self.allowed_projects.clone(),
        }
    }
}

/// State owned by exactly one resolution run.
#[derive(Debug)]
pub struct ResolutionContext {
    /// Every file visited so far.
    pub expandset: HashSet<NodeKey>,
    pub max_includes: usize,
    pub started_at: Instant,
    pub timeout: Duration,
    pub allow_remote: bool,
    pub allowed_projects: BTreeSet<String>,
}

impl ResolutionContext {
    pub fn new(max_includes: usize, timeout: Duration) -> Self {
        ResolverConfig {
            max_includes,
            timeout,
            ..Default::default()
        }
        .context()
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn verify_max_includes(&self) -> Result<(), ResolveError> {
        if self.expandset.len() < self.max_includes {
            return Ok(());
        }
        Err(ResolveError::TooManyIncludes {
            max: self.max_includes,
        })
    }

    pub fn verify_execution_time(&self) -> Result<(), ResolveError> {
        let elapsed = self.elapsed();
        if elapsed <= self.timeout {
            return Ok(());
        }
        Err(ResolveError::Timeout {
            elapsed,
            budget: self.timeout,
        })
    }

    pub fn project_allowed(&self, project: &str) -> bool {
        self.allowed_projects.contains(project)
    }
}
