/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # CI Configuration Include Resolution
//!
//! Expands the `include:` tree of a CI configuration into one merged mapping.
//!
//! Each included file walks through location validation, context validation,
//! content fetch, content validation and expansion. A file that fails a step
//! keeps its errors and goes no further, so its own includes are never
//! visited. Every file is recorded once in the resolution's expand set, which
//! both detects cycles and enforces the include ceiling. The wall-time budget
//! is polled at fixed checkpoints.
//!
//! Two verification strategies exist. The legacy one processes each file
//! start to finish. The staged one validates and fetches every sibling first,
//! with a single batched fetch, and only then validates and expands them.

pub mod context;
pub mod fetcher;
pub mod file;
pub mod interpolation;
pub mod location;
pub mod mapper;
pub mod processor;
pub mod verifier;

pub use context::{NodeKey, ResolutionContext, ResolverConfig};
pub use fetcher::{ContentFetcher, FileSystemFetcher};
pub use file::{IncludeFile, NodeState};
pub use location::Location;
pub use processor::ConfigProcessor;
pub use verifier::{strategy_for, LegacyStrategy, StagedStrategy, Verifier, VerifierStrategy};

use std::fmt;
use std::time::Duration;

/// Fatal failures of a resolution run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The expand set reached its ceiling.
    TooManyIncludes { max: usize },
    /// The wall-time budget ran out.
    Timeout { elapsed: Duration, budget: Duration },
    /// An included file, or the root document, is invalid.
    Include(String),
}

impl ResolveError {
    pub fn reason(&self) -> &'static str {
        match self {
            ResolveError::TooManyIncludes { .. } => "too_many_includes",
            ResolveError::Timeout { .. } => "timeout",
            ResolveError::Include(_) => "include",
        }
    }
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::TooManyIncludes { max } => {
                write!(f, "Maximum of {} nested includes are allowed!", max)
            }
            ResolveError::Timeout { elapsed, budget } => write!(
                f,
                "Resolving config took longer than expected ({}ms elapsed, {}ms allowed)",
                elapsed.as_millis(),
                budget.as_millis()
            ),
            ResolveError::Include(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for ResolveError {}

#[cfg(test)]
pub(crate) mod test_support {
    use super::fetcher::ContentFetcher;
    use super::location::Location;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves local files from a map and records every fetch.
    #[derive(Default)]
    pub struct MemoryFetcher {
        pub files: HashMap<String, String>,
        pub fetched: Mutex<Vec<String>>,
        pub batches: Mutex<Vec<usize>>,
    }

    impl MemoryFetcher {
        pub fn with(files: &[(&str, &str)]) -> Self {
            MemoryFetcher {
                files: files
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                ..Default::default()
            }
        }
    }

    impl ContentFetcher for MemoryFetcher {
        fn fetch(&self, location: &Location) -> Result<String, String> {
            let key = match location {
                Location::Local { path } => path.clone(),
                Location::Project { project, file } => format!("{}:{}", project, file),
                Location::Remote { address } => address.clone(),
            };
            self.fetched.lock().unwrap().push(key.clone());
            self.files
                .get(&key)
                .cloned()
                .ok_or_else(|| format!("{} does not exist!", location.describe()))
        }

        fn fetch_batch(&self, locations: &[&Location]) -> Vec<Result<String, String>> {
            self.batches.lock().unwrap().push(locations.len());
            locations.iter().map(|l| self.fetch(l)).collect()
        }
    }
}
