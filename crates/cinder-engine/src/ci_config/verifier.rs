/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Verification strategies for a list of sibling includes.
//!
//! Both strategies share the guards on [`ResolutionContext`] and the per-file
//! steps on [`IncludeFile`]. Guard failures abort the whole resolution; step
//! failures stay on the file and its siblings carry on.

use super::context::ResolutionContext;
use super::fetcher::ContentFetcher;
use super::file::{IncludeFile, NodeState};
use super::location::Location;
use super::mapper;
use super::ResolveError;
use crate::metrics;
use tracing::debug;

/// How a list of sibling includes is validated, fetched and expanded.
pub trait VerifierStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn verify(
        &self,
        verifier: &Verifier<'_>,
        files: &mut [IncludeFile],
        ctx: &mut ResolutionContext,
    ) -> Result<(), ResolveError>;
}

/// Returns the strategy registered under `name`.
pub fn strategy_for(name: &str) -> Option<Box<dyn VerifierStrategy>> {
    match name {
        "legacy" => Some(Box::new(LegacyStrategy)),
        "staged" => Some(Box::new(StagedStrategy)),
        _ => None,
    }
}

pub struct Verifier<'f> {
    fetcher: &'f dyn ContentFetcher,
    strategy: Box<dyn VerifierStrategy>,
}

impl<'f> Verifier<'f> {
    pub fn new(fetcher: &'f dyn ContentFetcher, strategy: Box<dyn VerifierStrategy>) -> Self {
        Verifier { fetcher, strategy }
    }

    pub fn fetcher(&self) -> &dyn ContentFetcher {
        self.fetcher
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Verifies `files` and, recursively, everything they include.
    pub fn process(
        &self,
        files: &mut [IncludeFile],
        ctx: &mut ResolutionContext,
    ) -> Result<(), ResolveError> {
        self.strategy.verify(self, files, ctx)
    }

    /// Resolves the includes of a content-validated file and merges them.
    ///
    /// A malformed `include:` entry is recorded on `file`.
    pub fn expand(
        &self,
        file: &mut IncludeFile,
        ctx: &mut ResolutionContext,
    ) -> Result<(), ResolveError> {
        if !file.is_valid() || file.state() != NodeState::ContentValidated {
            return Ok(());
        }

        let Some(includes) = file.take_includes() else {
            file.set_expanded(Vec::new());
            return Ok(());
        };

        let mut children = match mapper::map_includes(&includes) {
            Ok(children) => children,
            Err(message) => {
                file.add_error(format!("{}: {}", file.location.describe(), message));
                return Ok(());
            }
        };

        if let Location::Project { project, .. } = &file.location {
            for child in &mut children {
                child.location = child.location.clone().within_project(project);
            }
        }

        debug!(
            "Expanding {} with {} includes",
            file.location,
            children.len()
        );
        self.process(&mut children, ctx)?;
        metrics::CONFIG_INCLUDES_RESOLVED_TOTAL.inc_by(children.len() as u64);
        file.set_expanded(children);
        Ok(())
    }
}

/// Takes `file` into the expand set, or marks it as a duplicate when it is
/// already there. Returns whether the file was claimed.
fn claim(file: &mut IncludeFile, ctx: &mut ResolutionContext) -> Result<bool, ResolveError> {
    let key = file.key();
    if ctx.expandset.contains(&key) {
        debug!("Skipping duplicate include {}", file.location);
        file.mark_duplicate();
        return Ok(false);
    }
    ctx.verify_max_includes()?;
    ctx.verify_execution_time()?;
    ctx.expandset.insert(key);
    Ok(true)
}

/// Carries each file through every step before moving to the next sibling.
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyStrategy;

impl VerifierStrategy for LegacyStrategy {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn verify(
        &self,
        verifier: &Verifier<'_>,
        files: &mut [IncludeFile],
        ctx: &mut ResolutionContext,
    ) -> Result<(), ResolveError> {
        for file in files.iter_mut() {
            if !claim(file, ctx)? {
                continue;
            }

            file.validate_location();
            file.validate_context(ctx);
            if file.is_valid() {
                let fetched = verifier.fetcher().fetch(&file.location);
                file.set_content(fetched);
            }
            file.validate_content();
            verifier.expand(file, ctx)?;
        }
        Ok(())
    }
}

/// Validates every sibling, fetches them in one batch, then validates and
/// expands each fetched file.
#[derive(Debug, Default, Clone, Copy)]
pub struct StagedStrategy;

impl StagedStrategy {
    fn fetch_all(verifier: &Verifier<'_>, files: &mut [IncludeFile]) {
        let pending: Vec<usize> = files
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_valid() && f.state() == NodeState::ContextValidated)
            .map(|(i, _)| i)
            .collect();
        if pending.is_empty() {
            return;
        }

        let locations: Vec<Location> = pending
            .iter()
            .map(|&i| files[i].location.clone())
            .collect();
        let refs: Vec<&Location> = locations.iter().collect();
        let results = verifier.fetcher().fetch_batch(&refs);

        for (i, fetched) in pending.into_iter().zip(results) {
            files[i].set_content(fetched);
        }
    }
}

impl VerifierStrategy for StagedStrategy {
    fn name(&self) -> &'static str {
        "staged"
    }

    fn verify(
        &self,
        verifier: &Verifier<'_>,
        files: &mut [IncludeFile],
        ctx: &mut ResolutionContext,
    ) -> Result<(), ResolveError> {
        for file in files.iter_mut() {
            ctx.verify_execution_time()?;
            if ctx.expandset.contains(&file.key()) {
                file.mark_duplicate();
                continue;
            }
            file.validate_location();
            file.validate_context(ctx);
        }

        Self::fetch_all(verifier, files);

        for file in files.iter_mut() {
            if file.state() == NodeState::Duplicate || !claim(file, ctx)? {
                continue;
            }
            file.validate_content();
            verifier.expand(file, ctx)?;
        }
        Ok(())
    }
}
