/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

use super::context::ResolverConfig;
use super::fetcher::ContentFetcher;
use super::file::deep_merge;
use super::mapper;
use super::verifier::{strategy_for, Verifier, VerifierStrategy};
use super::ResolveError;
use crate::metrics;
use cinder_utils::config::CiConfig;
use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

/// Resolves the includes of a root CI configuration.
pub struct ConfigProcessor<'f> {
    verifier: Verifier<'f>,
    config: ResolverConfig,
}

impl<'f> ConfigProcessor<'f> {
    pub fn new(
        fetcher: &'f dyn ContentFetcher,
        strategy: Box<dyn VerifierStrategy>,
        config: ResolverConfig,
    ) -> Self {
        ConfigProcessor {
            verifier: Verifier::new(fetcher, strategy),
            config,
        }
    }

    /// Builds a processor from the `ci_config` settings section.
    ///
    /// Fails when the configured strategy is unknown.
    pub fn from_settings(
        fetcher: &'f dyn ContentFetcher,
        settings: &CiConfig,
    ) -> Result<Self, String> {
        let strategy = strategy_for(&settings.strategy)
            .ok_or_else(|| format!("Unknown include strategy '{}'", settings.strategy))?;
        Ok(Self::new(
            fetcher,
            strategy,
            ResolverConfig::from_settings(settings),
        ))
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves `root_yaml` and returns the merged configuration.
    ///
    /// Included files are merged in declaration order and the root's own keys
    /// are laid over the result. The first error of any included file fails
    /// the whole resolution.
    pub fn perform(&self, root_yaml: &str) -> Result<Mapping, ResolveError> {
        let timer = metrics::CONFIG_RESOLUTION_DURATION_SECONDS.start_timer();
        let result = self.resolve(root_yaml);
        timer.observe_duration();

        match &result {
            Ok(_) => info!(
                strategy = self.verifier.strategy_name(),
                "CI configuration resolved"
            ),
            Err(e) => {
                metrics::CONFIG_RESOLUTION_FAILURES_TOTAL
                    .with_label_values(&[e.reason()])
                    .inc();
                warn!(
                    strategy = self.verifier.strategy_name(),
                    reason = e.reason(),
                    "CI configuration failed to resolve: {}",
                    e
                );
            }
        }
        result
    }

    fn resolve(&self, root_yaml: &str) -> Result<Mapping, ResolveError> {
        let mut root = match serde_yaml::from_str::<Value>(root_yaml) {
            Ok(Value::Mapping(root)) => root,
            Ok(_) => {
                return Err(ResolveError::Include(
                    "Invalid configuration format".to_string(),
                ))
            }
            Err(e) => {
                return Err(ResolveError::Include(format!(
                    "Invalid configuration format: {}",
                    e
                )))
            }
        };

        let Some(includes) = root.remove(Value::String("include".to_string())) else {
            return Ok(root);
        };

        let mut files = mapper::map_includes(&includes).map_err(ResolveError::Include)?;
        let mut ctx = self.config.context();
        self.verifier.process(&mut files, &mut ctx)?;

        if let Some(message) = files.iter().find_map(|f| f.first_error()) {
            return Err(ResolveError::Include(message));
        }

        let mut merged = Mapping::new();
        for file in &files {
            if let Some(hash) = file.expanded_hash() {
                deep_merge(&mut merged, hash);
            }
        }
        deep_merge(&mut merged, &root);
        Ok(merged)
    }
}
