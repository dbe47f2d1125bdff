/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Include resolution against files on disk.

use cinder_engine::ci_config::{
    ConfigProcessor, FileSystemFetcher, LegacyStrategy, ResolveError, ResolverConfig,
    StagedStrategy, VerifierStrategy,
};
use serde_yaml::Mapping;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, path: &str, contents: &str) {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(full, contents).unwrap();
}

fn repository() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(
        root,
        "templates/build.yml",
        "include: templates/common.yml\nbuild:\n  stage: build\n  script: make\n",
    );
    write(
        root,
        "templates/common.yml",
        "variables:\n  RUST_LOG: info\ndefault:\n  image: rust:1.80\n",
    );
    write(
        root,
        "templates/deploy.yml",
        "deploy:\n  stage: deploy\n  environment: $[[ inputs.environment ]]\n",
    );
    write(
        root,
        "group/shared/ci/lint.yml",
        "include: ci/audit.yml\nlint:\n  script: cargo clippy\n",
    );
    write(root, "group/shared/ci/audit.yml", "audit:\n  script: cargo audit\n");
    dir
}

fn config() -> ResolverConfig {
    ResolverConfig {
        allowed_projects: ["group/shared".to_string()].into_iter().collect(),
        ..Default::default()
    }
}

fn strategies() -> Vec<Box<dyn VerifierStrategy>> {
    vec![Box::new(LegacyStrategy), Box::new(StagedStrategy)]
}

const ROOT: &str = r#"
include:
  - local: templates/build.yml
  - local: templates/deploy.yml
    inputs:
      environment: production
  - project: group/shared
    file: ci/lint.yml
variables:
  RUST_LOG: debug
"#;

#[test]
fn test_resolves_nested_local_and_project_includes() {
    let repo = repository();
    let fetcher = FileSystemFetcher::new(repo.path());

    let expected: Mapping = serde_yaml::from_str(
        r#"
variables:
  RUST_LOG: debug
default:
  image: rust:1.80
build:
  stage: build
  script: make
deploy:
  stage: deploy
  environment: production
lint:
  script: cargo clippy
audit:
  script: cargo audit
"#,
    )
    .unwrap();

    for strategy in strategies() {
        let processor = ConfigProcessor::new(&fetcher, strategy, config());
        let merged = processor.perform(ROOT).expect("Resolution failed");
        assert_eq!(merged, expected);
    }
}

#[test]
fn test_project_outside_allow_list_is_denied() {
    let repo = repository();
    let fetcher = FileSystemFetcher::new(repo.path());
    let processor = ConfigProcessor::new(&fetcher, Box::new(StagedStrategy), Default::default());

    let result = processor.perform("include:\n  project: group/shared\n  file: ci/lint.yml\n");

    assert_eq!(
        result,
        Err(ResolveError::Include(
            "Project `group/shared` not found or access denied!".to_string()
        ))
    );
}

#[test]
fn test_missing_local_file() {
    let repo = repository();
    let fetcher = FileSystemFetcher::new(repo.path());

    for strategy in strategies() {
        let processor = ConfigProcessor::new(&fetcher, strategy, config());
        let result = processor.perform("include: myfolder/invalid.yml\n");
        assert_eq!(
            result,
            Err(ResolveError::Include(
                "Local file `myfolder/invalid.yml` does not exist!".to_string()
            ))
        );
    }
}

#[test]
fn test_self_including_file_terminates() {
    let repo = repository();
    write(repo.path(), "loop.yml", "include: loop.yml\nlooped: true\n");
    let fetcher = FileSystemFetcher::new(repo.path());

    for strategy in strategies() {
        let processor = ConfigProcessor::new(&fetcher, strategy, config());
        let merged = processor
            .perform("include: loop.yml\n")
            .expect("Resolution failed");
        assert_eq!(merged, serde_yaml::from_str::<Mapping>("looped: true\n").unwrap());
    }
}

#[test]
fn test_include_ceiling_counts_the_whole_tree() {
    let repo = repository();
    let fetcher = FileSystemFetcher::new(repo.path());
    let limited = ResolverConfig {
        max_includes: 4,
        ..config()
    };

    for strategy in strategies() {
        let processor = ConfigProcessor::new(&fetcher, strategy, limited.clone());
        assert_eq!(
            processor.perform(ROOT),
            Err(ResolveError::TooManyIncludes { max: 4 })
        );
    }
}

#[test]
fn test_missing_input_is_reported() {
    let repo = repository();
    let fetcher = FileSystemFetcher::new(repo.path());
    let processor = ConfigProcessor::new(&fetcher, Box::new(LegacyStrategy), config());

    let result = processor.perform("include: templates/deploy.yml\n");

    assert_eq!(
        result,
        Err(ResolveError::Include(
            "Local file `templates/deploy.yml`: unknown interpolation key: `environment`"
                .to_string()
        ))
    );
}
