/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! A single included file and its progress through resolution.

use super::context::{NodeKey, ResolutionContext};
use super::interpolation;
use super::location::Location;
use serde_json::json;
use serde_yaml::{Mapping, Value};

/// Furthest step an included file has reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NodeState {
    Unvalidated,
    LocationValidated,
    ContextValidated,
    ContentFetched,
    ContentValidated,
    Expanded,
    /// Already present in the expand set; not processed again.
    Duplicate,
}

#[derive(Debug, Clone)]
pub struct IncludeFile {
    pub location: Location,
    /// Values available to `$[[ inputs.* ]]` blocks.
    pub inputs: serde_json::Value,
    state: NodeState,
    content: Option<String>,
    errors: Vec<String>,
    hash: Option<Mapping>,
    expanded: Option<Mapping>,
    children: Vec<IncludeFile>,
}

impl IncludeFile {
    pub fn new(location: Location, inputs: serde_json::Value) -> Self {
        IncludeFile {
            location,
            inputs,
            state: NodeState::Unvalidated,
            content: None,
            errors: Vec::new(),
            hash: None,
            expanded: None,
            children: Vec::new(),
        }
    }

    /// Key of this file in the expand set.
    pub fn key(&self) -> NodeKey {
        NodeKey::new(self.location.clone(), &self.inputs)
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Merged content of this file and everything it includes.
    pub fn expanded_hash(&self) -> Option<&Mapping> {
        self.expanded.as_ref()
    }

    pub fn children(&self) -> &[IncludeFile] {
        &self.children
    }

    pub fn add_error(&mut self, message: String) {
        self.errors.push(message);
    }

    pub fn mark_duplicate(&mut self) {
        self.state = NodeState::Duplicate;
    }

    /// First error in this file or, depth first, in any file it includes.
    pub fn first_error(&self) -> Option<String> {
        self.errors
            .first()
            .cloned()
            .or_else(|| self.children.iter().find_map(IncludeFile::first_error))
    }

    pub fn validate_location(&mut self) {
        if !self.is_valid() {
            return;
        }
        match self.location.validate() {
            Ok(()) => self.state = NodeState::LocationValidated,
            Err(message) => self.add_error(message),
        }
    }

    pub fn validate_context(&mut self, ctx: &ResolutionContext) {
        if !self.is_valid() {
            return;
        }
        let denied = match &self.location {
            Location::Local { .. } => None,
            Location::Project { project, .. } if !ctx.project_allowed(project) => Some(format!(
                "Project `{}` not found or access denied!",
                project
            )),
            Location::Project { .. } => None,
            Location::Remote { .. } if !ctx.allow_remote => Some(format!(
                "{} is not allowed, remote includes are disabled!",
                self.location.describe()
            )),
            Location::Remote { .. } => None,
        };
        match denied {
            Some(message) => self.add_error(message),
            None => self.state = NodeState::ContextValidated,
        }
    }

    /// Records the outcome of fetching this file's content.
    pub fn set_content(&mut self, fetched: Result<String, String>) {
        if !self.is_valid() {
            return;
        }
        match fetched {
            Ok(content) => {
                self.content = Some(content);
                self.state = NodeState::ContentFetched;
            }
            Err(message) => self.add_error(message),
        }
    }

    /// Interpolates the fetched content and parses it as a YAML mapping.
    pub fn validate_content(&mut self) {
        if !self.is_valid() {
            return;
        }
        let Some(raw) = self.content.as_deref() else {
            return;
        };
        if raw.trim().is_empty() {
            let message = format!("{} is empty!", self.location.describe());
            self.add_error(message);
            return;
        }

        let text = match interpolation::interpolate(raw, &json!({ "inputs": self.inputs })) {
            Ok(text) => text,
            Err(errors) => {
                let described = self.location.describe();
                for e in errors {
                    self.errors.push(format!("{}: {}", described, e));
                }
                return;
            }
        };

        match serde_yaml::from_str::<Value>(&text) {
            Ok(Value::Mapping(map)) => {
                self.hash = Some(map);
                self.state = NodeState::ContentValidated;
            }
            _ => {
                let message = format!(
                    "{} does not have valid YAML syntax!",
                    self.location.describe()
                );
                self.add_error(message)
            }
        }
    }

    /// Removes and returns this file's own `include:` entry.
    pub fn take_includes(&mut self) -> Option<Value> {
        self.hash
            .as_mut()
            .and_then(|h| h.remove(Value::String("include".to_string())))
    }

    /// Stores the resolved children and the merged result of this file.
    pub fn set_expanded(&mut self, children: Vec<IncludeFile>) {
        let mut merged = Mapping::new();
        for child in &children {
            if let Some(hash) = child.expanded_hash() {
                deep_merge(&mut merged, hash);
            }
        }
        if let Some(own) = &self.hash {
            deep_merge(&mut merged, own);
        }
        self.children = children;
        self.expanded = Some(merged);
        self.state = NodeState::Expanded;
    }
}

/// Merges `source` into `target`. Nested mappings merge key by key; any other
/// value in `source` replaces the one in `target`.
pub fn deep_merge(target: &mut Mapping, source: &Mapping) {
    for (key, value) in source {
        if let (Some(Value::Mapping(existing)), Value::Mapping(incoming)) =
            (target.get_mut(key), value)
        {
            deep_merge(existing, incoming);
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
}
