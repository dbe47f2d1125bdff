/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Turns an `include:` value into included files.
//!
//! Accepted forms:
//!
//! ```yaml
//! include: templates/build.yml            # local path, or an http(s) address
//! include:
//!   - local: templates/test.yml
//!     inputs: { stage: test }
//!   - project: group/shared
//!     file: [ci/lint.yml, ci/audit.yml]
//!   - remote: https://example.com/ci/deploy.yml
//! ```

use super::file::IncludeFile;
use super::location::Location;
use serde_yaml::{Mapping, Value};

fn key(name: &str) -> Value {
    Value::String(name.to_string())
}

fn describe(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("{:?}", value))
}

fn from_string(entry: &str) -> Location {
    if entry.starts_with("http://") || entry.starts_with("https://") {
        Location::remote(entry)
    } else {
        Location::local(entry)
    }
}

fn inputs_of(entry: &Mapping) -> Result<serde_json::Value, String> {
    match entry.get(key("inputs")) {
        None => Ok(serde_json::Value::Null),
        Some(Value::Mapping(inputs)) => serde_json::to_value(inputs)
            .map_err(|e| format!("Include inputs could not be read: {}", e)),
        Some(other) => Err(format!(
            "Include inputs must be a mapping, got {}",
            describe(other)
        )),
    }
}

fn accessor<'a>(entry: &'a Mapping, name: &str) -> Option<&'a str> {
    entry.get(key(name)).and_then(Value::as_str)
}

fn from_mapping(entry: &Mapping, files: &mut Vec<IncludeFile>) -> Result<(), String> {
    let inputs = inputs_of(entry)?;
    let locations = match (
        accessor(entry, "local"),
        accessor(entry, "remote"),
        accessor(entry, "project"),
    ) {
        (Some(path), None, None) => vec![Location::local(path)],
        (None, Some(address), None) => vec![Location::remote(address)],
        (None, None, Some(project)) => match entry.get(key("file")) {
            Some(Value::String(file)) => vec![Location::project(project, file)],
            Some(Value::Sequence(list)) => list
                .iter()
                .map(|f| {
                    f.as_str()
                        .map(|f| Location::project(project, f))
                        .ok_or_else(|| format!("Project `{}` file must be a string", project))
                })
                .collect::<Result<Vec<_>, String>>()?,
            _ => return Err(format!("Project `{}` include needs a `file`", project)),
        },
        _ => {
            return Err(format!(
                "Include `{}` needs to match exactly one accessor!",
                describe(&Value::Mapping(entry.clone()))
            ))
        }
    };

    files.extend(
        locations
            .into_iter()
            .map(|location| IncludeFile::new(location, inputs.clone())),
    );
    Ok(())
}

/// Maps an `include:` value to unvalidated files, in declaration order.
pub fn map_includes(value: &Value) -> Result<Vec<IncludeFile>, String> {
    let mut files = Vec::new();
    let entries = match value {
        Value::Sequence(entries) => entries.as_slice(),
        single => std::slice::from_ref(single),
    };

    for entry in entries {
        match entry {
            Value::String(s) => {
                files.push(IncludeFile::new(from_string(s), serde_json::Value::Null))
            }
            Value::Mapping(m) => from_mapping(m, &mut files)?,
            other => {
                return Err(format!(
                    "Include `{}` must be a string or a mapping!",
                    describe(other)
                ))
            }
        }
    }

    Ok(files)
}
