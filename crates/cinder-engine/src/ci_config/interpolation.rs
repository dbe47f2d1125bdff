/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! `$[[ inputs.name ]]` interpolation of included file content.

use serde_json::Value;

pub const MAX_ACCESS_OBJECTS: usize = 5;
pub const MAX_ACCESS_BYTESIZE: usize = 1024;

const OPEN: &str = "$[[";
const CLOSE: &str = "]]";

/// A dotted access path such as `inputs.stage`, evaluated against a context.
///
/// The path is split into at most [`MAX_ACCESS_OBJECTS`] objects; anything
/// past the fourth dot stays in the last object.
#[derive(Debug, Clone)]
pub struct Access {
    content: String,
    objects: Vec<String>,
    errors: Vec<String>,
    value: Option<Value>,
}

impl Access {
    pub fn new(access: &str, ctx: &Value) -> Self {
        let objects: Vec<String> = access
            .splitn(MAX_ACCESS_OBJECTS, '.')
            .map(String::from)
            .collect();
        let mut errors = Vec::new();

        if objects.len() <= 1 {
            errors.push("invalid interpolation access pattern".to_string());
        }
        if access.len() > MAX_ACCESS_BYTESIZE {
            errors.push("maximum interpolation expression size exceeded".to_string());
        }

        let mut access = Access {
            content: access.to_string(),
            objects,
            errors,
            value: None,
        };
        if access.is_valid() {
            access.evaluate(ctx);
        }
        access
    }

    fn evaluate(&mut self, ctx: &Value) {
        let mut current = ctx;
        for key in &self.objects {
            match current.get(key.as_str()) {
                Some(next) => current = next,
                None => {
                    self.errors
                        .push(format!("unknown interpolation key: `{}`", key));
                    return;
                }
            }
        }
        self.value = Some(current.clone());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn objects(&self) -> &[String] {
        &self.objects
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Replaces every `$[[ ... ]]` block in `text` with its evaluated value.
///
/// Returns all access errors when any block fails to evaluate.
pub fn interpolate(text: &str, ctx: &Value) -> Result<String, Vec<String>> {
    let mut output = String::with_capacity(text.len());
    let mut errors = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find(OPEN) {
        output.push_str(&rest[..start]);
        let after_open = &rest[start + OPEN.len()..];

        let Some(end) = after_open.find(CLOSE) else {
            errors.push("unterminated interpolation block".to_string());
            rest = "";
            break;
        };

        let access = Access::new(after_open[..end].trim(), ctx);
        match access.value() {
            Some(value) if access.is_valid() => output.push_str(&render(value)),
            _ => errors.extend(access.errors().iter().cloned()),
        }
        rest = &after_open[end + CLOSE.len()..];
    }
    output.push_str(rest);

    if errors.is_empty() {
        Ok(output)
    } else {
        Err(errors)
    }
}
