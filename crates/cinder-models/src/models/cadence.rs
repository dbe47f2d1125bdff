/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! Recurring cadence for pipeline schedules.
//!
//! Schedules are written as cron expressions. The classic five-field form
//! (`minute hour day-of-month month day-of-week`) is accepted and normalized by
//! prepending a zero seconds field. Its day-of-week numbers count from Sunday
//! as 0 (7 is Sunday too) and are rewritten as day names, since the `cron`
//! crate numbers days from Sunday as 1. Six and seven field expressions are
//! passed through unchanged.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CadenceError {
    pub expression: String,
    pub message: String,
}

impl fmt::Display for CadenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid cron expression '{}': {}", self.expression, self.message)
    }
}

impl std::error::Error for CadenceError {}

const DAY_NAMES: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

fn parse_day(value: &str) -> Result<u32, String> {
    match value.parse::<u32>() {
        Ok(day) if day <= 7 => Ok(day),
        _ => Err(format!("invalid day of week '{}'", value)),
    }
}

/// Rewrites a standard day-of-week field (0-7, Sunday is 0 and 7) as day
/// names. Items already written with names are kept as they are.
fn day_of_week_names(field: &str) -> Result<String, String> {
    if field == "*" || field == "?" {
        return Ok(field.to_string());
    }

    let mut days = BTreeSet::new();
    let mut named = Vec::new();
    for item in field.split(',') {
        if item.chars().any(|c| c.is_ascii_alphabetic()) {
            named.push(item.to_string());
            continue;
        }

        let (base, step) = match item.split_once('/') {
            Some((base, step)) => match step.parse::<u32>() {
                Ok(step) if step > 0 => (base, Some(step)),
                _ => return Err(format!("invalid step in '{}'", item)),
            },
            None => (item, None),
        };
        let (first, last) = match base.split_once('-') {
            _ if base == "*" => (0, 6),
            Some((first, last)) => (parse_day(first)?, parse_day(last)?),
            None if step.is_some() => (parse_day(base)?, 6),
            None => {
                let day = parse_day(base)?;
                (day, day)
            }
        };
        if first > last {
            return Err(format!("invalid range '{}'", base));
        }

        let step = step.unwrap_or(1) as usize;
        for day in (first..=last).step_by(step) {
            days.insert(day % 7);
        }
    }

    let mut items: Vec<String> = days
        .into_iter()
        .map(|day| DAY_NAMES[day as usize].to_string())
        .collect();
    items.extend(named);
    Ok(items.join(","))
}

fn normalize_five_fields(fields: &[&str]) -> Result<String, String> {
    let day_of_week = day_of_week_names(fields[4])?;
    Ok(format!(
        "0 {} {} {} {} {}",
        fields[0], fields[1], fields[2], fields[3], day_of_week
    ))
}

/// A parsed cron cadence.
#[derive(Debug, Clone)]
pub struct Cadence {
    expression: String,
    schedule: cron::Schedule,
}

impl Cadence {
    pub fn parse(expression: &str) -> Result<Self, CadenceError> {
        let trimmed = expression.trim();
        let fields: Vec<&str> = trimmed.split_whitespace().collect();
        let normalized = match fields.len() {
            5 => normalize_five_fields(&fields).map_err(|message| CadenceError {
                expression: expression.to_string(),
                message,
            })?,
            6 | 7 => trimmed.to_string(),
            n => {
                return Err(CadenceError {
                    expression: expression.to_string(),
                    message: format!("expected 5 to 7 fields, found {}", n),
                })
            }
        };

        let schedule = cron::Schedule::from_str(&normalized).map_err(|e| CadenceError {
            expression: expression.to_string(),
            message: e.to_string(),
        })?;

        Ok(Cadence {
            expression: expression.to_string(),
            schedule,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First instant of the cadence strictly after `from`.
    pub fn next_after(&self, from: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&from).next()
    }
}
