/*
 * Copyright (c) 2025 Dylan Storey
 * Licensed under the Elastic License 2.0.
 * See LICENSE file in the project root for full license text.
 */

//! # Metrics Module
//!
//! Prometheus metrics for the scheduling, cleanup and config resolution
//! services. The exposition text is written to a file for a node exporter's
//! textfile collector.

use once_cell::sync::Lazy;
use prometheus::{
    CounterVec, Encoder, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder,
};
use std::path::Path;

/// Global Prometheus registry for all engine metrics
pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

/// Version conflicts that led to a retry
/// Labels: operation
pub static OPTIMISTIC_LOCK_RETRIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    let opts = Opts::new(
        "cinder_optimistic_lock_retries_total",
        "Total number of optimistic lock retries by operation",
    );
    let counter = CounterVec::new(opts, &["operation"])
        .expect("Failed to create optimistic lock retries counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register optimistic lock retries counter");
    counter
});

/// Operations that gave up after exhausting their retries
/// Labels: operation
pub static OPTIMISTIC_LOCK_EXHAUSTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    let opts = Opts::new(
        "cinder_optimistic_lock_exhausted_total",
        "Total number of operations that exhausted optimistic lock retries",
    );
    let counter = CounterVec::new(opts, &["operation"])
        .expect("Failed to create optimistic lock exhausted counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register optimistic lock exhausted counter");
    counter
});

pub static JOBS_ENQUEUED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new("cinder_jobs_enqueued_total", "Total number of jobs enqueued")
        .expect("Failed to create jobs enqueued counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register jobs enqueued counter");
    counter
});

pub static SKIPPED_JOBS_RESET_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "cinder_skipped_jobs_reset_total",
        "Total number of skipped jobs reset to created",
    )
    .expect("Failed to create skipped jobs reset counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register skipped jobs reset counter");
    counter
});

/// Schedule advance attempts
/// Labels: outcome (advanced, skipped, failed)
pub static SCHEDULE_ADVANCES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    let opts = Opts::new(
        "cinder_schedule_advances_total",
        "Total number of pipeline schedule advances by outcome",
    );
    let counter = CounterVec::new(opts, &["outcome"])
        .expect("Failed to create schedule advances counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register schedule advances counter");
    counter
});

pub static SCHEDULED_RUNS_HANDLED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "cinder_scheduled_runs_handled_total",
        "Total number of scheduled runs taken off the dispatch queue",
    )
    .expect("Failed to create scheduled runs counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register scheduled runs counter");
    counter
});

pub static SCHEDULED_RUNS_SKIPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    let opts = Opts::new(
        "cinder_scheduled_runs_skipped_total",
        "Total number of scheduled runs dropped before pipeline creation",
    );
    let counter = CounterVec::new(opts, &["reason"])
        .expect("Failed to create skipped scheduled runs counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register skipped scheduled runs counter");
    counter
});

pub static RUNNER_MACHINES_REAPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "cinder_runner_machines_reaped_total",
        "Total number of stale runner machine rows deleted",
    )
    .expect("Failed to create runner machines reaped counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register runner machines reaped counter");
    counter
});

pub static CONFIG_INCLUDES_RESOLVED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    let counter = IntCounter::new(
        "cinder_config_includes_resolved_total",
        "Total number of configuration includes expanded",
    )
    .expect("Failed to create includes resolved counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register includes resolved counter");
    counter
});

/// Failed configuration resolutions
/// Labels: reason (too_many_includes, timeout, include)
pub static CONFIG_RESOLUTION_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    let opts = Opts::new(
        "cinder_config_resolution_failures_total",
        "Total number of failed configuration resolutions by reason",
    );
    let counter = CounterVec::new(opts, &["reason"])
        .expect("Failed to create resolution failures counter");
    REGISTRY
        .register(Box::new(counter.clone()))
        .expect("Failed to register resolution failures counter");
    counter
});

pub static CONFIG_RESOLUTION_DURATION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    let opts = HistogramOpts::new(
        "cinder_config_resolution_duration_seconds",
        "Configuration resolution latency distribution in seconds",
    )
    .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 30.0]);
    let histogram =
        Histogram::with_opts(opts).expect("Failed to create resolution duration histogram");
    REGISTRY
        .register(Box::new(histogram.clone()))
        .expect("Failed to register resolution duration histogram");
    histogram
});

/// Encodes all registered metrics in Prometheus text format
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    encoder
        .encode(&metric_families, &mut buffer)
        .expect("Failed to encode metrics");
    String::from_utf8(buffer).expect("Failed to convert metrics to UTF-8")
}

/// Writes the exposition text to `path`, replacing it atomically.
pub fn write_textfile(path: &Path) -> std::io::Result<()> {
    let tmp = path.with_extension("prom.tmp");
    std::fs::write(&tmp, encode_metrics())?;
    std::fs::rename(&tmp, path)
}
