// SPDX-FileCopyrightText: 2026 Tessera Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; the host chooses the recorder.

use metrics::{describe_counter, describe_histogram};

use crate::types::Operation;

/// Register memory engine metric descriptions.
pub fn register_metrics() {
    describe_counter!(
        "tessera_memory_writes_total",
        "Completed remember calls by operation"
    );
    describe_counter!(
        "tessera_memory_degraded_total",
        "Best-effort stages that failed without failing the write"
    );
    describe_counter!(
        "tessera_memory_contradictions_total",
        "Contradictions detected on write"
    );
    describe_histogram!(
        "tessera_memory_write_latency_seconds",
        "End-to-end remember latency in seconds"
    );
}

/// Record a completed write.
pub fn record_write(operation: Operation) {
    metrics::counter!("tessera_memory_writes_total", "operation" => operation.to_string())
        .increment(1);
}

/// Record a degraded stage (`extraction`, `contradiction`, `graph`).
pub fn record_degraded(stage: &'static str) {
    metrics::counter!("tessera_memory_degraded_total", "stage" => stage).increment(1);
}

/// Record a detected contradiction.
pub fn record_contradiction() {
    metrics::counter!("tessera_memory_contradictions_total").increment(1);
}

/// Record write latency.
pub fn record_write_latency(seconds: f64) {
    metrics::histogram!("tessera_memory_write_latency_seconds").record(seconds);
}
