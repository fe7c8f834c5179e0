//! Telemetry: structured logging and metric names.
//!
//! - **Logging**: `tracing` subscriber with JSON/pretty/compact output and
//!   sensitive data redaction
//! - **Metrics**: counters emitted through the `metrics` facade; installing an
//!   exporter is left to the embedding application

pub mod logging;

pub use logging::{
    init_logging, LogFormat, LoggingConfig, RedactionConfig, RedactionPattern,
    SensitiveFieldRedactor,
};

/// Counter names emitted by this crate.
pub mod metric_names {
    /// Errors constructed, labelled by code/category/severity.
    pub const ERRORS_TOTAL: &str = "voyage_errors_total";
    /// Aggregated fetches that fell back, labelled by endpoint id.
    pub const FETCH_FAILURES_TOTAL: &str = "voyage_aggregate_fetch_failures_total";
    /// Gate state transitions, labelled by `from` and `to`.
    pub const GATE_TRANSITIONS_TOTAL: &str = "voyage_gate_transitions_total";
}

/// Short, non-reversible fingerprint of a secret for log correlation.
pub fn fingerprint(secret: &str) -> String {
    use sha2::{Digest, Sha256};

    let digest = Sha256::digest(secret.as_bytes());
    hex::encode(&digest[..6])
}
