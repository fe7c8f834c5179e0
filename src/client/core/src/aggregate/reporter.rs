//! Failure reporting for aggregated fetches.

use metrics::counter;
use tracing::warn;

use crate::error::VoyageError;
use crate::telemetry::{metric_names, SensitiveFieldRedactor};

/// Receives one notification per failed endpoint.
pub trait FailureReporter: Send + Sync {
    fn report(&self, endpoint_id: &str, error: &VoyageError);
}

/// Logs failures and counts them per endpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl FailureReporter for TracingReporter {
    fn report(&self, endpoint_id: &str, error: &VoyageError) {
        let redactor = SensitiveFieldRedactor::global();
        warn!(
            endpoint_id = %endpoint_id,
            error_code = %error.code(),
            error = %redactor.redact_value(&error.to_string()),
            "Fetch failed, using fallback"
        );
        counter!(
            metric_names::FETCH_FAILURES_TOTAL,
            "endpoint" => endpoint_id.to_string(),
            "code" => error.code().to_string(),
        )
        .increment(1);
    }
}
