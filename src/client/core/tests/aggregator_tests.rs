//! Integration tests for the resilient aggregator.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use voyage_core::aggregate::{Aggregator, EndpointDescriptor, FailureReporter, ViewScope};
use voyage_core::error::{ErrorCode, VoyageError};

// ============================================================================
// Test Utilities
// ============================================================================

#[derive(Default)]
struct Recorder {
    failures: Mutex<Vec<String>>,
}

impl Recorder {
    fn ids(&self) -> Vec<String> {
        self.failures.lock().clone()
    }
}

impl FailureReporter for Recorder {
    fn report(&self, endpoint_id: &str, _error: &VoyageError) {
        self.failures.lock().push(endpoint_id.to_string());
    }
}

fn delayed(ms: u64, value: &'static str) -> EndpointDescriptor {
    EndpointDescriptor::new(
        value,
        async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok::<_, VoyageError>(value.to_uppercase())
        },
        String::new(),
    )
}

fn failing_after(ms: u64, id: &'static str, fallback: Vec<u32>) -> EndpointDescriptor {
    EndpointDescriptor::new(
        id,
        async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Err::<Vec<u32>, _>(VoyageError::new(ErrorCode::FetchFailed, "backend down"))
        },
        fallback,
    )
}

// ============================================================================
// Settle-all Semantics
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_every_id_present_regardless_of_completion_order() {
    let result = Aggregator::default()
        .aggregate(vec![delayed(30, "charlie"), delayed(10, "alpha"), delayed(20, "bravo")])
        .unwrap()
        .await;

    assert_eq!(result.len(), 3);
    assert_eq!(result.ids().collect::<Vec<_>>(), vec!["alpha", "bravo", "charlie"]);
    assert_eq!(result.get::<String>("charlie").map(String::as_str), Some("CHARLIE"));
    assert!(!result.any_degraded());
}

#[tokio::test(start_paused = true)]
async fn test_failures_do_not_fail_the_whole() {
    let recorder = Arc::new(Recorder::default());
    let result = Aggregator::default()
        .with_reporter(recorder.clone())
        .aggregate(vec![
            delayed(5, "live"),
            failing_after(1, "first", vec![1, 2]),
            failing_after(50, "second", vec![3]),
        ])
        .unwrap()
        .await;

    assert_eq!(result.len(), 3);
    assert_eq!(result.get::<Vec<u32>>("first"), Some(&vec![1, 2]));
    assert_eq!(result.get::<Vec<u32>>("second"), Some(&vec![3]));
    assert_eq!(result.degraded_ids(), vec!["first".to_string(), "second".to_string()]);
    assert!(!result.is_degraded("live"));

    let mut reported = recorder.ids();
    reported.sort();
    assert_eq!(reported, vec!["first".to_string(), "second".to_string()]);
}

#[tokio::test]
async fn test_fetches_run_concurrently() {
    let started = std::time::Instant::now();
    let result = Aggregator::default()
        .aggregate(vec![delayed(100, "a"), delayed(100, "b"), delayed(100, "c")])
        .unwrap()
        .await;

    assert_eq!(result.len(), 3);
    assert!(started.elapsed() < Duration::from_millis(250));
}

#[tokio::test]
async fn test_duplicate_ids_rejected() {
    let err = Aggregator::default()
        .aggregate(vec![delayed(1, "stats"), delayed(1, "stats")])
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::DuplicateEndpoint);
}

// ============================================================================
// View Scope
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_open_scope_receives_result() {
    let scope = ViewScope::new();
    let result = Aggregator::default()
        .aggregate(vec![delayed(10, "stats")])
        .unwrap()
        .deliver_to(&scope)
        .await;

    assert!(result.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_closed_scope_drops_delivery_but_still_reports() {
    let recorder = Arc::new(Recorder::default());
    let pending = Aggregator::default()
        .with_reporter(recorder.clone())
        .aggregate(vec![failing_after(100, "slow", Vec::new())])
        .unwrap();

    let scope = ViewScope::new();
    let closer = scope.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        closer.close();
    });

    assert!(pending.deliver_to(&scope).await.is_none());
    assert!(recorder.ids().is_empty());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(recorder.ids(), vec!["slow".to_string()]);
}

#[tokio::test]
async fn test_already_closed_scope_gets_nothing() {
    let scope = ViewScope::new();
    scope.close();

    let result = Aggregator::default()
        .aggregate(vec![delayed(1, "stats")])
        .unwrap()
        .deliver_to(&scope)
        .await;
    assert!(result.is_none());
}
