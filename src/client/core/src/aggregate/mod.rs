//! Resilient multi-source aggregation.
//!
//! A dashboard needs several independent collections at once (stats,
//! packages, bookings, ...). [`Aggregator::aggregate`] starts every fetch
//! concurrently, waits for all of them to settle and replaces each failed
//! fetch with the fallback declared next to it. The result always holds one
//! entry per requested id, so a view can render even when parts of the
//! backend are down; [`AggregateResult::any_degraded`] tells it to show a
//! "partial data" notice.
//!
//! # Example
//!
//! ```rust,ignore
//! let pending = aggregator.aggregate(vec![
//!     EndpointDescriptor::new("stats", agent.stats(), fallback::agent_stats()),
//!     EndpointDescriptor::new("packages", agent.packages(), fallback::agent_packages()),
//! ])?;
//! let mut result = pending.await;
//! let stats: AgentStats = result.take("stats").unwrap_or_default();
//! ```

mod descriptor;
mod reporter;
mod result;
mod scope;

pub use descriptor::{AnyValue, EndpointDescriptor};
pub use reporter::{FailureReporter, TracingReporter};
pub use result::{AggregateEntry, AggregateResult};
pub use scope::ViewScope;

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashSet;
use std::future::IntoFuture;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::AggregatorConfig;
use crate::error::{Result, VoyageError};

/// Runs groups of independent fetches with per-endpoint fallback.
#[derive(Clone)]
pub struct Aggregator {
    fetch_timeout: Option<Duration>,
    reporter: Arc<dyn FailureReporter>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(&AggregatorConfig::default())
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}

impl Aggregator {
    pub fn new(config: &AggregatorConfig) -> Self {
        Self {
            fetch_timeout: config.fetch_timeout,
            reporter: Arc::new(TracingReporter),
        }
    }

    /// Replace the failure reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn FailureReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Bound every fetch by `timeout`, or lift the bound with `None`.
    pub fn with_fetch_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout
    }

    /// Prepare an aggregation over `descriptors`.
    ///
    /// Ids must be unique; a duplicate is rejected here, before any fetch
    /// is polled. Await the returned [`PendingAggregate`] to run it.
    pub fn aggregate(&self, descriptors: Vec<EndpointDescriptor>) -> Result<PendingAggregate> {
        let mut seen = HashSet::with_capacity(descriptors.len());
        for descriptor in &descriptors {
            if !seen.insert(descriptor.id.as_str()) {
                return Err(VoyageError::duplicate_endpoint(&descriptor.id));
            }
        }

        Ok(PendingAggregate {
            descriptors,
            fetch_timeout: self.fetch_timeout,
            reporter: self.reporter.clone(),
        })
    }
}

/// A validated aggregation that has not started yet.
///
/// Awaiting it runs every fetch concurrently and resolves to the settled
/// [`AggregateResult`]. It never resolves to an error.
#[must_use = "an aggregation does nothing until it is awaited"]
pub struct PendingAggregate {
    descriptors: Vec<EndpointDescriptor>,
    fetch_timeout: Option<Duration>,
    reporter: Arc<dyn FailureReporter>,
}

impl PendingAggregate {
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Run the aggregation for a view.
    ///
    /// Returns `None` if `scope` closes before every fetch has settled. The
    /// fetches keep running in a detached task so their failures are still
    /// reported; only the delivery is dropped.
    pub async fn deliver_to(self, scope: &ViewScope) -> Option<AggregateResult> {
        let endpoints = self.len();
        let task = tokio::spawn(self.into_future());

        tokio::select! {
            biased;
            _ = scope.closed() => {
                debug!(endpoints, "View closed before aggregation settled");
                None
            }
            joined = task => match joined {
                Ok(result) if !scope.is_closed() => Some(result),
                Ok(_) => None,
                Err(e) => {
                    warn!(error = %e, "Aggregation task did not complete");
                    None
                }
            },
        }
    }

    async fn run(self) -> AggregateResult {
        let fetch_timeout = self.fetch_timeout;
        let settling = self.descriptors.into_iter().map(|descriptor| {
            let EndpointDescriptor {
                id,
                fetch,
                fallback,
            } = descriptor;
            async move {
                let guarded = AssertUnwindSafe(fetch).catch_unwind();
                let outcome = match fetch_timeout {
                    Some(limit) => match tokio::time::timeout(limit, guarded).await {
                        Ok(settled) => settled,
                        Err(_) => Ok(Err(VoyageError::fetch_timeout(&id, limit))),
                    },
                    None => guarded.await,
                };
                let outcome = outcome.unwrap_or_else(|_| {
                    Err(VoyageError::internal(format!("fetch '{}' panicked", id)))
                });
                (id, outcome, fallback)
            }
        });

        let settled = futures::future::join_all(settling).await;

        let mut result = AggregateResult::default();
        for (id, outcome, fallback) in settled {
            let entry = match outcome {
                Ok(value) => AggregateEntry::live(value),
                Err(error) => {
                    self.reporter.report(&id, &error);
                    AggregateEntry::degraded(fallback, error)
                }
            };
            result.insert(id, entry);
        }

        debug!(
            endpoints = result.len(),
            degraded = result.degraded_ids().len(),
            "Aggregation settled"
        );
        result
    }
}

impl IntoFuture for PendingAggregate {
    type Output = AggregateResult;
    type IntoFuture = BoxFuture<'static, AggregateResult>;

    fn into_future(self) -> Self::IntoFuture {
        self.run().boxed()
    }
}

impl std::fmt::Debug for PendingAggregate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingAggregate")
            .field("descriptors", &self.descriptors)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(String, ErrorCode)>>,
    }

    impl FailureReporter for Recorder {
        fn report(&self, endpoint_id: &str, error: &VoyageError) {
            self.seen.lock().push((endpoint_id.to_string(), error.code()));
        }
    }

    fn ok<T: Send + 'static>(value: T) -> impl std::future::Future<Output = Result<T>> + Send {
        async move { Ok(value) }
    }

    fn failing<T: Send + 'static>() -> impl std::future::Future<Output = Result<T>> + Send {
        async { Err(VoyageError::new(ErrorCode::FetchFailed, "backend down")) }
    }

    #[tokio::test]
    async fn test_empty_aggregation_is_ready() {
        let pending = Aggregator::default().aggregate(Vec::new()).unwrap();
        assert!(pending.is_empty());

        let result = pending.into_future().now_or_never().expect("ready on first poll");
        assert!(result.is_empty());
        assert!(!result.any_degraded());
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected_before_fetching() {
        let started = Arc::new(Mutex::new(0));
        let counter = started.clone();
        let fetch = async move {
            *counter.lock() += 1;
            Ok::<_, VoyageError>(1u8)
        };

        let err = Aggregator::default()
            .aggregate(vec![
                EndpointDescriptor::new("stats", fetch, 0u8),
                EndpointDescriptor::new("stats", ok(2u8), 0u8),
            ])
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::DuplicateEndpoint);
        assert_eq!(*started.lock(), 0);
    }

    #[tokio::test]
    async fn test_failure_substitutes_fallback_and_reports() {
        let recorder = Arc::new(Recorder::default());
        let aggregator = Aggregator::default().with_reporter(recorder.clone());

        let result = aggregator
            .aggregate(vec![
                EndpointDescriptor::new("live", ok(7u32), 0u32),
                EndpointDescriptor::new("broken", failing::<u32>(), 99u32),
            ])
            .unwrap()
            .await;

        assert_eq!(result.get::<u32>("live"), Some(&7));
        assert!(!result.is_degraded("live"));
        assert_eq!(result.get::<u32>("broken"), Some(&99));
        assert!(result.is_degraded("broken"));
        assert_eq!(
            *recorder.seen.lock(),
            vec![("broken".to_string(), ErrorCode::FetchFailed)]
        );
    }

    #[tokio::test]
    async fn test_panicking_fetch_degrades() {
        let fetch = async {
            if true {
                panic!("bad payload");
            }
            Ok::<u8, VoyageError>(1)
        };

        let result = Aggregator::default()
            .aggregate(vec![EndpointDescriptor::new("odd", fetch, 5u8)])
            .unwrap()
            .await;

        assert_eq!(result.get::<u8>("odd"), Some(&5));
        assert_eq!(
            result.entry("odd").and_then(|e| e.failure()).map(|e| e.code()),
            Some(ErrorCode::InternalError)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_times_out() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, VoyageError>("late")
        };

        let result = Aggregator::default()
            .with_fetch_timeout(Some(Duration::from_secs(1)))
            .aggregate(vec![EndpointDescriptor::new("slow", slow, "fallback")])
            .unwrap()
            .await;

        assert_eq!(result.get::<&str>("slow"), Some(&"fallback"));
        assert_eq!(
            result.entry("slow").and_then(|e| e.failure()).map(|e| e.code()),
            Some(ErrorCode::FetchTimeout)
        );
    }
}
