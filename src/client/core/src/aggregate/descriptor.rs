//! Endpoint descriptors: a named fetch paired with its fallback.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;

use crate::error::{Result, VoyageError};

/// A type-erased aggregated value.
pub type AnyValue = Box<dyn Any + Send + Sync>;

pub(crate) type ErasedFetch = BoxFuture<'static, Result<AnyValue>>;

/// One independent fetch of an aggregation.
///
/// The value type is fixed when the descriptor is built and erased
/// afterwards, so a single aggregation can mix a stats object with lists of
/// packages or bookings. Read the values back with
/// [`AggregateResult::get`](super::AggregateResult::get) or
/// [`AggregateResult::take`](super::AggregateResult::take).
pub struct EndpointDescriptor {
    pub(crate) id: String,
    pub(crate) fetch: ErasedFetch,
    pub(crate) fallback: AnyValue,
}

impl EndpointDescriptor {
    /// Describe a fetch with the value to use when it fails.
    pub fn new<T, F, E>(id: impl Into<String>, fetch: F, fallback: T) -> Self
    where
        T: Any + Send + Sync,
        F: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Into<VoyageError> + 'static,
    {
        let fetch: ErasedFetch = fetch
            .map(|outcome| outcome.map(|value| Box::new(value) as AnyValue).map_err(Into::into))
            .boxed();

        Self {
            id: id.into(),
            fetch,
            fallback: Box::new(fallback),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Debug for EndpointDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointDescriptor")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}
