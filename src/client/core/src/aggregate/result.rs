//! Settled aggregation results.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use super::descriptor::AnyValue;
use crate::error::VoyageError;

/// One settled slot of an aggregation.
pub struct AggregateEntry {
    value: AnyValue,
    failure: Option<VoyageError>,
}

impl AggregateEntry {
    pub(crate) fn live(value: AnyValue) -> Self {
        Self {
            value,
            failure: None,
        }
    }

    pub(crate) fn degraded(fallback: AnyValue, failure: VoyageError) -> Self {
        Self {
            value: fallback,
            failure: Some(failure),
        }
    }

    /// Whether the value is the declared fallback.
    pub fn is_degraded(&self) -> bool {
        self.failure.is_some()
    }

    /// Why the fetch failed, for degraded entries.
    pub fn failure(&self) -> Option<&VoyageError> {
        self.failure.as_ref()
    }

    pub fn value<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for AggregateEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateEntry")
            .field("degraded", &self.is_degraded())
            .field("failure", &self.failure.as_ref().map(|e| e.code()))
            .finish_non_exhaustive()
    }
}

/// Every requested endpoint's value, keyed and iterated by id.
///
/// Holds exactly one entry per descriptor of the aggregation that produced
/// it; degraded entries carry their fallback.
#[derive(Debug, Default)]
pub struct AggregateResult {
    entries: BTreeMap<String, AggregateEntry>,
}

impl AggregateResult {
    pub(crate) fn insert(&mut self, id: String, entry: AggregateEntry) {
        self.entries.insert(id, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Endpoint ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn entry(&self, id: &str) -> Option<&AggregateEntry> {
        self.entries.get(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &AggregateEntry)> {
        self.entries.iter().map(|(id, entry)| (id.as_str(), entry))
    }

    /// Borrow the value of `id` as `T`.
    ///
    /// Returns `None` if the id is unknown or `T` is not the type the
    /// descriptor was built with.
    pub fn get<T: Any>(&self, id: &str) -> Option<&T> {
        self.entries.get(id)?.value::<T>()
    }

    /// Move the value of `id` out as `T`, leaving other entries untouched.
    ///
    /// On a type mismatch the entry stays in place and `None` is returned.
    pub fn take<T: Any>(&mut self, id: &str) -> Option<T> {
        if !self.entries.get(id)?.value.is::<T>() {
            return None;
        }
        let entry = self.entries.remove(id)?;
        entry.value.downcast::<T>().ok().map(|boxed| *boxed)
    }

    pub fn is_degraded(&self, id: &str) -> bool {
        self.entries
            .get(id)
            .map(AggregateEntry::is_degraded)
            .unwrap_or(false)
    }

    /// Whether any entry fell back; drives the "partial data" banner.
    pub fn any_degraded(&self) -> bool {
        self.entries.values().any(AggregateEntry::is_degraded)
    }

    /// Ids of the degraded entries, in order.
    pub fn degraded_ids(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.is_degraded())
            .map(|(id, _)| id.clone())
            .collect()
    }
}
