//! Customer dashboard: the catalogue plus the user's own bookings.

use serde::Serialize;

use super::{partial_data_banner, sections, take_or};
use crate::aggregate::{AggregateResult, EndpointDescriptor};
use crate::api::types::{CustomerBooking, TravelPackage};
use crate::api::ApiClient;
use crate::session::{Session, UserIdentity};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerDashboard {
    /// Logged-in user, if any
    pub user: Option<UserIdentity>,
    pub packages: Vec<TravelPackage>,
    pub bookings: Vec<CustomerBooking>,
    pub degraded: Vec<String>,
}

impl CustomerDashboard {
    pub fn from_result(session: Option<Session>, mut result: AggregateResult) -> Self {
        let degraded = result.degraded_ids();
        Self {
            user: session.map(|s| s.identity),
            packages: take_or(&mut result, sections::PACKAGES, Vec::new),
            bookings: take_or(&mut result, sections::BOOKINGS, Vec::new),
            degraded,
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.degraded.is_empty()
    }

    pub fn banner(&self) -> Option<String> {
        partial_data_banner(&self.degraded)
    }
}

pub(crate) fn descriptors(api: &ApiClient) -> Vec<EndpointDescriptor> {
    let packages = api.packages();
    let bookings = api.bookings();
    vec![
        EndpointDescriptor::new(
            sections::PACKAGES,
            async move { packages.fetch_all().await },
            Vec::<TravelPackage>::new(),
        ),
        EndpointDescriptor::new(
            sections::BOOKINGS,
            async move { bookings.my_bookings().await },
            Vec::<CustomerBooking>::new(),
        ),
    ]
}
