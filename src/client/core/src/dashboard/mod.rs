//! Dashboard loaders for the customer, agent and admin views.
//!
//! Each loader describes its sections as [`EndpointDescriptor`]s, runs them
//! through the [`Aggregator`] and turns the settled result into a typed
//! snapshot. A snapshot is always complete: failed sections carry their
//! fallback and are listed in `degraded`.

pub mod admin;
pub mod agent;
pub mod customer;
pub mod fallback;

pub use admin::AdminDashboard;
pub use agent::AgentDashboard;
pub use customer::CustomerDashboard;

use crate::aggregate::{AggregateResult, Aggregator, EndpointDescriptor, ViewScope};
use crate::api::ApiClient;
use crate::error::Result;

/// Section ids shared by the loaders.
pub mod sections {
    pub const STATS: &str = "stats";
    pub const PACKAGES: &str = "packages";
    pub const BOOKINGS: &str = "bookings";
    pub const INQUIRIES: &str = "inquiries";
    pub const USERS: &str = "users";
    pub const AGENTS: &str = "agents";
    pub const ACTIVITY: &str = "activity";
}

/// Advisory notice for a dashboard with fallback sections.
pub fn partial_data_banner(degraded: &[String]) -> Option<String> {
    if degraded.is_empty() {
        None
    } else {
        Some(format!(
            "Some data could not be loaded ({}); showing placeholder values.",
            degraded.join(", ")
        ))
    }
}

/// Loads dashboard snapshots from the booking API.
#[derive(Debug, Clone)]
pub struct DashboardLoader {
    api: ApiClient,
    aggregator: Aggregator,
}

impl DashboardLoader {
    pub fn new(api: ApiClient, aggregator: Aggregator) -> Self {
        Self { api, aggregator }
    }

    pub async fn customer(&self) -> Result<CustomerDashboard> {
        let result = self.run(customer::descriptors(&self.api)).await?;
        Ok(CustomerDashboard::from_result(self.api.sessions().valid_session(), result))
    }

    pub async fn agent(&self) -> Result<AgentDashboard> {
        let result = self.run(agent::descriptors(&self.api)).await?;
        Ok(AgentDashboard::from_result(result))
    }

    pub async fn admin(&self) -> Result<AdminDashboard> {
        let result = self.run(admin::descriptors(&self.api)).await?;
        Ok(AdminDashboard::from_result(result))
    }

    /// Agent dashboard for a view; `None` if the view closed first.
    pub async fn agent_in(&self, scope: &ViewScope) -> Result<Option<AgentDashboard>> {
        let pending = self.aggregator.aggregate(agent::descriptors(&self.api))?;
        Ok(pending.deliver_to(scope).await.map(AgentDashboard::from_result))
    }

    /// Admin dashboard for a view; `None` if the view closed first.
    pub async fn admin_in(&self, scope: &ViewScope) -> Result<Option<AdminDashboard>> {
        let pending = self.aggregator.aggregate(admin::descriptors(&self.api))?;
        Ok(pending.deliver_to(scope).await.map(AdminDashboard::from_result))
    }

    /// Customer dashboard for a view; `None` if the view closed first.
    pub async fn customer_in(&self, scope: &ViewScope) -> Result<Option<CustomerDashboard>> {
        let pending = self.aggregator.aggregate(customer::descriptors(&self.api))?;
        let user = self.api.sessions().valid_session();
        Ok(pending
            .deliver_to(scope)
            .await
            .map(|result| CustomerDashboard::from_result(user, result)))
    }

    async fn run(&self, descriptors: Vec<EndpointDescriptor>) -> Result<AggregateResult> {
        Ok(self.aggregator.aggregate(descriptors)?.await)
    }
}

/// Take a section's value, falling back if it is missing or mistyped.
pub(crate) fn take_or<T: 'static>(
    result: &mut AggregateResult,
    id: &str,
    fallback: impl FnOnce() -> T,
) -> T {
    result.take::<T>(id).unwrap_or_else(fallback)
}
