//! Travel-agent dashboard.

use serde::Serialize;

use super::{fallback, partial_data_banner, sections, take_or};
use crate::aggregate::{AggregateResult, EndpointDescriptor};
use crate::api::types::{AgentBooking, AgentPackage, AgentStats, CustomerInquiry};
use crate::api::ApiClient;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentDashboard {
    pub stats: AgentStats,
    pub packages: Vec<AgentPackage>,
    pub bookings: Vec<AgentBooking>,
    pub inquiries: Vec<CustomerInquiry>,
    /// Sections showing fallback data
    pub degraded: Vec<String>,
}

impl AgentDashboard {
    pub fn from_result(mut result: AggregateResult) -> Self {
        let degraded = result.degraded_ids();
        Self {
            stats: take_or(&mut result, sections::STATS, fallback::agent_stats),
            packages: take_or(&mut result, sections::PACKAGES, fallback::agent_packages),
            bookings: take_or(&mut result, sections::BOOKINGS, fallback::agent_bookings),
            inquiries: take_or(&mut result, sections::INQUIRIES, fallback::customer_inquiries),
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
    let agent = api.agent();
    vec![
        EndpointDescriptor::new(
            sections::STATS,
            {
                let agent = agent.clone();
                async move { agent.stats().await }
            },
            fallback::agent_stats(),
        ),
        EndpointDescriptor::new(
            sections::PACKAGES,
            {
                let agent = agent.clone();
                async move { agent.packages().await }
            },
            fallback::agent_packages(),
        ),
        EndpointDescriptor::new(
            sections::BOOKINGS,
            {
                let agent = agent.clone();
                async move { agent.bookings().await }
            },
            fallback::agent_bookings(),
        ),
        EndpointDescriptor::new(
            sections::INQUIRIES,
            async move { agent.inquiries().await },
            fallback::customer_inquiries(),
        ),
    ]
}
