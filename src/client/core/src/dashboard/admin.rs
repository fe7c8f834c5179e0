//! Admin dashboard.

use serde::Serialize;

use super::{fallback, partial_data_banner, sections, take_or};
use crate::aggregate::{AggregateResult, EndpointDescriptor};
use crate::api::types::{AdminBooking, AdminStats, AgentSummary, SystemActivity, UserSummary};
use crate::api::ApiClient;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdminDashboard {
    pub stats: AdminStats,
    pub users: Vec<UserSummary>,
    pub agents: Vec<AgentSummary>,
    pub bookings: Vec<AdminBooking>,
    pub activity: Vec<SystemActivity>,
    pub degraded: Vec<String>,
}

impl AdminDashboard {
    pub fn from_result(mut result: AggregateResult) -> Self {
        let degraded = result.degraded_ids();
        Self {
            stats: take_or(&mut result, sections::STATS, fallback::admin_stats),
            users: take_or(&mut result, sections::USERS, Vec::new),
            agents: take_or(&mut result, sections::AGENTS, Vec::new),
            bookings: take_or(&mut result, sections::BOOKINGS, Vec::new),
            activity: take_or(&mut result, sections::ACTIVITY, Vec::new),
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
    let admin = api.admin();
    let stats = admin.clone();
    let users = admin.clone();
    let agents = admin.clone();
    let bookings = admin.clone();
    vec![
        EndpointDescriptor::new(
            sections::STATS,
            async move { stats.stats().await },
            fallback::admin_stats(),
        ),
        EndpointDescriptor::new(
            sections::USERS,
            async move { users.users().await },
            Vec::<UserSummary>::new(),
        ),
        EndpointDescriptor::new(
            sections::AGENTS,
            async move { agents.agents().await },
            Vec::<AgentSummary>::new(),
        ),
        EndpointDescriptor::new(
            sections::BOOKINGS,
            async move { bookings.bookings().await },
            Vec::<AdminBooking>::new(),
        ),
        EndpointDescriptor::new(
            sections::ACTIVITY,
            async move { admin.activity().await },
            Vec::<SystemActivity>::new(),
        ),
    ]
}
