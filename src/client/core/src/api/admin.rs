//! Admin API.

use super::types::{AdminBooking, AdminStats, AgentSummary, SystemActivity, UserSummary};
use super::ApiClient;
use crate::error::Result;

/// Read-only calls against the admin API (`/admin-api`).
#[derive(Debug, Clone)]
pub struct AdminApi {
    client: ApiClient,
}

impl AdminApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn path(&self, suffix: &str) -> String {
        format!(
            "{}/{}",
            self.client.config().admin_api_path.trim_end_matches('/'),
            suffix
        )
    }

    pub async fn stats(&self) -> Result<AdminStats> {
        self.client.get(&self.path("stats")).await
    }

    pub async fn users(&self) -> Result<Vec<UserSummary>> {
        self.client.get(&self.path("users")).await
    }

    pub async fn agents(&self) -> Result<Vec<AgentSummary>> {
        self.client.get(&self.path("agents")).await
    }

    pub async fn bookings(&self) -> Result<Vec<AdminBooking>> {
        self.client.get(&self.path("bookings")).await
    }

    pub async fn activity(&self) -> Result<Vec<SystemActivity>> {
        self.client.get(&self.path("activity")).await
    }
}
