//! Travel-agent API.

use reqwest::Method;

use super::types::{
    AgentBooking, AgentPackage, AgentPackageUpdate, AgentStats, BookingStatusUpdate,
    CustomerInquiry, InquiryReply, NewAgentPackage,
};
use super::ApiClient;
use crate::error::{Result, VoyageError};

/// Calls against the agent API (`/user-api`).
#[derive(Debug, Clone)]
pub struct AgentApi {
    client: ApiClient,
}

impl AgentApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    fn path(&self, suffix: &str) -> String {
        format!(
            "{}/{}",
            self.client.config().user_api_path.trim_end_matches('/'),
            suffix
        )
    }

    pub async fn stats(&self) -> Result<AgentStats> {
        self.client.get(&self.path("stats")).await
    }

    pub async fn packages(&self) -> Result<Vec<AgentPackage>> {
        self.client.get(&self.path("packages")).await
    }

    pub async fn bookings(&self) -> Result<Vec<AgentBooking>> {
        self.client.get(&self.path("bookings")).await
    }

    pub async fn inquiries(&self) -> Result<Vec<CustomerInquiry>> {
        self.client.get(&self.path("inquiries")).await
    }

    pub async fn create_package(&self, package: &NewAgentPackage) -> Result<AgentPackage> {
        if package.name.trim().is_empty() {
            return Err(VoyageError::validation("Package name is required"));
        }
        self.client.post(&self.path("packages"), package).await
    }

    pub async fn update_package(&self, id: i64, update: &AgentPackageUpdate) -> Result<AgentPackage> {
        self.client
            .put(&self.path(&format!("packages/{}", id)), update)
            .await
    }

    pub async fn delete_package(&self, id: i64) -> Result<()> {
        self.client.delete(&self.path(&format!("packages/{}", id))).await
    }

    pub async fn update_booking_status(&self, booking_id: i64, status: &str) -> Result<()> {
        if status.trim().is_empty() {
            return Err(VoyageError::validation("Booking status is required"));
        }
        self.client
            .send_json(
                Method::PUT,
                &self.path(&format!("bookings/{}/status", booking_id)),
                &BookingStatusUpdate { status },
            )
            .await
    }

    pub async fn respond_to_inquiry(&self, inquiry_id: i64, response: &str) -> Result<()> {
        if response.trim().is_empty() {
            return Err(VoyageError::validation("Response text is required"));
        }
        self.client
            .send_json(
                Method::POST,
                &self.path(&format!("inquiries/{}/respond", inquiry_id)),
                &InquiryReply { response },
            )
            .await
    }
}
