//! Records exchanged with the booking API.
//!
//! Field names follow the services' camelCase JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::session::UserIdentity;

// ═══════════════════════════════════════════════════════════════════════════════
// Package service
// ═══════════════════════════════════════════════════════════════════════════════

/// A bookable travel package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelPackage {
    pub package_id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Length in days
    #[serde(default)]
    pub duration: u32,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub include_service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<String>,
    #[serde(default)]
    pub flights: Vec<serde_json::Value>,
    #[serde(default)]
    pub hotels: Vec<serde_json::Value>,
    #[serde(default)]
    pub sightseeing_list: Vec<serde_json::Value>,
}

/// A package to create; the service assigns the id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDraft {
    pub title: String,
    pub description: String,
    pub duration: u32,
    pub price: f64,
    pub include_service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlights: Option<String>,
    #[serde(default)]
    pub flights: Vec<serde_json::Value>,
    #[serde(default)]
    pub hotels: Vec<serde_json::Value>,
    #[serde(default)]
    pub sightseeing_list: Vec<serde_json::Value>,
}

/// Partial package update. Unset fields are left untouched by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlights: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Agent API
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStats {
    pub packages_managed: u32,
    pub bookings: u32,
    pub earnings: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPackage {
    pub id: i64,
    pub name: String,
    pub status: String,
    #[serde(default)]
    pub bookings: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentBooking {
    pub id: i64,
    pub customer: String,
    pub package: String,
    pub date: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInquiry {
    pub id: i64,
    pub customer: String,
    pub message: String,
    pub time: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewAgentPackage {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AgentPackageUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct BookingStatusUpdate<'a> {
    pub status: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct InquiryReply<'a> {
    pub response: &'a str,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Admin API
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub total_users: u32,
    pub total_agents: u32,
    pub total_bookings: u32,
    pub total_revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentSummary {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminBooking {
    pub id: i64,
    pub user: String,
    pub package: String,
    pub date: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemActivity {
    pub id: i64,
    pub action: String,
    pub time: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Customer bookings
// ═══════════════════════════════════════════════════════════════════════════════

/// A booking as listed on the customer's own dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerBooking {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_id: Option<i64>,
    pub package: String,
    pub date: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub package_id: i64,
}

/// What the booking endpoint returns for a new booking.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    #[serde(default, alias = "id", skip_serializing_if = "Option::is_none")]
    pub booking_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub package_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Auth
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub user: UserIdentity,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("user", &self.user)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_travel_package_tolerates_missing_collections() {
        let pkg: TravelPackage = serde_json::from_str(
            r#"{"packageId":77,"title":"Kerala Backwaters","price":25000,"duration":5,"includeService":"Kochi"}"#,
        )
        .unwrap();
        assert_eq!(pkg.package_id, 77);
        assert!(pkg.flights.is_empty());
        assert!(pkg.image.is_none());
    }

    #[test]
    fn test_booking_request_shape() {
        let body = serde_json::to_value(BookingRequest { package_id: 77 }).unwrap();
        assert_eq!(body, serde_json::json!({"packageId": 77}));
    }

    #[test]
    fn test_package_update_skips_unset_fields() {
        let update = PackageUpdate {
            price: Some(19999.0),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(update).unwrap(),
            serde_json::json!({"price": 19999.0})
        );
    }

    #[test]
    fn test_login_request_debug_hides_password() {
        let request = LoginRequest {
            email: "a@b.c".into(),
            password: "hunter2".into(),
        };
        assert!(!format!("{:?}", request).contains("hunter2"));
    }
}
