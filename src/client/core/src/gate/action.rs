//! Protected actions executed by the gate.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::intent::{ActionIntent, ActionKind};
use crate::api::BookingsApi;
use crate::error::{ErrorCode, Result, VoyageError};
use crate::session::Session;

/// Outcome of a successfully executed protected action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionReceipt {
    pub intent_id: Uuid,
    pub kind: ActionKind,
    /// Whatever the service returned for the action
    pub detail: serde_json::Value,
    pub completed_at: DateTime<Utc>,
}

/// An action that requires an authenticated session.
#[async_trait]
pub trait ProtectedAction: Send + Sync {
    /// Which intents this action executes.
    fn kind(&self) -> ActionKind;

    /// Run the action for `intent` on behalf of `session`.
    async fn execute(&self, intent: &ActionIntent, session: &Session) -> Result<serde_json::Value>;
}

/// Books the package named by `params.packageId`.
#[derive(Debug, Clone)]
pub struct BookingAction {
    bookings: BookingsApi,
}

impl BookingAction {
    pub fn new(bookings: BookingsApi) -> Self {
        Self { bookings }
    }
}

#[async_trait]
impl ProtectedAction for BookingAction {
    fn kind(&self) -> ActionKind {
        ActionKind::Book
    }

    async fn execute(&self, intent: &ActionIntent, _session: &Session) -> Result<serde_json::Value> {
        let package_id = intent.package_id().ok_or_else(|| {
            VoyageError::new(ErrorCode::InvalidInput, "Booking intent has no package id")
        })?;
        let confirmation = self.bookings.create_booking(package_id).await?;
        Ok(serde_json::to_value(confirmation)?)
    }
}
