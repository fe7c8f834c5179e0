//! Booking creation and the customer's own bookings.

use tracing::info;

use super::types::{BookingConfirmation, BookingRequest, CustomerBooking};
use super::ApiClient;
use crate::error::{Result, VoyageError};

#[derive(Debug, Clone)]
pub struct BookingsApi {
    client: ApiClient,
}

impl BookingsApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Book a package for the current user.
    pub async fn create_booking(&self, package_id: i64) -> Result<BookingConfirmation> {
        if package_id <= 0 {
            return Err(VoyageError::validation("Package id must be positive"));
        }
        let confirmation: BookingConfirmation = self
            .client
            .post(&self.client.config().booking_path, &BookingRequest { package_id })
            .await?;
        info!(package_id, booking_id = ?confirmation.booking_id, "Package booked");
        Ok(confirmation)
    }

    /// Bookings of the logged-in customer.
    pub async fn my_bookings(&self) -> Result<Vec<CustomerBooking>> {
        let path = format!(
            "{}/my-bookings",
            self.client.config().user_api_path.trim_end_matches('/')
        );
        self.client.get(&path).await
    }
}
