//! Login endpoint.

use tracing::info;

use super::types::{LoginRequest, LoginResponse};
use super::ApiClient;
use crate::error::{Result, VoyageError};
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct AuthApi {
    client: ApiClient,
}

impl AuthApi {
    pub(crate) fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Exchange credentials for a session.
    ///
    /// The session is returned, not installed: hand it to the gate (or the
    /// session store) so a pending action can resume.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(VoyageError::validation("Email and password are required"));
        }

        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let response: LoginResponse = self
            .client
            .post(&self.client.config().login_path, &request)
            .await?;

        let session = Session::new(response.token, response.user).with_expiry(response.expires_at);
        info!(
            user_id = %session.identity.user_id,
            token = %session.fingerprint(),
            "Credentials accepted"
        );
        Ok(session)
    }
}
