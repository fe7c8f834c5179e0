//! REST client for the booking API.
//!
//! [`ApiClient`] owns the HTTP connection pool and reads the
//! [`SessionStore`] on every request: a valid session adds
//! `Authorization: Bearer <token>`, anything else goes out unauthenticated.
//! The service wrappers ([`PackagesApi`], [`AgentApi`], [`AdminApi`],
//! [`BookingsApi`], [`AuthApi`]) are plain request/response functions.

mod admin;
mod agent;
mod auth;
mod bookings;
mod packages;
pub mod types;

pub use admin::AdminApi;
pub use agent::AgentApi;
pub use auth::AuthApi;
pub use bookings::BookingsApi;
pub use packages::PackagesApi;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::config::ApiConfig;
use crate::error::{ErrorCode, ErrorDetails, Result, VoyageError};
use crate::session::SessionStore;
use crate::telemetry::SensitiveFieldRedactor;

/// Longest error body kept in an error's internal message.
const MAX_ERROR_BODY: usize = 512;

/// HTTP client for the booking API.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    config: ApiConfig,
    sessions: Arc<SessionStore>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// Create a client for `config.base_url`.
    pub fn new(config: &ApiConfig, sessions: Arc<SessionStore>) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                VoyageError::with_internal(
                    ErrorCode::ConfigurationError,
                    "Failed to create HTTP client",
                    e.to_string(),
                )
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
            sessions,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn packages(&self) -> PackagesApi {
        PackagesApi::new(self.clone())
    }

    pub fn agent(&self) -> AgentApi {
        AgentApi::new(self.clone())
    }

    pub fn admin(&self) -> AdminApi {
        AdminApi::new(self.clone())
    }

    pub fn bookings(&self) -> BookingsApi {
        BookingsApi::new(self.clone())
    }

    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    /// GET and decode a JSON body.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self.send(self.request(Method::GET, path)).await?;
        decode(resp).await
    }

    /// POST a JSON body and decode the JSON response.
    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let resp = self.send(self.request(Method::POST, path).json(body)).await?;
        decode(resp).await
    }

    /// PUT a JSON body and decode the JSON response.
    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let resp = self.send(self.request(Method::PUT, path).json(body)).await?;
        decode(resp).await
    }

    /// Send a JSON body and ignore the response body.
    pub async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<()> {
        self.send(self.request(method, path).json(body)).await?;
        Ok(())
    }

    /// DELETE, ignoring the response body.
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.send(self.request(Method::DELETE, path)).await?;
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match self.sessions.bearer() {
            Some(bearer) => builder.header(reqwest::header::AUTHORIZATION, bearer),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let request = builder.build()?;
        let method = request.method().clone();
        let url = request.url().to_string();
        let authenticated = request.headers().contains_key(reqwest::header::AUTHORIZATION);

        debug!(method = %method, url = %url, authenticated, "Sending request");
        let resp = self.client.execute(request).await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        Err(status_error(status.as_u16(), &method, &url, &body))
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| {
        VoyageError::with_internal(
            ErrorCode::DeserializationError,
            "The booking service returned an unreadable response",
            e.to_string(),
        )
        .with_source(e)
    })
}

fn status_error(status: u16, method: &Method, url: &str, body: &str) -> VoyageError {
    let code = ErrorCode::from_http_status(status);
    let user_message = match code {
        ErrorCode::Unauthorized => "Please log in to continue",
        ErrorCode::Forbidden => "You are not allowed to do that",
        ErrorCode::NotFound => "The requested item was not found",
        ErrorCode::ValidationError => "The booking service rejected the request",
        ErrorCode::RequestTimeout => "The booking service did not respond in time",
        _ => "The booking service returned an error",
    };

    let mut body = SensitiveFieldRedactor::global().redact_value(body);
    if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }

    VoyageError::with_internal(
        code,
        user_message,
        format!("{} {} returned {}: {}", method, url, status, body),
    )
    .with_details(ErrorDetails::new().with_http_status(status))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_mapping() {
        let err = status_error(401, &Method::GET, "http://x/api", "");
        assert_eq!(err.code(), ErrorCode::Unauthorized);
        assert!(err.requires_login());

        let err = status_error(404, &Method::GET, "http://x/api/packages/9", "missing");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert_eq!(err.details().http_status, Some(404));

        let err = status_error(500, &Method::POST, "http://x/api", "boom");
        assert_eq!(err.code(), ErrorCode::ApiError);
    }

    #[test]
    fn test_status_error_redacts_and_truncates_body() {
        let body = format!(r#"{{"password":"hunter2","pad":"{}"}}"#, "x".repeat(2000));
        let err = status_error(400, &Method::POST, "http://x/login", &body);
        let internal = err.internal_message().unwrap();
        assert!(!internal.contains("hunter2"));
        assert!(internal.len() < 700);
    }

    #[test]
    fn test_url_joining() {
        let sessions = Arc::new(SessionStore::in_memory());
        let config = ApiConfig {
            base_url: "http://gateway:9999/".to_string(),
            ..ApiConfig::default()
        };
        let client = ApiClient::new(&config, sessions).unwrap();
        assert_eq!(client.url("/api/packages"), "http://gateway:9999/api/packages");
        assert_eq!(client.url("user-api/stats"), "http://gateway:9999/user-api/stats");
    }
}
