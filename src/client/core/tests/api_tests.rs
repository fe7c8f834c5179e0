//! Integration tests for the REST client against a mock booking API.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::json;
use std::sync::Arc;
use voyage_core::api::types::{AgentPackageUpdate, NewAgentPackage, PackageUpdate};
use voyage_core::api::ApiClient;
use voyage_core::config::ApiConfig;
use voyage_core::session::{Role, Session, SessionStore, UserIdentity};
use voyage_core::ErrorCode;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Test Utilities
// ============================================================================

fn client(server: &MockServer, sessions: Arc<SessionStore>) -> ApiClient {
    let config = ApiConfig {
        base_url: server.uri(),
        ..ApiConfig::default()
    };
    ApiClient::new(&config, sessions).unwrap()
}

fn logged_in(token: &str, role: Role) -> Arc<SessionStore> {
    let sessions = Arc::new(SessionStore::in_memory());
    sessions
        .login(Session::new(
            token,
            UserIdentity {
                user_id: "u-9".to_string(),
                full_name: "Ayush Sharma".to_string(),
                email: "ayush@example.com".to_string(),
                role,
            },
        ))
        .unwrap();
    sessions
}

fn jwt_with_exp(exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({"sub": "u-9", "exp": exp}).to_string());
    format!("{}.{}.signature", header, payload)
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_login_returns_session_with_token_expiry() {
    let server = MockServer::start().await;
    let exp = chrono::Utc::now().timestamp() + 3600;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .and(body_json(json!({"email": "ayush@example.com", "password": "secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": jwt_with_exp(exp),
            "user": {"id": 9, "name": "Ayush Sharma", "email": "ayush@example.com", "role": "CUSTOMER"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let sessions = Arc::new(SessionStore::in_memory());
    let api = client(&server, sessions.clone());
    let session = api.auth().login(" ayush@example.com ", "secret").await.unwrap();

    assert_eq!(session.identity.user_id, "9");
    assert_eq!(session.identity.role, Role::Customer);
    assert_eq!(session.expires_at.map(|at| at.timestamp()), Some(exp));
    // login hands the session back; installing it is the caller's job
    assert!(!sessions.is_authenticated());
}

#[tokio::test]
async fn test_login_prefers_explicit_expiry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": jwt_with_exp(1),
            "user": {"userId": "u-1", "email": "a@b.co"},
            "expiresAt": "2099-01-01T00:00:00Z"
        })))
        .mount(&server)
        .await;

    let api = client(&server, Arc::new(SessionStore::in_memory()));
    let session = api.auth().login("a@b.co", "pw").await.unwrap();
    assert!(session.validate().is_ok());
}

#[tokio::test]
async fn test_rejected_credentials_map_to_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad credentials"))
        .mount(&server)
        .await;

    let api = client(&server, Arc::new(SessionStore::in_memory()));
    let err = api.auth().login("a@b.co", "wrong").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unauthorized);
    assert!(err.requires_login());
}

#[tokio::test]
async fn test_blank_credentials_never_hit_the_network() {
    let server = MockServer::start().await;
    let api = client(&server, Arc::new(SessionStore::in_memory()));

    let err = api.auth().login("", "pw").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
    assert!(server.received_requests().await.unwrap().is_empty());
}

// ============================================================================
// Packages
// ============================================================================

#[tokio::test]
async fn test_anonymous_requests_have_no_authorization() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/packages"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/packages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"packageId": 1, "title": "Goa Beach Escape", "price": 18000, "duration": 4}
        ])))
        .mount(&server)
        .await;

    let api = client(&server, Arc::new(SessionStore::in_memory()));
    let packages = api.packages().fetch_all().await.unwrap();
    assert_eq!(packages.len(), 1);
    assert_eq!(packages[0].title, "Goa Beach Escape");
}

#[tokio::test]
async fn test_missing_package_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/packages/404"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let api = client(&server, Arc::new(SessionStore::in_memory()));
    let err = api.packages().fetch_by_id(404).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_eq!(err.details().http_status, Some(404));
}

#[tokio::test]
async fn test_partial_package_update_sends_only_set_fields() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/packages/7"))
        .and(header("authorization", "Bearer admin-token"))
        .and(body_json(json!({"price": 15000.0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "packageId": 7, "title": "Shimla Hills", "price": 15000, "duration": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = client(&server, logged_in("admin-token", Role::Admin));
    let update = PackageUpdate {
        price: Some(15000.0),
        ..Default::default()
    };
    let updated = api.packages().update(7, &update).await.unwrap();
    assert_eq!(updated.price, 15000.0);
}

#[tokio::test]
async fn test_unreadable_body_is_deserialization_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/packages"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let api = client(&server, Arc::new(SessionStore::in_memory()));
    let err = api.packages().fetch_all().await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::DeserializationError);
}

// ============================================================================
// Agent
// ============================================================================

#[tokio::test]
async fn test_agent_package_lifecycle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/user-api/packages"))
        .and(body_json(json!({"name": "Ladakh Ride", "price": 32000.0})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 31, "name": "Ladakh Ride", "status": "Active", "bookings": 0
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/user-api/packages/31"))
        .and(body_json(json!({"status": "Inactive"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 31, "name": "Ladakh Ride", "status": "Inactive"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/user-api/packages/31"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let agent = client(&server, logged_in("agent-token", Role::Agent)).agent();
    let created = agent
        .create_package(&NewAgentPackage {
            name: "Ladakh Ride".to_string(),
            description: None,
            price: Some(32000.0),
        })
        .await
        .unwrap();
    assert_eq!(created.id, 31);

    let updated = agent
        .update_package(
            31,
            &AgentPackageUpdate {
                status: Some("Inactive".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.status, "Inactive");
    assert_eq!(updated.bookings, 0);

    agent.delete_package(31).await.unwrap();
}

#[tokio::test]
async fn test_booking_status_and_inquiry_reply() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/user-api/bookings/201/status"))
        .and(body_json(json!({"status": "Confirmed"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/user-api/inquiries/2/respond"))
        .and(body_json(json!({"response": "Yes, airport pickup is included."})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let agent = client(&server, logged_in("agent-token", Role::Agent)).agent();
    agent.update_booking_status(201, "Confirmed").await.unwrap();
    agent
        .respond_to_inquiry(2, "Yes, airport pickup is included.")
        .await
        .unwrap();

    let err = agent.respond_to_inquiry(2, "   ").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
}

#[tokio::test]
async fn test_forbidden_for_customers() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin-api/users"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let admin = client(&server, logged_in("customer-token", Role::Customer)).admin();
    let err = admin.users().await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Forbidden);
    assert!(!err.requires_login());
}

// ============================================================================
// Bookings
// ============================================================================

#[tokio::test]
async fn test_my_bookings_and_invalid_package_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/user-api/my-bookings"))
        .and(header("authorization", "Bearer customer-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": 5, "packageId": 77, "package": "Kerala Backwaters", "date": "2026-11-02", "status": "Pending", "amount": 25000}
        ])))
        .mount(&server)
        .await;

    let bookings = client(&server, logged_in("customer-token", Role::Customer)).bookings();
    let mine = bookings.my_bookings().await.unwrap();
    assert_eq!(mine[0].package_id, Some(77));

    let err = bookings.create_booking(0).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
}
