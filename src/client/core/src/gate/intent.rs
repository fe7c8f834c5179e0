//! Action intents and their durable tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;
use uuid::Uuid;

use crate::error::{ErrorCode, Result, VoyageError};

/// Protected actions the gate knows how to resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    /// Book a travel package (`params.packageId`).
    Book,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Book => write!(f, "booking"),
        }
    }
}

/// A recorded protected action awaiting authentication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionIntent {
    /// Identity of this intent; a resumed intent is never executed again
    pub id: Uuid,
    pub kind: ActionKind,
    pub params: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl ActionIntent {
    pub fn new(kind: ActionKind, params: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            params,
            created_at: Utc::now(),
        }
    }

    /// Intent to book `package_id`.
    pub fn book(package_id: i64) -> Self {
        Self::new(ActionKind::Book, serde_json::json!({ "packageId": package_id }))
    }

    pub fn package_id(&self) -> Option<i64> {
        self.params.get("packageId").and_then(serde_json::Value::as_i64)
    }

    /// Whether both intents describe the same action, ignoring identity and age.
    pub fn same_action(&self, other: &ActionIntent) -> bool {
        self.kind == other.kind && self.params == other.params
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Intent Token
// ═══════════════════════════════════════════════════════════════════════════════

/// Path prefix of package detail locations.
const PACKAGE_PATH: &str = "packages";
/// Query flag marking a pending booking.
const BOOKING_FLAG: &str = "booking";
/// Query parameter carrying the intent id.
const INTENT_PARAM: &str = "intent";

/// Durable encoding of an intent that survives navigation and restarts.
///
/// Two forms are understood:
/// - a location, `/packages/{id}?booking=true&intent={uuid}`; without the
///   optional `intent` parameter the id is derived from the package, so the
///   same bare link always names the same intent
/// - an opaque URL-safe string (base64 of the intent's JSON), used for
///   storage
#[derive(Debug, Clone, PartialEq)]
pub struct IntentToken {
    intent: ActionIntent,
}

impl IntentToken {
    pub fn new(intent: ActionIntent) -> Self {
        Self { intent }
    }

    pub fn intent(&self) -> &ActionIntent {
        &self.intent
    }

    pub fn into_intent(self) -> ActionIntent {
        self.intent
    }

    /// Encode into the opaque storage form.
    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_vec(&self.intent).map_err(|e| {
            VoyageError::with_internal(
                ErrorCode::SerializationError,
                "Failed to encode intent",
                e.to_string(),
            )
        })?;
        Ok(URL_SAFE_NO_PAD.encode(json))
    }

    /// Decode the opaque storage form.
    pub fn decode(token: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|e| invalid_token("Invalid intent token format", e))?;
        let intent = serde_json::from_slice(&bytes)
            .map_err(|e| invalid_token("Invalid intent token contents", e))?;
        Ok(Self { intent })
    }

    /// Render as a package detail location.
    pub fn to_location(&self) -> Result<String> {
        match self.intent.kind {
            ActionKind::Book => {
                let package_id = self.intent.package_id().ok_or_else(|| {
                    VoyageError::new(
                        ErrorCode::InvalidIntentToken,
                        "Booking intent has no package id",
                    )
                })?;
                Ok(format!(
                    "/{}/{}?{}=true&{}={}",
                    PACKAGE_PATH, package_id, BOOKING_FLAG, INTENT_PARAM, self.intent.id
                ))
            }
        }
    }

    /// Parse a package detail location carrying `booking=true`.
    pub fn from_location(location: &str) -> Result<Self> {
        let base = Url::parse("voyage://app/").map_err(|e| invalid_token("Invalid location", e))?;
        let url = base
            .join(location.trim())
            .map_err(|e| invalid_token("Invalid location", e))?;

        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|segment| !segment.is_empty()).collect())
            .unwrap_or_default();
        let package_id = match segments.as_slice() {
            [PACKAGE_PATH, id] => id.parse::<i64>().map_err(|e| invalid_token("Invalid package id", e))?,
            _ => {
                return Err(VoyageError::with_internal(
                    ErrorCode::InvalidIntentToken,
                    "Location is not a package page",
                    location.to_string(),
                ))
            }
        };

        let mut booking = false;
        let mut intent_id = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                BOOKING_FLAG => booking = value == "true",
                INTENT_PARAM => {
                    intent_id = Some(
                        Uuid::parse_str(&value).map_err(|e| invalid_token("Invalid intent id", e))?,
                    )
                }
                _ => {}
            }
        }
        if !booking {
            return Err(VoyageError::with_internal(
                ErrorCode::InvalidIntentToken,
                "Location carries no booking intent",
                location.to_string(),
            ));
        }

        let mut intent = ActionIntent::book(package_id);
        intent.id = intent_id.unwrap_or_else(|| bare_location_id(package_id));
        Ok(Self { intent })
    }

    /// Accept either form.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.starts_with('/') || input.contains('?') {
            Self::from_location(input)
        } else {
            Self::decode(input)
        }
    }
}

impl From<ActionIntent> for IntentToken {
    fn from(intent: ActionIntent) -> Self {
        Self::new(intent)
    }
}

/// Stable id of the intent behind `/packages/{id}?booking=true`.
fn bare_location_id(package_id: i64) -> Uuid {
    let name = format!("voyage://app/{}/{}?{}=true", PACKAGE_PATH, package_id, BOOKING_FLAG);
    Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes())
}

fn invalid_token(message: &'static str, cause: impl fmt::Display) -> VoyageError {
    VoyageError::with_internal(ErrorCode::InvalidIntentToken, message, cause.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_intent_params() {
        let intent = ActionIntent::book(77);
        assert_eq!(intent.kind, ActionKind::Book);
        assert_eq!(intent.params, serde_json::json!({"packageId": 77}));
        assert_eq!(intent.package_id(), Some(77));
    }

    #[test]
    fn test_encoded_token_is_url_safe_and_stable() {
        let token = IntentToken::new(ActionIntent::book(77));
        let encoded = token.encode().unwrap();
        assert!(encoded
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));

        let decoded = IntentToken::decode(&encoded).unwrap();
        assert_eq!(decoded, token);
    }

    #[test]
    fn test_location_form() {
        let intent = ActionIntent::book(77);
        let location = IntentToken::new(intent.clone()).to_location().unwrap();
        assert!(location.starts_with("/packages/77?booking=true"));

        let parsed = IntentToken::from_location(&location).unwrap();
        assert_eq!(parsed.intent().id, intent.id);
        assert!(parsed.intent().same_action(&intent));
    }

    #[test]
    fn test_bare_location_id_is_stable_per_package() {
        let a = IntentToken::from_location("/packages/77?booking=true").unwrap();
        let b = IntentToken::from_location("/packages/77?booking=true&utm=mail").unwrap();
        let other = IntentToken::from_location("/packages/78?booking=true").unwrap();
        assert_eq!(a.intent().package_id(), Some(77));
        assert_eq!(a.intent().id, b.intent().id);
        assert_ne!(a.intent().id, other.intent().id);
        assert_ne!(a.intent().id, ActionIntent::book(77).id);
    }

    #[test]
    fn test_location_without_booking_flag_is_rejected() {
        let err = IntentToken::from_location("/packages/77").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidIntentToken);

        let err = IntentToken::from_location("/packages/77?booking=false").unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidIntentToken);
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(IntentToken::decode("%%%").is_err());
        assert!(IntentToken::decode(&URL_SAFE_NO_PAD.encode("{}")).is_err());
        assert!(IntentToken::from_location("/dashboard?booking=true").is_err());
        assert!(IntentToken::from_location("/packages/abc?booking=true").is_err());
    }

    #[test]
    fn test_parse_accepts_both_forms() {
        let token = IntentToken::new(ActionIntent::book(5));
        let encoded = token.encode().unwrap();
        let location = token.to_location().unwrap();

        assert_eq!(IntentToken::parse(&encoded).unwrap(), token);
        assert_eq!(IntentToken::parse(&location).unwrap().intent().id, token.intent().id);
    }
}
