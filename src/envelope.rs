//! The JSON envelope wrapping every bot API response.
//!
//! ```json
//! {"ok": false, "error_code": 400, "description": "Bad Request: chat not found"}
//! {"ok": true, "result": {"id": 1, "is_bot": true, "first_name": "bot"}}
//! ```

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

/// A decoded response envelope.
///
/// `result` is present only when `ok` is `true` and the endpoint returns a
/// payload.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub ok: bool,
    pub error_code: Option<i64>,
    pub description: Option<String>,
    pub result: Option<T>,
    pub parameters: Option<ResponseParameters>,
}

impl<T: DeserializeOwned> Envelope<T> {
    /// Decodes a response body.
    ///
    /// Malformed JSON and schema mismatches in `result` both fail here.
    pub fn decode(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

impl<T> Envelope<T> {
    /// Builds the error reported by this envelope.
    ///
    /// Falls back to `fallback_code` (normally the HTTP status) when the
    /// envelope carries no `error_code`.
    pub fn to_api_error(&self, fallback_code: i64) -> ApiError {
        ApiError {
            code: self.error_code.unwrap_or(fallback_code),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| "no description".to_string()),
            parameters: self.parameters.clone(),
        }
    }
}

/// Extra hints attached to some error envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResponseParameters {
    /// The group was upgraded to a supergroup with this id.
    pub migrate_to_chat_id: Option<i64>,
    /// Seconds to wait before repeating a flood-limited request.
    pub retry_after: Option<u64>,
}

/// An application-level error reported by the API.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("API error {code}: {description}")]
pub struct ApiError {
    pub code: i64,
    pub description: String,
    pub parameters: Option<ResponseParameters>,
}

impl ApiError {
    /// How long the API asked us to wait, for flood-control errors.
    ///
    /// The client never waits on this by itself; callers decide.
    pub fn retry_after(&self) -> Option<Duration> {
        self.parameters
            .as_ref()?
            .retry_after
            .map(Duration::from_secs)
    }

    /// The supergroup id to use instead, for migrated groups.
    pub fn migrate_to_chat_id(&self) -> Option<i64> {
        self.parameters.as_ref()?.migrate_to_chat_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::IgnoredAny;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Id {
        id: u64,
    }

    #[test]
    fn test_decode_success_envelope() {
        let envelope = Envelope::<Id>::decode(br#"{"ok":true,"result":{"id":1}}"#).unwrap();
        assert!(envelope.ok);
        assert_eq!(envelope.result, Some(Id { id: 1 }));
        assert_eq!(envelope.error_code, None);
    }

    #[test]
    fn test_decode_error_envelope() {
        let body = br#"{"ok":false,"error_code":400,"description":"Bad Request: invalid file id"}"#;
        let envelope = Envelope::<Id>::decode(body).unwrap();
        assert!(!envelope.ok);
        assert!(envelope.result.is_none());

        let error = envelope.to_api_error(500);
        assert_eq!(error.code, 400);
        assert_eq!(error.to_string(), "API error 400: Bad Request: invalid file id");
    }

    #[test]
    fn test_missing_error_code_falls_back() {
        let envelope = Envelope::<IgnoredAny>::decode(br#"{"ok":false}"#).unwrap();
        let error = envelope.to_api_error(502);
        assert_eq!(error.code, 502);
        assert_eq!(error.description, "no description");
    }

    #[test]
    fn test_decode_rejects_malformed_body() {
        assert!(Envelope::<Id>::decode(b"not json").is_err());
        assert!(Envelope::<Id>::decode(br#"{"result":{"id":1}}"#).is_err());
        assert!(Envelope::<Id>::decode(br#"{"ok":true,"result":{"id":"one"}}"#).is_err());
    }

    #[test]
    fn test_flood_control_parameters() {
        let body = br#"{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 7","parameters":{"retry_after":7}}"#;
        let error = Envelope::<IgnoredAny>::decode(body).unwrap().to_api_error(429);
        assert_eq!(error.retry_after(), Some(Duration::from_secs(7)));
        assert_eq!(error.migrate_to_chat_id(), None);
    }
}
