//! Decoding of inbound webhook payloads.

use crate::models::Update;
use crate::{Error, Result};

/// Parses the body of a webhook request into an [`Update`].
///
/// Webhook bodies are bare updates, not envelopes. There is no network
/// exchange and therefore no retry.
///
/// # Examples
///
/// ```
/// let body = br#"{"update_id": 10, "message": {"message_id": 1, "date": 0,
///     "chat": {"id": 3, "type": "private"}, "text": "/start"}}"#;
/// let update = botcall::webhook::parse_update(body).unwrap();
/// assert_eq!(update.update_id, 10);
/// ```
pub fn parse_update(body: &[u8]) -> Result<Update> {
    serde_json::from_slice(body).map_err(Error::InvalidUpdate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_edited_message() {
        let body = br#"{
            "update_id": 77,
            "edited_message": {
                "message_id": 3,
                "date": 1700000000,
                "chat": {"id": -1001, "type": "supergroup", "title": "ops"},
                "text": "fixed typo"
            }
        }"#;

        let update = parse_update(body).unwrap();
        let message = update.any_message().unwrap();
        assert_eq!(message.chat.title.as_deref(), Some("ops"));
        assert!(update.message.is_none());
    }

    #[test]
    fn test_malformed_payload_is_invalid_update() {
        assert!(matches!(parse_update(b"{"), Err(Error::InvalidUpdate(_))));
        assert!(matches!(
            parse_update(br#"{"message": {}}"#),
            Err(Error::InvalidUpdate(_))
        ));
    }
}
