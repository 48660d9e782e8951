//! Turns a completed exchange into a typed result or a classified error.
//!
//! Only a `200 OK` carrying `ok: true` is a success. Everything else becomes
//! an [`Error::Api`] when the body is a readable envelope, or an
//! [`Error::DeserializationFailed`] when it is not. Nothing here retries.

use crate::envelope::{ApiError, Envelope};
use crate::{Error, RawResponse, Response, Result};
use http::StatusCode;
use serde::de::{DeserializeOwned, IgnoredAny};

/// Classifies a call that returns a payload of type `T`.
pub fn payload<T: DeserializeOwned>(raw: RawResponse) -> Result<Response<T>> {
    if raw.status != StatusCode::OK {
        return Err(failure(raw));
    }

    let envelope = match Envelope::<T>::decode(&raw.body) {
        Ok(envelope) => envelope,
        Err(e) => return Err(deserialization_failed(raw, e)),
    };

    if !envelope.ok {
        let error = envelope.to_api_error(i64::from(raw.status.as_u16()));
        return Err(api_error(raw, error));
    }

    match envelope.result {
        Some(data) => Ok(Response::from_raw(data, raw)),
        None => {
            let error = ApiError {
                code: i64::from(raw.status.as_u16()),
                description: "response envelope has no result".to_string(),
                parameters: None,
            };
            Err(api_error(raw, error))
        }
    }
}

/// Classifies a call whose result is only an acknowledgement.
///
/// The `result` field is not inspected.
pub fn ack(raw: RawResponse) -> Result<Response<()>> {
    if raw.status != StatusCode::OK {
        return Err(failure(raw));
    }

    match Envelope::<IgnoredAny>::decode(&raw.body) {
        Ok(envelope) if envelope.ok => Ok(Response::from_raw((), raw)),
        Ok(envelope) => {
            let error = envelope.to_api_error(i64::from(raw.status.as_u16()));
            Err(api_error(raw, error))
        }
        Err(e) => Err(deserialization_failed(raw, e)),
    }
}

// Non-200 responses: the result shape is irrelevant, only the error fields
// are read.
fn failure(raw: RawResponse) -> Error {
    match Envelope::<IgnoredAny>::decode(&raw.body) {
        Ok(envelope) => {
            let error = envelope.to_api_error(i64::from(raw.status.as_u16()));
            api_error(raw, error)
        }
        Err(e) => deserialization_failed(raw, e),
    }
}

fn api_error(raw: RawResponse, error: ApiError) -> Error {
    tracing::debug!(
        status = raw.status.as_u16(),
        code = error.code,
        description = %error.description,
        "API returned an error envelope"
    );
    Error::Api {
        status: raw.status,
        headers: raw.headers,
        error,
    }
}

fn deserialization_failed(raw: RawResponse, e: serde_json::Error) -> Error {
    tracing::debug!(
        status = raw.status.as_u16(),
        error = %e,
        "Failed to deserialize response envelope"
    );
    Error::DeserializationFailed {
        status: raw.status,
        headers: raw.headers,
        raw_response: String::from_utf8_lossy(&raw.body).into_owned(),
        serde_error: e.to_string(),
    }
}
