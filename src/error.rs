//! Error types for bot API calls.
//!
//! Three failure kinds reach callers: the remote API was never reached
//! ([`Error::Transport`]), a response arrived but could not be decoded
//! ([`Error::DeserializationFailed`]), or the API answered with an error
//! envelope ([`Error::Api`]). The remaining variants cover local mistakes made
//! while building a request.

use crate::envelope::ApiError;
use http::{HeaderMap, StatusCode};
use std::path::PathBuf;
use std::time::Duration;

/// The main error type for bot API calls.
///
/// # Examples
///
/// ```no_run
/// use botcall::{Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::new("123:abc")?;
///
/// match client.get_me().commit().await {
///     Ok(response) => println!("Running as {}", response.data.first_name),
///     Err(Error::Api { status, error, .. }) => {
///         eprintln!("API refused the call (HTTP {}): {}", status, error.description);
///     }
///     Err(e) if e.is_transport() => eprintln!("API unreachable: {}", e),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// No HTTP response was obtained before the backoff budget ran out.
    ///
    /// `source` is the error from the last attempt.
    #[error("Transport failure after {attempts} attempts in {elapsed:?}: {source}")]
    Transport {
        /// The number of attempts made
        attempts: usize,
        /// Time spent in the retry loop
        elapsed: Duration,
        /// The last transport error
        #[source]
        source: reqwest::Error,
    },

    /// The request could not be sent at all, for example because reqwest
    /// rejected its URL. No exchange happened and the call was not retried.
    #[error("Request could not be sent: {0}")]
    Request(#[source] reqwest::Error),

    /// A response was received but its body is not a valid envelope for the
    /// expected payload.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The HTTP status code
        status: StatusCode,
        /// The response headers
        headers: HeaderMap,
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
    },

    /// The API answered with `ok: false`, a non-200 status, or no result.
    #[error("{error} (HTTP {status})")]
    Api {
        /// The HTTP status code
        status: StatusCode,
        /// The response headers
        headers: HeaderMap,
        /// Error code and description from the envelope
        error: ApiError,
    },

    /// An inbound webhook payload is not a valid update.
    #[error("Invalid update payload: {0}")]
    InvalidUpdate(#[source] serde_json::Error),

    /// A file attachment could not be read.
    #[error("Failed to read attachment {}: {source}", path.display())]
    Attachment {
        /// Path of the attachment
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration was provided.
    ///
    /// This covers a missing access token and invalid header names or values.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Failed to serialize a request body fragment.
    #[error("Failed to serialize request: {0}")]
    SerializationFailed(String),

    /// An invalid URL was provided or formed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Returns the HTTP status of the response, if one was received.
    ///
    /// `None` means no response was ever obtained.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::DeserializationFailed { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the received status, or `500 Internal Server Error` when the
    /// API was never reached.
    ///
    /// The 500 sentinel matches older clients that report unreachable servers
    /// as internal errors. Prefer [`Error::status`] and [`Error::is_transport`]
    /// to tell the two apart.
    pub fn status_or_unreachable(&self) -> StatusCode {
        self.status().unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Returns the response headers, if a response was received.
    pub fn headers(&self) -> Option<&HeaderMap> {
        match self {
            Error::Api { headers, .. } => Some(headers),
            Error::DeserializationFailed { headers, .. } => Some(headers),
            _ => None,
        }
    }

    /// Returns `true` if the retry budget was spent without any response.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport { .. })
    }

    /// Returns the envelope error reported by the API, if any.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Error::Api { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Returns the raw response body for decode failures.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

/// A specialized `Result` type for bot API calls.
pub type Result<T> = std::result::Result<T, Error>;
