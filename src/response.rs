//! Raw and typed results of a committed call.
//!
//! The executor produces a [`RawResponse`] for every exchange that completed
//! at the transport level, whatever its status. The classifier turns it into
//! a [`Response`] carrying the decoded payload, or into an error.

use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// One completed HTTP exchange, before the envelope is interpreted.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// The HTTP status code, success or not.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// The response body.
    pub body: Vec<u8>,

    /// Time from the first attempt until this response was read.
    pub latency: Duration,

    /// The number of attempts, including the one that produced this response.
    pub attempts: usize,
}

/// A successful API call.
///
/// # Type Parameters
///
/// * `T` - The type of the envelope's `result`
///
/// # Examples
///
/// ```no_run
/// use botcall::Client;
///
/// # async fn example() -> Result<(), botcall::Error> {
/// let client = Client::new("123:abc")?;
/// let me = client.get_me().commit().await?;
///
/// println!("Bot: {}", me.data.first_name);
/// println!("Request took {:?} over {} attempt(s)", me.latency, me.attempts);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The envelope's decoded `result`.
    pub data: T,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// The total latency of the call, including all retry attempts.
    pub latency: Duration,

    /// The number of attempts made to complete this call.
    ///
    /// This will be `1` for calls that reached the API on the first try.
    pub attempts: usize,
}

impl<T> Response<T> {
    /// Wraps `data` with the metadata of the exchange that produced it.
    pub fn from_raw(data: T, raw: RawResponse) -> Self {
        Self {
            data,
            status: raw.status,
            headers: raw.headers,
            latency: raw.latency,
            attempts: raw.attempts,
        }
    }

    /// Maps the response data to a different type using the provided function.
    ///
    /// # Examples
    ///
    /// ```
    /// # use botcall::{RawResponse, Response};
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let raw = RawResponse {
    ///     status: StatusCode::OK,
    ///     headers: HeaderMap::new(),
    ///     body: Vec::new(),
    ///     latency: Duration::from_millis(100),
    ///     attempts: 1,
    /// };
    /// let response = Response::from_raw(42, raw);
    ///
    /// let string_response = response.map(|n| n.to_string());
    /// assert_eq!(string_response.data, "42");
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Returns `true` if transport failures forced at least one retry.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a reference to a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
