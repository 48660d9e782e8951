//! The not-yet-executed description of one outgoing API call.

use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use url::Url;

/// Everything needed to perform one API call.
///
/// Descriptors are built incrementally: every builder method consumes the
/// descriptor and returns it with one more header, query pair, body fragment
/// or attachment. Body fragments are merged in insertion order when the call
/// is executed, so a later value for the same key replaces an earlier one.
///
/// # Examples
///
/// ```
/// use botcall::RequestDescriptor;
/// use http::Method;
/// use url::Url;
///
/// let url = Url::parse("https://api.telegram.org/bot123:abc/sendMessage").unwrap();
/// let request = RequestDescriptor::new(Method::POST, url)
///     .with_field("chat_id", 42)
///     .with_field("text", "draft")
///     .with_field("text", "final");
///
/// let body = request.merged_body().unwrap();
/// assert_eq!(body["text"], "final");
/// assert_eq!(request.api_method(), "sendMessage");
/// ```
#[derive(Clone)]
pub struct RequestDescriptor {
    /// The HTTP method (GET, POST, etc.).
    pub method: Method,

    /// The absolute request URL. It embeds the access token.
    pub url: Url,

    /// Headers for this request, on top of the client defaults.
    pub headers: HeaderMap,

    /// Query parameters, in the order they were added.
    pub query_params: Vec<(String, String)>,

    fragments: Vec<Map<String, Value>>,
    attachments: Vec<(String, PathBuf)>,
}

impl RequestDescriptor {
    /// Creates an empty descriptor for the given method and URL.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            query_params: Vec::new(),
            fragments: Vec::new(),
            attachments: Vec::new(),
        }
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Appends a query parameter. Repeated keys are kept in order.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    /// Appends a single-field body fragment.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut fragment = Map::new();
        fragment.insert(key.into(), value.into());
        self.fragments.push(fragment);
        self
    }

    /// Appends every field of `body` as one fragment.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be serialized or does not serialize
    /// to a JSON object.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        match serde_json::to_value(body).map_err(|e| Error::SerializationFailed(e.to_string()))? {
            Value::Object(fragment) => {
                self.fragments.push(fragment);
                Ok(self)
            }
            other => Err(Error::SerializationFailed(format!(
                "request body must be a JSON object, got {}",
                other
            ))),
        }
    }

    /// Attaches a local file, uploaded under the multipart field `field`.
    pub fn with_file(mut self, field: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.attachments.push((field.into(), path.into()));
        self
    }

    /// Merges all body fragments, later keys overwriting earlier ones.
    ///
    /// Returns `None` when no fragment was added.
    pub fn merged_body(&self) -> Option<Map<String, Value>> {
        if self.fragments.is_empty() {
            return None;
        }
        let mut merged = Map::new();
        for fragment in &self.fragments {
            for (key, value) in fragment {
                merged.insert(key.clone(), value.clone());
            }
        }
        Some(merged)
    }

    /// File attachments as `(field, path)` pairs.
    pub fn attachments(&self) -> &[(String, PathBuf)] {
        &self.attachments
    }

    /// Returns `true` if the call must be sent as `multipart/form-data`.
    pub fn is_multipart(&self) -> bool {
        !self.attachments.is_empty()
    }

    /// The API method name: the last URL path segment.
    pub fn api_method(&self) -> &str {
        self.url
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or("")
    }
}

// The URL carries the access token, so it is left out.
impl fmt::Debug for RequestDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestDescriptor")
            .field("method", &self.method)
            .field("api_method", &self.api_method())
            .field("query_params", &self.query_params)
            .field("fragments", &self.fragments.len())
            .field("attachments", &self.attachments)
            .finish()
    }
}
