//! Bot API client with transport-level retries.
//!
//! The [`Client`] type is the main entry point for making calls.
//! Use [`ClientBuilder`] to configure and create clients.

use crate::{
    backoff::BackoffPolicy, classify, request::RequestDescriptor, Error, RawResponse, Response,
    Result,
};
use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";
const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Environment variable read by [`Client::from_env`] for the access token.
pub const TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";
/// Environment variable read by [`Client::from_env`] for the API base URL.
pub const BASE_URL_ENV: &str = "TELEGRAM_API_URL";

/// A bot API client.
///
/// The client holds only immutable configuration and a connection pool, so
/// it can be cloned cheaply and shared across tasks without locking.
///
/// # Examples
///
/// ```no_run
/// use botcall::{BackoffPolicy, Client};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), botcall::Error> {
/// let client = Client::builder()
///     .token("123456:ABC-DEF")
///     .timeout(Duration::from_secs(30))
///     .backoff_policy(BackoffPolicy::new(5, 60))
///     .build()?;
///
/// let sent = client.send_message(42, "hello").field("parse_mode", "HTML").commit().await?;
/// println!("Sent message {}", sent.data.message_id);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    base_url: Url,
    token: String,
    default_headers: HeaderMap,
    backoff_policy: BackoffPolicy,
    timeout: Option<Duration>,
}

struct Attachment {
    field: String,
    file_name: String,
    bytes: Bytes,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client with default settings for the given access token.
    pub fn new(token: impl Into<String>) -> Result<Self> {
        ClientBuilder::new().token(token).build()
    }

    /// Creates a client from `TELEGRAM_BOT_TOKEN` and, if set,
    /// `TELEGRAM_API_URL`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the token variable is missing.
    pub fn from_env() -> Result<Self> {
        let token = std::env::var(TOKEN_ENV)
            .map_err(|_| Error::ConfigurationError(format!("{} is not set", TOKEN_ENV)))?;
        let mut builder = ClientBuilder::new().token(token);
        if let Ok(base_url) = std::env::var(BASE_URL_ENV) {
            builder = builder.base_url(base_url)?;
        }
        builder.build()
    }

    /// The backoff policy applied by [`Client::commit`] and friends.
    pub fn backoff_policy(&self) -> &BackoffPolicy {
        &self.inner.backoff_policy
    }

    /// Returns `{base}/bot{token}/{api_method}`.
    pub fn endpoint_url(&self, api_method: &str) -> Result<Url> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::ConfigurationError("Base URL cannot be a base".to_string()))?
            .pop_if_empty()
            .push(&format!("bot{}", self.inner.token))
            .push(api_method);
        Ok(url)
    }

    /// Returns the download URL `{base}/file/bot{token}/{file_path}` for a
    /// path obtained from `getFile`.
    pub fn file_url(&self, file_path: &str) -> Result<Url> {
        let mut url = self.inner.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|_| {
                Error::ConfigurationError("Base URL cannot be a base".to_string())
            })?;
            segments
                .pop_if_empty()
                .push("file")
                .push(&format!("bot{}", self.inner.token));
            segments.extend(file_path.split('/').filter(|s| !s.is_empty()));
        }
        Ok(url)
    }

    /// Starts a descriptor for `api_method`, sent with `http_method`.
    pub fn request(&self, http_method: Method, api_method: &str) -> Result<RequestDescriptor> {
        Ok(RequestDescriptor::new(http_method, self.endpoint_url(api_method)?))
    }

    /// Commits a call expecting a payload, using the client's backoff policy.
    pub async fn commit<T>(&self, request: RequestDescriptor) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.commit_with(request, &self.inner.backoff_policy).await
    }

    /// Commits a call expecting a payload, using `policy` for this call only.
    pub async fn commit_with<T>(
        &self,
        request: RequestDescriptor,
        policy: &BackoffPolicy,
    ) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        let raw = self.execute_with(&request, policy).await?;
        classify::payload(raw)
    }

    /// Commits a call that only acknowledges success.
    pub async fn commit_ack(&self, request: RequestDescriptor) -> Result<Response<()>> {
        self.commit_ack_with(request, &self.inner.backoff_policy).await
    }

    /// Commits an acknowledgement call, using `policy` for this call only.
    pub async fn commit_ack_with(
        &self,
        request: RequestDescriptor,
        policy: &BackoffPolicy,
    ) -> Result<Response<()>> {
        let raw = self.execute_with(&request, policy).await?;
        classify::ack(raw)
    }

    /// Executes a request with the client's backoff policy, without
    /// interpreting the response.
    pub async fn execute(&self, request: &RequestDescriptor) -> Result<RawResponse> {
        self.execute_with(request, &self.inner.backoff_policy).await
    }

    /// Executes a request, retrying only while no HTTP response is obtained.
    ///
    /// Any response ends the loop, whatever its status. Connection errors,
    /// timeouts and interrupted bodies are retried until `policy` runs out of
    /// elapsed time, then reported as [`Error::Transport`]. A request that
    /// reqwest refuses to send at all fails at once with [`Error::Request`].
    /// Unreadable attachments fail before the first attempt.
    pub async fn execute_with(
        &self,
        request: &RequestDescriptor,
        policy: &BackoffPolicy,
    ) -> Result<RawResponse> {
        let attachments = load_attachments(request).await?;
        let body = request.merged_body();
        let headers = self.merged_headers(request);

        let start_time = Instant::now();
        let mut backoff = policy.start();
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self
                .execute_request(request, &headers, body.as_ref(), &attachments, attempt)
                .await
            {
                Ok((status, headers, body)) => {
                    let latency = start_time.elapsed();
                    tracing::info!(
                        status = status.as_u16(),
                        latency_ms = latency.as_millis(),
                        attempts = attempt,
                        api_method = %request.api_method(),
                        "Received API response"
                    );
                    return Ok(RawResponse {
                        status,
                        headers,
                        body,
                        latency,
                        attempts: attempt,
                    });
                }
                Err(e) => {
                    // reqwest errors print the URL, which holds the token.
                    let e = e.without_url();

                    if !is_transport_failure(&e) {
                        tracing::warn!(
                            error = %e,
                            method = %request.method,
                            api_method = %request.api_method(),
                            "Request could not be sent"
                        );
                        return Err(Error::Request(e));
                    }

                    tracing::warn!(
                        error = %e,
                        attempt = attempt,
                        method = %request.method,
                        api_method = %request.api_method(),
                        "Transport failure"
                    );

                    match backoff.next_delay() {
                        Some(delay) => {
                            tracing::info!(
                                delay_ms = delay.as_millis(),
                                attempt = attempt,
                                "Retrying request after delay"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        None => {
                            return Err(Error::Transport {
                                attempts: attempt,
                                elapsed: start_time.elapsed(),
                                source: e,
                            });
                        }
                    }
                }
            }
        }
    }

    // Per-call headers replace client defaults of the same name.
    fn merged_headers(&self, request: &RequestDescriptor) -> HeaderMap {
        let mut headers = self.inner.default_headers.clone();
        for name in request.headers.keys() {
            headers.remove(name);
        }
        for (name, value) in &request.headers {
            headers.append(name.clone(), value.clone());
        }
        headers
    }

    /// Executes a single attempt.
    async fn execute_request(
        &self,
        request: &RequestDescriptor,
        headers: &HeaderMap,
        body: Option<&Map<String, Value>>,
        attachments: &[Attachment],
        attempt: usize,
    ) -> std::result::Result<(StatusCode, HeaderMap, Vec<u8>), reqwest::Error> {
        tracing::debug!(
            method = %request.method,
            api_method = %request.api_method(),
            multipart = !attachments.is_empty(),
            attempt = attempt,
            "Executing API request"
        );

        let mut builder = self
            .inner
            .http_client
            .request(request.method.clone(), request.url.clone());

        if !request.query_params.is_empty() {
            builder = builder.query(&request.query_params);
        }

        if !headers.is_empty() {
            builder = builder.headers(headers.clone());
        }

        if let Some(timeout) = self.inner.timeout {
            builder = builder.timeout(timeout);
        }

        if attachments.is_empty() {
            if let Some(body) = body {
                builder = builder.json(body);
            }
        } else {
            builder = builder.multipart(multipart_form(body, attachments));
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await?;

        Ok((status, headers, bytes.to_vec()))
    }
}

// Builder errors (unsupported scheme, malformed request) and redirect
// loops are deterministic: no exchange happened and none ever will.
fn is_transport_failure(e: &reqwest::Error) -> bool {
    if e.is_builder() || e.is_redirect() {
        return false;
    }
    e.is_connect() || e.is_timeout() || e.is_request() || e.is_body() || e.is_decode()
}

async fn load_attachments(request: &RequestDescriptor) -> Result<Vec<Attachment>> {
    let mut loaded = Vec::with_capacity(request.attachments().len());
    for (field, path) in request.attachments() {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| Error::Attachment {
                path: path.clone(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| field.clone());
        loaded.push(Attachment {
            field: field.clone(),
            file_name,
            bytes: Bytes::from(bytes),
        });
    }
    Ok(loaded)
}

// Body fields travel as text parts: strings verbatim, anything else as JSON.
fn multipart_form(body: Option<&Map<String, Value>>, attachments: &[Attachment]) -> Form {
    let mut form = Form::new();
    if let Some(body) = body {
        for (key, value) in body {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            form = form.text(key.clone(), text);
        }
    }
    for attachment in attachments {
        // Cloning Bytes shares the buffer, so retries do not copy the file.
        let body = reqwest::Body::from(attachment.bytes.clone());
        let part = Part::stream_with_length(body, attachment.bytes.len() as u64)
            .file_name(attachment.file_name.clone());
        form = form.part(attachment.field.clone(), part);
    }
    form
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use botcall::{BackoffPolicy, ClientBuilder};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), botcall::Error> {
/// let client = ClientBuilder::new()
///     .token("123456:ABC-DEF")
///     .base_url("http://localhost:8081")?
///     .timeout(Duration::from_secs(30))
///     .backoff_policy(BackoffPolicy::new(10, -1))
///     .default_header("X-Request-Source", "scheduler")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    token: Option<String>,
    base_url: Option<Url>,
    default_headers: HeaderMap,
    backoff_policy: BackoffPolicy,
    timeout: Option<Duration>,
    user_agent: String,
    pooling: bool,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            token: None,
            base_url: None,
            default_headers: HeaderMap::new(),
            backoff_policy: BackoffPolicy::default(),
            timeout: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            pooling: true,
        }
    }

    /// Sets the bot access token. Required.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Sets the API base URL. Defaults to `https://api.telegram.org`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the backoff policy used for transport failures.
    pub fn backoff_policy(mut self, policy: BackoffPolicy) -> Self {
        self.backoff_policy = policy;
        self
    }

    /// Sets the timeout of a single attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Overrides the `User-Agent` header. Defaults to `botcall/<version>`.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Opens a fresh connection for every attempt.
    ///
    /// Useful in tests where a pooled connection would hide a server restart.
    pub fn disable_connection_pooling(mut self) -> Self {
        self.pooling = false;
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if no token was provided or if the HTTP client
    /// configuration is invalid.
    pub fn build(self) -> Result<Client> {
        let token = self
            .token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| Error::ConfigurationError("Access token is required".to_string()))?;

        let base_url = match self.base_url {
            Some(url) => url,
            None => Url::parse(DEFAULT_BASE_URL)?,
        };
        if base_url.cannot_be_a_base() {
            return Err(Error::ConfigurationError(format!(
                "Base URL cannot be a base: {}",
                base_url
            )));
        }
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(Error::ConfigurationError(format!(
                "Base URL must use http or https, got {}",
                base_url.scheme()
            )));
        }

        let mut http_client = reqwest::Client::builder().user_agent(self.user_agent);
        if !self.pooling {
            http_client = http_client.pool_max_idle_per_host(0);
        }
        let http_client = http_client.build().map_err(|e| {
            Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Client {
            inner: Arc::new(ClientInner {
                http_client,
                base_url,
                token,
                default_headers: self.default_headers,
                backoff_policy: self.backoff_policy,
                timeout: self.timeout,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> Client {
        Client::builder()
            .token("123:abc")
            .base_url(base_url)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_endpoint_url_embeds_token() {
        let url = client("https://api.telegram.org").endpoint_url("getMe").unwrap();
        assert_eq!(url.as_str(), "https://api.telegram.org/bot123:abc/getMe");
    }

    #[test]
    fn test_endpoint_url_keeps_base_path() {
        let url = client("http://localhost:8081/proxy/").endpoint_url("sendMessage").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8081/proxy/bot123:abc/sendMessage");
    }

    #[test]
    fn test_file_url() {
        let url = client("https://api.telegram.org")
            .file_url("photos/file_7.jpg")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.telegram.org/file/bot123:abc/photos/file_7.jpg"
        );
    }

    #[test]
    fn test_build_requires_token() {
        let result = Client::builder().build();
        assert!(matches!(result, Err(Error::ConfigurationError(_))));

        let result = Client::builder().token("").build();
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(matches!(
            Client::builder().base_url("not a url"),
            Err(Error::InvalidUrl(_))
        ));
        let result = Client::builder()
            .token("t")
            .base_url("mailto:bot@example.com")
            .unwrap()
            .build();
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_non_http_base_url_rejected() {
        let result = Client::builder()
            .token("t")
            .base_url("ftp://127.0.0.1:1")
            .unwrap()
            .build();
        match result {
            Err(Error::ConfigurationError(message)) => assert!(message.contains("ftp")),
            _ => panic!("Expected ConfigurationError for an ftp base URL"),
        }
    }

    #[test]
    fn test_per_call_headers_replace_defaults() {
        let client = Client::builder()
            .token("123:abc")
            .default_header("X-Request-Source", "client")
            .unwrap()
            .default_header("X-Trace", "on")
            .unwrap()
            .build()
            .unwrap();
        let request = client
            .request(Method::POST, "sendMessage")
            .unwrap()
            .with_header("X-Request-Source", "call")
            .unwrap();

        let headers = client.merged_headers(&request);
        let sources: Vec<&str> = headers
            .get_all("x-request-source")
            .iter()
            .map(|value| value.to_str().unwrap())
            .collect();
        assert_eq!(sources, vec!["call"]);
        assert_eq!(headers.get("x-trace").unwrap(), "on");
    }

    #[test]
    fn test_attachment_bytes_shared_across_forms() {
        let attachment = Attachment {
            field: "photo".to_string(),
            file_name: "cat.jpg".to_string(),
            bytes: Bytes::from(vec![7u8; 4096]),
        };
        let retry_copy = attachment.bytes.clone();
        assert_eq!(retry_copy.as_ptr(), attachment.bytes.as_ptr());

        let attachments = vec![attachment];
        for _ in 0..2 {
            let form = multipart_form(None, &attachments);
            assert!(!form.boundary().is_empty());
        }
        assert_eq!(attachments[0].bytes.as_ptr(), retry_copy.as_ptr());
    }

    #[test]
    fn test_default_policy_is_used() {
        let client = Client::new("123:abc").unwrap();
        assert_eq!(client.backoff_policy(), &BackoffPolicy::default());
    }

    #[test]
    fn test_client_is_shareable() {
        fn assert_send_sync<T: Send + Sync + Clone>() {}
        assert_send_sync::<Client>();
    }

    #[test]
    fn test_multipart_form_accepts_non_string_fields() {
        let mut body = Map::new();
        body.insert("chat_id".to_string(), Value::from(42));
        body.insert("caption".to_string(), Value::from("cat"));
        let attachments = vec![Attachment {
            field: "photo".to_string(),
            file_name: "cat.jpg".to_string(),
            bytes: Bytes::from_static(&[1, 2, 3]),
        }];

        let form = multipart_form(Some(&body), &attachments);
        assert!(!form.boundary().is_empty());
    }
}
