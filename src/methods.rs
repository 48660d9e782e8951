//! Endpoint builders.
//!
//! Every endpoint returns a [`Call`], a descriptor paired with the client
//! that will commit it and the payload type it expects. Optional parameters
//! are set with [`Call::field`] using the API's own names.

use crate::models::{Chat, ChatId, File, Message, Update, User, WebhookInfo};
use crate::{BackoffPolicy, Client, RequestDescriptor, Response, Result};
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::path::PathBuf;

/// A pending call returning `T`.
///
/// Building a call never fails eagerly: a problem found while building (an
/// invalid header, a body that is not an object) is kept and reported by
/// `commit`.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> Result<(), botcall::Error> {
/// let client = botcall::Client::new("123:abc")?;
/// let message = client
///     .send_message("@announcements", "*deploy finished*")
///     .field("parse_mode", "MarkdownV2")
///     .field("disable_notification", true)
///     .commit()
///     .await?;
/// println!("{}", message.data.message_id);
/// # Ok(())
/// # }
/// ```
#[must_use = "a call does nothing until it is committed"]
pub struct Call<'c, T> {
    client: &'c Client,
    request: Result<RequestDescriptor>,
    _payload: PhantomData<fn() -> T>,
}

impl<'c, T> Call<'c, T> {
    /// Wraps a descriptor built by hand.
    pub fn new(client: &'c Client, request: RequestDescriptor) -> Self {
        Self::from_result(client, Ok(request))
    }

    fn from_result(client: &'c Client, request: Result<RequestDescriptor>) -> Self {
        Self {
            client,
            request,
            _payload: PhantomData,
        }
    }

    fn post(client: &'c Client, api_method: &str) -> Self {
        Self::from_result(client, client.request(Method::POST, api_method))
    }

    fn map_request<F>(mut self, f: F) -> Self
    where
        F: FnOnce(RequestDescriptor) -> Result<RequestDescriptor>,
    {
        self.request = self.request.and_then(f);
        self
    }

    /// Sets a body field. A later value for the same key wins.
    pub fn field(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let key = key.into();
        let value = value.into();
        self.map_request(|request| Ok(request.with_field(key, value)))
    }

    /// Sets every field of `body`.
    pub fn fields<B: Serialize + ?Sized>(self, body: &B) -> Self {
        self.map_request(|request| request.with_json(body))
    }

    /// Appends a query parameter.
    pub fn query(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        self.map_request(|request| Ok(request.with_query_param(key, value)))
    }

    /// Adds a header for this call only.
    pub fn header(self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.map_request(|request| request.with_header(name, value))
    }

    /// Uploads a local file under the multipart field `field`.
    pub fn attach(self, field: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let field = field.into();
        let path = path.into();
        self.map_request(|request| Ok(request.with_file(field, path)))
    }

    /// Returns the descriptor built so far.
    pub fn into_request(self) -> Result<RequestDescriptor> {
        self.request
    }

    /// Commits the call, reporting only whether the API acknowledged it.
    pub async fn commit_ack(self) -> Result<Response<()>> {
        self.client.commit_ack(self.request?).await
    }
}

impl<T: DeserializeOwned> Call<'_, T> {
    /// Commits the call with the client's backoff policy.
    pub async fn commit(self) -> Result<Response<T>> {
        self.client.commit(self.request?).await
    }

    /// Commits the call with `policy` instead of the client's.
    pub async fn commit_with(self, policy: &BackoffPolicy) -> Result<Response<T>> {
        self.client.commit_with(self.request?, policy).await
    }
}

/// A photo to send: an upload from disk, or an id/URL the API already knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputFile {
    /// A local file, read and sent as a multipart part.
    Upload(PathBuf),
    /// A `file_id` from an earlier upload, or an HTTP URL the API fetches.
    Remote(String),
}

impl InputFile {
    /// Uploads the file at `path`.
    pub fn upload(path: impl Into<PathBuf>) -> Self {
        InputFile::Upload(path.into())
    }

    /// Refers to a file the API can already reach.
    pub fn remote(file_id_or_url: impl Into<String>) -> Self {
        InputFile::Remote(file_id_or_url.into())
    }
}

impl Client {
    /// `getMe`: the bot's own user.
    pub fn get_me(&self) -> Call<'_, User> {
        Call::from_result(self, self.request(Method::GET, "getMe"))
    }

    /// `getChat`
    pub fn get_chat(&self, chat_id: impl Into<ChatId>) -> Call<'_, Chat> {
        let chat_id: ChatId = chat_id.into();
        Call::post(self, "getChat").field("chat_id", chat_id)
    }

    /// `sendMessage`
    pub fn send_message(
        &self,
        chat_id: impl Into<ChatId>,
        text: impl Into<String>,
    ) -> Call<'_, Message> {
        let chat_id: ChatId = chat_id.into();
        let text: String = text.into();
        Call::post(self, "sendMessage")
            .field("chat_id", chat_id)
            .field("text", text)
    }

    /// `sendPhoto`. Uploads go out as `multipart/form-data`.
    pub fn send_photo(&self, chat_id: impl Into<ChatId>, photo: InputFile) -> Call<'_, Message> {
        let chat_id: ChatId = chat_id.into();
        let call = Call::post(self, "sendPhoto").field("chat_id", chat_id);
        match photo {
            InputFile::Upload(path) => call.attach("photo", path),
            InputFile::Remote(id) => call.field("photo", id),
        }
    }

    /// `getFile`. Download the result with [`Client::file_url`].
    pub fn get_file(&self, file_id: impl Into<String>) -> Call<'_, File> {
        let file_id: String = file_id.into();
        Call::post(self, "getFile").field("file_id", file_id)
    }

    /// `getUpdates`, for long polling. Set `timeout` with [`Call::query`].
    pub fn get_updates(&self, offset: Option<i64>) -> Call<'_, Vec<Update>> {
        let call = Call::from_result(self, self.request(Method::GET, "getUpdates"));
        match offset {
            Some(offset) => call.query("offset", offset.to_string()),
            None => call,
        }
    }

    /// `setWebhook`
    pub fn set_webhook(&self, url: impl Into<String>) -> Call<'_, bool> {
        let url: String = url.into();
        Call::post(self, "setWebhook").field("url", url)
    }

    /// `deleteWebhook`
    pub fn delete_webhook(&self) -> Call<'_, bool> {
        Call::post(self, "deleteWebhook")
    }

    /// `getWebhookInfo`
    pub fn get_webhook_info(&self) -> Call<'_, WebhookInfo> {
        Call::from_result(self, self.request(Method::GET, "getWebhookInfo"))
    }
}
