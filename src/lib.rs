//! # botcall - a resilient bot API client
//!
//! botcall executes calls against a messaging platform's HTTP+JSON bot API.
//! A call is described by a [`RequestDescriptor`], committed through a
//! [`Client`], retried under a [`BackoffPolicy`] while the API cannot be
//! reached, and finally classified into a typed [`Response`] or an [`Error`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use botcall::{BackoffPolicy, Client};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), botcall::Error> {
//!     let client = Client::builder()
//!         .token("123456:ABC-DEF")
//!         .timeout(Duration::from_secs(30))
//!         // At most 10s between attempts, give up after one minute.
//!         .backoff_policy(BackoffPolicy::new(10, 60))
//!         .build()?;
//!
//!     let me = client.get_me().commit().await?;
//!     println!("Logged in as {}", me.data.first_name);
//!
//!     let sent = client.send_message(42, "hello").commit().await?;
//!     println!("Sent message {} after {} attempt(s)", sent.data.message_id, sent.attempts);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## What is retried
//!
//! Only transport failures: refused connections, timeouts, bodies cut off
//! mid-read. Any HTTP response ends the retry loop, including `400` and
//! `500`. A flood-control `429` is reported as [`Error::Api`] with
//! [`ApiError::retry_after`] set, and the caller decides whether to wait.
//!
//! ## Error Handling
//!
//! ```no_run
//! use botcall::{Client, Error};
//!
//! # async fn example() -> Result<(), Error> {
//! # let client = Client::new("123:abc")?;
//! match client.get_file("AgACAgQ").commit().await {
//!     Ok(file) => println!("Download from {}", client.file_url(file.data.file_path.as_deref().unwrap_or(""))?),
//!     Err(Error::Api { status, error, .. }) => {
//!         eprintln!("HTTP {}: {} ({})", status, error.description, error.code);
//!     }
//!     Err(Error::DeserializationFailed { status, raw_response, .. }) => {
//!         eprintln!("Unexpected body (status {}): {}", status, raw_response);
//!     }
//!     Err(Error::Transport { attempts, .. }) => {
//!         eprintln!("API unreachable after {} attempts", attempts);
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! # Ok(())
//! # }
//! ```

pub mod backoff;
pub mod classify;
mod client;
pub mod envelope;
mod error;
mod methods;
pub mod models;
mod request;
mod response;
pub mod webhook;

pub use backoff::BackoffPolicy;
pub use client::{Client, ClientBuilder, BASE_URL_ENV, TOKEN_ENV};
pub use envelope::{ApiError, Envelope};
pub use error::{Error, Result};
pub use methods::{Call, InputFile};
pub use request::RequestDescriptor;
pub use response::{RawResponse, Response};
