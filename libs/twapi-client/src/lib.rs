//! Twitter API v2 client core
//!
//! Transport, authorization and streaming layer for the versioned HTTP+JSON
//! API. Resource-specific code builds a [`Request`], runs it through a
//! [`Client`], and decodes the payloads of the returned [`Reply`] into its
//! own types.
//!
//! - [`Client::call`] issues one request and decodes the envelope
//! - [`Client::call_raw`] returns the undecoded body
//! - [`Client::stream`] consumes a long-lived stream of JSON messages
//! - [`Client::call_blocking`] for sync contexts such as build scripts
//!
//! Success is exactly HTTP 200 or 201; everything else is an [`Error`] of
//! kind [`ErrorKind::Status`] carrying the status and raw body. Nothing is
//! retried.
//!
//! # Examples
//!
//! ## Single call
//!
//! ```no_run
//! use twapi_client::{Client, ClientConfig, Request};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::from_config(ClientConfig::from_env()?)?;
//!
//! let request = Request::builder()
//!     .path("users/by/username/jack")
//!     .param("user.fields", ["created_at", "description"])
//!     .build()?;
//!
//! let reply = client.call(&CancellationToken::new(), &request).await?;
//! let user: Option<serde_json::Value> = reply.decode_data()?;
//! if let Some(limits) = reply.rate_limit {
//!     println!("{:?} calls left", limits.remaining);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Streaming
//!
//! ```no_run
//! use twapi_client::{Client, ClientConfig, Request, StopStreaming};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::from_config(ClientConfig::from_env()?)?;
//! let request = Request::get("tweets/sample/stream");
//!
//! let mut seen = 0;
//! client
//!     .stream(&CancellationToken::new(), &request, |reply| {
//!         seen += 1;
//!         println!("{:?}", reply.data);
//!         if seen == 10 {
//!             return Err(StopStreaming.into());
//!         }
//!         Ok(())
//!     })
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom authorization
//!
//! ```no_run
//! use twapi_client::{authorizer, Client, ClientConfig};
//! use http::HeaderValue;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let sign = authorizer(|req| {
//!     let signature = format!("signed:{}", req.url());
//!     req.headers_mut()
//!         .insert("authorization", HeaderValue::try_from(signature)?);
//!     Ok(())
//! });
//! let client = Client::from_config(ClientConfig::default().with_authorizer(sign))?;
//! # Ok(())
//! # }
//! ```

mod auth;
mod body;
mod client;
mod config;
mod error;
mod log;
mod params;
mod rate_limit;
mod reply;
mod request;
mod response;
mod stream;

// Re-export public API
pub use auth::{Authorizer, authorizer, bearer_token};
pub use body::{Body, BodyStream, BoxStream};
pub use client::Client;
pub use config::{API_VERSION, BASE_URL_ENV, BEARER_TOKEN_ENV, ClientConfig, DEFAULT_BASE_URL};
pub use error::{BoxError, Error, ErrorKind, Result};
pub use log::{
    LogHook, TAG_HTTP_STATUS, TAG_REQUEST_URL, TAG_RESPONSE_BODY, TAG_STREAM_BODY,
};
pub use params::Params;
pub use rate_limit::RateLimit;
pub use reply::Reply;
pub use request::{Request, RequestBuilder};
pub use stream::{StopStreaming, is_stop_streaming};

// Re-export commonly used types from dependencies
pub use http::{Method, StatusCode};
pub use secrecy::SecretString;
pub use tokio_util::sync::CancellationToken;
