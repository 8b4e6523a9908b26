//! Response classification.
//!
//! Success is exactly 200 or 201. Anything else is drained and surfaced as
//! a status error with the raw body attached; nothing is retried.

use bytes::{Bytes, BytesMut};
use futures::{StreamExt, TryStreamExt};
use http::{HeaderMap, StatusCode};

use crate::body::BodyStream;
use crate::error::{Error, Result};
use crate::log::{Diagnostics, TAG_HTTP_STATUS, TAG_RESPONSE_BODY};

/// Live HTTP response whose body has not been consumed yet
pub(crate) struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: BodyStream,
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body", &"BodyStream(..)")
            .finish()
    }
}

pub(crate) fn is_success(status: StatusCode) -> bool {
    matches!(status, StatusCode::OK | StatusCode::CREATED)
}

impl Response {
    pub(crate) fn new(status: StatusCode, headers: HeaderMap, body: BodyStream) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub(crate) fn from_reqwest(rsp: reqwest::Response) -> Self {
        let status = rsp.status();
        let headers = rsp.headers().clone();
        let body = rsp
            .bytes_stream()
            .map_err(|e| Error::transport("reading response body", e));
        Self::new(status, headers, Box::pin(body))
    }

    pub(crate) fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Read the body to the end and release the connection
    async fn drain(&mut self) -> Result<Bytes> {
        match self.drain_partial().await {
            (body, None) => Ok(body),
            (_, Some(e)) => Err(e),
        }
    }

    /// Read as much of the body as arrives, stopping at the first read error
    async fn drain_partial(&mut self) -> (Bytes, Option<Error>) {
        let mut buf = BytesMut::new();
        while let Some(chunk) = self.body.next().await {
            match chunk {
                Ok(chunk) => buf.extend_from_slice(&chunk),
                Err(e) => return (buf.freeze(), Some(e)),
            }
        }
        (buf.freeze(), None)
    }

    /// Drain the body and classify the status.
    ///
    /// Returns the body on success, or a status error carrying it.
    pub(crate) async fn receive(&mut self, diag: &Diagnostics) -> Result<Bytes> {
        diag.emit(TAG_HTTP_STATUS, &status_line(self.status));
        if !is_success(self.status) {
            return Err(self.failure(diag).await);
        }

        let body = self.drain().await?;
        diag.emit_bytes(TAG_RESPONSE_BODY, &body);
        tracing::debug!(status = %self.status, bytes = body.len(), "response received");
        Ok(body)
    }

    /// Classify the status without consuming a successful body.
    ///
    /// A failed status drains the body into the returned error; a successful
    /// one hands back the still-open body stream.
    pub(crate) async fn open(mut self, diag: &Diagnostics) -> Result<BodyStream> {
        diag.emit(TAG_HTTP_STATUS, &status_line(self.status));
        if is_success(self.status) {
            Ok(self.body)
        } else {
            Err(self.failure(diag).await)
        }
    }

    /// Status error for a failed response. A body read failure keeps the
    /// bytes read so far and becomes the error's source.
    async fn failure(&mut self, diag: &Diagnostics) -> Error {
        let (body, read_err) = self.drain_partial().await;
        diag.emit_bytes(TAG_RESPONSE_BODY, &body);
        tracing::debug!(status = %self.status, bytes = body.len(), "request failed");

        let err = Error::status(self.status, body);
        match read_err {
            Some(cause) => err.with_source(cause),
            None => err,
        }
    }
}

fn status_line(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {reason}", status.as_u16()),
        None => status.as_u16().to_string(),
    }
}
