use bytes::Bytes;
use http::StatusCode;
use thiserror::Error;

/// Boxed error type used for causes reported by callbacks and authorizers.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias for client operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// The phase in which a client operation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request could not be built (bad endpoint, missing path or config)
    Build,
    /// The configured authorizer refused to attach credentials
    Authorization,
    /// The HTTP exchange could not be completed
    Transport,
    /// The caller cancelled a call before it completed
    Cancelled,
    /// The server answered with a status other than 200 or 201
    Status,
    /// A response envelope or stream message was not valid JSON
    Decode,
    /// The stream callback reported a failure
    Callback,
}

/// Error reported by every client operation.
///
/// A status error carries the HTTP status and the drained response body.
/// Every other kind has no status; decode errors keep the offending bytes
/// in [`Error::body`] for diagnostics.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    status: Option<StatusCode>,
    body: Option<Bytes>,
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            body: None,
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn build(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Build, message)
    }

    pub(crate) fn authorization(cause: BoxError) -> Self {
        Self::new(ErrorKind::Authorization, "attaching authorization").with_source(cause)
    }

    pub(crate) fn transport(message: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self::new(ErrorKind::Transport, message).with_source(cause)
    }

    pub(crate) fn cancelled() -> Self {
        Self::new(ErrorKind::Cancelled, "request cancelled")
    }

    pub(crate) fn status(status: StatusCode, body: Bytes) -> Self {
        Self {
            kind: ErrorKind::Status,
            status: Some(status),
            body: Some(body),
            message: format!("request failed: {status}"),
            source: None,
        }
    }

    pub(crate) fn decode(
        message: impl Into<String>,
        data: impl Into<Bytes>,
        cause: impl Into<BoxError>,
    ) -> Self {
        Self::new(ErrorKind::Decode, message)
            .with_body(data.into())
            .with_source(cause)
    }

    pub(crate) fn callback(cause: BoxError) -> Self {
        Self::new(ErrorKind::Callback, "callback").with_source(cause)
    }

    pub(crate) fn with_source(mut self, cause: impl Into<BoxError>) -> Self {
        self.source = Some(cause.into());
        self
    }

    fn with_body(mut self, body: Bytes) -> Self {
        self.body = Some(body);
        self
    }

    /// The phase that failed
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// HTTP status for [`ErrorKind::Status`] errors, `None` otherwise
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        self.status
    }

    /// Raw response body (status errors) or offending bytes (decode errors)
    #[must_use]
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Human-readable description of the failed phase
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Decode the body of a status error as JSON, e.g. the API's problem
    /// description.
    ///
    /// # Errors
    /// Returns the JSON error if there is no body or it does not match `T`.
    pub fn decode_body<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(self.body.as_deref().unwrap_or_default())
    }
}
