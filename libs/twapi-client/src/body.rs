use bytes::Bytes;
use futures::stream::Stream;
use serde::Serialize;
use std::pin::Pin;

use crate::error::{Error, Result};

pub type BoxStream<T> = Pin<Box<dyn Stream<Item = T> + Send + 'static>>;

/// Byte stream of a response body
pub type BodyStream = BoxStream<Result<Bytes>>;

/// Request body payload
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Body {
    /// No payload
    #[default]
    Empty,
    /// Buffered bytes
    Bytes(Bytes),
}

impl std::fmt::Debug for Body {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Body::Empty => write!(f, "Body::Empty"),
            Body::Bytes(bytes) => f.debug_tuple("Body::Bytes").field(&bytes.len()).finish(),
        }
    }
}

impl Body {
    /// Create a body from a JSON-serializable value
    ///
    /// # Errors
    /// Returns a build error if the value cannot be serialized.
    pub fn from_json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let json = serde_json::to_vec(value)
            .map_err(|e| Error::build("encoding request body").with_source(e))?;
        Ok(Body::Bytes(Bytes::from(json)))
    }

    /// Check if body is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Body::Empty => true,
            Body::Bytes(bytes) => bytes.is_empty(),
        }
    }

    /// Payload length in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Body::Empty => 0,
            Body::Bytes(bytes) => bytes.len(),
        }
    }

    pub(crate) fn into_bytes(self) -> Option<Bytes> {
        match self {
            Body::Empty => None,
            Body::Bytes(bytes) if bytes.is_empty() => None,
            Body::Bytes(bytes) => Some(bytes),
        }
    }
}

impl From<()> for Body {
    fn from((): ()) -> Self {
        Body::Empty
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Bytes(Bytes::from(s))
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Body::Bytes(Bytes::from_static(s.as_bytes()))
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(v))
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        Body::Bytes(b)
    }
}
