use std::collections::HashMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;

use crate::error::{Error, Result};
use crate::rate_limit::RateLimit;

/// Decoded envelope of one call or one stream message.
///
/// Payloads are kept as raw JSON so resource-specific code can decode them
/// into its own types.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Reply {
    /// Primary payload
    #[serde(default)]
    pub data: Option<Box<RawValue>>,
    /// Expanded objects grouped by category, e.g. `users` or `tweets`
    #[serde(default)]
    pub includes: HashMap<String, Box<RawValue>>,
    /// Response metadata such as result counts and pagination tokens
    #[serde(default)]
    pub meta: Option<Box<RawValue>>,
    /// Partial errors reported alongside a successful response
    #[serde(default)]
    pub errors: Option<Box<RawValue>>,
    /// Rate-limit counters; only set for non-streaming calls
    #[serde(skip)]
    pub rate_limit: Option<RateLimit>,
}

impl Reply {
    /// Decode the primary payload; `None` if the reply carried no data
    ///
    /// # Errors
    /// Returns a decode error with the raw payload if it does not match `T`.
    pub fn decode_data<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        decode_raw(self.data.as_deref(), "decoding reply data")
    }

    /// Decode the included objects of one category
    ///
    /// # Errors
    /// Returns a decode error with the raw payload if it does not match `T`.
    pub fn decode_includes<T: DeserializeOwned>(&self, category: &str) -> Result<Option<T>> {
        decode_raw(
            self.includes.get(category).map(|raw| &**raw),
            "decoding included objects",
        )
    }

    /// Decode the response metadata
    ///
    /// # Errors
    /// Returns a decode error with the raw payload if it does not match `T`.
    pub fn decode_meta<T: DeserializeOwned>(&self) -> Result<Option<T>> {
        decode_raw(self.meta.as_deref(), "decoding reply metadata")
    }

    /// Decode an envelope, which must be a JSON object.
    pub(crate) fn from_slice(data: &[u8], message: &str) -> Result<Self> {
        let first = data.iter().find(|b| !b.is_ascii_whitespace());
        if first != Some(&b'{') {
            return Err(Error::decode(message, data.to_vec(), "expected a JSON object"));
        }
        serde_json::from_slice(data).map_err(|e| Error::decode(message, data.to_vec(), e))
    }
}

fn decode_raw<T: DeserializeOwned>(raw: Option<&RawValue>, message: &str) -> Result<Option<T>> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    serde_json::from_str(raw.get())
        .map(Some)
        .map_err(|e| Error::decode(message, raw.get().as_bytes().to_vec(), e))
}
