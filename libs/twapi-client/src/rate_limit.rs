use chrono::{DateTime, Utc};
use http::HeaderMap;

const LIMIT_HEADER: &str = "x-rate-limit-limit";
const REMAINING_HEADER: &str = "x-rate-limit-remaining";
const RESET_HEADER: &str = "x-rate-limit-reset";

/// Rate-limit counters reported by the server for the endpoint just called.
///
/// Informational only. Each counter is absent when its header is missing or
/// unparseable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimit {
    /// Maximum number of calls allowed in the current window
    pub ceiling: Option<u64>,
    /// Calls left in the current window
    pub remaining: Option<u64>,
    /// When the current window resets
    pub reset: Option<DateTime<Utc>>,
}

impl RateLimit {
    /// Read the rate-limit headers, or `None` if none of them is usable
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let limits = Self {
            ceiling: header_u64(headers, LIMIT_HEADER),
            remaining: header_u64(headers, REMAINING_HEADER),
            reset: header_u64(headers, RESET_HEADER)
                .and_then(|secs| i64::try_from(secs).ok())
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        };
        (limits != Self::default()).then_some(limits)
    }
}

fn header_u64(headers: &HeaderMap, name: &str) -> Option<u64> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}
