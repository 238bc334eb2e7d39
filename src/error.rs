//! Error taxonomy for Companies House API failures.
//!
//! Every failure surfaced by the client is an [`ApiError`]. The variants are
//! split by what a caller can do about them: rate limits and server errors
//! are transient and retried by [`crate::retry`], everything else is final.

use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Remaining requests in the current rate-limit window.
pub const RATE_LIMIT_REMAIN_HEADER: &str = "x-ratelimit-remain";
/// Size of the rate-limit window.
pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";
/// Unix timestamp (seconds) at which the window resets.
pub const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";

pub const DEFAULT_AUTHENTICATION_MESSAGE: &str = "Authentication failed";
pub const DEFAULT_RATE_LIMIT_MESSAGE: &str = "Rate limit exceeded";
pub const DEFAULT_NOT_FOUND_MESSAGE: &str = "Resource not found";
pub const DEFAULT_VALIDATION_MESSAGE: &str = "Validation failed";
pub const DEFAULT_SERVER_MESSAGE: &str = "Server error";
pub const DEFAULT_NETWORK_MESSAGE: &str = "Network connection failed";

/// Coarse classification of an [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authentication,
    RateLimit,
    NotFound,
    Validation,
    Server,
    Network,
    Api,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Authentication => "authentication",
            ErrorKind::RateLimit => "rate-limit",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Validation => "validation",
            ErrorKind::Server => "server",
            ErrorKind::Network => "network",
            ErrorKind::Api => "api",
        };
        f.write_str(name)
    }
}

/// HTTP 429 with whatever rate-limit metadata the response carried.
///
/// `retry_after` is only ever set when a concrete wait is known: either the
/// server said so explicitly, or the window reset lies in the future.
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitError {
    message: String,
    pub retry_after: Option<Duration>,
    pub remaining: Option<u32>,
    pub limit: Option<u32>,
    pub reset: Option<DateTime<Utc>>,
}

impl Default for RateLimitError {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_LIMIT_MESSAGE)
    }
}

impl RateLimitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retry_after: None,
            remaining: None,
            limit: None,
            reset: None,
        }
    }

    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    pub fn with_window(mut self, remaining: Option<u32>, limit: Option<u32>) -> Self {
        self.remaining = remaining;
        self.limit = limit;
        self
    }

    /// Records the window reset time. Does not touch `retry_after`.
    pub fn with_reset(mut self, reset: DateTime<Utc>) -> Self {
        self.reset = Some(reset);
        self
    }

    /// Builds the error from the `X-Ratelimit-*` headers of a 429 response.
    ///
    /// Missing or malformed headers leave the matching field empty.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self::from_headers_at(headers, Utc::now())
    }

    pub fn from_response(response: &reqwest::Response) -> Self {
        Self::from_headers(response.headers())
    }

    pub(crate) fn from_headers_at(headers: &HeaderMap, now: DateTime<Utc>) -> Self {
        let remaining = header_number::<u32>(headers, RATE_LIMIT_REMAIN_HEADER);
        let limit = header_number::<u32>(headers, RATE_LIMIT_LIMIT_HEADER);
        let reset = header_number::<i64>(headers, RATE_LIMIT_RESET_HEADER)
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single());

        let mut error = Self::default().with_window(remaining, limit);
        if let Some(reset) = reset {
            error = error.with_reset(reset);
            // A reset in the past says nothing about how long to wait.
            match (reset - now).to_std() {
                Ok(wait) if !wait.is_zero() => error = error.with_retry_after(wait),
                _ => {}
            }
        }
        error
    }

    /// Parses an explicit `Retry-After: <seconds>` header.
    pub fn retry_after_header(headers: &HeaderMap) -> Option<Duration> {
        let value = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
        let secs = value.parse::<f64>().ok()?;
        // Rejects negative, non-finite and out-of-range values.
        Duration::try_from_secs_f64(secs).ok()
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RateLimitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(wait) = self.retry_after {
            write!(f, ", retry after {}s", wait.as_secs_f64().ceil() as u64)?;
        } else if let Some(reset) = self.reset {
            let secs = (reset - Utc::now()).num_seconds();
            if secs > 0 {
                write!(f, ", resets in {}s", secs)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for RateLimitError {}

fn header_number<N: std::str::FromStr>(headers: &HeaderMap, name: &str) -> Option<N> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}

/// A failed call against the Companies House API.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// HTTP 401, bad or missing API key.
    #[error("{message}")]
    Authentication { message: String },

    /// HTTP 429.
    #[error(transparent)]
    RateLimit(#[from] RateLimitError),

    /// HTTP 404.
    #[error("{message}")]
    NotFound { message: String },

    /// Input rejected before or by the API.
    #[error("{message}")]
    Validation { message: String },

    /// Any 5xx.
    #[error("{message}")]
    Server { message: String, status: u16 },

    /// Failure below HTTP: refused connection, DNS, timeout.
    #[error("{message}")]
    Network { message: String },

    /// Any other non-2xx response, or a body that could not be decoded.
    #[error("{message}")]
    Api { message: String, status: Option<u16> },
}

impl ApiError {
    pub fn authentication(message: impl Into<String>) -> Self {
        ApiError::Authentication {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
        }
    }

    pub fn server(status: u16) -> Self {
        Self::server_with_message(DEFAULT_SERVER_MESSAGE, status)
    }

    pub fn server_with_message(message: impl Into<String>, status: u16) -> Self {
        ApiError::Server {
            message: message.into(),
            status,
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        ApiError::Network {
            message: message.into(),
        }
    }

    pub fn api(message: impl Into<String>, status: Option<u16>) -> Self {
        ApiError::Api {
            message: message.into(),
            status,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Authentication { .. } => ErrorKind::Authentication,
            ApiError::RateLimit(_) => ErrorKind::RateLimit,
            ApiError::NotFound { .. } => ErrorKind::NotFound,
            ApiError::Validation { .. } => ErrorKind::Validation,
            ApiError::Server { .. } => ErrorKind::Server,
            ApiError::Network { .. } => ErrorKind::Network,
            ApiError::Api { .. } => ErrorKind::Api,
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Authentication { .. } => Some(401),
            ApiError::RateLimit(_) => Some(429),
            ApiError::NotFound { .. } => Some(404),
            ApiError::Validation { .. } => Some(400),
            ApiError::Server { status, .. } => Some(*status),
            ApiError::Network { .. } => None,
            ApiError::Api { status, .. } => *status,
        }
    }

    /// Whether waiting and re-issuing the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::RateLimit(_) | ApiError::Server { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::authentication("x").status_code(), Some(401));
        assert_eq!(ApiError::from(RateLimitError::default()).status_code(), Some(429));
        assert_eq!(ApiError::not_found("x").status_code(), Some(404));
        assert_eq!(ApiError::validation("x").status_code(), Some(400));
        assert_eq!(ApiError::server(503).status_code(), Some(503));
        assert_eq!(ApiError::network("x").status_code(), None);
        assert_eq!(ApiError::api("x", Some(418)).status_code(), Some(418));
        assert_eq!(ApiError::api("x", None).status_code(), None);
    }

    #[test]
    fn test_server_default_message() {
        let err = ApiError::server(500);
        assert_eq!(err.message(), "Server error");
        assert_eq!(err.kind(), ErrorKind::Server);

        let err = ApiError::server_with_message("Gateway timeout", 504);
        assert_eq!(err.message(), "Gateway timeout");
        assert_eq!(err.status_code(), Some(504));
    }

    #[test]
    fn test_is_retryable() {
        assert!(ApiError::from(RateLimitError::default()).is_retryable());
        assert!(ApiError::server(502).is_retryable());
        assert!(!ApiError::authentication(DEFAULT_AUTHENTICATION_MESSAGE).is_retryable());
        assert!(!ApiError::not_found(DEFAULT_NOT_FOUND_MESSAGE).is_retryable());
        assert!(!ApiError::validation(DEFAULT_VALIDATION_MESSAGE).is_retryable());
        assert!(!ApiError::network(DEFAULT_NETWORK_MESSAGE).is_retryable());
        assert!(!ApiError::api("teapot", Some(418)).is_retryable());
    }

    #[test]
    fn test_rate_limit_default_message() {
        let err = RateLimitError::default();
        assert_eq!(err.message(), "Rate limit exceeded");
        assert_eq!(err.retry_after, None);
        assert_eq!(err.remaining, None);
        assert_eq!(err.limit, None);
        assert_eq!(err.reset, None);
    }

    #[test]
    fn test_rate_limit_message_with_retry_after() {
        let err = RateLimitError::default().with_retry_after(Duration::from_secs(60));
        assert!(err.message().contains("retry after 60s"));
    }

    #[test]
    fn test_rate_limit_message_with_future_reset() {
        let err = RateLimitError::default().with_reset(Utc::now() + chrono::Duration::seconds(30));
        assert!(err.message().contains("resets in"));
        assert_eq!(err.retry_after, None);
    }

    #[test]
    fn test_from_headers_with_all_headers() {
        let now = Utc::now();
        let reset = now.timestamp() + 60;
        let map = headers(&[
            (RATE_LIMIT_REMAIN_HEADER, "10"),
            (RATE_LIMIT_LIMIT_HEADER, "600"),
            (RATE_LIMIT_RESET_HEADER, &reset.to_string()),
        ]);

        let err = RateLimitError::from_headers_at(&map, now);
        assert_eq!(err.remaining, Some(10));
        assert_eq!(err.limit, Some(600));
        assert_eq!(err.reset.map(|r| r.timestamp()), Some(reset));

        let wait = err.retry_after.unwrap();
        assert!(wait > Duration::from_secs(58));
        assert!(wait <= Duration::from_secs(60));
    }

    #[test]
    fn test_from_headers_uses_wall_clock() {
        let reset = Utc::now().timestamp() + 60;
        let map = headers(&[(RATE_LIMIT_RESET_HEADER, &reset.to_string())]);

        let err = RateLimitError::from_headers(&map);
        let wait = err.retry_after.unwrap();
        assert!(wait > Duration::from_secs(55));
        assert!(wait <= Duration::from_secs(60));
    }

    #[test]
    fn test_from_headers_missing() {
        let err = RateLimitError::from_headers(&HeaderMap::new());
        assert_eq!(err, RateLimitError::default());
        assert_eq!(err.message(), "Rate limit exceeded");
    }

    #[test]
    fn test_from_headers_non_numeric() {
        let map = headers(&[
            (RATE_LIMIT_REMAIN_HEADER, "not-a-number"),
            (RATE_LIMIT_LIMIT_HEADER, "invalid"),
            (RATE_LIMIT_RESET_HEADER, "bad-timestamp"),
        ]);

        let err = RateLimitError::from_headers(&map);
        assert_eq!(err.remaining, None);
        assert_eq!(err.limit, None);
        assert_eq!(err.reset, None);
        assert_eq!(err.retry_after, None);
    }

    #[test]
    fn test_from_headers_past_reset() {
        let now = Utc::now();
        let past = now.timestamp() - 60;
        let map = headers(&[(RATE_LIMIT_RESET_HEADER, &past.to_string())]);

        let err = RateLimitError::from_headers_at(&map, now);
        assert!(err.reset.is_some());
        assert_eq!(err.retry_after, None);
        assert_eq!(err.message(), "Rate limit exceeded");
    }

    #[test]
    fn test_retry_after_header() {
        let map = headers(&[("retry-after", "1")]);
        assert_eq!(
            RateLimitError::retry_after_header(&map),
            Some(Duration::from_secs(1))
        );

        let map = headers(&[("retry-after", "2.5")]);
        assert_eq!(
            RateLimitError::retry_after_header(&map),
            Some(Duration::from_millis(2500))
        );

        let map = headers(&[("retry-after", "soon")]);
        assert_eq!(RateLimitError::retry_after_header(&map), None);

        let map = headers(&[("retry-after", "-3")]);
        assert_eq!(RateLimitError::retry_after_header(&map), None);

        assert_eq!(RateLimitError::retry_after_header(&HeaderMap::new()), None);
    }

    #[test]
    fn test_retry_after_header_out_of_range() {
        for value in ["1e20", "inf", "NaN"] {
            let map = headers(&[("retry-after", value)]);
            assert_eq!(RateLimitError::retry_after_header(&map), None, "{}", value);
        }
    }

    #[test]
    fn test_rate_limit_converts_into_api_error() {
        let err: ApiError = RateLimitError::default()
            .with_window(Some(0), Some(600))
            .into();
        assert_eq!(err.kind(), ErrorKind::RateLimit);
        match err {
            ApiError::RateLimit(inner) => {
                assert_eq!(inner.remaining, Some(0));
                assert_eq!(inner.limit, Some(600));
            }
            other => panic!("Expected rate limit error, got {:?}", other),
        }
    }
}
