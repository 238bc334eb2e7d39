//! Maps raw HTTP outcomes onto the [`ApiError`] taxonomy.

use log::debug;
use reqwest::StatusCode;
use reqwest::header::HeaderMap;

use crate::error::{
    ApiError, DEFAULT_AUTHENTICATION_MESSAGE, DEFAULT_NETWORK_MESSAGE, DEFAULT_NOT_FOUND_MESSAGE,
    DEFAULT_SERVER_MESSAGE, RateLimitError,
};

/// Classifies a response status. Returns `None` for 2xx.
///
/// `body` is only used to enrich messages; an empty or non-JSON body falls
/// back to the default message for the kind.
pub fn classify_status(status: StatusCode, headers: &HeaderMap, body: &str) -> Option<ApiError> {
    if status.is_success() {
        return None;
    }

    let detail = error_detail(body);
    let error = match status {
        StatusCode::UNAUTHORIZED => ApiError::authentication(
            detail.unwrap_or_else(|| DEFAULT_AUTHENTICATION_MESSAGE.to_string()),
        ),
        StatusCode::NOT_FOUND => {
            ApiError::not_found(detail.unwrap_or_else(|| DEFAULT_NOT_FOUND_MESSAGE.to_string()))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            let mut error = RateLimitError::from_headers(headers);
            // An explicit Retry-After wins over the window reset.
            if let Some(wait) = RateLimitError::retry_after_header(headers) {
                error = error.with_retry_after(wait);
            }
            ApiError::RateLimit(error)
        }
        s if s.is_server_error() => ApiError::server_with_message(
            detail.unwrap_or_else(|| DEFAULT_SERVER_MESSAGE.to_string()),
            s.as_u16(),
        ),
        s => {
            let message = match detail {
                Some(detail) => format!("HTTP {} error: {}", s.as_u16(), detail),
                None => format!("HTTP {} error", s.as_u16()),
            };
            ApiError::api(message, Some(s.as_u16()))
        }
    };
    Some(error)
}

/// Consumes a non-2xx response and classifies it.
pub async fn error_for_response(response: reqwest::Response) -> ApiError {
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.text().await.unwrap_or_default();

    debug!("HTTP {} response body: {}", status.as_u16(), body);

    classify_status(status, &headers, &body)
        .unwrap_or_else(|| ApiError::api(format!("Unexpected HTTP {}", status), Some(status.as_u16())))
}

/// Classifies a failure that happened before any HTTP status was received.
pub fn network_error(error: reqwest::Error) -> ApiError {
    if error.is_builder() {
        return ApiError::validation(format!("Invalid request: {}", error));
    }
    if error.is_timeout() {
        return ApiError::network(format!("Request timed out: {}", error));
    }
    if error.is_connect() {
        return ApiError::network(format!("Connection failed: {}", error));
    }
    ApiError::network(format!("{}: {}", DEFAULT_NETWORK_MESSAGE, error))
}

/// Pulls a human message out of an API error body.
///
/// Companies House answers with either `{"error": "..."}` or
/// `{"errors": [{"error": "..."}]}`.
fn error_detail(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let detail = value
        .get("error")
        .or_else(|| value.get("message"))
        .or_else(|| value.get("errors")?.get(0)?.get("error"))?
        .as_str()?
        .trim();
    (!detail.is_empty()).then(|| detail.to_string())
}
