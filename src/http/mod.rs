//! Single-attempt HTTP transport and response classification.

mod classify;
mod client;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::Value;

use crate::error::ApiError;

pub use classify::{classify_status, error_for_response, network_error};
pub use client::HttpClient;

/// One physical request against the API, relative to the configured base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Performs exactly one request. Implementations never retry.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, request: &ApiRequest) -> Result<Value, ApiError>;
}
