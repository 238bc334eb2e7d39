//! Reqwest-backed [`Transport`].

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::Value;

use super::classify::{error_for_response, network_error};
use super::{ApiRequest, Transport};
use crate::error::ApiError;

/// HTTP transport bound to one base URL and, optionally, one API key.
///
/// The API key is sent as the Basic auth user name with an empty password.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpClient {
    /// Creates a transport wrapping the given reqwest Client.
    pub fn new(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Returns a reference to the underlying reqwest Client.
    pub fn inner(&self) -> &Client {
        &self.client
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for HttpClient {
    #[tracing::instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    async fn request(&self, request: &ApiRequest) -> Result<Value, ApiError> {
        let url = self.url(&request.path);
        debug!("{} {} with query {:?}...", request.method, url, request.query);

        let mut builder = self.client.request(request.method.clone(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(api_key) = &self.api_key {
            builder = builder.basic_auth(api_key, Some(""));
        }

        let response = builder.send().await.map_err(network_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(error_for_response(response).await);
        }

        let bytes = response.bytes().await.map_err(network_error)?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&bytes).map_err(|e| {
            ApiError::api(
                format!("Failed to parse JSON response: {}", e),
                Some(status.as_u16()),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use mockito::Matcher;
    use std::time::Duration;

    #[tokio::test]
    async fn test_request_success() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/company/12345678")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"company_number": "12345678", "company_name": "TEST COMPANY"}"#)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new(), &server.url());
        let value = client
            .request(&ApiRequest::get("/company/12345678"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(value["company_name"], "TEST COMPANY");
    }

    #[tokio::test]
    async fn test_request_sends_query_and_basic_auth() {
        let mut server = mockito::Server::new_async().await;

        // base64("test-key:")
        let mock = server
            .mock("GET", "/search/companies")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "acme widgets".into()),
                Matcher::UrlEncoded("items_per_page".into(), "20".into()),
            ]))
            .match_header("authorization", "Basic dGVzdC1rZXk6")
            .with_status(200)
            .with_body(r#"{"items": []}"#)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new(), &format!("{}/", server.url()))
            .with_api_key("test-key");
        let request = ApiRequest::get("search/companies")
            .query("q", "acme widgets")
            .query("items_per_page", 20);
        client.request(&request).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_request_without_api_key_sends_no_auth() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let client = HttpClient::new(Client::new(), &server.url());
        client.request(&ApiRequest::get("/")).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_request_empty_body_is_null() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/empty")
            .with_status(204)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new(), &server.url());
        let value = client.request(&ApiRequest::get("/empty")).await.unwrap();
        assert_eq!(value, Value::Null);
    }

    #[tokio::test]
    async fn test_request_invalid_json() {
        let mut server = mockito::Server::new_async().await;
        let _m = server
            .mock("GET", "/broken")
            .with_status(200)
            .with_body("{not json")
            .create_async()
            .await;

        let client = HttpClient::new(Client::new(), &server.url());
        let err = client
            .request(&ApiRequest::get("/broken"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Api);
        assert_eq!(err.status_code(), Some(200));
    }

    #[tokio::test]
    async fn test_request_not_found() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/company/00000000")
            .with_status(404)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new(), &server.url());
        let err = client
            .request(&ApiRequest::get("/company/00000000"))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_request_rate_limited_is_single_attempt() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/company/12345678")
            .with_status(429)
            .with_header("retry-after", "1")
            .expect(1)
            .create_async()
            .await;

        let client = HttpClient::new(Client::new(), &server.url());
        let err = client
            .request(&ApiRequest::get("/company/12345678"))
            .await
            .unwrap_err();

        mock.assert_async().await;
        match err {
            ApiError::RateLimit(inner) => {
                assert_eq!(inner.retry_after, Some(Duration::from_secs(1)))
            }
            other => panic!("Expected rate limit error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_request_connection_refused() {
        let client = HttpClient::new(Client::new(), "http://127.0.0.1:1");
        let err = client.request(&ApiRequest::get("/")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Network);
    }

    #[test]
    fn test_url_joining() {
        let client = HttpClient::new(Client::new(), "https://example.com/");
        assert_eq!(client.base_url(), "https://example.com");
        assert_eq!(client.url("/search"), "https://example.com/search");
        assert_eq!(client.url("search"), "https://example.com/search");
    }
}
