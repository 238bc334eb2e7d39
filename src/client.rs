//! Companies House client: logical operations routed through the retry
//! engine onto a [`Transport`].

use anyhow::Context;
use futures_util::Stream;
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, clamp_page_size};
use crate::error::ApiError;
use crate::http::{ApiRequest, HttpClient, Transport};
use crate::models::{
    Address, AllSearchResult, Company, CompanyNumber, CompanySearchResult, OfficerSearchResult,
};
use crate::pagination::paginate;
use crate::retry::{RetryObserver, RetryPolicy, with_retry};
use crate::runtime::RealRuntime;

pub struct CompaniesHouseClient<T: Transport = HttpClient> {
    transport: Arc<T>,
    retry: RetryPolicy,
    items_per_page: u32,
    page_delay: Duration,
    on_retry: Option<Arc<RetryObserver>>,
}

impl<T: Transport> Clone for CompaniesHouseClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            retry: self.retry,
            items_per_page: self.items_per_page,
            page_delay: self.page_delay,
            on_retry: self.on_retry.clone(),
        }
    }
}

impl CompaniesHouseClient<HttpClient> {
    /// Builds a client talking HTTP to `config.base_url`.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;

        debug!(
            "Using Companies House API at {} with key {}",
            config.base_url,
            config.masked_api_key()
        );

        let transport = HttpClient::new(client, &config.base_url).with_api_key(&config.api_key);
        Ok(Self::with_transport(transport, &config))
    }

    /// Builds a client from `COMPANIES_HOUSE_*` environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Self::new(Config::from_env(&RealRuntime)?)
    }
}

impl<T: Transport> CompaniesHouseClient<T> {
    pub fn with_transport(transport: T, config: &Config) -> Self {
        Self {
            transport: Arc::new(transport),
            retry: config.retry_policy(),
            items_per_page: clamp_page_size(config.items_per_page),
            page_delay: config.page_delay,
            on_retry: None,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    /// Attaches a retry observer. Clone the client first to scope the
    /// observer to a single call; clones share the transport.
    pub fn with_on_retry<F>(mut self, observer: F) -> Self
    where
        F: Fn(u32, &ApiError) + Send + Sync + 'static,
    {
        self.on_retry = Some(Arc::new(observer));
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Default page size used when callers have no preference.
    pub fn items_per_page(&self) -> u32 {
        self.items_per_page
    }

    /// Sends `request`, retrying rate limits and server errors per the
    /// client's [`RetryPolicy`]. The same request is re-sent on every attempt.
    pub async fn request(&self, request: ApiRequest) -> Result<Value, ApiError> {
        let operation_name = format!("{} {}", request.method, request.path);
        let transport = self.transport.as_ref();
        let request = &request;

        with_retry(
            &self.retry,
            &operation_name,
            self.on_retry.as_deref(),
            || transport.request(request),
        )
        .await
    }

    async fn get<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, ApiError> {
        let value = self.request(request).await?;
        serde_json::from_value(value)
            .map_err(|e| ApiError::api(format!("Unexpected response format: {}", e), None))
    }

    #[tracing::instrument(skip(self))]
    pub async fn search_companies(
        &self,
        query: &str,
        items_per_page: u32,
        start_index: u32,
    ) -> Result<CompanySearchResult, ApiError> {
        self.get(search_request("/search/companies", query, items_per_page, start_index)?)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn search_officers(
        &self,
        query: &str,
        items_per_page: u32,
        start_index: u32,
    ) -> Result<OfficerSearchResult, ApiError> {
        self.get(search_request("/search/officers", query, items_per_page, start_index)?)
            .await
    }

    /// Searches companies, officers and disqualified officers at once.
    #[tracing::instrument(skip(self))]
    pub async fn search_all(
        &self,
        query: &str,
        items_per_page: u32,
        start_index: u32,
    ) -> Result<AllSearchResult, ApiError> {
        self.get(search_request("/search", query, items_per_page, start_index)?)
            .await
    }

    /// Lazily walks every page of [`Self::search_all`] from the first result.
    ///
    /// Pages are fetched only as the stream is polled, each one through the
    /// retry engine. `max_pages` bounds the number of fetches: `None` walks
    /// until the last page, and `Some(0)` fetches nothing at all.
    pub fn search_all_pages<'a>(
        &'a self,
        query: &'a str,
        per_page: u32,
        max_pages: Option<u32>,
    ) -> impl Stream<Item = Result<AllSearchResult, ApiError>> + 'a {
        paginate(
            clamp_page_size(per_page),
            max_pages,
            self.page_delay,
            move |start_index, per_page| self.search_all(query, per_page, start_index),
        )
    }

    /// Fetches a company profile. The number is validated before any request.
    #[tracing::instrument(skip(self))]
    pub async fn get_company(&self, company_number: &str) -> Result<Company, ApiError> {
        let number: CompanyNumber = company_number.parse()?;
        self.get(ApiRequest::get(format!("/company/{}", number)))
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_company_address(&self, company_number: &str) -> Result<Address, ApiError> {
        let number: CompanyNumber = company_number.parse()?;
        self.get(ApiRequest::get(format!(
            "/company/{}/registered-office-address",
            number
        )))
        .await
    }

    /// Alias for [`Self::get_company`].
    pub async fn profile(&self, company_number: &str) -> Result<Company, ApiError> {
        self.get_company(company_number).await
    }

    /// Alias for [`Self::get_company_address`].
    pub async fn address(&self, company_number: &str) -> Result<Address, ApiError> {
        self.get_company_address(company_number).await
    }
}

fn search_request(
    path: &str,
    query: &str,
    items_per_page: u32,
    start_index: u32,
) -> Result<ApiRequest, ApiError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ApiError::validation("Search query cannot be empty"));
    }

    Ok(ApiRequest::get(path)
        .query("q", query)
        .query("items_per_page", clamp_page_size(items_per_page))
        .query("start_index", start_index))
}
