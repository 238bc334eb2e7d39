//! Client-wide configuration. Immutable once a client is built.

use anyhow::{Result, anyhow, bail};
use log::debug;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::retry::{DEFAULT_MAX_RETRIES, RetryPolicy};
use crate::runtime::Runtime;

pub const DEFAULT_BASE_URL: &str = "https://api.company-information.service.gov.uk";
pub const SANDBOX_BASE_URL: &str = "https://api-sandbox.company-information.service.gov.uk";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_ITEMS_PER_PAGE: u32 = 20;
/// Largest page the search endpoints accept.
pub const MAX_ITEMS_PER_PAGE: u32 = 100;
/// Pause between consecutive page fetches when walking search results.
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(100);

pub const API_KEY_ENV: &str = "COMPANIES_HOUSE_API_KEY";
pub const BASE_URL_ENV: &str = "COMPANIES_HOUSE_BASE_URL";
pub const MAX_RETRIES_ENV: &str = "COMPANIES_HOUSE_MAX_RETRIES";
pub const TIMEOUT_ENV: &str = "COMPANIES_HOUSE_TIMEOUT";

#[derive(Clone, PartialEq)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub max_retries: u32,
    pub timeout: Duration,
    pub items_per_page: u32,
    pub page_delay: Duration,
    pub user_agent: String,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.masked_api_key())
            .field("base_url", &self.base_url)
            .field("max_retries", &self.max_retries)
            .field("timeout", &self.timeout)
            .field("items_per_page", &self.items_per_page)
            .field("page_delay", &self.page_delay)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl Config {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: DEFAULT_TIMEOUT,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
            page_delay: DEFAULT_PAGE_DELAY,
            user_agent: concat!("ukcompanies/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Configuration pointing at the Companies House sandbox.
    pub fn sandbox(api_key: impl Into<String>) -> Self {
        Self::new(api_key).with_base_url(SANDBOX_BASE_URL)
    }

    /// Reads configuration from `COMPANIES_HOUSE_*` environment variables.
    pub fn from_env<R: Runtime>(runtime: &R) -> Result<Self> {
        Self::load(runtime, None, None, None)
    }

    /// Reads configuration from the environment, with explicit values taking
    /// precedence over the matching `COMPANIES_HOUSE_*` variables.
    #[tracing::instrument(skip(runtime, api_key))]
    pub fn load<R: Runtime>(
        runtime: &R,
        api_key: Option<String>,
        base_url: Option<String>,
        max_retries: Option<u32>,
    ) -> Result<Self> {
        let api_key = api_key
            .or_else(|| runtime.env_var(API_KEY_ENV).ok())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or_else(|| anyhow!("{} is not set", API_KEY_ENV))?;

        let base_url = match base_url {
            Some(url) => Some(url),
            None => env_value::<_, String>(runtime, BASE_URL_ENV)?,
        };
        let max_retries = match max_retries {
            Some(n) => Some(n),
            None => env_value(runtime, MAX_RETRIES_ENV)?,
        };

        let mut config = Config::new(api_key);
        if let Some(base_url) = base_url {
            config = config.with_base_url(&base_url);
        }
        if let Some(max_retries) = max_retries {
            config = config.with_max_retries(max_retries);
        }
        if let Some(secs) = env_value::<_, u64>(runtime, TIMEOUT_ENV)? {
            config = config.with_timeout(Duration::from_secs(secs));
        }

        debug!("Loaded configuration: {:?}", config);
        config.validate()?;
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Default page size for searches, clamped to `1..=100`.
    pub fn with_items_per_page(mut self, items_per_page: u32) -> Self {
        self.items_per_page = clamp_page_size(items_per_page);
        self
    }

    pub fn with_page_delay(mut self, page_delay: Duration) -> Self {
        self.page_delay = page_delay;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            bail!("API key cannot be empty");
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            bail!(
                "Invalid base URL '{}': expected an http:// or https:// URL",
                self.base_url
            );
        }
        if self.timeout.is_zero() {
            bail!("Timeout must be greater than zero");
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries)
    }

    /// API key with everything but the edges hidden, safe for logs.
    pub fn masked_api_key(&self) -> String {
        let key = &self.api_key;
        if key.len() <= 8 || !key.is_ascii() {
            return "********".to_string();
        }
        format!("{}****{}", &key[..4], &key[key.len() - 4..])
    }
}

/// Clamps a requested page size into the range the API accepts.
pub fn clamp_page_size(items_per_page: u32) -> u32 {
    items_per_page.clamp(1, MAX_ITEMS_PER_PAGE)
}

fn env_value<R, T>(runtime: &R, key: &str) -> Result<Option<T>>
where
    R: Runtime,
    T: FromStr,
    T::Err: fmt::Display,
{
    let Ok(raw) = runtime.env_var(key) else {
        return Ok(None);
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<T>()
        .map(Some)
        .map_err(|e| anyhow!("Invalid value for {}: '{}' ({})", key, raw, e))
}
