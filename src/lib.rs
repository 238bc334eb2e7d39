//! Typed async client for the UK Companies House REST API.
//!
//! Requests go through a single-attempt [`http::Transport`]; the
//! [`CompaniesHouseClient`] wraps every call in the retry engine, which
//! backs off on rate limits and server errors.

pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod pagination;
pub mod retry;
pub mod runtime;

pub use client::CompaniesHouseClient;
pub use config::Config;
pub use error::{ApiError, ErrorKind, RateLimitError};
pub use retry::RetryPolicy;
