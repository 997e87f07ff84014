use std::env;

use anyhow::{Context, Result};
use tse_llm::LlmConfig;

/// Process-wide settings, assembled once at startup from the
/// environment. Every key is `TSE_`-prefixed to avoid collisions when
/// this binary shares a host with other tools.
#[derive(Debug, Clone)]
pub struct Settings {
    pub store_url: String,
    pub market_base_url: String,
    pub social_base_url: String,
    pub search_base_url: String,
    pub tweet_search_base_url: String,
    pub tweet_search_host: String,
    pub tweet_search_api_key: String,
    pub search_api_key: String,
    pub log_level: String,
    pub log_json: bool,
    pub llm: LlmConfig,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            store_url: env::var("TSE_STORE_URL").unwrap_or_else(|_| "sqlite://tse-reports.db".to_string()),
            market_base_url: env::var("TSE_MARKET_BASE_URL")
                .context("TSE_MARKET_BASE_URL not set")?,
            social_base_url: env::var("TSE_SOCIAL_BASE_URL")
                .context("TSE_SOCIAL_BASE_URL not set")?,
            search_base_url: env::var("TSE_SEARCH_BASE_URL").unwrap_or_else(|_| "https://api.tavily.com".to_string()),
            tweet_search_base_url: env::var("TSE_TWEET_SEARCH_BASE_URL").unwrap_or_default(),
            tweet_search_host: env::var("TSE_TWEET_SEARCH_HOST").unwrap_or_default(),
            tweet_search_api_key: env::var("TSE_TWEET_SEARCH_API_KEY").unwrap_or_default(),
            search_api_key: env::var("TSE_SEARCH_API_KEY").unwrap_or_default(),
            log_level: env::var("TSE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: env::var("TSE_LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
            llm: LlmConfig::from_env(),
        })
    }
}
