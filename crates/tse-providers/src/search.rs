use async_trait::async_trait;
use serde_json::Value;

use crate::error::{ProviderError, ProviderResult};
use crate::retry::with_backoff;

/// Free-text search surface (Twitter and web search). Each method is an
/// independent best-effort lookup; the orchestrator treats a failure
/// here as an empty result, never a pipeline abort.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Recent tweets mentioning the symbol, trailing 90-day window.
    async fn search_tweets(&self, query: &str) -> ProviderResult<Vec<Value>>;
    /// Web search answer, trailing 30-day window.
    async fn search_web(&self, query: &str) -> ProviderResult<Value>;
}

pub struct HttpSearchProvider {
    client: reqwest::Client,
    rapid_base_url: String,
    rapid_api_key: String,
    rapid_api_host: String,
    tavily_base_url: String,
    tavily_api_key: String,
}

impl HttpSearchProvider {
    pub fn new(
        rapid_base_url: String,
        rapid_api_key: String,
        rapid_api_host: String,
        tavily_base_url: String,
        tavily_api_key: String,
    ) -> Self {
        Self {
            client: reqwest::Client::new(),
            rapid_base_url,
            rapid_api_key,
            rapid_api_host,
            tavily_base_url,
            tavily_api_key,
        }
    }
}

#[async_trait]
impl SearchProvider for HttpSearchProvider {
    async fn search_tweets(&self, query: &str) -> ProviderResult<Vec<Value>> {
        with_backoff("search.tweets", || async {
            let resp = self
                .client
                .get(&self.rapid_base_url)
                .query(&[("query", query), ("range", "90day")])
                .header("X-RapidAPI-Key", &self.rapid_api_key)
                .header("X-RapidAPI-Host", &self.rapid_api_host)
                .send()
                .await?;
            if !resp.status().is_success() {
                return Err(ProviderError::Upstream {
                    status: resp.status().as_u16(),
                    body: resp.text().await.unwrap_or_default(),
                });
            }
            let body: Value = resp.json().await?;
            serde_json::from_value(body["tweets"].clone()).map_err(ProviderError::from)
        })
        .await
    }

    async fn search_web(&self, query: &str) -> ProviderResult<Value> {
        with_backoff("search.web", || async {
            let resp = self
                .client
                .post(&self.tavily_base_url)
                .json(&serde_json::json!({
                    "api_key": self.tavily_api_key,
                    "query": query,
                    "days": 30,
                }))
                .send()
                .await?;
            if !resp.status().is_success() {
                return Err(ProviderError::Upstream {
                    status: resp.status().as_u16(),
                    body: resp.text().await.unwrap_or_default(),
                });
            }
            Ok(resp.json::<Value>().await?)
        })
        .await
    }
}
