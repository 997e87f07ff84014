use async_trait::async_trait;
use serde_json::Value;
use tse_core::Symbol;

use crate::error::{ProviderError, ProviderResult};
use crate::retry::with_backoff;

/// Non-critical social/retail feed surface. Every method is expected to
/// be called with per-field isolation by the orchestrator: a failure
/// here degrades the resulting report, it never aborts the pipeline.
#[async_trait]
pub trait SocialDataProvider: Send + Sync {
    async fn fetch_trade_info(&self, symbol: &Symbol) -> ProviderResult<Value>;
    async fn fetch_overall_info(&self, symbol: &Symbol) -> ProviderResult<Value>;
    async fn fetch_tweets(&self, symbol: &Symbol) -> ProviderResult<Vec<Value>>;
    async fn fetch_codal_extra(&self, symbol: &Symbol) -> ProviderResult<Value>;
}

pub struct HttpSocialDataProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSocialDataProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    async fn get_json(&self, path: &str, symbol: &str) -> ProviderResult<Value> {
        with_backoff("social_data.get_json", || async {
            let resp = self
                .client
                .get(format!("{}{}", self.base_url, path))
                .query(&[("symbol", symbol)])
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

#[async_trait]
impl SocialDataProvider for HttpSocialDataProvider {
    async fn fetch_trade_info(&self, symbol: &Symbol) -> ProviderResult<Value> {
        self.get_json("/trade-info", symbol).await
    }

    async fn fetch_overall_info(&self, symbol: &Symbol) -> ProviderResult<Value> {
        self.get_json("/overall-info", symbol).await
    }

    async fn fetch_tweets(&self, symbol: &Symbol) -> ProviderResult<Vec<Value>> {
        let body = self.get_json("/tweets", symbol).await?;
        serde_json::from_value(body).map_err(ProviderError::from)
    }

    async fn fetch_codal_extra(&self, symbol: &Symbol) -> ProviderResult<Value> {
        self.get_json("/codal", symbol).await
    }
}
