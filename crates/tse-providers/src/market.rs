use async_trait::async_trait;
use serde_json::Value;
use tse_core::{OhlcvBar, Symbol, TradeTapeRow};

use crate::error::{ProviderError, ProviderResult};
use crate::retry::with_backoff;

/// Market-data surface the orchestrator's critical fetch stage depends
/// on. Endpoint shapes are provider-specific and intentionally not part
/// of this trait's contract; implementations translate whatever wire
/// format they speak into these domain types.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn search_symbol(&self, query: &str) -> ProviderResult<Symbol>;
    async fn fetch_history(&self, symbol: &Symbol) -> ProviderResult<Vec<OhlcvBar>>;
    async fn fetch_details(&self, symbol: &Symbol) -> ProviderResult<Value>;
    async fn fetch_pivots(&self, symbol: &Symbol) -> ProviderResult<Vec<f64>>;
    async fn fetch_balance_sheet(&self, symbol: &Symbol) -> ProviderResult<Value>;
    async fn fetch_profit_loss(&self, symbol: &Symbol) -> ProviderResult<Value>;
    async fn fetch_cash_flow(&self, symbol: &Symbol) -> ProviderResult<Value>;
    async fn fetch_financial_ratios(&self, symbol: &Symbol) -> ProviderResult<Value>;
    async fn fetch_codal_announcements(&self, symbol: &Symbol) -> ProviderResult<Value>;
    async fn fetch_trade_tape(&self, symbol: &Symbol) -> ProviderResult<Vec<TradeTapeRow>>;
}

pub struct HttpMarketDataProvider {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMarketDataProvider {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> ProviderResult<Value> {
        with_backoff("market_data.get_json", || async {
            let resp = self
                .client
                .get(format!("{}{}", self.base_url, path))
                .query(query)
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
impl MarketDataProvider for HttpMarketDataProvider {
    async fn search_symbol(&self, query: &str) -> ProviderResult<Symbol> {
        let body = self.get_json("/search", &[("q", query)]).await?;
        body["symbol"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::Other(format!("no symbol match for {query}")))
    }

    async fn fetch_history(&self, symbol: &Symbol) -> ProviderResult<Vec<OhlcvBar>> {
        let body = self.get_json("/history", &[("symbol", symbol.as_str())]).await?;
        serde_json::from_value(body).map_err(ProviderError::from)
    }

    async fn fetch_details(&self, symbol: &Symbol) -> ProviderResult<Value> {
        self.get_json("/details", &[("symbol", symbol.as_str())]).await
    }

    async fn fetch_pivots(&self, symbol: &Symbol) -> ProviderResult<Vec<f64>> {
        let body = self.get_json("/pivots", &[("symbol", symbol.as_str())]).await?;
        serde_json::from_value(body).map_err(ProviderError::from)
    }

    async fn fetch_balance_sheet(&self, symbol: &Symbol) -> ProviderResult<Value> {
        self.get_json("/balance-sheet", &[("symbol", symbol.as_str())]).await
    }

    async fn fetch_profit_loss(&self, symbol: &Symbol) -> ProviderResult<Value> {
        self.get_json("/profit-loss", &[("symbol", symbol.as_str())]).await
    }

    async fn fetch_cash_flow(&self, symbol: &Symbol) -> ProviderResult<Value> {
        self.get_json("/cash-flow", &[("symbol", symbol.as_str())]).await
    }

    async fn fetch_financial_ratios(&self, symbol: &Symbol) -> ProviderResult<Value> {
        self.get_json("/financial-ratios", &[("symbol", symbol.as_str())]).await
    }

    async fn fetch_codal_announcements(&self, symbol: &Symbol) -> ProviderResult<Value> {
        self.get_json("/codal-news", &[("symbol", symbol.as_str())]).await
    }

    async fn fetch_trade_tape(&self, symbol: &Symbol) -> ProviderResult<Vec<TradeTapeRow>> {
        let body = self.get_json("/real-legal-trade", &[("symbol", symbol.as_str())]).await?;
        serde_json::from_value(body).map_err(ProviderError::from)
    }
}
