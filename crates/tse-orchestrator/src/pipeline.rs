use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tse_core::{AssetDocument, FundamentalAnalysis, OhlcvBar, Symbol, TradeTapeRow, MIN_BARS_FOR_ANALYSIS};
use tse_providers::{should_run, today_utc, DocumentStore, MarketDataProvider, SearchProvider, SocialDataProvider};

use crate::cache::TtlCache;
use crate::error::{OrchestratorError, OrchestratorResult};

const CACHE_TTL_SECS: i64 = 300;

/// Critical market data: history, statements and trade-tape. Every
/// field past symbol resolution degrades independently — a missing
/// balance sheet doesn't stop the pipeline, it just leaves that slice
/// empty in the final document.
#[derive(Debug, Clone, Default)]
pub struct MarketBundle {
    pub history: Vec<OhlcvBar>,
    pub details: Value,
    pub pivots: Vec<f64>,
    pub balance_sheet: Value,
    pub profit_loss: Value,
    pub cash_flow: Value,
    pub financial_ratios: Value,
    pub codal: Value,
    pub trade_tape: Vec<TradeTapeRow>,
}

#[derive(Debug, Clone, Default)]
pub struct SocialBundle {
    pub trade_info: Value,
    pub overall_info: Value,
    pub tweets: Vec<Value>,
    pub codal_extra: Value,
}

#[derive(Debug, Clone, Default)]
pub struct ExternalSearchBundle {
    pub rapid_tweets: Vec<Value>,
    pub web_search: Option<Value>,
}

/// Isolates one fetch: logs and swallows the error, returning the
/// type's default instead of failing the whole gather. Mirrors the
/// `return_exceptions=True` + per-key exception check idiom the
/// original gather-based fetchers use.
async fn isolate<T, F>(field: &str, fut: F) -> T
where
    T: Default,
    F: Future<Output = tse_providers::ProviderResult<T>>,
{
    match fut.await {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(field, error = %err, "non-critical fetch failed, using default");
            T::default()
        }
    }
}

pub struct StockAnalysisPipeline {
    market: Arc<dyn MarketDataProvider>,
    social: Arc<dyn SocialDataProvider>,
    search: Arc<dyn SearchProvider>,
    store: DocumentStore,
    history_cache: TtlCache<Vec<OhlcvBar>>,
    details_cache: TtlCache<Value>,
}

impl StockAnalysisPipeline {
    pub fn new(
        market: Arc<dyn MarketDataProvider>,
        social: Arc<dyn SocialDataProvider>,
        search: Arc<dyn SearchProvider>,
        store: DocumentStore,
    ) -> Self {
        Self {
            market,
            social,
            search,
            store,
            history_cache: TtlCache::new(CACHE_TTL_SECS),
            details_cache: TtlCache::new(CACHE_TTL_SECS),
        }
    }

    /// Runs the full pipeline for `symbol_query`, persisting the result.
    /// Returns `Ok(None)` when a fresh document already exists for today
    /// (the freshness gate) and the pipeline is skipped entirely.
    pub async fn execute(&self, symbol_query: &str) -> OrchestratorResult<Option<AssetDocument>> {
        let symbol = self
            .market
            .search_symbol(symbol_query)
            .await
            .map_err(|_| OrchestratorError::SymbolNotFound(symbol_query.to_string()))?;

        // Freshness gate needs the provider id, which only the first
        // successful history/details round trip reveals; we key on the
        // resolved symbol itself as a cheap pre-check, then re-check
        // against the assembled document's real id below.
        let provisional_id = AssetDocument::document_id(&symbol, &symbol);
        if let Ok(Some(existing)) = self.store.get(&provisional_id).await {
            if !should_run(Some(&existing), today_utc()) {
                tracing::info!(symbol = %symbol, "document already fresh for today, skipping");
                return Ok(None);
            }
        }

        let market = self.fetch_market_data(&symbol).await?;
        let (social, external) = tokio::join!(
            self.fetch_social_data(&symbol),
            self.fetch_external_search(&symbol, market.details.get("name").and_then(Value::as_str).unwrap_or("")),
        );

        let mut bars = market.history;
        bars.sort_by_key(|b| b.date);
        if bars.len() < MIN_BARS_FOR_ANALYSIS {
            return Err(OrchestratorError::InsufficientHistory(bars.len()));
        }
        let current_price = bars.last().map(|b| b.close).unwrap_or(0.0);

        let technicals = tse_analytics::run_technical_analysis(&bars, &market.pivots, &market.trade_tape, 7)?;

        let fundamental_analysis = FundamentalAnalysis {
            balance_sheet: serde_json::from_value(market.balance_sheet.clone()).unwrap_or_default(),
            profit_loss: serde_json::from_value(market.profit_loss.clone()).unwrap_or_default(),
            cash_flow: serde_json::from_value(market.cash_flow.clone()).unwrap_or_default(),
            financial_ratios: serde_json::from_value(market.financial_ratios.clone()).unwrap_or_default(),
        };

        let net_income = fundamental_analysis
            .profit_loss
            .get("net_income")
            .and_then(tse_fundamental::fiscal::latest_value)
            .unwrap_or(0.0);
        let revenue_ttm = fundamental_analysis
            .profit_loss
            .get("revenue")
            .and_then(tse_fundamental::fiscal::latest_value)
            .unwrap_or(0.0);

        let market_cap = market.details.pointer("/last_value/value").and_then(Value::as_f64).unwrap_or(0.0);
        let shares_outstanding = if current_price != 0.0 { market_cap / current_price } else { 0.0 };
        let free_float_pct = market
            .details
            .pointer("/last_free_float/percent")
            .and_then(Value::as_f64)
            .map(|p| p * 100.0)
            .unwrap_or(0.0);
        let snapshot = tse_fundamental::MarketSnapshot {
            last_price: current_price,
            shares_outstanding,
            free_float_pct,
            pe_ttm: market.details.pointer("/eps/pe_ttm").and_then(Value::as_f64),
            pe_at_agm: market.details.pointer("/dps/pe").and_then(Value::as_f64),
            pb: market.details.pointer("/last_pb/value").and_then(Value::as_f64),
            eps_ttm: market.details.pointer("/eps/pure_ttm").and_then(Value::as_f64),
        };

        let fundamental_metrics = serde_json::json!({
            "balance_sheet": tse_fundamental::balance_sheet::process(&fundamental_analysis, net_income),
            "earnings_quality": tse_fundamental::earnings_quality::process(&fundamental_analysis),
            "valuation": tse_fundamental::valuation::process(&fundamental_analysis, &snapshot, revenue_ttm),
        });
        let mut general_snapshot = market.details.clone();
        if let Value::Object(ref mut map) = general_snapshot {
            map.insert("fundamental_metrics".to_string(), fundamental_metrics);
        }

        let document = AssetDocument {
            id: AssetDocument::document_id(&symbol, &symbol),
            provider_id: symbol.clone(),
            symbol: symbol.clone(),
            short_name: market
                .details
                .get("short_name")
                .and_then(Value::as_str)
                .unwrap_or(&symbol)
                .to_string(),
            analysis_datetime: Utc::now(),
            current_price,
            general_snapshot,
            technical_analysis: serde_json::to_value(&technicals)?,
            fundamental_analysis,
            social_post: serde_json::json!({
                "latest_sahamyab_tweet": social.tweets,
                "rapid_tweets": external.rapid_tweets,
            }),
            news_announcements: serde_json::json!({
                "news": market.codal,
                "codal": social.codal_extra,
            }),
            search: serde_json::json!({
                "tavily": external.web_search,
            }),
        };

        self.store.upsert(&document).await?;
        Ok(Some(document))
    }

    /// Like [`Self::execute`], but when the freshness gate skips the
    /// run, falls back to the already-persisted document instead of
    /// `None` — the analysis workflow needs a document to fan out over
    /// either way.
    pub async fn execute_or_fetch(&self, symbol_query: &str) -> OrchestratorResult<AssetDocument> {
        if let Some(document) = self.execute(symbol_query).await? {
            return Ok(document);
        }
        let symbol = self
            .market
            .search_symbol(symbol_query)
            .await
            .map_err(|_| OrchestratorError::SymbolNotFound(symbol_query.to_string()))?;
        let id = AssetDocument::document_id(&symbol, &symbol);
        self.store
            .get(&id)
            .await?
            .ok_or_else(|| OrchestratorError::SymbolNotFound(symbol_query.to_string()))
    }

    async fn fetch_market_data(&self, symbol: &Symbol) -> OrchestratorResult<MarketBundle> {
        let history = match self.history_cache.get(symbol) {
            Some(cached) => cached,
            None => {
                let fetched = self.market.fetch_history(symbol).await?;
                self.history_cache.insert(symbol, fetched.clone());
                fetched
            }
        };
        let details = match self.details_cache.get(symbol) {
            Some(cached) => cached,
            None => {
                let fetched = isolate("details", self.market.fetch_details(symbol)).await;
                self.details_cache.insert(symbol, fetched.clone());
                fetched
            }
        };

        let (pivots, balance_sheet, profit_loss, cash_flow, financial_ratios, codal, trade_tape) = tokio::join!(
            isolate("pivots", self.market.fetch_pivots(symbol)),
            isolate("balance_sheet", self.market.fetch_balance_sheet(symbol)),
            isolate("profit_loss", self.market.fetch_profit_loss(symbol)),
            isolate("cash_flow", self.market.fetch_cash_flow(symbol)),
            isolate("financial_ratios", self.market.fetch_financial_ratios(symbol)),
            isolate("codal_announcements", self.market.fetch_codal_announcements(symbol)),
            isolate("trade_tape", self.market.fetch_trade_tape(symbol)),
        );

        Ok(MarketBundle {
            history,
            details,
            pivots,
            balance_sheet,
            profit_loss,
            cash_flow,
            financial_ratios,
            codal,
            trade_tape,
        })
    }

    async fn fetch_social_data(&self, symbol: &Symbol) -> SocialBundle {
        let (trade_info, overall_info, tweets, codal_extra) = tokio::join!(
            isolate("sahamyab.trade_info", self.social.fetch_trade_info(symbol)),
            isolate("sahamyab.overall_info", self.social.fetch_overall_info(symbol)),
            isolate("sahamyab.tweets", self.social.fetch_tweets(symbol)),
            isolate("sahamyab.codal_extra", self.social.fetch_codal_extra(symbol)),
        );
        SocialBundle {
            trade_info,
            overall_info,
            tweets,
            codal_extra,
        }
    }

    async fn fetch_external_search(&self, symbol: &Symbol, asset_name: &str) -> ExternalSearchBundle {
        let tweet_query = symbol.to_string();
        let web_query = format!("تحلیل بنیادی و تکنیکال و بررسی نماد {symbol} یا {asset_name}");

        let rapid_tweets = isolate("search.tweets", self.search.search_tweets(&tweet_query)).await;
        let web_search = match self.search.search_web(&web_query).await {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(error = %err, "web search failed, continuing without it");
                None
            }
        };

        ExternalSearchBundle { rapid_tweets, web_search }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, NaiveDate};

    struct FakeMarket;

    #[async_trait]
    impl MarketDataProvider for FakeMarket {
        async fn search_symbol(&self, query: &str) -> tse_providers::ProviderResult<Symbol> {
            Ok(query.to_string())
        }

        async fn fetch_history(&self, _symbol: &Symbol) -> tse_providers::ProviderResult<Vec<OhlcvBar>> {
            let base = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
            Ok((0..60)
                .map(|i| OhlcvBar {
                    date: base + Duration::days(i),
                    open: 1000.0 + i as f64,
                    high: 1010.0 + i as f64,
                    low: 990.0 + i as f64,
                    close: 1000.0 + i as f64,
                    volume: 10_000.0,
                })
                .collect())
        }

        async fn fetch_details(&self, _symbol: &Symbol) -> tse_providers::ProviderResult<Value> {
            Ok(serde_json::json!({"name": "فولاد مبارکه", "short_name": "فملی"}))
        }

        async fn fetch_pivots(&self, _symbol: &Symbol) -> tse_providers::ProviderResult<Vec<f64>> {
            Ok(vec![1020.0, 980.0])
        }

        async fn fetch_balance_sheet(&self, _symbol: &Symbol) -> tse_providers::ProviderResult<Value> {
            Ok(serde_json::json!({}))
        }

        async fn fetch_profit_loss(&self, _symbol: &Symbol) -> tse_providers::ProviderResult<Value> {
            Ok(serde_json::json!({}))
        }

        async fn fetch_cash_flow(&self, _symbol: &Symbol) -> tse_providers::ProviderResult<Value> {
            Ok(serde_json::json!({}))
        }

        async fn fetch_financial_ratios(&self, _symbol: &Symbol) -> tse_providers::ProviderResult<Value> {
            Ok(serde_json::json!({}))
        }

        async fn fetch_codal_announcements(&self, _symbol: &Symbol) -> tse_providers::ProviderResult<Value> {
            Ok(serde_json::json!([]))
        }

        async fn fetch_trade_tape(&self, _symbol: &Symbol) -> tse_providers::ProviderResult<Vec<TradeTapeRow>> {
            Ok(Vec::new())
        }
    }

    struct FakeSocial;

    #[async_trait]
    impl SocialDataProvider for FakeSocial {
        async fn fetch_trade_info(&self, _symbol: &Symbol) -> tse_providers::ProviderResult<Value> {
            Ok(serde_json::json!({}))
        }
        async fn fetch_overall_info(&self, _symbol: &Symbol) -> tse_providers::ProviderResult<Value> {
            Ok(serde_json::json!({}))
        }
        async fn fetch_tweets(&self, _symbol: &Symbol) -> tse_providers::ProviderResult<Vec<Value>> {
            Ok(Vec::new())
        }
        async fn fetch_codal_extra(&self, _symbol: &Symbol) -> tse_providers::ProviderResult<Value> {
            Ok(serde_json::json!({}))
        }
    }

    struct FakeSearch;

    #[async_trait]
    impl SearchProvider for FakeSearch {
        async fn search_tweets(&self, _query: &str) -> tse_providers::ProviderResult<Vec<Value>> {
            Ok(Vec::new())
        }
        async fn search_web(&self, _query: &str) -> tse_providers::ProviderResult<Value> {
            Ok(serde_json::json!({}))
        }
    }

    async fn build_pipeline() -> StockAnalysisPipeline {
        let store = DocumentStore::connect("sqlite::memory:").await.unwrap();
        StockAnalysisPipeline::new(Arc::new(FakeMarket), Arc::new(FakeSocial), Arc::new(FakeSearch), store)
    }

    #[tokio::test]
    async fn execute_assembles_and_persists_a_document() {
        let pipeline = build_pipeline().await;
        let doc = pipeline.execute("فملی").await.unwrap().expect("first run is never fresh");
        assert_eq!(doc.symbol, "فملی");
        assert_eq!(doc.current_price, 1059.0);
        assert!(doc.technical_analysis.get("trend").is_some());
        assert!(doc.general_snapshot.pointer("/fundamental_metrics/valuation").is_some());
    }

    #[tokio::test]
    async fn second_run_same_day_is_skipped_by_the_freshness_gate() {
        let pipeline = build_pipeline().await;
        assert!(pipeline.execute("فملی").await.unwrap().is_some());
        assert!(pipeline.execute("فملی").await.unwrap().is_none());
    }
}
