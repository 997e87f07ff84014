//! The thirteen worker nodes: each reads its slice of the prepared
//! document, invokes the structured-LLM recovery ladder with its own
//! report schema, and writes `{report_key: report}` (plus
//! `{report_key}_meta` when a recovery rung fired). A missing required
//! input is the gatekeeper idiom: return an empty fragment rather than
//! erroring, since the data-preparation node may not have landed yet.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tse_llm::LlmProvider;
use tse_workflow::{GraphState, Node, NodeOutcome, StateFragment, WorkflowError, WorkflowResult};

use crate::schema;

/// Reads `pointer` (a JSON Pointer, e.g. `"/technical_analysis/trend"`)
/// out of the merged state, falling back to `Value::Null` if any
/// segment is absent.
fn read_pointer(state: &GraphState, pointer: &str) -> Value {
    let root = serde_json::Value::Object(state.as_map().clone());
    root.pointer(pointer).cloned().unwrap_or(Value::Null)
}

pub struct StructuredWorkerNode<T> {
    name: &'static str,
    report_key: &'static str,
    required_keys: &'static [&'static str],
    input_pointer: &'static str,
    system_prompt: &'static str,
    schema: Value,
    provider: Arc<dyn LlmProvider>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> StructuredWorkerNode<T> {
    pub fn new(
        name: &'static str,
        report_key: &'static str,
        required_keys: &'static [&'static str],
        input_pointer: &'static str,
        system_prompt: &'static str,
        schema: Value,
        provider: Arc<dyn LlmProvider>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            report_key,
            required_keys,
            input_pointer,
            system_prompt,
            schema,
            provider,
            _marker: std::marker::PhantomData,
        })
    }
}

#[async_trait]
impl<T> Node for StructuredWorkerNode<T>
where
    T: DeserializeOwned + Serialize + Send + Sync + 'static,
{
    async fn run(&self, state: &GraphState) -> WorkflowResult<NodeOutcome> {
        if !state.has_all(self.required_keys) {
            return Ok(NodeOutcome::Fragment(StateFragment::new()));
        }

        let input = read_pointer(state, self.input_pointer);
        let user_prompt = format!(
            "Input data (JSON):\n{}\n\nRespond with a single JSON object matching the required schema. No prose outside the JSON.",
            serde_json::to_string_pretty(&input).unwrap_or_else(|_| "null".to_string())
        );

        let (report, recovery) = tse_llm::invoke_structured::<T>(
            self.provider.as_ref(),
            self.system_prompt,
            &user_prompt,
            &self.schema,
        )
        .await
        .map_err(|e| WorkflowError::NodeFailed(self.name.to_string(), e.to_string()))?;

        let mut fragment = StateFragment::new();
        fragment.insert(self.report_key.to_string(), serde_json::to_value(report).map_err(|e| {
            WorkflowError::NodeFailed(self.name.to_string(), format!("report serialization failed: {e}"))
        })?);
        if let Some(rung) = recovery {
            fragment.insert(
                format!("{}_meta", self.report_key),
                serde_json::json!({"recovery_rung": rung}),
            );
        }
        Ok(NodeOutcome::Fragment(fragment))
    }
}

const CODAL_SELECTION_SYSTEM_PROMPT: &str =
    "You triage Codal regulatory filings for an Iranian stock. From the filings listed (each with an id, \
date and title, drawn from the last 60 days), select up to 20 ids that are material to a fundamental \
analysis — material contracts, earnings forecasts, board decisions, capital changes. Skip routine or \
duplicate filings.";
const CODAL_ANALYSIS_SYSTEM_PROMPT: &str =
    "You are a disclosures analyst. Summarize the selected Codal filings and extract their key findings \
for a fundamental research memo.";

/// The Codal worker runs two structured-LLM calls instead of one: a
/// selection pass that picks which of the last-60-days filings are
/// worth reading (capped at 20, per the worker roster's defaults, not
/// a hard contract — the selection may legitimately return fewer), then
/// an analysis pass over just the selected filings.
pub struct CodalWorkerNode {
    provider: Arc<dyn LlmProvider>,
}

impl CodalWorkerNode {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Arc<Self> {
        Arc::new(Self { provider })
    }
}

const CODAL_WINDOW_DAYS: i64 = 60;
const CODAL_MAX_SELECTED: usize = 20;

fn filing_id(filing: &Value) -> Option<String> {
    filing
        .get("id")
        .or_else(|| filing.get("tracing_no"))
        .and_then(|v| v.as_str().map(str::to_string).or_else(|| v.as_i64().map(|n| n.to_string())))
}

fn filing_within_window(filing: &Value, today: chrono::NaiveDate) -> bool {
    let Some(date_str) = filing.get("date").and_then(Value::as_str) else {
        return true;
    };
    match crate::persian_date::parse_persian_datetime(date_str) {
        Some(dt) => (today - dt.date_naive()).num_days() <= CODAL_WINDOW_DAYS,
        None => true,
    }
}

#[async_trait]
impl Node for CodalWorkerNode {
    async fn run(&self, state: &GraphState) -> WorkflowResult<NodeOutcome> {
        if !state.has_all(&["news_announcements"]) {
            return Ok(NodeOutcome::Fragment(StateFragment::new()));
        }

        let filings = read_pointer(state, "/news_announcements/news");
        let filings: Vec<Value> = filings.as_array().cloned().unwrap_or_default();
        let today = chrono::Utc::now().date_naive();
        let recent: Vec<Value> = filings
            .into_iter()
            .filter(|f| filing_within_window(f, today))
            .collect();

        if recent.is_empty() {
            let mut fragment = StateFragment::new();
            fragment.insert(
                "codal_report".to_string(),
                serde_json::json!({"key_findings": [], "summary": "No Codal filings in the last 60 days."}),
            );
            return Ok(NodeOutcome::Fragment(fragment));
        }

        let selection_prompt = format!(
            "Filings (JSON array):\n{}",
            serde_json::to_string_pretty(&recent).unwrap_or_else(|_| "[]".to_string())
        );
        let (selection, _recovery) = tse_llm::invoke_structured::<schema::CodalReportSelection>(
            self.provider.as_ref(),
            CODAL_SELECTION_SYSTEM_PROMPT,
            &selection_prompt,
            &schema::codal_selection_schema(),
        )
        .await
        .map_err(|e| WorkflowError::NodeFailed("codal_worker".to_string(), e.to_string()))?;

        let selected_ids: std::collections::HashSet<String> =
            selection.selected_ids.into_iter().take(CODAL_MAX_SELECTED).collect();
        let mut selected: Vec<Value> = recent
            .iter()
            .filter(|f| filing_id(f).is_some_and(|id| selected_ids.contains(&id)))
            .cloned()
            .collect();
        if selected.is_empty() {
            selected = recent.into_iter().take(CODAL_MAX_SELECTED).collect();
        }

        let analysis_prompt = format!(
            "Selected filings (JSON array):\n{}",
            serde_json::to_string_pretty(&selected).unwrap_or_else(|_| "[]".to_string())
        );
        let (report, recovery) = tse_llm::invoke_structured::<schema::CodalAnalysisOutput>(
            self.provider.as_ref(),
            CODAL_ANALYSIS_SYSTEM_PROMPT,
            &analysis_prompt,
            &schema::codal_analysis_schema(),
        )
        .await
        .map_err(|e| WorkflowError::NodeFailed("codal_worker".to_string(), e.to_string()))?;

        let mut fragment = StateFragment::new();
        fragment.insert(
            "codal_report".to_string(),
            serde_json::to_value(report).map_err(|e| {
                WorkflowError::NodeFailed("codal_worker".to_string(), format!("report serialization failed: {e}"))
            })?,
        );
        if let Some(rung) = recovery {
            fragment.insert("codal_report_meta".to_string(), serde_json::json!({"recovery_rung": rung}));
        }
        Ok(NodeOutcome::Fragment(fragment))
    }
}

pub fn codal_worker(provider: Arc<dyn LlmProvider>) -> Arc<dyn Node> {
    CodalWorkerNode::new(provider)
}

const TREND_SYSTEM_PROMPT: &str =
    "You are a trend-following technical analyst for the Tehran Stock Exchange. Classify the trend's direction, strength and phase from the provided EMA/ADX/Ichimoku/market-geometry data.";
const OSCILLATOR_SYSTEM_PROMPT: &str =
    "You are a momentum-oscillator analyst. Classify the market regime from RSI, ADX and MACD histogram data.";
const VOLATILITY_SYSTEM_PROMPT: &str =
    "You are a volatility analyst. Classify the current volatility regime from Bollinger/Keltner band and realized-volatility data.";
const VOLUME_SYSTEM_PROMPT: &str =
    "You are a volume-flow analyst. Classify participation, directional flow and the institutional VWAP reference from the provided volume data.";
const SR_SYSTEM_PROMPT: &str =
    "You are a support/resistance analyst. Assess the nearest support and resistance zones and their confluence.";
const SMART_MONEY_SYSTEM_PROMPT: &str =
    "You are a smart-money flow analyst. Classify the dominant per-capita buy/sell flow status from the provided daily rows.";
const BALANCE_SHEET_SYSTEM_PROMPT: &str =
    "You are a balance-sheet analyst. Classify the company's financial stability from the provided liquidity/solvency ratios.";
const EARNINGS_QUALITY_SYSTEM_PROMPT: &str =
    "You are an earnings-quality analyst. Classify the quality of reported earnings from the provided margin and cash-flow-conversion data.";
const VALUATION_SYSTEM_PROMPT: &str =
    "You are a valuation analyst. Classify the stock's valuation from the provided multiples and market-structure data.";
const TWITTER_SYSTEM_PROMPT: &str =
    "You are a social-sentiment analyst reading Persian-language tweets about an Iranian stock. Produce a sentiment distribution and dominant bias.";
const SAHAMYAB_SYSTEM_PROMPT: &str =
    "You are a retail-sentiment analyst reading Sahamyab forum/trade-info data for an Iranian stock. Gauge panic level and retail sentiment.";
const NEWS_SYSTEM_PROMPT: &str =
    "You are a corporate-news analyst. Summarize recent news and Codal filings and score their sentiment impact.";

pub fn trend_worker(provider: Arc<dyn LlmProvider>) -> Arc<dyn Node> {
    StructuredWorkerNode::<schema::TrendAgentOutput>::new(
        "trend_worker",
        "trend_report",
        &["technical_analysis"],
        "/technical_analysis/trend",
        TREND_SYSTEM_PROMPT,
        schema::trend_schema(),
        provider,
    )
}

pub fn oscillator_worker(provider: Arc<dyn LlmProvider>) -> Arc<dyn Node> {
    StructuredWorkerNode::<schema::OscillatorAgentOutput>::new(
        "oscillator_worker",
        "oscillator_report",
        &["technical_analysis"],
        "/technical_analysis/oscillators",
        OSCILLATOR_SYSTEM_PROMPT,
        schema::oscillator_schema(),
        provider,
    )
}

pub fn volatility_worker(provider: Arc<dyn LlmProvider>) -> Arc<dyn Node> {
    StructuredWorkerNode::<schema::VolatilityAgentOutput>::new(
        "volatility_worker",
        "volatility_report",
        &["technical_analysis"],
        "/technical_analysis/volatility",
        VOLATILITY_SYSTEM_PROMPT,
        schema::volatility_schema(),
        provider,
    )
}

pub fn volume_worker(provider: Arc<dyn LlmProvider>) -> Arc<dyn Node> {
    StructuredWorkerNode::<schema::VolumeAgentOutput>::new(
        "volume_worker",
        "volume_report",
        &["technical_analysis"],
        "/technical_analysis/volume",
        VOLUME_SYSTEM_PROMPT,
        schema::volume_schema(),
        provider,
    )
}

pub fn support_resistance_worker(provider: Arc<dyn LlmProvider>) -> Arc<dyn Node> {
    StructuredWorkerNode::<schema::SupportResistanceAgentOutput>::new(
        "support_resistance_worker",
        "support_resistance_report",
        &["technical_analysis"],
        "/technical_analysis/support_resistance",
        SR_SYSTEM_PROMPT,
        schema::support_resistance_schema(),
        provider,
    )
}

pub fn smart_money_worker(provider: Arc<dyn LlmProvider>) -> Arc<dyn Node> {
    StructuredWorkerNode::<schema::SmartMoneyAgentOutput>::new(
        "smart_money_worker",
        "smart_money_report",
        &["technical_analysis"],
        "/technical_analysis/smart_money",
        SMART_MONEY_SYSTEM_PROMPT,
        schema::smart_money_schema(),
        provider,
    )
}

pub fn balance_sheet_worker(provider: Arc<dyn LlmProvider>) -> Arc<dyn Node> {
    StructuredWorkerNode::<schema::BalanceSheetOutput>::new(
        "balance_sheet_worker",
        "balance_sheet_report",
        &["general_snapshot"],
        "/general_snapshot/fundamental_metrics/balance_sheet",
        BALANCE_SHEET_SYSTEM_PROMPT,
        schema::balance_sheet_schema(),
        provider,
    )
}

pub fn earnings_quality_worker(provider: Arc<dyn LlmProvider>) -> Arc<dyn Node> {
    StructuredWorkerNode::<schema::EarningsQualityOutput>::new(
        "earnings_quality_worker",
        "earnings_quality_report",
        &["general_snapshot"],
        "/general_snapshot/fundamental_metrics/earnings_quality",
        EARNINGS_QUALITY_SYSTEM_PROMPT,
        schema::earnings_quality_schema(),
        provider,
    )
}

pub fn valuation_worker(provider: Arc<dyn LlmProvider>) -> Arc<dyn Node> {
    StructuredWorkerNode::<schema::ValuationOutput>::new(
        "valuation_worker",
        "valuation_report",
        &["general_snapshot"],
        "/general_snapshot/fundamental_metrics/valuation",
        VALUATION_SYSTEM_PROMPT,
        schema::valuation_schema(),
        provider,
    )
}

pub fn twitter_worker(provider: Arc<dyn LlmProvider>) -> Arc<dyn Node> {
    StructuredWorkerNode::<schema::SocialSentimentOutput>::new(
        "twitter_worker",
        "twitter_report",
        &["social_post"],
        "/social_post/rapid_tweets",
        TWITTER_SYSTEM_PROMPT,
        schema::social_sentiment_schema(),
        provider,
    )
}

pub fn sahamyab_worker(provider: Arc<dyn LlmProvider>) -> Arc<dyn Node> {
    StructuredWorkerNode::<schema::RetailPulseAnalysis>::new(
        "sahamyab_worker",
        "sahamyab_report",
        &["social_post"],
        "/social_post/latest_sahamyab_tweet",
        SAHAMYAB_SYSTEM_PROMPT,
        schema::retail_pulse_schema(),
        provider,
    )
}

pub fn news_worker(provider: Arc<dyn LlmProvider>) -> Arc<dyn Node> {
    StructuredWorkerNode::<schema::FundamentalNewsAnalysis>::new(
        "news_worker",
        "news_report",
        &["news_announcements"],
        "/news_announcements",
        NEWS_SYSTEM_PROMPT,
        schema::fundamental_news_schema(),
        provider,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tse_llm::LlmResult;

    struct StaticProvider {
        response: String,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LlmProvider for StaticProvider {
        async fn complete(&self, _system: &str, _user: &str) -> LlmResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
        async fn complete_json(&self, _system: &str, _user: &str, _schema: &Value) -> LlmResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.response.clone())
        }
        fn backend_name(&self) -> &'static str {
            "static"
        }
    }

    #[tokio::test]
    async fn gatekeeper_skips_when_technical_analysis_is_absent() {
        let provider = Arc::new(StaticProvider {
            response: "{}".into(),
            calls: AtomicUsize::new(0),
        });
        let node = trend_worker(provider);
        let state = GraphState::new();
        match node.run(&state).await.unwrap() {
            NodeOutcome::Fragment(frag) => assert!(frag.is_empty()),
            _ => panic!("worker should never interrupt"),
        }
    }

    #[tokio::test]
    async fn worker_writes_report_key_on_success() {
        let response = serde_json::json!({
            "trend_summary": {"direction": "bullish", "strength": "strong", "phase": "developing", "confidence": "high"}
        })
        .to_string();
        let provider = Arc::new(StaticProvider {
            response,
            calls: AtomicUsize::new(0),
        });
        let node = trend_worker(provider);
        let mut state = GraphState::new();
        state.merge(StateFragment::from_iter([(
            "technical_analysis".to_string(),
            serde_json::json!({"trend": {"ema_10": {}}}),
        )]));
        match node.run(&state).await.unwrap() {
            NodeOutcome::Fragment(frag) => assert!(frag.contains_key("trend_report")),
            _ => panic!("worker should never interrupt"),
        }
    }
}
