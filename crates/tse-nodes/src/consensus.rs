//! Consensus nodes: one per branch. Each is a gatekeeper over its
//! sibling worker report keys — it waits until every worker in its
//! branch has landed, then synthesizes a single structured verdict
//! from all of them in one LLM call.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tse_llm::LlmProvider;
use tse_workflow::{GraphState, Node, NodeOutcome, StateFragment, WorkflowError, WorkflowResult};

use crate::schema;

pub struct ConsensusNode<T> {
    name: &'static str,
    report_key: &'static str,
    input_keys: &'static [&'static str],
    system_prompt: &'static str,
    schema: Value,
    provider: Arc<dyn LlmProvider>,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T> ConsensusNode<T> {
    pub fn new(
        name: &'static str,
        report_key: &'static str,
        input_keys: &'static [&'static str],
        system_prompt: &'static str,
        schema: Value,
        provider: Arc<dyn LlmProvider>,
    ) -> Arc<Self> {
        Arc::new(Self {
            name,
            report_key,
            input_keys,
            system_prompt,
            schema,
            provider,
            _marker: std::marker::PhantomData,
        })
    }
}

#[async_trait]
impl<T> Node for ConsensusNode<T>
where
    T: DeserializeOwned + Serialize + Send + Sync + 'static,
{
    async fn run(&self, state: &GraphState) -> WorkflowResult<NodeOutcome> {
        if !state.has_all(self.input_keys) {
            return Ok(NodeOutcome::Fragment(StateFragment::new()));
        }

        let mut bundle = serde_json::Map::new();
        for key in self.input_keys {
            if let Some(value) = state.get(key) {
                bundle.insert((*key).to_string(), value.clone());
            }
        }
        let user_prompt = format!(
            "Sibling worker reports (JSON):\n{}\n\nSynthesize a single consensus verdict as a JSON object matching the required schema. No prose outside the JSON.",
            serde_json::to_string_pretty(&Value::Object(bundle)).unwrap_or_else(|_| "{}".to_string())
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

const TECHNICAL_CONSENSUS_PROMPT: &str =
    "You are the lead technical analyst for the Tehran Stock Exchange. Synthesize the trend, oscillator, volatility, volume, support/resistance and smart-money worker reports into one directional bias, flag any conflicts between them, and propose a trade scenario.";
const FUNDAMENTAL_CONSENSUS_PROMPT: &str =
    "You are the lead fundamental analyst. Synthesize the balance-sheet, earnings-quality, valuation and Codal worker reports into one overall fundamental verdict.";
const SOCIAL_NEWS_CONSENSUS_PROMPT: &str =
    "You are the lead social/news analyst. Synthesize the Twitter, Sahamyab and corporate-news worker reports into one fused narrative bias and retail-sentiment read.";

pub fn technical_consensus(provider: Arc<dyn LlmProvider>) -> Arc<dyn Node> {
    ConsensusNode::<schema::TechnicalConsensusOutput>::new(
        "technical_consensus",
        "technical_consensus_report",
        &[
            "trend_report",
            "oscillator_report",
            "volatility_report",
            "volume_report",
            "support_resistance_report",
            "smart_money_report",
        ],
        TECHNICAL_CONSENSUS_PROMPT,
        schema::technical_consensus_schema(),
        provider,
    )
}

pub fn fundamental_consensus(provider: Arc<dyn LlmProvider>) -> Arc<dyn Node> {
    ConsensusNode::<schema::FundamentalAnalysisOutput>::new(
        "fundamental_consensus",
        "fundamental_consensus_report",
        &[
            "balance_sheet_report",
            "earnings_quality_report",
            "valuation_report",
            "codal_report",
        ],
        FUNDAMENTAL_CONSENSUS_PROMPT,
        schema::fundamental_consensus_schema(),
        provider,
    )
}

pub fn social_news_consensus(provider: Arc<dyn LlmProvider>) -> Arc<dyn Node> {
    ConsensusNode::<schema::NewsSocialFusionOutput>::new(
        "social_news_consensus",
        "social_news_consensus_report",
        &["twitter_report", "sahamyab_report", "news_report"],
        SOCIAL_NEWS_CONSENSUS_PROMPT,
        schema::news_social_fusion_schema(),
        provider,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
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
    async fn gatekeeper_waits_for_all_six_technical_reports() {
        let provider = Arc::new(StaticProvider {
            response: "{}".into(),
            calls: AtomicUsize::new(0),
        });
        let node = technical_consensus(provider);
        let mut state = GraphState::new();
        state.merge(StateFragment::from_iter([(
            "trend_report".to_string(),
            serde_json::json!({}),
        )]));
        match node.run(&state).await.unwrap() {
            NodeOutcome::Fragment(frag) => assert!(frag.is_empty()),
            _ => panic!("consensus node should never interrupt"),
        }
    }

    #[tokio::test]
    async fn consensus_runs_once_all_siblings_present() {
        let response = serde_json::json!({
            "signal_bias": "buy",
            "confidence": 0.7,
            "executive_summary": "trend and volume align bullish, oscillators not yet overbought"
        })
        .to_string();
        let provider = Arc::new(StaticProvider {
            response,
            calls: AtomicUsize::new(0),
        });
        let node = technical_consensus(provider);
        let mut state = GraphState::new();
        for key in [
            "trend_report",
            "oscillator_report",
            "volatility_report",
            "volume_report",
            "support_resistance_report",
            "smart_money_report",
        ] {
            state.merge(StateFragment::from_iter([(key.to_string(), serde_json::json!({}))]));
        }
        match node.run(&state).await.unwrap() {
            NodeOutcome::Fragment(frag) => assert!(frag.contains_key("technical_consensus_report")),
            _ => panic!("consensus node should never interrupt"),
        }
    }
}
