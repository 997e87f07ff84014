//! The final node: waits on all three branch consensuses and asks the
//! LLM (plain completion, not structured) to weave them into a single
//! markdown memo.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tse_llm::LlmProvider;
use tse_workflow::{GraphState, Node, NodeOutcome, StateFragment, WorkflowError, WorkflowResult};

const REQUIRED_KEYS: &[&str] = &[
    "technical_consensus_report",
    "fundamental_consensus_report",
    "social_news_consensus_report",
];

const REPORTER_SYSTEM_PROMPT: &str = "You are a senior equity analyst for the Tehran Stock Exchange. \
Combine the technical, fundamental and social/news consensus reports below into one coherent markdown \
memo for a portfolio manager: a one-paragraph executive summary, then a section per branch, then a \
final recommendation. Write in clear, direct prose. Do not invent numbers not present in the inputs.";

pub struct ReporterNode {
    provider: Arc<dyn LlmProvider>,
}

impl ReporterNode {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Arc<Self> {
        Arc::new(Self { provider })
    }
}

#[async_trait]
impl Node for ReporterNode {
    async fn run(&self, state: &GraphState) -> WorkflowResult<NodeOutcome> {
        if !state.has_all(REQUIRED_KEYS) {
            return Ok(NodeOutcome::Fragment(StateFragment::new()));
        }

        let mut bundle = serde_json::Map::new();
        for key in REQUIRED_KEYS {
            if let Some(value) = state.get(key) {
                bundle.insert((*key).to_string(), value.clone());
            }
        }
        let symbol = state.get("symbol").and_then(Value::as_str).unwrap_or("the symbol");
        let user_prompt = format!(
            "Symbol: {symbol}\n\nConsensus reports (JSON):\n{}",
            serde_json::to_string_pretty(&Value::Object(bundle)).unwrap_or_else(|_| "{}".to_string())
        );

        let memo = self
            .provider
            .complete(REPORTER_SYSTEM_PROMPT, &user_prompt)
            .await
            .map_err(|e| WorkflowError::NodeFailed("reporter_node".to_string(), e.to_string()))?;

        let mut fragment = StateFragment::new();
        fragment.insert("final_report".to_string(), Value::String(memo));
        Ok(NodeOutcome::Fragment(fragment))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tse_llm::LlmResult;

    struct StaticProvider {
        response: String,
    }

    #[async_trait]
    impl LlmProvider for StaticProvider {
        async fn complete(&self, _system: &str, _user: &str) -> LlmResult<String> {
            Ok(self.response.clone())
        }
        async fn complete_json(&self, _system: &str, _user: &str, _schema: &Value) -> LlmResult<String> {
            Ok(self.response.clone())
        }
        fn backend_name(&self) -> &'static str {
            "static"
        }
    }

    #[tokio::test]
    async fn gatekeeper_waits_for_all_three_consensus_reports() {
        let provider = Arc::new(StaticProvider { response: "memo".into() });
        let node = ReporterNode::new(provider);
        let mut state = GraphState::new();
        state.merge(StateFragment::from_iter([(
            "technical_consensus_report".to_string(),
            serde_json::json!({}),
        )]));
        match node.run(&state).await.unwrap() {
            NodeOutcome::Fragment(f) => assert!(f.is_empty()),
            _ => panic!("reporter should never interrupt"),
        }
    }

    #[tokio::test]
    async fn reporter_writes_final_report_once_all_three_present() {
        let provider = Arc::new(StaticProvider {
            response: "# Memo\n\nbullish overall".into(),
        });
        let node = ReporterNode::new(provider);
        let mut state = GraphState::new();
        for key in REQUIRED_KEYS {
            state.merge(StateFragment::from_iter([(
                (*key).to_string(),
                serde_json::json!({}),
            )]));
        }
        match node.run(&state).await.unwrap() {
            NodeOutcome::Fragment(f) => {
                assert_eq!(f.get("final_report").unwrap().as_str().unwrap(), "# Memo\n\nbullish overall");
            }
            _ => panic!("reporter should never interrupt"),
        }
    }
}
