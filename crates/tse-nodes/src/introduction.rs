//! The symbol-intake preamble: a small conversational subgraph that
//! runs before the analysis fan-out. The agent either recognizes a
//! ticker in the user's message and emits a `set_symbol` call, or asks
//! a clarifying question and suspends for input.
//!
//! The teacher stack has no native tool-calling surface on
//! [`LlmProvider`] (only `complete`/`complete_json`), so the tool call
//! is modeled as a structured-output field instead of a real function
//! call — the same recovery-ladder invocation every worker node uses,
//! just with a schema shaped like "either a reply or a tool call".

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tse_llm::LlmProvider;
use tse_workflow::{
    ConditionalFn, GraphState, Node, NodeOutcome, StateFragment, WorkflowError, WorkflowResult,
};

const INTRODUCTION_SYSTEM_PROMPT: &str = "You are the intake assistant for a Tehran Stock Exchange \
analysis tool. Greet the user and ask which symbol (e.g. \"فملی\", \"فولاد\") they want analyzed. \
If their message names a valid Iranian stock symbol, call set_symbol with it instead of replying in prose.";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SetSymbolCall {
    symbol: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IntroAgentTurn {
    #[serde(default)]
    reply: Option<String>,
    #[serde(default)]
    tool_call: Option<SetSymbolCall>,
}

fn intro_turn_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "reply": {"type": ["string", "null"], "description": "clarifying question or greeting, when no symbol was recognized"},
            "tool_call": {
                "type": ["object", "null"],
                "properties": {"symbol": {"type": "string"}},
                "required": ["symbol"]
            }
        }
    })
}

fn messages_from_state(state: &GraphState) -> Vec<Value> {
    state
        .get("messages")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

fn render_transcript(messages: &[Value]) -> String {
    messages
        .iter()
        .map(|m| {
            let role = m.get("role").and_then(Value::as_str).unwrap_or("user");
            let content = m.get("content").and_then(Value::as_str).unwrap_or("");
            format!("{role}: {content}")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The conversational agent turn: thinks over the transcript so far and
/// either calls `set_symbol` or drafts a clarifying reply.
pub struct IntroAgentNode {
    provider: Arc<dyn LlmProvider>,
}

impl IntroAgentNode {
    pub fn new(provider: Arc<dyn LlmProvider>) -> Arc<Self> {
        Arc::new(Self { provider })
    }
}

#[async_trait]
impl Node for IntroAgentNode {
    async fn run(&self, state: &GraphState) -> WorkflowResult<NodeOutcome> {
        let messages = messages_from_state(state);
        let transcript = if messages.is_empty() {
            "(conversation just started)".to_string()
        } else {
            render_transcript(&messages)
        };

        let (turn, _recovery) = tse_llm::invoke_structured::<IntroAgentTurn>(
            self.provider.as_ref(),
            INTRODUCTION_SYSTEM_PROMPT,
            &transcript,
            &intro_turn_schema(),
        )
        .await
        .map_err(|e| WorkflowError::NodeFailed("intro_agent_node".to_string(), e.to_string()))?;

        let mut updated = messages;
        let assistant_content = turn
            .reply
            .clone()
            .unwrap_or_else(|| "(calling set_symbol)".to_string());
        updated.push(json!({"role": "assistant", "content": assistant_content}));

        let mut fragment = StateFragment::new();
        fragment.insert("messages".to_string(), Value::Array(updated));
        fragment.insert(
            "last_turn".to_string(),
            serde_json::to_value(&turn).map_err(|e| {
                WorkflowError::NodeFailed("intro_agent_node".to_string(), e.to_string())
            })?,
        );
        Ok(NodeOutcome::Fragment(fragment))
    }
}

/// Routes to `tool_node` when the agent's last turn carried a tool
/// call, otherwise to `input_node` to wait on the user.
pub fn should_continue() -> ConditionalFn {
    Arc::new(|state: &GraphState| {
        let has_tool_call = state
            .get("last_turn")
            .and_then(|t| t.get("tool_call"))
            .is_some_and(|v| !v.is_null());
        if has_tool_call {
            vec!["tool_node".to_string()]
        } else {
            vec!["input_node".to_string()]
        }
    })
}

/// Extracts the `symbol` argument out of the pending tool call and
/// writes it into state, unblocking the data-preparation node's
/// gatekeeper.
pub struct ToolNode;

impl ToolNode {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

#[async_trait]
impl Node for ToolNode {
    async fn run(&self, state: &GraphState) -> WorkflowResult<NodeOutcome> {
        let symbol = state
            .get("last_turn")
            .and_then(|t| t.get("tool_call"))
            .and_then(|c| c.get("symbol"))
            .and_then(Value::as_str)
            .ok_or_else(|| {
                WorkflowError::NodeFailed(
                    "tool_node".to_string(),
                    "no pending tool call in state".to_string(),
                )
            })?
            .to_string();

        let mut fragment = StateFragment::new();
        fragment.insert("symbol".to_string(), json!(symbol));
        Ok(NodeOutcome::Fragment(fragment))
    }
}

/// Suspends the graph for a user turn. The first visit has no
/// `"__resume__"` in state yet and interrupts; the resumed visit reads
/// the injected value, routes `"exit"`/`"quit"` to completion via the
/// `user_exited` flag, and otherwise appends the reply and loops back
/// to the agent.
pub struct InputNode;

impl InputNode {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

#[async_trait]
impl Node for InputNode {
    async fn run(&self, state: &GraphState) -> WorkflowResult<NodeOutcome> {
        let Some(resume_value) = state.get("__resume__") else {
            return Ok(NodeOutcome::Interrupt(json!("user_input")));
        };

        let user_input = resume_value.as_str().unwrap_or("").trim().to_string();
        let mut fragment = StateFragment::new();

        if user_input.is_empty() || matches!(user_input.to_lowercase().as_str(), "exit" | "quit") {
            fragment.insert("user_exited".to_string(), json!(true));
            return Ok(NodeOutcome::Fragment(fragment));
        }

        let mut messages = messages_from_state(state);
        messages.push(json!({"role": "user", "content": user_input}));
        fragment.insert("messages".to_string(), Value::Array(messages));
        Ok(NodeOutcome::Fragment(fragment))
    }
}

/// Routes `input_node`'s outcome: to `END` when the user exited,
/// otherwise back to the agent for another turn.
pub fn after_input() -> ConditionalFn {
    Arc::new(|state: &GraphState| {
        if state.get("user_exited").and_then(Value::as_bool).unwrap_or(false) {
            vec![tse_workflow::END.to_string()]
        } else {
            vec!["intro_agent_node".to_string()]
        }
    })
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
    async fn agent_turn_with_tool_call_routes_to_tool_node() {
        let provider = Arc::new(StaticProvider {
            response: json!({"reply": null, "tool_call": {"symbol": "فملی"}}).to_string(),
        });
        let node = IntroAgentNode::new(provider);
        let mut state = GraphState::new();
        let fragment = match node.run(&state).await.unwrap() {
            NodeOutcome::Fragment(f) => f,
            _ => panic!("agent node should never interrupt"),
        };
        state.merge(fragment);
        let targets = should_continue()(&state);
        assert_eq!(targets, vec!["tool_node".to_string()]);
    }

    #[tokio::test]
    async fn agent_turn_without_tool_call_routes_to_input_node() {
        let provider = Arc::new(StaticProvider {
            response: json!({"reply": "Which symbol would you like analyzed?", "tool_call": null}).to_string(),
        });
        let node = IntroAgentNode::new(provider);
        let mut state = GraphState::new();
        let fragment = match node.run(&state).await.unwrap() {
            NodeOutcome::Fragment(f) => f,
            _ => panic!("agent node should never interrupt"),
        };
        state.merge(fragment);
        let targets = should_continue()(&state);
        assert_eq!(targets, vec!["input_node".to_string()]);
    }

    #[tokio::test]
    async fn tool_node_extracts_symbol() {
        let mut state = GraphState::new();
        state.merge(StateFragment::from_iter([(
            "last_turn".to_string(),
            json!({"reply": null, "tool_call": {"symbol": "فولاد"}}),
        )]));
        let fragment = match ToolNode::new().run(&state).await.unwrap() {
            NodeOutcome::Fragment(f) => f,
            _ => panic!("tool node should never interrupt"),
        };
        assert_eq!(fragment.get("symbol").unwrap(), "فولاد");
    }

    #[tokio::test]
    async fn input_node_interrupts_on_first_visit() {
        let state = GraphState::new();
        match InputNode::new().run(&state).await.unwrap() {
            NodeOutcome::Interrupt(value) => assert_eq!(value, json!("user_input")),
            _ => panic!("first visit should interrupt"),
        }
    }

    #[tokio::test]
    async fn input_node_exit_sets_flag_and_routes_to_end() {
        let mut state = GraphState::new();
        state.merge(StateFragment::from_iter([("__resume__".to_string(), json!("exit"))]));
        let fragment = match InputNode::new().run(&state).await.unwrap() {
            NodeOutcome::Fragment(f) => f,
            _ => panic!("resumed input node should never interrupt"),
        };
        state.merge(fragment);
        assert_eq!(after_input()(&state), vec![tse_workflow::END.to_string()]);
    }

    #[tokio::test]
    async fn input_node_reply_loops_back_to_agent() {
        let mut state = GraphState::new();
        state.merge(StateFragment::from_iter([(
            "__resume__".to_string(),
            json!("فملی please"),
        )]));
        let fragment = match InputNode::new().run(&state).await.unwrap() {
            NodeOutcome::Fragment(f) => f,
            _ => panic!("resumed input node should never interrupt"),
        };
        state.merge(fragment);
        assert_eq!(after_input()(&state), vec!["intro_agent_node".to_string()]);
    }
}
