use async_trait::async_trait;
use serde_json::Value;

use crate::state::{GraphState, StateFragment};
use crate::WorkflowResult;

/// What a node produced this step.
pub enum NodeOutcome {
    /// A (possibly empty) partial write to merge into the shared state.
    /// An empty fragment is the gatekeeper idiom for "not ready yet".
    Fragment(StateFragment),
    /// Suspend the graph here. `payload` is surfaced to the caller of
    /// `astream`/`ainvoke`; resuming re-invokes this same node with the
    /// resume value available via [`GraphState::get`] under the
    /// `"__resume__"` key.
    Interrupt(Value),
}

#[async_trait]
pub trait Node: Send + Sync {
    async fn run(&self, state: &GraphState) -> WorkflowResult<NodeOutcome>;
}

/// Adapts a plain async closure into a [`Node`], for workers that never
/// interrupt — the common case.
pub struct FnNode<F> {
    func: F,
}

impl<F> FnNode<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F, Fut> Node for FnNode<F>
where
    F: Fn(GraphState) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = WorkflowResult<StateFragment>> + Send,
{
    async fn run(&self, state: &GraphState) -> WorkflowResult<NodeOutcome> {
        let fragment = (self.func)(state.clone()).await?;
        Ok(NodeOutcome::Fragment(fragment))
    }
}
