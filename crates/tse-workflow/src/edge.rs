use std::sync::Arc;

use crate::state::GraphState;

/// Sentinel target name that terminates a branch.
pub const END: &str = "__end__";

pub type ConditionalFn = Arc<dyn Fn(&GraphState) -> Vec<String> + Send + Sync>;

/// Outgoing routing from one node. `Direct` always continues to one
/// successor; `Conditional` inspects the merged state and can fan out
/// to any number of successors at once (including zero, which is a
/// dead end for that branch).
pub enum EdgeSpec {
    Direct(String),
    Conditional(ConditionalFn),
}

impl EdgeSpec {
    pub fn resolve(&self, state: &GraphState) -> Vec<String> {
        match self {
            EdgeSpec::Direct(target) => vec![target.clone()],
            EdgeSpec::Conditional(func) => func(state),
        }
    }
}
