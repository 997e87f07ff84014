pub mod checkpoint;
pub mod edge;
pub mod error;
pub mod graph;
pub mod node;
pub mod state;

pub use checkpoint::{Checkpoint, Checkpointer, InMemoryCheckpointer};
pub use edge::{ConditionalFn, EdgeSpec, END};
pub use error::{WorkflowError, WorkflowResult};
pub use graph::{CompiledGraph, GraphBuilder, RunOutcome, StepEvent};
pub use node::{FnNode, Node, NodeOutcome};
pub use state::{GraphState, StateFragment};
