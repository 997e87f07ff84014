use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error("node '{0}' is not registered in this graph")]
    UnknownNode(String),

    #[error("node '{0}' failed: {1}")]
    NodeFailed(String, String),

    #[error("no checkpoint found for thread '{0}'")]
    NoCheckpoint(String),

    #[error("thread '{0}' is not currently interrupted")]
    NotInterrupted(String),

    #[error("graph exceeded the maximum of {0} supersteps without reaching END")]
    StepLimitExceeded(usize),

    #[error("other error: {0}")]
    Other(String),
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;
