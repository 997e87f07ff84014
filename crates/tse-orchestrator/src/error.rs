use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("symbol '{0}' could not be resolved against any provider")]
    SymbolNotFound(String),
    #[error("insufficient price history to run technical analysis ({0} bars)")]
    InsufficientHistory(usize),
    #[error("provider error: {0}")]
    Provider(#[from] tse_providers::ProviderError),
    #[error("analytics error: {0}")]
    Analytics(#[from] tse_core::TseError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;
