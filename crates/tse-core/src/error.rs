use thiserror::Error;

/// Domain-wide error type shared by the analytics kernel, the document
/// store and anything that rejects a request before it reaches a
/// provider or an LLM call.
#[derive(Debug, Error)]
pub enum TseError {
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("calculation error: {0}")]
    CalculationError(String),

    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("store error: {0}")]
    StoreError(String),

    #[error("{0}")]
    Other(String),
}

pub type TseResult<T> = Result<T, TseError>;
