use thiserror::Error;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("provider returned an error: {0}")]
    ProviderError(String),

    #[error("response did not match the requested schema: {0}")]
    SchemaMismatch(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("other error: {0}")]
    Other(String),
}

pub type LlmResult<T> = Result<T, LlmError>;
