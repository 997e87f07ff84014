use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("other error: {0}")]
    Other(String),
}

pub type ProviderResult<T> = Result<T, ProviderError>;
