pub mod cache;
pub mod error;
pub mod pipeline;

pub use error::{OrchestratorError, OrchestratorResult};
pub use pipeline::{ExternalSearchBundle, MarketBundle, SocialBundle, StockAnalysisPipeline};
