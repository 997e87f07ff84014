pub mod error;
pub mod market;
pub mod retry;
pub mod search;
pub mod social;
pub mod store;

pub use error::{ProviderError, ProviderResult};
pub use market::{HttpMarketDataProvider, MarketDataProvider};
pub use search::{HttpSearchProvider, SearchProvider};
pub use social::{HttpSocialDataProvider, SocialDataProvider};
pub use store::{should_run, today_utc, DocumentStore};
