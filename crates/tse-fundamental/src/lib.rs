pub mod balance_sheet;
pub mod earnings_quality;
pub mod fiscal;
pub mod valuation;

pub use balance_sheet::BalanceSheetMetrics;
pub use earnings_quality::EarningsQualityMetrics;
pub use valuation::{MarketSnapshot, ValuationMetrics};
