use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Textual ticker. Unicode, no ASCII constraint (Persian symbols such
/// as "فملی" are first-class). Identity key for cache and pipeline.
pub type Symbol = String;

/// A single daily price/volume bar. Sequences are normalized so the
/// newest bar is last.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Minimum bar count required before the analytics kernel will run.
pub const MIN_BARS_FOR_ANALYSIS: usize = 50;

/// A daily person/company flow record from the trade-tape detail feed.
/// Sequences are ordered newest-first, matching the provider's native
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeTapeRow {
    pub date_time: DateTime<Utc>,
    pub person_buy_volume: f64,
    pub person_buyer_count: f64,
    pub person_sell_volume: f64,
    pub person_seller_count: f64,
    pub person_owner_change: f64,
    pub company_owner_change: f64,
}

/// One indicator block shared by most analytics kernel outputs:
/// `{value, slope, slope_horizon_bars, trend_quality_r2, regime}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlopeMetric {
    pub value: f64,
    pub slope: f64,
    pub slope_horizon_bars: u32,
    pub trend_quality_r2: f64,
}

/// `R² > 0.8` => very_strong, `> 0.5` => strong, `> 0.2` => moderate, else weak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendQualityStrength {
    VeryStrong,
    Strong,
    Moderate,
    Weak,
}

impl TrendQualityStrength {
    pub fn from_r2(r2: f64) -> Self {
        if r2 > 0.8 {
            Self::VeryStrong
        } else if r2 > 0.5 {
            Self::Strong
        } else if r2 > 0.2 {
            Self::Moderate
        } else {
            Self::Weak
        }
    }
}

/// Five-way directional signal shared by the Technical and Fundamental
/// branch consensus reports (`SignalBias` / `InvestmentBias` in the
/// original schema — unified here since both are the identical
/// vocabulary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FiveWaySignal {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

/// Three-way bias used by the Social/News branch consensus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreeWayBias {
    Bullish,
    Neutral,
    Bearish,
}

/// A single alert describing disagreement between two sibling worker
/// reports within a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictAlert {
    pub between: [String; 2],
    pub description: String,
}

/// A forward-looking scenario attached to a branch consensus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeScenario {
    #[serde(rename = "type")]
    pub scenario_type: String,
    pub probability: f64,
    pub description: String,
    pub invalidation_condition: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ZoneType {
    Support,
    Resistance,
}

/// A clustered support or resistance level. Invariant: `min(price_range)
/// <= avg_price <= max(price_range)` and `strength_score in [0,1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrZone {
    #[serde(rename = "type")]
    pub zone_type: ZoneType,
    pub price_range: [f64; 2],
    pub avg_price: f64,
    pub strength_score: f64,
    pub contributors: Vec<String>,
}

impl SrZone {
    pub fn is_well_formed(&self) -> bool {
        let [lo, hi] = self.price_range;
        lo <= self.avg_price
            && self.avg_price <= hi
            && (0.0..=1.0).contains(&self.strength_score)
    }
}

/// `recovery_meta` from the structured-LLM invoker: which rung of the
/// recovery ladder produced the value. `None` means first-try success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryRung {
    FixPrompt,
    JsonOnlyFallback,
}

pub type RecoveryMeta = Option<RecoveryRung>;

/// Mapping of fiscal-period-label to numeric value, e.g. a single
/// financial-statement line item across quarters.
pub type FiscalSeries = BTreeMap<String, f64>;

/// Mapping of report-line-label to its per-period series, e.g. the
/// full balance sheet.
pub type StatementBlock = BTreeMap<String, FiscalSeries>;

/// The fundamental-statement slice of an `AssetDocument`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundamentalAnalysis {
    pub balance_sheet: StatementBlock,
    pub profit_loss: StatementBlock,
    pub cash_flow: StatementBlock,
    pub financial_ratios: StatementBlock,
}

/// Persistent document assembled by the data orchestrator, keyed by
/// `_id = "{trade_symbol}_{provider_id}"`.
///
/// Invariant: `analysis_datetime` monotonically advances per key;
/// refreshes overwrite rather than append. Created by the orchestrator,
/// read by every downstream stage, never mutated mid-analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub provider_id: String,
    pub symbol: String,
    pub short_name: String,
    pub analysis_datetime: DateTime<Utc>,
    pub current_price: f64,
    pub general_snapshot: serde_json::Value,
    pub technical_analysis: serde_json::Value,
    pub fundamental_analysis: FundamentalAnalysis,
    pub social_post: serde_json::Value,
    pub news_announcements: serde_json::Value,
    pub search: serde_json::Value,
}

impl AssetDocument {
    pub fn document_id(trade_symbol: &str, provider_id: &str) -> String {
        format!("{trade_symbol}_{provider_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sr_zone_well_formed_rejects_out_of_range_avg() {
        let zone = SrZone {
            zone_type: ZoneType::Support,
            price_range: [100.0, 110.0],
            avg_price: 120.0,
            strength_score: 0.5,
            contributors: vec!["ema_50".into()],
        };
        assert!(!zone.is_well_formed());
    }

    #[test]
    fn sr_zone_well_formed_accepts_valid_zone() {
        let zone = SrZone {
            zone_type: ZoneType::Resistance,
            price_range: [100.0, 105.0],
            avg_price: 102.0,
            strength_score: 0.75,
            contributors: vec!["vwap20".into(), "swing_fractal".into(), "vpvr_poc".into()],
        };
        assert!(zone.is_well_formed());
    }

    #[test]
    fn trend_quality_strength_thresholds() {
        assert_eq!(TrendQualityStrength::from_r2(0.95), TrendQualityStrength::VeryStrong);
        assert_eq!(TrendQualityStrength::from_r2(0.6), TrendQualityStrength::Strong);
        assert_eq!(TrendQualityStrength::from_r2(0.25), TrendQualityStrength::Moderate);
        assert_eq!(TrendQualityStrength::from_r2(0.1), TrendQualityStrength::Weak);
    }

    #[test]
    fn document_id_matches_symbol_provider_format() {
        assert_eq!(AssetDocument::document_id("فملی", "123"), "فملی_123");
    }
}
