//! Structured report shapes produced by the agent nodes, and the JSON
//! Schema literals handed to the structured-LLM invoker alongside each
//! one. Mirrors `src/core/schema.py` and `src/schema/{fundamental,
//! social_news}.py`'s pydantic model layout, translated field-for-field
//! into plain serde types plus a hand-written schema object (no runtime
//! reflection crate in this stack).

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// ---------------------------------------------------------------- Trend

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSummary {
    pub direction: TrendDirection,
    pub strength: String,
    pub phase: String,
    pub confidence: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrendKeyMetrics {
    pub ema_stack: Option<String>,
    pub adx14: Option<f64>,
    pub ichimoku_regime: Option<String>,
    pub price_vs_cloud_pct: Option<f64>,
    pub atr14_percent: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendAgentOutput {
    pub trend_summary: TrendSummary,
    #[serde(default)]
    pub primary_causes: Vec<String>,
    #[serde(default)]
    pub trend_health_flags: Vec<String>,
    #[serde(default)]
    pub key_metrics: TrendKeyMetrics,
}

pub fn trend_schema() -> Value {
    json!({
        "type": "object",
        "required": ["trend_summary"],
        "properties": {
            "trend_summary": {
                "type": "object",
                "required": ["direction", "strength", "phase", "confidence"],
                "properties": {
                    "direction": {"enum": ["bullish", "bearish", "neutral"]},
                    "strength": {"enum": ["weak", "moderate", "strong", "very_strong"]},
                    "phase": {"enum": ["early", "developing", "mature", "extended"]},
                    "confidence": {"enum": ["low", "medium", "high"]}
                }
            },
            "primary_causes": {"type": "array", "items": {"type": "string"}},
            "trend_health_flags": {"type": "array", "items": {"type": "string"}},
            "key_metrics": {"type": "object"}
        }
    })
}

// ----------------------------------------------------------- Oscillator

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OscillatorAgentOutput {
    pub market_regime_state: String,
    #[serde(default)]
    pub market_regime_factors: Vec<String>,
    #[serde(default)]
    pub primary_causes: Vec<String>,
    #[serde(default)]
    pub risk_flags: Vec<String>,
}

pub fn oscillator_schema() -> Value {
    json!({
        "type": "object",
        "required": ["market_regime_state"],
        "properties": {
            "market_regime_state": {"enum": [
                "choppy_noise", "bullish_climax", "bearish_capitulation",
                "strong_bull_trend", "strong_bear_trend", "weak_bullish",
                "weak_bearish", "indeterminate_transition"
            ]},
            "market_regime_factors": {"type": "array", "items": {"type": "string"}},
            "primary_causes": {"type": "array", "items": {"type": "string"}},
            "risk_flags": {"type": "array", "items": {"type": "string"}}
        }
    })
}

// ----------------------------------------------------------- Volatility

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolatilityAgentOutput {
    pub regime: String,
    pub is_squeeze: bool,
    pub main_driver: String,
    #[serde(default)]
    pub primary_causes: Vec<String>,
    #[serde(default)]
    pub risk_flags: Vec<String>,
}

pub fn volatility_schema() -> Value {
    json!({
        "type": "object",
        "required": ["regime", "is_squeeze", "main_driver"],
        "properties": {
            "regime": {"enum": ["expansion", "compression", "rising_vol", "cooling_off", "neutral"]},
            "is_squeeze": {"type": "boolean"},
            "main_driver": {"type": "string"},
            "primary_causes": {"type": "array", "items": {"type": "string"}},
            "risk_flags": {"type": "array", "items": {"type": "string"}}
        }
    })
}

// --------------------------------------------------------------- Volume

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeAgentOutput {
    pub participation_signal: String,
    pub directional_flow_bias: String,
    pub institutional_reference_regime: String,
    #[serde(default)]
    pub primary_causes: Vec<String>,
    #[serde(default)]
    pub risk_flags: Vec<String>,
}

pub fn volume_schema() -> Value {
    json!({
        "type": "object",
        "required": ["participation_signal", "directional_flow_bias", "institutional_reference_regime"],
        "properties": {
            "participation_signal": {"type": "string"},
            "directional_flow_bias": {"type": "string"},
            "institutional_reference_regime": {"type": "string"},
            "primary_causes": {"type": "array", "items": {"type": "string"}},
            "risk_flags": {"type": "array", "items": {"type": "string"}}
        }
    })
}

// ------------------------------------------------------ Support/Resist.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupportResistanceAgentOutput {
    pub nearest_support_assessment: String,
    pub nearest_resistance_assessment: String,
    #[serde(default)]
    pub confluence_notes: Vec<String>,
}

pub fn support_resistance_schema() -> Value {
    json!({
        "type": "object",
        "required": ["nearest_support_assessment", "nearest_resistance_assessment"],
        "properties": {
            "nearest_support_assessment": {"type": "string"},
            "nearest_resistance_assessment": {"type": "string"},
            "confluence_notes": {"type": "array", "items": {"type": "string"}}
        }
    })
}

// -------------------------------------------------------- Smart Money

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmartMoneyAgentOutput {
    pub dominant_status: String,
    #[serde(default)]
    pub primary_causes: Vec<String>,
    #[serde(default)]
    pub risk_flags: Vec<String>,
}

pub fn smart_money_schema() -> Value {
    json!({
        "type": "object",
        "required": ["dominant_status"],
        "properties": {
            "dominant_status": {"enum": [
                "strong_accumulation", "mild_accumulation", "normal",
                "mild_distribution", "abnormal_divergence"
            ]},
            "primary_causes": {"type": "array", "items": {"type": "string"}},
            "risk_flags": {"type": "array", "items": {"type": "string"}}
        }
    })
}

// ------------------------------------------------------ Tech Consensus

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictAlertOutput {
    pub between: [String; 2],
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeScenarioOutput {
    #[serde(rename = "type")]
    pub kind: String,
    pub probability: f64,
    pub description: String,
    pub invalidation_condition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalConsensusOutput {
    pub signal_bias: String,
    pub confidence: f64,
    pub executive_summary: String,
    #[serde(default)]
    pub confluence_factors: Vec<String>,
    #[serde(default)]
    pub conflict_alerts: Vec<ConflictAlertOutput>,
    #[serde(default)]
    pub scenarios: Vec<TradeScenarioOutput>,
}

pub fn technical_consensus_schema() -> Value {
    json!({
        "type": "object",
        "required": ["signal_bias", "confidence", "executive_summary"],
        "properties": {
            "signal_bias": {"enum": [
                "strong_buy", "buy", "weak_buy", "neutral", "weak_sell", "sell", "strong_sell"
            ]},
            "confidence": {"type": "number", "minimum": 0.0, "maximum": 1.0},
            "executive_summary": {"type": "string"},
            "confluence_factors": {"type": "array", "items": {"type": "string"}},
            "conflict_alerts": {"type": "array", "items": {"type": "object"}},
            "scenarios": {"type": "array", "items": {"type": "object"}}
        }
    })
}

// -------------------------------------------------------- Balance Sheet

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSheetOutput {
    pub balance_sheet_signal: String,
    #[serde(default)]
    pub core_causes: Vec<String>,
    #[serde(default)]
    pub risk_flags: Vec<String>,
}

pub fn balance_sheet_schema() -> Value {
    json!({
        "type": "object",
        "required": ["balance_sheet_signal"],
        "properties": {
            "balance_sheet_signal": {"enum": ["robust", "stable", "strained", "distressed"]},
            "core_causes": {"type": "array", "items": {"type": "string"}},
            "risk_flags": {"type": "array", "items": {"type": "string"}}
        }
    })
}

// ----------------------------------------------------- Earnings Quality

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EarningsQualityOutput {
    pub earnings_signal: String,
    #[serde(default)]
    pub core_causes: Vec<String>,
    #[serde(default)]
    pub risk_flags: Vec<String>,
}

pub fn earnings_quality_schema() -> Value {
    json!({
        "type": "object",
        "required": ["earnings_signal"],
        "properties": {
            "earnings_signal": {"enum": [
                "high_quality", "growing_but_capital_intensive", "mixed", "low_quality"
            ]},
            "core_causes": {"type": "array", "items": {"type": "string"}},
            "risk_flags": {"type": "array", "items": {"type": "string"}}
        }
    })
}

// ----------------------------------------------------------- Valuation

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationOutput {
    pub valuation_signal: String,
    #[serde(default)]
    pub core_causes: Vec<String>,
    #[serde(default)]
    pub risk_flags: Vec<String>,
}

pub fn valuation_schema() -> Value {
    json!({
        "type": "object",
        "required": ["valuation_signal"],
        "properties": {
            "valuation_signal": {"enum": ["undervalued", "fairly_valued", "premium_pricing", "overvalued"]},
            "core_causes": {"type": "array", "items": {"type": "string"}},
            "risk_flags": {"type": "array", "items": {"type": "string"}}
        }
    })
}

// --------------------------------------------------------------- Codal

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodalReportSelection {
    pub selected_ids: Vec<String>,
}

pub fn codal_selection_schema() -> Value {
    json!({
        "type": "object",
        "required": ["selected_ids"],
        "properties": {
            "selected_ids": {"type": "array", "items": {"type": "string"}, "maxItems": 20}
        }
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodalAnalysisOutput {
    #[serde(default)]
    pub key_findings: Vec<String>,
    pub summary: String,
}

pub fn codal_analysis_schema() -> Value {
    json!({
        "type": "object",
        "required": ["summary"],
        "properties": {
            "key_findings": {"type": "array", "items": {"type": "string"}},
            "summary": {"type": "string"}
        }
    })
}

// ----------------------------------------------------- Fundamental Cons.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundamentalAnalysisOutput {
    pub investment_bias: String,
    pub confidence_score: f64,
    pub executive_summary: String,
    #[serde(default)]
    pub key_drivers: Vec<String>,
    #[serde(default)]
    pub thesis_risks: Vec<String>,
}

pub fn fundamental_consensus_schema() -> Value {
    json!({
        "type": "object",
        "required": ["investment_bias", "confidence_score", "executive_summary"],
        "properties": {
            "investment_bias": {"enum": [
                "strong_buy", "buy", "weak_buy", "neutral", "weak_sell", "sell", "strong_sell"
            ]},
            "confidence_score": {"type": "number", "minimum": 0.0, "maximum": 1.0},
            "executive_summary": {"type": "string"},
            "key_drivers": {"type": "array", "items": {"type": "string"}},
            "thesis_risks": {"type": "array", "items": {"type": "string"}}
        }
    })
}

// ------------------------------------------------------------- Twitter

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialSentimentOutput {
    pub dominant_bias: String,
    pub weighted_sentiment_score: f64,
    pub social_summary: String,
}

pub fn social_sentiment_schema() -> Value {
    json!({
        "type": "object",
        "required": ["dominant_bias", "weighted_sentiment_score", "social_summary"],
        "properties": {
            "dominant_bias": {"type": "string"},
            "weighted_sentiment_score": {"type": "number", "minimum": -1.0, "maximum": 1.0},
            "social_summary": {"type": "string"}
        }
    })
}

// ------------------------------------------------------------ Sahamyab

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetailPulseAnalysis {
    pub retail_sentiment_score: f64,
    pub market_structure_signal: String,
    pub panic_level: String,
    pub actionable_insight: String,
}

pub fn retail_pulse_schema() -> Value {
    json!({
        "type": "object",
        "required": ["retail_sentiment_score", "market_structure_signal", "panic_level", "actionable_insight"],
        "properties": {
            "retail_sentiment_score": {"type": "number", "minimum": -1.0, "maximum": 1.0},
            "market_structure_signal": {"type": "string"},
            "panic_level": {"enum": ["low", "medium", "high", "extreme"]},
            "actionable_insight": {"type": "string"}
        }
    })
}

// ---------------------------------------------------------------- News

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorporateEvent {
    pub category: String,
    pub details: String,
    pub impact_type: String,
    pub sentiment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FundamentalNewsAnalysis {
    pub news_sentiment_score: f64,
    #[serde(default)]
    pub corporate_events: Vec<CorporateEvent>,
    pub summary: String,
}

pub fn fundamental_news_schema() -> Value {
    json!({
        "type": "object",
        "required": ["news_sentiment_score", "summary"],
        "properties": {
            "news_sentiment_score": {"type": "number", "minimum": -1.0, "maximum": 1.0},
            "corporate_events": {"type": "array", "items": {"type": "object"}},
            "summary": {"type": "string"}
        }
    })
}

// ------------------------------------------------------- Social/News Cons.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsSocialFusionOutput {
    pub information_bias: String,
    pub confidence_score: f64,
    pub narrative_assessment_state: String,
    pub narrative_assessment_explanation: String,
    #[serde(default)]
    pub key_drivers: Vec<String>,
    pub executive_summary: String,
    pub narrative_kill_switch: String,
}

pub fn news_social_fusion_schema() -> Value {
    json!({
        "type": "object",
        "required": [
            "information_bias", "confidence_score", "narrative_assessment_state",
            "narrative_assessment_explanation", "executive_summary", "narrative_kill_switch"
        ],
        "properties": {
            "information_bias": {"enum": ["bullish", "neutral", "bearish"]},
            "confidence_score": {"type": "number", "minimum": 0.0, "maximum": 1.0},
            "narrative_assessment_state": {"enum": ["aligned", "overheated", "fragile", "panic", "conflicted"]},
            "narrative_assessment_explanation": {"type": "string"},
            "key_drivers": {"type": "array", "items": {"type": "string"}},
            "executive_summary": {"type": "string"},
            "narrative_kill_switch": {"type": "string"}
        }
    })
}
