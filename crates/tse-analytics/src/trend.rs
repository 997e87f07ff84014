use serde::Serialize;
use tse_core::{OhlcvBar, TrendQualityStrength};

use crate::primitives::{atr, ema, ichimoku, linreg_slope_r2};

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmaRegime {
    Surging,
    Rising,
    Flat,
    Falling,
    Crashing,
}

impl EmaRegime {
    fn from_slope_norm(slope_norm: f64) -> Self {
        if slope_norm > 0.5 {
            Self::Surging
        } else if slope_norm > 0.1 {
            Self::Rising
        } else if slope_norm < -0.5 {
            Self::Crashing
        } else if slope_norm < -0.1 {
            Self::Falling
        } else {
            Self::Flat
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmaBlock {
    pub value: f64,
    pub slope_atr_norm: f64,
    pub slope_horizon_bars: u32,
    pub price_distance_pct: f64,
    pub regime: EmaRegime,
    pub trend_quality_r2: f64,
    pub slope_strength: TrendQualityStrength,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MomentumRegime {
    StrongTrend,
    Trending,
    Ranging,
}

#[derive(Debug, Clone, Serialize)]
pub struct MomentumBlock {
    pub value: f64,
    pub slope: f64,
    pub slope_horizon_bars: u32,
    pub regime: MomentumRegime,
    pub trend_quality: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IchimokuRegime {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Serialize)]
pub struct IchimokuFeatures {
    pub price_vs_cloud_pct: f64,
    pub cloud_thickness_pct: f64,
    pub cloud_slope_atr_norm: f64,
    pub cloud_slope_horizon_bars: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct IchimokuStructure {
    pub features: IchimokuFeatures,
    pub regime: IchimokuRegime,
    pub stability: &'static str,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SwingLevel {
    pub cur_value: f64,
    pub prev_value: f64,
    pub distance_pct: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MarketGeometry {
    pub hh: Option<SwingLevel>,
    pub hl: Option<SwingLevel>,
    pub lh: Option<SwingLevel>,
    pub ll: Option<SwingLevel>,
    pub regime: &'static str,
    pub integrity: &'static str,
    pub bars_since_last_structure_break: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AtrBlock {
    pub value: f64,
    pub percent: f64,
    pub slope_atr_norm: f64,
    pub regime: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrendAnalysis {
    pub ema_10: EmaBlock,
    pub ema_50: EmaBlock,
    pub ema_100: EmaBlock,
    pub adx_14: MomentumBlock,
    pub ichimoku: IchimokuStructure,
    pub market_geometry: MarketGeometry,
    pub atr_14: AtrBlock,
}

fn ema_block(close: &[f64], atr_last: f64, period: usize, horizon: u32) -> EmaBlock {
    let series = ema(close, period);
    let (slope, r2) = linreg_slope_r2(&series, horizon as usize);
    let slope_norm = if atr_last != 0.0 { slope / atr_last } else { 0.0 };
    let last = *series.last().unwrap_or(&0.0);
    let price = *close.last().unwrap_or(&0.0);
    EmaBlock {
        value: last,
        slope_atr_norm: slope_norm,
        slope_horizon_bars: horizon,
        price_distance_pct: if last != 0.0 { (price - last) / last * 100.0 } else { 0.0 },
        regime: EmaRegime::from_slope_norm(slope_norm),
        trend_quality_r2: r2,
        slope_strength: TrendQualityStrength::from_r2(r2),
    }
}

/// Local extremum detection with a ±5 bar window, gated on ATR
/// significance (threshold 1.0x ATR14 against the opposite side's
/// trailing mean).
fn detect_swings(high: &[f64], low: &[f64], atr: &[f64], lookback: usize, atr_threshold: f64) -> MarketGeometry {
    let n = high.len();
    let mut swings_h: Vec<(usize, f64)> = Vec::new();
    let mut swings_l: Vec<(usize, f64)> = Vec::new();

    if n > lookback * 2 {
        for i in lookback..n - lookback {
            let window_h = &high[i - lookback..=i + lookback];
            let max_h = window_h.iter().cloned().fold(f64::MIN, f64::max);
            if (high[i] - max_h).abs() < f64::EPSILON {
                let mean_l: f64 = low[i - lookback..i].iter().sum::<f64>() / lookback as f64;
                if (high[i] - mean_l) > atr[i] * atr_threshold {
                    swings_h.push((i, high[i]));
                }
            }
            let window_l = &low[i - lookback..=i + lookback];
            let min_l = window_l.iter().cloned().fold(f64::MAX, f64::min);
            if (low[i] - min_l).abs() < f64::EPSILON {
                let mean_h: f64 = high[i - lookback..i].iter().sum::<f64>() / lookback as f64;
                if (mean_h - low[i]) > atr[i] * atr_threshold {
                    swings_l.push((i, low[i]));
                }
            }
        }
    }

    let mut geo = MarketGeometry {
        regime: "consolidation",
        integrity: "fragile",
        bars_since_last_structure_break: n,
        ..Default::default()
    };

    let mut has_hh = false;
    let mut has_hl = false;
    let mut has_lh = false;
    let mut has_ll = false;

    if swings_h.len() >= 2 {
        let (_, last) = swings_h[swings_h.len() - 1];
        let (_, prev) = swings_h[swings_h.len() - 2];
        let level = SwingLevel {
            cur_value: last,
            prev_value: prev,
            distance_pct: 0.0,
        };
        if last > prev {
            geo.hh = Some(level);
            has_hh = true;
        } else {
            geo.lh = Some(level);
            has_lh = true;
        }
    }
    if swings_l.len() >= 2 {
        let (_, last) = swings_l[swings_l.len() - 1];
        let (_, prev) = swings_l[swings_l.len() - 2];
        let level = SwingLevel {
            cur_value: last,
            prev_value: prev,
            distance_pct: 0.0,
        };
        if last > prev {
            geo.hl = Some(level);
            has_hl = true;
        } else {
            geo.ll = Some(level);
            has_ll = true;
        }
    }

    geo.regime = if has_hh && has_hl {
        "uptrend"
    } else if has_lh && has_ll {
        "downtrend"
    } else if has_hh && has_ll {
        "expanding_volatility"
    } else {
        "consolidation"
    };
    geo.integrity = if matches!(geo.regime, "uptrend" | "downtrend") {
        "intact"
    } else {
        "fragile"
    };

    let last_pivot_idx = swings_h
        .last()
        .map(|(i, _)| *i)
        .into_iter()
        .chain(swings_l.last().map(|(i, _)| *i))
        .max()
        .unwrap_or(0);
    geo.bars_since_last_structure_break = n.saturating_sub(last_pivot_idx);
    geo
}

pub fn analyze(bars: &[OhlcvBar]) -> TrendAnalysis {
    let close: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let high: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let low: Vec<f64> = bars.iter().map(|b| b.low).collect();

    let atr_series = atr(&high, &low, &close, 14);
    let atr_last = *atr_series.last().unwrap_or(&0.0);
    let price = *close.last().unwrap_or(&0.0);

    let adx_series = crate::primitives::adx(&high, &low, &close, 14).adx;
    let (adx_slope, _) = linreg_slope_r2(&adx_series, 14);
    let adx_last = *adx_series.last().unwrap_or(&0.0);
    let mom_regime = if adx_last > 50.0 {
        MomentumRegime::StrongTrend
    } else if adx_last > 25.0 {
        MomentumRegime::Trending
    } else {
        MomentumRegime::Ranging
    };

    let ichi = ichimoku(&high, &low, 9, 26, 52, 26);
    let cloud_top = ichi.senkou_span_a.last().unwrap_or(&0.0).max(*ichi.senkou_span_b.last().unwrap_or(&0.0));
    let cloud_bottom = ichi.senkou_span_a.last().unwrap_or(&0.0).min(*ichi.senkou_span_b.last().unwrap_or(&0.0));
    let ichi_regime = if price > cloud_top {
        IchimokuRegime::Bullish
    } else if price < cloud_bottom {
        IchimokuRegime::Bearish
    } else {
        IchimokuRegime::Neutral
    };
    let a_last = *ichi.senkou_span_a.last().unwrap_or(&0.0);
    let b_last = *ichi.senkou_span_b.last().unwrap_or(&0.0);
    let thickness = (a_last - b_last).abs();
    let n = bars.len();
    let b_prior = if n > 26 { ichi.senkou_span_b[n - 27] } else { b_last };

    let geometry = detect_swings(&high, &low, &atr_series, 5, 1.0);

    TrendAnalysis {
        ema_10: ema_block(&close, atr_last, 10, 5),
        ema_50: ema_block(&close, atr_last, 50, 14),
        ema_100: ema_block(&close, atr_last, 100, 30),
        adx_14: MomentumBlock {
            value: adx_last,
            slope: adx_slope,
            slope_horizon_bars: 14,
            regime: mom_regime,
            trend_quality: if adx_slope > 0.0 { "improving" } else { "decaying" },
        },
        ichimoku: IchimokuStructure {
            features: IchimokuFeatures {
                price_vs_cloud_pct: if cloud_top != 0.0 { (price - cloud_top) / cloud_top * 100.0 } else { 0.0 },
                cloud_thickness_pct: if b_last != 0.0 { thickness / b_last.abs() * 100.0 } else { 0.0 },
                cloud_slope_atr_norm: if atr_last != 0.0 { (b_last - b_prior) / atr_last } else { 0.0 },
                cloud_slope_horizon_bars: 26,
            },
            regime: ichi_regime,
            stability: if thickness > atr_last * 0.5 { "stable" } else { "volatile" },
        },
        market_geometry: geometry,
        atr_14: AtrBlock {
            value: atr_last,
            percent: if price != 0.0 { atr_last / price * 100.0 } else { 0.0 },
            slope_atr_norm: {
                let prior = if n > 14 { atr_series[n - 15] } else { atr_last };
                if prior != 0.0 { (atr_last - prior) / prior } else { 0.0 }
            },
            regime: {
                let mean: f64 = atr_series.iter().sum::<f64>() / atr_series.len().max(1) as f64;
                if atr_last > mean { "high" } else { "low" }
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn synth_bars(n: usize) -> Vec<OhlcvBar> {
        (0..n)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.3).sin() * 2.0 + i as f64 * 0.1;
                OhlcvBar {
                    date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64),
                    open: base,
                    high: base + 1.0,
                    low: base - 1.0,
                    close: base + 0.2,
                    volume: 1_000_000.0,
                }
            })
            .collect()
    }

    #[test]
    fn analyze_runs_without_nan_on_sufficient_bars() {
        let bars = synth_bars(120);
        let report = analyze(&bars);
        assert!(report.ema_10.value.is_finite());
        assert!(report.adx_14.value.is_finite());
        assert!((0.0..=1.0).contains(&report.ema_10.trend_quality_r2));
    }
}
