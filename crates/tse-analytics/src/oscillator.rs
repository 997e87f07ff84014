use serde::Serialize;
use tse_core::OhlcvBar;

use crate::primitives::{adx, linreg_slope_r2, macd, rsi};

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OscillatorState {
    ChoppyNoise,
    BullishClimax,
    BearishCapitulation,
    StrongBullTrend,
    StrongBearTrend,
    WeakBullish,
    WeakBearish,
    IndeterminateTransition,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionRisk {
    High,
    Moderate,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct RegimeFactors {
    pub trend_strength_high: bool,
    pub direction_bias: i8,
    pub extension_risk: ExtensionRisk,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricSlope {
    pub value: f64,
    pub slope: f64,
    pub slope_horizon_bars: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct OscillatorAnalysis {
    pub rsi_14: MetricSlope,
    pub adx_14: MetricSlope,
    pub macd_histogram: MetricSlope,
    pub state: OscillatorState,
    pub regime_factors: RegimeFactors,
}

pub fn analyze(bars: &[OhlcvBar]) -> OscillatorAnalysis {
    let high: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let low: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let close: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let rsi_series = rsi(&close, 14);
    let adx_series = adx(&high, &low, &close, 14).adx;
    let macd_out = macd(&close, 12, 26, 9);

    let (rsi_slope, _) = linreg_slope_r2(&rsi_series, 5);
    let (adx_slope, _) = linreg_slope_r2(&adx_series, 7);
    let (hist_slope, _) = linreg_slope_r2(&macd_out.histogram, 4);

    let rsi_last = *rsi_series.last().unwrap_or(&50.0);
    let adx_last = *adx_series.last().unwrap_or(&0.0);
    let hist_last = *macd_out.histogram.last().unwrap_or(&0.0);

    let trend_strength_high = adx_last > 25.0;
    let direction_bias: i8 = if hist_last > 0.0 {
        1
    } else if hist_last < 0.0 {
        -1
    } else {
        0
    };
    let extension_risk = if rsi_last > 70.0 || rsi_last < 30.0 {
        ExtensionRisk::High
    } else {
        ExtensionRisk::Moderate
    };

    let state = if trend_strength_high && direction_bias > 0 && rsi_last > 70.0 {
        OscillatorState::BullishClimax
    } else if trend_strength_high && direction_bias < 0 && rsi_last < 30.0 {
        OscillatorState::BearishCapitulation
    } else if trend_strength_high && direction_bias > 0 {
        OscillatorState::StrongBullTrend
    } else if trend_strength_high && direction_bias < 0 {
        OscillatorState::StrongBearTrend
    } else if !trend_strength_high && adx_last < 15.0 {
        OscillatorState::ChoppyNoise
    } else if direction_bias > 0 {
        OscillatorState::WeakBullish
    } else if direction_bias < 0 {
        OscillatorState::WeakBearish
    } else {
        OscillatorState::IndeterminateTransition
    };

    OscillatorAnalysis {
        rsi_14: MetricSlope {
            value: rsi_last,
            slope: rsi_slope,
            slope_horizon_bars: 5,
        },
        adx_14: MetricSlope {
            value: adx_last,
            slope: adx_slope,
            slope_horizon_bars: 7,
        },
        macd_histogram: MetricSlope {
            value: hist_last,
            slope: hist_slope,
            slope_horizon_bars: 4,
        },
        state,
        regime_factors: RegimeFactors {
            trend_strength_high,
            direction_bias,
            extension_risk,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bars_trending_up(n: usize) -> Vec<OhlcvBar> {
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64 * 0.8;
                OhlcvBar {
                    date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64),
                    open: base,
                    high: base + 1.0,
                    low: base - 0.5,
                    close: base + 0.7,
                    volume: 500_000.0,
                }
            })
            .collect()
    }

    #[test]
    fn strong_uptrend_produces_bullish_direction_bias() {
        let report = analyze(&bars_trending_up(120));
        assert_eq!(report.regime_factors.direction_bias, 1);
    }
}
