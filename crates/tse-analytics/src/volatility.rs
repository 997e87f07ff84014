use serde::Serialize;
use tse_core::{OhlcvBar, TseError, TseResult};

use crate::primitives::{atr, bollinger_bands, keltner_channels, linreg_slope_r2, log_returns, percentile_rank, rolling_std};

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityRegime {
    Expansion,
    Compression,
    RisingVol,
    CoolingOff,
    Neutral,
}

fn determine_regime(slope: f64, position_pct: f64) -> VolatilityRegime {
    if slope > 0.05 && position_pct > 70.0 {
        VolatilityRegime::Expansion
    } else if slope < -0.05 && position_pct < 30.0 {
        VolatilityRegime::Compression
    } else if slope > 0.0 {
        VolatilityRegime::RisingVol
    } else if slope < 0.0 {
        VolatilityRegime::CoolingOff
    } else {
        VolatilityRegime::Neutral
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BandSnapshot {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    pub width_pct: f64,
    pub trend_quality_r2: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignalSynthesis {
    pub regime: VolatilityRegime,
    pub is_squeeze: bool,
    pub main_driver: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct VolatilityAnalysis {
    pub keltner_16: BandSnapshot,
    pub bollinger_20: BandSnapshot,
    pub realized_vol_20_pct: f64,
    pub historical_vol_30_annualized_pct: f64,
    pub percentile_rank: f64,
    pub signal_synthesis: SignalSynthesis,
}

pub fn analyze(bars: &[OhlcvBar]) -> TseResult<VolatilityAnalysis> {
    if bars.len() < 50 {
        return Err(TseError::InsufficientData(format!(
            "volatility analyzer requires at least 50 bars, got {}",
            bars.len()
        )));
    }

    let high: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let low: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let close: Vec<f64> = bars.iter().map(|b| b.close).collect();

    let kc = keltner_channels(&high, &low, &close, 16, 2.0);
    let bb = bollinger_bands(&close, 20, 2.0);
    let atr_series = atr(&high, &low, &close, 16);

    let kc_width: Vec<f64> = kc.upper.iter().zip(kc.lower.iter()).map(|(u, l)| u - l).collect();
    let bb_width: Vec<f64> = bb.upper.iter().zip(bb.lower.iter()).map(|(u, l)| u - l).collect();
    let (kc_slope, kc_r2) = linreg_slope_r2(&kc_width, 20);
    let (bb_slope, bb_r2) = linreg_slope_r2(&bb_width, 20);

    let returns = log_returns(&close);
    let rolling_20 = rolling_std(&returns, 20);
    let rolling_30 = rolling_std(&returns, 30);
    let realized_vol_20 = *rolling_20.last().unwrap_or(&0.0) * 100.0;
    let historical_vol_30 = *rolling_30.last().unwrap_or(&0.0) * (252f64).sqrt() * 100.0;

    let pct_rank = percentile_rank(&bb_width, 120);

    let is_squeeze = *bb.upper.last().unwrap_or(&0.0) < *kc.upper.last().unwrap_or(&0.0)
        && *bb.lower.last().unwrap_or(&0.0) > *kc.lower.last().unwrap_or(&0.0);
    let main_driver = if bb_r2 > kc_r2 { "bollinger_20" } else { "keltner_16" };
    let regime = if is_squeeze {
        VolatilityRegime::Compression
    } else {
        determine_regime(bb_slope.max(kc_slope), pct_rank)
    };

    Ok(VolatilityAnalysis {
        keltner_16: BandSnapshot {
            upper: *kc.upper.last().unwrap_or(&0.0),
            middle: *kc.middle.last().unwrap_or(&0.0),
            lower: *kc.lower.last().unwrap_or(&0.0),
            width_pct: {
                let m = *kc.middle.last().unwrap_or(&1.0);
                if m != 0.0 { *kc_width.last().unwrap_or(&0.0) / m * 100.0 } else { 0.0 }
            },
            trend_quality_r2: kc_r2,
        },
        bollinger_20: BandSnapshot {
            upper: *bb.upper.last().unwrap_or(&0.0),
            middle: *bb.middle.last().unwrap_or(&0.0),
            lower: *bb.lower.last().unwrap_or(&0.0),
            width_pct: {
                let m = *bb.middle.last().unwrap_or(&1.0);
                if m != 0.0 { *bb_width.last().unwrap_or(&0.0) / m * 100.0 } else { 0.0 }
            },
            trend_quality_r2: bb_r2,
        },
        realized_vol_20_pct: realized_vol_20,
        historical_vol_30_annualized_pct: historical_vol_30,
        percentile_rank: pct_rank,
        signal_synthesis: SignalSynthesis {
            regime,
            is_squeeze,
            main_driver,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn synth_bars(n: usize) -> Vec<OhlcvBar> {
        (0..n)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.2).cos() * 3.0;
                OhlcvBar {
                    date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64),
                    open: base,
                    high: base + 1.5,
                    low: base - 1.5,
                    close: base + 0.3,
                    volume: 800_000.0,
                }
            })
            .collect()
    }

    #[test]
    fn rejects_insufficient_history() {
        let bars = synth_bars(40);
        assert!(analyze(&bars).is_err());
    }

    #[test]
    fn squeeze_forces_compression_regime() {
        let bars = synth_bars(120);
        let report = analyze(&bars).unwrap();
        if report.signal_synthesis.is_squeeze {
            assert!(matches!(report.signal_synthesis.regime, VolatilityRegime::Compression));
        }
    }
}
