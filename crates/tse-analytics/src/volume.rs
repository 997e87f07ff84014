use serde::Serialize;
use tse_core::{OhlcvBar, TrendQualityStrength};

use crate::primitives::{cumulative_volume_delta, linreg_slope_r2, log_returns, mfi, obv, rolling_std, sma, vwap_rolling};

#[derive(Debug, Clone, Serialize)]
pub struct SlopeReading {
    pub value: f64,
    pub slope: f64,
    pub slope_horizon_bars: u32,
    pub trend_quality_r2: f64,
    pub strength: TrendQualityStrength,
    pub regime: &'static str,
}

fn slope_reading(series: &[f64], horizon: usize, regime: &'static str) -> SlopeReading {
    let (slope, r2) = linreg_slope_r2(series, horizon);
    SlopeReading {
        value: *series.last().unwrap_or(&0.0),
        slope,
        slope_horizon_bars: horizon as u32,
        trend_quality_r2: r2,
        strength: TrendQualityStrength::from_r2(r2),
        regime,
    }
}

/// `institutional_reference.vwap`: distance and slope only, no raw level.
#[derive(Debug, Clone, Serialize)]
pub struct VwapReference {
    pub distance_percent: f64,
    pub slope: f64,
    pub regime: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct VolumeAnalysis {
    pub vma_ratio: SlopeReading,
    pub rvol: SlopeReading,
    pub obv: SlopeReading,
    pub cvd: SlopeReading,
    pub mfi_14: SlopeReading,
    pub institutional_reference: VwapReference,
    pub realized_vol_30_pct: f64,
    pub realized_vol_90_pct: f64,
}

fn regime_for(name: &str, last: f64, slope: f64) -> &'static str {
    match name {
        "vma_ratio" => if slope > 0.0 { "expanding_participation" } else { "contracting_interest" },
        "rvol" => if last > 2.0 { "liquidity_surge" } else { "normal_turnover" },
        "obv" => if slope > 0.0 { "strong_accumulation" } else { "distribution" },
        "cvd" => if slope > 0.0 { "aggressive_buying" } else { "aggressive_selling" },
        "mfi" => {
            if last > 80.0 {
                "overbought"
            } else if last < 20.0 {
                "oversold"
            } else if slope > 0.0 {
                "bullish_flow"
            } else {
                "bearish_flow"
            }
        }
        "vwap" => if last > 0.0 { "premium_markup" } else { "discount_markdown" },
        _ => "unclassified",
    }
}

pub fn analyze(bars: &[OhlcvBar]) -> VolumeAnalysis {
    let open: Vec<f64> = bars.iter().map(|b| b.open).collect();
    let high: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let low: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let close: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volume: Vec<f64> = bars.iter().map(|b| b.volume).collect();

    let vma20 = sma(&volume, 20);
    let vma50 = sma(&volume, 50);
    let vma_ratio: Vec<f64> = vma20
        .iter()
        .zip(vma50.iter())
        .map(|(a, b)| if *b != 0.0 { a / b } else { 0.0 })
        .collect();

    let vma20_last = *vma20.last().unwrap_or(&0.0);
    let v_last = *volume.last().unwrap_or(&0.0);
    let rvol_series: Vec<f64> = volume
        .iter()
        .zip(vma20.iter())
        .map(|(v, vma)| v / (vma + 1e-9))
        .collect();

    let obv_series = obv(&close, &volume);
    let cvd_series = cumulative_volume_delta(&open, &close, &volume);
    let mfi_series = mfi(&high, &low, &close, &volume, 14);
    let vwap_series = vwap_rolling(&high, &low, &close, &volume, 20);

    let returns = log_returns(&close);
    let rv30 = *rolling_std(&returns, 30).last().unwrap_or(&0.0) * (252f64).sqrt() * 100.0;
    let rv90 = *rolling_std(&returns, 90).last().unwrap_or(&0.0) * (252f64).sqrt() * 100.0;

    let price_last = *close.last().unwrap_or(&0.0);
    let vwap_last = *vwap_series.last().unwrap_or(&0.0);
    let vwap_distance_pct = if vwap_last != 0.0 { (price_last - vwap_last) / vwap_last * 100.0 } else { 0.0 };
    let (vwap_slope, _) = linreg_slope_r2(&vwap_series, 20);

    let vma_ratio_reading = slope_reading(&vma_ratio, 20, "");
    let rvol_reading = slope_reading(&rvol_series, 20, "");
    let obv_reading = slope_reading(&obv_series, 20, "");
    let cvd_reading = slope_reading(&cvd_series, 20, "");
    let mfi_reading = slope_reading(&mfi_series, 14, "");

    let _ = vma20_last;
    let _ = v_last;

    VolumeAnalysis {
        vma_ratio: SlopeReading {
            regime: regime_for("vma_ratio", vma_ratio_reading.value, vma_ratio_reading.slope),
            ..vma_ratio_reading
        },
        rvol: SlopeReading {
            regime: regime_for("rvol", rvol_reading.value, rvol_reading.slope),
            ..rvol_reading
        },
        obv: SlopeReading {
            regime: regime_for("obv", obv_reading.value, obv_reading.slope),
            ..obv_reading
        },
        cvd: SlopeReading {
            regime: regime_for("cvd", cvd_reading.value, cvd_reading.slope),
            ..cvd_reading
        },
        mfi_14: SlopeReading {
            regime: regime_for("mfi", mfi_reading.value, mfi_reading.slope),
            ..mfi_reading
        },
        institutional_reference: VwapReference {
            distance_percent: vwap_distance_pct,
            slope: vwap_slope,
            regime: regime_for("vwap", vwap_distance_pct, vwap_slope),
        },
        realized_vol_30_pct: rv30,
        realized_vol_90_pct: rv90,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn synth_bars(n: usize) -> Vec<OhlcvBar> {
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64 * 0.1;
                OhlcvBar {
                    date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64),
                    open: base,
                    high: base + 1.0,
                    low: base - 1.0,
                    close: base + 0.5,
                    volume: 1_000_000.0 + i as f64 * 1000.0,
                }
            })
            .collect()
    }

    #[test]
    fn institutional_reference_exposes_no_raw_vwap_level() {
        let report = analyze(&synth_bars(120));
        assert!(report.institutional_reference.distance_percent.is_finite());
    }

    #[test]
    fn zero_volume_bars_do_not_panic() {
        let mut bars = synth_bars(60);
        for b in bars.iter_mut().take(10) {
            b.volume = 0.0;
        }
        let report = analyze(&bars);
        assert!(report.mfi_14.value.is_finite());
    }
}
