pub mod oscillator;
pub mod primitives;
pub mod smart_money;
pub mod sparkline;
pub mod support_resistance;
pub mod trend;
pub mod volatility;
pub mod volume;

pub use oscillator::OscillatorAnalysis;
pub use smart_money::SmartMoneyAnalysis;
pub use sparkline::SparklineReport;
pub use support_resistance::SupportResistanceAnalysis;
pub use trend::TrendAnalysis;
pub use volatility::VolatilityAnalysis;
pub use volume::VolumeAnalysis;

use serde::Serialize;
use tse_core::{OhlcvBar, TradeTapeRow, TseResult};

/// The full technical-kernel bundle handed to the technical worker
/// nodes, mirroring `technicals` in the orchestrator's prepared
/// document.
#[derive(Debug, Clone, Serialize)]
pub struct TechnicalBundle {
    pub trend: TrendAnalysis,
    pub oscillators: OscillatorAnalysis,
    pub volatility: VolatilityAnalysis,
    pub volume: VolumeAnalysis,
    pub support_resistance: SupportResistanceAnalysis,
    pub visuals: SparklineReport,
    pub smart_money: SmartMoneyAnalysis,
}

/// Runs every kernel analyzer over `bars`, mirroring
/// `StockAnalysisPipeline.run_technical_analysis`'s aggregate shape.
/// Returns an error if fewer than [`tse_core::MIN_BARS_FOR_ANALYSIS`]
/// bars are available, before any individual analyzer is invoked.
pub fn run_technical_analysis(
    bars: &[OhlcvBar],
    raw_pivots: &[f64],
    trade_tape: &[TradeTapeRow],
    smart_money_window: usize,
) -> TseResult<TechnicalBundle> {
    if bars.len() < tse_core::MIN_BARS_FOR_ANALYSIS {
        return Err(tse_core::TseError::InsufficientData(format!(
            "technical analysis requires at least {} bars, got {}",
            tse_core::MIN_BARS_FOR_ANALYSIS,
            bars.len()
        )));
    }

    Ok(TechnicalBundle {
        trend: trend::analyze(bars),
        oscillators: oscillator::analyze(bars),
        volatility: volatility::analyze(bars)?,
        volume: volume::analyze(bars),
        support_resistance: support_resistance::analyze(bars, raw_pivots),
        visuals: sparkline::render(bars, 30),
        smart_money: smart_money::analyze(trade_tape, smart_money_window),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn synth_bars(n: usize) -> Vec<OhlcvBar> {
        (0..n)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.2).sin() * 4.0 + i as f64 * 0.05;
                OhlcvBar {
                    date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64),
                    open: base,
                    high: base + 1.2,
                    low: base - 1.2,
                    close: base + 0.3,
                    volume: 1_000_000.0,
                }
            })
            .collect()
    }

    #[test]
    fn rejects_below_minimum_bar_count() {
        let bars = synth_bars(40);
        let result = run_technical_analysis(&bars, &[], &[], 7);
        assert!(result.is_err());
    }

    #[test]
    fn full_bundle_builds_on_sufficient_history() {
        let bars = synth_bars(120);
        let tape: Vec<TradeTapeRow> = (0..10)
            .map(|_| TradeTapeRow {
                date_time: Utc::now(),
                person_buy_volume: 1000.0,
                person_buyer_count: 5.0,
                person_sell_volume: 800.0,
                person_seller_count: 6.0,
                person_owner_change: 0.0,
                company_owner_change: 0.0,
            })
            .collect();
        let bundle = run_technical_analysis(&bars, &[], &tape, 7).unwrap();
        assert_eq!(bundle.smart_money.daily.len(), 7);
        assert_eq!(bundle.visuals.categories.len(), 30);
    }
}
