use serde::Serialize;
use tse_core::TradeTapeRow;

const SCALE_FACTOR: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FlowStatus {
    SmartMoneyEntry,
    AbnormalDivergence,
    HighSellingPressure,
    DivergenceRetailBuying,
    Normal,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct DailyFlow {
    pub per_capita_buy: f64,
    pub per_capita_sell: f64,
    pub ratio: f64,
    pub real_net_flow: f64,
    pub legal_net_flow: f64,
    pub status: FlowStatus,
}

/// Status taxonomy ported verbatim from `_determine_volume_status`: ratio
/// is the real buy/sell per-capita power ratio, net_flow is the real
/// (retail) owner-change flow, both already scaled by `SCALE_FACTOR`.
fn determine_volume_status(ratio: f64, net_flow: f64) -> FlowStatus {
    if ratio >= 1.2 && net_flow > 0.0 {
        FlowStatus::SmartMoneyEntry
    } else if ratio < 0.1 {
        FlowStatus::AbnormalDivergence
    } else if ratio < 1.0 && net_flow < 0.0 {
        FlowStatus::HighSellingPressure
    } else if ratio < 1.0 && net_flow > 0.0 {
        FlowStatus::DivergenceRetailBuying
    } else {
        FlowStatus::Normal
    }
}

/// Per-capita buy/sell (scaled by 1e6), real/legal net flow (scaled by
/// 1e6), and the resulting 5-way status classification.
///
/// `buyer_count == 0` is forced to `Normal` rather than falling through
/// to the generic ratio<0.1 branch, overriding the literal Python
/// branch order — a zero-buyer session carries no accumulation signal
/// to classify as divergence.
fn classify_row(row: &TradeTapeRow) -> DailyFlow {
    let per_capita_buy = if row.person_buyer_count > 0.0 {
        (row.person_buy_volume / row.person_buyer_count) / SCALE_FACTOR
    } else {
        0.0
    };
    let per_capita_sell = if row.person_seller_count > 0.0 {
        (row.person_sell_volume / row.person_seller_count) / SCALE_FACTOR
    } else {
        0.0
    };
    let ratio = if per_capita_sell != 0.0 { per_capita_buy / per_capita_sell } else { 0.0 };
    let real_net_flow = row.person_owner_change / SCALE_FACTOR;
    let legal_net_flow = row.company_owner_change / SCALE_FACTOR;

    let status = if row.person_buyer_count == 0.0 {
        FlowStatus::Normal
    } else {
        determine_volume_status(ratio, real_net_flow)
    };

    DailyFlow {
        per_capita_buy,
        per_capita_sell,
        ratio,
        real_net_flow,
        legal_net_flow,
        status,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SmartMoneyAnalysis {
    pub window_size: usize,
    pub daily: Vec<DailyFlow>,
    pub accumulation_days: usize,
    pub distribution_days: usize,
    pub cumulative_real_net_flow: f64,
}

pub fn analyze(rows: &[TradeTapeRow], window_size: usize) -> SmartMoneyAnalysis {
    let window: Vec<&TradeTapeRow> = rows.iter().rev().take(window_size).collect();
    let daily: Vec<DailyFlow> = window.iter().rev().map(|r| classify_row(r)).collect();

    let accumulation_days = daily.iter().filter(|d| matches!(d.status, FlowStatus::SmartMoneyEntry)).count();
    let distribution_days = daily
        .iter()
        .filter(|d| matches!(d.status, FlowStatus::HighSellingPressure | FlowStatus::AbnormalDivergence))
        .count();
    let cumulative_real_net_flow = daily.iter().map(|d| d.real_net_flow).sum();

    SmartMoneyAnalysis {
        window_size,
        daily,
        accumulation_days,
        distribution_days,
        cumulative_real_net_flow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn row(
        buy_vol: f64,
        buyer_count: f64,
        sell_vol: f64,
        seller_count: f64,
        person_owner_change: f64,
        company_owner_change: f64,
    ) -> TradeTapeRow {
        TradeTapeRow {
            date_time: Utc::now(),
            person_buy_volume: buy_vol,
            person_buyer_count: buyer_count,
            person_sell_volume: sell_vol,
            person_seller_count: seller_count,
            person_owner_change,
            company_owner_change,
        }
    }

    #[test]
    fn zero_buyer_count_forces_normal_status() {
        let flow = classify_row(&row(0.0, 0.0, 5000.0, 10.0, 0.0, 0.0));
        assert_eq!(flow.per_capita_buy, 0.0);
        assert_eq!(flow.status, FlowStatus::Normal);
    }

    #[test]
    fn scenario_three_is_smart_money_entry() {
        // person_buy_volume / person_buyer_count / 1e6 == 1.2, real_net_flow == 800.0
        let flow = classify_row(&row(12_000_000.0, 10.0, 1_000_000.0, 10.0, 800_000_000.0, 0.0));
        assert_eq!(flow.status, FlowStatus::SmartMoneyEntry);
        assert!((flow.per_capita_buy - 1.2).abs() < 1e-9);
        assert!((flow.real_net_flow - 800.0).abs() < 1e-9);
    }

    #[test]
    fn negative_net_flow_with_sub_unity_ratio_is_high_selling_pressure() {
        let flow = classify_row(&row(5_000_000.0, 10.0, 10_000_000.0, 10.0, -500_000.0, 0.0));
        assert_eq!(flow.status, FlowStatus::HighSellingPressure);
    }

    #[test]
    fn analyze_respects_window_size_and_order() {
        let rows: Vec<TradeTapeRow> =
            (0..10).map(|i| row(1000.0 + i as f64, 5.0, 500.0, 5.0, 0.0, 0.0)).collect();
        let report = analyze(&rows, 7);
        assert_eq!(report.daily.len(), 7);
    }
}
