use serde::Serialize;
use tse_core::FundamentalAnalysis;

use crate::fiscal::latest_value;

/// Persian balance-sheet line labels the provider reports under.
mod keys {
    pub const CASH_AND_BANKS: &str = "وجوه نقد و موجودی‌های نزد بانک";
    pub const SHORT_TERM_INVESTMENTS: &str = "سرمایه‌گذاری‌های کوتاه‌مدت";
    pub const SHORT_TERM_DEBT: &str = "تسهیلات مالی کوتاه‌مدت";
    pub const LONG_TERM_DEBT: &str = "تسهیلات مالی بلندمدت";
    pub const DIVIDEND_PAYABLE: &str = "سود سهام پیشنهادی و پرداختی";
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RawMetrics {
    pub cash_and_banks: f64,
    pub short_term_investments: f64,
    pub total_debt: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LiquidityAndSolvencyRatios {
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub cash_ratio: Option<f64>,
    pub debt_to_equity: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PayoutAndCapitalAllocation {
    pub dividend_payout_ratio_pct: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BalanceSheetMetrics {
    pub agent_name: &'static str,
    pub raw_metrics: RawMetrics,
    pub liquidity_and_solvency_ratios: LiquidityAndSolvencyRatios,
    pub payout_and_capital_allocation: PayoutAndCapitalAllocation,
}

fn ratio_field(fa: &FundamentalAnalysis, label: &str) -> Option<f64> {
    fa.financial_ratios.get(label).and_then(latest_value)
}

fn bs_field(fa: &FundamentalAnalysis, label: &str) -> f64 {
    fa.balance_sheet.get(label).and_then(latest_value).unwrap_or(0.0)
}

pub fn process(fa: &FundamentalAnalysis, net_income: f64) -> BalanceSheetMetrics {
    let cash = bs_field(fa, keys::CASH_AND_BANKS);
    let st_inv = bs_field(fa, keys::SHORT_TERM_INVESTMENTS);
    let st_debt = bs_field(fa, keys::SHORT_TERM_DEBT);
    let lt_debt = bs_field(fa, keys::LONG_TERM_DEBT);
    let total_debt = st_debt + lt_debt;

    let dividend_payable = fa.balance_sheet.get(keys::DIVIDEND_PAYABLE).and_then(latest_value);

    BalanceSheetMetrics {
        agent_name: "Balance Sheet & Capital Allocation Sub-Agent",
        raw_metrics: RawMetrics {
            cash_and_banks: cash,
            short_term_investments: st_inv,
            total_debt,
        },
        liquidity_and_solvency_ratios: LiquidityAndSolvencyRatios {
            current_ratio: ratio_field(fa, "current_ratio"),
            quick_ratio: ratio_field(fa, "quick_ratio"),
            cash_ratio: ratio_field(fa, "cash_ratio"),
            debt_to_equity: ratio_field(fa, "debt_to_equity"),
        },
        payout_and_capital_allocation: PayoutAndCapitalAllocation {
            dividend_payout_ratio_pct: dividend_payable.and_then(|div| {
                if net_income != 0.0 {
                    Some(div / net_income * 100.0)
                } else {
                    None
                }
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn fa_with(balance_sheet_entries: &[(&str, f64)], ratio_entries: &[(&str, f64)]) -> FundamentalAnalysis {
        let mut balance_sheet = BTreeMap::new();
        for (k, v) in balance_sheet_entries {
            let mut series = BTreeMap::new();
            series.insert("1402-12-29".to_string(), *v);
            balance_sheet.insert(k.to_string(), series);
        }
        let mut financial_ratios = BTreeMap::new();
        for (k, v) in ratio_entries {
            let mut series = BTreeMap::new();
            series.insert("1402-12-29".to_string(), *v);
            financial_ratios.insert(k.to_string(), series);
        }
        FundamentalAnalysis {
            balance_sheet,
            profit_loss: BTreeMap::new(),
            cash_flow: BTreeMap::new(),
            financial_ratios,
        }
    }

    #[test]
    fn total_debt_sums_short_and_long_term() {
        let fa = fa_with(
            &[(keys::SHORT_TERM_DEBT, 100.0), (keys::LONG_TERM_DEBT, 50.0)],
            &[],
        );
        let metrics = process(&fa, 1000.0);
        assert_eq!(metrics.raw_metrics.total_debt, 150.0);
    }

    #[test]
    fn missing_dividend_payable_yields_none_payout_ratio() {
        let fa = fa_with(&[], &[]);
        let metrics = process(&fa, 1000.0);
        assert!(metrics.payout_and_capital_allocation.dividend_payout_ratio_pct.is_none());
    }
}
