use serde::Serialize;
use tse_core::FundamentalAnalysis;

use crate::fiscal::{current_and_prev, growth_pct, latest_value};

#[derive(Debug, Clone, Default, Serialize)]
pub struct TtmFigures {
    pub revenue: f64,
    pub gross_profit: f64,
    pub operating_profit: f64,
    pub net_income: f64,
    pub operating_cash_flow: f64,
    pub capital_expenditure: f64,
    pub free_cash_flow: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GrowthMetrics {
    pub revenue_growth_pct: Option<f64>,
    pub net_income_growth_pct: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QualityRatios {
    pub net_margin_pct: f64,
    pub gross_margin_pct: f64,
    pub operating_margin_pct: f64,
    pub ocf_to_net_income: Option<f64>,
    pub fcf_to_net_income: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct QualityFlags {
    pub flag_ocf_below_net_income: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct EarningsQualityMetrics {
    pub agent_name: &'static str,
    pub ttm: TtmFigures,
    pub growth: GrowthMetrics,
    pub quality_ratios: QualityRatios,
    pub flags: QualityFlags,
}

fn pl_latest(fa: &FundamentalAnalysis, label: &str) -> f64 {
    fa.profit_loss.get(label).and_then(latest_value).unwrap_or(0.0)
}

fn cf_latest(fa: &FundamentalAnalysis, label: &str) -> f64 {
    fa.cash_flow.get(label).and_then(latest_value).unwrap_or(0.0)
}

fn pl_growth(fa: &FundamentalAnalysis, label: &str) -> Option<f64> {
    fa.profit_loss
        .get(label)
        .and_then(current_and_prev)
        .and_then(|(_, curr, _, prev)| growth_pct(curr, prev))
}

pub fn process(fa: &FundamentalAnalysis) -> EarningsQualityMetrics {
    let revenue = pl_latest(fa, "revenue");
    let cogs = pl_latest(fa, "cost_of_goods_sold");
    let operating_profit = pl_latest(fa, "operating_profit");
    let net_income = pl_latest(fa, "net_income");
    let ocf = cf_latest(fa, "operating_cash_flow");
    let capex = cf_latest(fa, "purchase_of_ppe") + cf_latest(fa, "purchase_of_intangibles");
    let gross_profit = revenue - cogs;
    let fcf = ocf - capex;

    let ocf_to_ni = if net_income != 0.0 { Some(ocf / net_income) } else { None };
    let fcf_to_ni = if net_income != 0.0 { Some(fcf / net_income) } else { None };

    EarningsQualityMetrics {
        agent_name: "Earnings Quality & Cash Conversion Sub-Agent",
        ttm: TtmFigures {
            revenue,
            gross_profit,
            operating_profit,
            net_income,
            operating_cash_flow: ocf,
            capital_expenditure: capex,
            free_cash_flow: fcf,
        },
        growth: GrowthMetrics {
            revenue_growth_pct: pl_growth(fa, "revenue"),
            net_income_growth_pct: pl_growth(fa, "net_income"),
        },
        quality_ratios: QualityRatios {
            net_margin_pct: if revenue != 0.0 { net_income / revenue * 100.0 } else { 0.0 },
            gross_margin_pct: if revenue != 0.0 { gross_profit / revenue * 100.0 } else { 0.0 },
            operating_margin_pct: if revenue != 0.0 { operating_profit / revenue * 100.0 } else { 0.0 },
            ocf_to_net_income: ocf_to_ni,
            fcf_to_net_income: fcf_to_ni,
        },
        flags: QualityFlags {
            flag_ocf_below_net_income: ocf_to_ni.map(|r| r < 1.0).unwrap_or(false),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn fa_with_pl(entries: &[(&str, f64)]) -> FundamentalAnalysis {
        let mut profit_loss = BTreeMap::new();
        for (k, v) in entries {
            let mut series = BTreeMap::new();
            series.insert("1402-12-29".to_string(), *v);
            profit_loss.insert(k.to_string(), series);
        }
        FundamentalAnalysis {
            balance_sheet: BTreeMap::new(),
            profit_loss,
            cash_flow: BTreeMap::new(),
            financial_ratios: BTreeMap::new(),
        }
    }

    #[test]
    fn ocf_below_net_income_sets_flag() {
        let mut fa = fa_with_pl(&[("net_income", 1000.0)]);
        let mut series = BTreeMap::new();
        series.insert("1402-12-29".to_string(), 500.0);
        fa.cash_flow.insert("operating_cash_flow".to_string(), series);
        let metrics = process(&fa);
        assert!(metrics.flags.flag_ocf_below_net_income);
    }

    #[test]
    fn zero_revenue_yields_zero_margins_not_nan() {
        let fa = fa_with_pl(&[]);
        let metrics = process(&fa);
        assert_eq!(metrics.quality_ratios.net_margin_pct, 0.0);
    }
}
