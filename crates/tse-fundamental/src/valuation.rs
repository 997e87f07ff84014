use serde::Serialize;
use tse_core::FundamentalAnalysis;

use crate::fiscal::latest_value;

/// Market-level reference figures the valuation worker needs that live
/// outside the fiscal statement blocks (the provider's general snapshot).
#[derive(Debug, Clone, Copy, Default)]
pub struct MarketSnapshot {
    pub last_price: f64,
    pub shares_outstanding: f64,
    pub free_float_pct: f64,
    pub pe_ttm: Option<f64>,
    pub pe_at_agm: Option<f64>,
    pub pb: Option<f64>,
    pub eps_ttm: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MarketStructure {
    pub market_cap: f64,
    pub free_float_pct: f64,
    pub net_debt: f64,
    pub enterprise_value: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValuationMultiples {
    pub pe_ttm: Option<f64>,
    pub pe_at_agm: Option<f64>,
    pub pb: Option<f64>,
    pub ps_ttm: Option<f64>,
    pub ev_to_sales: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValuationMetrics {
    pub agent_name: &'static str,
    pub market_structure: MarketStructure,
    pub multiples: ValuationMultiples,
}

pub fn process(fa: &FundamentalAnalysis, snapshot: &MarketSnapshot, revenue_ttm: f64) -> ValuationMetrics {
    let market_cap = snapshot.last_price * snapshot.shares_outstanding;
    let cash = fa.balance_sheet.get("وجوه نقد و موجودی‌های نزد بانک").and_then(latest_value).unwrap_or(0.0);
    let st_inv = fa.balance_sheet.get("سرمایه‌گذاری‌های کوتاه‌مدت").and_then(latest_value).unwrap_or(0.0);
    let st_debt = fa.balance_sheet.get("تسهیلات مالی کوتاه‌مدت").and_then(latest_value).unwrap_or(0.0);
    let lt_debt = fa.balance_sheet.get("تسهیلات مالی بلندمدت").and_then(latest_value).unwrap_or(0.0);
    let net_debt = (st_debt + lt_debt) - cash - st_inv;
    let enterprise_value = market_cap + net_debt;

    ValuationMetrics {
        agent_name: "Valuation & Market Structure Sub-Agent",
        market_structure: MarketStructure {
            market_cap,
            free_float_pct: snapshot.free_float_pct,
            net_debt,
            enterprise_value,
        },
        multiples: ValuationMultiples {
            pe_ttm: snapshot.pe_ttm,
            pe_at_agm: snapshot.pe_at_agm,
            pb: snapshot.pb,
            ps_ttm: if revenue_ttm != 0.0 { Some(market_cap / revenue_ttm) } else { None },
            ev_to_sales: if revenue_ttm != 0.0 { Some(enterprise_value / revenue_ttm) } else { None },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn enterprise_value_adds_net_debt_to_market_cap() {
        let fa = FundamentalAnalysis {
            balance_sheet: BTreeMap::new(),
            profit_loss: BTreeMap::new(),
            cash_flow: BTreeMap::new(),
            financial_ratios: BTreeMap::new(),
        };
        let snapshot = MarketSnapshot {
            last_price: 1000.0,
            shares_outstanding: 1_000_000.0,
            free_float_pct: 25.0,
            pe_ttm: Some(8.0),
            pe_at_agm: None,
            pb: Some(1.5),
            eps_ttm: Some(125.0),
        };
        let metrics = process(&fa, &snapshot, 500_000_000.0);
        assert_eq!(metrics.market_structure.market_cap, 1_000_000_000.0);
        assert_eq!(metrics.market_structure.enterprise_value, 1_000_000_000.0);
    }

    #[test]
    fn zero_revenue_ttm_yields_none_sales_multiples() {
        let fa = FundamentalAnalysis {
            balance_sheet: BTreeMap::new(),
            profit_loss: BTreeMap::new(),
            cash_flow: BTreeMap::new(),
            financial_ratios: BTreeMap::new(),
        };
        let snapshot = MarketSnapshot::default();
        let metrics = process(&fa, &snapshot, 0.0);
        assert!(metrics.multiples.ps_ttm.is_none());
        assert!(metrics.multiples.ev_to_sales.is_none());
    }
}
