use tse_core::FiscalSeries;

/// Latest value in a fiscal series. Periods sort lexicographically by
/// label (`"1402-12-29"` style), so the greatest key is the newest
/// period.
pub fn latest_value(series: &FiscalSeries) -> Option<f64> {
    series.iter().next_back().map(|(_, v)| *v)
}

pub fn latest_item(series: &FiscalSeries) -> Option<(&str, f64)> {
    series.iter().next_back().map(|(k, v)| (k.as_str(), *v))
}

/// The two most recent periods, for year-over-year style comparisons.
/// `None` if fewer than two periods are present.
pub fn current_and_prev(series: &FiscalSeries) -> Option<(&str, f64, &str, f64)> {
    let mut iter = series.iter().rev();
    let (curr_k, curr_v) = iter.next()?;
    let (prev_k, prev_v) = iter.next()?;
    Some((curr_k.as_str(), *curr_v, prev_k.as_str(), *prev_v))
}

/// Year-over-year growth percentage. `None` when `prev` is zero, matching
/// the source pipeline's treatment of a zero base as incomparable rather
/// than an infinite swing.
pub fn growth_pct(curr: f64, prev: f64) -> Option<f64> {
    if prev == 0.0 {
        None
    } else {
        Some((curr - prev) / prev.abs() * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(pairs: &[(&str, f64)]) -> FiscalSeries {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn latest_value_picks_lexicographically_greatest_key() {
        let s = series(&[("1401-12-29", 100.0), ("1402-12-29", 150.0), ("1400-12-29", 90.0)]);
        assert_eq!(latest_value(&s), Some(150.0));
    }

    #[test]
    fn current_and_prev_returns_none_with_single_period() {
        let s = series(&[("1402-12-29", 150.0)]);
        assert!(current_and_prev(&s).is_none());
    }

    #[test]
    fn growth_pct_is_none_on_zero_base() {
        assert_eq!(growth_pct(50.0, 0.0), None);
        assert_eq!(growth_pct(150.0, 100.0), Some(50.0));
    }
}
