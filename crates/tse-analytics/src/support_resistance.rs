use serde::Serialize;
use tse_core::{OhlcvBar, SrZone, ZoneType};

use crate::primitives::{ema, sma, vwap_rolling};

const CLUSTER_GAP_PCT: f64 = 0.5;

#[derive(Debug, Clone, Serialize)]
pub struct VpvrPoint {
    pub price_bucket: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VpvrProfile {
    pub point_of_control: f64,
    pub buckets: Vec<VpvrPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SupportResistanceAnalysis {
    pub zones: Vec<SrZone>,
    pub volume_profile: VpvrProfile,
    pub nearest_support: Option<SrZone>,
    pub nearest_resistance: Option<SrZone>,
}

struct RawLevel {
    price: f64,
    source: &'static str,
    is_support: bool,
}

const SWING_SCAN_BARS: usize = 50;
const SWING_KEEP: usize = 3;

/// Swing fractals over the last `SWING_SCAN_BARS` bars only, keeping
/// the most recent `SWING_KEEP` highs and lows — older structure is
/// stale as a level candidate by the time this many bars have passed.
fn swing_levels(high: &[f64], low: &[f64], lookback: usize) -> Vec<RawLevel> {
    let n = high.len();
    if n <= lookback * 2 {
        return Vec::new();
    }
    let start = n.saturating_sub(SWING_SCAN_BARS).max(lookback);

    let mut highs = Vec::new();
    let mut lows = Vec::new();
    for i in start..n - lookback {
        let window_h = &high[i - lookback..=i + lookback];
        if (high[i] - window_h.iter().cloned().fold(f64::MIN, f64::max)).abs() < f64::EPSILON {
            highs.push(RawLevel { price: high[i], source: "swing_fractal", is_support: false });
        }
        let window_l = &low[i - lookback..=i + lookback];
        if (low[i] - window_l.iter().cloned().fold(f64::MAX, f64::min)).abs() < f64::EPSILON {
            lows.push(RawLevel { price: low[i], source: "swing_fractal", is_support: true });
        }
    }

    let mut levels = Vec::new();
    levels.extend(highs.split_off(highs.len().saturating_sub(SWING_KEEP)));
    levels.extend(lows.split_off(lows.len().saturating_sub(SWING_KEEP)));
    levels
}

/// Volume-by-price histogram over 30 equal buckets spanning the
/// observed high/low range. Point of control is the highest-volume
/// bucket midpoint.
fn volume_profile(bars: &[OhlcvBar]) -> VpvrProfile {
    let lo = bars.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    let hi = bars.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let buckets_n = 30usize;
    let width = (hi - lo).max(1e-9) / buckets_n as f64;
    let mut vols = vec![0.0_f64; buckets_n];
    for bar in bars {
        let typical = (bar.high + bar.low + bar.close) / 3.0;
        let idx = (((typical - lo) / width) as usize).min(buckets_n - 1);
        vols[idx] += bar.volume;
    }
    let poc_idx = vols
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .map(|(i, _)| i)
        .unwrap_or(0);
    let buckets: Vec<VpvrPoint> = vols
        .iter()
        .enumerate()
        .map(|(i, v)| VpvrPoint {
            price_bucket: lo + width * (i as f64 + 0.5),
            volume: *v,
        })
        .collect();
    VpvrProfile {
        point_of_control: lo + width * (poc_idx as f64 + 0.5),
        buckets,
    }
}

pub fn analyze(bars: &[OhlcvBar], raw_pivots: &[f64]) -> SupportResistanceAnalysis {
    let high: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let low: Vec<f64> = bars.iter().map(|b| b.low).collect();
    let close: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let volume: Vec<f64> = bars.iter().map(|b| b.volume).collect();
    let price = *bars.last().map(|b| &b.close).unwrap_or(&0.0);

    let profile = volume_profile(bars);

    let mut raw_levels = swing_levels(&high, &low, 5);
    raw_levels.push(RawLevel {
        price: profile.point_of_control,
        source: "vpvr_poc",
        is_support: profile.point_of_control <= price,
    });

    for (source, level) in [
        ("ema10", ema(&close, 10).last().copied()),
        ("ema50", ema(&close, 50).last().copied()),
        ("ema100", ema(&close, 100).last().copied()),
        ("sma50", sma(&close, 50).last().copied()),
        ("vwap20", vwap_rolling(&high, &low, &close, &volume, 20).last().copied()),
    ] {
        if let Some(level) = level {
            raw_levels.push(RawLevel { price: level, source, is_support: level <= price });
        }
    }

    for pivot in raw_pivots {
        raw_levels.push(RawLevel {
            price: *pivot,
            source: "provider_pivot",
            is_support: *pivot <= price,
        });
    }

    raw_levels.sort_by(|a, b| a.price.partial_cmp(&b.price).unwrap());

    let mut zones: Vec<SrZone> = Vec::new();
    let mut i = 0;
    while i < raw_levels.len() {
        let mut j = i + 1;
        let mut cluster_prices = vec![raw_levels[i].price];
        let mut cluster_sources = vec![raw_levels[i].source.to_string()];
        let mut is_support = raw_levels[i].is_support;
        while j < raw_levels.len() {
            let gap_pct = (raw_levels[j].price - raw_levels[i].price) / raw_levels[i].price.abs().max(1e-9) * 100.0;
            if gap_pct <= CLUSTER_GAP_PCT {
                cluster_prices.push(raw_levels[j].price);
                cluster_sources.push(raw_levels[j].source.to_string());
                is_support = is_support || raw_levels[j].is_support;
                j += 1;
            } else {
                break;
            }
        }
        let avg = cluster_prices.iter().sum::<f64>() / cluster_prices.len() as f64;
        let lo = cluster_prices.iter().cloned().fold(f64::MAX, f64::min);
        let hi = cluster_prices.iter().cloned().fold(f64::MIN, f64::max);
        let mut distinct: Vec<&str> = cluster_sources.iter().map(|s| s.as_str()).collect();
        distinct.sort_unstable();
        distinct.dedup();
        zones.push(SrZone {
            zone_type: if is_support { ZoneType::Support } else { ZoneType::Resistance },
            price_range: [lo, hi],
            avg_price: avg,
            strength_score: (distinct.len() as f64 * 0.25).min(1.0),
            contributors: cluster_sources,
        });
        i = j;
    }

    let nearest_support = zones
        .iter()
        .filter(|z| matches!(z.zone_type, ZoneType::Support) && z.avg_price <= price)
        .max_by(|a, b| a.avg_price.partial_cmp(&b.avg_price).unwrap())
        .cloned();
    let nearest_resistance = zones
        .iter()
        .filter(|z| matches!(z.zone_type, ZoneType::Resistance) && z.avg_price >= price)
        .min_by(|a, b| a.avg_price.partial_cmp(&b.avg_price).unwrap())
        .cloned();

    SupportResistanceAnalysis {
        zones,
        volume_profile: profile,
        nearest_support,
        nearest_resistance,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn synth_bars(n: usize) -> Vec<OhlcvBar> {
        (0..n)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.25).sin() * 5.0;
                OhlcvBar {
                    date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(i as i64),
                    open: base,
                    high: base + 2.0,
                    low: base - 2.0,
                    close: base,
                    volume: 1_000_000.0,
                }
            })
            .collect()
    }

    #[test]
    fn all_zones_are_well_formed() {
        let report = analyze(&synth_bars(120), &[]);
        for zone in &report.zones {
            assert!(zone.is_well_formed());
        }
    }

    #[test]
    fn provider_pivots_feed_into_clustering() {
        let bars = synth_bars(120);
        let last_close = bars.last().unwrap().close;
        let report = analyze(&bars, &[last_close + 0.1]);
        assert!(!report.zones.is_empty());
    }

    #[test]
    fn moving_average_contributors_appear_in_zones() {
        let bars = synth_bars(120);
        let report = analyze(&bars, &[]);
        let all_sources: Vec<&str> =
            report.zones.iter().flat_map(|z| z.contributors.iter().map(|s| s.as_str())).collect();
        assert!(all_sources.iter().any(|s| s.starts_with("ema") || *s == "sma50" || *s == "vwap20"));
    }

    #[test]
    fn volume_profile_has_thirty_buckets() {
        let report = analyze(&synth_bars(120), &[]);
        assert_eq!(report.volume_profile.buckets.len(), 30);
    }
}
