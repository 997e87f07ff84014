use serde::Serialize;
use tse_core::OhlcvBar;

const BLOCKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const DOJI_THRESHOLD: f64 = 0.0005;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum BarCategory {
    Up,
    Down,
    Doji,
}

fn categorize(bar: &OhlcvBar) -> BarCategory {
    if bar.open != 0.0 && ((bar.close - bar.open).abs() / bar.open) < DOJI_THRESHOLD {
        BarCategory::Doji
    } else if bar.close >= bar.open {
        BarCategory::Up
    } else {
        BarCategory::Down
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SparklineReport {
    pub glyphs: String,
    pub categories: Vec<BarCategory>,
    pub doji_ratio: f64,
}

/// Renders the trailing `window` closes as an 8-level Unicode block
/// sparkline, scaled against the window's own min/max.
pub fn render(bars: &[OhlcvBar], window: usize) -> SparklineReport {
    let slice: Vec<&OhlcvBar> = bars.iter().rev().take(window).collect();
    let slice: Vec<&OhlcvBar> = slice.into_iter().rev().collect();

    let closes: Vec<f64> = slice.iter().map(|b| b.close).collect();
    let lo = closes.iter().cloned().fold(f64::MAX, f64::min);
    let hi = closes.iter().cloned().fold(f64::MIN, f64::max);
    let span = (hi - lo).max(1e-9);

    let glyphs: String = closes
        .iter()
        .map(|c| {
            let level = (((c - lo) / span) * (BLOCKS.len() - 1) as f64).round() as usize;
            BLOCKS[level.min(BLOCKS.len() - 1)]
        })
        .collect();

    let categories: Vec<BarCategory> = slice.iter().map(|b| categorize(b)).collect();
    let doji_ratio = if categories.is_empty() {
        0.0
    } else {
        categories.iter().filter(|c| **c == BarCategory::Doji).count() as f64 / categories.len() as f64
    };

    SparklineReport {
        glyphs,
        categories,
        doji_ratio,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn bar(open: f64, close: f64) -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            open,
            high: open.max(close) + 0.1,
            low: open.min(close) - 0.1,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn doji_threshold_catches_near_flat_bars() {
        assert_eq!(categorize(&bar(100.0, 100.01)), BarCategory::Doji);
        assert_eq!(categorize(&bar(100.0, 101.0)), BarCategory::Up);
        assert_eq!(categorize(&bar(100.0, 99.0)), BarCategory::Down);
    }

    #[test]
    fn glyph_length_matches_window() {
        let bars: Vec<OhlcvBar> = (0..30).map(|i| bar(100.0 + i as f64, 100.5 + i as f64)).collect();
        let report = render(&bars, 14);
        assert_eq!(report.glyphs.chars().count(), 14);
        assert_eq!(report.categories.len(), 14);
    }
}
