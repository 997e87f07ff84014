//! Pure numerical building blocks shared by every worker analyzer.
//!
//! Every series function returns a vector the same length as its input,
//! with the unstable warm-up prefix filled forward from the first
//! computable value rather than left as `NaN` — callers only ever read
//! the tail of these series, but a same-length output keeps index
//! arithmetic (slope windows, percentile windows) simple everywhere
//! else in the kernel.

pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![0.0; n];
    if period == 0 || n == 0 {
        return out;
    }
    let mut running = 0.0;
    for i in 0..n {
        running += values[i];
        if i >= period {
            running -= values[i - period];
        }
        let window = (i + 1).min(period);
        out[i] = running / window as f64;
    }
    out
}

pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![0.0; n];
    if n == 0 || period == 0 {
        return out;
    }
    let seed_len = period.min(n);
    let seed: f64 = values[..seed_len].iter().sum::<f64>() / seed_len as f64;
    for v in out.iter_mut().take(seed_len) {
        *v = seed;
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    for i in seed_len..n {
        out[i] = (values[i] - out[i - 1]) * alpha + out[i - 1];
    }
    out
}

pub fn true_range(high: &[f64], low: &[f64], close: &[f64]) -> Vec<f64> {
    let n = high.len();
    let mut tr = vec![0.0; n];
    for i in 0..n {
        let prev_close = if i == 0 { close[i] } else { close[i - 1] };
        let a = high[i] - low[i];
        let b = (high[i] - prev_close).abs();
        let c = (low[i] - prev_close).abs();
        tr[i] = a.max(b).max(c);
    }
    tr
}

/// Wilder's smoothed average true range.
pub fn atr(high: &[f64], low: &[f64], close: &[f64], period: usize) -> Vec<f64> {
    wilder_smooth(&true_range(high, low, close), period)
}

fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![0.0; n];
    if n == 0 || period == 0 {
        return out;
    }
    let seed_len = period.min(n);
    let seed: f64 = values[..seed_len].iter().sum::<f64>() / seed_len as f64;
    for v in out.iter_mut().take(seed_len) {
        *v = seed;
    }
    for i in seed_len..n {
        out[i] = (out[i - 1] * (period as f64 - 1.0) + values[i]) / period as f64;
    }
    out
}

pub fn rsi(close: &[f64], period: usize) -> Vec<f64> {
    let n = close.len();
    let mut gains = vec![0.0; n];
    let mut losses = vec![0.0; n];
    for i in 1..n {
        let delta = close[i] - close[i - 1];
        if delta > 0.0 {
            gains[i] = delta;
        } else {
            losses[i] = -delta;
        }
    }
    let avg_gain = wilder_smooth(&gains, period);
    let avg_loss = wilder_smooth(&losses, period);
    let mut out = vec![50.0; n];
    for i in 0..n {
        out[i] = if avg_loss[i] == 0.0 {
            100.0
        } else {
            let rs = avg_gain[i] / avg_loss[i];
            100.0 - (100.0 / (1.0 + rs))
        };
    }
    out
}

pub struct MacdResult {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub fn macd(close: &[f64], fast: usize, slow: usize, signal: usize) -> MacdResult {
    let fast_ema = ema(close, fast);
    let slow_ema = ema(close, slow);
    let macd_line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal_line = ema(&macd_line, signal);
    let histogram: Vec<f64> = macd_line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();
    MacdResult {
        macd_line,
        signal_line,
        histogram,
    }
}

pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn bollinger_bands(close: &[f64], period: usize, num_dev: f64) -> BollingerBands {
    let n = close.len();
    let middle = sma(close, period);
    let mut upper = vec![0.0; n];
    let mut lower = vec![0.0; n];
    for i in 0..n {
        let start = i + 1 - period.min(i + 1);
        let window = &close[start..=i];
        let mean = middle[i];
        let variance =
            window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / window.len() as f64;
        let std_dev = variance.sqrt();
        upper[i] = mean + num_dev * std_dev;
        lower[i] = mean - num_dev * std_dev;
    }
    BollingerBands {
        upper,
        middle,
        lower,
    }
}

pub struct KeltnerChannels {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

pub fn keltner_channels(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    period: usize,
    mult: f64,
) -> KeltnerChannels {
    let middle = ema(close, period);
    let atr_band = atr(high, low, close, period);
    let upper: Vec<f64> = middle.iter().zip(&atr_band).map(|(m, a)| m + mult * a).collect();
    let lower: Vec<f64> = middle.iter().zip(&atr_band).map(|(m, a)| m - mult * a).collect();
    KeltnerChannels {
        upper,
        middle,
        lower,
    }
}

pub struct AdxResult {
    pub adx: Vec<f64>,
    pub plus_di: Vec<f64>,
    pub minus_di: Vec<f64>,
}

pub fn adx(high: &[f64], low: &[f64], close: &[f64], period: usize) -> AdxResult {
    let n = high.len();
    let mut plus_dm = vec![0.0; n];
    let mut minus_dm = vec![0.0; n];
    for i in 1..n {
        let up_move = high[i] - high[i - 1];
        let down_move = low[i - 1] - low[i];
        if up_move > down_move && up_move > 0.0 {
            plus_dm[i] = up_move;
        }
        if down_move > up_move && down_move > 0.0 {
            minus_dm[i] = down_move;
        }
    }
    let tr = true_range(high, low, close);
    let atr_smooth = wilder_smooth(&tr, period);
    let plus_dm_smooth = wilder_smooth(&plus_dm, period);
    let minus_dm_smooth = wilder_smooth(&minus_dm, period);

    let mut plus_di = vec![0.0; n];
    let mut minus_di = vec![0.0; n];
    let mut dx = vec![0.0; n];
    for i in 0..n {
        plus_di[i] = if atr_smooth[i] == 0.0 {
            0.0
        } else {
            100.0 * plus_dm_smooth[i] / atr_smooth[i]
        };
        minus_di[i] = if atr_smooth[i] == 0.0 {
            0.0
        } else {
            100.0 * minus_dm_smooth[i] / atr_smooth[i]
        };
        let sum = plus_di[i] + minus_di[i];
        dx[i] = if sum == 0.0 {
            0.0
        } else {
            100.0 * (plus_di[i] - minus_di[i]).abs() / sum
        };
    }
    let adx_line = wilder_smooth(&dx, period);
    AdxResult {
        adx: adx_line,
        plus_di,
        minus_di,
    }
}

pub fn obv(close: &[f64], volume: &[f64]) -> Vec<f64> {
    let n = close.len();
    let mut out = vec![0.0; n];
    for i in 1..n {
        out[i] = if close[i] > close[i - 1] {
            out[i - 1] + volume[i]
        } else if close[i] < close[i - 1] {
            out[i - 1] - volume[i]
        } else {
            out[i - 1]
        };
    }
    out
}

pub fn cumulative_volume_delta(open: &[f64], close: &[f64], volume: &[f64]) -> Vec<f64> {
    let n = open.len();
    let mut out = vec![0.0; n];
    let mut running = 0.0;
    for i in 0..n {
        running += if close[i] >= open[i] { volume[i] } else { -volume[i] };
        out[i] = running;
    }
    out
}

pub fn mfi(high: &[f64], low: &[f64], close: &[f64], volume: &[f64], period: usize) -> Vec<f64> {
    let n = high.len();
    let typical: Vec<f64> = (0..n).map(|i| (high[i] + low[i] + close[i]) / 3.0).collect();
    let raw_money_flow: Vec<f64> = (0..n).map(|i| typical[i] * volume[i]).collect();
    let mut out = vec![50.0; n];
    for i in 0..n {
        let start = i + 1 - period.min(i + 1);
        let mut pos = 0.0;
        let mut neg = 0.0;
        for j in (start + 1)..=i {
            if typical[j] > typical[j - 1] {
                pos += raw_money_flow[j];
            } else if typical[j] < typical[j - 1] {
                neg += raw_money_flow[j];
            }
        }
        out[i] = if neg == 0.0 {
            100.0
        } else {
            let ratio = pos / neg;
            100.0 - (100.0 / (1.0 + ratio))
        };
    }
    out
}

pub fn vwap_rolling(high: &[f64], low: &[f64], close: &[f64], volume: &[f64], period: usize) -> Vec<f64> {
    let n = high.len();
    let typical: Vec<f64> = (0..n).map(|i| (high[i] + low[i] + close[i]) / 3.0).collect();
    let mut out = vec![0.0; n];
    for i in 0..n {
        let start = i + 1 - period.min(i + 1);
        let pv: f64 = (start..=i).map(|j| typical[j] * volume[j]).sum();
        let v: f64 = volume[start..=i].iter().sum();
        out[i] = if v == 0.0 { typical[i] } else { pv / v };
    }
    out
}

pub struct IchimokuResult {
    pub tenkan_sen: Vec<f64>,
    pub kijun_sen: Vec<f64>,
    pub senkou_span_a: Vec<f64>,
    pub senkou_span_b: Vec<f64>,
}

fn period_midpoint(high: &[f64], low: &[f64], period: usize, i: usize) -> f64 {
    let start = i + 1 - period.min(i + 1);
    let hh = high[start..=i].iter().cloned().fold(f64::MIN, f64::max);
    let ll = low[start..=i].iter().cloned().fold(f64::MAX, f64::min);
    (hh + ll) / 2.0
}

pub fn ichimoku(high: &[f64], low: &[f64], tenkan: usize, kijun: usize, senkou_b: usize, displacement: usize) -> IchimokuResult {
    let n = high.len();
    let mut tenkan_sen = vec![0.0; n];
    let mut kijun_sen = vec![0.0; n];
    for i in 0..n {
        tenkan_sen[i] = period_midpoint(high, low, tenkan, i);
        kijun_sen[i] = period_midpoint(high, low, kijun, i);
    }
    let base_a: Vec<f64> = tenkan_sen.iter().zip(&kijun_sen).map(|(t, k)| (t + k) / 2.0).collect();
    let mut base_b = vec![0.0; n];
    for i in 0..n {
        base_b[i] = period_midpoint(high, low, senkou_b, i);
    }
    // Shift forward by `displacement`: the value plotted at index i was
    // computed `displacement` bars earlier. We only ever read the last
    // element, so shifting in-place (reading from i - displacement) is
    // equivalent and avoids allocating beyond the series length.
    let mut senkou_span_a = vec![0.0; n];
    let mut senkou_span_b = vec![0.0; n];
    for i in 0..n {
        if i >= displacement {
            senkou_span_a[i] = base_a[i - displacement];
            senkou_span_b[i] = base_b[i - displacement];
        } else {
            senkou_span_a[i] = base_a[0];
            senkou_span_b[i] = base_b[0];
        }
    }
    IchimokuResult {
        tenkan_sen,
        kijun_sen,
        senkou_span_a,
        senkou_span_b,
    }
}

/// Linear regression of the last `horizon` points of `series`.
/// Returns `(slope, r_squared)`; `(0.0, 0.0)` on insufficient data or NaN.
pub fn linreg_slope_r2(series: &[f64], horizon: usize) -> (f64, f64) {
    if series.len() < horizon || horizon < 2 {
        return (0.0, 0.0);
    }
    let y = &series[series.len() - horizon..];
    let n = y.len() as f64;
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = y.iter().sum::<f64>() / n;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (i, &yi) in y.iter().enumerate() {
        let dx = i as f64 - x_mean;
        sxy += dx * (yi - y_mean);
        sxx += dx * dx;
    }
    if sxx == 0.0 {
        return (0.0, 0.0);
    }
    let slope = sxy / sxx;
    let intercept = y_mean - slope * x_mean;

    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (i, &yi) in y.iter().enumerate() {
        let pred = slope * i as f64 + intercept;
        ss_res += (yi - pred).powi(2);
        ss_tot += (yi - y_mean).powi(2);
    }
    let r2 = if ss_tot == 0.0 { 0.0 } else { 1.0 - ss_res / ss_tot };
    if slope.is_nan() || r2.is_nan() {
        (0.0, 0.0)
    } else {
        (slope, r2.clamp(0.0, 1.0))
    }
}

/// Percentile rank (0..100) of the last value of `series` within the
/// trailing `window` points.
pub fn percentile_rank(series: &[f64], window: usize) -> f64 {
    if series.is_empty() {
        return 0.0;
    }
    let start = series.len().saturating_sub(window);
    let recent = &series[start..];
    let current = *series.last().unwrap();
    let less = recent.iter().filter(|&&v| v < current).count() as f64;
    let equal = recent.iter().filter(|&&v| v == current).count() as f64;
    100.0 * (less + 0.5 * equal) / recent.len() as f64
}

pub fn log_returns(close: &[f64]) -> Vec<f64> {
    let n = close.len();
    let mut out = vec![0.0; n];
    for i in 1..n {
        out[i] = if close[i - 1] > 0.0 {
            (close[i] / close[i - 1]).ln()
        } else {
            0.0
        };
    }
    out
}

pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let mut out = vec![0.0; n];
    for i in 0..n {
        let start = i + 1 - window.min(i + 1);
        let slice = &values[start..=i];
        let mean = slice.iter().sum::<f64>() / slice.len() as f64;
        let var = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / slice.len() as f64;
        out[i] = var.sqrt();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rising_series(n: usize) -> Vec<f64> {
        (0..n).map(|i| 100.0 + i as f64).collect()
    }

    #[test]
    fn ema_matches_input_length() {
        let v = rising_series(30);
        assert_eq!(ema(&v, 10).len(), v.len());
    }

    #[test]
    fn linreg_perfectly_linear_series_has_r2_one() {
        let v = rising_series(20);
        let (slope, r2) = linreg_slope_r2(&v, 10);
        assert!((slope - 1.0).abs() < 1e-9);
        assert!((r2 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn linreg_insufficient_data_returns_zero() {
        let v = vec![1.0, 2.0];
        assert_eq!(linreg_slope_r2(&v, 10), (0.0, 0.0));
    }

    #[test]
    fn rsi_all_gains_is_100() {
        let v = rising_series(30);
        let r = rsi(&v, 14);
        assert!((r[r.len() - 1] - 100.0).abs() < 1e-6);
    }

    #[test]
    fn percentile_rank_of_max_is_100() {
        let v = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile_rank(&v, 5), 100.0);
    }

    #[test]
    fn zero_volume_bars_do_not_panic_mfi() {
        let h = vec![10.0; 20];
        let l = vec![9.0; 20];
        let c = vec![9.5; 20];
        let v = vec![0.0; 20];
        let m = mfi(&h, &l, &c, &v, 14);
        assert_eq!(m.len(), 20);
        assert!(m.iter().all(|x| x.is_finite()));
    }
}
