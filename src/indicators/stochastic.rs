// =============================================================================
// Stochastic Oscillator
// =============================================================================
//
// %K = (close - lowest_low(k_period)) / (highest_high(k_period) - lowest_low(k_period)) * 100
// %D = SMA(%K, d_period)
// =============================================================================

use crate::candle::Bar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StochasticResult {
    pub k: f64,
    pub d: f64,
}

/// Compute the full %K series for `bars` over `k_period`.
pub fn calculate_k_series(bars: &[Bar], k_period: usize) -> Vec<f64> {
    if k_period == 0 || bars.len() < k_period {
        return Vec::new();
    }
    let mut result = Vec::with_capacity(bars.len() - k_period + 1);
    for i in (k_period - 1)..bars.len() {
        let window = &bars[i + 1 - k_period..=i];
        let highest = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let lowest = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let range = highest - lowest;
        let k = if range == 0.0 {
            50.0
        } else {
            (bars[i].close - lowest) / range * 100.0
        };
        result.push(k);
    }
    result
}

/// Compute the full %D series (SMA of %K over `d_period`) from a %K series.
pub fn calculate_d_series(k_series: &[f64], d_period: usize) -> Vec<f64> {
    if d_period == 0 || k_series.len() < d_period {
        return Vec::new();
    }
    k_series
        .windows(d_period)
        .map(|w| w.iter().sum::<f64>() / d_period as f64)
        .collect()
}

/// Compute the most recent %K / %D pair.
pub fn calculate_stochastic(bars: &[Bar], k_period: usize, d_period: usize) -> Option<StochasticResult> {
    if d_period == 0 {
        return None;
    }
    let k_series = calculate_k_series(bars, k_period);
    if k_series.len() < d_period {
        return None;
    }
    let k = *k_series.last()?;
    let d: f64 = k_series[k_series.len() - d_period..].iter().sum::<f64>() / d_period as f64;
    if k.is_finite() && d.is_finite() {
        Some(StochasticResult { k, d })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(h: f64, l: f64, c: f64) -> Bar {
        Bar::new(0, c, h, l, c, 1.0)
    }

    #[test]
    fn stochastic_insufficient_data() {
        let bars = vec![bar(10.0, 9.0, 9.5); 5];
        assert!(calculate_stochastic(&bars, 14, 3).is_none());
    }

    #[test]
    fn stochastic_at_highest_high_is_100() {
        let mut bars = vec![bar(10.0, 9.0, 9.5); 16];
        bars.push(bar(12.0, 9.0, 12.0));
        let series = calculate_k_series(&bars, 14);
        assert!((series.last().unwrap() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn stochastic_flat_range_is_neutral() {
        let bars = vec![bar(10.0, 10.0, 10.0); 20];
        let series = calculate_k_series(&bars, 14);
        for v in series {
            assert!((v - 50.0).abs() < 1e-9);
        }
    }

    #[test]
    fn d_series_length_matches_k_minus_period_plus_one() {
        let k_series = vec![10.0, 20.0, 30.0, 40.0, 50.0];
        let d_series = calculate_d_series(&k_series, 3);
        assert_eq!(d_series.len(), 3);
        assert!((d_series[0] - 20.0).abs() < 1e-9);
    }

    #[test]
    fn stochastic_result_in_range() {
        let bars: Vec<Bar> = (0..30)
            .map(|i| {
                let base = 100.0 + (i as f64 * 0.3).sin() * 5.0;
                bar(base + 2.0, base - 2.0, base)
            })
            .collect();
        let result = calculate_stochastic(&bars, 14, 3).unwrap();
        assert!((0.0..=100.0).contains(&result.k));
    }
}
