// =============================================================================
// Williams %R
// =============================================================================
//
// %R = (highest_high(period) - close) / (highest_high(period) - lowest_low(period)) * -100
//
// Range is [-100, 0]. Below -80 is oversold, above -20 is overbought.
// =============================================================================

use crate::candle::Bar;

/// Compute the most recent Williams %R value.
pub fn calculate_williams_r(bars: &[Bar], period: usize) -> Option<f64> {
    if period == 0 || bars.len() < period {
        return None;
    }
    let window = &bars[bars.len() - period..];
    let highest = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let lowest = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    let range = highest - lowest;
    let close = bars.last()?.close;

    let r = if range == 0.0 {
        -50.0
    } else {
        (highest - close) / range * -100.0
    };

    if r.is_finite() {
        Some(r)
    } else {
        None
    }
}
