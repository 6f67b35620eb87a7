// =============================================================================
// Volume-Weighted Average Price (VWAP)
// =============================================================================
//
// VWAP = Σ(typical_price * volume) / Σ(volume), typical_price = (H+L+C)/3.
// Computed over the whole window passed in — callers decide the session
// boundary (the detector passes the trailing window it was given).
// =============================================================================

use crate::candle::Bar;

/// Compute VWAP over `bars`. Returns `None` for an empty slice or zero total
/// volume.
pub fn calculate_vwap(bars: &[Bar]) -> Option<f64> {
    if bars.is_empty() {
        return None;
    }
    let mut pv_sum = 0.0;
    let mut vol_sum = 0.0;
    for b in bars {
        let typical = (b.high + b.low + b.close) / 3.0;
        pv_sum += typical * b.volume;
        vol_sum += b.volume;
    }
    if vol_sum == 0.0 {
        return None;
    }
    let vwap = pv_sum / vol_sum;
    if vwap.is_finite() {
        Some(vwap)
    } else {
        None
    }
}

/// Deviation of the last close from VWAP, as a fraction of VWAP
/// (e.g. `0.01` means 1% above VWAP).
pub fn vwap_deviation(bars: &[Bar]) -> Option<f64> {
    let vwap = calculate_vwap(bars)?;
    if vwap == 0.0 {
        return None;
    }
    let close = bars.last()?.close;
    Some((close - vwap) / vwap)
}
