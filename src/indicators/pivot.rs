// =============================================================================
// Pivot Point / Central Pivot Range (CPR) / Fibonacci retracement levels
// =============================================================================
//
// Classic floor-trader pivots computed from the prior period's high/low/close:
//   P  = (H + L + C) / 3
//   R1 = 2P - L        S1 = 2P - H
//   R2 = P + (H - L)   S2 = P - (H - L)
//
// CPR narrows this to just the pivot and its bounding channel:
//   BC (bottom central) = (H + L) / 2
//   TC (top central)    = (P - BC) + P
//
// Fibonacci retracement levels are computed over a swing high/low taken from
// the trailing `lookback` bars.
// =============================================================================

use crate::candle::Bar;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PivotLevels {
    pub pivot: f64,
    pub r1: f64,
    pub r2: f64,
    pub s1: f64,
    pub s2: f64,
}

/// Classic pivot levels from a single prior bar's H/L/C.
pub fn calculate_pivot(prior: &Bar) -> PivotLevels {
    let p = (prior.high + prior.low + prior.close) / 3.0;
    PivotLevels {
        pivot: p,
        r1: 2.0 * p - prior.low,
        r2: p + (prior.high - prior.low),
        s1: 2.0 * p - prior.high,
        s2: p - (prior.high - prior.low),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CprLevels {
    pub pivot: f64,
    pub top_central: f64,
    pub bottom_central: f64,
}

/// Central Pivot Range from a single prior bar's H/L/C.
pub fn calculate_cpr(prior: &Bar) -> CprLevels {
    let p = (prior.high + prior.low + prior.close) / 3.0;
    let bc = (prior.high + prior.low) / 2.0;
    let tc = (p - bc) + p;
    CprLevels {
        pivot: p,
        top_central: tc.max(bc),
        bottom_central: tc.min(bc),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FibLevels {
    pub swing_high: f64,
    pub swing_low: f64,
    pub level_382: f64,
    pub level_500: f64,
    pub level_618: f64,
}

/// Fibonacci retracement levels over the swing high/low of the trailing
/// `lookback` bars. Returns `None` if there aren't enough bars or the swing
/// range is degenerate.
pub fn calculate_fibonacci(bars: &[Bar], lookback: usize) -> Option<FibLevels> {
    if lookback == 0 || bars.len() < lookback {
        return None;
    }
    let window = &bars[bars.len() - lookback..];
    let swing_high = window.iter().map(|b| b.high).fold(f64::MIN, f64::max);
    let swing_low = window.iter().map(|b| b.low).fold(f64::MAX, f64::min);
    let range = swing_high - swing_low;
    if range <= 0.0 {
        return None;
    }
    Some(FibLevels {
        swing_high,
        swing_low,
        level_382: swing_high - range * 0.382,
        level_500: swing_high - range * 0.5,
        level_618: swing_high - range * 0.618,
    })
}
