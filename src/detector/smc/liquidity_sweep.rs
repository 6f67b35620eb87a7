// Grounded verbatim on market_structure.py's `detect_liquidity_sweep_advanced`:
// equal highs/lows (within `equal_tolerance`) mark resting liquidity; a sweep
// fires when the current bar's wick exceeds that level but the close snaps
// back inside it, gated by `body_ratio` (small body relative to range — a
// rejection wick, not a trend continuation). Premium/discount zone is the
// position of the close within the trailing range's midpoint.

use std::collections::BTreeSet;

use crate::candle::{Bar, CandleWindow};
use crate::detector::{Detector, DetectorContext};
use crate::signal::{Action, Meta, Signal};

pub struct SmcLiquiditySweepDetector {
    pub lookback: usize,
    pub equal_tolerance: f64,
    pub max_body_ratio: f64,
}

impl Default for SmcLiquiditySweepDetector {
    fn default() -> Self {
        Self {
            lookback: 20,
            equal_tolerance: 0.001,
            max_body_ratio: 0.5,
        }
    }
}

impl SmcLiquiditySweepDetector {
    fn has_equal_level(&self, bars: &[Bar], level: f64, tol: f64, use_high: bool) -> bool {
        bars.iter()
            .filter(|b| {
                let v = if use_high { b.high } else { b.low };
                (v - level).abs() <= tol
            })
            .count()
            >= 2
    }
}

impl Detector for SmcLiquiditySweepDetector {
    fn name(&self) -> &str {
        "smc_liquidity_sweep"
    }

    fn evaluate(&self, window: &CandleWindow, _ctx: &DetectorContext) -> Signal {
        let bars = window.bars();
        let timestamp = window.last().map(|b| b.timestamp).unwrap_or(0);

        if bars.len() < self.lookback + 1 {
            return Signal::hold("smc_liquidity_sweep: not enough data", timestamp);
        }

        let end = bars.len() - 1;
        let start = end + 1 - self.lookback;
        let prior = &bars[start..end];
        let current = &bars[end];

        let range_high = prior.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let range_low = prior.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let range = range_high - range_low;
        if range <= 0.0 {
            return Signal::hold("smc_liquidity_sweep: degenerate range", timestamp);
        }

        let body = (current.close - current.open).abs();
        let body_ratio = body / (current.high - current.low).max(1e-9);
        if body_ratio > self.max_body_ratio {
            return Signal::hold("smc_liquidity_sweep: body too large", timestamp);
        }

        let mid = (range_high + range_low) / 2.0;
        let tol = range * self.equal_tolerance;

        let swept_high = current.high > range_high && current.close < range_high;
        let swept_low = current.low < range_low && current.close > range_low;

        if swept_high {
            let wick = current.high - current.close.max(current.open);
            let base = (0.45 + (wick / range) * 0.3).min(0.75);
            let zone_boost = if current.close > mid { 0.1 } else { 0.0 };
            let equal_boost = if self.has_equal_level(prior, range_high, tol, true) {
                0.1
            } else {
                0.0
            };
            let confidence = (base + zone_boost + equal_boost).min(1.0);
            return Signal::clamped(
                Action::Sell,
                confidence,
                vec![
                    format!("Liquidity sweep above {:.2}, closed back inside", range_high),
                    "Premium zone rejection".to_string(),
                ],
                BTreeSet::from([
                    "SMC:LIQUIDITY_SWEEP".to_string(),
                    "SMC:SWEEP_HIGH".to_string(),
                ]),
                Meta::new(),
                timestamp,
            );
        }

        if swept_low {
            let wick = current.close.min(current.open) - current.low;
            let base = (0.45 + (wick / range) * 0.3).min(0.75);
            let zone_boost = if current.close < mid { 0.1 } else { 0.0 };
            let equal_boost = if self.has_equal_level(prior, range_low, tol, false) {
                0.1
            } else {
                0.0
            };
            let confidence = (base + zone_boost + equal_boost).min(1.0);
            return Signal::clamped(
                Action::Buy,
                confidence,
                vec![
                    format!("Liquidity sweep below {:.2}, closed back inside", range_low),
                    "Discount zone rejection".to_string(),
                ],
                BTreeSet::from([
                    "SMC:LIQUIDITY_SWEEP".to_string(),
                    "SMC:SWEEP_LOW".to_string(),
                ]),
                Meta::new(),
                timestamp,
            );
        }

        Signal::hold("smc_liquidity_sweep: no sweep", timestamp)
    }
}
