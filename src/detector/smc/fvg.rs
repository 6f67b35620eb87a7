// Grounded on context.py's `detect_fvg_context`: a three-candle gap between
// candle i-2 and candle i (candle i-1's body may overlap either). Bullish
// gap when candle[i-2].high < candle[i].low; bearish when
// candle[i-2].low > candle[i].high. A gap is only signal-eligible while
// "fresh" — no later candle has traded back into it. The original emits a
// MarketContext; here that is mapped directly onto BUY (bullish fresh gap)
// / SELL (bearish fresh gap).

use std::collections::BTreeSet;

use crate::candle::{Bar, CandleWindow};
use crate::detector::{Detector, DetectorContext};
use crate::signal::{Action, Meta, Signal};

pub struct SmcFvgDetector {
    pub lookback: usize,
}

impl Default for SmcFvgDetector {
    fn default() -> Self {
        Self { lookback: 30 }
    }
}

struct Gap {
    direction: i8,
    top: f64,
    bottom: f64,
    index: usize,
}

impl SmcFvgDetector {
    fn find_gaps(&self, bars: &[Bar], end: usize) -> Vec<Gap> {
        let start = end.saturating_sub(self.lookback).max(2);
        let mut gaps = Vec::new();
        for i in start..=end {
            let left = &bars[i - 2];
            let right = &bars[i];
            if left.high < right.low {
                gaps.push(Gap {
                    direction: 1,
                    top: right.low,
                    bottom: left.high,
                    index: i,
                });
            } else if left.low > right.high {
                gaps.push(Gap {
                    direction: -1,
                    top: left.low,
                    bottom: right.high,
                    index: i,
                });
            }
        }
        gaps
    }

    fn is_fresh(&self, bars: &[Bar], gap: &Gap, end: usize) -> bool {
        if gap.index >= end {
            return true;
        }
        bars[gap.index + 1..=end]
            .iter()
            .all(|b| b.low > gap.top || b.high < gap.bottom)
    }

    fn avg_range(&self, bars: &[Bar], end: usize) -> f64 {
        let start = end.saturating_sub(19);
        let window = &bars[start..=end];
        window.iter().map(|b| b.high - b.low).sum::<f64>() / window.len() as f64
    }
}

impl Detector for SmcFvgDetector {
    fn name(&self) -> &str {
        "smc_fvg"
    }

    fn evaluate(&self, window: &CandleWindow, _ctx: &DetectorContext) -> Signal {
        let bars = window.bars();
        let timestamp = window.last().map(|b| b.timestamp).unwrap_or(0);

        if bars.len() < 5 {
            return Signal::hold("smc_fvg: not enough data", timestamp);
        }

        let end = bars.len() - 1;
        let avg_range = self.avg_range(bars, end);
        if avg_range <= 0.0 {
            return Signal::hold("smc_fvg: degenerate range", timestamp);
        }

        let gaps = self.find_gaps(bars, end);
        let current = &bars[end];

        let mut best: Option<(&Gap, f64)> = None;
        for gap in &gaps {
            let inside = current.low <= gap.top && current.high >= gap.bottom;
            if !inside {
                continue;
            }
            if !self.is_fresh(bars, gap, end.saturating_sub(1).max(gap.index)) {
                continue;
            }
            let gap_size = gap.top - gap.bottom;
            let strength = (gap_size / avg_range).min(1.0);
            let confidence = (0.4 + strength * 0.5).min(0.9);
            if best.map(|(_, c)| confidence > c).unwrap_or(true) {
                best = Some((gap, confidence));
            }
        }

        let (gap, confidence) = match best {
            Some(g) => g,
            None => return Signal::hold("smc_fvg: no fresh gap at price", timestamp),
        };

        if gap.direction > 0 {
            Signal::clamped(
                Action::Buy,
                confidence,
                vec![format!(
                    "Price retesting bullish FVG [{:.2}, {:.2}]",
                    gap.bottom, gap.top
                )],
                BTreeSet::from(["SMC:FVG".to_string(), "SMC:FVG_BULLISH".to_string()]),
                Meta::new(),
                timestamp,
            )
        } else {
            Signal::clamped(
                Action::Sell,
                confidence,
                vec![format!(
                    "Price retesting bearish FVG [{:.2}, {:.2}]",
                    gap.bottom, gap.top
                )],
                BTreeSet::from(["SMC:FVG".to_string(), "SMC:FVG_BEARISH".to_string()]),
                Meta::new(),
                timestamp,
            )
        }
    }
}
