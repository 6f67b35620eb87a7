// Catalogue semantics (spec.md §4.7) are "exit-from-extreme", the same
// family as rsi_mean_reversion, rather than confluence_engine_adapter.py's
// `_detect_williams_signal` plain-threshold read; confidence formula is
// adapted from the adapter's but keyed on how deep the prior bar sat in the
// extreme before exiting.

use std::collections::BTreeSet;

use crate::candle::CandleWindow;
use crate::detector::{Detector, DetectorContext};
use crate::indicators::williams_r::calculate_williams_r;
use crate::signal::{Action, Meta, Signal};

pub struct WilliamsRDetector {
    pub period: usize,
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for WilliamsRDetector {
    fn default() -> Self {
        Self {
            period: 14,
            oversold: -80.0,
            overbought: -20.0,
        }
    }
}

impl Detector for WilliamsRDetector {
    fn name(&self) -> &str {
        "williams_r"
    }

    fn evaluate(&self, window: &CandleWindow, _ctx: &DetectorContext) -> Signal {
        let timestamp = window.last().map(|b| b.timestamp).unwrap_or(0);
        let bars = window.bars();

        if bars.len() < self.period + 1 {
            return Signal::hold("williams_r: not enough data", timestamp);
        }

        let current = match calculate_williams_r(bars, self.period) {
            Some(v) => v,
            None => return Signal::hold("williams_r: undefined", timestamp),
        };
        let prev = match calculate_williams_r(&bars[..bars.len() - 1], self.period) {
            Some(v) => v,
            None => return Signal::hold("williams_r: undefined", timestamp),
        };

        if prev < self.oversold && current >= self.oversold {
            let confidence = (0.5 + (self.oversold - prev) / -40.0).min(0.9);
            return Signal::clamped(
                Action::Buy,
                confidence,
                vec![format!("Williams %R exited oversold: {:.1}", prev)],
                BTreeSet::from(["CLASSIC:WILLR_OVERSOLD_EXIT".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        if prev > self.overbought && current <= self.overbought {
            let confidence = (0.5 + (prev - self.overbought) / 40.0).min(0.9);
            return Signal::clamped(
                Action::Sell,
                confidence,
                vec![format!("Williams %R exited overbought: {:.1}", prev)],
                BTreeSet::from(["CLASSIC:WILLR_OVERBOUGHT_EXIT".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        Signal::hold("williams_r: no exit-from-extreme", timestamp)
    }
}
