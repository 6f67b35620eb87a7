// Grounded on confluence_engine_adapter.py's `_detect_ema_signal` (prev/current
// crossover check, fixed confidence 0.6); periods follow spec.md's 12/26
// default rather than the adapter's 9/21.

use std::collections::BTreeSet;

use crate::candle::CandleWindow;
use crate::detector::{Detector, DetectorContext};
use crate::indicators::ema::calculate_ema;
use crate::signal::{Action, Meta, Signal};

pub struct EmaCrossoverDetector {
    pub fast: usize,
    pub slow: usize,
}

impl Default for EmaCrossoverDetector {
    fn default() -> Self {
        Self { fast: 12, slow: 26 }
    }
}

impl Detector for EmaCrossoverDetector {
    fn name(&self) -> &str {
        "ema_crossover"
    }

    fn evaluate(&self, window: &CandleWindow, _ctx: &DetectorContext) -> Signal {
        let timestamp = window.last().map(|b| b.timestamp).unwrap_or(0);
        let closes = window.closes();
        let ema_fast = calculate_ema(&closes, self.fast);
        let ema_slow = calculate_ema(&closes, self.slow);

        if ema_fast.len() < 2 || ema_slow.len() < 2 {
            return Signal::hold("ema_crossover: not enough data", timestamp);
        }

        let (prev_fast, current_fast) = (ema_fast[ema_fast.len() - 2], *ema_fast.last().unwrap());
        let (prev_slow, current_slow) = (ema_slow[ema_slow.len() - 2], *ema_slow.last().unwrap());

        if prev_fast <= prev_slow && current_fast > current_slow {
            return Signal::clamped(
                Action::Buy,
                0.6,
                vec!["EMA bullish crossover".to_string()],
                BTreeSet::from(["CLASSIC:EMA_BULLISH_CROSS".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        if prev_fast >= prev_slow && current_fast < current_slow {
            return Signal::clamped(
                Action::Sell,
                0.6,
                vec!["EMA bearish crossover".to_string()],
                BTreeSet::from(["CLASSIC:EMA_BEARISH_CROSS".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        Signal::hold("ema_crossover: no cross", timestamp)
    }
}
