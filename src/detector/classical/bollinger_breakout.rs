// Note: named `bollinger_breakout` in the catalogue (spec.md §4.7) — this is
// the breakout read of the bands (close beyond a band signals continuation),
// the mirror image of confluence_engine_adapter.py's `_detect_bollinger_signal`
// which trades the reversion read (close beyond a band signals exhaustion).
// Confidence formula borrowed from the adapter; direction flipped to match
// the name.

use std::collections::BTreeSet;

use crate::candle::CandleWindow;
use crate::detector::{Detector, DetectorContext};
use crate::indicators::bollinger::calculate_bollinger;
use crate::signal::{Action, Meta, Signal};

pub struct BollingerBreakoutDetector {
    pub period: usize,
    pub std_dev: f64,
}

impl Default for BollingerBreakoutDetector {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev: 2.0,
        }
    }
}

impl Detector for BollingerBreakoutDetector {
    fn name(&self) -> &str {
        "bollinger_breakout"
    }

    fn evaluate(&self, window: &CandleWindow, _ctx: &DetectorContext) -> Signal {
        let timestamp = window.last().map(|b| b.timestamp).unwrap_or(0);
        let closes = window.closes();

        let bands = match calculate_bollinger(&closes, self.period, self.std_dev) {
            Some(b) => b,
            None => return Signal::hold("bollinger_breakout: not enough data", timestamp),
        };
        let price = match closes.last() {
            Some(&p) => p,
            None => return Signal::hold("bollinger_breakout: no price", timestamp),
        };

        if price > bands.upper {
            return Signal::clamped(
                Action::Buy,
                0.6,
                vec![format!(
                    "Price above upper BB: {:.2} > {:.2}",
                    price, bands.upper
                )],
                BTreeSet::from(["CLASSIC:BB_BREAKOUT_UP".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        if price < bands.lower {
            return Signal::clamped(
                Action::Sell,
                0.6,
                vec![format!(
                    "Price below lower BB: {:.2} < {:.2}",
                    price, bands.lower
                )],
                BTreeSet::from(["CLASSIC:BB_BREAKOUT_DOWN".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        Signal::hold("bollinger_breakout: inside bands", timestamp)
    }
}
