// Grounded verbatim on market_structure.py's `detect_choch_advanced`. The
// original reads `state.last_bos`, set by a prior call to
// `detect_bos_advanced`; here that is reconstructed by replaying
// `SmcBosDetector::detect_at` across the window's history (see smc/mod.rs).

use std::collections::BTreeSet;

use crate::candle::CandleWindow;
use crate::detector::smc::bos::SmcBosDetector;
use crate::detector::{Detector, DetectorContext};
use crate::signal::{Action, Meta, Signal};

pub struct SmcChochDetector {
    bos: SmcBosDetector,
}

impl Default for SmcChochDetector {
    fn default() -> Self {
        Self {
            bos: SmcBosDetector::default(),
        }
    }
}

impl Detector for SmcChochDetector {
    fn name(&self) -> &str {
        "smc_choch"
    }

    fn evaluate(&self, window: &CandleWindow, _ctx: &DetectorContext) -> Signal {
        let bars = window.bars();
        let timestamp = window.last().map(|b| b.timestamp).unwrap_or(0);

        if bars.len() < 11 {
            return Signal::hold("smc_choch: not enough data", timestamp);
        }

        // Replay BOS across every prefix up to (but excluding) the current
        // bar, keeping the most recent event found.
        let last = bars.len() - 1;
        let mut last_bos = None;
        for at in 9..last {
            if let Some(event) = self.bos.detect_at(bars, at) {
                last_bos = Some(event);
            }
        }

        let bos_event = match last_bos {
            Some(e) => e,
            None => return Signal::hold("smc_choch: no prior BOS", timestamp),
        };

        let recent_candles = (last - bos_event.index).min(10);
        if recent_candles < 2 {
            return Signal::hold("smc_choch: awaiting confirmation", timestamp);
        }

        let tail = &bars[bos_event.index..=last];
        let current_close = bars[last].close;
        let confidence = (0.65 + recent_candles as f64 * 0.05).min(1.0);

        if bos_event.direction > 0 {
            // prior trend bullish — CHoCH bearish if close breaks below the
            // trailing-3 low seen before the current bar.
            let window_before_last = &tail[..tail.len() - 1];
            let threshold = window_before_last
                .iter()
                .rev()
                .take(3)
                .map(|b| b.low)
                .fold(f64::MAX, f64::min);

            if current_close < threshold {
                return Signal::clamped(
                    Action::Sell,
                    confidence,
                    vec![
                        "CHoCH Bearish: bullish trend invalidated".to_string(),
                        format!("Prior BOS @ {:.2} broken", bos_event.swing_extreme),
                        format!("Confirmed after {recent_candles} candles"),
                    ],
                    BTreeSet::from([
                        "SMC:CHOCH".to_string(),
                        "SMC:CHOCH_BEARISH".to_string(),
                    ]),
                    Meta::new(),
                    timestamp,
                );
            }
        } else {
            let window_before_last = &tail[..tail.len() - 1];
            let threshold = window_before_last
                .iter()
                .rev()
                .take(3)
                .map(|b| b.high)
                .fold(f64::MIN, f64::max);

            if current_close > threshold {
                return Signal::clamped(
                    Action::Buy,
                    confidence,
                    vec![
                        "CHoCH Bullish: bearish trend invalidated".to_string(),
                        format!("Prior BOS @ {:.2} broken", bos_event.swing_extreme),
                        format!("Confirmed after {recent_candles} candles"),
                    ],
                    BTreeSet::from([
                        "SMC:CHOCH".to_string(),
                        "SMC:CHOCH_BULLISH".to_string(),
                    ]),
                    Meta::new(),
                    timestamp,
                );
            }
        }

        Signal::hold("smc_choch: no reversal confirmation", timestamp)
    }
}
