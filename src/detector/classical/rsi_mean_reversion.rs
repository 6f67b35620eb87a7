// Grounded on confluence_engine_adapter.py's `_detect_rsi_signal` for the
// confidence formula; the action rule is spec's "exit from extreme" variant
// rather than the adapter's plain threshold crossing (a signal on every bar
// the RSI sits below 30 would repeat indefinitely — exit-from-oversold fires
// once, on the bar the RSI crosses back).

use std::collections::BTreeSet;

use crate::candle::CandleWindow;
use crate::detector::{Detector, DetectorContext};
use crate::indicators::rsi::calculate_rsi;
use crate::signal::{Action, Meta, Signal};

pub struct RsiMeanReversionDetector {
    pub period: usize,
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for RsiMeanReversionDetector {
    fn default() -> Self {
        Self {
            period: 14,
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

impl Detector for RsiMeanReversionDetector {
    fn name(&self) -> &str {
        "rsi_mean_reversion"
    }

    fn evaluate(&self, window: &CandleWindow, _ctx: &DetectorContext) -> Signal {
        let timestamp = window.last().map(|b| b.timestamp).unwrap_or(0);
        let closes = window.closes();
        let series = calculate_rsi(&closes, self.period);

        if series.len() < 2 {
            return Signal::hold("rsi: not enough data", timestamp);
        }

        let prev = series[series.len() - 2];
        let current = *series.last().unwrap();

        if prev < self.oversold && current >= self.oversold {
            let confidence = (0.5 + (self.oversold - prev) / 60.0).min(0.9);
            return Signal::clamped(
                Action::Buy,
                confidence,
                vec![format!(
                    "RSI exited oversold: {:.1} -> {:.1}",
                    prev, current
                )],
                BTreeSet::from(["CLASSIC:RSI_OVERSOLD_EXIT".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        if prev > self.overbought && current <= self.overbought {
            let confidence = (0.5 + (prev - self.overbought) / 60.0).min(0.9);
            return Signal::clamped(
                Action::Sell,
                confidence,
                vec![format!(
                    "RSI exited overbought: {:.1} -> {:.1}",
                    prev, current
                )],
                BTreeSet::from(["CLASSIC:RSI_OVERBOUGHT_EXIT".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        Signal::hold("rsi: no exit-from-extreme", timestamp)
    }
}
