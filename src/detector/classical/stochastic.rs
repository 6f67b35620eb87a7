// Grounded on confluence_engine_adapter.py's `_detect_stochastic_signal`:
// %K/%D cross required AND the cross must land in the extreme zone
// (current_k < oversold for BUY, current_k > overbought for SELL).

use std::collections::BTreeSet;

use crate::candle::CandleWindow;
use crate::detector::{Detector, DetectorContext};
use crate::indicators::stochastic::{calculate_d_series, calculate_k_series};
use crate::signal::{Action, Meta, Signal};

pub struct StochasticDetector {
    pub k_period: usize,
    pub d_period: usize,
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for StochasticDetector {
    fn default() -> Self {
        Self {
            k_period: 14,
            d_period: 3,
            oversold: 20.0,
            overbought: 80.0,
        }
    }
}

impl Detector for StochasticDetector {
    fn name(&self) -> &str {
        "stochastic"
    }

    fn evaluate(&self, window: &CandleWindow, _ctx: &DetectorContext) -> Signal {
        let timestamp = window.last().map(|b| b.timestamp).unwrap_or(0);
        let bars = window.bars();

        let k_series = calculate_k_series(bars, self.k_period);
        let d_series = calculate_d_series(&k_series, self.d_period);

        if k_series.len() < 2 || d_series.len() < 2 {
            return Signal::hold("stochastic: not enough data", timestamp);
        }

        let current_k = *k_series.last().unwrap();
        let prev_k = k_series[k_series.len() - 2];
        let current_d = *d_series.last().unwrap();
        let prev_d = d_series[d_series.len() - 2];

        if prev_k <= prev_d && current_k > current_d && current_k < self.oversold {
            return Signal::clamped(
                Action::Buy,
                0.6,
                vec![format!(
                    "Stochastic bullish cross in oversold: %K={:.1}",
                    current_k
                )],
                BTreeSet::from(["CLASSIC:STOCH_OVERSOLD_CROSS".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        if prev_k >= prev_d && current_k < current_d && current_k > self.overbought {
            return Signal::clamped(
                Action::Sell,
                0.6,
                vec![format!(
                    "Stochastic bearish cross in overbought: %K={:.1}",
                    current_k
                )],
                BTreeSet::from(["CLASSIC:STOCH_OVERBOUGHT_CROSS".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        Signal::hold("stochastic: no extreme cross", timestamp)
    }
}
