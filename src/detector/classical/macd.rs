// Grounded on confluence_engine_adapter.py's `_detect_macd_signal`
// (prev/current crossover check against the signal line, fixed confidence
// 0.6).

use std::collections::BTreeSet;

use crate::candle::CandleWindow;
use crate::detector::{Detector, DetectorContext};
use crate::indicators::macd::calculate_macd_series;
use crate::signal::{Action, Meta, Signal};

pub struct MacdDetector {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

impl Default for MacdDetector {
    fn default() -> Self {
        Self {
            fast: 12,
            slow: 26,
            signal: 9,
        }
    }
}

impl Detector for MacdDetector {
    fn name(&self) -> &str {
        "macd"
    }

    fn evaluate(&self, window: &CandleWindow, _ctx: &DetectorContext) -> Signal {
        let timestamp = window.last().map(|b| b.timestamp).unwrap_or(0);
        let closes = window.closes();

        let (macd_line, signal_line) =
            match calculate_macd_series(&closes, self.fast, self.slow, self.signal) {
                Some(s) => s,
                None => return Signal::hold("macd: not enough data", timestamp),
            };

        if macd_line.len() < 2 || signal_line.len() < 2 {
            return Signal::hold("macd: not enough data", timestamp);
        }

        let (prev_macd, current_macd) = (macd_line[macd_line.len() - 2], *macd_line.last().unwrap());
        let (prev_signal, current_signal) = (
            signal_line[signal_line.len() - 2],
            *signal_line.last().unwrap(),
        );

        if prev_macd <= prev_signal && current_macd > current_signal {
            return Signal::clamped(
                Action::Buy,
                0.6,
                vec!["MACD bullish crossover".to_string()],
                BTreeSet::from(["CLASSIC:MACD_BULLISH_CROSS".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        if prev_macd >= prev_signal && current_macd < current_signal {
            return Signal::clamped(
                Action::Sell,
                0.6,
                vec!["MACD bearish crossover".to_string()],
                BTreeSet::from(["CLASSIC:MACD_BEARISH_CROSS".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        Signal::hold("macd: no cross", timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candle::Bar;

    fn window_from_closes(closes: &[f64]) -> CandleWindow {
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(i as i64, c, c + 0.5, c - 0.5, c, 100.0))
            .collect();
        CandleWindow::from_slice(&bars, bars.len())
    }

    #[test]
    fn insufficient_data_holds() {
        let d = MacdDetector::default();
        let window = window_from_closes(&(1..=20).map(|x| x as f64).collect::<Vec<_>>());
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        assert!(d.evaluate(&window, &ctx).is_hold());
    }

    #[test]
    fn flat_market_holds() {
        let d = MacdDetector::default();
        let window = window_from_closes(&vec![100.0; 100]);
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        assert!(d.evaluate(&window, &ctx).is_hold());
    }

    #[test]
    fn turnaround_produces_a_cross_eventually() {
        let d = MacdDetector::default();
        let mut closes: Vec<f64> = (0..80).map(|i| 100.0 - i as f64 * 0.5).collect();
        closes.extend((0..40).map(|i| closes.last().unwrap() + i as f64 * 2.0));
        let window = window_from_closes(&closes);
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        let signal = d.evaluate(&window, &ctx);
        assert!(signal.action == Action::Buy || signal.is_hold());
    }
}
