// No teacher-adapter counterpart; written fresh. Requires both a MACD
// crossover and RSI sitting on the matching half-plane (> 50 for bullish,
// < 50 for bearish) — a composite of the standalone `macd` and
// `rsi_mean_reversion` detectors' underlying math, reused directly rather
// than re-implemented.

use std::collections::BTreeSet;

use crate::candle::CandleWindow;
use crate::detector::{Detector, DetectorContext};
use crate::indicators::macd::calculate_macd_series;
use crate::indicators::rsi::calculate_rsi;
use crate::signal::{Action, Meta, Signal};

pub struct MomentumComboDetector {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
}

impl Default for MomentumComboDetector {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
        }
    }
}

impl Detector for MomentumComboDetector {
    fn name(&self) -> &str {
        "momentum_combo"
    }

    fn evaluate(&self, window: &CandleWindow, _ctx: &DetectorContext) -> Signal {
        let timestamp = window.last().map(|b| b.timestamp).unwrap_or(0);
        let closes = window.closes();

        let rsi_series = calculate_rsi(&closes, self.rsi_period);
        let (macd_line, signal_line) = match calculate_macd_series(
            &closes,
            self.macd_fast,
            self.macd_slow,
            self.macd_signal,
        ) {
            Some(s) => s,
            None => return Signal::hold("momentum_combo: not enough data", timestamp),
        };

        if rsi_series.is_empty() || macd_line.len() < 2 || signal_line.len() < 2 {
            return Signal::hold("momentum_combo: not enough data", timestamp);
        }

        let rsi = *rsi_series.last().unwrap();
        let (prev_macd, current_macd) = (macd_line[macd_line.len() - 2], *macd_line.last().unwrap());
        let (prev_signal, current_signal) = (
            signal_line[signal_line.len() - 2],
            *signal_line.last().unwrap(),
        );

        let bullish_cross = prev_macd <= prev_signal && current_macd > current_signal;
        let bearish_cross = prev_macd >= prev_signal && current_macd < current_signal;

        if bullish_cross && rsi > 50.0 {
            let confidence = (0.55 + (rsi - 50.0) / 100.0).min(0.9);
            return Signal::clamped(
                Action::Buy,
                confidence,
                vec![format!(
                    "MACD bullish cross with RSI={:.1} above midline",
                    rsi
                )],
                BTreeSet::from(["CLASSIC:MOMENTUM_COMBO_BULLISH".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        if bearish_cross && rsi < 50.0 {
            let confidence = (0.55 + (50.0 - rsi) / 100.0).min(0.9);
            return Signal::clamped(
                Action::Sell,
                confidence,
                vec![format!(
                    "MACD bearish cross with RSI={:.1} below midline",
                    rsi
                )],
                BTreeSet::from(["CLASSIC:MOMENTUM_COMBO_BEARISH".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        Signal::hold("momentum_combo: no confluence", timestamp)
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
        let d = MomentumComboDetector::default();
        let window = window_from_closes(&(1..=20).map(|x| x as f64).collect::<Vec<_>>());
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        assert!(d.evaluate(&window, &ctx).is_hold());
    }

    #[test]
    fn flat_market_holds() {
        let d = MomentumComboDetector::default();
        let window = window_from_closes(&vec![100.0; 100]);
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        assert!(d.evaluate(&window, &ctx).is_hold());
    }
}
