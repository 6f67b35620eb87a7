// Grounded on confluence_engine_adapter.py's `_detect_adx_signal`: direction
// from +DI vs -DI, gated on ADX > threshold, confidence `min(0.4 + adx/100,
// 0.8)`.

use std::collections::BTreeSet;

use crate::candle::CandleWindow;
use crate::detector::{Detector, DetectorContext};
use crate::indicators::adx::{calculate_adx, calculate_di};
use crate::signal::{Action, Meta, Signal};

pub struct AdxDetector {
    pub period: usize,
    pub threshold: f64,
}

impl Default for AdxDetector {
    fn default() -> Self {
        Self {
            period: 14,
            threshold: 25.0,
        }
    }
}

impl Detector for AdxDetector {
    fn name(&self) -> &str {
        "adx"
    }

    fn evaluate(&self, window: &CandleWindow, _ctx: &DetectorContext) -> Signal {
        let timestamp = window.last().map(|b| b.timestamp).unwrap_or(0);
        let bars = window.bars();

        let adx = match calculate_adx(bars, self.period) {
            Some(v) => v,
            None => return Signal::hold("adx: not enough data", timestamp),
        };

        if adx <= self.threshold {
            return Signal::hold("adx: below trend threshold", timestamp);
        }

        let (plus_di, minus_di) = match calculate_di(bars, self.period) {
            Some(v) => v,
            None => return Signal::hold("adx: DI undefined", timestamp),
        };

        let confidence = (0.4 + adx / 100.0).min(0.8);

        if plus_di > minus_di {
            return Signal::clamped(
                Action::Buy,
                confidence,
                vec![format!(
                    "Strong uptrend: ADX={:.1}, +DI={:.1}",
                    adx, plus_di
                )],
                BTreeSet::from(["CLASSIC:ADX_UPTREND".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        if minus_di > plus_di {
            return Signal::clamped(
                Action::Sell,
                confidence,
                vec![format!(
                    "Strong downtrend: ADX={:.1}, -DI={:.1}",
                    adx, minus_di
                )],
                BTreeSet::from(["CLASSIC:ADX_DOWNTREND".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        Signal::hold("adx: DI tied", timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candle::Bar;

    fn candle(ts: i64, o: f64, h: f64, l: f64, c: f64) -> Bar {
        Bar::new(ts, o, h, l, c, 1.0)
    }

    #[test]
    fn insufficient_data_holds() {
        let d = AdxDetector::default();
        let bars = vec![candle(0, 1.0, 2.0, 0.5, 1.5); 10];
        let window = CandleWindow::from_slice(&bars, bars.len());
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        assert!(d.evaluate(&window, &ctx).is_hold());
    }

    #[test]
    fn strong_uptrend_buys() {
        let d = AdxDetector::default();
        let bars: Vec<Bar> = (0..60)
            .map(|i| {
                let base = 100.0 + i as f64 * 2.0;
                candle(i, base, base + 1.5, base - 0.5, base + 1.0)
            })
            .collect();
        let window = CandleWindow::from_slice(&bars, bars.len());
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        let signal = d.evaluate(&window, &ctx);
        assert_eq!(signal.action, Action::Buy);
    }

    #[test]
    fn flat_market_holds() {
        let d = AdxDetector::default();
        let bars = vec![candle(0, 100.0, 101.0, 99.0, 100.0); 60];
        let window = CandleWindow::from_slice(&bars, bars.len());
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        assert!(d.evaluate(&window, &ctx).is_hold());
    }
}
