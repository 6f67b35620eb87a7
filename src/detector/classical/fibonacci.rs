// Grounded verbatim on confluence_engine_adapter.py's `_detect_fibonacci_signal`:
// swing high/low over the trailing `lookback` bars, tolerance as a fraction
// of the swing range, BUY-only reversion at the 0.618 and 0.382 retracement
// levels (the original never emits SELL here — it treats Fibonacci purely as
// pullback-entry confirmation in an assumed uptrend).

use std::collections::BTreeSet;

use crate::candle::CandleWindow;
use crate::detector::{Detector, DetectorContext};
use crate::indicators::pivot::calculate_fibonacci;
use crate::signal::{Action, Meta, Signal};

pub struct FibonacciDetector {
    pub lookback: usize,
    pub tolerance: f64,
}

impl Default for FibonacciDetector {
    fn default() -> Self {
        Self {
            lookback: 50,
            tolerance: 0.01,
        }
    }
}

impl Detector for FibonacciDetector {
    fn name(&self) -> &str {
        "fibonacci"
    }

    fn evaluate(&self, window: &CandleWindow, _ctx: &DetectorContext) -> Signal {
        let timestamp = window.last().map(|b| b.timestamp).unwrap_or(0);
        let bars = window.bars();

        let fib = match calculate_fibonacci(bars, self.lookback) {
            Some(f) => f,
            None => return Signal::hold("fibonacci: not enough data", timestamp),
        };
        let price = match bars.last() {
            Some(b) => b.close,
            None => return Signal::hold("fibonacci: no price", timestamp),
        };

        let range = fib.swing_high - fib.swing_low;
        let tolerance = range * self.tolerance;

        if (price - fib.level_618).abs() < tolerance {
            return Signal::clamped(
                Action::Buy,
                0.65,
                vec![format!("Price at Fib 0.618: {:.2}", price)],
                BTreeSet::from(["CLASSIC:FIB_618".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        if (price - fib.level_382).abs() < tolerance {
            return Signal::clamped(
                Action::Buy,
                0.55,
                vec![format!("Price at Fib 0.382: {:.2}", price)],
                BTreeSet::from(["CLASSIC:FIB_382".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        Signal::hold("fibonacci: price away from retracement levels", timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candle::Bar;

    fn bar(ts: i64, h: f64, l: f64, c: f64) -> Bar {
        Bar::new(ts, c, h, l, c, 100.0)
    }

    #[test]
    fn insufficient_data_holds() {
        let d = FibonacciDetector::default();
        let bars = vec![bar(0, 11.0, 9.0, 10.0); 5];
        let window = CandleWindow::from_slice(&bars, bars.len());
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        assert!(d.evaluate(&window, &ctx).is_hold());
    }

    #[test]
    fn price_at_618_buys() {
        let d = FibonacciDetector::default();
        let mut bars: Vec<Bar> = (0..49).map(|i| bar(i, 110.0, 90.0, 100.0)).collect();
        // swing_high=110, swing_low=90, range=20, level_618 = 110 - 0.618*20 = 97.64
        bars.push(bar(49, 98.0, 97.5, 97.64));
        let window = CandleWindow::from_slice(&bars, bars.len());
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        let signal = d.evaluate(&window, &ctx);
        assert_eq!(signal.action, Action::Buy);
    }

    #[test]
    fn flat_market_holds() {
        let d = FibonacciDetector::default();
        let bars = vec![bar(0, 100.0, 100.0, 100.0); 50];
        let window = CandleWindow::from_slice(&bars, bars.len());
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        assert!(d.evaluate(&window, &ctx).is_hold());
    }
}
