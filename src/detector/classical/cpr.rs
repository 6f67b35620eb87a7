// No teacher-adapter counterpart; written fresh. CPR is computed from the
// bar preceding the current one (classic floor-trader convention: today's
// pivot range is derived from yesterday's H/L/C), and the signal fires when
// the current close breaks beyond it by more than `sensitivity`.

use std::collections::BTreeSet;

use crate::candle::CandleWindow;
use crate::detector::{Detector, DetectorContext};
use crate::indicators::pivot::calculate_cpr;
use crate::signal::{Action, Meta, Signal};

pub struct CprDetector {
    pub sensitivity: f64,
}

impl Default for CprDetector {
    fn default() -> Self {
        Self { sensitivity: 0.002 }
    }
}

impl Detector for CprDetector {
    fn name(&self) -> &str {
        "cpr"
    }

    fn evaluate(&self, window: &CandleWindow, _ctx: &DetectorContext) -> Signal {
        let timestamp = window.last().map(|b| b.timestamp).unwrap_or(0);
        let bars = window.bars();

        if bars.len() < 2 {
            return Signal::hold("cpr: not enough data", timestamp);
        }

        let prior = &bars[bars.len() - 2];
        let current = &bars[bars.len() - 1];
        let cpr = calculate_cpr(prior);

        if current.close == 0.0 {
            return Signal::hold("cpr: zero price", timestamp);
        }
        let tol = current.close * self.sensitivity;

        if current.close > cpr.top_central + tol {
            return Signal::clamped(
                Action::Buy,
                0.6,
                vec![format!(
                    "Close {:.2} broke above CPR top {:.2}",
                    current.close, cpr.top_central
                )],
                BTreeSet::from(["CLASSIC:CPR_BREAKOUT_UP".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        if current.close < cpr.bottom_central - tol {
            return Signal::clamped(
                Action::Sell,
                0.6,
                vec![format!(
                    "Close {:.2} broke below CPR bottom {:.2}",
                    current.close, cpr.bottom_central
                )],
                BTreeSet::from(["CLASSIC:CPR_BREAKOUT_DOWN".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        Signal::hold("cpr: inside range", timestamp)
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
        let d = CprDetector::default();
        let bars = vec![bar(0, 10.0, 9.0, 9.5)];
        let window = CandleWindow::from_slice(&bars, bars.len());
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        assert!(d.evaluate(&window, &ctx).is_hold());
    }

    #[test]
    fn breakout_above_top_central_buys() {
        let d = CprDetector::default();
        let bars = vec![bar(0, 110.0, 90.0, 100.0), bar(1, 130.0, 129.0, 130.0)];
        let window = CandleWindow::from_slice(&bars, bars.len());
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        let signal = d.evaluate(&window, &ctx);
        assert_eq!(signal.action, Action::Buy);
    }

    #[test]
    fn inside_range_holds() {
        let d = CprDetector::default();
        let bars = vec![bar(0, 110.0, 90.0, 100.0), bar(1, 100.5, 99.5, 100.0)];
        let window = CandleWindow::from_slice(&bars, bars.len());
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        assert!(d.evaluate(&window, &ctx).is_hold());
    }
}
