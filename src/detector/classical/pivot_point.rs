// No teacher-adapter counterpart; written fresh. Classic floor-trader pivot
// levels computed from the prior bar; a close landing within `tolerance` of
// a support level (S1/S2) reads as a bounce, a resistance level (R1/R2) as a
// rejection.

use std::collections::BTreeSet;

use crate::candle::CandleWindow;
use crate::detector::{Detector, DetectorContext};
use crate::indicators::pivot::calculate_pivot;
use crate::signal::{Action, Meta, Signal};

pub struct PivotPointDetector {
    pub tolerance: f64,
}

impl Default for PivotPointDetector {
    fn default() -> Self {
        Self { tolerance: 0.003 }
    }
}

impl Detector for PivotPointDetector {
    fn name(&self) -> &str {
        "pivot_point"
    }

    fn evaluate(&self, window: &CandleWindow, _ctx: &DetectorContext) -> Signal {
        let timestamp = window.last().map(|b| b.timestamp).unwrap_or(0);
        let bars = window.bars();

        if bars.len() < 2 {
            return Signal::hold("pivot_point: not enough data", timestamp);
        }

        let prior = &bars[bars.len() - 2];
        let current = &bars[bars.len() - 1];
        if current.close == 0.0 {
            return Signal::hold("pivot_point: zero price", timestamp);
        }
        let levels = calculate_pivot(prior);
        let tol = current.close * self.tolerance;

        let near_s1 = (current.close - levels.s1).abs() < tol;
        let near_s2 = (current.close - levels.s2).abs() < tol;
        let near_r1 = (current.close - levels.r1).abs() < tol;
        let near_r2 = (current.close - levels.r2).abs() < tol;

        if near_s1 || near_s2 {
            let level = if near_s2 { levels.s2 } else { levels.s1 };
            let confidence = if near_s2 { 0.65 } else { 0.55 };
            return Signal::clamped(
                Action::Buy,
                confidence,
                vec![format!("Bounce off pivot support {:.2}", level)],
                BTreeSet::from(["CLASSIC:PIVOT_SUPPORT_BOUNCE".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        if near_r1 || near_r2 {
            let level = if near_r2 { levels.r2 } else { levels.r1 };
            let confidence = if near_r2 { 0.65 } else { 0.55 };
            return Signal::clamped(
                Action::Sell,
                confidence,
                vec![format!("Rejection at pivot resistance {:.2}", level)],
                BTreeSet::from(["CLASSIC:PIVOT_RESISTANCE_REJECTION".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        Signal::hold("pivot_point: away from levels", timestamp)
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
        let d = PivotPointDetector::default();
        let bars = vec![bar(0, 10.0, 9.0, 9.5)];
        let window = CandleWindow::from_slice(&bars, bars.len());
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        assert!(d.evaluate(&window, &ctx).is_hold());
    }

    #[test]
    fn bounce_at_s1_buys() {
        let d = PivotPointDetector::default();
        let prior = bar(0, 110.0, 90.0, 100.0);
        // pivot=100, s1=2*100-110=90
        let bars = vec![prior, bar(1, 91.0, 89.5, 90.0)];
        let window = CandleWindow::from_slice(&bars, bars.len());
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        let signal = d.evaluate(&window, &ctx);
        assert_eq!(signal.action, Action::Buy);
    }

    #[test]
    fn away_from_levels_holds() {
        let d = PivotPointDetector::default();
        let prior = bar(0, 110.0, 90.0, 100.0);
        let bars = vec![prior, bar(1, 100.5, 99.5, 100.0)];
        let window = CandleWindow::from_slice(&bars, bars.len());
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        assert!(d.evaluate(&window, &ctx).is_hold());
    }
}
