// No teacher-adapter counterpart; written fresh in the same idiom. Catalogue
// lists this detector under both `vwap` and `vwap_volume` (spec.md §4.7) —
// a single struct serves both names via the `alias` field so either name can
// be registered without duplicating logic.

use std::collections::BTreeSet;

use crate::candle::CandleWindow;
use crate::detector::{Detector, DetectorContext};
use crate::indicators::vwap::vwap_deviation;
use crate::signal::{Action, Meta, Signal};

pub struct VwapDetector {
    pub name: String,
    pub deviation_threshold: f64,
}

impl Default for VwapDetector {
    fn default() -> Self {
        Self {
            name: "vwap".to_string(),
            deviation_threshold: 0.005,
        }
    }
}

impl VwapDetector {
    /// Construct the `vwap_volume` alias referenced in the catalogue.
    pub fn volume_variant() -> Self {
        Self {
            name: "vwap_volume".to_string(),
            deviation_threshold: 0.005,
        }
    }
}

impl Detector for VwapDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, window: &CandleWindow, _ctx: &DetectorContext) -> Signal {
        let timestamp = window.last().map(|b| b.timestamp).unwrap_or(0);
        let bars = window.bars();

        let deviation = match vwap_deviation(bars) {
            Some(d) => d,
            None => return Signal::hold("vwap: not enough data", timestamp),
        };

        if deviation <= -self.deviation_threshold {
            let confidence = (0.5 + deviation.abs() * 10.0).min(0.85);
            return Signal::clamped(
                Action::Buy,
                confidence,
                vec![format!(
                    "Price {:.2}% below VWAP",
                    deviation.abs() * 100.0
                )],
                BTreeSet::from(["CLASSIC:VWAP_BELOW".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        if deviation >= self.deviation_threshold {
            let confidence = (0.5 + deviation.abs() * 10.0).min(0.85);
            return Signal::clamped(
                Action::Sell,
                confidence,
                vec![format!("Price {:.2}% above VWAP", deviation * 100.0)],
                BTreeSet::from(["CLASSIC:VWAP_ABOVE".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        Signal::hold("vwap: within deviation tolerance", timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candle::Bar;

    fn bar(ts: i64, h: f64, l: f64, c: f64, v: f64) -> Bar {
        Bar::new(ts, c, h, l, c, v)
    }

    #[test]
    fn insufficient_data_holds() {
        let d = VwapDetector::default();
        let window = CandleWindow::new(10);
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        assert!(d.evaluate(&window, &ctx).is_hold());
    }

    #[test]
    fn price_far_below_vwap_buys() {
        let d = VwapDetector::default();
        let mut bars = vec![bar(0, 100.0, 100.0, 100.0, 10.0); 20];
        bars.push(bar(20, 90.0, 88.0, 88.0, 10.0));
        let window = CandleWindow::from_slice(&bars, bars.len());
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        let signal = d.evaluate(&window, &ctx);
        assert_eq!(signal.action, Action::Buy);
    }

    #[test]
    fn volume_variant_has_distinct_name() {
        let d = VwapDetector::volume_variant();
        assert_eq!(d.name(), "vwap_volume");
    }
}
