// No teacher-adapter counterpart; written fresh. Fires when three SMAs are
// fully ordered (ribbon fanned out) with at least `alignment_threshold`
// spread between the fastest and slowest, the same "fan" idea as
// `indicators::ema::ema_trend_aligned` but parameterized over SMA periods
// instead of the fixed EMA9/21/55 stack.

use std::collections::BTreeSet;

use crate::candle::CandleWindow;
use crate::detector::{Detector, DetectorContext};
use crate::signal::{Action, Meta, Signal};

pub struct MaRibbonDetector {
    pub periods: [usize; 3],
    pub alignment_threshold: f64,
}

impl Default for MaRibbonDetector {
    fn default() -> Self {
        Self {
            periods: [5, 8, 13],
            alignment_threshold: 0.002,
        }
    }
}

fn sma(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }
    let window = &closes[closes.len() - period..];
    let avg = window.iter().sum::<f64>() / period as f64;
    if avg.is_finite() {
        Some(avg)
    } else {
        None
    }
}

impl Detector for MaRibbonDetector {
    fn name(&self) -> &str {
        "ma_ribbon"
    }

    fn evaluate(&self, window: &CandleWindow, _ctx: &DetectorContext) -> Signal {
        let timestamp = window.last().map(|b| b.timestamp).unwrap_or(0);
        let closes = window.closes();

        let [fast_p, mid_p, slow_p] = self.periods;
        let (fast, mid, slow) = match (sma(&closes, fast_p), sma(&closes, mid_p), sma(&closes, slow_p)) {
            (Some(f), Some(m), Some(s)) => (f, m, s),
            _ => return Signal::hold("ma_ribbon: not enough data", timestamp),
        };

        let price = *closes.last().unwrap_or(&0.0);
        if price == 0.0 {
            return Signal::hold("ma_ribbon: zero price", timestamp);
        }
        let spread = (fast - slow).abs() / price;

        if fast > mid && mid > slow && spread >= self.alignment_threshold {
            return Signal::clamped(
                Action::Buy,
                (0.5 + spread * 20.0).min(0.8),
                vec!["MA ribbon bullish fan".to_string()],
                BTreeSet::from(["CLASSIC:RIBBON_BULLISH".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        if fast < mid && mid < slow && spread >= self.alignment_threshold {
            return Signal::clamped(
                Action::Sell,
                (0.5 + spread * 20.0).min(0.8),
                vec!["MA ribbon bearish fan".to_string()],
                BTreeSet::from(["CLASSIC:RIBBON_BEARISH".to_string()]),
                Meta::new(),
                timestamp,
            );
        }

        Signal::hold("ma_ribbon: not fanned out", timestamp)
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
        let d = MaRibbonDetector::default();
        let window = window_from_closes(&[100.0; 5]);
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        assert!(d.evaluate(&window, &ctx).is_hold());
    }

    #[test]
    fn steady_uptrend_fans_bullish() {
        let d = MaRibbonDetector::default();
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64 * 3.0).collect();
        let window = window_from_closes(&closes);
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        let signal = d.evaluate(&window, &ctx);
        assert_eq!(signal.action, Action::Buy);
    }

    #[test]
    fn flat_market_holds() {
        let d = MaRibbonDetector::default();
        let window = window_from_closes(&vec![100.0; 20]);
        let ctx = DetectorContext::new("BTCUSDT", "1h");
        assert!(d.evaluate(&window, &ctx).is_hold());
    }
}
