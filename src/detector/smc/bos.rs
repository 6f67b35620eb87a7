// Grounded verbatim on market_structure.py's `detect_bos_advanced`:
// displacement past the prior 9-bar swing high/low (bars [-10:-1] in the
// original, i.e. the window excluding the current bar), with a volume
// corroboration boost when the current bar's volume is >= `volume_multiplier`
// times the trailing-20-bar average.

use std::collections::BTreeSet;

use crate::candle::{Bar, CandleWindow};
use crate::detector::{Detector, DetectorContext};
use crate::signal::{Action, Meta, Signal};

pub struct SmcBosDetector {
    pub min_displacement: f64,
    pub volume_multiplier: f64,
}

impl Default for SmcBosDetector {
    fn default() -> Self {
        Self {
            min_displacement: 0.001,
            volume_multiplier: 1.2,
        }
    }
}

/// A bullish (+1) or bearish (-1) break of structure found by scanning
/// `bars`. `swing_extreme` is the level that was broken.
pub struct BosEvent {
    pub direction: i8,
    pub swing_extreme: f64,
    pub displacement: f64,
    pub index: usize,
}

impl SmcBosDetector {
    /// Evaluate the BOS rule at `bars[..=at]` as if `at` were the current
    /// (last) bar. Used both by `evaluate` and by `SmcChochDetector`'s replay
    /// of BOS history.
    pub fn detect_at(&self, bars: &[Bar], at: usize) -> Option<BosEvent> {
        if at < 9 {
            return None;
        }
        let recent = &bars[at - 9..at];
        let swing_high = recent.iter().map(|b| b.high).fold(f64::MIN, f64::max);
        let swing_low = recent.iter().map(|b| b.low).fold(f64::MAX, f64::min);
        let range = swing_high - swing_low;
        if range <= 0.0 {
            return None;
        }

        let current = &bars[at];
        if current.close > swing_high {
            let displacement = (current.close - swing_high) / range;
            if displacement >= self.min_displacement {
                return Some(BosEvent {
                    direction: 1,
                    swing_extreme: swing_high,
                    displacement,
                    index: at,
                });
            }
        } else if current.close < swing_low {
            let displacement = (swing_low - current.close) / range;
            if displacement >= self.min_displacement {
                return Some(BosEvent {
                    direction: -1,
                    swing_extreme: swing_low,
                    displacement,
                    index: at,
                });
            }
        }
        None
    }

    fn volume_factor(&self, bars: &[Bar], at: usize) -> f64 {
        let start = at.saturating_sub(19);
        let window = &bars[start..=at];
        let avg_volume = window.iter().map(|b| b.volume).sum::<f64>() / window.len() as f64;
        if avg_volume > 0.0 {
            (bars[at].volume / avg_volume).min(2.0)
        } else {
            1.0
        }
    }
}

impl Detector for SmcBosDetector {
    fn name(&self) -> &str {
        "smc_bos"
    }

    fn evaluate(&self, window: &CandleWindow, _ctx: &DetectorContext) -> Signal {
        let bars = window.bars();
        let timestamp = window.last().map(|b| b.timestamp).unwrap_or(0);

        if bars.len() < 10 {
            return Signal::hold("smc_bos: not enough data", timestamp);
        }

        let at = bars.len() - 1;
        let event = match self.detect_at(bars, at) {
            Some(e) => e,
            None => return Signal::hold("smc_bos: no BOS detected", timestamp),
        };

        let displacement = event.displacement;
        let volume_factor = self.volume_factor(bars, at);
        let base = (0.4 + displacement * 5.0).min(0.85);
        let volume_boost = if volume_factor >= self.volume_multiplier {
            ((volume_factor - 1.0) * 0.15).min(0.15)
        } else {
            0.0
        };
        let confidence = (base + volume_boost).min(1.0);

        if event.direction > 0 {
            Signal::clamped(
                Action::Buy,
                confidence,
                vec![
                    format!("BOS Bullish: broke {:.2}", event.swing_extreme),
                    format!("Displacement: {:.2}%", displacement * 100.0),
                    format!("Volume: {:.1}x average", volume_factor),
                ],
                BTreeSet::from([
                    "SMC:BOS".to_string(),
                    "SMC:BOS_BULL".to_string(),
                ]),
                Meta::new(),
                timestamp,
            )
        } else {
            Signal::clamped(
                Action::Sell,
                confidence,
                vec![
                    format!("BOS Bearish: broke {:.2}", event.swing_extreme),
                    format!("Displacement: {:.2}%", displacement * 100.0),
                    format!("Volume: {:.1}x average", volume_factor),
                ],
                BTreeSet::from([
                    "SMC:BOS".to_string(),
                    "SMC:BOS_BEAR".to_string(),
                ]),
                Meta::new(),
                timestamp,
            )
        }
    }
}
