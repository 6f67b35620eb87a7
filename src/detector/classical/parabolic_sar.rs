// No teacher-adapter counterpart for Parabolic SAR; written fresh in the same
// threshold-detector idiom as the grounded classical detectors. Direction is
// simply the current SAR side; confidence scales with how far price has
// moved away from the SAR stop, relative to price itself (a close that just
// flipped sides sits near 0.5; a well-established trend sits higher).

use std::collections::BTreeSet;

use crate::candle::CandleWindow;
use crate::detector::{Detector, DetectorContext};
use crate::indicators::parabolic_sar::{calculate_sar, SarSide};
use crate::signal::{Action, Meta, Signal};

pub struct ParabolicSarDetector {
    pub af_start: f64,
    pub af_step: f64,
    pub af_max: f64,
}

impl Default for ParabolicSarDetector {
    fn default() -> Self {
        Self {
            af_start: 0.02,
            af_step: 0.02,
            af_max: 0.2,
        }
    }
}

impl Detector for ParabolicSarDetector {
    fn name(&self) -> &str {
        "parabolic_sar"
    }

    fn evaluate(&self, window: &CandleWindow, _ctx: &DetectorContext) -> Signal {
        let timestamp = window.last().map(|b| b.timestamp).unwrap_or(0);
        let bars = window.bars();

        let result = match calculate_sar(bars, self.af_start, self.af_step, self.af_max) {
            Some(r) => r,
            None => return Signal::hold("parabolic_sar: not enough data", timestamp),
        };
        let price = match bars.last() {
            Some(b) => b.close,
            None => return Signal::hold("parabolic_sar: no price", timestamp),
        };
        if price == 0.0 {
            return Signal::hold("parabolic_sar: zero price", timestamp);
        }

        let distance = ((price - result.sar) / price).abs();
        let confidence = (0.5 + distance * 5.0).min(0.85);

        match result.side {
            SarSide::Long => Signal::clamped(
                Action::Buy,
                confidence,
                vec![format!("Price {:.2} above SAR {:.2}", price, result.sar)],
                BTreeSet::from(["CLASSIC:SAR_LONG".to_string()]),
                Meta::new(),
                timestamp,
            ),
            SarSide::Short => Signal::clamped(
                Action::Sell,
                confidence,
                vec![format!("Price {:.2} below SAR {:.2}", price, result.sar)],
                BTreeSet::from(["CLASSIC:SAR_SHORT".to_string()]),
                Meta::new(),
                timestamp,
            ),
        }
    }
}
