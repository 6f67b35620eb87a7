// Grounded verbatim on market_structure.py's `detect_order_blocks_advanced`:
// the last opposite-colored candle immediately before price makes a new
// running high (bullish order block) or low (bearish order block). Each
// candidate block is forward-scanned to classify FRESH (untouched since
// formation) vs MITIGATED (price has returned into the block's range).
// `caused_bos` — whether the same impulse that formed the block also broke
// structure — reuses `SmcBosDetector::detect_at` rather than duplicating its
// displacement math.

use std::collections::BTreeSet;

use crate::candle::{Bar, CandleWindow};
use crate::detector::smc::bos::SmcBosDetector;
use crate::detector::{Detector, DetectorContext};
use crate::signal::{Action, Meta, Signal};

pub struct SmcOrderBlocksDetector {
    pub lookback: usize,
    bos: SmcBosDetector,
}

impl Default for SmcOrderBlocksDetector {
    fn default() -> Self {
        Self {
            lookback: 30,
            bos: SmcBosDetector::default(),
        }
    }
}

struct OrderBlock {
    direction: i8,
    high: f64,
    low: f64,
    open: f64,
    close: f64,
    index: usize,
    caused_bos: bool,
}

fn is_bullish(b: &Bar) -> bool {
    b.close > b.open
}

impl SmcOrderBlocksDetector {
    fn find_blocks(&self, bars: &[Bar], end: usize) -> Vec<OrderBlock> {
        let start = end.saturating_sub(self.lookback);
        let mut blocks = Vec::new();

        // running extremes computed left to right; a new high/low formed at
        // index i is attributed to the last opposite-colored candle before i.
        let mut running_high = f64::MIN;
        let mut running_low = f64::MAX;

        for i in start..=end {
            let candle = &bars[i];
            if i > start {
                if candle.high > running_high {
                    // bullish order block: last bearish candle before the new high
                    if let Some(j) = (start..i).rev().find(|&j| !is_bullish(&bars[j])) {
                        let ob = &bars[j];
                        blocks.push(OrderBlock {
                            direction: 1,
                            high: ob.high,
                            low: ob.low,
                            open: ob.open,
                            close: ob.close,
                            index: j,
                            caused_bos: self.bos.detect_at(bars, i).map(|e| e.direction > 0).unwrap_or(false),
                        });
                    }
                }
                if candle.low < running_low {
                    if let Some(j) = (start..i).rev().find(|&j| is_bullish(&bars[j])) {
                        let ob = &bars[j];
                        blocks.push(OrderBlock {
                            direction: -1,
                            high: ob.high,
                            low: ob.low,
                            open: ob.open,
                            close: ob.close,
                            index: j,
                            caused_bos: self.bos.detect_at(bars, i).map(|e| e.direction < 0).unwrap_or(false),
                        });
                    }
                }
            }
            running_high = running_high.max(candle.high);
            running_low = running_low.min(candle.low);
        }
        blocks
    }

    fn is_fresh(&self, bars: &[Bar], block: &OrderBlock, end: usize) -> bool {
        bars[block.index + 1..=end]
            .iter()
            .all(|b| b.low > block.high || b.high < block.low)
    }
}

impl Detector for SmcOrderBlocksDetector {
    fn name(&self) -> &str {
        "smc_order_blocks"
    }

    fn evaluate(&self, window: &CandleWindow, _ctx: &DetectorContext) -> Signal {
        let bars = window.bars();
        let timestamp = window.last().map(|b| b.timestamp).unwrap_or(0);

        if bars.len() < 12 {
            return Signal::hold("smc_order_blocks: not enough data", timestamp);
        }

        let end = bars.len() - 1;
        let blocks = self.find_blocks(bars, end);
        let current = &bars[end];

        // A block is "active" for this bar when price is currently trading
        // inside its range and it is still fresh as of the previous bar.
        let mut best: Option<(&OrderBlock, f64)> = None;
        for block in &blocks {
            if block.index >= end {
                continue;
            }
            let inside = current.low <= block.high && current.high >= block.low;
            if !inside {
                continue;
            }
            if !self.is_fresh(bars, block, end.saturating_sub(1).max(block.index)) {
                continue;
            }
            let range = block.high - block.low;
            if range <= 0.0 {
                continue;
            }
            let body = (block.close - block.open).abs();
            let base = (0.4 + (body / range) * 0.3).min(0.7);
            let bos_boost = if block.caused_bos { 0.15 } else { 0.0 };
            let volume_boost = if bars[block.index].volume
                > bars[block.index.saturating_sub(5)..block.index]
                    .iter()
                    .map(|b| b.volume)
                    .sum::<f64>()
                    / 5.0_f64.max(1.0)
            {
                0.05
            } else {
                0.0
            };
            let confidence = (base + bos_boost + volume_boost).min(1.0);
            if best.map(|(_, c)| confidence > c).unwrap_or(true) {
                best = Some((block, confidence));
            }
        }

        let (block, confidence) = match best {
            Some(b) => b,
            None => return Signal::hold("smc_order_blocks: no active fresh block", timestamp),
        };

        if block.direction > 0 {
            Signal::clamped(
                Action::Buy,
                confidence,
                vec![
                    format!(
                        "Price inside bullish order block [{:.2}, {:.2}]",
                        block.low, block.high
                    ),
                    format!("caused_bos={}", block.caused_bos),
                ],
                BTreeSet::from([
                    "SMC:ORDER_BLOCK".to_string(),
                    "SMC:ORDER_BLOCK_BULLISH".to_string(),
                ]),
                Meta::new(),
                timestamp,
            )
        } else {
            Signal::clamped(
                Action::Sell,
                confidence,
                vec![
                    format!(
                        "Price inside bearish order block [{:.2}, {:.2}]",
                        block.low, block.high
                    ),
                    format!("caused_bos={}", block.caused_bos),
                ],
                BTreeSet::from([
                    "SMC:ORDER_BLOCK".to_string(),
                    "SMC:ORDER_BLOCK_BEARISH".to_string(),
                ]),
                Meta::new(),
                timestamp,
            )
        }
    }
}
