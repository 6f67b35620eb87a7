// =============================================================================
// Bar / CandleWindow — the OHLCV data model the whole engine operates over
// =============================================================================
//
// A `Bar` is one OHLCV aggregate over a fixed interval. `CandleWindow` is the
// trailing, fixed-capacity sequence of bars every Detector reads. New closed
// bars append; once the window is full the oldest is trimmed. A forming
// (not-yet-closed) bar replaces the current last entry in place rather than
// appending, mirroring how a live feed keeps updating the in-progress candle
// until its interval boundary.
// =============================================================================

use serde::{Deserialize, Serialize};

/// Default maximum length of a `CandleWindow`.
pub const DEFAULT_WINDOW_CAPACITY: usize = 1000;

/// One OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Millisecond epoch timestamp of the bar's open.
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}

/// A bar event arriving from a live stream: the bar itself plus whether its
/// interval has closed. A forming bar may be emitted repeatedly with the same
/// timestamp as it updates; the driver is responsible for de-duplication.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarEvent {
    pub bar: Bar,
    pub is_closed: bool,
}

/// Trailing, fixed-capacity sequence of bars.
#[derive(Debug, Clone)]
pub struct CandleWindow {
    bars: Vec<Bar>,
    capacity: usize,
}

impl CandleWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            bars: Vec::with_capacity(capacity.min(4096)),
            capacity: capacity.max(1),
        }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }

    /// Append a closed bar, trimming the oldest entry if the window is full.
    pub fn push_closed(&mut self, bar: Bar) {
        if self.bars.len() == self.capacity {
            self.bars.remove(0);
        }
        self.bars.push(bar);
    }

    /// Replace the in-progress last bar, or append if the window is empty.
    pub fn update_forming(&mut self, bar: Bar) {
        match self.bars.last_mut() {
            Some(last) => *last = bar,
            None => self.bars.push(bar),
        }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// A sub-window of the trailing `n` bars (or the whole window if shorter).
    pub fn tail(&self, n: usize) -> &[Bar] {
        let len = self.bars.len();
        &self.bars[len.saturating_sub(n)..]
    }

    /// Build a window from a finite historical slice, e.g. `bars[0..=i]` in a
    /// backtest, trimmed to the trailing `capacity` bars.
    pub fn from_slice(bars: &[Bar], capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let start = bars.len().saturating_sub(capacity);
        Self {
            bars: bars[start..].to_vec(),
            capacity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(ts: i64, close: f64) -> Bar {
        Bar::new(ts, close, close + 1.0, close - 1.0, close, 100.0)
    }

    #[test]
    fn push_closed_appends_until_capacity() {
        let mut w = CandleWindow::new(3);
        w.push_closed(bar(1, 1.0));
        w.push_closed(bar(2, 2.0));
        w.push_closed(bar(3, 3.0));
        assert_eq!(w.len(), 3);
        assert_eq!(w.bars()[0].timestamp, 1);
    }

    #[test]
    fn push_closed_trims_oldest_on_overflow() {
        let mut w = CandleWindow::new(2);
        w.push_closed(bar(1, 1.0));
        w.push_closed(bar(2, 2.0));
        w.push_closed(bar(3, 3.0));
        assert_eq!(w.len(), 2);
        assert_eq!(w.bars()[0].timestamp, 2);
        assert_eq!(w.bars()[1].timestamp, 3);
    }

    #[test]
    fn update_forming_replaces_last_in_place() {
        let mut w = CandleWindow::new(3);
        w.push_closed(bar(1, 1.0));
        w.update_forming(bar(2, 2.5));
        assert_eq!(w.len(), 2);
        w.update_forming(bar(2, 2.8));
        assert_eq!(w.len(), 2);
        assert_eq!(w.bars()[1].close, 2.8);
    }

    #[test]
    fn tail_shorter_than_window_returns_all() {
        let mut w = CandleWindow::new(5);
        w.push_closed(bar(1, 1.0));
        w.push_closed(bar(2, 2.0));
        assert_eq!(w.tail(10).len(), 2);
        assert_eq!(w.tail(1).len(), 1);
    }

    #[test]
    fn from_slice_trims_to_capacity() {
        let bars: Vec<Bar> = (0..10).map(|i| bar(i, i as f64)).collect();
        let w = CandleWindow::from_slice(&bars, 4);
        assert_eq!(w.len(), 4);
        assert_eq!(w.bars()[0].timestamp, 6);
    }
}
