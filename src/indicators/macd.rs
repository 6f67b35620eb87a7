// =============================================================================
// Moving Average Convergence Divergence (MACD)
// =============================================================================
//
// MACD line = EMA(fast) - EMA(slow)
// Signal line = EMA(signal) of the MACD line
// Histogram = MACD line - Signal line
// =============================================================================

use super::ema::calculate_ema;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MacdResult {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

/// Compute the most recent MACD/signal/histogram reading.
///
/// Returns `None` when there isn't enough data to seed both EMAs and the
/// signal line, or when any intermediate value is non-finite.
pub fn calculate_macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Option<MacdResult> {
    if fast == 0 || slow == 0 || signal == 0 || fast >= slow {
        return None;
    }
    if closes.len() < slow + signal {
        return None;
    }

    let ema_fast = calculate_ema(closes, fast);
    let ema_slow = calculate_ema(closes, slow);

    // Align series: ema_fast starts earlier (at index fast-1) than ema_slow
    // (at index slow-1). Drop the leading (slow - fast) values from ema_fast
    // so both series line up bar-for-bar.
    let offset = ema_fast.len().checked_sub(ema_slow.len())?;
    let aligned_fast = &ema_fast[offset..];

    let macd_line: Vec<f64> = aligned_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| f - s)
        .collect();

    if macd_line.len() < signal {
        return None;
    }

    let signal_line = calculate_ema(&macd_line, signal);
    let macd_last = *macd_line.last()?;
    let signal_last = *signal_line.last()?;
    let histogram = macd_last - signal_last;

    if macd_last.is_finite() && signal_last.is_finite() && histogram.is_finite() {
        Some(MacdResult {
            macd: macd_last,
            signal: signal_last,
            histogram,
        })
    } else {
        None
    }
}

/// Full MACD-line / signal-line series, aligned bar-for-bar, for crossover
/// detection (needs at least two points to compare "was below, now above").
pub fn calculate_macd_series(
    closes: &[f64],
    fast: usize,
    slow: usize,
    signal: usize,
) -> Option<(Vec<f64>, Vec<f64>)> {
    if fast == 0 || slow == 0 || signal == 0 || fast >= slow {
        return None;
    }
    let ema_fast = calculate_ema(closes, fast);
    let ema_slow = calculate_ema(closes, slow);
    let offset = ema_fast.len().checked_sub(ema_slow.len())?;
    let aligned_fast = &ema_fast[offset..];
    let macd_line: Vec<f64> = aligned_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| f - s)
        .collect();
    if macd_line.len() < signal {
        return None;
    }
    let signal_line = calculate_ema(&macd_line, signal);
    let trim = macd_line.len().checked_sub(signal_line.len())?;
    Some((macd_line[trim..].to_vec(), signal_line))
}
