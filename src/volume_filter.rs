// =============================================================================
// VolumeFilter — per-bar volume z-score gate
// =============================================================================
//
// Grounded verbatim on market_manus/analysis/volume_filter.py: reject
// signals on low-volume bars, amplify confidence on high-volume bars, pass
// normal-volume bars through with a metadata tag. Z-score uses a rolling
// mean/sample-stddev over `lookback_period` bars; warm-up (fewer than
// `lookback_period` prior bars, or zero stddev) reads as z-score 0.0 rather
// than NaN.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::signal::{Action, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeFilterConfig {
    pub reject_threshold: f64,
    pub boost_threshold: f64,
    pub boost_factor: f64,
    pub lookback_period: usize,
}

impl Default for VolumeFilterConfig {
    fn default() -> Self {
        Self {
            reject_threshold: 0.5,
            boost_threshold: 1.5,
            boost_factor: 1.3,
            lookback_period: 50,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VolumeFilterStats {
    pub received: u64,
    pub rejected: u64,
    pub boosted: u64,
    pub passed: u64,
}

impl VolumeFilterStats {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Computes the rolling volume z-score for every bar in `volumes`, mirroring
/// pandas' `.rolling(window).mean()/.std()` (sample stddev, ddof=1). Bars
/// before the window fills, or whose window has zero stddev, read as 0.0.
pub fn calculate_volume_zscore(volumes: &[f64], lookback_period: usize) -> Vec<f64> {
    let n = volumes.len();
    let mut zscores = vec![0.0; n];
    if lookback_period < 2 {
        return zscores;
    }
    for i in (lookback_period - 1)..n {
        let window = &volumes[i + 1 - lookback_period..=i];
        let mean = window.iter().sum::<f64>() / lookback_period as f64;
        let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
            / (lookback_period as f64 - 1.0);
        let std = variance.sqrt();
        zscores[i] = if std > 0.0 {
            (volumes[i] - mean) / std
        } else {
            0.0
        };
    }
    zscores
}

pub struct VolumeFilter {
    pub config: VolumeFilterConfig,
    stats: VolumeFilterStats,
}

impl VolumeFilter {
    pub fn new(config: VolumeFilterConfig) -> Self {
        Self {
            config,
            stats: VolumeFilterStats::default(),
        }
    }

    pub fn stats(&self) -> VolumeFilterStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Filters or amplifies `signal` given the volume z-score observed at its
    /// bar. HOLD signals bypass the filter untouched and do not count toward
    /// stats.
    pub fn filter_signal(&mut self, signal: &Signal, volume_zscore: f64) -> Signal {
        if signal.is_hold() {
            return signal.clone();
        }

        self.stats.received += 1;

        if volume_zscore < self.config.reject_threshold {
            self.stats.rejected += 1;
            let rejection_reason = format!("Volume insuficiente (z-score: {volume_zscore:.2})");
            debug!(zscore = volume_zscore, "volume filter: rejected");

            let mut reasons = vec![rejection_reason.clone()];
            reasons.extend(signal.reasons.clone());
            let mut tags = signal.tags.clone();
            tags.insert("VOLUME_REJECTED".to_string());
            let mut meta = signal.meta.clone();
            meta.insert(
                "original_action".to_string(),
                serde_json::json!(signal.action.to_string()),
            );
            meta.insert(
                "original_confidence".to_string(),
                serde_json::json!(signal.confidence),
            );
            meta.insert("volume_zscore".to_string(), serde_json::json!(volume_zscore));
            meta.insert(
                "rejection_reason".to_string(),
                serde_json::json!(rejection_reason),
            );

            return Signal::clamped(Action::Hold, 0.0, reasons, tags, meta, signal.timestamp);
        }

        if volume_zscore > self.config.boost_threshold {
            self.stats.boosted += 1;
            debug!(zscore = volume_zscore, "volume filter: boosted");

            let boosted_confidence = (signal.confidence * self.config.boost_factor).min(1.0);
            let mut reasons = signal.reasons.clone();
            reasons.push(format!("Alto volume (z-score: {volume_zscore:.2})"));
            let mut tags = signal.tags.clone();
            tags.insert("VOLUME_BOOSTED".to_string());
            let mut meta = signal.meta.clone();
            meta.insert(
                "original_confidence".to_string(),
                serde_json::json!(signal.confidence),
            );
            meta.insert("volume_zscore".to_string(), serde_json::json!(volume_zscore));
            meta.insert(
                "boost_factor".to_string(),
                serde_json::json!(self.config.boost_factor),
            );

            return Signal::clamped(
                signal.action,
                boosted_confidence,
                reasons,
                tags,
                meta,
                signal.timestamp,
            );
        }

        self.stats.passed += 1;
        let mut tags = signal.tags.clone();
        tags.insert("VOLUME_NORMAL".to_string());
        let mut meta = signal.meta.clone();
        meta.insert("volume_zscore".to_string(), serde_json::json!(volume_zscore));

        Signal::clamped(
            signal.action,
            signal.confidence,
            signal.reasons.clone(),
            tags,
            meta,
            signal.timestamp,
        )
    }
}

impl Default for VolumeFilter {
    fn default() -> Self {
        Self::new(VolumeFilterConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn buy_signal(confidence: f64) -> Signal {
        Signal::new(
            "test",
            Action::Buy,
            confidence,
            vec!["test reason".to_string()],
            BTreeSet::new(),
            crate::signal::Meta::new(),
            0,
        )
        .unwrap()
    }

    #[test]
    fn hold_signal_bypasses_filter() {
        let mut filter = VolumeFilter::default();
        let hold = Signal::hold("nothing", 0);
        let result = filter.filter_signal(&hold, -5.0);
        assert!(result.is_hold());
        assert_eq!(filter.stats().received, 0);
    }

    #[test]
    fn low_zscore_rejects_to_hold() {
        let mut filter = VolumeFilter::default();
        let signal = buy_signal(0.8);
        let result = filter.filter_signal(&signal, 0.1);
        assert!(result.is_hold());
        assert!(result.tags.contains("VOLUME_REJECTED"));
        assert_eq!(filter.stats().rejected, 1);
    }

    #[test]
    fn high_zscore_boosts_confidence() {
        let mut filter = VolumeFilter::default();
        let signal = buy_signal(0.5);
        let result = filter.filter_signal(&signal, 2.0);
        assert_eq!(result.action, Action::Buy);
        assert!((result.confidence - 0.65).abs() < 1e-9);
        assert!(result.tags.contains("VOLUME_BOOSTED"));
        assert_eq!(filter.stats().boosted, 1);
    }

    #[test]
    fn boost_clamps_at_one() {
        let mut filter = VolumeFilter::default();
        let signal = buy_signal(0.9);
        let result = filter.filter_signal(&signal, 2.0);
        assert!(result.confidence <= 1.0);
    }

    #[test]
    fn normal_zscore_passes_through() {
        let mut filter = VolumeFilter::default();
        let signal = buy_signal(0.6);
        let result = filter.filter_signal(&signal, 1.0);
        assert_eq!(result.action, Action::Buy);
        assert!((result.confidence - 0.6).abs() < 1e-9);
        assert!(result.tags.contains("VOLUME_NORMAL"));
        assert_eq!(filter.stats().passed, 1);
    }

    #[test]
    fn zscore_warmup_period_is_zero() {
        let volumes = vec![100.0; 10];
        let zscores = calculate_volume_zscore(&volumes, 50);
        assert!(zscores.iter().all(|&z| z == 0.0));
    }

    #[test]
    fn zscore_flat_volume_is_zero() {
        let volumes = vec![100.0; 60];
        let zscores = calculate_volume_zscore(&volumes, 50);
        assert_eq!(*zscores.last().unwrap(), 0.0);
    }

    #[test]
    fn zscore_spike_is_positive() {
        let mut volumes = vec![100.0; 50];
        volumes.push(500.0);
        let zscores = calculate_volume_zscore(&volumes, 50);
        assert!(*zscores.last().unwrap() > 0.0);
    }
}
