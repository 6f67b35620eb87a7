// =============================================================================
// ConfluenceEngine — regime gate, weighted aggregation, conflict penalty
// =============================================================================
//
// Grounded on spec.md §4.3's six-step evaluation algorithm and the Rust shape
// of the teacher's `signals/weighted_score.rs` (`WeightedScorer` /
// `RegimeWeights` / `ScoringResult`) for regime-conditioned weighted
// aggregation, plus `regime/detector.rs` for the gate-before-aggregate
// structure. Default regime thresholds are grounded verbatim on
// `confluence_engine_adapter.py`'s `build_regime_config`.
//
// Unit note: `indicators::bollinger::calculate_bollinger` reports width as a
// ×100 percentage (teacher convention); the regime gate here divides by 100
// before comparing against `bb_width_min`, since the adapter's default
// (0.01) is a fraction (1%), not a percentage point.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::candle::CandleWindow;
use crate::detector::{DetectorContext, DetectorRegistry};
use crate::error::ConfigError;
use crate::indicators::adx::calculate_adx;
use crate::indicators::atr::calculate_atr;
use crate::indicators::bollinger::calculate_bollinger;
use crate::signal::{Action, Meta, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeConfig {
    pub adx_min: f64,
    pub adx_max: f64,
    pub atr_min: f64,
    pub bb_width_min: f64,
    pub buy_threshold: f64,
    pub sell_threshold: f64,
    pub conflict_penalty: f64,
}

impl Default for RegimeConfig {
    fn default() -> Self {
        Self {
            adx_min: 15.0,
            adx_max: 100.0,
            atr_min: 0.0001,
            bb_width_min: 0.01,
            buy_threshold: 0.5,
            sell_threshold: -0.5,
            conflict_penalty: 0.3,
        }
    }
}

impl RegimeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buy_threshold <= self.sell_threshold {
            return Err(ConfigError::ThresholdInversion {
                buy: self.buy_threshold,
                sell: self.sell_threshold,
            });
        }
        Ok(())
    }
}

/// Snapshot of the regime-gate indicators computed once per evaluation, from
/// the same window the detectors see.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeSnapshot {
    pub adx: f64,
    pub atr_fraction: f64,
    pub bb_width_fraction: f64,
    pub label: String,
}

impl RegimeSnapshot {
    fn compute(window: &CandleWindow, config: &RegimeConfig) -> Self {
        let bars = window.bars();
        let closes = window.closes();

        let adx = calculate_adx(bars, 14).unwrap_or(0.0);
        let last_close = bars.last().map(|b| b.close).unwrap_or(0.0);
        let atr_fraction = calculate_atr(bars, 14)
            .filter(|_| last_close != 0.0)
            .map(|atr| atr / last_close)
            .unwrap_or(0.0);
        let bb_width_fraction = calculate_bollinger(&closes, 20, 2.0)
            .map(|bb| bb.width / 100.0)
            .unwrap_or(0.0);

        let label = if adx >= config.adx_min && bb_width_fraction >= config.bb_width_min {
            "TRENDING"
        } else {
            "RANGING"
        };

        Self {
            adx,
            atr_fraction,
            bb_width_fraction,
            label: label.to_string(),
        }
    }

    /// Returns `Some(reason)` when the gate rejects this evaluation.
    fn gate_reason(&self, config: &RegimeConfig) -> Option<String> {
        if self.adx < config.adx_min {
            return Some(format!(
                "ADX {:.1} below minimum {:.1} — trend too weak",
                self.adx, config.adx_min
            ));
        }
        if self.atr_fraction < config.atr_min {
            return Some(format!(
                "ATR fraction {:.6} below minimum {:.6} — volatility insufficient",
                self.atr_fraction, config.atr_min
            ));
        }
        if self.bb_width_fraction < config.bb_width_min {
            return Some(format!(
                "BB width {:.4} below minimum {:.4} — market flat",
                self.bb_width_fraction, config.bb_width_min
            ));
        }
        None
    }

    fn warnings(&self, config: &RegimeConfig) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.adx > config.adx_max {
            warnings.push(format!(
                "ADX {:.1} above maximum {:.1}",
                self.adx, config.adx_max
            ));
        }
        warnings
    }
}

pub struct ConfluenceEngine {
    pub config: RegimeConfig,
}

impl ConfluenceEngine {
    pub fn new(config: RegimeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Evaluate the registry's `enabled` detectors over `window`, producing a
    /// single aggregated Signal per spec.md §4.3 steps 1-6.
    pub fn evaluate(
        &self,
        registry: &DetectorRegistry,
        enabled: &[String],
        window: &CandleWindow,
        ctx: &DetectorContext,
    ) -> Signal {
        let timestamp = window.last().map(|b| b.timestamp).unwrap_or(0);
        let snapshot = RegimeSnapshot::compute(window, &self.config);

        if let Some(reason) = snapshot.gate_reason(&self.config) {
            let mut tags = BTreeSet::new();
            tags.insert("CONFLUENCE:REGIME_FILTER".to_string());
            let mut meta = Meta::new();
            meta.insert(
                "regime_snapshot".to_string(),
                serde_json::to_value(&snapshot).unwrap_or_default(),
            );
            return Signal::clamped(Action::Hold, 0.0, vec![reason], tags, meta, timestamp);
        }

        let mut reasons = snapshot.warnings(&self.config);

        let contributions = registry.evaluate_all(enabled, window, ctx);

        let mut score = 0.0_f64;
        let mut buy_count = 0usize;
        let mut sell_count = 0usize;
        let mut tags = BTreeSet::new();
        let mut signal_count = 0usize;

        for (name, weight, signal) in &contributions {
            if signal.is_hold() {
                continue;
            }
            signal_count += 1;
            let direction = signal.direction() as f64;
            let contribution = weight * signal.confidence * direction;
            score += contribution;

            match signal.direction() {
                1 => buy_count += 1,
                -1 => sell_count += 1,
                _ => {}
            }

            reasons.push(format!(
                "{name}: {} (conf={:.2}, contrib={:+.3})",
                signal.action, signal.confidence, contribution
            ));
            tags.extend(signal.tags.iter().cloned());
        }

        if buy_count > 0 && sell_count > 0 {
            let conflicts = buy_count.min(sell_count) as f64;
            let penalty = (conflicts * self.config.conflict_penalty).min(1.0);
            reasons.push(format!(
                "Conflict: {buy_count} buy vs {sell_count} sell detectors, penalty={penalty:.2}"
            ));
            score *= 1.0 - penalty;
        }

        let action = if score >= self.config.buy_threshold {
            Action::Buy
        } else if score <= self.config.sell_threshold {
            Action::Sell
        } else {
            Action::Hold
        };

        let confidence = if action == Action::Hold {
            0.0
        } else {
            score.abs().min(1.0)
        };

        tags.insert(format!("CONFLUENCE:{action}"));

        let mut meta = Meta::new();
        meta.insert("score".to_string(), serde_json::json!(score));
        meta.insert("buy_count".to_string(), serde_json::json!(buy_count));
        meta.insert("sell_count".to_string(), serde_json::json!(sell_count));
        meta.insert("signal_count".to_string(), serde_json::json!(signal_count));
        meta.insert(
            "regime_snapshot".to_string(),
            serde_json::to_value(&snapshot).unwrap_or_default(),
        );
        meta.insert(
            "ctx".to_string(),
            serde_json::json!({"symbol": ctx.symbol, "timeframe": ctx.timeframe}),
        );

        Signal::clamped(action, confidence, reasons, tags, meta, timestamp)
    }
}
