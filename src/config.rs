// =============================================================================
// Config surface — enumerated options feeding engine, filter, drivers
// =============================================================================
//
// Grounded on spec.md §6's three config tables plus `runtime_config.rs`'s
// serde-default idiom (`#[serde(default = "...")]` on every field so an
// older persisted config still deserializes after new fields are added).
// `RegimeConfig` and `VolumeFilterConfig` live in `confluence::engine` and
// `volume_filter` respectively; this module is the session-level aggregate
// that ties them together with backtest-only settings.

use serde::{Deserialize, Serialize};

use crate::confluence::{RegimeConfig, VoteMode};
use crate::error::ConfigError;
use crate::volume_filter::VolumeFilterConfig;

fn default_initial_capital() -> f64 {
    10_000.0
}

fn default_position_size_pct() -> f64 {
    0.10
}

fn default_compound() -> bool {
    true
}

fn default_max_drawdown_pct() -> f64 {
    0.5
}

fn default_stop_mult() -> f64 {
    1.5
}

fn default_tp_mult() -> f64 {
    2.5
}

fn default_true() -> bool {
    true
}

/// Which aggregator produces the session's decisions: the full
/// `ConfluenceEngine`, or one of the legacy `VoteData` modes (used during a
/// shadow-mode validation phase — see `confluence::vote`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConfluenceMode {
    Engine,
    All,
    Any,
    Majority,
    Weighted,
}

impl Default for ConfluenceMode {
    fn default() -> Self {
        ConfluenceMode::Engine
    }
}

impl ConfluenceMode {
    pub fn as_vote_mode(self) -> Option<VoteMode> {
        match self {
            ConfluenceMode::Engine => None,
            ConfluenceMode::All => Some(VoteMode::All),
            ConfluenceMode::Any => Some(VoteMode::Any),
            ConfluenceMode::Majority => Some(VoteMode::Majority),
            ConfluenceMode::Weighted => Some(VoteMode::Weighted),
        }
    }
}

/// Backtest-only settings: position sizing, risk, and which detectors run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    #[serde(default = "default_initial_capital")]
    pub initial_capital: f64,

    #[serde(default = "default_position_size_pct")]
    pub position_size_pct: f64,

    #[serde(default = "default_compound")]
    pub compound: bool,

    #[serde(default = "default_max_drawdown_pct")]
    pub max_drawdown_pct: f64,

    #[serde(default = "default_stop_mult")]
    pub stop_mult: f64,

    #[serde(default = "default_tp_mult")]
    pub tp_mult: f64,

    #[serde(default)]
    pub enabled_detectors: Vec<String>,

    #[serde(default)]
    pub weights: std::collections::BTreeMap<String, f64>,

    #[serde(default)]
    pub confluence_mode: ConfluenceMode,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: default_initial_capital(),
            position_size_pct: default_position_size_pct(),
            compound: default_compound(),
            max_drawdown_pct: default_max_drawdown_pct(),
            stop_mult: default_stop_mult(),
            tp_mult: default_tp_mult(),
            enabled_detectors: Vec::new(),
            weights: std::collections::BTreeMap::new(),
            confluence_mode: ConfluenceMode::default(),
        }
    }
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_capital <= 0.0 {
            return Err(ConfigError::NonPositive {
                field: "initial_capital",
                value: self.initial_capital,
            });
        }
        if self.position_size_pct <= 0.0 {
            return Err(ConfigError::NonPositive {
                field: "position_size_pct",
                value: self.position_size_pct,
            });
        }
        for (name, weight) in &self.weights {
            if *weight < 0.0 {
                return Err(ConfigError::NegativeWeight {
                    name: name.clone(),
                    weight: *weight,
                });
            }
        }
        Ok(())
    }
}

/// The full set of enumerated options feeding a session: backtest/position
/// sizing, engine regime thresholds, and the volume filter.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub backtest: BacktestConfig,

    #[serde(default)]
    pub regime: RegimeConfig,

    #[serde(default)]
    pub volume_filter: VolumeFilterConfig,

    /// Bounded queue capacity between the stream reader and the
    /// `RealTimeDriver`'s evaluation task (spec.md §5).
    #[serde(default = "default_event_queue_capacity")]
    pub event_queue_capacity: usize,

    /// Whether the real-time driver fans detector evaluation out across a
    /// worker pool (spec.md §5's "Parallelism of detectors").
    #[serde(default = "default_true")]
    pub parallel_detectors: bool,
}

fn default_event_queue_capacity() -> usize {
    256
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.backtest.validate()?;
        self.regime.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_initial_capital_rejected() {
        let config = BacktestConfig {
            initial_capital: 0.0,
            ..BacktestConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositive { field: "initial_capital", .. })
        ));
    }

    #[test]
    fn negative_weight_rejected() {
        let mut weights = std::collections::BTreeMap::new();
        weights.insert("rsi_mean_reversion".to_string(), -1.0);
        let config = BacktestConfig {
            weights,
            ..BacktestConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NegativeWeight { .. })
        ));
    }

    #[test]
    fn confluence_mode_maps_to_vote_mode() {
        assert_eq!(ConfluenceMode::Engine.as_vote_mode(), None);
        assert_eq!(ConfluenceMode::All.as_vote_mode(), Some(VoteMode::All));
    }
}
