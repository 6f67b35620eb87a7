// =============================================================================
// ConfluenceSession — top-level wiring object
// =============================================================================
//
// Owns the detector registry and the validated `EngineConfig`, and exposes
// `run_backtest`/`drive_realtime` entry points. Analogous to the teacher's
// `AppState` (a single struct holding every long-lived collaborator a
// session needs) but carrying only the core's state — no execution client,
// no exchange connection, no persistence.
//
// The registry is held behind an `Arc` rather than owned directly: bare
// ownership would work for `BacktestDriver` (borrowed for the run's
// duration) but not for `RealTimeDriver`, whose populate task is spawned
// onto the runtime and must own or share data with a `'static` bound.
// Sharing one `Arc<DetectorRegistry>` between both entry points avoids
// building the registry twice.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::candle::Bar;
use crate::config::EngineConfig;
use crate::confluence::ConfluenceEngine;
use crate::data_provider::DataProvider;
use crate::detector::DetectorRegistry;
use crate::driver::backtest::{BacktestDriver, BacktestReport};
use crate::driver::realtime::{OnDecision, RealTimeDriver};
use crate::error::ConfigError;
use crate::market_context::{MarketContext, MarketContextAnalyzer};
use crate::volume_filter::VolumeFilter;

pub struct ConfluenceSession {
    registry: Arc<DetectorRegistry>,
    config: EngineConfig,
    market_context: MarketContextAnalyzer,
}

impl ConfluenceSession {
    /// Validates `config` against a registry already populated with every
    /// detector the session may enable, and applies `config.backtest.weights`
    /// on top of whatever weights the caller registered with.
    pub fn new(mut registry: DetectorRegistry, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        for name in &config.backtest.enabled_detectors {
            if !registry.contains(name) {
                return Err(ConfigError::UnknownDetector { name: name.clone() });
            }
        }
        for (name, weight) in &config.backtest.weights {
            if !registry.contains(name) {
                return Err(ConfigError::UnknownDetector { name: name.clone() });
            }
            registry.set_weight(name, *weight)?;
        }

        Ok(Self {
            registry: Arc::new(registry),
            config,
            market_context: MarketContextAnalyzer::default(),
        })
    }

    pub fn registry(&self) -> &DetectorRegistry {
        &self.registry
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn enabled_detectors(&self) -> Vec<String> {
        if self.config.backtest.enabled_detectors.is_empty() {
            self.registry.order().to_vec()
        } else {
            self.config.backtest.enabled_detectors.clone()
        }
    }

    /// Classifies the coarse regime (BULLISH/BEARISH/CORRECTION) over a
    /// longer window, per spec.md §4.6. Callers feed the resulting
    /// multipliers into `DetectorRegistry::set_weight` before a run if they
    /// want regime-aware reweighting; the session does not apply them
    /// implicitly, since one registry may be shared across symbols with
    /// different regimes.
    pub fn classify_market_context(&self, context_bars: &[Bar]) -> Option<MarketContext> {
        self.market_context.analyze(context_bars)
    }

    /// Runs a finite bar history end-to-end and returns the report.
    pub fn run_backtest(&self, bars: &[Bar], symbol: &str, timeframe: &str) -> BacktestReport {
        let engine = ConfluenceEngine::new(self.config.regime)
            .expect("regime config already validated in ConfluenceSession::new");
        let volume_filter = VolumeFilter::new(self.config.volume_filter);

        let mut driver = BacktestDriver::new(
            &self.registry,
            engine,
            volume_filter,
            self.config.backtest.clone(),
            symbol,
            timeframe,
        );
        driver.run(bars)
    }

    /// Drives a live session until `stop` is set.
    pub async fn drive_realtime(
        &self,
        provider: Arc<dyn DataProvider>,
        on_decision: Arc<dyn OnDecision>,
        stop: Arc<AtomicBool>,
        symbol: &str,
        timeframe: &str,
    ) {
        let engine = ConfluenceEngine::new(self.config.regime)
            .expect("regime config already validated in ConfluenceSession::new");
        let volume_filter = VolumeFilter::new(self.config.volume_filter);
        let enabled = self.enabled_detectors();

        let mut driver = RealTimeDriver::new(
            self.registry.clone(),
            enabled,
            engine,
            volume_filter,
            crate::candle::DEFAULT_WINDOW_CAPACITY,
            symbol,
            timeframe,
        );
        driver
            .run(provider, self.config.event_queue_capacity, on_decision, stop)
            .await;
    }
}
