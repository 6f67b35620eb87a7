// =============================================================================
// confluence_engine — algorithmic crypto trading decision engine
// =============================================================================
//
// Three tightly coupled subsystems: the Signal/Detector contract, the
// ConfluenceEngine (regime gate + weighted aggregation), and the
// Streaming/Backtest drivers with position bookkeeping. See DESIGN.md for
// the grounding ledger and SPEC_FULL.md for the full requirements this crate
// implements.

pub mod candle;
pub mod config;
pub mod confluence;
pub mod data_provider;
pub mod detector;
pub mod driver;
pub mod error;
pub mod indicators;
pub mod market_context;
pub mod position;
pub mod session;
pub mod signal;
pub mod volume_filter;

pub use candle::{Bar, BarEvent, CandleWindow};
pub use config::EngineConfig;
pub use confluence::ConfluenceEngine;
pub use detector::{Detector, DetectorContext, DetectorRegistry};
pub use error::{ConfigError, EngineError, InvariantViolation};
pub use session::ConfluenceSession;
pub use signal::{Action, Signal};
