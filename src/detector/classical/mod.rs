// =============================================================================
// Classical indicator detectors
// =============================================================================
//
// Each struct here is a thin, stateless wrapper around one of the pure
// `indicators::*` functions, turned into a `Detector` by applying a
// threshold/crossover rule and packaging the result as a `Signal`. Formulas
// for rsi/ema/bollinger/macd/stochastic/williams_r/adx/fibonacci are grounded
// verbatim against `confluence_engine_adapter.py`'s `_detect_*_signal`
// methods; the rest (parabolic_sar, vwap, cpr, ma_ribbon, momentum_combo,
// pivot_point) have no teacher-adapter counterpart and are written fresh in
// the same threshold/crossover idiom.

pub mod adx;
pub mod bollinger_breakout;
pub mod cpr;
pub mod ema_crossover;
pub mod fibonacci;
pub mod ma_ribbon;
pub mod macd;
pub mod momentum_combo;
pub mod parabolic_sar;
pub mod pivot_point;
pub mod rsi_mean_reversion;
pub mod stochastic;
pub mod vwap;
pub mod williams_r;

pub use adx::AdxDetector;
pub use bollinger_breakout::BollingerBreakoutDetector;
pub use cpr::CprDetector;
pub use ema_crossover::EmaCrossoverDetector;
pub use fibonacci::FibonacciDetector;
pub use ma_ribbon::MaRibbonDetector;
pub use macd::MacdDetector;
pub use momentum_combo::MomentumComboDetector;
pub use parabolic_sar::ParabolicSarDetector;
pub use pivot_point::PivotPointDetector;
pub use rsi_mean_reversion::RsiMeanReversionDetector;
pub use stochastic::StochasticDetector;
pub use vwap::VwapDetector;
pub use williams_r::WilliamsRDetector;
