pub mod backtest;
pub mod realtime;

pub use backtest::{BacktestDriver, BacktestReport};
pub use realtime::{CounterSnapshot, DriverCounters, OnDecision, RealTimeDriver};
