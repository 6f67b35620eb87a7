// =============================================================================
// BacktestDriver — finite-history replay with position bookkeeping
// =============================================================================
//
// Grounded on spec.md §4.5's warm-up/per-bar loop and, verbatim for the
// position/exit/stats arithmetic, on
// `market_manus/backtest/confluence_backtest.py`'s `backtest_confluence`.
// Pipeline order per the Overview diagram: Detectors → VolumeFilter →
// ConfluenceEngine → PositionBookkeeping. Since `ConfluenceEngine::evaluate`
// already owns the detector fan-out and aggregation (§4.3 steps 1-6), the
// volume filter is applied here to the engine's aggregate Signal rather than
// to each detector's raw contribution — the source's `VolumeFilterPipeline`
// is generic over "a Signal and its bar's z-score" and does not prescribe
// which Signal. See DESIGN.md's Open Question log for this call.
//
// `pnl_pct` is reported as a fraction of capital, not a source-style
// percentage, to match the fraction convention used everywhere else in this
// crate (`atr_fraction`, `bb_width_fraction`, `roi`).

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::candle::{Bar, CandleWindow};
use crate::config::BacktestConfig;
use crate::confluence::ConfluenceEngine;
use crate::detector::{DetectorContext, DetectorRegistry};
use crate::position::{
    BacktestStats, DrawdownGuard, ExitReason, LogEntry, Position, Side, Trade,
};
use crate::signal::Action;
use crate::volume_filter::{calculate_volume_zscore, VolumeFilter};

const WARMUP_BARS: usize = 50;
const ATR_LOOKBACK: usize = 14;
const TRAILING_WINDOW: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub stats: BacktestStats,
    pub trades: Vec<Trade>,
    pub candle_log: Vec<LogEntry>,
    pub drawdown_guard_tripped: bool,
}

pub struct BacktestDriver<'a> {
    registry: &'a DetectorRegistry,
    engine: ConfluenceEngine,
    volume_filter: VolumeFilter,
    config: BacktestConfig,
    symbol: String,
    timeframe: String,
}

impl<'a> BacktestDriver<'a> {
    pub fn new(
        registry: &'a DetectorRegistry,
        engine: ConfluenceEngine,
        volume_filter: VolumeFilter,
        config: BacktestConfig,
        symbol: impl Into<String>,
        timeframe: impl Into<String>,
    ) -> Self {
        Self {
            registry,
            engine,
            volume_filter,
            config,
            symbol: symbol.into(),
            timeframe: timeframe.into(),
        }
    }

    /// Runs the full bar history and returns the final report. Bars before
    /// index `WARMUP_BARS` are not evaluated at all (spec.md §4.5).
    pub fn run(&mut self, bars: &[Bar]) -> BacktestReport {
        let enabled: Vec<String> = self.registry.order().to_vec();
        let ctx = DetectorContext::new(&self.symbol, &self.timeframe);

        let mut capital = self.config.initial_capital;
        let mut position: Option<Position> = None;
        let mut trades = Vec::new();
        let mut candle_log = Vec::new();
        let mut guard =
            DrawdownGuard::new(self.config.initial_capital, self.config.max_drawdown_pct);

        if bars.len() <= WARMUP_BARS {
            warn!(
                bars = bars.len(),
                "fewer bars than warm-up period, nothing to evaluate"
            );
            let stats = BacktestStats::compute(&trades, self.config.initial_capital, capital);
            return BacktestReport {
                stats,
                trades,
                candle_log,
                drawdown_guard_tripped: guard.tripped,
            };
        }

        for i in WARMUP_BARS..bars.len() {
            let slice = &bars[..=i];
            let window = CandleWindow::from_slice(slice, TRAILING_WINDOW);
            let bar = bars[i];

            let raw_signal = self.engine.evaluate(self.registry, &enabled, &window, &ctx);

            let volumes = window.volumes();
            let zscores =
                calculate_volume_zscore(&volumes, self.volume_filter.config.lookback_period);
            let zscore = zscores.last().copied().unwrap_or(0.0);
            let signal = self.volume_filter.filter_signal(&raw_signal, zscore);

            let atr = if i >= ATR_LOOKBACK {
                bars[i + 1 - ATR_LOOKBACK..=i]
                    .iter()
                    .map(|b| b.high - b.low)
                    .sum::<f64>()
                    / ATR_LOOKBACK as f64
            } else {
                bar.high - bar.low
            };

            let mut log_entry = LogEntry {
                index: i,
                timestamp: bar.timestamp,
                close: bar.close,
                action: signal.action.to_string(),
                confidence: signal.confidence,
                score: signal
                    .meta
                    .get("score")
                    .and_then(|v| v.as_f64())
                    .unwrap_or(0.0),
                reasons: signal.reasons.clone(),
                tags: signal.tags.iter().cloned().collect(),
                regime: signal
                    .meta
                    .get("regime_snapshot")
                    .and_then(|v| v.get("label"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("UNKNOWN")
                    .to_string(),
                buy_count: signal
                    .meta
                    .get("buy_count")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0) as usize,
                sell_count: signal
                    .meta
                    .get("sell_count")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0) as usize,
                signal_count: signal
                    .meta
                    .get("signal_count")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(0) as usize,
                trade_action: None,
                entry_price: None,
                exit_price: None,
                exit_reason: None,
                pnl: None,
                pnl_pct: None,
            };

            let guard_tripped = guard.update(capital, self.config.initial_capital);

            match &position {
                None => {
                    if !guard_tripped {
                        let side = match signal.action {
                            Action::Buy => Some(Side::Long),
                            Action::Sell => Some(Side::Short),
                            Action::Hold => None,
                        };
                        if let Some(side) = side {
                            let notional = capital * self.config.position_size_pct;
                            let opened = Position::open(
                                side,
                                bar.close,
                                i,
                                atr,
                                self.config.stop_mult,
                                self.config.tp_mult,
                                notional,
                                signal.clone(),
                            );
                            log_entry.trade_action = Some(match side {
                                Side::Long => "ENTRY_BUY".to_string(),
                                Side::Short => "ENTRY_SELL".to_string(),
                            });
                            log_entry.entry_price = Some(bar.close);
                            position = Some(opened);
                        }
                    }
                }
                Some(open_pos) => {
                    if let Some((exit_price, exit_reason)) =
                        open_pos.check_exit(bar.high, bar.low, bar.close, signal.action)
                    {
                        let pnl = open_pos.pnl(exit_price);
                        let pnl_pct = if capital != 0.0 { pnl / capital } else { 0.0 };
                        capital += pnl;

                        let side_label = match open_pos.side {
                            Side::Long => "BUY",
                            Side::Short => "SELL",
                        };
                        log_entry.trade_action = Some(format!("EXIT_{side_label}"));
                        log_entry.exit_price = Some(exit_price);
                        log_entry.exit_reason = Some(exit_reason);
                        log_entry.pnl = Some(pnl);
                        log_entry.pnl_pct = Some(pnl_pct);

                        trades.push(Trade {
                            entry_bar_index: open_pos.entry_bar_index,
                            exit_bar_index: i,
                            side: open_pos.side,
                            entry_price: open_pos.entry_price,
                            exit_price,
                            exit_reason,
                            pnl,
                            pnl_pct,
                            capital_after: capital,
                            entry_signal: open_pos.entry_signal.clone(),
                        });
                        position = None;
                    }
                }
            }

            candle_log.push(log_entry);
        }

        if let Some(open_pos) = position.take() {
            let last = bars.last().expect("checked non-empty above");
            let exit_price = last.close;
            let pnl = open_pos.pnl(exit_price);
            let pnl_pct = if capital != 0.0 { pnl / capital } else { 0.0 };
            capital += pnl;

            trades.push(Trade {
                entry_bar_index: open_pos.entry_bar_index,
                exit_bar_index: bars.len() - 1,
                side: open_pos.side,
                entry_price: open_pos.entry_price,
                exit_price,
                exit_reason: ExitReason::EndOfTest,
                pnl,
                pnl_pct,
                capital_after: capital,
                entry_signal: open_pos.entry_signal,
            });
        }

        let stats = BacktestStats::compute(&trades, self.config.initial_capital, capital);
        info!(
            total_trades = stats.total_trades,
            roi = stats.roi,
            drawdown_guard_tripped = guard.tripped,
            "backtest complete"
        );

        BacktestReport {
            stats,
            trades,
            candle_log,
            drawdown_guard_tripped: guard.tripped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confluence::RegimeConfig;
    use crate::detector::classical::EmaCrossoverDetector;
    use crate::volume_filter::VolumeFilter;

    fn trending_bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let c = 100.0 + i as f64 * 0.6;
                Bar::new(i as i64, c - 0.4, c + 1.0, c - 1.0, c, 1000.0)
            })
            .collect()
    }

    #[test]
    fn trending_run_opens_at_least_one_trade() {
        let mut registry = DetectorRegistry::new();
        registry
            .register(Box::new(EmaCrossoverDetector::default()), 1.0)
            .unwrap();
        let engine = ConfluenceEngine::new(RegimeConfig::default()).unwrap();
        let volume_filter = VolumeFilter::new(Default::default());
        let config = BacktestConfig::default();
        let mut driver = BacktestDriver::new(&registry, engine, volume_filter, config, "BTCUSDT", "1h");

        let bars = trending_bars(200);
        let report = driver.run(&bars);

        assert_eq!(report.candle_log.len(), bars.len() - 50);
        assert!(report.stats.final_capital.is_finite());
    }

    #[test]
    fn too_few_bars_returns_empty_report() {
        let registry = DetectorRegistry::new();
        let engine = ConfluenceEngine::new(RegimeConfig::default()).unwrap();
        let volume_filter = VolumeFilter::new(Default::default());
        let config = BacktestConfig::default();
        let mut driver = BacktestDriver::new(&registry, engine, volume_filter, config, "BTCUSDT", "1h");

        let bars = trending_bars(10);
        let report = driver.run(&bars);
        assert!(report.candle_log.is_empty());
        assert_eq!(report.stats.total_trades, 0);
    }
}
