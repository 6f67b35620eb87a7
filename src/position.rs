// =============================================================================
// Position bookkeeping — sizing, stop/target tracking, trade ledger
// =============================================================================
//
// Grounded on spec.md §4.5's Position/Trade field lists and §3's Data Model
// section (component G, "Position/Capital bookkeeping"); shaped after the
// teacher's plain-struct-plus-BTreeMap ledger idiom used elsewhere in the
// crate rather than any one source file, since the teacher's own
// `position_engine.rs`/`risk.rs` model live-exchange positions (margin,
// leverage, liquidation price) that this single-position backtest ledger has
// no use for.

use serde::{Deserialize, Serialize};

use crate::signal::Signal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
    SignalReversal,
    EndOfTest,
}

/// An open backtest position. At most one exists at any time — no
/// pyramiding (spec.md §3's Invariants).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub side: Side,
    pub entry_price: f64,
    pub entry_bar_index: usize,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub notional_size: f64,
    pub entry_signal: Signal,
}

impl Position {
    /// Opens a LONG or SHORT sized off `capital * position_pct`, with
    /// stop/target placed `stop_mult`/`tp_mult` ATRs from entry per
    /// spec.md §4.5 step C.
    pub fn open(
        side: Side,
        entry_price: f64,
        entry_bar_index: usize,
        atr: f64,
        stop_mult: f64,
        tp_mult: f64,
        notional_size: f64,
        entry_signal: Signal,
    ) -> Self {
        let (stop_loss, take_profit) = match side {
            Side::Long => (
                entry_price - stop_mult * atr,
                entry_price + tp_mult * atr,
            ),
            Side::Short => (
                entry_price + stop_mult * atr,
                entry_price - tp_mult * atr,
            ),
        };
        Self {
            side,
            entry_price,
            entry_bar_index,
            stop_loss,
            take_profit,
            notional_size,
            entry_signal,
        }
    }

    /// Checks for a single exit at bar `i`, in the priority order spec.md
    /// §4.5 step C.1/C.2 enumerates: stop first, then target, then a
    /// reversing Signal. Returns `(exit_price, reason)`.
    pub fn check_exit(
        &self,
        high: f64,
        low: f64,
        close: f64,
        signal_action: crate::signal::Action,
    ) -> Option<(f64, ExitReason)> {
        use crate::signal::Action;
        match self.side {
            Side::Long => {
                if low <= self.stop_loss {
                    Some((self.stop_loss, ExitReason::StopLoss))
                } else if high >= self.take_profit {
                    Some((self.take_profit, ExitReason::TakeProfit))
                } else if signal_action == Action::Sell {
                    Some((close, ExitReason::SignalReversal))
                } else {
                    None
                }
            }
            Side::Short => {
                if high >= self.stop_loss {
                    Some((self.stop_loss, ExitReason::StopLoss))
                } else if low <= self.take_profit {
                    Some((self.take_profit, ExitReason::TakeProfit))
                } else if signal_action == Action::Buy {
                    Some((close, ExitReason::SignalReversal))
                } else {
                    None
                }
            }
        }
    }

    /// `pnl = (exit - entry) * notional / entry` for LONG, mirrored for
    /// SHORT (spec.md §4.5's stated convention, inherited verbatim from the
    /// source system — notional is a USD-quoted nominal, not a contract
    /// count).
    pub fn pnl(&self, exit_price: f64) -> f64 {
        match self.side {
            Side::Long => (exit_price - self.entry_price) * self.notional_size / self.entry_price,
            Side::Short => (self.entry_price - exit_price) * self.notional_size / self.entry_price,
        }
    }
}

/// One closed backtest trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub entry_bar_index: usize,
    pub exit_bar_index: usize,
    pub side: Side,
    pub entry_price: f64,
    pub exit_price: f64,
    pub exit_reason: ExitReason,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub capital_after: f64,
    pub entry_signal: Signal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub struct BacktestStats {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub total_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub profit_factor: f64,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub roi: f64,
}

impl BacktestStats {
    /// Derives every aggregate from the trade ledger plus the starting/
    /// ending capital — spec.md §6's stable `stats` schema.
    pub fn compute(trades: &[Trade], initial_capital: f64, final_capital: f64) -> Self {
        let total_trades = trades.len();
        let wins: Vec<&Trade> = trades.iter().filter(|t| t.pnl > 0.0).collect();
        let losses: Vec<&Trade> = trades.iter().filter(|t| t.pnl < 0.0).collect();
        let winning_trades = wins.len();
        let losing_trades = losses.len();
        let total_pnl: f64 = trades.iter().map(|t| t.pnl).sum();
        let win_rate = if total_trades == 0 {
            0.0
        } else {
            winning_trades as f64 / total_trades as f64
        };
        let avg_win = if wins.is_empty() {
            0.0
        } else {
            wins.iter().map(|t| t.pnl).sum::<f64>() / wins.len() as f64
        };
        let avg_loss = if losses.is_empty() {
            0.0
        } else {
            losses.iter().map(|t| t.pnl).sum::<f64>() / losses.len() as f64
        };
        let gross_profit: f64 = wins.iter().map(|t| t.pnl).sum();
        let gross_loss: f64 = losses.iter().map(|t| t.pnl.abs()).sum();
        let profit_factor = if gross_loss == 0.0 {
            if gross_profit > 0.0 {
                f64::INFINITY
            } else {
                0.0
            }
        } else {
            gross_profit / gross_loss
        };
        let roi = if initial_capital == 0.0 {
            0.0
        } else {
            (final_capital - initial_capital) / initial_capital
        };

        Self {
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            total_pnl,
            avg_win,
            avg_loss,
            profit_factor,
            initial_capital,
            final_capital,
            roi,
        }
    }
}

/// Per-bar log entry — spec.md §4.5's "Per-bar log" schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub index: usize,
    pub timestamp: i64,
    pub close: f64,
    pub action: String,
    pub confidence: f64,
    pub score: f64,
    pub reasons: Vec<String>,
    pub tags: Vec<String>,
    pub regime: String,
    pub buy_count: usize,
    pub sell_count: usize,
    pub signal_count: usize,
    pub trade_action: Option<String>,
    pub entry_price: Option<f64>,
    pub exit_price: Option<f64>,
    pub exit_reason: Option<ExitReason>,
    pub pnl: Option<f64>,
    pub pnl_pct: Option<f64>,
}

/// Tracks `peak_capital` and whether the drawdown guard has tripped.
/// Grounded on spec.md §4.5's "Drawdown guard" clause — once tripped, the
/// driver stops opening new positions for the rest of the run but keeps
/// managing/closing the position already open, if any.
#[derive(Debug, Clone, Copy)]
pub struct DrawdownGuard {
    pub peak_capital: f64,
    pub max_drawdown_pct: f64,
    pub tripped: bool,
}

impl DrawdownGuard {
    pub fn new(initial_capital: f64, max_drawdown_pct: f64) -> Self {
        Self {
            peak_capital: initial_capital,
            max_drawdown_pct,
            tripped: false,
        }
    }

    /// Updates `peak_capital` and the tripped flag from the current
    /// capital. Returns `true` if the guard is tripped (before or after
    /// this update) — callers use this to gate new-position opens.
    pub fn update(&mut self, capital: f64, initial_capital: f64) -> bool {
        self.peak_capital = self.peak_capital.max(capital);
        if initial_capital > 0.0
            && (self.peak_capital - capital) / initial_capital > self.max_drawdown_pct
        {
            self.tripped = true;
        }
        self.tripped
    }
}
