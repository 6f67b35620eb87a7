// =============================================================================
// Legacy VoteData aggregator + shadow-mode comparison
// =============================================================================
//
// Grounded on spec.md §4.3's "Polymorphism modes" clause (ALL/ANY/MAJORITY/
// WEIGHTED) and, for the comparison tooling, verbatim on
// `market_manus/confluence_mode/shadow_mode_validator.py`'s
// `ShadowModeValidator` — `compare_outputs`/`_check_agreement`/
// `get_agreement_stats`. This is the pre-ConfluenceEngine aggregator the
// streaming driver can fall back to during a shadow-mode validation phase.

use crate::signal::{Action, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteMode {
    All,
    Any,
    Majority,
    Weighted,
}

/// One detector's vote: the bar index it was evaluated at and its signed
/// direction (+1 BUY, -1 SELL, 0 HOLD is never recorded as a vote).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vote {
    pub bar_index: usize,
    pub direction: i8,
}

/// Converts detector contributions (as produced by `DetectorRegistry::
/// evaluate_all`) into the legacy `(bar_index, direction)` vote shape,
/// dropping HOLD signals.
pub fn votes_from_contributions(
    bar_index: usize,
    contributions: &[(String, f64, Signal)],
) -> Vec<Vote> {
    contributions
        .iter()
        .filter(|(_, _, s)| !s.is_hold())
        .map(|(_, _, s)| Vote {
            bar_index,
            direction: s.direction(),
        })
        .collect()
}

/// Runs one of the four legacy aggregation modes over a set of per-detector
/// votes (assumed to all share the same `bar_index`) plus their weights.
/// Returns the aggregated action; confidence is not modeled by the legacy
/// system so callers that need one should prefer `ConfluenceEngine`.
pub fn aggregate_votes(mode: VoteMode, votes: &[Vote], weights: &[f64]) -> Action {
    if votes.is_empty() {
        return Action::Hold;
    }

    match mode {
        VoteMode::All => {
            if votes.iter().all(|v| v.direction == 1) {
                Action::Buy
            } else if votes.iter().all(|v| v.direction == -1) {
                Action::Sell
            } else {
                Action::Hold
            }
        }
        VoteMode::Any => {
            // "Strongest-confidence" isn't representable in the stripped
            // (index, direction) tuple; the first non-HOLD vote's direction
            // stands in for it, matching the legacy tuple list's insertion
            // order (detectors are iterated in registry order upstream).
            match votes[0].direction {
                1 => Action::Buy,
                -1 => Action::Sell,
                _ => Action::Hold,
            }
        }
        VoteMode::Majority => {
            let buy = votes.iter().filter(|v| v.direction == 1).count();
            let sell = votes.iter().filter(|v| v.direction == -1).count();
            let total = votes.len();
            if buy * 2 > total {
                Action::Buy
            } else if sell * 2 > total {
                Action::Sell
            } else {
                Action::Hold
            }
        }
        VoteMode::Weighted => {
            let score: f64 = votes
                .iter()
                .zip(weights.iter().chain(std::iter::repeat(&1.0)))
                .map(|(v, w)| v.direction as f64 * w)
                .sum();
            if score > 0.0 {
                Action::Buy
            } else if score < 0.0 {
                Action::Sell
            } else {
                Action::Hold
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShadowComparisonResult {
    pub legacy_signal_count: usize,
    pub legacy_buy: usize,
    pub legacy_sell: usize,
    pub new_action: Action,
    pub new_confidence: f64,
    pub agreement: bool,
    pub differences: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AgreementStats {
    pub total_comparisons: u64,
    pub agreements: u64,
    pub disagreements: u64,
}

impl AgreementStats {
    pub fn agreement_rate(&self) -> f64 {
        if self.total_comparisons == 0 {
            0.0
        } else {
            self.agreements as f64 / self.total_comparisons as f64
        }
    }
}

/// Runs both aggregators over the same window and reports whether they
/// agree, plus a running agreement-rate statistic — grounded verbatim on
/// `ShadowModeValidator`.
pub struct ShadowModeValidator {
    stats: AgreementStats,
}

impl Default for ShadowModeValidator {
    fn default() -> Self {
        Self {
            stats: AgreementStats::default(),
        }
    }
}

impl ShadowModeValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> AgreementStats {
        self.stats
    }

    pub fn compare_outputs(
        &mut self,
        legacy_votes: &[Vote],
        new_signal: &Signal,
    ) -> ShadowComparisonResult {
        let legacy_buy = legacy_votes.iter().filter(|v| v.direction == 1).count();
        let legacy_sell = legacy_votes.iter().filter(|v| v.direction == -1).count();
        let legacy_total = legacy_votes.len();

        let agreement = self.check_agreement(legacy_votes, new_signal);

        let mut differences = Vec::new();
        if legacy_total == 0 && new_signal.action != Action::Hold {
            differences.push(format!(
                "Legacy: 0 signals, New: {} (conf={:.2})",
                new_signal.action, new_signal.confidence
            ));
        } else if legacy_total > 0 && new_signal.action == Action::Hold {
            differences.push(format!(
                "Legacy: {legacy_total} signals (BUY={legacy_buy}, SELL={legacy_sell}), New: HOLD"
            ));
        }
        if !agreement {
            let legacy_bias = if legacy_buy > legacy_sell {
                "BUY"
            } else if legacy_sell > legacy_buy {
                "SELL"
            } else {
                "NEUTRAL"
            };
            differences.push(format!(
                "Direction divergence: Legacy={legacy_bias}, New={}",
                new_signal.action
            ));
        }

        self.stats.total_comparisons += 1;
        if agreement {
            self.stats.agreements += 1;
        } else {
            self.stats.disagreements += 1;
        }

        ShadowComparisonResult {
            legacy_signal_count: legacy_total,
            legacy_buy,
            legacy_sell,
            new_action: new_signal.action,
            new_confidence: new_signal.confidence,
            agreement,
            differences,
        }
    }

    fn check_agreement(&self, legacy_votes: &[Vote], new_signal: &Signal) -> bool {
        if legacy_votes.is_empty() && new_signal.action == Action::Hold {
            return true;
        }
        if legacy_votes.is_empty() || new_signal.action == Action::Hold {
            return false;
        }

        let buy = legacy_votes.iter().filter(|v| v.direction == 1).count();
        let sell = legacy_votes.iter().filter(|v| v.direction == -1).count();
        let legacy_bias = if buy > sell {
            Some(Action::Buy)
        } else if sell > buy {
            Some(Action::Sell)
        } else {
            None
        };

        match legacy_bias {
            Some(bias) => bias == new_signal.action,
            None => new_signal.action == Action::Hold,
        }
    }
}
