// =============================================================================
// Signal — the sole output type of every Detector and of the engine itself
// =============================================================================
//
// Mirrors market_manus/core/signal.py's validation: a Signal is built through
// a fallible constructor so a misbehaving detector is caught at the source
// rather than propagating a silently-invalid value into the aggregation
// pipeline (see error::InvariantViolation).
// =============================================================================

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::InvariantViolation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    /// Signed direction: BUY = +1, SELL = -1, HOLD = 0.
    pub fn direction(self) -> i8 {
        match self {
            Action::Buy => 1,
            Action::Sell => -1,
            Action::Hold => 0,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
            Action::Hold => write!(f, "HOLD"),
        }
    }
}

/// Detector-specific diagnostics (indicator values, zones, swept levels).
pub type Meta = BTreeMap<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub action: Action,
    pub confidence: f64,
    pub reasons: Vec<String>,
    pub tags: BTreeSet<String>,
    pub meta: Meta,
    pub timestamp: i64,
}

impl Signal {
    /// Construct a Signal, validating the contract every detector must
    /// uphold. Returns `InvariantViolation` rather than clamping — detector
    /// authors must get confidence right; clamping is reserved for the
    /// engine's own aggregate output (see confluence::engine).
    pub fn new(
        detector: &str,
        action: Action,
        confidence: f64,
        reasons: Vec<String>,
        tags: BTreeSet<String>,
        meta: Meta,
        timestamp: i64,
    ) -> Result<Self, InvariantViolation> {
        if !(0.0..=1.0).contains(&confidence) || !confidence.is_finite() {
            return Err(InvariantViolation::ConfidenceOutOfRange {
                detector: detector.to_string(),
                confidence,
            });
        }
        Ok(Self {
            action,
            confidence,
            reasons,
            tags,
            meta,
            timestamp,
        })
    }

    /// A HOLD signal with a single reason and no tags — the common case for
    /// "not enough data" or "nothing detected".
    pub fn hold(reason: impl Into<String>, timestamp: i64) -> Self {
        Self {
            action: Action::Hold,
            confidence: 0.0,
            reasons: vec![reason.into()],
            tags: BTreeSet::new(),
            meta: Meta::new(),
            timestamp,
        }
    }

    pub fn direction(&self) -> i8 {
        self.action.direction()
    }

    pub fn is_hold(&self) -> bool {
        self.action == Action::Hold
    }

    /// Build a Signal from an internally-computed confidence, clamping out of
    /// range or non-finite values rather than erroring. Detector authors in
    /// this crate use this instead of the fallible `new()`: `evaluate` has no
    /// way to surface a `Result`, so the clamp happens here instead, at the
    /// one call site that is trusted to already be close to `[0,1]`.
    pub(crate) fn clamped(
        action: Action,
        confidence: f64,
        reasons: Vec<String>,
        tags: BTreeSet<String>,
        meta: Meta,
        timestamp: i64,
    ) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            action,
            confidence,
            reasons,
            tags,
            meta,
            timestamp,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }
}
