// =============================================================================
// Error taxonomy
// =============================================================================
//
// Two fatal kinds, both typed so callers can match on them:
//   - ConfigError        — invalid session configuration, caught before any
//                           bar is processed.
//   - InvariantViolation  — a detector broke the Signal contract; the engine
//                           refuses to aggregate and names the offender.
//
// Everything else (transport failures from `DataProvider`, anything
// I/O-shaped) stays `anyhow::Result` at the boundary, the same way the
// teacher crate threads `anyhow::Context` through its streaming code.
// "InsufficientData" deliberately has no variant here: detectors recover it
// locally as a HOLD signal and it never surfaces as an error (spec.md §7).
// =============================================================================

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("detector weight must be non-negative, got {weight} for '{name}'")]
    NegativeWeight { name: String, weight: f64 },

    #[error("unknown detector name '{name}' in enabled_detectors")]
    UnknownDetector { name: String },

    #[error("duplicate detector name '{name}' in registry")]
    DuplicateDetector { name: String },

    #[error("detector name '{name}' is not lowercase snake_case")]
    InvalidDetectorName { name: String },

    #[error("buy_threshold ({buy}) must be strictly greater than sell_threshold ({sell})")]
    ThresholdInversion { buy: f64, sell: f64 },

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
}

#[derive(Debug, Error, PartialEq)]
pub enum InvariantViolation {
    #[error("detector '{detector}' returned confidence {confidence} outside [0,1]")]
    ConfidenceOutOfRange { detector: String, confidence: f64 },

    #[error("detector '{detector}' returned an unrecognized action")]
    UnknownAction { detector: String },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),
}
