//! score/organum-score/src/error.rs
//! Error taxonomy for generation.
//!
//! Only hard failures surface as errors: a bad configuration, or a stage
//! that produced nothing to build on. Repair failures inside the
//! validation stack are warnings plus report counters, never errors.

use thiserror::Error;

/// Failure modes that abort generation with no partial score.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerateError {
    /// An option in the form configuration is out of its legal domain.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A timeline or primitive yielded zero notes.
    #[error("empty result: {0}")]
    EmptyResult(String),
}
