//! Error Taxonomy for the Constraint Engine.
//!
//! Two regimes, per the propagation policy: inside a propagation round every
//! error is a [`SolverError::Inconsistent`] so that it composes with trail
//! unwinding; outside propagation, boundary errors (bad declarations,
//! unsupported operators) are raised to the caller before any engine state
//! is modified.

use thiserror::Error;

/// Error type for engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SolverError {
    /// A contractor produced an empty interval, or a declaration is
    /// unsatisfiable. Triggers backtracking; counted, not diagnosed.
    #[error("inconsistent constraint store")]
    Inconsistent,
    /// An operand had the wrong type for an operator.
    #[error("type error: {0}")]
    TypeError(String),
    /// The expression used an operator the compiler does not accept.
    #[error("unsupported operator: {0}")]
    UnsupportedOperator(String),
    /// A declaration was malformed (e.g. empty bounds).
    #[error("invalid declaration: {0}")]
    InvalidDeclaration(String),
    /// A query referenced a variable with no attached interval.
    #[error("variable has no attached interval")]
    NoInterval,
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, SolverError>;
