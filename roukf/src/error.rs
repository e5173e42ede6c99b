//! Error types for the reduced-order filter.

use std::fmt;

use thiserror::Error;

/// Which configured dimension a length check was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    States,
    Parameters,
    Observations,
    StateUncertainty,
    ParameterUncertainty,
    ObservationUncertainty,
    /// Number of parameters a mapper was built for.
    Mapper,
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Quantity::States => "states",
            Quantity::Parameters => "parameters",
            Quantity::Observations => "observations",
            Quantity::StateUncertainty => "state uncertainty",
            Quantity::ParameterUncertainty => "parameter uncertainty",
            Quantity::ObservationUncertainty => "observation uncertainty",
            Quantity::Mapper => "parameter mapper",
        };
        f.write_str(name)
    }
}

/// Errors reported by the filter and its components.
#[derive(Debug, Error)]
pub enum FilterError {
    /// A supplied buffer does not match the configured dimension.
    #[error("dimension mismatch for {quantity}: expected {expected}, got {actual}")]
    DimensionMismatch {
        quantity: Quantity,
        expected: usize,
        actual: usize,
    },

    /// The forward operator failed for the listed sigma points and the
    /// failure policy did not allow the step to continue.
    #[error("forward operator failed for sigma points {failed:?}")]
    OperatorFailure { failed: Vec<usize> },

    /// The innovation covariance could not be factorized, even after
    /// diagonal regularization, or the update produced non-finite values.
    #[error("innovation covariance is singular or non-finite")]
    SingularInnovation,

    /// The filter was used before `reset` supplied its dimensions.
    #[error("filter used before initialization")]
    UninitializedUse,

    /// A previous step failed; reset or clear the fault before stepping again.
    #[error("filter is faulted by a previous step")]
    Faulted,

    /// A setup value or option is outside its valid range.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A parameter lies outside the domain of the configured mapper.
    #[error("parameter {index} = {value} is outside the mapper domain")]
    InvalidParameter { index: usize, value: f64 },

    /// Gathering sigma-point results across workers failed.
    #[error("communication failure: {0}")]
    Communication(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed configuration file: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = core::result::Result<T, FilterError>;
