// mtrs-view/src/tf/errors.rs

use ndarray_stats::errors::MinMaxError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TfError {
    #[error("Transfer function {0} has no period data")]
    MissingPeriodData(String),
    #[error("Transfer function {0}: {1} has length {2} but period has length {3}")]
    LengthMismatch(String, String, usize, usize),
    #[error("Transfer function {0} has a non-positive or non-finite period: {1}")]
    NonPositivePeriod(String, f64),
    #[error("Transfer function {0}: {1} must be positive, got {2}")]
    NonPositiveResistivity(String, String, f64),
    #[error("Transfer function {0}: {1} must not be negative, got {2}")]
    NegativeTipper(String, String, f64),
    #[error("Transfer function {0}: impedance tensor must have shape (n, 2, 2), got {1:?}")]
    InvalidImpedanceShape(String, Vec<usize>),
    #[error("Transfer function {0}: tipper must have shape (n, 2), got {1:?}")]
    InvalidTipperShape(String, Vec<usize>),
    #[error("No reader registered for extension {0:?}")]
    UnknownExtension(String),
    #[error("Unreachable: Could not find the period range")]
    MinMaxError(#[from] MinMaxError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}
