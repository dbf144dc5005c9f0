// mtrs-view/src/composite/errors.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompositeError {
    #[error("Composite is empty; build a composite or select transfer functions first")]
    EmptyComposite,
    #[error("A transfer function labelled {0} is already part of the session")]
    DuplicateLabel(String),
    #[error("Malformed composite table: {0}")]
    MalformedCsv(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}
