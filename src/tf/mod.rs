// mtrs-view/src/tf/mod.rs

mod errors;
mod ingest;
mod readers;
mod series;

pub use errors::TfError;
pub use ingest::{ingest_batch, ResponseSource, TfRecord, TipperSource, MU0};
pub use readers::{ReaderRegistry, StationTableReader, TfReader};
pub use series::{Channel, TfSeries};
