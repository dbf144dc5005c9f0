// mtrs-view/src/tf/readers.rs

use super::errors::TfError;
use super::ingest::{ResponseSource, TfRecord, TipperSource};
use super::series::TfSeries;
use log::{debug, info, warn};
use ndarray::{Array1, Array2};
use rayon::prelude::*;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Parses one transfer-function file format into a `TfRecord`.
pub trait TfReader: Send + Sync {
    fn read(&self, path: &Path) -> Result<TfRecord, TfError>;
}

/// Per-station table with columns `period,rho_xy,ph_xy,rho_yx,ph_yx` and
/// optional `tip_zx_amp,tip_zy_amp`. The YX phase is stored raw.
pub struct StationTableReader;

#[derive(Deserialize)]
struct StationRow {
    period: f64,
    rho_xy: f64,
    ph_xy: f64,
    rho_yx: f64,
    ph_yx: f64,
    #[serde(default)]
    tip_zx_amp: Option<f64>,
    #[serde(default)]
    tip_zy_amp: Option<f64>,
}

impl TfReader for StationTableReader {
    fn read(&self, path: &Path) -> Result<TfRecord, TfError> {
        let station = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string());
        let mut reader = csv::Reader::from_path(path)?;
        let mut rows: Vec<StationRow> = Vec::new();
        for row in reader.deserialize() {
            rows.push(row?);
        }
        debug!("Read {} periods from {}", rows.len(), path.display());

        let column = |get: fn(&StationRow) -> f64| -> Array1<f64> {
            rows.iter().map(get).collect()
        };
        let period = if rows.is_empty() {
            None
        } else {
            Some(column(|r| r.period))
        };
        let response = ResponseSource::Direct {
            rho_xy: column(|r| r.rho_xy),
            rho_yx: column(|r| r.rho_yx),
            ph_xy: column(|r| r.ph_xy),
            ph_yx: column(|r| r.ph_yx),
        };

        let with_tipper = rows
            .iter()
            .filter(|r| r.tip_zx_amp.is_some() && r.tip_zy_amp.is_some())
            .count();
        let tipper = if !rows.is_empty() && with_tipper == rows.len() {
            let mut amplitude = Array2::zeros((rows.len(), 2));
            for (k, row) in rows.iter().enumerate() {
                amplitude[[k, 0]] = row.tip_zx_amp.unwrap_or(0.0);
                amplitude[[k, 1]] = row.tip_zy_amp.unwrap_or(0.0);
            }
            Some(TipperSource::Amplitude(amplitude))
        } else {
            if with_tipper > 0 {
                warn!(
                    "{}: tipper given for only {} of {} periods, ignoring it",
                    path.display(),
                    with_tipper,
                    rows.len()
                );
            }
            None
        };

        Ok(TfRecord {
            station,
            period,
            response,
            tipper,
        })
    }
}

/// Maps lowercase file extensions to the reader that understands them.
#[derive(Default)]
pub struct ReaderRegistry {
    readers: HashMap<String, Box<dyn TfReader>>,
}

impl ReaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in station-table reader on `.csv`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("csv", Box::new(StationTableReader));
        registry
    }

    pub fn register(&mut self, extension: &str, reader: Box<dyn TfReader>) -> &mut Self {
        self.readers.insert(normalize_extension(extension), reader);
        self
    }

    pub fn extensions(&self) -> Vec<String> {
        let mut extensions: Vec<String> = self.readers.keys().cloned().collect();
        extensions.sort();
        extensions
    }

    pub fn supports(&self, path: &Path) -> bool {
        self.reader_for(path).is_ok()
    }

    fn reader_for(&self, path: &Path) -> Result<&dyn TfReader, TfError> {
        let extension = path
            .extension()
            .map(|ext| normalize_extension(&ext.to_string_lossy()))
            .unwrap_or_default();
        self.readers
            .get(&extension)
            .map(|reader| reader.as_ref())
            .ok_or(TfError::UnknownExtension(extension))
    }

    pub fn read(&self, path: &Path) -> Result<TfRecord, TfError> {
        self.reader_for(path)?.read(path)
    }

    /// Read and build every file in parallel; failing files are reported and
    /// skipped. Output keeps the input order.
    pub fn read_all<P>(&self, paths: &[P]) -> (Vec<TfSeries>, Vec<TfError>)
    where
        P: AsRef<Path> + Sync,
    {
        let results: Vec<Result<TfSeries, TfError>> = paths
            .par_iter()
            .map(|path| {
                let path = path.as_ref();
                self.read(path)
                    .and_then(|record| TfSeries::from_record(&record))
                    .map_err(|e| {
                        warn!("Skipping {}: {}", path.display(), e);
                        e
                    })
            })
            .collect();
        let mut series = Vec::with_capacity(paths.len());
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(built) => series.push(built),
                Err(e) => failures.push(e),
            }
        }
        info!(
            "Loaded {} of {} transfer function files",
            series.len(),
            paths.len()
        );
        (series, failures)
    }
}

fn normalize_extension(extension: &str) -> String {
    extension.trim_start_matches('.').to_lowercase()
}
