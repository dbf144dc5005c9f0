// mtrs-view/src/xsection/errors.rs

use crate::geometry::GeometryError;
use crate::mesh::MeshError;
use ndarray_stats::errors::MinMaxError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrossSectionError {
    #[error("Unitialized field on CrossSectionBuilder: {0}")]
    UninitializedFieldError(String),
    #[error("Grid resolution must be at least 2x2, but got ni={0} and nj={1}")]
    InvalidGridResolution(usize, usize),
    #[error("Field {0} is not defined on the mesh. Available fields: {1:?}")]
    InvalidFieldName(String, Vec<String>),
    #[error("Resampling tolerance must be > 0, but got {0}")]
    InvalidTolerance(f64),
    #[error(transparent)]
    GeometryError(#[from] GeometryError),
    #[error(transparent)]
    MeshError(#[from] MeshError),
    #[error("Cross-section has no valid cells to derive color limits from")]
    NoValidCells,
    #[error("Color limits ({0}, {1}) are not valid for the requested scale")]
    InvalidColorLimits(f64, f64),
    #[error("Unreachable: Could not find an extreme value for the cross-section")]
    MinMaxError(#[from] MinMaxError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}
