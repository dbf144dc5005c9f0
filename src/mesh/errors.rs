// mtrs-view/src/mesh/errors.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MeshError {
    #[error("Unitialized field on RectilinearMeshBuilder: {0}")]
    UninitializedFieldError(String),
    #[error("Axis {0} must have at least 2 strictly increasing coordinates")]
    InvalidAxis(char),
    #[error("Field {0} has shape {1:?} but the mesh has {2:?} nodes")]
    FieldShapeMismatch(String, Vec<usize>, [usize; 3]),
    #[error("Field {0} is not defined on the mesh")]
    FieldNotFound(String),
    #[error("Plane with normal {0:?} does not intersect the mesh")]
    EmptySlice([f64; 3]),
    #[error("Point table is incomplete: expected {0} lattice nodes but found {1}")]
    IncompletePointTable(usize, usize),
    #[error("Point table has no field columns after x,y,z")]
    NoFieldColumns,
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}
