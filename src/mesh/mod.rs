// mtrs-view/src/mesh/mod.rs

mod errors;
mod rectilinear;
mod traits;

pub use errors::MeshError;
pub use rectilinear::{Field, RectilinearMesh, RectilinearMeshBuilder};
pub use traits::{MeshQuery, PlaneSlice, SliceIndex};
