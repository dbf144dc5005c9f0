use pretty_env_logger;
use std::sync::Once;

static INIT: Once = Once::new();

/// Idempotent logger setup for tests and embedding applications.
pub fn _setup_pretty_env_logger_default() {
    INIT.call_once(|| {
        pretty_env_logger::init();
    });
}

pub use composite::{build_composite, CompositeCurve, CompositeError, PeriodBand, Session};
pub use geometry::{Bounds, CuttingPlane, GeometryError};
pub use mesh::{MeshError, MeshQuery, PlaneSlice, RectilinearMesh};
pub use tf::{Channel, TfError, TfRecord, TfSeries};
pub use xsection::{sample_cross_section, CrossSection, CrossSectionError};
pub mod composite;
pub mod geometry;
pub mod mesh;
pub mod tf;
pub mod xsection;
