// mtrs-view/src/composite/mod.rs

mod builder;
mod curve;
mod errors;
mod session;

pub use builder::{build_composite, build_from_session, CompositeExporter};
pub use curve::CompositeCurve;
pub use errors::CompositeError;
pub use session::{PeriodBand, Session};
