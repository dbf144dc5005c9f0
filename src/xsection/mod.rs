// mtrs-view/src/xsection/mod.rs

mod cross_section;
mod errors;
mod sampler;

pub use cross_section::{ColorScale, CrossSection};
pub use errors::CrossSectionError;
pub use sampler::{sample_cross_section, CrossSectionBuilder};
