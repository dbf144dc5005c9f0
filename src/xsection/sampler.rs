// mtrs-view/src/xsection/sampler.rs

use super::cross_section::CrossSection;
use super::errors::CrossSectionError;
use crate::geometry::CuttingPlane;
use crate::mesh::{MeshError, MeshQuery};
use humantime::format_duration;
use libm::hypot;
use log::{debug, info, warn};
use ndarray::{Array, Array2};
use std::time::Instant;

/// Sample `field_name` on a vertical section between `p1` and `p2`.
///
/// Returns `ni x nj` grids; row `i` walks up the section and column `j`
/// walks along it from the `p2` end towards `p1`, so `distance[[i, 0]]` is
/// always zero.
pub fn sample_cross_section(
    mesh: &dyn MeshQuery,
    p1: [f64; 2],
    p2: [f64; 2],
    z_top: f64,
    z_bot: f64,
    field_name: &str,
    ni: usize,
    nj: usize,
) -> Result<CrossSection, CrossSectionError> {
    CrossSectionBuilder::default()
        .mesh(mesh)
        .p1(&p1)
        .p2(&p2)
        .z_top(&z_top)
        .z_bot(&z_bot)
        .field(field_name)
        .ni(&ni)
        .nj(&nj)
        .build()
}

#[derive(Default)]
pub struct CrossSectionBuilder<'a> {
    mesh: Option<&'a dyn MeshQuery>,
    p1: Option<&'a [f64; 2]>,
    p2: Option<&'a [f64; 2]>,
    z_top: Option<&'a f64>,
    z_bot: Option<&'a f64>,
    field: Option<&'a str>,
    ni: Option<&'a usize>,
    nj: Option<&'a usize>,
    tolerance: Option<&'a f64>,
}

impl<'a> CrossSectionBuilder<'a> {
    pub fn build(&self) -> Result<CrossSection, CrossSectionError> {
        info!("Starting cross-section sampling");
        let build_start = Instant::now();

        let mesh = self
            .mesh
            .ok_or_else(|| CrossSectionError::UninitializedFieldError("mesh".to_string()))?;
        let ni = *self
            .ni
            .ok_or_else(|| CrossSectionError::UninitializedFieldError("ni".to_string()))?;
        let nj = *self
            .nj
            .ok_or_else(|| CrossSectionError::UninitializedFieldError("nj".to_string()))?;
        Self::validate_resolution(ni, nj)?;
        let p1 = self
            .p1
            .ok_or_else(|| CrossSectionError::UninitializedFieldError("p1".to_string()))?;
        let p2 = self
            .p2
            .ok_or_else(|| CrossSectionError::UninitializedFieldError("p2".to_string()))?;
        let z_top = self
            .z_top
            .ok_or_else(|| CrossSectionError::UninitializedFieldError("z_top".to_string()))?;
        let z_bot = self
            .z_bot
            .ok_or_else(|| CrossSectionError::UninitializedFieldError("z_bot".to_string()))?;
        let field = self
            .field
            .ok_or_else(|| CrossSectionError::UninitializedFieldError("field".to_string()))?;
        Self::validate_field(mesh, field)?;
        let plane = CuttingPlane::new(*p1, *p2, *z_top, *z_bot)?;
        let tolerance = match self.tolerance {
            Some(value) => {
                Self::validate_tolerance(value)?;
                *value
            }
            None => {
                let calculated = 0.5 * mesh.characteristic_length();
                debug!("Calculated resampling tolerance: {}", calculated);
                calculated
            }
        };

        // cut through the mesh centre, not through p1/p2
        let normal = plane.unit_normal();
        let origin = mesh.center();
        debug!("Slicing {} with normal {:?} through {:?}", field, normal, origin);
        let slice_start = Instant::now();
        let slice = mesh.slice(&origin, &normal, field)?;
        let center = slice
            .center()
            .ok_or_else(|| MeshError::EmptySlice([normal.x, normal.y, normal.z]))?;
        debug!(
            "Slice has {} points, took {}",
            slice.len(),
            format_duration(slice_start.elapsed())
        );

        let (vx, vy) = plane.basis();
        let (mut umin, mut umax) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut vmin, mut vmax) = (f64::INFINITY, f64::NEG_INFINITY);
        for point in slice.iter_points() {
            let offset = point - center;
            let u = offset.dot(&vx);
            let v = offset.dot(&vy);
            umin = umin.min(u);
            umax = umax.max(u);
            vmin = vmin.min(v);
            vmax = vmax.max(v);
        }
        let us = Array::linspace(umin, umax, ni);
        let vs = Array::linspace(vmin, vmax, nj);

        let mut targets = Array2::<f64>::zeros((ni * nj, 3));
        for (i, &u) in us.iter().enumerate() {
            for (j, &v) in vs.iter().enumerate() {
                let p = center + vx * u + vy * v;
                let row = i * nj + j;
                targets[[row, 0]] = p.x;
                targets[[row, 1]] = p.y;
                targets[[row, 2]] = p.z;
            }
        }

        let resample_start = Instant::now();
        let (values, valid) = mesh.resample(&slice, targets.view(), tolerance);
        debug!(
            "Resampled {} target points in {}",
            ni * nj,
            format_duration(resample_start.elapsed())
        );

        let x = Array2::from_shape_fn((ni, nj), |(i, j)| targets[[i * nj + j, 0]]);
        let y = Array2::from_shape_fn((ni, nj), |(i, j)| targets[[i * nj + j, 1]]);
        let z = Array2::from_shape_fn((ni, nj), |(i, j)| targets[[i * nj + j, 2]]);
        let value = Array2::from_shape_fn((ni, nj), |(i, j)| {
            let idx = i * nj + j;
            if valid[idx] {
                values[idx]
            } else {
                f64::NAN
            }
        });
        let distance = Array2::from_shape_fn((ni, nj), |(i, j)| {
            hypot(x[[i, j]] - x[[i, 0]], y[[i, j]] - y[[i, 0]])
        });

        let invalid = valid.iter().filter(|&&is_valid| !is_valid).count();
        if invalid == ni * nj {
            warn!(
                "No grid cell was within {} of the slice of {}; section is entirely invalid",
                tolerance, field
            );
        } else if invalid > 0 {
            debug!("{} of {} cells are outside the slice", invalid, ni * nj);
        }

        info!(
            "Cross-section of {} ({}x{}) completed in {}",
            field,
            ni,
            nj,
            format_duration(build_start.elapsed())
        );
        Ok(CrossSection::new(field, x, y, z, distance, value))
    }

    fn validate_resolution(ni: usize, nj: usize) -> Result<(), CrossSectionError> {
        if ni < 2 || nj < 2 {
            return Err(CrossSectionError::InvalidGridResolution(ni, nj));
        }
        Ok(())
    }

    fn validate_field(mesh: &dyn MeshQuery, field: &str) -> Result<(), CrossSectionError> {
        if !mesh.has_field(field) {
            return Err(CrossSectionError::InvalidFieldName(
                field.to_string(),
                mesh.field_names(),
            ));
        }
        Ok(())
    }

    fn validate_tolerance(tolerance: &f64) -> Result<(), CrossSectionError> {
        if !(*tolerance > 0.) {
            return Err(CrossSectionError::InvalidTolerance(*tolerance));
        }
        Ok(())
    }

    pub fn mesh(&mut self, mesh: &'a dyn MeshQuery) -> &mut Self {
        self.mesh = Some(mesh);
        self
    }

    pub fn p1(&mut self, p1: &'a [f64; 2]) -> &mut Self {
        self.p1 = Some(p1);
        self
    }

    pub fn p2(&mut self, p2: &'a [f64; 2]) -> &mut Self {
        self.p2 = Some(p2);
        self
    }

    pub fn z_top(&mut self, z_top: &'a f64) -> &mut Self {
        self.z_top = Some(z_top);
        self
    }

    pub fn z_bot(&mut self, z_bot: &'a f64) -> &mut Self {
        self.z_bot = Some(z_bot);
        self
    }

    pub fn field(&mut self, field: &'a str) -> &mut Self {
        self.field = Some(field);
        self
    }

    pub fn ni(&mut self, ni: &'a usize) -> &mut Self {
        self.ni = Some(ni);
        self
    }

    pub fn nj(&mut self, nj: &'a usize) -> &mut Self {
        self.nj = Some(nj);
        self
    }

    pub fn tolerance(&mut self, tolerance: &'a f64) -> &mut Self {
        self.tolerance = Some(tolerance);
        self
    }
}
