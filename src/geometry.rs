// mtrs-view/src/geometry.rs

use nalgebra::Vector3;
use thiserror::Error;

/// Axis-aligned bounding box of a mesh or of a planar slice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub xmin: f64,
    pub xmax: f64,
    pub ymin: f64,
    pub ymax: f64,
    pub zmin: f64,
    pub zmax: f64,
}

impl Bounds {
    pub fn new(xmin: f64, xmax: f64, ymin: f64, ymax: f64, zmin: f64, zmax: f64) -> Self {
        Self {
            xmin,
            xmax,
            ymin,
            ymax,
            zmin,
            zmax,
        }
    }

    /// Smallest box holding every point. Returns `None` for an empty iterator.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vector3<f64>>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::new(first.x, first.x, first.y, first.y, first.z, first.z);
        for p in iter {
            bounds.xmin = bounds.xmin.min(p.x);
            bounds.xmax = bounds.xmax.max(p.x);
            bounds.ymin = bounds.ymin.min(p.y);
            bounds.ymax = bounds.ymax.max(p.y);
            bounds.zmin = bounds.zmin.min(p.z);
            bounds.zmax = bounds.zmax.max(p.z);
        }
        Some(bounds)
    }

    pub fn center(&self) -> Vector3<f64> {
        Vector3::new(
            0.5 * (self.xmin + self.xmax),
            0.5 * (self.ymin + self.ymax),
            0.5 * (self.zmin + self.zmax),
        )
    }

    pub fn diagonal(&self) -> f64 {
        Vector3::new(
            self.xmax - self.xmin,
            self.ymax - self.ymin,
            self.zmax - self.zmin,
        )
        .norm()
    }
}

/// Vertical cutting plane spanned by two horizontal points and an elevation range.
///
/// The plane is held as its three control points: lower-left `P1 = (p1, z_bot)`,
/// lower-right `P2 = (p2, z_bot)` and upper-right `P3 = (p2, z_top)`. The normal
/// and in-plane basis are derived on demand and never stored.
#[derive(Clone, Debug)]
pub struct CuttingPlane {
    p1: Vector3<f64>,
    p2: Vector3<f64>,
    p3: Vector3<f64>,
    normal: Vector3<f64>,
}

impl CuttingPlane {
    pub fn new(p1: [f64; 2], p2: [f64; 2], z_top: f64, z_bot: f64) -> Result<Self, GeometryError> {
        if !(z_top > z_bot) {
            return Err(GeometryError::InvalidVerticalRange(z_top, z_bot));
        }
        let lower_left = Vector3::new(p1[0], p1[1], z_bot);
        let lower_right = Vector3::new(p2[0], p2[1], z_bot);
        let upper_right = Vector3::new(p2[0], p2[1], z_top);
        let normal = (lower_right - lower_left).cross(&(upper_right - lower_right));
        if normal.norm() <= f64::EPSILON {
            return Err(GeometryError::DegeneratePlane(p1, p2));
        }
        Ok(Self {
            p1: lower_left,
            p2: lower_right,
            p3: upper_right,
            normal,
        })
    }

    pub fn control_points(&self) -> [Vector3<f64>; 3] {
        [self.p1, self.p2, self.p3]
    }

    pub fn unit_normal(&self) -> Vector3<f64> {
        self.normal.normalize()
    }

    /// Orthonormal in-plane basis `(vx, vy)`.
    ///
    /// `vx` is world +Z with its normal component removed (Gram-Schmidt), so it
    /// is the in-plane "up" direction. `vy = n x vx` runs horizontally.
    pub fn basis(&self) -> (Vector3<f64>, Vector3<f64>) {
        let n = self.unit_normal();
        let up = Vector3::z();
        let vx = (up - n * up.dot(&n)).normalize();
        let vy = n.cross(&vx);
        (vx, vy)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum GeometryError {
    #[error("Cutting plane is degenerate: p1={0:?} and p2={1:?} do not span a plane")]
    DegeneratePlane([f64; 2], [f64; 2]),
    #[error("z_top must be greater than z_bot, but got z_top={0} and z_bot={1}")]
    InvalidVerticalRange(f64, f64),
}
