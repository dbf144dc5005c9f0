// mtrs-view/src/mesh/traits.rs

use super::errors::MeshError;
use crate::geometry::Bounds;
use nalgebra::Vector3;
use ndarray::{Array1, Array2, ArrayView2, Axis, Zip};
use std::collections::HashMap;

/// Query capability a mesh backend must provide to be cross-sectioned.
pub trait MeshQuery {
    fn bounds(&self) -> Bounds;

    fn field_names(&self) -> Vec<String>;

    fn has_field(&self, name: &str) -> bool {
        self.field_names().iter().any(|field| field == name)
    }

    /// Typical spacing between neighbouring mesh nodes.
    fn characteristic_length(&self) -> f64;

    fn center(&self) -> Vector3<f64> {
        self.bounds().center()
    }

    /// Cut the mesh with the plane through `origin` with normal `normal`,
    /// carrying the named field onto the cut.
    fn slice(
        &self,
        origin: &Vector3<f64>,
        normal: &Vector3<f64>,
        field: &str,
    ) -> Result<PlaneSlice, MeshError>;

    /// Interpolate the slice field at each row of `targets` (N x 3).
    ///
    /// Returns the values and a validity mask. Targets farther than
    /// `tolerance` from the slice are invalid and carry NaN.
    fn resample(
        &self,
        slice: &PlaneSlice,
        targets: ArrayView2<f64>,
        tolerance: f64,
    ) -> (Array1<f64>, Array1<bool>) {
        slice.probe(targets, tolerance)
    }
}

/// Unstructured planar cut through a mesh: scattered points and one field.
#[derive(Clone, Debug)]
pub struct PlaneSlice {
    field: String,
    origin: Vector3<f64>,
    normal: Vector3<f64>,
    points: Array2<f64>,
    values: Array1<f64>,
}

impl PlaneSlice {
    pub fn new(
        field: &str,
        origin: Vector3<f64>,
        normal: Vector3<f64>,
        points: Array2<f64>,
        values: Array1<f64>,
    ) -> Self {
        Self {
            field: field.to_string(),
            origin,
            normal,
            points,
            values,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn origin(&self) -> &Vector3<f64> {
        &self.origin
    }

    pub fn normal(&self) -> &Vector3<f64> {
        &self.normal
    }

    pub fn points(&self) -> &Array2<f64> {
        &self.points
    }

    pub fn values(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.points.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter_points(&self) -> impl Iterator<Item = Vector3<f64>> + '_ {
        self.points
            .axis_iter(Axis(0))
            .map(|row| Vector3::new(row[0], row[1], row[2]))
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_points(self.iter_points())
    }

    /// Bounding-box centre of the slice points.
    pub fn center(&self) -> Option<Vector3<f64>> {
        self.bounds().map(|bounds| bounds.center())
    }

    /// Radius index over the slice points for queries within `radius`.
    pub fn index(&self, radius: f64) -> SliceIndex {
        SliceIndex::new(self, radius)
    }

    /// Inverse-distance-weighted probe of the slice field.
    pub fn probe(&self, targets: ArrayView2<f64>, tolerance: f64) -> (Array1<f64>, Array1<bool>) {
        let ntargets = targets.nrows();
        let mut values = Array1::from_elem(ntargets, f64::NAN);
        let mut valid = Array1::from_elem(ntargets, false);
        let index = self.index(tolerance);
        Zip::from(&mut values)
            .and(&mut valid)
            .and(targets.rows())
            .par_for_each(|value, is_valid, target| {
                let target = Vector3::new(target[0], target[1], target[2]);
                if let Some(estimate) = self.weighted_estimate(&index, target) {
                    *value = estimate;
                    *is_valid = true;
                }
            });
        (values, valid)
    }

    fn weighted_estimate(&self, index: &SliceIndex, target: Vector3<f64>) -> Option<f64> {
        let mut weight_sum = 0.0;
        let mut weighted = 0.0;
        for (k, distance) in index.within(target) {
            let value = self.values[k];
            if value.is_nan() {
                continue;
            }
            if distance <= f64::EPSILON {
                return Some(value);
            }
            let weight = 1.0 / (distance * distance);
            weight_sum += weight;
            weighted += weight * value;
        }
        if weight_sum > 0.0 {
            Some(weighted / weight_sum)
        } else {
            None
        }
    }
}

/// Uniform bucket grid over the points of a [`PlaneSlice`].
///
/// Buckets are `radius` wide, so every point within `radius` of a target
/// lies in the target's bucket or one of its 26 neighbours. A radius that is
/// not finite and positive puts every point in a single bucket.
#[derive(Debug)]
pub struct SliceIndex {
    radius: f64,
    cell: f64,
    points: Vec<Vector3<f64>>,
    buckets: HashMap<[i64; 3], Vec<usize>>,
}

impl SliceIndex {
    fn new(slice: &PlaneSlice, radius: f64) -> Self {
        let cell = if radius.is_finite() && radius > 0.0 {
            radius
        } else {
            f64::INFINITY
        };
        let points: Vec<Vector3<f64>> = slice.iter_points().collect();
        let mut buckets: HashMap<[i64; 3], Vec<usize>> = HashMap::new();
        for (k, point) in points.iter().enumerate() {
            buckets.entry(Self::key(cell, point)).or_default().push(k);
        }
        Self {
            radius,
            cell,
            points,
            buckets,
        }
    }

    fn key(cell: f64, point: &Vector3<f64>) -> [i64; 3] {
        if !cell.is_finite() {
            return [0; 3];
        }
        // float to int casts saturate; non-finite coordinates share a bucket
        [
            (point.x / cell).floor() as i64,
            (point.y / cell).floor() as i64,
            (point.z / cell).floor() as i64,
        ]
    }

    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Slice point indices within `radius` of `target`, with their distances.
    pub fn within(&self, target: Vector3<f64>) -> impl Iterator<Item = (usize, f64)> + '_ {
        let center = Self::key(self.cell, &target);
        let reach: i64 = if self.cell.is_finite() { 1 } else { 0 };
        let offsets = (-reach..=reach).flat_map(move |dx| {
            (-reach..=reach).flat_map(move |dy| (-reach..=reach).map(move |dz| [dx, dy, dz]))
        });
        offsets
            .filter_map(move |offset| {
                let key = [
                    center[0].saturating_add(offset[0]),
                    center[1].saturating_add(offset[1]),
                    center[2].saturating_add(offset[2]),
                ];
                self.buckets.get(&key)
            })
            .flatten()
            .filter_map(move |&k| {
                let distance = (self.points[k] - target).norm();
                (distance <= self.radius).then_some((k, distance))
            })
    }

    /// Distance to the closest slice point within `radius`, if any.
    pub fn nearest_within(&self, target: Vector3<f64>) -> Option<f64> {
        self.within(target)
            .map(|(_, distance)| distance)
            .reduce(f64::min)
    }
}
