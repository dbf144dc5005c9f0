// mtrs-view/src/mesh/rectilinear.rs

use super::errors::MeshError;
use super::traits::{MeshQuery, PlaneSlice};
use crate::geometry::Bounds;
use humantime::format_duration;
use log::{debug, info, trace};
use nalgebra::Vector3;
use ndarray::{Array1, Array2, Array3, Array4, ArrayView2, Axis, Zip};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

const EDGE_STEPS: [[usize; 3]; 3] = [[1, 0, 0], [0, 1, 0], [0, 0, 1]];

/// Point data carried on the mesh nodes.
#[derive(Clone, Debug)]
pub enum Field {
    Scalar(Array3<f64>),
    /// Trailing axis holds the three vector components.
    Vector(Array4<f64>),
}

impl Field {
    fn shape(&self) -> Vec<usize> {
        match self {
            Field::Scalar(values) => values.shape().to_vec(),
            Field::Vector(values) => values.shape().to_vec(),
        }
    }

    /// Scalar view of the field; vector fields are reduced to their magnitude.
    pub fn magnitude(&self) -> Cow<'_, Array3<f64>> {
        match self {
            Field::Scalar(values) => Cow::Borrowed(values),
            Field::Vector(values) => Cow::Owned(
                values.map_axis(Axis(3), |c| c.iter().map(|v| v * v).sum::<f64>().sqrt()),
            ),
        }
    }
}

/// Structured mesh with independent, strictly increasing x, y and z axes
/// (the VTK "rectilinear grid" layout used for 3-D resistivity models).
#[derive(Clone, Debug)]
pub struct RectilinearMesh {
    x: Array1<f64>,
    y: Array1<f64>,
    z: Array1<f64>,
    fields: BTreeMap<String, Field>,
}

impl RectilinearMesh {
    pub fn x(&self) -> &Array1<f64> {
        &self.x
    }

    pub fn y(&self) -> &Array1<f64> {
        &self.y
    }

    pub fn z(&self) -> &Array1<f64> {
        &self.z
    }

    pub fn shape(&self) -> [usize; 3] {
        [self.x.len(), self.y.len(), self.z.len()]
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    fn node(&self, i: usize, j: usize, k: usize) -> Vector3<f64> {
        Vector3::new(self.x[i], self.y[j], self.z[k])
    }

    fn scalar_field(&self, name: &str) -> Result<Cow<'_, Array3<f64>>, MeshError> {
        self.fields
            .get(name)
            .map(|field| field.magnitude())
            .ok_or_else(|| MeshError::FieldNotFound(name.to_string()))
    }

    /// Load a point table with header `x,y,z,<field>...`.
    ///
    /// Unique coordinates along each column define the axes and every lattice
    /// node must appear exactly once.
    pub fn from_csv(path: &Path) -> Result<Self, MeshError> {
        let start = Instant::now();
        let mut reader = csv::Reader::from_path(path)?;
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        for (position, axis) in ['x', 'y', 'z'].iter().enumerate() {
            let matches = headers
                .get(position)
                .map(|h| h.eq_ignore_ascii_case(&axis.to_string()))
                .unwrap_or(false);
            if !matches {
                return Err(MeshError::InvalidAxis(*axis));
            }
        }
        let field_names = headers[3..].to_vec();
        if field_names.is_empty() {
            return Err(MeshError::NoFieldColumns);
        }

        let mut rows: Vec<Vec<f64>> = Vec::new();
        for record in reader.deserialize() {
            let row: Vec<f64> = record?;
            rows.push(row);
        }
        debug!("Read {} rows from {}", rows.len(), path.display());

        let axis_from = |column: usize| -> Array1<f64> {
            let mut coords: Vec<f64> = rows.iter().map(|row| row[column]).collect();
            coords.sort_by(|a, b| a.total_cmp(b));
            coords.dedup();
            Array1::from(coords)
        };
        let x = axis_from(0);
        let y = axis_from(1);
        let z = axis_from(2);
        let shape = (x.len(), y.len(), z.len());

        let mut data: Vec<Array3<f64>> = field_names
            .iter()
            .map(|_| Array3::from_elem(shape, f64::NAN))
            .collect();
        let mut seen = Array3::from_elem(shape, false);
        let mut filled = 0;
        for row in rows.iter() {
            let (Some(i), Some(j), Some(k)) = (
                locate_exact(&x, row[0]),
                locate_exact(&y, row[1]),
                locate_exact(&z, row[2]),
            ) else {
                continue;
            };
            if seen[[i, j, k]] {
                continue;
            }
            seen[[i, j, k]] = true;
            filled += 1;
            for (values, &value) in data.iter_mut().zip(row[3..].iter()) {
                values[[i, j, k]] = value;
            }
        }
        let expected = shape.0 * shape.1 * shape.2;
        if filled != expected || rows.len() != expected {
            return Err(MeshError::IncompletePointTable(expected, rows.len()));
        }

        let fields: Vec<(String, Field)> = field_names
            .into_iter()
            .zip(data.into_iter().map(Field::Scalar))
            .collect();
        let mut builder = RectilinearMeshBuilder::default();
        builder.x(&x).y(&y).z(&z);
        for (name, field) in fields.iter() {
            builder.field(name, field);
        }
        let mesh = builder.build()?;
        info!(
            "Loaded {}x{}x{} mesh with fields {:?} in {}",
            shape.0,
            shape.1,
            shape.2,
            mesh.field_names(),
            format_duration(start.elapsed())
        );
        Ok(mesh)
    }

    /// Trilinear interpolation of a node field, clamped to the mesh.
    fn interpolate(&self, values: &Array3<f64>, p: &Vector3<f64>) -> f64 {
        let (i, tx) = locate_cell(&self.x, p.x);
        let (j, ty) = locate_cell(&self.y, p.y);
        let (k, tz) = locate_cell(&self.z, p.z);
        let mut result = 0.0;
        for (di, wx) in [(0, 1.0 - tx), (1, tx)] {
            for (dj, wy) in [(0, 1.0 - ty), (1, ty)] {
                for (dk, wz) in [(0, 1.0 - tz), (1, tz)] {
                    let weight = wx * wy * wz;
                    if weight == 0.0 {
                        continue;
                    }
                    result += weight * values[[i + di, j + dj, k + dk]];
                }
            }
        }
        result
    }

    fn contains(&self, p: &Vector3<f64>, slack: f64) -> bool {
        let bounds = self.bounds();
        p.x >= bounds.xmin - slack
            && p.x <= bounds.xmax + slack
            && p.y >= bounds.ymin - slack
            && p.y <= bounds.ymax + slack
            && p.z >= bounds.zmin - slack
            && p.z <= bounds.zmax + slack
    }
}

impl MeshQuery for RectilinearMesh {
    fn bounds(&self) -> Bounds {
        Bounds::new(
            self.x[0],
            self.x[self.x.len() - 1],
            self.y[0],
            self.y[self.y.len() - 1],
            self.z[0],
            self.z[self.z.len() - 1],
        )
    }

    fn field_names(&self) -> Vec<String> {
        self.fields.keys().cloned().collect()
    }

    fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    fn characteristic_length(&self) -> f64 {
        let spacing =
            |axis: &Array1<f64>| (axis[axis.len() - 1] - axis[0]) / (axis.len() - 1) as f64;
        (spacing(&self.x) + spacing(&self.y) + spacing(&self.z)) / 3.0
    }

    /// Intersect the plane with every lattice edge, interpolating the field
    /// linearly at each crossing. Nodes lying on the plane are emitted once.
    fn slice(
        &self,
        origin: &Vector3<f64>,
        normal: &Vector3<f64>,
        field: &str,
    ) -> Result<PlaneSlice, MeshError> {
        let start = Instant::now();
        let values = self.scalar_field(field)?;
        let unit = normal.normalize();
        let [nx, ny, nz] = self.shape();
        let snap = 1e-9 * self.characteristic_length();

        let signed = Array3::from_shape_fn((nx, ny, nz), |(i, j, k)| {
            (self.node(i, j, k) - origin).dot(&unit)
        });

        let mut points: Vec<Vector3<f64>> = Vec::new();
        let mut sampled: Vec<f64> = Vec::new();
        for ((i, j, k), &d) in signed.indexed_iter() {
            if d.abs() <= snap {
                points.push(self.node(i, j, k));
                sampled.push(values[[i, j, k]]);
            }
        }
        let on_plane = points.len();

        for step in EDGE_STEPS.iter() {
            for ((i, j, k), &d0) in signed.indexed_iter() {
                let (i1, j1, k1) = (i + step[0], j + step[1], k + step[2]);
                if i1 >= nx || j1 >= ny || k1 >= nz {
                    continue;
                }
                let d1 = signed[[i1, j1, k1]];
                if d0.abs() <= snap || d1.abs() <= snap || (d0 < 0.0) == (d1 < 0.0) {
                    continue;
                }
                let t = d0 / (d0 - d1);
                let a = self.node(i, j, k);
                let b = self.node(i1, j1, k1);
                let va = values[[i, j, k]];
                let vb = values[[i1, j1, k1]];
                points.push(a + (b - a) * t);
                sampled.push(va + (vb - va) * t);
            }
        }

        if points.is_empty() {
            return Err(MeshError::EmptySlice([unit.x, unit.y, unit.z]));
        }
        trace!(
            "Slice of {} has {} nodes on plane and {} edge crossings",
            field,
            on_plane,
            points.len() - on_plane
        );
        let coords = Array2::from_shape_fn((points.len(), 3), |(row, col)| points[row][col]);
        debug!(
            "Sliced field {} into {} points in {}",
            field,
            points.len(),
            format_duration(start.elapsed())
        );
        Ok(PlaneSlice::new(
            field,
            *origin,
            unit,
            coords,
            Array1::from(sampled),
        ))
    }

    /// Trilinear interpolation of the volume at each target, kept only where
    /// the target lies within `tolerance` of the slice.
    fn resample(
        &self,
        slice: &PlaneSlice,
        targets: ArrayView2<f64>,
        tolerance: f64,
    ) -> (Array1<f64>, Array1<bool>) {
        let ntargets = targets.nrows();
        let mut values = Array1::from_elem(ntargets, f64::NAN);
        let mut valid = Array1::from_elem(ntargets, false);
        let source = match self.scalar_field(slice.field()) {
            Ok(source) => source,
            Err(_) => return slice.probe(targets, tolerance),
        };
        let slack = 1e-9 * self.characteristic_length();
        let index = slice.index(tolerance);
        Zip::from(&mut values)
            .and(&mut valid)
            .and(targets.rows())
            .par_for_each(|value, is_valid, target| {
                let p = Vector3::new(target[0], target[1], target[2]);
                if !self.contains(&p, slack) || index.nearest_within(p).is_none() {
                    return;
                }
                let estimate = self.interpolate(&source, &p);
                if !estimate.is_nan() {
                    *value = estimate;
                    *is_valid = true;
                }
            });
        (values, valid)
    }
}

fn locate_exact(axis: &Array1<f64>, coord: f64) -> Option<usize> {
    axis.as_slice()?
        .binary_search_by(|node| node.total_cmp(&coord))
        .ok()
}

/// Lower cell index and fractional offset of `coord` along `axis`.
fn locate_cell(axis: &Array1<f64>, coord: f64) -> (usize, f64) {
    let last = axis.len() - 1;
    let coord = coord.clamp(axis[0], axis[last]);
    let upper = axis.iter().position(|&c| c > coord).unwrap_or(axis.len());
    let lower = upper.saturating_sub(1).min(last - 1);
    let width = axis[lower + 1] - axis[lower];
    let frac = ((coord - axis[lower]) / width).clamp(0.0, 1.0);
    (lower, frac)
}

#[derive(Default)]
pub struct RectilinearMeshBuilder<'a> {
    x: Option<&'a Array1<f64>>,
    y: Option<&'a Array1<f64>>,
    z: Option<&'a Array1<f64>>,
    fields: Vec<(&'a str, &'a Field)>,
}

impl<'a> RectilinearMeshBuilder<'a> {
    pub fn build(&self) -> Result<RectilinearMesh, MeshError> {
        let x = self
            .x
            .ok_or_else(|| MeshError::UninitializedFieldError("x".to_string()))?;
        Self::validate_axis('x', x)?;
        let y = self
            .y
            .ok_or_else(|| MeshError::UninitializedFieldError("y".to_string()))?;
        Self::validate_axis('y', y)?;
        let z = self
            .z
            .ok_or_else(|| MeshError::UninitializedFieldError("z".to_string()))?;
        Self::validate_axis('z', z)?;
        let nodes = [x.len(), y.len(), z.len()];
        let mut fields = BTreeMap::new();
        for (name, field) in self.fields.iter() {
            Self::validate_field(name, field, &nodes)?;
            fields.insert(name.to_string(), (*field).clone());
        }
        Ok(RectilinearMesh {
            x: x.clone(),
            y: y.clone(),
            z: z.clone(),
            fields,
        })
    }

    fn validate_axis(name: char, axis: &Array1<f64>) -> Result<(), MeshError> {
        if axis.len() < 2 {
            return Err(MeshError::InvalidAxis(name));
        }
        if !axis.windows(2).into_iter().all(|pair| pair[0] < pair[1]) {
            return Err(MeshError::InvalidAxis(name));
        }
        Ok(())
    }

    fn validate_field(name: &str, field: &Field, nodes: &[usize; 3]) -> Result<(), MeshError> {
        let shape = field.shape();
        let matches = match field {
            Field::Scalar(_) => shape[..] == nodes[..],
            Field::Vector(_) => shape[..3] == nodes[..] && shape[3] == 3,
        };
        if !matches {
            return Err(MeshError::FieldShapeMismatch(name.to_string(), shape, *nodes));
        }
        Ok(())
    }

    pub fn x(&mut self, x: &'a Array1<f64>) -> &mut Self {
        self.x = Some(x);
        self
    }

    pub fn y(&mut self, y: &'a Array1<f64>) -> &mut Self {
        self.y = Some(y);
        self
    }

    pub fn z(&mut self, z: &'a Array1<f64>) -> &mut Self {
        self.z = Some(z);
        self
    }

    pub fn field(&mut self, name: &'a str, field: &'a Field) -> &mut Self {
        self.fields.push((name, field));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array};
    use std::io::Write;

    fn ramp_mesh() -> RectilinearMesh {
        let x = Array::linspace(0., 4., 5);
        let y = Array::linspace(0., 4., 5);
        let z = Array::linspace(-4., 0., 5);
        let elevation = Field::Scalar(Array3::from_shape_fn((5, 5, 5), |(_, _, k)| z[k]));
        let easting = Field::Scalar(Array3::from_shape_fn((5, 5, 5), |(i, _, _)| x[i]));
        let mesh = RectilinearMeshBuilder::default()
            .x(&x)
            .y(&y)
            .z(&z)
            .field("elevation", &elevation)
            .field("easting", &easting)
            .build()
            .unwrap();
        mesh
    }

    #[test]
    fn test_builder_rejects_bad_axes_and_shapes() {
        let good = Array::linspace(0., 1., 3);
        let short = array![1.0];
        let unsorted = array![0.0, 2.0, 1.0];
        let field = Field::Scalar(Array3::zeros((3, 3, 2)));
        assert!(matches!(
            RectilinearMeshBuilder::default().x(&good).y(&good).build(),
            Err(MeshError::UninitializedFieldError(_))
        ));
        assert!(matches!(
            RectilinearMeshBuilder::default().x(&short).y(&good).z(&good).build(),
            Err(MeshError::InvalidAxis('x'))
        ));
        assert!(matches!(
            RectilinearMeshBuilder::default().x(&good).y(&unsorted).z(&good).build(),
            Err(MeshError::InvalidAxis('y'))
        ));
        assert!(matches!(
            RectilinearMeshBuilder::default()
                .x(&good)
                .y(&good)
                .z(&good)
                .field("rho", &field)
                .build(),
            Err(MeshError::FieldShapeMismatch(..))
        ));
    }

    #[test]
    fn test_bounds_and_characteristic_length() {
        let mesh = ramp_mesh();
        assert_eq!(mesh.bounds(), Bounds::new(0., 4., 0., 4., -4., 0.));
        assert!((mesh.characteristic_length() - 1.0).abs() < 1e-12);
        assert_eq!(mesh.field_names(), vec!["easting", "elevation"]);
        assert!(mesh.has_field("elevation"));
        assert!(!mesh.has_field("rho"));
    }

    #[test]
    fn test_slice_through_node_plane_keeps_nodes() {
        let mesh = ramp_mesh();
        let slice = mesh
            .slice(&mesh.center(), &Vector3::x(), "easting")
            .unwrap();
        assert_eq!(slice.len(), 25);
        assert!(slice.values().iter().all(|&v| (v - 2.0).abs() < 1e-12));
    }

    #[test]
    fn test_slice_between_nodes_interpolates_edges() {
        let mesh = ramp_mesh();
        let origin = Vector3::new(1.25, 2.0, -2.0);
        let slice = mesh.slice(&origin, &Vector3::x(), "easting").unwrap();
        assert_eq!(slice.len(), 25);
        assert!(slice.values().iter().all(|&v| (v - 1.25).abs() < 1e-12));
        assert!(slice.iter_points().all(|p| (p.x - 1.25).abs() < 1e-12));
    }

    #[test]
    fn test_slice_outside_mesh_is_empty_error() {
        let mesh = ramp_mesh();
        let origin = Vector3::new(10.0, 0.0, 0.0);
        let err = mesh.slice(&origin, &Vector3::x(), "easting").unwrap_err();
        assert!(matches!(err, MeshError::EmptySlice(_)));
        let err = mesh
            .slice(&mesh.center(), &Vector3::x(), "rho")
            .unwrap_err();
        assert!(matches!(err, MeshError::FieldNotFound(_)));
    }

    #[test]
    fn test_vector_field_slices_by_magnitude() {
        let axis = Array::linspace(0., 1., 2);
        let velocity = Field::Vector(Array4::from_shape_fn((2, 2, 2, 3), |(_, _, _, c)| {
            [3.0, 4.0, 0.0][c]
        }));
        let mesh = RectilinearMeshBuilder::default()
            .x(&axis)
            .y(&axis)
            .z(&axis)
            .field("velocity", &velocity)
            .build()
            .unwrap();
        let slice = mesh
            .slice(&mesh.center(), &Vector3::z(), "velocity")
            .unwrap();
        assert!(slice.values().iter().all(|&v| (v - 5.0).abs() < 1e-12));
    }

    #[test]
    fn test_resample_is_exact_for_linear_fields() {
        let mesh = ramp_mesh();
        let slice = mesh
            .slice(&mesh.center(), &Vector3::x(), "elevation")
            .unwrap();
        let targets = array![[2.0, 1.0, -3.0], [2.0, 3.0, -0.5], [2.0, 9.0, -0.5]];
        let (values, valid) = mesh.resample(&slice, targets.view(), 0.5);
        assert!(valid[0] && valid[1]);
        assert!((values[0] + 3.0).abs() < 1e-12);
        assert!((values[1] + 0.5).abs() < 1e-12);
        assert!(!valid[2]);
        assert!(values[2].is_nan());
    }

    #[test]
    fn test_from_csv_point_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "x,y,z,rho").unwrap();
        for x in [0.0, 1.0] {
            for y in [0.0, 2.0] {
                for z in [-1.0, 0.0] {
                    writeln!(file, "{},{},{},{}", x, y, z, 100.0 + x + y + z).unwrap();
                }
            }
        }
        file.flush().unwrap();
        let mesh = RectilinearMesh::from_csv(file.path()).unwrap();
        assert_eq!(mesh.shape(), [2, 2, 2]);
        assert_eq!(mesh.y(), &array![0.0, 2.0]);
        match mesh.field("rho").unwrap() {
            Field::Scalar(values) => assert_eq!(values[[1, 1, 0]], 102.0),
            Field::Vector(_) => panic!("expected scalar field"),
        }
    }

    #[test]
    fn test_from_csv_rejects_missing_nodes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "x,y,z,rho").unwrap();
        writeln!(file, "0,0,0,1").unwrap();
        writeln!(file, "1,1,1,1").unwrap();
        file.flush().unwrap();
        let err = RectilinearMesh::from_csv(file.path()).unwrap_err();
        assert!(matches!(err, MeshError::IncompletePointTable(8, 2)));
    }
}
