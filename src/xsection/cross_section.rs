// mtrs-view/src/xsection/cross_section.rs

use super::errors::CrossSectionError;
use libm::log10;
use ndarray::{Array1, Array2};
use ndarray_stats::QuantileExt;
use plotly::common::Title;
use plotly::layout::Axis;
use plotly::{HeatMap, Layout, Plot};
use serde::Serialize;
use std::path::Path;

/// How cell values map onto a colour bar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ColorScale {
    #[default]
    Linear,
    /// Values are shown as log10; non-positive cells are left blank.
    Log,
}

/// Regular grid of field values on a vertical section.
///
/// All grids share the shape `(ni, nj)`. Invalid cells hold NaN.
#[derive(Clone, Debug)]
pub struct CrossSection {
    field: String,
    x: Array2<f64>,
    y: Array2<f64>,
    elevation: Array2<f64>,
    distance: Array2<f64>,
    value: Array2<f64>,
    quarter_turns: usize,
}

#[derive(Serialize)]
struct CellRow {
    i: usize,
    j: usize,
    x: f64,
    y: f64,
    z: f64,
    distance: f64,
    value: f64,
}

impl CrossSection {
    pub fn new(
        field: &str,
        x: Array2<f64>,
        y: Array2<f64>,
        elevation: Array2<f64>,
        distance: Array2<f64>,
        value: Array2<f64>,
    ) -> Self {
        Self {
            field: field.to_string(),
            x,
            y,
            elevation,
            distance,
            value,
            quarter_turns: 0,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn shape(&self) -> (usize, usize) {
        self.value.dim()
    }

    pub fn x(&self) -> &Array2<f64> {
        &self.x
    }

    pub fn y(&self) -> &Array2<f64> {
        &self.y
    }

    pub fn elevation(&self) -> &Array2<f64> {
        &self.elevation
    }

    pub fn distance(&self) -> &Array2<f64> {
        &self.distance
    }

    pub fn value(&self) -> &Array2<f64> {
        &self.value
    }

    pub fn valid_count(&self) -> usize {
        self.value.iter().filter(|v| !v.is_nan()).count()
    }

    /// Rotate every grid by 90 degrees counter-clockwise, `r` times.
    pub fn rotated(&self, r: usize) -> Self {
        let mut rotated = self.clone();
        for _ in 0..(r % 4) {
            rotated = Self {
                field: rotated.field.clone(),
                x: rot90(&rotated.x),
                y: rot90(&rotated.y),
                elevation: rot90(&rotated.elevation),
                distance: rot90(&rotated.distance),
                value: rot90(&rotated.value),
                quarter_turns: (rotated.quarter_turns + 1) % 4,
            };
        }
        rotated
    }

    /// Number of quarter turns applied since sampling, modulo 4.
    pub fn quarter_turns(&self) -> usize {
        self.quarter_turns
    }

    /// An odd number of quarter turns swaps the along-line and vertical axes.
    fn is_transposed(&self) -> bool {
        self.quarter_turns % 2 == 1
    }

    /// Depth below the top of the section: `top - elevation`, where `top`
    /// is the highest grid elevation. Equals `elevation[[0, 0]] - elevation`
    /// once row 0 is oriented to the top.
    pub fn depth(&self) -> Array2<f64> {
        let top = self.elevation.fold(f64::NEG_INFINITY, |top, &z| top.max(z));
        self.elevation.mapv(|z| top - z)
    }

    /// Plot axes of the section: distance along the line and the vertical
    /// coordinate (elevation, or depth when `depth_axis` is set), taken along
    /// whichever grid direction each one varies in.
    pub fn heatmap_axes(&self, depth_axis: bool) -> (Vec<f64>, Vec<f64>) {
        let vertical = if depth_axis {
            self.depth()
        } else {
            self.elevation.clone()
        };
        if self.is_transposed() {
            (self.distance.column(0).to_vec(), vertical.row(0).to_vec())
        } else {
            (self.distance.row(0).to_vec(), vertical.column(0).to_vec())
        }
    }

    /// Colour limits in display units (log10 for `ColorScale::Log`).
    ///
    /// Explicit limits win; missing ones come from the finite cell values.
    pub fn color_limits(
        &self,
        scale: ColorScale,
        clim_low: Option<f64>,
        clim_high: Option<f64>,
    ) -> Result<(f64, f64), CrossSectionError> {
        let display = self.display_values(scale);
        let finite: Array1<f64> = display.iter().cloned().filter(|v| v.is_finite()).collect();
        let to_display = |limit: f64| match scale {
            ColorScale::Linear => limit,
            ColorScale::Log => log10(limit),
        };
        let low = match clim_low {
            Some(limit) => to_display(limit),
            None if finite.is_empty() => return Err(CrossSectionError::NoValidCells),
            None => *finite.min()?,
        };
        let high = match clim_high {
            Some(limit) => to_display(limit),
            None if finite.is_empty() => return Err(CrossSectionError::NoValidCells),
            None => *finite.max()?,
        };
        if !low.is_finite() || !high.is_finite() || low > high {
            return Err(CrossSectionError::InvalidColorLimits(
                clim_low.unwrap_or(low),
                clim_high.unwrap_or(high),
            ));
        }
        Ok((low, high))
    }

    fn display_values(&self, scale: ColorScale) -> Array2<f64> {
        match scale {
            ColorScale::Linear => self.value.clone(),
            ColorScale::Log => self
                .value
                .mapv(|v| if v > 0. { log10(v) } else { f64::NAN }),
        }
    }

    /// Heat map of the section, distance along the line against elevation,
    /// or against depth below the first cell when `depth_axis` is set.
    pub fn make_heatmap_plot(
        &self,
        scale: ColorScale,
        clim_low: Option<f64>,
        clim_high: Option<f64>,
        depth_axis: bool,
    ) -> Result<Plot, CrossSectionError> {
        let (low, high) = self.color_limits(scale, clim_low, clim_high)?;
        let display = self.display_values(scale);
        // heat map rows follow the vertical axis, columns the distance axis
        let oriented = if self.is_transposed() {
            display.t()
        } else {
            display.view()
        };
        let z: Vec<Vec<f64>> = oriented
            .rows()
            .into_iter()
            .map(|row| {
                row.iter()
                    .map(|&v| if v.is_nan() { v } else { v.clamp(low, high) })
                    .collect()
            })
            .collect();
        let (distance, vertical) = self.heatmap_axes(depth_axis);
        let vertical_title = if depth_axis { "Depth" } else { "Elevation" };
        let mut plot = Plot::new();
        plot.add_trace(HeatMap::new(distance, vertical, z));
        let colorbar_label = match scale {
            ColorScale::Linear => self.field.clone(),
            ColorScale::Log => format!("log10 {}", self.field),
        };
        let layout = Layout::new()
            .title(Title::new(&colorbar_label))
            .x_axis(Axis::new().title(Title::new("Distance along line")))
            .y_axis(Axis::new().title(Title::new(vertical_title)));
        plot.set_layout(layout);
        Ok(plot)
    }

    /// Long-format table, one row per cell: `i,j,x,y,z,distance,value`.
    pub fn write_csv(&self, path: &Path) -> Result<(), CrossSectionError> {
        let mut writer = csv::Writer::from_path(path)?;
        for ((i, j), &value) in self.value.indexed_iter() {
            writer.serialize(CellRow {
                i,
                j,
                x: self.x[[i, j]],
                y: self.y[[i, j]],
                z: self.elevation[[i, j]],
                distance: self.distance[[i, j]],
                value,
            })?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// `numpy.rot90(a, 1)`: counter-clockwise, shape `(r, c)` becomes `(c, r)`.
fn rot90(a: &Array2<f64>) -> Array2<f64> {
    let (_, ncols) = a.dim();
    Array2::from_shape_fn((ncols, a.nrows()), |(i, j)| a[[j, ncols - 1 - i]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn section() -> CrossSection {
        let x = array![[0.0, 1.0, 2.0], [0.0, 1.0, 2.0]];
        let y = Array2::zeros((2, 3));
        let elevation = array![[-10.0, -10.0, -10.0], [0.0, 0.0, 0.0]];
        let distance = x.clone();
        let value = array![[1.0, 10.0, f64::NAN], [100.0, 1000.0, -5.0]];
        CrossSection::new("rho", x, y, elevation, distance, value)
    }

    #[test]
    fn test_rot90_matches_numpy_convention() {
        let a = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        assert_eq!(rot90(&a), array![[3.0, 6.0], [2.0, 5.0], [1.0, 4.0]]);
    }

    #[test]
    fn test_rotation_keeps_invalid_cells_invalid() {
        let original = section();
        let once = original.rotated(1);
        assert_eq!(once.shape(), (3, 2));
        assert!(once.value()[[0, 0]].is_nan());
        assert_eq!(once.valid_count(), original.valid_count());
        let full_turn = original.rotated(4);
        assert_eq!(full_turn.shape(), original.shape());
        for (a, b) in full_turn.value().iter().zip(original.value().iter()) {
            assert!(a == b || (a.is_nan() && b.is_nan()));
        }
    }

    #[test]
    fn test_depth_is_measured_down_from_the_top() {
        let section = section();
        let depth = section.depth();
        assert_eq!(depth.row(0).to_vec(), vec![10.0, 10.0, 10.0]);
        assert_eq!(depth.row(1).to_vec(), vec![0.0, 0.0, 0.0]);
        assert!(depth.iter().all(|&d| d >= 0.0));
        // with the top row first, depth is elevation[[0, 0]] - elevation
        let flipped = section.rotated(2);
        assert_eq!(flipped.depth()[[0, 0]], 0.0);
        assert_eq!(flipped.depth()[[1, 0]], 10.0);
    }

    fn strictly_monotone(values: &[f64]) -> bool {
        values.windows(2).all(|w| w[1] > w[0]) || values.windows(2).all(|w| w[1] < w[0])
    }

    #[test]
    fn test_heatmap_axes_follow_rotation() {
        let original = section();
        for r in 0..4 {
            let rotated = original.rotated(r);
            assert_eq!(rotated.quarter_turns(), r);
            let (distance, elevation) = rotated.heatmap_axes(false);
            assert_eq!(distance.len(), 3);
            assert_eq!(elevation.len(), 2);
            assert!(strictly_monotone(&distance), "r={} distance={:?}", r, distance);
            assert!(strictly_monotone(&elevation), "r={} elevation={:?}", r, elevation);
            let (_, depth) = rotated.heatmap_axes(true);
            assert!(strictly_monotone(&depth));
            assert!(depth.iter().all(|&d| d >= 0.0));
        }
        assert_eq!(original.rotated(5).quarter_turns(), 1);
    }

    #[test]
    fn test_color_limits_linear_and_log() {
        let section = section();
        assert_eq!(
            section.color_limits(ColorScale::Linear, None, None).unwrap(),
            (-5.0, 1000.0)
        );
        let (low, high) = section.color_limits(ColorScale::Log, None, None).unwrap();
        assert!((low - 0.0).abs() < 1e-12);
        assert!((high - 3.0).abs() < 1e-12);
        let (low, high) = section
            .color_limits(ColorScale::Log, Some(10.0), Some(100.0))
            .unwrap();
        assert!((low - 1.0).abs() < 1e-12 && (high - 2.0).abs() < 1e-12);
        assert!(matches!(
            section.color_limits(ColorScale::Log, Some(-1.0), None),
            Err(CrossSectionError::InvalidColorLimits(..))
        ));
    }

    #[test]
    fn test_color_limits_fail_on_all_invalid_section() {
        let mut empty = section();
        empty.value.fill(f64::NAN);
        assert!(matches!(
            empty.color_limits(ColorScale::Linear, None, None),
            Err(CrossSectionError::NoValidCells)
        ));
    }

    #[test]
    fn test_write_csv_one_row_per_cell() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("section.csv");
        section().write_csv(&path).unwrap();
        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["i", "j", "x", "y", "z", "distance", "value"]
        );
        assert_eq!(reader.records().count(), 6);
    }

    #[test]
    fn test_heatmap_plot_builds() {
        let plot = section()
            .make_heatmap_plot(ColorScale::Log, None, None, false)
            .unwrap();
        assert!(plot.to_json().contains("heatmap"));
    }
}
