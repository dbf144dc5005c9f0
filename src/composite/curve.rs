// mtrs-view/src/composite/curve.rs

use super::errors::CompositeError;
use crate::tf::{Channel, TfSeries};
use log::info;
use ndarray::Array1;
use plotly::color::NamedColor;
use plotly::common::{Line, Mode, Title};
use plotly::layout::{Axis, AxisType, GridPattern, LayoutGrid};
use plotly::{Layout, Plot, Scatter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

const CATEGORY10: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

/// Merged, period-sorted response of several stations.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeCurve {
    period: Array1<f64>,
    rho_xy: Array1<f64>,
    ph_xy: Array1<f64>,
    tip_zx_amp: Array1<f64>,
    rho_yx: Array1<f64>,
    ph_yx: Array1<f64>,
    tip_zy_amp: Array1<f64>,
}

#[derive(Serialize, Deserialize)]
struct CompositeRow {
    period: f64,
    rho_xy: f64,
    ph_xy: f64,
    tip_zx_amp: f64,
    rho_yx: f64,
    ph_yx: f64,
    tip_zy_amp: f64,
}

impl CompositeCurve {
    pub fn empty() -> Self {
        Self {
            period: Array1::zeros(0),
            rho_xy: Array1::zeros(0),
            ph_xy: Array1::zeros(0),
            tip_zx_amp: Array1::zeros(0),
            rho_yx: Array1::zeros(0),
            ph_yx: Array1::zeros(0),
            tip_zy_amp: Array1::zeros(0),
        }
    }

    /// `columns` are in `Channel::ALL` order and as long as `period`.
    pub(crate) fn from_columns(period: Array1<f64>, columns: [Array1<f64>; 6]) -> Self {
        let [rho_xy, ph_xy, tip_zx_amp, rho_yx, ph_yx, tip_zy_amp] = columns;
        Self {
            period,
            rho_xy,
            ph_xy,
            tip_zx_amp,
            rho_yx,
            ph_yx,
            tip_zy_amp,
        }
    }

    fn from_rows(rows: &[CompositeRow]) -> Self {
        let column =
            |get: fn(&CompositeRow) -> f64| -> Array1<f64> { rows.iter().map(get).collect() };
        Self {
            period: column(|r| r.period),
            rho_xy: column(|r| r.rho_xy),
            ph_xy: column(|r| r.ph_xy),
            tip_zx_amp: column(|r| r.tip_zx_amp),
            rho_yx: column(|r| r.rho_yx),
            ph_yx: column(|r| r.ph_yx),
            tip_zy_amp: column(|r| r.tip_zy_amp),
        }
    }

    pub fn len(&self) -> usize {
        self.period.len()
    }

    pub fn is_empty(&self) -> bool {
        self.period.is_empty()
    }

    pub fn period(&self) -> &Array1<f64> {
        &self.period
    }

    pub fn column(&self, channel: Channel) -> &Array1<f64> {
        match channel {
            Channel::RhoXy => &self.rho_xy,
            Channel::PhXy => &self.ph_xy,
            Channel::TipZxAmp => &self.tip_zx_amp,
            Channel::RhoYx => &self.rho_yx,
            Channel::PhYx => &self.ph_yx,
            Channel::TipZyAmp => &self.tip_zy_amp,
        }
    }

    fn rows(&self) -> impl Iterator<Item = CompositeRow> + '_ {
        (0..self.len()).map(move |k| CompositeRow {
            period: self.period[k],
            rho_xy: self.rho_xy[k],
            ph_xy: self.ph_xy[k],
            tip_zx_amp: self.tip_zx_amp[k],
            rho_yx: self.rho_yx[k],
            ph_yx: self.ph_yx[k],
            tip_zy_amp: self.tip_zy_amp[k],
        })
    }

    fn write_rows<W: std::io::Write>(
        &self,
        writer: &mut csv::Writer<W>,
    ) -> Result<(), CompositeError> {
        for row in self.rows() {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    /// CSV text with header `period,rho_xy,ph_xy,tip_zx_amp,rho_yx,ph_yx,tip_zy_amp`.
    pub fn to_csv_string(&self) -> Result<String, CompositeError> {
        if self.is_empty() {
            return Err(CompositeError::EmptyComposite);
        }
        let mut writer = csv::Writer::from_writer(Vec::new());
        self.write_rows(&mut writer)?;
        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Write the table, creating missing parent directories.
    pub fn write_csv(&self, path: &Path) -> Result<(), CompositeError> {
        if self.is_empty() {
            return Err(CompositeError::EmptyComposite);
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut writer = csv::Writer::from_path(path)?;
        self.write_rows(&mut writer)?;
        info!("Saved composite of {} samples to {}", self.len(), path.display());
        Ok(())
    }

    pub fn read_csv(path: &Path) -> Result<Self, CompositeError> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut rows: Vec<CompositeRow> = Vec::new();
        for row in reader.deserialize() {
            rows.push(row?);
        }
        if !rows.windows(2).all(|pair| pair[0].period <= pair[1].period) {
            return Err(CompositeError::MalformedCsv(
                "period column is not sorted".to_string(),
            ));
        }
        Ok(Self::from_rows(&rows))
    }

    /// Six-panel response figure: every active station as a thin line and
    /// the composite as a bold black line on top.
    pub fn make_response_plot(&self, series: &[TfSeries], active: &BTreeSet<String>) -> Plot {
        let mut plot = Plot::new();
        for (index, s) in series.iter().enumerate() {
            if !active.contains(s.label()) {
                continue;
            }
            let color = CATEGORY10[index % CATEGORY10.len()];
            for channel in Channel::ALL {
                let (x_axis, y_axis) = subplot_axes(channel);
                let trace = Scatter::new(s.period().to_vec(), s.channel(channel).to_vec())
                    .name(s.label())
                    .legend_group(s.label())
                    .show_legend(channel == Channel::RhoXy)
                    .mode(Mode::Lines)
                    .line(Line::new().color(color).width(2.0))
                    .x_axis(&x_axis)
                    .y_axis(&y_axis);
                plot.add_trace(trace);
            }
        }
        if !self.is_empty() {
            for channel in Channel::ALL {
                let (x_axis, y_axis) = subplot_axes(channel);
                let trace = Scatter::new(self.period.to_vec(), self.column(channel).to_vec())
                    .name("Composite")
                    .legend_group("Composite")
                    .show_legend(channel == Channel::RhoXy)
                    .mode(Mode::Lines)
                    .line(Line::new().color(NamedColor::Black).width(4.0))
                    .x_axis(&x_axis)
                    .y_axis(&y_axis);
                plot.add_trace(trace);
            }
        }

        let period_axis = || Axis::new().type_(AxisType::Log).title(Title::new("Period (s)"));
        let value_axis = |channel: Channel| {
            let axis_type = if channel.is_log_scaled() {
                AxisType::Log
            } else {
                AxisType::Linear
            };
            Axis::new().type_(axis_type).title(Title::new(channel.title()))
        };
        let layout = Layout::new()
            .title(Title::new("MT Multi-Response Viewer"))
            .height(900)
            .grid(
                LayoutGrid::new()
                    .rows(3)
                    .columns(2)
                    .pattern(GridPattern::Independent),
            )
            .x_axis(period_axis())
            .y_axis(value_axis(Channel::RhoXy))
            .x_axis2(period_axis())
            .y_axis2(value_axis(Channel::RhoYx))
            .x_axis3(period_axis())
            .y_axis3(value_axis(Channel::PhXy))
            .x_axis4(period_axis())
            .y_axis4(value_axis(Channel::PhYx))
            .x_axis5(period_axis())
            .y_axis5(value_axis(Channel::TipZxAmp))
            .x_axis6(period_axis())
            .y_axis6(value_axis(Channel::TipZyAmp));
        plot.set_layout(layout);
        plot
    }
}

/// Grid position of a channel: XY on the left, YX on the right.
fn subplot_axes(channel: Channel) -> (String, String) {
    let index = match channel {
        Channel::RhoXy => 1,
        Channel::RhoYx => 2,
        Channel::PhXy => 3,
        Channel::PhYx => 4,
        Channel::TipZxAmp => 5,
        Channel::TipZyAmp => 6,
    };
    if index == 1 {
        ("x".to_string(), "y".to_string())
    } else {
        (format!("x{}", index), format!("y{}", index))
    }
}
