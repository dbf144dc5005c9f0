// mtrs-view/src/tf/series.rs

use super::errors::TfError;
use ndarray::Array1;
use ndarray_stats::QuantileExt;
use std::fmt;

/// One of the six per-period measurement channels of a station.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    RhoXy,
    PhXy,
    TipZxAmp,
    RhoYx,
    PhYx,
    TipZyAmp,
}

impl Channel {
    /// Column order of the composite table.
    pub const ALL: [Channel; 6] = [
        Channel::RhoXy,
        Channel::PhXy,
        Channel::TipZxAmp,
        Channel::RhoYx,
        Channel::PhYx,
        Channel::TipZyAmp,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Channel::RhoXy => "rho_xy",
            Channel::PhXy => "ph_xy",
            Channel::TipZxAmp => "tip_zx_amp",
            Channel::RhoYx => "rho_yx",
            Channel::PhYx => "ph_yx",
            Channel::TipZyAmp => "tip_zy_amp",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Channel::RhoXy => "Apparent Resistivity (XY)",
            Channel::PhXy => "Phase (XY)",
            Channel::TipZxAmp => "Tipper Amplitude (Tzx)",
            Channel::RhoYx => "Apparent Resistivity (YX)",
            Channel::PhYx => "Phase (YX) (+180°)",
            Channel::TipZyAmp => "Tipper Amplitude (Tzy)",
        }
    }

    /// Resistivities are plotted on a log axis.
    pub fn is_log_scaled(&self) -> bool {
        matches!(self, Channel::RhoXy | Channel::RhoYx)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Period-indexed response of a single station. Immutable once built.
///
/// `ph_yx` already carries the +180 degree convention.
#[derive(Clone, Debug)]
pub struct TfSeries {
    label: String,
    period: Array1<f64>,
    period_range: (f64, f64),
    rho_xy: Array1<f64>,
    rho_yx: Array1<f64>,
    ph_xy: Array1<f64>,
    ph_yx: Array1<f64>,
    tip_zx_amp: Array1<f64>,
    tip_zy_amp: Array1<f64>,
}

impl TfSeries {
    pub fn new(
        label: &str,
        period: Array1<f64>,
        rho_xy: Array1<f64>,
        rho_yx: Array1<f64>,
        ph_xy: Array1<f64>,
        ph_yx: Array1<f64>,
        tip_zx_amp: Array1<f64>,
        tip_zy_amp: Array1<f64>,
    ) -> Result<Self, TfError> {
        Self::validate_period(label, &period)?;
        let n = period.len();
        for (name, channel) in [
            ("rho_xy", &rho_xy),
            ("rho_yx", &rho_yx),
            ("ph_xy", &ph_xy),
            ("ph_yx", &ph_yx),
            ("tip_zx_amp", &tip_zx_amp),
            ("tip_zy_amp", &tip_zy_amp),
        ] {
            if channel.len() != n {
                return Err(TfError::LengthMismatch(
                    label.to_string(),
                    name.to_string(),
                    channel.len(),
                    n,
                ));
            }
        }
        // NaN marks a gap and passes both checks
        for (name, channel) in [("rho_xy", &rho_xy), ("rho_yx", &rho_yx)] {
            if let Some(&bad) = channel.iter().find(|&&rho| rho <= 0.0) {
                return Err(TfError::NonPositiveResistivity(
                    label.to_string(),
                    name.to_string(),
                    bad,
                ));
            }
        }
        for (name, channel) in [("tip_zx_amp", &tip_zx_amp), ("tip_zy_amp", &tip_zy_amp)] {
            if let Some(&bad) = channel.iter().find(|&&amp| amp < 0.0) {
                return Err(TfError::NegativeTipper(label.to_string(), name.to_string(), bad));
            }
        }
        let period_range = (*period.min()?, *period.max()?);
        Ok(Self {
            label: label.to_string(),
            period,
            period_range,
            rho_xy,
            rho_yx,
            ph_xy,
            ph_yx,
            tip_zx_amp,
            tip_zy_amp,
        })
    }

    pub(crate) fn validate_period(label: &str, period: &Array1<f64>) -> Result<(), TfError> {
        if period.is_empty() {
            return Err(TfError::MissingPeriodData(label.to_string()));
        }
        if let Some(&bad) = period.iter().find(|&&p| !(p > 0.0 && p.is_finite())) {
            return Err(TfError::NonPositivePeriod(label.to_string(), bad));
        }
        Ok(())
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Same data under another label.
    pub fn relabeled(&self, label: &str) -> Self {
        Self {
            label: label.to_string(),
            ..self.clone()
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

    /// `(min(period), max(period))`.
    pub fn period_range(&self) -> (f64, f64) {
        self.period_range
    }

    pub fn channel(&self, channel: Channel) -> &Array1<f64> {
        match channel {
            Channel::RhoXy => &self.rho_xy,
            Channel::PhXy => &self.ph_xy,
            Channel::TipZxAmp => &self.tip_zx_amp,
            Channel::RhoYx => &self.rho_yx,
            Channel::PhYx => &self.ph_yx,
            Channel::TipZyAmp => &self.tip_zy_amp,
        }
    }
}
