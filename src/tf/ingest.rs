// mtrs-view/src/tf/ingest.rs

use super::errors::TfError;
use super::series::TfSeries;
use log::{debug, warn};
use ndarray::{Array1, Array2, Array3};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Vacuum permeability in H/m.
pub const MU0: f64 = 4e-7 * PI;

/// Where a record's resistivity and phase come from.
#[derive(Clone, Debug)]
pub enum ResponseSource {
    /// Precomputed values; `ph_yx` is the raw phase, without the +180 offset.
    Direct {
        rho_xy: Array1<f64>,
        rho_yx: Array1<f64>,
        ph_xy: Array1<f64>,
        ph_yx: Array1<f64>,
    },
    /// Impedance tensor of shape `(n, 2, 2)`.
    DerivedFromImpedance { z: Array3<Complex64> },
}

#[derive(Clone, Debug)]
pub enum TipperSource {
    /// `(n, 2)` amplitudes of Tzx and Tzy.
    Amplitude(Array2<f64>),
    /// `(n, 2)` complex tipper; amplitudes are the magnitudes.
    Tensor(Array2<Complex64>),
}

/// A parsed transfer function as handed over by a format reader.
#[derive(Clone, Debug)]
pub struct TfRecord {
    pub station: Option<String>,
    pub period: Option<Array1<f64>>,
    pub response: ResponseSource,
    pub tipper: Option<TipperSource>,
}

impl TfRecord {
    /// Station name, or `"MT"` when the record carries none.
    pub fn label(&self) -> String {
        match &self.station {
            Some(station) if !station.trim().is_empty() => station.trim().to_string(),
            _ => "MT".to_string(),
        }
    }
}

impl TfSeries {
    /// Derive the six channels of a record. The YX phase gets its +180
    /// degree offset here and nowhere else.
    pub fn from_record(record: &TfRecord) -> Result<Self, TfError> {
        let label = record.label();
        let period = match &record.period {
            Some(period) if !period.is_empty() => period,
            _ => return Err(TfError::MissingPeriodData(label)),
        };
        Self::validate_period(&label, period)?;
        let n = period.len();

        let (rho_xy, rho_yx, ph_xy, ph_yx) = match &record.response {
            ResponseSource::Direct {
                rho_xy,
                rho_yx,
                ph_xy,
                ph_yx,
            } => (rho_xy.clone(), rho_yx.clone(), ph_xy.clone(), ph_yx.clone()),
            ResponseSource::DerivedFromImpedance { z } => {
                if z.shape() != [n, 2, 2] {
                    return Err(TfError::InvalidImpedanceShape(label, z.shape().to_vec()));
                }
                debug!("Deriving resistivity and phase of {} from impedance", label);
                let rho = |row: usize, col: usize| -> Array1<f64> {
                    Array1::from_shape_fn(n, |k| {
                        let omega = 2.0 * PI / period[k];
                        z[[k, row, col]].norm_sqr() / (MU0 * omega)
                    })
                };
                let phase = |row: usize, col: usize| -> Array1<f64> {
                    Array1::from_shape_fn(n, |k| z[[k, row, col]].arg().to_degrees())
                };
                (rho(0, 1), rho(1, 0), phase(0, 1), phase(1, 0))
            }
        };
        let ph_yx = ph_yx.mapv(|phase| phase + 180.0);

        let (tip_zx_amp, tip_zy_amp) = match &record.tipper {
            None => (Array1::zeros(n), Array1::zeros(n)),
            Some(TipperSource::Amplitude(amplitude)) => {
                if amplitude.shape() != [n, 2] {
                    return Err(TfError::InvalidTipperShape(
                        label,
                        amplitude.shape().to_vec(),
                    ));
                }
                (amplitude.column(0).to_owned(), amplitude.column(1).to_owned())
            }
            Some(TipperSource::Tensor(tipper)) => {
                if tipper.shape() != [n, 2] {
                    return Err(TfError::InvalidTipperShape(label, tipper.shape().to_vec()));
                }
                (
                    tipper.column(0).mapv(|t| t.norm()),
                    tipper.column(1).mapv(|t| t.norm()),
                )
            }
        };

        TfSeries::new(
            &label,
            period.clone(),
            rho_xy,
            rho_yx,
            ph_xy,
            ph_yx,
            tip_zx_amp,
            tip_zy_amp,
        )
    }
}

/// Build every record that can be built; failures are returned alongside
/// and never abort the rest of the batch.
pub fn ingest_batch(records: &[TfRecord]) -> (Vec<TfSeries>, Vec<TfError>) {
    let mut series = Vec::with_capacity(records.len());
    let mut failures = Vec::new();
    for record in records {
        match TfSeries::from_record(record) {
            Ok(built) => series.push(built),
            Err(e) => {
                warn!("Skipping transfer function {}: {}", record.label(), e);
                failures.push(e);
            }
        }
    }
    debug!(
        "Ingested {} of {} transfer functions",
        series.len(),
        records.len()
    );
    (series, failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tf::Channel;
    use ndarray::array;

    fn direct_record(station: Option<&str>) -> TfRecord {
        TfRecord {
            station: station.map(|s| s.to_string()),
            period: Some(array![1.0, 10.0]),
            response: ResponseSource::Direct {
                rho_xy: array![100.0, 200.0],
                rho_yx: array![110.0, 210.0],
                ph_xy: array![45.0, 50.0],
                ph_yx: array![-135.0, -130.0],
            },
            tipper: None,
        }
    }

    #[test]
    fn test_direct_record_offsets_yx_phase_once() {
        let series = TfSeries::from_record(&direct_record(Some("MT001"))).unwrap();
        assert_eq!(series.label(), "MT001");
        assert_eq!(series.channel(Channel::PhYx), &array![45.0, 50.0]);
        assert_eq!(series.channel(Channel::PhXy), &array![45.0, 50.0]);
        // rebuilding from the same record does not stack offsets
        let again = TfSeries::from_record(&direct_record(Some("MT001"))).unwrap();
        assert_eq!(again.channel(Channel::PhYx), series.channel(Channel::PhYx));
    }

    #[test]
    fn test_missing_tipper_defaults_to_zeros() {
        let series = TfSeries::from_record(&direct_record(None)).unwrap();
        assert_eq!(series.label(), "MT");
        assert_eq!(series.channel(Channel::TipZxAmp), &Array1::<f64>::zeros(2));
        assert_eq!(series.channel(Channel::TipZyAmp), &Array1::<f64>::zeros(2));
    }

    #[test]
    fn test_impedance_derivation() {
        let mut z = Array3::from_elem((1, 2, 2), Complex64::new(0.0, 0.0));
        z[[0, 0, 1]] = Complex64::new(1.0, 1.0);
        z[[0, 1, 0]] = Complex64::new(-1.0, -1.0);
        let record = TfRecord {
            station: Some("Z".to_string()),
            period: Some(array![1.0]),
            response: ResponseSource::DerivedFromImpedance { z },
            tipper: Some(TipperSource::Tensor(array![[
                Complex64::new(3.0, 4.0),
                Complex64::new(0.0, -0.5)
            ]])),
        };
        let series = TfSeries::from_record(&record).unwrap();
        let expected_rho = 2.0 / (MU0 * 2.0 * PI);
        assert!((series.channel(Channel::RhoXy)[0] - expected_rho).abs() < 1e-6);
        assert!((series.channel(Channel::RhoYx)[0] - expected_rho).abs() < 1e-6);
        assert!((series.channel(Channel::PhXy)[0] - 45.0).abs() < 1e-9);
        assert!((series.channel(Channel::PhYx)[0] - 45.0).abs() < 1e-9);
        assert!((series.channel(Channel::TipZxAmp)[0] - 5.0).abs() < 1e-12);
        assert!((series.channel(Channel::TipZyAmp)[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_impedance_is_rejected_per_record() {
        let silent = TfRecord {
            station: Some("silent".to_string()),
            period: Some(array![1.0]),
            response: ResponseSource::DerivedFromImpedance {
                z: Array3::from_elem((1, 2, 2), Complex64::new(0.0, 0.0)),
            },
            tipper: None,
        };
        assert!(matches!(
            TfSeries::from_record(&silent),
            Err(TfError::NonPositiveResistivity(..))
        ));
        let (series, failures) = ingest_batch(&[silent, direct_record(Some("A"))]);
        assert_eq!(series.len(), 1);
        assert_eq!(series[0].label(), "A");
        assert_eq!(failures.len(), 1);
    }

    #[test]
    fn test_bad_impedance_shape() {
        let record = TfRecord {
            station: None,
            period: Some(array![1.0, 2.0]),
            response: ResponseSource::DerivedFromImpedance {
                z: Array3::from_elem((1, 2, 2), Complex64::new(1.0, 0.0)),
            },
            tipper: None,
        };
        assert!(matches!(
            TfSeries::from_record(&record),
            Err(TfError::InvalidImpedanceShape(..))
        ));
    }

    #[test]
    fn test_batch_skips_records_without_period() {
        let mut broken = direct_record(Some("broken"));
        broken.period = None;
        let records = vec![direct_record(Some("A")), broken, direct_record(Some("B"))];
        let (series, failures) = ingest_batch(&records);
        let labels: Vec<&str> = series.iter().map(|s| s.label()).collect();
        assert_eq!(labels, vec!["A", "B"]);
        assert_eq!(failures.len(), 1);
        assert!(matches!(&failures[0], TfError::MissingPeriodData(label) if label == "broken"));
    }
}
