// mtrs-view/src/composite/builder.rs

use super::curve::CompositeCurve;
use super::errors::CompositeError;
use super::session::{PeriodBand, Session};
use crate::tf::{Channel, TfSeries};
use humantime::format_duration;
use log::{debug, info, trace};
use ndarray::Array1;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::time::Instant;

/// Merge the band-limited samples of every active series into one curve
/// sorted by ascending period.
///
/// Series contribute in list order; labels in `active_labels` that name no
/// series are ignored. A series without an entry in `bands` contributes its
/// whole period range. Equal periods keep their concatenation order.
pub fn build_composite(
    series_list: &[TfSeries],
    active_labels: &BTreeSet<String>,
    bands: &HashMap<String, PeriodBand>,
) -> CompositeCurve {
    let start = Instant::now();
    let mut period: Vec<f64> = Vec::new();
    let mut columns: [Vec<f64>; 6] = Default::default();

    for series in series_list {
        if !active_labels.contains(series.label()) {
            trace!("{} is not active", series.label());
            continue;
        }
        let band = bands
            .get(series.label())
            .copied()
            .unwrap_or_else(|| PeriodBand::full(series));
        let selected: Vec<usize> = series
            .period()
            .iter()
            .enumerate()
            .filter(|&(_, &p)| band.contains(p))
            .map(|(k, _)| k)
            .collect();
        debug!(
            "{} contributes {} of {} periods in [{}, {}]",
            series.label(),
            selected.len(),
            series.len(),
            band.pmin,
            band.pmax
        );
        period.extend(selected.iter().map(|&k| series.period()[k]));
        for (column, channel) in columns.iter_mut().zip(Channel::ALL) {
            let values = series.channel(channel);
            column.extend(selected.iter().map(|&k| values[k]));
        }
    }

    let mut order: Vec<usize> = (0..period.len()).collect();
    order.sort_by(|&a, &b| period[a].total_cmp(&period[b]));
    let gather = |values: &[f64]| -> Array1<f64> { order.iter().map(|&k| values[k]).collect() };
    let curve = CompositeCurve::from_columns(
        gather(period.as_slice()),
        columns.map(|column| gather(column.as_slice())),
    );
    info!(
        "Built composite of {} samples in {}",
        curve.len(),
        format_duration(start.elapsed())
    );
    curve
}

/// `build_composite` driven by a session's selection.
pub fn build_from_session(series_list: &[TfSeries], session: &Session) -> CompositeCurve {
    build_composite(series_list, session.active_labels(), session.bands())
}

/// Keeps the most recent composite so it can be exported later.
#[derive(Debug, Default)]
pub struct CompositeExporter {
    latest: Option<CompositeCurve>,
}

impl CompositeExporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from the current selection, replacing the previous composite.
    pub fn rebuild(&mut self, series_list: &[TfSeries], session: &Session) -> &CompositeCurve {
        self.latest.insert(build_from_session(series_list, session))
    }

    pub fn latest(&self) -> Option<&CompositeCurve> {
        self.latest.as_ref()
    }

    /// Fails with `EmptyComposite` when nothing was built or the last
    /// composite has no samples.
    pub fn export(&self, path: &Path) -> Result<(), CompositeError> {
        match &self.latest {
            Some(curve) if !curve.is_empty() => curve.write_csv(path),
            _ => Err(CompositeError::EmptyComposite),
        }
    }

    pub fn clear(&mut self) {
        self.latest = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn series(label: &str, period: Array1<f64>, rho_xy: Array1<f64>) -> TfSeries {
        let n = period.len();
        let ph_yx = Array1::from_elem(n, 225.0);
        TfSeries::new(
            label,
            period,
            rho_xy.clone(),
            rho_xy * 2.0,
            Array1::from_elem(n, 45.0),
            ph_yx,
            Array1::zeros(n),
            Array1::zeros(n),
        )
        .unwrap()
    }

    fn pair() -> Vec<TfSeries> {
        vec![
            series("A", array![1.0, 10.0, 100.0], array![10.0, 20.0, 30.0]),
            series("B", array![5.0, 50.0], array![15.0, 25.0]),
        ]
    }

    fn labels(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merges_and_sorts_by_period() {
        crate::_setup_pretty_env_logger_default();
        let curve = build_composite(&pair(), &labels(&["A", "B"]), &HashMap::new());
        assert_eq!(curve.period(), &array![1.0, 5.0, 10.0, 50.0, 100.0]);
        assert_eq!(curve.column(Channel::RhoXy), &array![10.0, 15.0, 20.0, 25.0, 30.0]);
        assert_eq!(curve.column(Channel::RhoYx), &array![20.0, 30.0, 40.0, 50.0, 60.0]);
        assert!(curve.column(Channel::PhYx).iter().all(|&p| p == 225.0));
    }

    #[test]
    fn test_band_limits_contribution() {
        let mut bands = HashMap::new();
        bands.insert("A".to_string(), PeriodBand::new(1.0, 10.0));
        let curve = build_composite(&pair(), &labels(&["A", "B"]), &bands);
        assert_eq!(curve.period(), &array![1.0, 5.0, 10.0, 50.0]);
        assert_eq!(curve.column(Channel::RhoXy), &array![10.0, 15.0, 20.0, 25.0]);

        bands.insert("B".to_string(), PeriodBand::new(1000.0, 2000.0));
        let curve = build_composite(&pair(), &labels(&["A", "B"]), &bands);
        assert_eq!(curve.period(), &array![1.0, 10.0]);
    }

    #[test]
    fn test_inactive_and_unknown_labels() {
        let curve = build_composite(&pair(), &labels(&["B", "ghost"]), &HashMap::new());
        assert_eq!(curve.period(), &array![5.0, 50.0]);

        let empty = build_composite(&pair(), &BTreeSet::new(), &HashMap::new());
        assert!(empty.is_empty());
        assert_eq!(empty, CompositeCurve::empty());
    }

    #[test]
    fn test_equal_periods_keep_list_order() {
        let all = vec![
            series("A", array![1.0, 10.0], array![1.0, 2.0]),
            series("B", array![10.0], array![3.0]),
            series("C", array![10.0, 0.5], array![4.0, 5.0]),
        ];
        let curve = build_composite(&all, &labels(&["A", "B", "C"]), &HashMap::new());
        assert_eq!(curve.period(), &array![0.5, 1.0, 10.0, 10.0, 10.0]);
        assert_eq!(curve.column(Channel::RhoXy), &array![5.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let all = pair();
        let session = Session::from_series(&all).unwrap();
        let first = build_from_session(&all, &session);
        let second = build_from_session(&all, &session);
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
    }

    #[test]
    fn test_exporter_requires_a_composite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged_composite.csv");
        let all = pair();
        let mut session = Session::from_series(&all).unwrap();
        let mut exporter = CompositeExporter::new();
        assert!(matches!(
            exporter.export(&path),
            Err(CompositeError::EmptyComposite)
        ));

        assert_eq!(exporter.rebuild(&all, &session).len(), 5);
        exporter.export(&path).unwrap();
        let restored = CompositeCurve::read_csv(&path).unwrap();
        assert_eq!(Some(&restored), exporter.latest());

        session.set_active_labels(Vec::<String>::new());
        assert!(exporter.rebuild(&all, &session).is_empty());
        assert!(matches!(
            exporter.export(&path),
            Err(CompositeError::EmptyComposite)
        ));
        exporter.clear();
        assert!(exporter.latest().is_none());
    }
}
