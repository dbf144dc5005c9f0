// mtrs-view/src/composite/session.rs

use super::errors::CompositeError;
use crate::tf::TfSeries;
use log::debug;
use std::collections::{BTreeSet, HashMap};

/// Inclusive period interval `[pmin, pmax]`. A band with `pmin > pmax`
/// contains nothing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeriodBand {
    pub pmin: f64,
    pub pmax: f64,
}

impl PeriodBand {
    pub fn new(pmin: f64, pmax: f64) -> Self {
        Self { pmin, pmax }
    }

    /// The whole period range of `series`.
    pub fn full(series: &TfSeries) -> Self {
        let (pmin, pmax) = series.period_range();
        Self { pmin, pmax }
    }

    pub fn contains(&self, period: f64) -> bool {
        period >= self.pmin && period <= self.pmax
    }
}

/// Selection state of a composite view: which stations are active and
/// which period band each contributes.
#[derive(Clone, Debug, Default)]
pub struct Session {
    labels: Vec<String>,
    active: BTreeSet<String>,
    bands: HashMap<String, PeriodBand>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every series registered, active, with its full period band.
    pub fn from_series(series: &[TfSeries]) -> Result<Self, CompositeError> {
        let mut session = Self::new();
        for s in series {
            session.register(s)?;
        }
        Ok(session)
    }

    pub fn register(&mut self, series: &TfSeries) -> Result<(), CompositeError> {
        let label = series.label();
        if self.labels.iter().any(|known| known == label) {
            return Err(CompositeError::DuplicateLabel(label.to_string()));
        }
        self.labels.push(label.to_string());
        self.active.insert(label.to_string());
        self.bands.insert(label.to_string(), PeriodBand::full(series));
        debug!("Registered {} in session", label);
        Ok(())
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn active_labels(&self) -> &BTreeSet<String> {
        &self.active
    }

    pub fn bands(&self) -> &HashMap<String, PeriodBand> {
        &self.bands
    }

    pub fn is_active(&self, label: &str) -> bool {
        self.active.contains(label)
    }

    /// Labels need not be registered; unknown ones are ignored at build time.
    pub fn set_active(&mut self, label: &str, active: bool) {
        if active {
            self.active.insert(label.to_string());
        } else {
            self.active.remove(label);
        }
    }

    pub fn activate(&mut self, label: &str) {
        self.set_active(label, true);
    }

    pub fn deactivate(&mut self, label: &str) {
        self.set_active(label, false);
    }

    /// Replace the whole selection.
    pub fn set_active_labels<I, S>(&mut self, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.active = labels.into_iter().map(Into::into).collect();
    }

    pub fn set_band(&mut self, label: &str, band: PeriodBand) {
        self.bands.insert(label.to_string(), band);
    }

    pub fn clear_band(&mut self, label: &str) {
        self.bands.remove(label);
    }

    pub fn band_for(&self, series: &TfSeries) -> PeriodBand {
        self.bands
            .get(series.label())
            .copied()
            .unwrap_or_else(|| PeriodBand::full(series))
    }

    pub fn clear(&mut self) {
        self.labels.clear();
        self.active.clear();
        self.bands.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1};

    fn series(label: &str, period: Array1<f64>) -> TfSeries {
        let n = period.len();
        TfSeries::new(
            label,
            period,
            Array1::ones(n),
            Array1::ones(n),
            Array1::zeros(n),
            Array1::zeros(n),
            Array1::zeros(n),
            Array1::zeros(n),
        )
        .unwrap()
    }

    #[test]
    fn test_band_is_inclusive() {
        let band = PeriodBand::new(1.0, 10.0);
        assert!(band.contains(1.0));
        assert!(band.contains(10.0));
        assert!(!band.contains(10.000001));
        assert!(!PeriodBand::new(5.0, 1.0).contains(3.0));
    }

    #[test]
    fn test_from_series_activates_all_with_full_bands() {
        let all = vec![series("A", array![1.0, 100.0]), series("B", array![5.0, 50.0])];
        let session = Session::from_series(&all).unwrap();
        assert_eq!(session.labels(), &["A".to_string(), "B".to_string()]);
        assert!(session.is_active("A") && session.is_active("B"));
        assert_eq!(session.band_for(&all[1]), PeriodBand::new(5.0, 50.0));
    }

    #[test]
    fn test_duplicate_label_rejected() {
        let all = vec![series("A", array![1.0]), series("A", array![2.0])];
        assert!(matches!(
            Session::from_series(&all),
            Err(CompositeError::DuplicateLabel(label)) if label == "A"
        ));
    }

    #[test]
    fn test_missing_band_defaults_to_full_range() {
        let a = series("A", array![2.0, 20.0]);
        let mut session = Session::from_series(std::slice::from_ref(&a)).unwrap();
        session.set_band("A", PeriodBand::new(3.0, 4.0));
        assert_eq!(session.band_for(&a), PeriodBand::new(3.0, 4.0));
        session.clear_band("A");
        assert_eq!(session.band_for(&a), PeriodBand::new(2.0, 20.0));
    }

    #[test]
    fn test_selection_changes() {
        let mut session = Session::new();
        session.set_active_labels(["A", "B"]);
        session.deactivate("A");
        session.activate("ghost");
        let active: Vec<&String> = session.active_labels().iter().collect();
        assert_eq!(active, vec!["B", "ghost"]);
        session.clear();
        assert!(session.active_labels().is_empty());
    }
}
