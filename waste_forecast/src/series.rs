//! Monthly waste series built from the cleaned dataset

use crate::error::Result;
use crate::scope::ForecastScope;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use waste_data::dates::{add_months, month_start, months_between};
use waste_data::WasteDataset;

/// How interior gaps are filled before model fitting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapFill {
    /// Straight line between the neighbouring observations
    #[default]
    Interpolate,
    /// Treat an absent month as zero tonnage
    Zero,
}

/// Regular monthly series with explicit gaps.
///
/// Stored as a start month plus one slot per elapsed month, so timestamps are
/// unique, strictly increasing and contiguous by construction.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries {
    start: Option<NaiveDate>,
    values: Vec<Option<f64>>,
}

impl TimeSeries {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Series starting at the month containing `start`
    pub fn monthly(start: NaiveDate, values: Vec<Option<f64>>) -> Self {
        if values.is_empty() {
            return Self::empty();
        }
        Self {
            start: Some(month_start(start)),
            values,
        }
    }

    /// Fully observed series
    pub fn from_values(start: NaiveDate, values: &[f64]) -> Self {
        Self::monthly(start, values.iter().copied().map(Some).collect())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        let start = self.start?;
        add_months(start, self.values.len().checked_sub(1)? as u32)
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Month-start dates, one per slot
    pub fn dates(&self) -> Vec<NaiveDate> {
        match self.start {
            Some(start) => (0..self.values.len())
                .filter_map(|offset| add_months(start, offset as u32))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn points(&self) -> Vec<(NaiveDate, Option<f64>)> {
        self.dates().into_iter().zip(self.values.iter().copied()).collect()
    }

    /// Number of months without an observation
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|value| value.is_none()).count()
    }

    /// Drop missing values at both ends, keeping the cadence of the rest
    pub fn trim_missing(&self) -> Self {
        let Some(first) = self.values.iter().position(Option::is_some) else {
            return Self::empty();
        };
        let last = self
            .values
            .iter()
            .rposition(Option::is_some)
            .unwrap_or(first);

        match self.start.and_then(|start| add_months(start, first as u32)) {
            Some(start) => Self::monthly(start, self.values[first..=last].to_vec()),
            None => Self::empty(),
        }
    }

    /// Dense values with gaps filled according to `policy`.
    ///
    /// With interpolation, gaps before the first or after the last observation
    /// take the nearest observed value.
    pub fn filled(&self, policy: GapFill) -> Vec<f64> {
        match policy {
            GapFill::Zero => self.values.iter().map(|v| v.unwrap_or(0.0)).collect(),
            GapFill::Interpolate => interpolate(&self.values),
        }
    }
}

fn interpolate(values: &[Option<f64>]) -> Vec<f64> {
    let observed: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();

    let Some(&(_, first_value)) = observed.first() else {
        return vec![0.0; values.len()];
    };

    let mut filled = vec![first_value; values.len()];
    for pair in observed.windows(2) {
        let (left, left_value) = pair[0];
        let (right, right_value) = pair[1];
        let span = (right - left) as f64;
        for (step, slot) in filled[left..=right].iter_mut().enumerate() {
            *slot = left_value + (right_value - left_value) * step as f64 / span;
        }
    }

    if let Some(&(last_index, last_value)) = observed.last() {
        for slot in filled.iter_mut().skip(last_index + 1) {
            *slot = last_value;
        }
    }

    filled
}

/// Filters and aggregates dataset rows into one monthly total-waste series
#[derive(Debug, Clone, Default)]
pub struct SeriesBuilder {
    scope: ForecastScope,
}

impl SeriesBuilder {
    pub fn new(scope: ForecastScope) -> Self {
        Self { scope }
    }

    pub fn scope(&self) -> &ForecastScope {
        &self.scope
    }

    /// Sum total waste per calendar month for the builder's scope.
    ///
    /// A scope that matches no rows gives an empty series. Months inside the
    /// observed span without rows are left as explicit gaps.
    pub fn build(&self, dataset: &WasteDataset) -> Result<TimeSeries> {
        let scoped = dataset.filter(self.scope.country.as_deref(), self.scope.category.as_deref())?;
        let totals = scoped.monthly_totals(&scoped.columns().total_waste)?;

        let (Some(&(first, _)), Some(&(last, _))) = (totals.first(), totals.last()) else {
            return Ok(TimeSeries::empty());
        };
        let totals: HashMap<NaiveDate, f64> = totals.into_iter().collect();

        let months = months_between(first, last) as usize + 1;
        let values = (0..months)
            .map(|offset| {
                add_months(first, offset as u32).and_then(|month| totals.get(&month).copied())
            })
            .collect();

        log::debug!(
            "built series for {}: {} months from {} rows",
            self.scope,
            months,
            scoped.len()
        );

        Ok(TimeSeries::monthly(first, values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn test_trim_missing() {
        let series =
            TimeSeries::monthly(ymd(2020, 1), vec![None, Some(1.0), None, Some(3.0), None]);
        let trimmed = series.trim_missing();

        assert_eq!(trimmed.start(), Some(ymd(2020, 2)));
        assert_eq!(trimmed.values(), &[Some(1.0), None, Some(3.0)]);
        assert_eq!(trimmed.last_date(), Some(ymd(2020, 4)));
    }

    #[test]
    fn test_trim_all_missing() {
        let series = TimeSeries::monthly(ymd(2020, 1), vec![None, None]);
        assert!(series.trim_missing().is_empty());
    }

    #[test]
    fn test_interpolation_and_zero_fill() {
        let series = TimeSeries::monthly(ymd(2020, 1), vec![Some(10.0), None, None, Some(40.0)]);

        assert_eq!(series.filled(GapFill::Interpolate), vec![10.0, 20.0, 30.0, 40.0]);
        assert_eq!(series.filled(GapFill::Zero), vec![10.0, 0.0, 0.0, 40.0]);
    }

    #[test]
    fn test_dates_are_contiguous_months() {
        let series = TimeSeries::from_values(ymd(2020, 11), &[1.0, 2.0, 3.0]);
        assert_eq!(series.dates(), vec![ymd(2020, 11), ymd(2020, 12), ymd(2021, 1)]);
        assert_eq!(series.missing_count(), 0);
    }
}
