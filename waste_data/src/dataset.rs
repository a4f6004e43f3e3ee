//! Cleaned food-waste dataset handling

use crate::columns::ColumnMap;
use crate::dates;
use crate::error::{DataError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::BTreeSet;
use std::fs::File;
use std::path::Path;

/// The cleaned dataset together with the names of its analytical columns
#[derive(Debug, Clone)]
pub struct WasteDataset {
    /// Data frame holding one row per (country, category, period)
    df: DataFrame,
    /// Column names used to read the frame
    columns: ColumnMap,
}

/// Reduction applied to a numeric column within each group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Sum,
    Mean,
}

/// Temporary key column used while grouping
const GROUP_KEY: &str = "__group_key";

/// Data loader for the cleaned dataset
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load the dataset from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P, columns: ColumnMap) -> Result<WasteDataset> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::from_dataframe(df, columns)
    }

    /// Wrap an existing DataFrame, checking that the required columns exist
    pub fn from_dataframe(df: DataFrame, columns: ColumnMap) -> Result<WasteDataset> {
        let dataset = WasteDataset { df, columns };
        dataset.validate()?;
        Ok(dataset)
    }
}

impl WasteDataset {
    /// A temporal key (date or year) and the waste tonnage are mandatory;
    /// everything else is checked by the consumer that needs it.
    fn validate(&self) -> Result<()> {
        if !self.has_column(&self.columns.date) && !self.has_column(&self.columns.year) {
            return Err(DataError::MissingColumn(format!(
                "{} (or {})",
                self.columns.date, self.columns.year
            )));
        }
        self.require_column(&self.columns.total_waste)?;
        Ok(())
    }

    /// Get the DataFrame
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Get the column names in use
    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.df.height()
    }

    /// Check if the dataset has no rows
    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.df.get_column_names().contains(&name)
    }

    /// Fail with [`DataError::MissingColumn`] unless `name` exists
    pub fn require_column(&self, name: &str) -> Result<()> {
        if self.has_column(name) {
            Ok(())
        } else {
            Err(DataError::MissingColumn(name.to_string()))
        }
    }

    /// Restrict rows to a country and/or food category.
    ///
    /// A filter value that matches nothing yields an empty dataset, not an error.
    pub fn filter(&self, country: Option<&str>, category: Option<&str>) -> Result<Self> {
        let mut predicate: Option<Expr> = None;

        if let Some(country) = country {
            self.require_column(&self.columns.country)?;
            predicate = Some(col(&self.columns.country).eq(lit(country)));
        }

        if let Some(category) = category {
            self.require_column(&self.columns.category)?;
            let matches = col(&self.columns.category).eq(lit(category));
            predicate = Some(match predicate {
                Some(existing) => existing.and(matches),
                None => matches,
            });
        }

        let df = match predicate {
            Some(predicate) => self.df.clone().lazy().filter(predicate).collect()?,
            None => self.df.clone(),
        };

        Ok(Self {
            df,
            columns: self.columns.clone(),
        })
    }

    /// Row dates, converting from the date column when present and from the
    /// year column otherwise. Null dates stay `None`.
    pub fn dates(&self) -> Result<Vec<Option<NaiveDate>>> {
        if self.has_column(&self.columns.date) {
            let series = self.df.column(&self.columns.date)?;
            return Self::series_to_dates(series);
        }

        let series = self.df.column(&self.columns.year)?;
        Self::years_to_dates(series)
    }

    fn series_to_dates(series: &Series) -> Result<Vec<Option<NaiveDate>>> {
        match series.dtype() {
            DataType::Date => {
                let days = series.cast(&DataType::Int32)?;
                let dates = days
                    .i32()?
                    .into_iter()
                    .map(|day| day.and_then(dates::from_epoch_days))
                    .collect();
                Ok(dates)
            }
            DataType::Datetime(unit, _) => {
                let per_second = match unit {
                    TimeUnit::Nanoseconds => 1_000_000_000,
                    TimeUnit::Microseconds => 1_000_000,
                    TimeUnit::Milliseconds => 1_000,
                };
                let ticks = series.cast(&DataType::Int64)?;
                let dates = ticks
                    .i64()?
                    .into_iter()
                    .map(|tick| tick.and_then(|tick| dates::from_epoch_ticks(tick, per_second)))
                    .collect();
                Ok(dates)
            }
            DataType::Utf8 => series
                .utf8()?
                .into_iter()
                .enumerate()
                .map(|(row, value)| match value {
                    None => Ok(None),
                    Some(text) if text.trim().is_empty() => Ok(None),
                    Some(text) => dates::parse_date(text).map(Some).ok_or_else(|| {
                        DataError::InvalidValue {
                            column: series.name().to_string(),
                            row,
                            value: text.to_string(),
                        }
                    }),
                })
                .collect(),
            _ => Self::years_to_dates(series),
        }
    }

    fn years_to_dates(series: &Series) -> Result<Vec<Option<NaiveDate>>> {
        match series.dtype() {
            DataType::Int64
            | DataType::Int32
            | DataType::UInt64
            | DataType::UInt32
            | DataType::Float64
            | DataType::Float32 => {
                let years = series.cast(&DataType::Int64)?;
                let dates = years
                    .i64()?
                    .into_iter()
                    .map(|year| {
                        year.and_then(|year| i32::try_from(year).ok())
                            .and_then(dates::year_start)
                    })
                    .collect();
                Ok(dates)
            }
            other => Err(DataError::UnsupportedType {
                column: series.name().to_string(),
                dtype: other.to_string(),
            }),
        }
    }

    /// Numeric column values as f64; nulls and blank strings stay `None`
    pub fn f64_values(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let series = self
            .df
            .column(name)
            .map_err(|_| DataError::MissingColumn(name.to_string()))?;

        match series.dtype() {
            DataType::Float64
            | DataType::Float32
            | DataType::Int64
            | DataType::Int32
            | DataType::UInt64
            | DataType::UInt32 => {
                let cast = series.cast(&DataType::Float64)?;
                let values = cast.f64()?.into_iter().collect();
                Ok(values)
            }
            DataType::Utf8 => series
                .utf8()?
                .into_iter()
                .enumerate()
                .map(|(row, value)| match value.map(str::trim) {
                    None | Some("") => Ok(None),
                    Some(text) => text.parse::<f64>().map(Some).map_err(|_| {
                        DataError::InvalidValue {
                            column: name.to_string(),
                            row,
                            value: text.to_string(),
                        }
                    }),
                })
                .collect(),
            other => Err(DataError::UnsupportedType {
                column: name.to_string(),
                dtype: other.to_string(),
            }),
        }
    }

    /// Column values rendered as text; nulls and blank strings are `None`
    pub fn text_values(&self, name: &str) -> Result<Vec<Option<String>>> {
        let series = self
            .df
            .column(name)
            .map_err(|_| DataError::MissingColumn(name.to_string()))?;
        let text = series.cast(&DataType::Utf8)?;
        let values = text
            .utf8()?
            .into_iter()
            .map(|value| {
                value
                    .filter(|value| !value.trim().is_empty())
                    .map(str::to_string)
            })
            .collect();
        Ok(values)
    }

    /// Distinct non-null countries, sorted
    pub fn countries(&self) -> Result<Vec<String>> {
        self.distinct(&self.columns.country)
    }

    /// Distinct non-null food categories, sorted
    pub fn categories(&self) -> Result<Vec<String>> {
        self.distinct(&self.columns.category)
    }

    fn distinct(&self, name: &str) -> Result<Vec<String>> {
        let values: BTreeSet<String> = self.text_values(name)?.into_iter().flatten().collect();
        Ok(values.into_iter().collect())
    }

    /// Numeric column as a Float64 series named `alias`. NaN reads as null and
    /// an absent column is all null.
    fn numeric_series(&self, name: &str, alias: &str) -> Result<Series> {
        let values: Vec<Option<f64>> = if self.has_column(name) {
            self.f64_values(name)?
                .into_iter()
                .map(|value| value.filter(|v| !v.is_nan()))
                .collect()
        } else {
            log::warn!("Column {} not found, reading it as missing", name);
            vec![None; self.len()]
        };
        Ok(Series::new(alias, values))
    }

    /// Sum of `name` per calendar month, ascending.
    ///
    /// Rows without a date are dropped. A month whose rows all lack a value
    /// sums to 0.
    pub fn monthly_totals(&self, name: &str) -> Result<Vec<(NaiveDate, f64)>> {
        let months: Vec<Option<i32>> = self
            .dates()?
            .into_iter()
            .map(|date| date.map(|date| dates::to_epoch_days(dates::month_start(date))))
            .collect();
        let frame = DataFrame::new(vec![
            Series::new(GROUP_KEY, months),
            self.numeric_series(name, "total")?,
        ])?;

        let grouped = frame
            .lazy()
            .filter(col(GROUP_KEY).is_not_null())
            .groupby([col(GROUP_KEY)])
            .agg([col("total").sum().fill_null(lit(0.0))])
            .sort(GROUP_KEY, SortOptions::default())
            .collect()?;

        let keys = grouped.column(GROUP_KEY)?.cast(&DataType::Int32)?;
        let totals = grouped.column("total")?.cast(&DataType::Float64)?;
        let rows = keys
            .i32()?
            .into_iter()
            .zip(totals.f64()?)
            .filter_map(|(day, total)| {
                let month = day.and_then(dates::from_epoch_days)?;
                Some((month, total.unwrap_or(0.0)))
            })
            .collect();
        Ok(rows)
    }

    /// Per-country reductions of numeric columns, sorted by country.
    ///
    /// Values come back in the order of `aggregates`. Rows without a country
    /// are dropped and a reduction over no observed values is 0.
    pub fn country_summary(
        &self,
        aggregates: &[(&str, Aggregation)],
    ) -> Result<Vec<(String, Vec<f64>)>> {
        self.require_column(&self.columns.country)?;

        let mut frame = vec![Series::new(GROUP_KEY, self.text_values(&self.columns.country)?)];
        let mut reductions = Vec::with_capacity(aggregates.len());
        let aliases: Vec<String> = (0..aggregates.len()).map(|i| format!("value_{}", i)).collect();
        for ((name, aggregation), alias) in aggregates.iter().zip(&aliases) {
            frame.push(self.numeric_series(name, alias)?);
            let reduced = match aggregation {
                Aggregation::Sum => col(alias).sum(),
                Aggregation::Mean => col(alias).mean(),
            };
            reductions.push(reduced.fill_null(lit(0.0)));
        }

        let grouped = DataFrame::new(frame)?
            .lazy()
            .filter(col(GROUP_KEY).is_not_null())
            .groupby([col(GROUP_KEY)])
            .agg(reductions)
            .sort(GROUP_KEY, SortOptions::default())
            .collect()?;

        let countries = grouped.column(GROUP_KEY)?.utf8()?;
        let mut columns = Vec::with_capacity(aliases.len());
        for alias in &aliases {
            columns.push(grouped.column(alias)?.cast(&DataType::Float64)?);
        }
        let columns = columns
            .iter()
            .map(|series| series.f64().map(|values| values.into_iter().collect::<Vec<_>>()))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let summary = countries
            .into_iter()
            .enumerate()
            .filter_map(|(row, country)| {
                let country = country?.to_string();
                let values = columns
                    .iter()
                    .map(|column| column.get(row).copied().flatten().unwrap_or(0.0))
                    .collect();
                Some((country, values))
            })
            .collect();
        Ok(summary)
    }
}
