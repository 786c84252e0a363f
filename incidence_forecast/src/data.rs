//! Time series data handling for incidence forecasting

use crate::error::{ForecastError, Result};
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};
use incidence_math::stats;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;

/// Days between 0001-01-01 and the Unix epoch, for polars `Date` columns
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Spacing between consecutive periods of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// One observation per year
    #[default]
    Annual,
    /// One observation per month
    Monthly,
}

impl Frequency {
    /// Number of calendar months in one period
    pub fn months(&self) -> u32 {
        match self {
            Frequency::Annual => 12,
            Frequency::Monthly => 1,
        }
    }

    /// The period `steps` periods after `date`
    pub fn advance(&self, date: NaiveDate, steps: u32) -> Option<NaiveDate> {
        date.checked_add_months(Months::new(self.months() * steps))
    }

    /// Whether `next` is exactly one period after `prev`
    ///
    /// The day of month must match as well. Month-end dates count as
    /// matching each other, so a series of month ends is equally spaced.
    pub fn is_next(&self, prev: NaiveDate, next: NaiveDate) -> bool {
        if self.advance(prev, 1) == Some(next) {
            return true;
        }
        month_index(next) - month_index(prev) == self.months() as i64
            && is_month_end(prev)
            && is_month_end(next)
    }
}

fn month_index(date: NaiveDate) -> i64 {
    date.year() as i64 * 12 + date.month0() as i64
}

fn is_month_end(date: NaiveDate) -> bool {
    date.succ_opt().map_or(true, |day| day.month() != date.month())
}

/// A single (period, value) observation
///
/// Serialized with the `ds`/`y` column names used by the data files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Period the value belongs to
    #[serde(rename = "ds")]
    pub period: NaiveDate,
    /// Incidence rate for the period
    #[serde(rename = "y")]
    pub value: f64,
}

/// Equally spaced, gap-free series of non-negative values
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesData {
    periods: Vec<NaiveDate>,
    values: Vec<f64>,
    frequency: Frequency,
}

/// Data loader for incidence series
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load an annual series from a two-column CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<TimeSeriesData> {
        Self::from_csv_with_frequency(path, Frequency::Annual)
    }

    /// Load a series with the given frequency from a two-column CSV file
    pub fn from_csv_with_frequency<P: AsRef<Path>>(
        path: P,
        frequency: Frequency,
    ) -> Result<TimeSeriesData> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        Self::from_dataframe(&df, frequency)
    }

    /// Create a series from an existing DataFrame
    pub fn from_dataframe(df: &DataFrame, frequency: Frequency) -> Result<TimeSeriesData> {
        let period_column = Self::detect_period_column(df)?;
        let value_column = Self::detect_value_column(df, &period_column)?;

        let periods = series_to_periods(df.column(&period_column)?)?;
        let values = series_to_values(df.column(&value_column)?)?;

        TimeSeriesData::with_frequency(periods, values, frequency)
    }

    /// Detect the period column in a DataFrame
    fn detect_period_column(df: &DataFrame) -> Result<String> {
        let column_names = df.get_column_names();

        for name in &column_names {
            let lower = name.to_lowercase();
            if matches!(lower.as_str(), "ds" | "date" | "year" | "period") {
                return Ok(name.to_string());
            }
        }

        for name in &column_names {
            let lower = name.to_lowercase();
            if lower.contains("date") || lower.contains("time") || lower.contains("year") {
                return Ok(name.to_string());
            }
        }

        column_names
            .first()
            .map(|name| name.to_string())
            .ok_or_else(|| ForecastError::DataError("No period column found in data".to_string()))
    }

    /// Detect the value column in a DataFrame
    fn detect_value_column(df: &DataFrame, period_column: &str) -> Result<String> {
        let column_names = df.get_column_names();

        for name in &column_names {
            let lower = name.to_lowercase();
            if matches!(lower.as_str(), "y" | "value" | "incidence") {
                return Ok(name.to_string());
            }
        }

        for name in &column_names {
            let lower = name.to_lowercase();
            if lower.contains("incidence") || lower.contains("value") {
                return Ok(name.to_string());
            }
        }

        column_names
            .iter()
            .find(|name| **name != period_column)
            .map(|name| name.to_string())
            .ok_or_else(|| ForecastError::DataError("No value column found in data".to_string()))
    }
}

/// Parse a period cell: a bare year, an ISO date or an ISO datetime
pub fn parse_period(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();

    if trimmed.len() == 4 {
        if let Ok(year) = trimmed.parse::<i32>() {
            return NaiveDate::from_ymd_opt(year, 1, 1)
                .ok_or_else(|| ForecastError::DataError(format!("Invalid year: {}", trimmed)));
        }
    }

    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Ok(date);
        }
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(datetime.date());
        }
    }

    Err(ForecastError::DataError(format!(
        "Cannot parse period '{}'",
        trimmed
    )))
}

fn series_to_periods(series: &Series) -> Result<Vec<NaiveDate>> {
    match series.dtype() {
        DataType::Utf8 => series
            .utf8()?
            .into_iter()
            .enumerate()
            .map(|(row, cell)| match cell {
                Some(raw) => parse_period(raw),
                None => Err(missing_cell(series.name(), row)),
            })
            .collect(),
        DataType::Date => {
            let days = series.cast(&DataType::Int32)?;
            days.i32()?
                .into_iter()
                .enumerate()
                .map(|(row, cell)| {
                    cell.and_then(|d| {
                        NaiveDate::from_num_days_from_ce_opt(d + UNIX_EPOCH_DAYS_FROM_CE)
                    })
                    .ok_or_else(|| missing_cell(series.name(), row))
                })
                .collect()
        }
        DataType::Int64 | DataType::Int32 | DataType::UInt64 | DataType::UInt32 => {
            let years = series.cast(&DataType::Int64)?;
            years
                .i64()?
                .into_iter()
                .enumerate()
                .map(|(row, cell)| {
                    cell.and_then(|year| i32::try_from(year).ok())
                        .and_then(|year| NaiveDate::from_ymd_opt(year, 1, 1))
                        .ok_or_else(|| missing_cell(series.name(), row))
                })
                .collect()
        }
        other => Err(ForecastError::DataError(format!(
            "Column '{}' of type {:?} cannot be read as periods",
            series.name(),
            other
        ))),
    }
}

fn series_to_values(series: &Series) -> Result<Vec<f64>> {
    let cast = series.cast(&DataType::Float64).map_err(|e| {
        ForecastError::DataError(format!(
            "Column '{}' cannot be converted to f64: {}",
            series.name(),
            e
        ))
    })?;

    cast.f64()?
        .into_iter()
        .enumerate()
        .map(|(row, cell)| cell.ok_or_else(|| missing_cell(series.name(), row)))
        .collect()
}

fn missing_cell(column: &str, row: usize) -> ForecastError {
    ForecastError::DataError(format!(
        "Missing or invalid value in column '{}' at row {}",
        column,
        row + 1
    ))
}

impl TimeSeriesData {
    /// Create an annual series from periods and values
    pub fn new(periods: Vec<NaiveDate>, values: Vec<f64>) -> Result<Self> {
        Self::with_frequency(periods, values, Frequency::Annual)
    }

    /// Create a series with the given frequency
    ///
    /// Observations are sorted by period. Duplicate periods, gaps, negative
    /// or non-finite values are rejected.
    pub fn with_frequency(
        periods: Vec<NaiveDate>,
        values: Vec<f64>,
        frequency: Frequency,
    ) -> Result<Self> {
        if periods.len() != values.len() {
            return Err(ForecastError::DataError(format!(
                "Periods length ({}) doesn't match values length ({})",
                periods.len(),
                values.len()
            )));
        }

        let observations = periods
            .into_iter()
            .zip(values)
            .map(|(period, value)| Observation { period, value })
            .collect();

        Self::from_observations(observations, frequency)
    }

    /// Create a series from observations in any order
    pub fn from_observations(
        mut observations: Vec<Observation>,
        frequency: Frequency,
    ) -> Result<Self> {
        if observations.is_empty() {
            return Err(ForecastError::DataError(
                "Empty time series data".to_string(),
            ));
        }

        observations.sort_by_key(|o| o.period);

        for pair in observations.windows(2) {
            let (prev, next) = (pair[0].period, pair[1].period);
            if prev == next {
                return Err(ForecastError::DataError(format!(
                    "Duplicate period {}",
                    prev
                )));
            }
            if !frequency.is_next(prev, next) {
                return Err(ForecastError::DataError(format!(
                    "Periods {} and {} are not one period apart",
                    prev, next
                )));
            }
        }

        if let Some(bad) = observations
            .iter()
            .find(|o| !o.value.is_finite() || o.value < 0.0)
        {
            return Err(ForecastError::DataError(format!(
                "Value {} for period {} must be finite and non-negative",
                bad.value, bad.period
            )));
        }

        Ok(Self {
            periods: observations.iter().map(|o| o.period).collect(),
            values: observations.iter().map(|o| o.value).collect(),
            frequency,
        })
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series has no observations
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Observed values, oldest first
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Observed periods, oldest first
    pub fn periods(&self) -> &[NaiveDate] {
        &self.periods
    }

    /// Spacing between periods
    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// First observation
    pub fn first(&self) -> Observation {
        Observation {
            period: self.periods[0],
            value: self.values[0],
        }
    }

    /// Last observation
    pub fn last(&self) -> Observation {
        let i = self.len() - 1;
        Observation {
            period: self.periods[i],
            value: self.values[i],
        }
    }

    /// Observations in `start..end`
    pub fn slice(&self, start: usize, end: usize) -> Result<Self> {
        if start >= end || end > self.len() {
            return Err(ForecastError::ValidationError(format!(
                "Invalid slice {}..{} of a series with {} observations",
                start,
                end,
                self.len()
            )));
        }

        Ok(Self {
            periods: self.periods[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
            frequency: self.frequency,
        })
    }

    /// Split by position into a training prefix and a test suffix
    ///
    /// The prefix holds `floor(len * train_ratio)` observations; both parts
    /// must be non-empty.
    pub fn split_at_ratio(&self, train_ratio: f64) -> Result<(Self, Self)> {
        if !(train_ratio > 0.0 && train_ratio < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "Train ratio must be in (0, 1), got {}",
                train_ratio
            )));
        }

        let train_size = (self.len() as f64 * train_ratio).floor() as usize;
        if train_size == 0 || train_size == self.len() {
            return Err(ForecastError::InsufficientData {
                needed: 2,
                got: self.len(),
            });
        }

        Ok((self.slice(0, train_size)?, self.slice(train_size, self.len())?))
    }

    /// The `horizon` periods strictly after the last observation
    pub fn future_periods(&self, horizon: usize) -> Result<Vec<NaiveDate>> {
        let last = self.last().period;
        (1..=horizon)
            .map(|step| {
                u32::try_from(step)
                    .ok()
                    .and_then(|step| self.frequency.advance(last, step))
                    .ok_or_else(|| {
                        ForecastError::DataError(format!(
                            "Period {} steps after {} is out of range",
                            step, last
                        ))
                    })
            })
            .collect()
    }

    /// Exploratory statistics of the series
    pub fn summary(&self) -> Result<SeriesSummary> {
        let first = self.first();
        let last = self.last();
        let n = self.len();

        let reduction_pct = if first.value != 0.0 {
            (first.value - last.value) / first.value * 100.0
        } else {
            0.0
        };
        let avg_period_change = if n > 1 {
            (last.value - first.value) / (n - 1) as f64
        } else {
            0.0
        };

        Ok(SeriesSummary {
            observations: n,
            first_period: first.period,
            last_period: last.period,
            first_value: first.value,
            midpoint_value: self.values[n / 2],
            last_value: last.value,
            min: self.values.iter().copied().fold(f64::INFINITY, f64::min),
            max: self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean: stats::mean(&self.values)?,
            std_dev: if n > 1 { stats::std_dev(&self.values)? } else { 0.0 },
            reduction_pct,
            avg_period_change,
        })
    }
}

/// Exploratory statistics of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub observations: usize,
    pub first_period: NaiveDate,
    pub last_period: NaiveDate,
    pub first_value: f64,
    pub midpoint_value: f64,
    pub last_value: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
    /// Decline from the first to the last value, in percent of the first
    pub reduction_pct: f64,
    /// Average change per period between the first and last value
    pub avg_period_change: f64,
}
