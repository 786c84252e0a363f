//! Incremental updates of the incidence data file
//!
//! New observations are merged into the data file after a timestamped backup.
//! Backups never overwrite each other.
//! Checks on the merged data are advisory: findings are logged and reported
//! but never block the write. Models pick up the new data on the next
//! analysis run.

use crate::data::{parse_period, Frequency, Observation};
use crate::error::{ForecastError, Result};
use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Plausible incidence range per 100k population
pub const PLAUSIBLE_RANGE: (f64, f64) = (0.0, 1000.0);

/// Rows as stored on disk, before period parsing
#[derive(Debug, Deserialize)]
struct RawObservation {
    ds: String,
    y: f64,
}

/// Findings of the advisory data checks
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    /// Consecutive periods with missing periods between them
    pub gaps: Vec<(NaiveDate, NaiveDate)>,
    /// Observations outside [`PLAUSIBLE_RANGE`]
    pub out_of_range: Vec<Observation>,
    /// Periods that occur more than once
    pub duplicates: Vec<NaiveDate>,
}

impl ValidationReport {
    /// Whether no check found anything
    pub fn is_clean(&self) -> bool {
        self.gaps.is_empty() && self.out_of_range.is_empty() && self.duplicates.is_empty()
    }
}

/// Result of applying an update
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    /// Periods that were not in the data file before
    pub added: usize,
    /// Observations in the data file after the update
    pub total: usize,
    /// Checks on the merged data
    pub report: ValidationReport,
}

/// Summary of a data file that holds observations
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataStatus {
    /// Earliest period in the file
    pub first_period: NaiveDate,
    /// Most recent period in the file
    pub latest_period: NaiveDate,
    /// Value of the most recent period
    pub latest_value: f64,
    /// Number of observations
    pub records: usize,
    /// Whether the advisory checks found nothing
    pub clean: bool,
}

/// State of the data file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum UpdateStatus {
    /// No data file exists yet
    Missing,
    /// The data file has a header but no observations
    Empty,
    /// The data file holds observations
    Current(DataStatus),
}

impl fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UpdateStatus::Missing => write!(f, "No data file found"),
            UpdateStatus::Empty => write!(f, "Data file holds no observations"),
            UpdateStatus::Current(status) => {
                writeln!(
                    f,
                    "Latest period: {} ({:.1})",
                    status.latest_period, status.latest_value
                )?;
                writeln!(f, "Records: {}", status.records)?;
                writeln!(
                    f,
                    "Date range: {} - {}",
                    status.first_period.year(),
                    status.latest_period.year()
                )?;
                write!(
                    f,
                    "Status: {}",
                    if status.clean {
                        "data current and validated"
                    } else {
                        "data current, checks reported findings"
                    }
                )
            }
        }
    }
}

/// Read `ds,y` observations from a CSV file without validating them
pub fn read_observations<P: AsRef<Path>>(path: P) -> Result<Vec<Observation>> {
    let mut reader = csv::Reader::from_path(path)?;
    reader
        .deserialize::<RawObservation>()
        .map(|row| -> Result<Observation> {
            let row = row?;
            Ok(Observation {
                period: parse_period(&row.ds)?,
                value: row.y,
            })
        })
        .collect()
}

/// Write observations as a `ds,y` CSV file
pub fn write_observations<P: AsRef<Path>>(path: P, observations: &[Observation]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for observation in observations {
        writer.serialize(observation)?;
    }
    writer.flush()?;
    Ok(())
}

/// Union of two observation lists keyed by period, sorted by period
///
/// Existing observations win over incoming ones for the same period. Returns
/// the merged list and the number of periods `incoming` added.
pub fn merge_observations(
    existing: &[Observation],
    incoming: &[Observation],
) -> (Vec<Observation>, usize) {
    let mut merged: BTreeMap<NaiveDate, f64> = existing
        .iter()
        .map(|o| (o.period, o.value))
        .collect();
    let before = merged.len();

    for observation in incoming {
        merged.entry(observation.period).or_insert(observation.value);
    }
    let added = merged.len() - before;

    let observations = merged
        .into_iter()
        .map(|(period, value)| Observation { period, value })
        .collect();
    (observations, added)
}

/// Keeps a data file current
#[derive(Debug, Clone)]
pub struct DataUpdater {
    data_file: PathBuf,
    backup_dir: PathBuf,
    frequency: Frequency,
}

impl DataUpdater {
    /// Updater for an annual data file, backing up into `<data dir>/backups`
    pub fn new<P: AsRef<Path>>(data_file: P) -> Self {
        let data_file = data_file.as_ref().to_path_buf();
        let backup_dir = data_file
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("backups");

        Self {
            data_file,
            backup_dir,
            frequency: Frequency::Annual,
        }
    }

    /// Use a different series frequency for the gap check
    pub fn with_frequency(mut self, frequency: Frequency) -> Self {
        self.frequency = frequency;
        self
    }

    /// The data file being updated
    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    /// Directory receiving backups
    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// Copy the data file to a timestamped backup
    ///
    /// Returns `None` when there is no data file yet.
    pub fn backup(&self) -> Result<Option<PathBuf>> {
        if !self.data_file.exists() {
            return Ok(None);
        }

        let stem = self
            .data_file
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| {
                ForecastError::InvalidParameter(format!(
                    "Data file {} has no usable name",
                    self.data_file.display()
                ))
            })?;

        fs::create_dir_all(&self.backup_dir)?;
        let stamp = Local::now().format("%Y%m%d_%H%M%S").to_string();

        // Never overwrite: later backups within the same second get a counter
        let mut attempt = 0usize;
        let (mut file, target) = loop {
            let name = match attempt {
                0 => format!("{}_backup_{}.csv", stem, stamp),
                n => format!("{}_backup_{}_{}.csv", stem, stamp, n),
            };
            let candidate = self.backup_dir.join(name);
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(file) => break (file, candidate),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        };
        io::copy(&mut File::open(&self.data_file)?, &mut file)?;

        info!(backup = %target.display(), "data file backed up");
        Ok(Some(target))
    }

    /// Summary of the data file as it is now
    pub fn status(&self) -> Result<UpdateStatus> {
        if !self.data_file.exists() {
            return Ok(UpdateStatus::Missing);
        }

        let mut observations = self.load()?;
        observations.sort_by_key(|o| o.period);
        let (Some(first), Some(latest)) = (observations.first(), observations.last()) else {
            return Ok(UpdateStatus::Empty);
        };

        Ok(UpdateStatus::Current(DataStatus {
            first_period: first.period,
            latest_period: latest.period,
            latest_value: latest.value,
            records: observations.len(),
            clean: self.validate(&observations).is_clean(),
        }))
    }

    /// Observations currently in the data file, empty when it does not exist
    pub fn load(&self) -> Result<Vec<Observation>> {
        if self.data_file.exists() {
            read_observations(&self.data_file)
        } else {
            Ok(Vec::new())
        }
    }

    /// Run the advisory checks, logging each finding
    pub fn validate(&self, observations: &[Observation]) -> ValidationReport {
        let mut report = ValidationReport::default();

        let mut sorted = observations.to_vec();
        sorted.sort_by_key(|o| o.period);

        for pair in sorted.windows(2) {
            let (prev, next) = (pair[0].period, pair[1].period);
            if prev == next {
                if report.duplicates.last() != Some(&prev) {
                    warn!(period = %prev, "duplicate period");
                    report.duplicates.push(prev);
                }
            } else if !self.frequency.is_next(prev, next) {
                warn!(from = %prev, to = %next, "gap in data");
                report.gaps.push((prev, next));
            }
        }

        let (lo, hi) = PLAUSIBLE_RANGE;
        for observation in &sorted {
            if !(observation.value >= lo && observation.value <= hi) {
                warn!(
                    period = %observation.period,
                    value = observation.value,
                    "value outside plausible range"
                );
                report.out_of_range.push(*observation);
            }
        }

        report
    }

    /// Back up, merge `incoming`, check and write the data file
    pub fn apply(&self, incoming: &[Observation]) -> Result<UpdateOutcome> {
        let existing = self.load()?;
        self.backup()?;

        let (merged, added) = merge_observations(&existing, incoming);
        let report = self.validate(&merged);
        write_observations(&self.data_file, &merged)?;

        info!(
            added,
            total = merged.len(),
            clean = report.is_clean(),
            "data file updated"
        );

        Ok(UpdateOutcome {
            added,
            total: merged.len(),
            report,
        })
    }

    /// [`apply`](Self::apply) with observations read from a CSV file
    pub fn apply_file<P: AsRef<Path>>(&self, incoming: P) -> Result<UpdateOutcome> {
        let observations = read_observations(incoming)?;
        self.apply(&observations)
    }
}
