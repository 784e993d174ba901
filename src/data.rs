// Crime Forecast Dashboard - Data Source
// Built-in incident table plus an optional CSV override

use anyhow::{bail, Context, Result};
use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// One row of the incident table.
/// Rows are immutable once loaded; identity is their position in the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrimeRecord {
    /// Calendar month, stored as its last day
    pub date: NaiveDate,
    pub location: String,
    pub crime_type: String,
    pub crime_count: u64,
}

impl CrimeRecord {
    pub fn new(date: NaiveDate, location: &str, crime_type: &str, crime_count: u64) -> Self {
        Self {
            date,
            location: location.to_string(),
            crime_type: crime_type.to_string(),
            crime_count,
        }
    }
}

// ============================================================================
// BUILT-IN SAMPLE TABLE
// ============================================================================

pub const SAMPLE_START_YEAR: i32 = 2020;
pub const SAMPLE_LOCATIONS: [&str; 3] = ["Durban", "Johannesburg", "Cape Town"];
pub const SAMPLE_CRIME_TYPES: [&str; 3] = ["Theft", "Assault", "Burglary"];
pub const SAMPLE_COUNTS: [u64; 36] = [
    120, 95, 80, 130, 100, 90, 140, 105, 100, //
    160, 120, 110, 170, 125, 115, 180, 130, 120, //
    190, 140, 130, 200, 145, 135, 210, 150, 140, //
    220, 155, 145, 230, 160, 150, 240, 165, 155,
];

// ============================================================================
// MONTH-END CALENDAR HELPERS
// ============================================================================

/// Last day of the given month, or None when the month is out of range.
pub fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)?
        .checked_add_months(Months::new(1))?
        .pred_opt()
}

/// Last day of the month following `date`'s month.
pub fn next_month_end(date: NaiveDate) -> Option<NaiveDate> {
    date.with_day(1)?
        .checked_add_months(Months::new(2))?
        .pred_opt()
}

/// `count` consecutive month ends starting with the month of `first`.
pub fn month_ends_from(first: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let start = month_end(first.year(), first.month());
    std::iter::successors(start, |d| next_month_end(*d))
        .take(count)
        .collect()
}

// ============================================================================
// DATASET
// ============================================================================

/// Ordered, read-only collection of incident rows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Dataset {
    records: Vec<CrimeRecord>,
}

impl Dataset {
    pub fn new(records: Vec<CrimeRecord>) -> Self {
        Self { records }
    }

    /// The 36-month demonstration table: one row per month from January
    /// 2020, cycling through the three locations and crime types together.
    pub fn sample() -> Self {
        let Some(first) = NaiveDate::from_ymd_opt(SAMPLE_START_YEAR, 1, 1) else {
            return Self::default();
        };

        let records = month_ends_from(first, SAMPLE_COUNTS.len())
            .into_iter()
            .zip(SAMPLE_COUNTS)
            .enumerate()
            .map(|(i, (date, count))| {
                CrimeRecord::new(
                    date,
                    SAMPLE_LOCATIONS[i % SAMPLE_LOCATIONS.len()],
                    SAMPLE_CRIME_TYPES[i % SAMPLE_CRIME_TYPES.len()],
                    count,
                )
            })
            .collect();

        Self { records }
    }

    /// Load a dataset from CSV, or fall back to the built-in table.
    pub fn from_source(csv_path: Option<&Path>) -> Result<Self> {
        match csv_path {
            Some(path) => {
                let records = load_csv(path)?;
                info!(path = %path.display(), rows = records.len(), "loaded crime data from CSV");
                Ok(Self::new(records))
            }
            None => {
                let dataset = Self::sample();
                info!(rows = dataset.len(), "using built-in sample crime data");
                Ok(dataset)
            }
        }
    }

    pub fn records(&self) -> &[CrimeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct locations in first-seen order
    pub fn locations(&self) -> Vec<String> {
        distinct(self.records.iter().map(|r| r.location.as_str()))
    }

    /// Distinct crime types in first-seen order
    pub fn crime_types(&self) -> Vec<String> {
        distinct(self.records.iter().map(|r| r.crime_type.as_str()))
    }
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for value in values {
        if !seen.iter().any(|s| s == value) {
            seen.push(value.to_string());
        }
    }
    seen
}

/// Read incident rows from a CSV file with the header
/// `date,location,crime_type,crime_count` (dates as YYYY-MM-DD).
pub fn load_csv(csv_path: &Path) -> Result<Vec<CrimeRecord>> {
    let mut rdr = csv::Reader::from_path(csv_path)
        .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?;

    let mut records = Vec::new();

    for (line, result) in rdr.deserialize().enumerate() {
        let record: CrimeRecord = result
            .with_context(|| format!("Failed to deserialize crime record on data row {}", line + 1))?;
        records.push(record);
    }

    if records.is_empty() {
        bail!("CSV file {} contains no crime records", csv_path.display());
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sample_has_36_rows() {
        let dataset = Dataset::sample();
        assert_eq!(dataset.len(), 36);
        assert_eq!(
            dataset.records().iter().map(|r| r.crime_count).sum::<u64>(),
            5250
        );
    }

    #[test]
    fn test_sample_dates_are_consecutive_month_ends() {
        let dataset = Dataset::sample();
        let records = dataset.records();

        assert_eq!(records[0].date, NaiveDate::from_ymd_opt(2020, 1, 31).unwrap());
        assert_eq!(records[1].date, NaiveDate::from_ymd_opt(2020, 2, 29).unwrap());
        assert_eq!(records[35].date, NaiveDate::from_ymd_opt(2022, 12, 31).unwrap());

        for pair in records.windows(2) {
            assert_eq!(next_month_end(pair[0].date), Some(pair[1].date));
        }
    }

    #[test]
    fn test_sample_cycles_location_and_type_together() {
        let dataset = Dataset::sample();
        let records = dataset.records();

        assert_eq!(records[0].location, "Durban");
        assert_eq!(records[0].crime_type, "Theft");
        assert_eq!(records[4].location, "Johannesburg");
        assert_eq!(records[4].crime_type, "Assault");
        assert_eq!(records[35].location, "Cape Town");
        assert_eq!(records[35].crime_type, "Burglary");
    }

    #[test]
    fn test_distinct_values_keep_first_seen_order() {
        let dataset = Dataset::sample();
        assert_eq!(dataset.locations(), vec!["Durban", "Johannesburg", "Cape Town"]);
        assert_eq!(dataset.crime_types(), vec!["Theft", "Assault", "Burglary"]);
    }

    #[test]
    fn test_month_end_helpers() {
        assert_eq!(month_end(2021, 2), NaiveDate::from_ymd_opt(2021, 2, 28));
        assert_eq!(month_end(2020, 13), None);

        let dec = NaiveDate::from_ymd_opt(2022, 12, 31).unwrap();
        assert_eq!(next_month_end(dec), NaiveDate::from_ymd_opt(2023, 1, 31));

        let mid = NaiveDate::from_ymd_opt(2023, 1, 15).unwrap();
        assert_eq!(next_month_end(mid), NaiveDate::from_ymd_opt(2023, 2, 28));
    }

    #[test]
    fn test_load_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "date,location,crime_type,crime_count").unwrap();
        writeln!(file, "2021-01-31,Pretoria,Fraud,12").unwrap();
        writeln!(file, "2021-02-28,Pretoria,Fraud,15").unwrap();

        let records = load_csv(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1], CrimeRecord::new(
            NaiveDate::from_ymd_opt(2021, 2, 28).unwrap(),
            "Pretoria",
            "Fraud",
            15,
        ));
    }

    #[test]
    fn test_load_csv_rejects_bad_rows_and_empty_files() {
        let mut bad = tempfile::NamedTempFile::new().unwrap();
        writeln!(bad, "date,location,crime_type,crime_count").unwrap();
        writeln!(bad, "not-a-date,Pretoria,Fraud,12").unwrap();
        assert!(load_csv(bad.path()).is_err());

        let mut empty = tempfile::NamedTempFile::new().unwrap();
        writeln!(empty, "date,location,crime_type,crime_count").unwrap();
        assert!(load_csv(empty.path()).is_err());

        assert!(load_csv(Path::new("/definitely/missing.csv")).is_err());
    }

    #[test]
    fn test_from_source_defaults_to_sample() {
        let dataset = Dataset::from_source(None).unwrap();
        assert_eq!(dataset.len(), 36);
    }
}
