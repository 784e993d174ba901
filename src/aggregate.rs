// Crime Forecast Dashboard - Aggregation
// Group-by-sum projections over the filtered rows

use crate::data::CrimeRecord;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// crime_type -> summed crime_count, ordered by crime type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct TypeTotals(BTreeMap<String, u64>);

impl TypeTotals {
    pub fn get(&self, crime_type: &str) -> Option<u64> {
        self.0.get(crime_type).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn total(&self) -> u64 {
        self.0.values().fold(0, |acc, v| acc.saturating_add(*v))
    }

    pub fn max(&self) -> u64 {
        self.0.values().copied().max().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// date -> summed crime_count, ordered by date
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DateTotals(BTreeMap<NaiveDate, u64>);

impl DateTotals {
    pub fn get(&self, date: NaiveDate) -> Option<u64> {
        self.0.get(&date).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, u64)> + '_ {
        self.0.iter().map(|(k, v)| (*k, *v))
    }

    pub fn total(&self) -> u64 {
        self.0.values().fold(0, |acc, v| acc.saturating_add(*v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Two-column (timestamp, value) series in date order, as the
    /// forecaster expects it.
    pub fn to_series(&self) -> Vec<(NaiveDate, f64)> {
        self.iter().map(|(d, v)| (d, v as f64)).collect()
    }
}

/// Sum crime_count per crime type
pub fn type_totals(rows: &[CrimeRecord]) -> TypeTotals {
    let mut totals: BTreeMap<String, u64> = BTreeMap::new();
    for row in rows {
        let total = totals.entry(row.crime_type.clone()).or_insert(0);
        *total = total.saturating_add(row.crime_count);
    }
    debug!(groups = totals.len(), "aggregated totals by crime type");
    TypeTotals(totals)
}

/// Sum crime_count per date
pub fn date_totals(rows: &[CrimeRecord]) -> DateTotals {
    let mut totals: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for row in rows {
        let total = totals.entry(row.date).or_insert(0);
        *total = total.saturating_add(row.crime_count);
    }
    debug!(groups = totals.len(), "aggregated totals by date");
    DateTotals(totals)
}
