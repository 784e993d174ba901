// Crime Forecast Dashboard - Filter
// Narrows the incident table to the chosen locations and crime types

use crate::data::{CrimeRecord, Dataset};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Query marker sent by the dashboard form. When present, a missing
/// `location` / `crime_type` key means "nothing selected" instead of "all".
pub const FILTERED_MARKER: &str = "filtered";

/// The user's multi-select state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Selection {
    pub locations: Vec<String>,
    pub crime_types: Vec<String>,
}

impl Selection {
    pub fn new(locations: Vec<String>, crime_types: Vec<String>) -> Self {
        Self {
            locations: dedup(locations),
            crime_types: dedup(crime_types),
        }
    }

    /// Every distinct location and crime type in the dataset (the default view)
    pub fn all(dataset: &Dataset) -> Self {
        Self {
            locations: dataset.locations(),
            crime_types: dataset.crime_types(),
        }
    }

    /// Nothing selected
    pub fn none() -> Self {
        Self::default()
    }

    /// Build a selection from a raw URL query string such as
    /// `location=Durban&location=Cape+Town&crime_type=Theft&filtered=1`.
    ///
    /// A dimension whose key is absent falls back to every value in the
    /// dataset, unless the form's `filtered` marker is present.
    pub fn from_query(raw: Option<&str>, dataset: &Dataset) -> Self {
        let mut locations: Option<Vec<String>> = None;
        let mut crime_types: Option<Vec<String>> = None;
        let mut explicit = false;

        for pair in raw.unwrap_or("").split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match decode_component(key).as_str() {
                "location" => locations.get_or_insert_with(Vec::new).push(decode_component(value)),
                "crime_type" => crime_types.get_or_insert_with(Vec::new).push(decode_component(value)),
                FILTERED_MARKER => explicit = true,
                _ => {}
            }
        }

        let fallback = |values: Vec<String>| if explicit { Vec::new() } else { values };

        Self::new(
            locations.unwrap_or_else(|| fallback(dataset.locations())),
            crime_types.unwrap_or_else(|| fallback(dataset.crime_types())),
        )
    }

    /// Encode back into the query form accepted by `from_query`
    pub fn to_query(&self) -> String {
        let mut parts: Vec<String> = self
            .locations
            .iter()
            .map(|l| format!("location={}", urlencoding::encode(l)))
            .collect();
        parts.extend(
            self.crime_types
                .iter()
                .map(|t| format!("crime_type={}", urlencoding::encode(t))),
        );
        parts.push(format!("{}=1", FILTERED_MARKER));
        parts.join("&")
    }

    pub fn has_location(&self, location: &str) -> bool {
        self.locations.iter().any(|l| l == location)
    }

    pub fn has_crime_type(&self, crime_type: &str) -> bool {
        self.crime_types.iter().any(|t| t == crime_type)
    }

    /// Add or remove a location
    pub fn toggle_location(&mut self, location: &str) {
        toggle(&mut self.locations, location);
    }

    /// Add or remove a crime type
    pub fn toggle_crime_type(&mut self, crime_type: &str) {
        toggle(&mut self.crime_types, crime_type);
    }

    pub fn matches(&self, record: &CrimeRecord) -> bool {
        self.has_location(&record.location) && self.has_crime_type(&record.crime_type)
    }
}

/// Rows whose location and crime type are both selected, in table order.
/// An empty selection yields an empty result.
pub fn apply_filter(records: &[CrimeRecord], selection: &Selection) -> Vec<CrimeRecord> {
    let locations: HashSet<&str> = selection.locations.iter().map(String::as_str).collect();
    let crime_types: HashSet<&str> = selection.crime_types.iter().map(String::as_str).collect();

    let filtered: Vec<CrimeRecord> = records
        .iter()
        .filter(|r| locations.contains(r.location.as_str()) && crime_types.contains(r.crime_type.as_str()))
        .cloned()
        .collect();

    debug!(
        input = records.len(),
        output = filtered.len(),
        locations = selection.locations.len(),
        crime_types = selection.crime_types.len(),
        "applied filter"
    );

    filtered
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .unwrap_or(spaced)
}

fn dedup(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

fn toggle(values: &mut Vec<String>, value: &str) {
    if let Some(pos) = values.iter().position(|v| v == value) {
        values.remove(pos);
    } else {
        values.push(value.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn select(locations: &[&str], crime_types: &[&str]) -> Selection {
        Selection::new(
            locations.iter().map(|s| s.to_string()).collect(),
            crime_types.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_default_selection_keeps_everything() {
        let dataset = Dataset::sample();
        let filtered = apply_filter(dataset.records(), &Selection::all(&dataset));
        assert_eq!(filtered, dataset.records());
    }

    #[test]
    fn test_durban_theft_selects_every_third_row() {
        let dataset = Dataset::sample();
        let filtered = apply_filter(dataset.records(), &select(&["Durban"], &["Theft"]));

        assert_eq!(filtered.len(), 12);
        let expected: Vec<CrimeRecord> = dataset.records().iter().step_by(3).cloned().collect();
        assert_eq!(filtered, expected);
    }

    #[test]
    fn test_mismatched_location_and_type_yield_nothing() {
        // Durban rows are always Theft in the sample table
        let dataset = Dataset::sample();
        let filtered = apply_filter(dataset.records(), &select(&["Durban"], &["Assault"]));
        assert!(filtered.is_empty());
    }

    #[test]
    fn test_empty_selection_yields_empty_result() {
        let dataset = Dataset::sample();
        assert!(apply_filter(dataset.records(), &Selection::none()).is_empty());
        assert!(apply_filter(dataset.records(), &select(&["Durban"], &[])).is_empty());
        assert!(apply_filter(dataset.records(), &select(&[], &["Theft"])).is_empty());
    }

    #[test]
    fn test_from_query_defaults_to_all() {
        let dataset = Dataset::sample();
        assert_eq!(Selection::from_query(None, &dataset), Selection::all(&dataset));
        assert_eq!(Selection::from_query(Some(""), &dataset), Selection::all(&dataset));
    }

    #[test]
    fn test_from_query_decodes_repeated_keys() {
        let dataset = Dataset::sample();
        let selection = Selection::from_query(
            Some("location=Durban&location=Cape+Town&location=Cape%20Town&crime_type=Theft"),
            &dataset,
        );

        assert_eq!(selection.locations, vec!["Durban", "Cape Town"]);
        assert_eq!(selection.crime_types, vec!["Theft"]);
    }

    #[test]
    fn test_from_query_missing_key_without_marker_means_all() {
        let dataset = Dataset::sample();
        let selection = Selection::from_query(Some("location=Durban"), &dataset);
        assert_eq!(selection.locations, vec!["Durban"]);
        assert_eq!(selection.crime_types, dataset.crime_types());
    }

    #[test]
    fn test_from_query_marker_makes_missing_keys_empty() {
        let dataset = Dataset::sample();
        let selection = Selection::from_query(Some("filtered=1"), &dataset);
        assert_eq!(selection, Selection::none());

        let selection = Selection::from_query(Some("filtered=1&crime_type=Theft"), &dataset);
        assert!(selection.locations.is_empty());
        assert_eq!(selection.crime_types, vec!["Theft"]);
    }

    #[test]
    fn test_query_roundtrip_preserves_selection() {
        let dataset = Dataset::sample();
        let selection = select(&["Cape Town"], &[]);
        assert_eq!(Selection::from_query(Some(&selection.to_query()), &dataset), selection);
    }

    #[test]
    fn test_toggle() {
        let mut selection = select(&["Durban"], &["Theft"]);
        selection.toggle_location("Durban");
        selection.toggle_location("Cape Town");
        selection.toggle_crime_type("Assault");

        assert_eq!(selection.locations, vec!["Cape Town"]);
        assert_eq!(selection.crime_types, vec!["Theft", "Assault"]);
    }

    proptest! {
        #[test]
        fn prop_filter_is_idempotent_subset(
            locations in proptest::sample::subsequence(vec!["Durban", "Johannesburg", "Cape Town"], 0..=3),
            crime_types in proptest::sample::subsequence(vec!["Theft", "Assault", "Burglary"], 0..=3),
        ) {
            let dataset = Dataset::sample();
            let selection = select(&locations, &crime_types);

            let once = apply_filter(dataset.records(), &selection);
            let twice = apply_filter(&once, &selection);
            prop_assert_eq!(&once, &twice);

            for record in &once {
                prop_assert!(dataset.records().contains(record));
                prop_assert!(selection.matches(record));
            }

            let expected = dataset.records().iter().filter(|r| selection.matches(r)).count();
            prop_assert_eq!(once.len(), expected);
        }
    }
}
