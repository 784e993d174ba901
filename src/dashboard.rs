// Crime Forecast Dashboard - Page Model
// Runs filter -> aggregate -> forecast for one selection

use crate::aggregate::{date_totals, type_totals, DateTotals, TypeTotals};
use crate::data::{CrimeRecord, Dataset};
use crate::filter::{apply_filter, Selection};
use crate::forecast::{forecast_series, Forecast, ForecastConfig};
use serde::Serialize;
use tracing::warn;

pub const DASHBOARD_TITLE: &str = "Crime Data Forecasting Dashboard";

/// Values offered by the two multi-selects
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterOptions {
    pub locations: Vec<String>,
    pub crime_types: Vec<String>,
}

/// A forecast that could not be produced is reported, not raised, so the
/// rest of the page still renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ForecastOutcome {
    Available(Forecast),
    Unavailable { reason: String },
}

impl ForecastOutcome {
    pub fn forecast(&self) -> Option<&Forecast> {
        match self {
            ForecastOutcome::Available(forecast) => Some(forecast),
            ForecastOutcome::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.forecast().is_some()
    }
}

/// Everything one render of the dashboard shows
#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub title: &'static str,
    pub selection: Selection,
    pub options: FilterOptions,
    pub rows: Vec<CrimeRecord>,
    pub type_totals: TypeTotals,
    pub date_totals: DateTotals,
    pub forecast: ForecastOutcome,
}

impl Dashboard {
    /// Recompute every stage from scratch for `selection`.
    pub fn build(dataset: &Dataset, selection: Selection, config: &ForecastConfig) -> Self {
        let rows = apply_filter(dataset.records(), &selection);
        let type_totals = type_totals(&rows);
        let date_totals = date_totals(&rows);

        let forecast = match forecast_series(&date_totals.to_series(), config) {
            Ok(forecast) => ForecastOutcome::Available(forecast),
            Err(e) => {
                warn!(error = %e, rows = rows.len(), "forecast unavailable");
                ForecastOutcome::Unavailable { reason: e.to_string() }
            }
        };

        Self {
            title: DASHBOARD_TITLE,
            selection,
            options: FilterOptions {
                locations: dataset.locations(),
                crime_types: dataset.crime_types(),
            },
            rows,
            type_totals,
            date_totals,
            forecast,
        }
    }

    pub fn total_count(&self) -> u64 {
        self.type_totals.total()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forecast::ForecastError;

    #[test]
    fn test_default_dashboard() {
        let dataset = Dataset::sample();
        let dashboard = Dashboard::build(&dataset, Selection::all(&dataset), &ForecastConfig::default());

        assert_eq!(dashboard.rows.len(), 36);
        assert_eq!(dashboard.total_count(), 5250);
        assert_eq!(dashboard.type_totals.total(), 5250);
        assert_eq!(dashboard.date_totals.total(), 5250);
        assert_eq!(dashboard.options.locations.len(), 3);

        let forecast = dashboard.forecast.forecast().unwrap();
        assert_eq!(forecast.len(), 48);
    }

    #[test]
    fn test_empty_selection_reports_unavailable_forecast() {
        let dataset = Dataset::sample();
        let dashboard = Dashboard::build(&dataset, Selection::none(), &ForecastConfig::default());

        assert!(dashboard.rows.is_empty());
        assert!(dashboard.type_totals.is_empty());
        assert_eq!(
            dashboard.forecast,
            ForecastOutcome::Unavailable {
                reason: ForecastError::InsufficientData { required: 2, actual: 0 }.to_string()
            }
        );
        // options stay populated so the user can re-select
        assert_eq!(dashboard.options.crime_types.len(), 3);
    }

    #[test]
    fn test_single_month_is_unavailable() {
        let dataset = Dataset::new(vec![CrimeRecord::new(
            chrono::NaiveDate::from_ymd_opt(2021, 1, 31).unwrap(),
            "Durban",
            "Theft",
            4,
        )]);
        let dashboard = Dashboard::build(&dataset, Selection::all(&dataset), &ForecastConfig::default());

        assert_eq!(dashboard.rows.len(), 1);
        assert!(!dashboard.forecast.is_available());
    }

    #[test]
    fn test_dashboard_serializes_with_status_tag() {
        let dataset = Dataset::sample();
        let dashboard = Dashboard::build(&dataset, Selection::none(), &ForecastConfig::default());
        let json = serde_json::to_value(&dashboard).unwrap();

        assert_eq!(json["forecast"]["status"], "unavailable");
        assert_eq!(json["title"], DASHBOARD_TITLE);
        assert!(json["rows"].as_array().unwrap().is_empty());
    }
}
