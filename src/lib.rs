// Crime Forecast Dashboard - Core Library
// Exposes all modules for use in the terminal dashboard, web server, and tests

pub mod data;
pub mod filter;
pub mod aggregate;
pub mod forecast;
pub mod chart;
pub mod insights;
pub mod dashboard;
pub mod html;
pub mod config;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use data::{
    CrimeRecord, Dataset,
    load_csv, month_end, next_month_end,
};
pub use filter::{
    Selection, apply_filter,
};
pub use aggregate::{
    TypeTotals, DateTotals,
    type_totals, date_totals,
};
pub use forecast::{
    AdditiveModel, Forecast, ForecastConfig, ForecastError, ForecastPoint,
    forecast_series,
};
pub use chart::{
    render_type_chart, render_forecast_chart,
};
pub use dashboard::{
    Dashboard, FilterOptions, ForecastOutcome,
};
pub use html::render_page;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
