// Crime Forecast Dashboard - Configuration
// Command-line flags with environment fallbacks, plus logging setup

use crate::data::Dataset;
use crate::filter::Selection;
use crate::forecast::ForecastConfig;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Options shared by the terminal dashboard and the web server
#[derive(Debug, Clone, Args)]
pub struct DataArgs {
    /// CSV file with date,location,crime_type,crime_count columns
    /// (the built-in sample table is used when omitted)
    #[arg(long, env = "CRIME_DATA_CSV")]
    pub data: Option<PathBuf>,

    /// Number of future months to forecast
    #[arg(long, env = "CRIME_FORECAST_PERIODS", default_value_t = 12)]
    pub periods: usize,

    /// Width of the forecast uncertainty interval, between 0 and 1
    #[arg(long, env = "CRIME_INTERVAL_WIDTH", default_value_t = 0.8)]
    pub interval_width: f64,
}

impl DataArgs {
    pub fn load_dataset(&self) -> Result<Dataset> {
        Dataset::from_source(self.data.as_deref())
    }

    pub fn forecast_config(&self) -> Result<ForecastConfig> {
        let config = ForecastConfig::default()
            .with_periods(self.periods)
            .with_interval_width(self.interval_width);
        config.validate().context("Invalid forecast settings")?;
        Ok(config)
    }
}

/// crime-server: serve the dashboard over HTTP
#[derive(Debug, Clone, Parser)]
#[command(name = "crime-server", version, about = "Crime data forecast dashboard - web server")]
pub struct ServerConfig {
    #[arg(long, env = "CRIME_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "CRIME_PORT", default_value_t = 3000)]
    pub port: u16,

    #[command(flatten)]
    pub data: DataArgs,
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// crime-forecast: terminal dashboard and one-shot summaries
#[derive(Debug, Clone, Parser)]
#[command(name = "crime-forecast", version, about = "Crime data forecast dashboard")]
pub struct CliConfig {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the dashboard (rows, totals, forecast) as JSON
    Summary {
        /// Location to include; repeat for several (default: all)
        #[arg(long = "location")]
        locations: Vec<String>,

        /// Crime type to include; repeat for several (default: all)
        #[arg(long = "crime-type")]
        crime_types: Vec<String>,
    },
}

/// Selection for a summary request; an empty list means every value.
pub fn summary_selection(dataset: &Dataset, locations: &[String], crime_types: &[String]) -> Selection {
    let pick = |given: &[String], all: Vec<String>| if given.is_empty() { all } else { given.to_vec() };
    Selection::new(
        pick(locations, dataset.locations()),
        pick(crime_types, dataset.crime_types()),
    )
}

/// Where log lines are written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    /// Dropped; used while the terminal dashboard owns the screen
    Discard,
}

impl LogTarget {
    /// The terminal dashboard runs in raw mode on the alternate screen,
    /// where stray stderr lines corrupt the display.
    pub fn for_command(command: Option<&Command>) -> Self {
        match command {
            Some(Command::Summary { .. }) => LogTarget::Stderr,
            None => LogTarget::Discard,
        }
    }

    pub fn writer(self) -> BoxMakeWriter {
        match self {
            LogTarget::Stderr => BoxMakeWriter::new(std::io::stderr),
            LogTarget::Discard => BoxMakeWriter::new(std::io::sink),
        }
    }
}

/// Install the global tracing subscriber. `RUST_LOG` overrides
/// `default_filter`. Stdout is never used so JSON output stays clean.
pub fn init_tracing(default_filter: &str, target: LogTarget) {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(target.writer()))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .try_init();
}
