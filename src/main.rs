// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use clap::Parser;

use crime_forecast::config::{init_tracing, summary_selection, CliConfig, Command, LogTarget};
use crime_forecast::{Dashboard, Dataset, ForecastConfig};

fn main() -> Result<()> {
    let cli = CliConfig::parse();

    init_tracing("crime_forecast=warn", LogTarget::for_command(cli.command.as_ref()));

    let dataset = cli.data.load_dataset()?;
    let forecast = cli.data.forecast_config()?;

    match cli.command {
        Some(Command::Summary { locations, crime_types }) => {
            run_summary(&dataset, &forecast, &locations, &crime_types)?;
        }
        None => run_ui_mode(dataset, forecast)?,
    }

    Ok(())
}

fn run_summary(
    dataset: &Dataset,
    forecast: &ForecastConfig,
    locations: &[String],
    crime_types: &[String],
) -> Result<()> {
    let selection = summary_selection(dataset, locations, crime_types);
    let dashboard = Dashboard::build(dataset, selection, forecast);
    println!("{}", serde_json::to_string_pretty(&dashboard)?);
    Ok(())
}

#[cfg(feature = "tui")]
fn run_ui_mode(dataset: Dataset, forecast: ForecastConfig) -> Result<()> {
    let mut app = ui::App::new(dataset, forecast);
    ui::run_ui(&mut app)
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_dataset: Dataset, _forecast: ForecastConfig) -> Result<()> {
    anyhow::bail!(
        "TUI mode not available. Rebuild with `--features tui`, use `crime-forecast summary`, \
         or run the web UI: cargo run --bin crime-server --features server"
    )
}
