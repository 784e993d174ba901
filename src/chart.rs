// Crime Forecast Dashboard - Charts
// Server-side SVG rendering with plotters

use crate::aggregate::TypeTotals;
use crate::forecast::Forecast;
use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use plotters::prelude::*;

pub const CHART_SIZE: (u32, u32) = (900, 420);

const FONT: &str = "sans-serif";

fn draw_error<E: std::fmt::Display>(err: E) -> anyhow::Error {
    anyhow!("failed to draw chart: {}", err)
}

/// Bar chart of summed counts per crime type, one colour per bar and the
/// count printed above it. Empty totals still produce a chart frame.
pub fn render_type_chart(totals: &TypeTotals) -> Result<String> {
    let names: Vec<&str> = totals.iter().map(|(name, _)| name).collect();
    let values: Vec<u64> = totals.iter().map(|(_, value)| value).collect();
    let y_max = ((totals.max() as f64) * 1.15).ceil().max(1.0) as u64;
    let segments = names.len().max(1) as u32;

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(draw_error)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Crime Type Distribution by Count", (FONT, 22))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d((0u32..segments).into_segmented(), 0u64..y_max)
            .map_err(draw_error)?;

        let label = |v: &SegmentValue<u32>| -> String {
            match v {
                SegmentValue::CenterOf(i) => names.get(*i as usize).map(|s| s.to_string()).unwrap_or_default(),
                _ => String::new(),
            }
        };

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_desc("crime_type")
            .y_desc("crime_count")
            .x_label_formatter(&label)
            .draw()
            .map_err(draw_error)?;

        chart
            .draw_series(values.iter().enumerate().map(|(i, &value)| {
                let i = i as u32;
                let mut bar = Rectangle::new(
                    [(SegmentValue::Exact(i), 0), (SegmentValue::Exact(i + 1), value)],
                    Palette99::pick(i as usize).mix(0.85).filled(),
                );
                bar.set_margin(0, 0, 25, 25);
                bar
            }))
            .map_err(draw_error)?;

        chart
            .draw_series(values.iter().enumerate().map(|(i, &value)| {
                EmptyElement::at((SegmentValue::CenterOf(i as u32), value))
                    + Text::new(value.to_string(), (-12, -20), (FONT, 15).into_font())
            }))
            .map_err(draw_error)?;

        if names.is_empty() {
            root.draw(&Text::new(
                "No data for the current selection",
                (CHART_SIZE.0 as i32 / 2 - 130, CHART_SIZE.1 as i32 / 2),
                (FONT, 18).into_font().color(&RGBColor(110, 110, 110)),
            ))
            .map_err(draw_error)?;
        }

        root.present().map_err(draw_error)?;
    }

    Ok(svg)
}

/// Forecast chart: observed history as dots, predicted line, and the
/// uncertainty interval as a shaded band.
pub fn render_forecast_chart(forecast: &Forecast) -> Result<String> {
    let (first, last) = match (forecast.points.first(), forecast.points.last()) {
        (Some(first), Some(last)) if first.date < last.date => (first.date, last.date),
        _ => return Err(anyhow!("forecast needs at least two dates to chart")),
    };

    let (lo, hi) = forecast.value_range();
    let pad = ((hi - lo) * 0.08).max(1.0);
    let y_range = (lo - pad)..(hi + pad);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(draw_error)?;

        let dates: RangedDate<NaiveDate> = (first..last).into();
        let mut chart = ChartBuilder::on(&root)
            .caption("Forecast of Monthly Crime Totals", (FONT, 22))
            .margin(20)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(dates, y_range)
            .map_err(draw_error)?;

        chart
            .configure_mesh()
            .x_labels(12)
            .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m").to_string())
            .x_desc("ds")
            .y_desc("y")
            .draw()
            .map_err(draw_error)?;

        let band: Vec<(NaiveDate, f64)> = forecast
            .points
            .iter()
            .map(|p| (p.date, p.yhat_upper))
            .chain(forecast.points.iter().rev().map(|p| (p.date, p.yhat_lower)))
            .collect();
        chart
            .draw_series(std::iter::once(Polygon::new(band, BLUE.mix(0.18).filled())))
            .map_err(draw_error)?
            .label("uncertainty")
            .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 20, y + 5)], BLUE.mix(0.18).filled()));

        chart
            .draw_series(LineSeries::new(
                forecast.points.iter().map(|p| (p.date, p.yhat)),
                BLUE.stroke_width(2),
            ))
            .map_err(draw_error)?
            .label("yhat")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

        chart
            .draw_series(
                forecast
                    .history()
                    .filter_map(|p| p.actual.map(|actual| Circle::new((p.date, actual), 3, BLACK.filled()))),
            )
            .map_err(draw_error)?
            .label("actual")
            .legend(|(x, y)| Circle::new((x + 10, y), 3, BLACK.filled()));

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(draw_error)?;

        root.present().map_err(draw_error)?;
    }

    Ok(svg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{date_totals, type_totals};
    use crate::data::Dataset;
    use crate::forecast::{forecast_series, ForecastConfig};

    #[test]
    fn test_type_chart_labels_each_type() {
        let dataset = Dataset::sample();
        let svg = render_type_chart(&type_totals(dataset.records())).unwrap();

        assert!(svg.contains("<svg"));
        for label in ["Theft", "Assault", "Burglary", "2190", "1590", "1470"] {
            assert!(svg.contains(label), "missing {}", label);
        }
    }

    #[test]
    fn test_type_chart_handles_empty_totals() {
        let svg = render_type_chart(&TypeTotals::default()).unwrap();
        assert!(svg.contains("No data for the current selection"));
    }

    #[test]
    fn test_forecast_chart_renders() {
        let dataset = Dataset::sample();
        let series = date_totals(dataset.records()).to_series();
        let forecast = forecast_series(&series, &ForecastConfig::default()).unwrap();

        let svg = render_forecast_chart(&forecast).unwrap();
        assert!(svg.contains("<polygon") || svg.contains("<path") || svg.contains("<polyline"));
        assert!(svg.contains("yhat"));
        assert!(svg.contains("actual"));
    }

    #[test]
    fn test_forecast_chart_rejects_empty_forecast() {
        let empty = Forecast { points: Vec::new() };
        assert!(render_forecast_chart(&empty).is_err());
    }
}
