// Crime Forecast Dashboard - HTML Page
// Self-contained page with the filter form, data table, inline SVG charts and insights

use crate::chart::{render_forecast_chart, render_type_chart};
use crate::dashboard::{Dashboard, ForecastOutcome};
use crate::insights::{InsightSection, INSIGHTS, INSIGHTS_HEADING};
use tracing::warn;

/// Render the full dashboard page
pub fn render_page(dashboard: &Dashboard) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Crime Data Forecast Dashboard</title>
    <style>{css}</style>
</head>
<body>
    <aside>{filters}</aside>
    <main>
        <h1>{title}</h1>
        {table}
        {bar_chart}
        {forecast}
        {insights}
    </main>
</body>
</html>"#,
        css = inline_css(),
        title = escape_html(dashboard.title),
        filters = render_filters(dashboard),
        table = render_table(dashboard),
        bar_chart = render_bar_section(dashboard),
        forecast = render_forecast_section(dashboard),
        insights = render_insights(INSIGHTS),
    )
}

fn render_filters(dashboard: &Dashboard) -> String {
    format!(
        r#"<form method="get" action="/">
        <h2>Filters</h2>
        <input type="hidden" name="filtered" value="1">
        {locations}
        {crime_types}
        <button type="submit">Apply</button>
        <p class="meta"><a href="/api/dashboard?{query}">JSON</a></p>
    </form>"#,
        locations = render_select(
            "location",
            "Select Location(s)",
            &dashboard.options.locations,
            |l| dashboard.selection.has_location(l),
        ),
        crime_types = render_select(
            "crime_type",
            "Select Crime Type(s)",
            &dashboard.options.crime_types,
            |t| dashboard.selection.has_crime_type(t),
        ),
        query = escape_html(&dashboard.selection.to_query()),
    )
}

fn render_select(name: &str, label: &str, options: &[String], is_selected: impl Fn(&str) -> bool) -> String {
    let items: String = options
        .iter()
        .map(|o| {
            format!(
                r#"<option value="{v}"{sel}>{v}</option>"#,
                v = escape_html(o),
                sel = if is_selected(o) { " selected" } else { "" },
            )
        })
        .collect();

    format!(
        r#"<label for="{name}">{label}</label>
        <select id="{name}" name="{name}" multiple size="{size}">{items}</select>"#,
        size = options.len().clamp(3, 10),
    )
}

fn render_table(dashboard: &Dashboard) -> String {
    let rows: String = dashboard
        .rows
        .iter()
        .map(|r| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td class=\"num\">{}</td></tr>",
                r.date,
                escape_html(&r.location),
                escape_html(&r.crime_type),
                r.crime_count,
            )
        })
        .collect();

    let body = if dashboard.rows.is_empty() {
        r#"<tr><td colspan="4" class="empty">No rows match the current selection</td></tr>"#.to_string()
    } else {
        rows
    };

    format!(
        r#"<section>
        <h2>Filtered Crime Data</h2>
        <p class="meta">{count} rows, {total} incidents</p>
        <table>
            <thead><tr><th>date</th><th>location</th><th>crime_type</th><th>crime_count</th></tr></thead>
            <tbody>{body}</tbody>
        </table>
    </section>"#,
        count = dashboard.rows.len(),
        total = dashboard.total_count(),
    )
}

fn render_bar_section(dashboard: &Dashboard) -> String {
    let chart = match render_type_chart(&dashboard.type_totals) {
        Ok(svg) => svg,
        Err(e) => {
            warn!(error = %e, "bar chart failed to render");
            notice(&format!("Chart unavailable: {}", e))
        }
    };

    format!(
        r#"<section>
        <h2>Crime Type Distribution</h2>
        <div class="chart">{chart}</div>
    </section>"#
    )
}

fn render_forecast_section(dashboard: &Dashboard) -> String {
    let content = match &dashboard.forecast {
        ForecastOutcome::Available(forecast) => match render_forecast_chart(forecast) {
            Ok(svg) => svg,
            Err(e) => {
                warn!(error = %e, "forecast chart failed to render");
                notice(&format!("Forecast unavailable: {}", e))
            }
        },
        ForecastOutcome::Unavailable { reason } => notice(&format!("Forecast unavailable: {}", reason)),
    };

    format!(
        r#"<section>
        <h2>Forecasting Future Crime Trends</h2>
        <div class="chart">{content}</div>
    </section>"#
    )
}

fn render_insights(sections: &[InsightSection]) -> String {
    let body: String = sections
        .iter()
        .map(|section| {
            let paragraphs: String = section
                .paragraphs
                .iter()
                .map(|p| format!("<p>{}</p>", escape_html(p)))
                .collect();
            let bullets = if section.bullets.is_empty() {
                String::new()
            } else {
                let items: String = section
                    .bullets
                    .iter()
                    .map(|b| format!("<li>{}</li>", escape_html(b)))
                    .collect();
                format!("<ul>{}</ul>", items)
            };
            format!("<h3>{}</h3>{}{}", escape_html(section.title), paragraphs, bullets)
        })
        .collect();

    format!(
        r#"<section class="insights">
        <h2>{heading}</h2>
        {body}
    </section>"#,
        heading = escape_html(INSIGHTS_HEADING),
    )
}

fn notice(message: &str) -> String {
    format!(r#"<p class="notice">{}</p>"#, escape_html(message))
}

/// Escape text for element content and quoted attribute values
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn inline_css() -> &'static str {
    r#"
* { box-sizing: border-box; }
body {
    display: flex;
    margin: 0;
    font-family: system-ui, -apple-system, 'Segoe UI', sans-serif;
    color: #111827;
    background: #ffffff;
}
aside {
    width: 260px;
    min-height: 100vh;
    padding: 1.5rem;
    background: #f3f4f6;
}
aside label { display: block; margin-top: 1rem; font-weight: 600; }
aside select { width: 100%; margin-top: 0.25rem; }
aside button { margin-top: 1rem; width: 100%; }
main { flex: 1; padding: 1.5rem 2rem; }
section { margin-bottom: 2rem; }
table { border-collapse: collapse; width: 100%; font-size: 0.875rem; }
th, td { padding: 0.35rem 0.75rem; border-bottom: 1px solid #e5e7eb; text-align: left; }
td.num { text-align: right; font-variant-numeric: tabular-nums; }
td.empty { color: #6b7280; font-style: italic; }
.meta { color: #6b7280; font-size: 0.875rem; }
.notice { padding: 1rem; background: #fef3c7; border: 1px solid #f59e0b; border-radius: 4px; }
.chart svg { max-width: 100%; height: auto; }
.insights h3 { margin-bottom: 0.25rem; }
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Dataset;
    use crate::filter::Selection;
    use crate::forecast::ForecastConfig;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn test_page_contains_every_section() {
        let dataset = Dataset::sample();
        let dashboard = Dashboard::build(&dataset, Selection::all(&dataset), &ForecastConfig::default());
        let html = render_page(&dashboard);

        assert!(html.contains("Crime Data Forecasting Dashboard"));
        assert!(html.contains("Filtered Crime Data"));
        assert!(html.contains("Crime Type Distribution"));
        assert!(html.contains("Forecasting Future Crime Trends"));
        assert!(html.contains("Insights &amp; Interpretation"));
        assert_eq!(html.matches("<svg").count(), 2);
        assert_eq!(html.matches("<tr><td>").count(), 36);
        assert!(html.contains(r#"<option value="Cape Town" selected>"#));
    }

    #[test]
    fn test_page_marks_unselected_options() {
        let dataset = Dataset::sample();
        let selection = Selection::new(vec!["Durban".into()], vec!["Theft".into()]);
        let dashboard = Dashboard::build(&dataset, selection, &ForecastConfig::default());
        let html = render_page(&dashboard);

        assert!(html.contains(r#"<option value="Durban" selected>"#));
        assert!(html.contains(r#"<option value="Johannesburg">"#));
        assert_eq!(html.matches("<tr><td>").count(), 12);
    }

    #[test]
    fn test_empty_selection_still_renders() {
        let dataset = Dataset::sample();
        let dashboard = Dashboard::build(&dataset, Selection::none(), &ForecastConfig::default());
        let html = render_page(&dashboard);

        assert!(html.contains("No rows match the current selection"));
        assert!(html.contains("Forecast unavailable: need at least 2 distinct dates"));
        // bar chart frame still drawn; no forecast chart
        assert_eq!(html.matches("<svg").count(), 1);
    }
}
