// Crime Forecast Dashboard - Insights & Interpretation
// Fixed explanatory prose shown under the charts

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct InsightSection {
    pub title: &'static str,
    pub paragraphs: &'static [&'static str],
    pub bullets: &'static [&'static str],
}

pub const INSIGHTS_HEADING: &str = "Insights & Interpretation";

pub const INSIGHTS: &[InsightSection] = &[
    InsightSection {
        title: "How the forecast solves the problem",
        paragraphs: &[
            "The additive model projects future crime totals from the patterns in past months. \
             It separates an overall trend (a steady rise or fall) from yearly seasonality \
             (for example, months that are reliably busier than others).",
            "That separation supports:",
        ],
        bullets: &[
            "Better planning of police resources.",
            "Early warning of high-risk months.",
            "Decisions grounded in data rather than anecdote.",
        ],
    },
    InsightSection {
        title: "Why an additive trend + seasonality model",
        paragraphs: &[],
        bullets: &[
            "Tolerates missing months and irregular spacing between observations.",
            "Fits trend changes and yearly seasonality without manual tuning.",
            "Suits dashboards that receive a new data point every month.",
        ],
    },
    InsightSection {
        title: "Where ARIMA fits in",
        paragraphs: &[
            "ARIMA is a classic alternative that works well on small, regular series. \
             The additive model is more flexible when the data is patchy and its trend and \
             seasonal components are easier to explain to non-specialists, which matters \
             for public-safety reporting.",
        ],
        bullets: &[],
    },
    InsightSection {
        title: "Datasets from other regions",
        paragraphs: &[
            "The sample table is illustrative. When the data comes from another country, \
             the model still learns generic crime behaviour: trends and seasonal cycles. \
             The same pipeline can then be pointed at South African data later.",
            "Only the input changes; the structure of the model and its trend detection \
             stay the same, so the dashboard adapts to a new dataset without code changes.",
        ],
        bullets: &[],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_section_has_content() {
        assert_eq!(INSIGHTS.len(), 4);
        for section in INSIGHTS {
            assert!(!section.title.is_empty());
            assert!(!section.paragraphs.is_empty() || !section.bullets.is_empty());
        }
    }
}
