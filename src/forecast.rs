// Crime Forecast Dashboard - Forecaster
// Additive time-series model: piecewise-linear trend + yearly Fourier seasonality
//
// The rest of the crate only hands this module a (date, value) series and
// reads back predictions with uncertainty bounds.

use crate::data::next_month_end;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;
use tracing::{debug, info};

/// Days in a year, as used by the yearly seasonality terms
const YEAR_DAYS: f64 = 365.25;

/// Histories shorter than this (in days) get no yearly seasonality
const MIN_SEASONAL_SPAN_DAYS: f64 = 730.0;

const PIVOT_EPSILON: f64 = 1e-12;

const QUANTILE_ITERATIONS: usize = 64;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ForecastError {
    #[error("need at least {required} distinct dates to fit a forecast, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("model must be fitted before predicting")]
    NotFitted,

    #[error("invalid forecast configuration: {0}")]
    InvalidConfig(String),

    #[error("forecast equations are singular")]
    Singular,

    #[error("forecast horizon runs past the supported calendar range")]
    DateOutOfRange,
}

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Future monthly periods to predict
    pub periods: usize,
    /// Width of the uncertainty interval (0.80 = 80%)
    pub interval_width: f64,
    /// Upper bound on trend changepoints
    pub n_changepoints: usize,
    /// Fraction of the history in which changepoints may sit
    pub changepoint_range: f64,
    /// Flexibility of the trend; smaller values penalize slope changes harder
    pub changepoint_prior_scale: f64,
    pub yearly_fourier_order: usize,
    pub seasonality_prior_scale: f64,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            periods: 12,
            interval_width: 0.80,
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            yearly_fourier_order: 3,
            seasonality_prior_scale: 10.0,
        }
    }
}

impl ForecastConfig {
    pub fn with_periods(mut self, periods: usize) -> Self {
        self.periods = periods;
        self
    }

    pub fn with_interval_width(mut self, interval_width: f64) -> Self {
        self.interval_width = interval_width;
        self
    }

    pub fn validate(&self) -> Result<(), ForecastError> {
        if self.periods == 0 {
            return Err(ForecastError::InvalidConfig("periods must be at least 1".into()));
        }
        if !(self.interval_width > 0.0 && self.interval_width < 1.0) {
            return Err(ForecastError::InvalidConfig(format!(
                "interval_width must be in (0, 1), got {}",
                self.interval_width
            )));
        }
        if !(self.changepoint_range > 0.0 && self.changepoint_range <= 1.0) {
            return Err(ForecastError::InvalidConfig(format!(
                "changepoint_range must be in (0, 1], got {}",
                self.changepoint_range
            )));
        }
        if self.changepoint_prior_scale <= 0.0 || self.seasonality_prior_scale <= 0.0 {
            return Err(ForecastError::InvalidConfig("prior scales must be positive".into()));
        }
        Ok(())
    }

    /// Normal quantile for the two-sided interval
    fn z_score(&self) -> f64 {
        normal_quantile(0.5 + self.interval_width / 2.0)
    }
}

/// Standard normal CDF approximation.
fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

/// Error function approximation (Abramowitz & Stegun 7.1.26).
fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

/// Inverse of `normal_cdf` for p in [0.5, 1), by bisection
fn normal_quantile(p: f64) -> f64 {
    let (mut lo, mut hi) = (0.0_f64, 10.0_f64);
    for _ in 0..QUANTILE_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if normal_cdf(mid) < p {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

// ============================================================================
// OUTPUT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
    /// Observed value; None for future periods
    pub actual: Option<f64>,
}

impl ForecastPoint {
    pub fn is_future(&self) -> bool {
        self.actual.is_none()
    }
}

/// Fitted history followed by the future periods, in date order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub points: Vec<ForecastPoint>,
}

impl Forecast {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn history(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| !p.is_future())
    }

    pub fn future(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(|p| p.is_future())
    }

    /// Smallest and largest value across bounds and actuals
    pub fn value_range(&self) -> (f64, f64) {
        self.points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            let actual = p.actual.unwrap_or(p.yhat);
            (lo.min(p.yhat_lower).min(actual), hi.max(p.yhat_upper).max(actual))
        })
    }
}

// ============================================================================
// MODEL
// ============================================================================

#[derive(Debug, Clone)]
struct Fitted {
    history: Vec<(NaiveDate, f64)>,
    start_day: i32,
    span_days: f64,
    y_scale: f64,
    changepoints: Vec<f64>,
    yearly: bool,
    coefficients: Vec<f64>,
    /// Residual standard deviation in original units
    sigma: f64,
}

#[derive(Debug, Clone)]
pub struct AdditiveModel {
    config: ForecastConfig,
    fitted: Option<Fitted>,
}

impl Default for AdditiveModel {
    fn default() -> Self {
        Self::new(ForecastConfig::default())
    }
}

impl AdditiveModel {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config, fitted: None }
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Number of trend changepoints chosen by the last fit
    pub fn changepoint_count(&self) -> Option<usize> {
        self.fitted.as_ref().map(|f| f.changepoints.len())
    }

    /// Whether the last fit included yearly seasonality
    pub fn has_yearly_seasonality(&self) -> Option<bool> {
        self.fitted.as_ref().map(|f| f.yearly)
    }

    /// Fit the model to a (date, value) series. Values on a repeated date
    /// are summed; order does not matter.
    pub fn fit(&mut self, series: &[(NaiveDate, f64)]) -> Result<(), ForecastError> {
        self.config.validate()?;
        self.fitted = None;

        let history = coalesce(series);
        if history.len() < 2 {
            return Err(ForecastError::InsufficientData {
                required: 2,
                actual: history.len(),
            });
        }

        let start_day = history[0].0.num_days_from_ce();
        let span_days = (history[history.len() - 1].0.num_days_from_ce() - start_day) as f64;
        let y_scale = history
            .iter()
            .map(|(_, y)| y.abs())
            .fold(0.0_f64, f64::max);
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };

        let scaled_t: Vec<f64> = history
            .iter()
            .map(|(d, _)| (d.num_days_from_ce() - start_day) as f64 / span_days)
            .collect();

        let mut fitted = Fitted {
            changepoints: place_changepoints(&scaled_t, &self.config),
            yearly: span_days >= MIN_SEASONAL_SPAN_DAYS && self.config.yearly_fourier_order > 0,
            history,
            start_day,
            span_days,
            y_scale,
            coefficients: Vec::new(),
            sigma: 0.0,
        };

        let penalties = fitted.penalties(&self.config);
        let width = penalties.len();

        // Normal equations: (XᵀX + diag(λ)) β = Xᵀy
        let mut xtx = vec![vec![0.0; width]; width];
        let mut xty = vec![0.0; width];
        for (date, y) in &fitted.history {
            let row = fitted.features(*date, &self.config);
            let y = y / y_scale;
            for i in 0..width {
                xty[i] += row[i] * y;
                for j in 0..width {
                    xtx[i][j] += row[i] * row[j];
                }
            }
        }
        for (i, penalty) in penalties.iter().enumerate() {
            xtx[i][i] += penalty;
        }

        fitted.coefficients = solve(xtx, xty)?;

        let residual_ss: f64 = fitted
            .history
            .iter()
            .map(|(date, y)| {
                let r = y - fitted.evaluate(*date, &self.config);
                r * r
            })
            .sum();
        fitted.sigma = (residual_ss / fitted.history.len() as f64).sqrt();

        info!(
            points = fitted.history.len(),
            changepoints = fitted.changepoints.len(),
            yearly = fitted.yearly,
            sigma = fitted.sigma,
            "fitted additive forecast model"
        );

        self.fitted = Some(fitted);
        Ok(())
    }

    /// Predict every historical date plus `periods` future month ends.
    pub fn predict(&self) -> Result<Forecast, ForecastError> {
        let fitted = self.fitted.as_ref().ok_or(ForecastError::NotFitted)?;
        let z = self.config.z_score();

        let mut points = Vec::with_capacity(fitted.history.len() + self.config.periods);

        for (date, actual) in &fitted.history {
            let yhat = fitted.evaluate(*date, &self.config);
            let half = z * fitted.sigma;
            points.push(ForecastPoint {
                date: *date,
                yhat,
                yhat_lower: yhat - half,
                yhat_upper: yhat + half,
                actual: Some(*actual),
            });
        }

        let mut date = fitted.history[fitted.history.len() - 1].0;
        for step in 1..=self.config.periods {
            date = next_month_end(date).ok_or(ForecastError::DateOutOfRange)?;
            let yhat = fitted.evaluate(date, &self.config);
            let half = z * fitted.sigma * (step as f64).sqrt();
            points.push(ForecastPoint {
                date,
                yhat,
                yhat_lower: yhat - half,
                yhat_upper: yhat + half,
                actual: None,
            });
        }

        debug!(points = points.len(), "predicted forecast");
        Ok(Forecast { points })
    }
}

/// Fit on `series` and predict in one step
pub fn forecast_series(
    series: &[(NaiveDate, f64)],
    config: &ForecastConfig,
) -> Result<Forecast, ForecastError> {
    let mut model = AdditiveModel::new(config.clone());
    model.fit(series)?;
    model.predict()
}

impl Fitted {
    fn scaled_time(&self, date: NaiveDate) -> f64 {
        (date.num_days_from_ce() - self.start_day) as f64 / self.span_days
    }

    /// Design row: [1, t, (t - s_j)+ .., cos/sin yearly terms ..]
    fn features(&self, date: NaiveDate, config: &ForecastConfig) -> Vec<f64> {
        let t = self.scaled_time(date);
        let mut row = Vec::with_capacity(2 + self.changepoints.len() + 2 * config.yearly_fourier_order);
        row.push(1.0);
        row.push(t);
        row.extend(self.changepoints.iter().map(|s| (t - s).max(0.0)));

        if self.yearly {
            let day = date.num_days_from_ce() as f64;
            for n in 1..=config.yearly_fourier_order {
                let angle = 2.0 * PI * n as f64 * day / YEAR_DAYS;
                row.push(angle.cos());
                row.push(angle.sin());
            }
        }
        row
    }

    /// Ridge penalty per column; intercept and base slope are free
    fn penalties(&self, config: &ForecastConfig) -> Vec<f64> {
        let mut penalties = vec![0.0, 0.0];
        penalties.extend(std::iter::repeat(1.0 / config.changepoint_prior_scale).take(self.changepoints.len()));
        if self.yearly {
            penalties.extend(
                std::iter::repeat(1.0 / config.seasonality_prior_scale).take(2 * config.yearly_fourier_order),
            );
        }
        penalties
    }

    /// Model value in original units
    fn evaluate(&self, date: NaiveDate, config: &ForecastConfig) -> f64 {
        let row = self.features(date, config);
        let scaled: f64 = row.iter().zip(&self.coefficients).map(|(x, b)| x * b).sum();
        scaled * self.y_scale
    }
}

/// Sort by date and sum values that share a date
fn coalesce(series: &[(NaiveDate, f64)]) -> Vec<(NaiveDate, f64)> {
    let mut sorted = series.to_vec();
    sorted.sort_by_key(|(d, _)| *d);

    let mut out: Vec<(NaiveDate, f64)> = Vec::with_capacity(sorted.len());
    for (date, value) in sorted {
        match out.last_mut() {
            Some((last, total)) if *last == date => *total += value,
            _ => out.push((date, value)),
        }
    }
    out
}

/// Changepoints sit on distinct history points spread uniformly over the
/// first `changepoint_range` of the history, never on the first point.
fn place_changepoints(scaled_t: &[f64], config: &ForecastConfig) -> Vec<f64> {
    let hist_size = ((scaled_t.len() as f64) * config.changepoint_range).floor() as usize;
    let count = config.n_changepoints.min(hist_size.saturating_sub(1));
    if count == 0 {
        return Vec::new();
    }

    let last = (hist_size - 1) as f64;
    let mut indexes: Vec<usize> = (1..=count)
        .map(|k| (last * k as f64 / count as f64).round() as usize)
        .collect();
    indexes.dedup();
    indexes.into_iter().map(|i| scaled_t[i]).collect()
}

/// Gaussian elimination with partial pivoting
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, ForecastError> {
    let n = b.len();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .ok_or(ForecastError::Singular)?;
        if a[pivot][col].abs() < PIVOT_EPSILON {
            return Err(ForecastError::Singular);
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}
