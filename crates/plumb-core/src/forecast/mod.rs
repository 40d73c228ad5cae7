//! Expense forecasting
//!
//! Picks a method from the length of a category's monthly history:
//! - under 3 months: simple average with a fixed ±50% band
//! - 3 to 11 months: Holt's linear trend
//! - 12+ months: Holt-Winters with a 12-month multiplicative season
//!
//! Forecasts are floored at zero. Intervals come from in-sample residuals.

mod smoothing;

pub use smoothing::{holt, holt_winters, SmoothingFit};

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{ConfidenceLevel, MonthlyValue, TransactionInput, Trend};
use crate::stats::{
    add_months, coefficient_of_variation, expense_months_by_category, mean, month_key,
    months_in_range, parse_month_key, round_to, standard_deviation,
};

/// Category label used for the all-categories forecast
pub const TOTAL_CATEGORY: &str = "All Categories";

/// Forecaster configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Level smoothing, 0 < alpha < 1
    pub alpha: f64,
    /// Trend smoothing, 0 < beta < 1
    pub beta: f64,
    /// Seasonal smoothing, 0 < gamma < 1
    pub gamma: f64,
    pub season_length: usize,
    /// Months of history needed before smoothing replaces the average
    pub min_months_for_smoothing: usize,
    /// Months of history needed for the seasonal model
    pub min_months_for_seasonal: usize,
    /// Interval width in residual standard deviations
    pub z_score: f64,
    /// Series CV at or below this is high confidence
    pub high_confidence_cv: f64,
    /// Series CV at or below this is medium confidence
    pub medium_confidence_cv: f64,
    /// Relative half-over-half change that counts as a trend
    pub trend_threshold: f64,
    /// Weight of a caller-supplied override in the blended forecast
    pub override_weight: f64,
    /// Fractional band around a simple-average forecast
    pub simple_average_band: f64,
    /// Upper bound on `ForecastOptions::periods`
    pub max_periods: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            alpha: 0.3,
            beta: 0.1,
            gamma: 0.1,
            season_length: 12,
            min_months_for_smoothing: 3,
            min_months_for_seasonal: 12,
            z_score: 1.96,
            high_confidence_cv: 0.15,
            medium_confidence_cv: 0.35,
            trend_threshold: 0.10,
            override_weight: 0.4,
            simple_average_band: 0.5,
            max_periods: 120,
        }
    }
}

impl ForecastConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("alpha", self.alpha), ("beta", self.beta), ("gamma", self.gamma)] {
            if !(value > 0.0 && value < 1.0) {
                return Err(Error::InvalidConfig(format!(
                    "forecast.{} must be between 0 and 1 (exclusive), got {}",
                    name, value
                )));
            }
        }
        if self.season_length < 2 {
            return Err(Error::InvalidConfig(
                "forecast.season_length must be at least 2".to_string(),
            ));
        }
        if self.min_months_for_smoothing < 2 {
            return Err(Error::InvalidConfig(
                "forecast.min_months_for_smoothing must be at least 2".to_string(),
            ));
        }
        if self.z_score <= 0.0 {
            return Err(Error::InvalidConfig(
                "forecast.z_score must be positive".to_string(),
            ));
        }
        if !(self.high_confidence_cv > 0.0 && self.high_confidence_cv <= self.medium_confidence_cv)
        {
            return Err(Error::InvalidConfig(
                "forecast confidence cutoffs must satisfy 0 < high <= medium".to_string(),
            ));
        }
        if self.trend_threshold < 0.0 {
            return Err(Error::InvalidConfig(
                "forecast.trend_threshold must be non-negative".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.override_weight) {
            return Err(Error::InvalidConfig(
                "forecast.override_weight must be between 0 and 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.simple_average_band) {
            return Err(Error::InvalidConfig(
                "forecast.simple_average_band must be between 0 and 1".to_string(),
            ));
        }
        if self.max_periods == 0 || self.max_periods > i32::MAX as usize {
            return Err(Error::InvalidConfig(format!(
                "forecast.max_periods must be between 1 and {}",
                i32::MAX
            )));
        }
        Ok(())
    }
}

/// How a forecast was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastMethod {
    InsufficientData,
    SimpleAverage,
    ExponentialSmoothing,
}

impl ForecastMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientData => "insufficient_data",
            Self::SimpleAverage => "simple_average",
            Self::ExponentialSmoothing => "exponential_smoothing",
        }
    }
}

impl std::fmt::Display for ForecastMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-call forecast options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastOptions {
    /// Months to project, at least 1
    pub periods: usize,
    /// Caller's own estimate for next month, blended into the model output
    pub override_value: Option<f64>,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            periods: 1,
            override_value: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

/// One projected month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub month: String,
    pub amount: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub category: String,
    /// Next month's point forecast
    pub forecast: f64,
    pub interval: ConfidenceInterval,
    pub confidence: ConfidenceLevel,
    pub trend: Trend,
    pub history: Vec<MonthlyValue>,
    pub method: ForecastMethod,
    /// Holt-Winters produced the forecast
    pub seasonal: bool,
    pub projections: Vec<Projection>,
}

impl ForecastResult {
    fn insufficient(category: &str) -> Self {
        Self {
            category: category.to_string(),
            forecast: 0.0,
            interval: ConfidenceInterval {
                lower: 0.0,
                upper: 0.0,
            },
            confidence: ConfidenceLevel::Insufficient,
            trend: Trend::Stable,
            history: Vec::new(),
            method: ForecastMethod::InsufficientData,
            seasonal: false,
            projections: Vec::new(),
        }
    }
}

/// Classify direction by comparing the means of the two halves of a series
pub fn classify_trend(values: &[f64], threshold: f64) -> Trend {
    if values.len() < 2 {
        return Trend::Stable;
    }

    let (first, second) = values.split_at(values.len() / 2);
    let first_mean = mean(first);
    let second_mean = mean(second);

    if first_mean == 0.0 {
        return if second_mean > 0.0 {
            Trend::Increasing
        } else {
            Trend::Stable
        };
    }

    let change = (second_mean - first_mean) / first_mean.abs();
    if change > threshold {
        Trend::Increasing
    } else if change < -threshold {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

pub struct ExpenseForecaster {
    config: ForecastConfig,
}

impl Default for ExpenseForecaster {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpenseForecaster {
    pub fn new() -> Self {
        Self {
            config: ForecastConfig::default(),
        }
    }

    pub fn with_config(config: ForecastConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Forecast a single category.
    ///
    /// The history runs from the category's first month to the last month
    /// present anywhere in `transactions`, with missing months as zero.
    pub fn forecast_category(
        &self,
        transactions: &[TransactionInput],
        category: &str,
        options: &ForecastOptions,
    ) -> Result<ForecastResult> {
        let by_category = expense_months_by_category(transactions);
        let Some(months) = by_category.get(category) else {
            self.validate_options(options)?;
            debug!("No expense history for category '{}'", category);
            return Ok(ForecastResult::insufficient(category));
        };

        let history = fill_history(months, last_month(transactions).as_deref())?;
        self.forecast_series(category, history, options)
    }

    /// Forecast every expense category, sorted by category name
    pub fn forecast_all(
        &self,
        transactions: &[TransactionInput],
        options: &ForecastOptions,
    ) -> Result<Vec<ForecastResult>> {
        self.validate_options(options)?;
        let last = last_month(transactions);
        expense_months_by_category(transactions)
            .iter()
            .map(|(category, months)| {
                let history = fill_history(months, last.as_deref())?;
                self.forecast_series(category, history, options)
            })
            .collect()
    }

    /// Sum of all category forecasts.
    ///
    /// Confidence is the lowest seen across categories. History is the
    /// combined monthly spend.
    pub fn forecast_total(
        &self,
        transactions: &[TransactionInput],
        options: &ForecastOptions,
    ) -> Result<ForecastResult> {
        let results = self.forecast_all(transactions, options)?;
        if results.is_empty() {
            return Ok(ForecastResult::insufficient(TOTAL_CATEGORY));
        }

        let mut combined: BTreeMap<String, f64> = BTreeMap::new();
        for result in &results {
            for point in &result.history {
                *combined.entry(point.month.clone()).or_insert(0.0) += point.amount;
            }
        }
        let history: Vec<MonthlyValue> = combined
            .into_iter()
            .map(|(month, amount)| MonthlyValue {
                month,
                amount: round_to(amount, 2),
            })
            .collect();
        let values: Vec<f64> = history.iter().map(|h| h.amount).collect();

        let mut projections: Vec<Projection> = Vec::new();
        for result in &results {
            for (i, projection) in result.projections.iter().enumerate() {
                match projections.get_mut(i) {
                    Some(total) => {
                        total.amount += projection.amount;
                        total.lower += projection.lower;
                        total.upper += projection.upper;
                    }
                    None => projections.push(projection.clone()),
                }
            }
        }
        for projection in &mut projections {
            projection.amount = round_to(projection.amount, 2);
            projection.lower = round_to(projection.lower, 2);
            projection.upper = round_to(projection.upper, 2);
        }

        let confidence = results
            .iter()
            .map(|r| r.confidence)
            .min()
            .unwrap_or(ConfidenceLevel::Insufficient);
        let method = if results
            .iter()
            .any(|r| r.method == ForecastMethod::ExponentialSmoothing)
        {
            ForecastMethod::ExponentialSmoothing
        } else {
            ForecastMethod::SimpleAverage
        };

        Ok(ForecastResult {
            category: TOTAL_CATEGORY.to_string(),
            forecast: round_to(results.iter().map(|r| r.forecast).sum(), 2),
            interval: ConfidenceInterval {
                lower: round_to(results.iter().map(|r| r.interval.lower).sum(), 2),
                upper: round_to(results.iter().map(|r| r.interval.upper).sum(), 2),
            },
            confidence,
            trend: classify_trend(&values, self.config.trend_threshold),
            history,
            method,
            seasonal: results.iter().any(|r| r.seasonal),
            projections,
        })
    }

    /// Forecast an already-built monthly history
    pub fn forecast_series(
        &self,
        category: &str,
        history: Vec<MonthlyValue>,
        options: &ForecastOptions,
    ) -> Result<ForecastResult> {
        self.validate_options(options)?;

        let Some(last) = history.last() else {
            return Ok(ForecastResult::insufficient(category));
        };
        let last_month = parse_month_key(&last.month)?;
        let values: Vec<f64> = history.iter().map(|h| h.amount).collect();

        let (mut projections, method, seasonal, confidence) =
            if values.len() < self.config.min_months_for_smoothing {
                debug!(
                    "Forecast '{}': {} months, using simple average",
                    category,
                    values.len()
                );
                let average = mean(&values).max(0.0);
                let band = self.config.simple_average_band;
                let projections = (1..=options.periods)
                    .map(|h| {
                        Ok(Projection {
                            month: projection_month(last_month, h)?,
                            amount: average,
                            lower: average * (1.0 - band),
                            upper: average * (1.0 + band),
                        })
                    })
                    .collect::<Result<Vec<Projection>>>()?;
                (
                    projections,
                    ForecastMethod::SimpleAverage,
                    false,
                    ConfidenceLevel::Low,
                )
            } else {
                let fit = self.fit(&values);
                debug!(
                    "Forecast '{}': {} months, seasonal={}",
                    category,
                    values.len(),
                    fit.is_seasonal()
                );

                let spread = if fit.residuals().len() >= 2 {
                    standard_deviation(fit.residuals())
                } else {
                    standard_deviation(&values)
                };

                let projections = (1..=options.periods)
                    .map(|h| {
                        let amount = fit.forecast(h).max(0.0);
                        let margin = self.config.z_score * spread * (h as f64).sqrt();
                        Ok(Projection {
                            month: projection_month(last_month, h)?,
                            amount,
                            lower: (amount - margin).max(0.0),
                            upper: amount + margin,
                        })
                    })
                    .collect::<Result<Vec<Projection>>>()?;
                (
                    projections,
                    ForecastMethod::ExponentialSmoothing,
                    fit.is_seasonal(),
                    self.assess_confidence(&values),
                )
            };

        if let Some(override_value) = options.override_value {
            let weight = self.config.override_weight;
            let blend = |model: f64| (weight * override_value + (1.0 - weight) * model).max(0.0);
            for projection in &mut projections {
                projection.amount = blend(projection.amount);
                projection.lower = blend(projection.lower);
                projection.upper = blend(projection.upper);
            }
        }

        for projection in &mut projections {
            projection.amount = round_to(projection.amount, 2);
            projection.lower = round_to(projection.lower, 2);
            projection.upper = round_to(projection.upper, 2);
        }

        let (forecast, interval) = projections
            .first()
            .map(|p| {
                (
                    p.amount,
                    ConfidenceInterval {
                        lower: p.lower,
                        upper: p.upper,
                    },
                )
            })
            .unwrap_or((
                0.0,
                ConfidenceInterval {
                    lower: 0.0,
                    upper: 0.0,
                },
            ));

        Ok(ForecastResult {
            category: category.to_string(),
            forecast,
            interval,
            confidence,
            trend: classify_trend(&values, self.config.trend_threshold),
            history,
            method,
            seasonal,
            projections,
        })
    }

    fn fit(&self, values: &[f64]) -> SmoothingFit {
        let config = &self.config;
        if values.len() >= config.min_months_for_seasonal {
            if let Some(fit) = holt_winters(
                values,
                config.alpha,
                config.beta,
                config.gamma,
                config.season_length,
            ) {
                return fit;
            }
        }
        holt(values, config.alpha, config.beta)
    }

    fn validate_options(&self, options: &ForecastOptions) -> Result<()> {
        if options.periods == 0 || options.periods > self.config.max_periods {
            return Err(Error::InvalidConfig(format!(
                "forecast periods must be between 1 and {}, got {}",
                self.config.max_periods, options.periods
            )));
        }
        if let Some(value) = options.override_value {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidConfig(format!(
                    "forecast override must be a non-negative number, got {}",
                    value
                )));
            }
        }
        Ok(())
    }

    fn assess_confidence(&self, values: &[f64]) -> ConfidenceLevel {
        match coefficient_of_variation(values) {
            Some(cv) if cv <= self.config.high_confidence_cv => ConfidenceLevel::High,
            Some(cv) if cv <= self.config.medium_confidence_cv => ConfidenceLevel::Medium,
            _ => ConfidenceLevel::Low,
        }
    }
}

/// Month key `h` months after `last_month`
fn projection_month(last_month: NaiveDate, h: usize) -> Result<String> {
    i32::try_from(h)
        .ok()
        .and_then(|h| add_months(last_month, h))
        .map(month_key)
        .ok_or_else(|| {
            Error::InvalidData(format!(
                "{} months after {} is out of range",
                h,
                month_key(last_month)
            ))
        })
}

/// Latest month key among non-transfer transactions
fn last_month(transactions: &[TransactionInput]) -> Option<String> {
    transactions
        .iter()
        .filter(|t| !t.is_transfer())
        .map(|t| t.date)
        .max()
        .map(month_key)
}

fn fill_history(
    months: &BTreeMap<String, f64>,
    last_month: Option<&str>,
) -> Result<Vec<MonthlyValue>> {
    let Some(first) = months.keys().next() else {
        return Ok(Vec::new());
    };
    let last = last_month
        .or_else(|| months.keys().next_back().map(String::as_str))
        .unwrap_or(first);

    Ok(months_in_range(first, last)?
        .into_iter()
        .map(|month| {
            let amount = months.get(&month).copied().unwrap_or(0.0);
            MonthlyValue {
                month,
                amount: round_to(amount, 2),
            }
        })
        .collect())
}
