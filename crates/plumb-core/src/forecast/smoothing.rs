//! Exponential smoothing models
//!
//! - Holt's linear trend (double smoothing): level and trend
//! - Holt-Winters (triple smoothing): adds a multiplicative seasonal index
//!
//! Both keep the one-step-ahead residuals (`actual - fitted`) seen while
//! fitting so callers can size a confidence interval.

use crate::stats::mean;

/// A fitted smoothing model, ready to extrapolate
#[derive(Debug, Clone, PartialEq)]
pub struct SmoothingFit {
    level: f64,
    trend: f64,
    /// Seasonal indices, present only for Holt-Winters
    seasonals: Option<Vec<f64>>,
    /// Number of observations the model was fitted on
    observations: usize,
    residuals: Vec<f64>,
}

impl SmoothingFit {
    pub fn level(&self) -> f64 {
        self.level
    }

    pub fn trend(&self) -> f64 {
        self.trend
    }

    pub fn is_seasonal(&self) -> bool {
        self.seasonals.is_some()
    }

    pub fn residuals(&self) -> &[f64] {
        &self.residuals
    }

    /// Forecast `steps` periods past the end of the fitted series (`steps >= 1`)
    pub fn forecast(&self, steps: usize) -> f64 {
        let base = self.level + steps as f64 * self.trend;
        match &self.seasonals {
            Some(seasonals) if !seasonals.is_empty() => {
                let index = (self.observations + steps - 1) % seasonals.len();
                base * seasonals[index]
            }
            _ => base,
        }
    }
}

/// Holt's linear trend method.
///
/// Level starts at the first observation and trend at the first
/// difference. Series shorter than two points produce a flat fit.
pub fn holt(series: &[f64], alpha: f64, beta: f64) -> SmoothingFit {
    let Some(&first) = series.first() else {
        return SmoothingFit {
            level: 0.0,
            trend: 0.0,
            seasonals: None,
            observations: 0,
            residuals: Vec::new(),
        };
    };

    let mut level = first;
    let mut trend = series.get(1).map_or(0.0, |second| second - first);
    let mut residuals = Vec::with_capacity(series.len().saturating_sub(1));

    for &value in &series[1..] {
        let fitted = level + trend;
        residuals.push(value - fitted);

        let new_level = alpha * value + (1.0 - alpha) * fitted;
        trend = beta * (new_level - level) + (1.0 - beta) * trend;
        level = new_level;
    }

    SmoothingFit {
        level,
        trend,
        seasonals: None,
        observations: series.len(),
        residuals,
    }
}

/// Multiplicative Holt-Winters.
///
/// Initialization uses the first season: level is its mean, each seasonal
/// index is the observation over that mean, and trend is the per-period
/// change between the first two season means (zero with under two seasons).
/// Returns `None` when the series is shorter than one season or any
/// first-season value is not strictly positive, since a zero index would pin
/// that slot at zero for good.
pub fn holt_winters(
    series: &[f64],
    alpha: f64,
    beta: f64,
    gamma: f64,
    season_length: usize,
) -> Option<SmoothingFit> {
    if season_length == 0 || series.len() < season_length {
        return None;
    }

    let first_season = &series[..season_length];
    if first_season.iter().any(|&value| value <= 0.0) {
        return None;
    }
    let mut level = mean(first_season);
    let mut trend = if series.len() >= 2 * season_length {
        let second_season = &series[season_length..2 * season_length];
        (mean(second_season) - level) / season_length as f64
    } else {
        0.0
    };

    let mut seasonals: Vec<f64> = first_season
        .iter()
        .map(|&value| value / level)
        .collect();

    let mut residuals = Vec::with_capacity(series.len() - season_length);

    for (t, &value) in series.iter().enumerate().skip(season_length) {
        let slot = t % season_length;
        let seasonal = seasonals[slot];

        let fitted = (level + trend) * seasonal;
        residuals.push(value - fitted);

        let deseasonalized = if seasonal > 0.0 { value / seasonal } else { value };
        let new_level = alpha * deseasonalized + (1.0 - alpha) * (level + trend);
        trend = beta * (new_level - level) + (1.0 - beta) * trend;
        level = new_level;

        if level > 0.0 {
            seasonals[slot] = gamma * (value / level) + (1.0 - gamma) * seasonal;
        }
    }

    Some(SmoothingFit {
        level,
        trend,
        seasonals: Some(seasonals),
        observations: series.len(),
        residuals,
    })
}
