//! Cash flow stability analysis
//!
//! Scores how predictable monthly net cash flow is:
//!
//! ```text
//! index = 100 * (1 - min(1, CV)) * (1 - non_recurring_ratio)
//! ```
//!
//! clamped to 0-100 and forced to 0 when mean net flow is negative.
//! The chance of a negative month comes from a normal model of net flow.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::detect::{calculate_recurring_total, RecurringDetector};
use crate::error::{Error, Result};
use crate::models::{ConfidenceLevel, MonthlyAggregate, TransactionInput};
use crate::stats::{
    coefficient_of_variation, get_sorted_monthly_aggregates, mean, normal_cdf, round_to,
    standard_deviation,
};

/// Stability analyzer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// Most recent months considered
    pub lookback_months: usize,
    /// Below this many months the result is `insufficient`
    pub min_months: usize,
    /// Horizon for the negative-month probability
    pub horizon_months: u32,
    /// CV above which income or expenses count as volatile
    pub volatility_cv_threshold: f64,
    pub very_stable_threshold: f64,
    pub stable_threshold: f64,
    pub moderate_threshold: f64,
    pub high_confidence_months: usize,
    pub medium_confidence_months: usize,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            lookback_months: 12,
            min_months: 3,
            horizon_months: 3,
            volatility_cv_threshold: 0.20,
            very_stable_threshold: 80.0,
            stable_threshold: 60.0,
            moderate_threshold: 40.0,
            high_confidence_months: 12,
            medium_confidence_months: 6,
        }
    }
}

impl StabilityConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_months < 2 {
            return Err(Error::InvalidConfig(
                "stability.min_months must be at least 2".to_string(),
            ));
        }
        if self.lookback_months < self.min_months {
            return Err(Error::InvalidConfig(
                "stability.lookback_months must be >= min_months".to_string(),
            ));
        }
        if self.horizon_months == 0 {
            return Err(Error::InvalidConfig(
                "stability.horizon_months must be at least 1".to_string(),
            ));
        }
        if self.volatility_cv_threshold <= 0.0 {
            return Err(Error::InvalidConfig(
                "stability.volatility_cv_threshold must be positive".to_string(),
            ));
        }
        if !(0.0 <= self.moderate_threshold
            && self.moderate_threshold <= self.stable_threshold
            && self.stable_threshold <= self.very_stable_threshold
            && self.very_stable_threshold <= 100.0)
        {
            return Err(Error::InvalidConfig(
                "stability rating thresholds must be ascending within 0-100".to_string(),
            ));
        }
        if self.medium_confidence_months > self.high_confidence_months {
            return Err(Error::InvalidConfig(
                "stability.medium_confidence_months must be <= high_confidence_months"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StabilityRating {
    Volatile,
    Moderate,
    Stable,
    #[serde(rename = "Very Stable")]
    VeryStable,
}

impl StabilityRating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Volatile => "Volatile",
            Self::Moderate => "Moderate",
            Self::Stable => "Stable",
            Self::VeryStable => "Very Stable",
        }
    }
}

impl std::fmt::Display for StabilityRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowStabilityResult {
    /// 0-100, higher is more stable
    pub stability_index: f64,
    pub rating: StabilityRating,
    /// `None` when mean net flow is zero or there are too few months
    pub coefficient_of_variation: Option<f64>,
    pub mean_net_cash_flow: f64,
    pub std_dev_net_cash_flow: f64,
    pub recurring_expense_ratio: f64,
    /// Chance of at least one negative month over the horizon
    pub negative_month_probability: f64,
    pub months_analyzed: usize,
    pub confidence: ConfidenceLevel,
    pub explanation: String,
}

/// Which side of the ledger drives volatility
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolatilitySource {
    Income,
    Expenses,
    Both,
    Neither,
}

impl VolatilitySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expenses => "expenses",
            Self::Both => "both",
            Self::Neither => "neither",
        }
    }
}

impl std::fmt::Display for VolatilitySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityAnalysis {
    pub source: VolatilitySource,
    pub income_cv: Option<f64>,
    pub expense_cv: Option<f64>,
}

/// Probability of at least one negative month in `horizon_months`,
/// treating months as independent draws from `N(mean, std_dev)`
pub fn negative_month_probability(mean: f64, std_dev: f64, horizon_months: u32) -> f64 {
    let single = if std_dev > 0.0 {
        normal_cdf(-mean / std_dev)
    } else if mean < 0.0 {
        1.0
    } else {
        0.0
    };
    1.0 - (1.0 - single).powi(horizon_months as i32)
}

pub struct StabilityAnalyzer {
    config: StabilityConfig,
}

impl Default for StabilityAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl StabilityAnalyzer {
    pub fn new() -> Self {
        Self {
            config: StabilityConfig::default(),
        }
    }

    pub fn with_config(config: StabilityConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &StabilityConfig {
        &self.config
    }

    /// Analyze with the built-in recurring-ratio heuristic
    pub fn analyze(&self, transactions: &[TransactionInput]) -> CashFlowStabilityResult {
        self.analyze_with_recurring_ratio(transactions, None)
    }

    /// Analyze, optionally with a recurring-expense ratio measured elsewhere
    pub fn analyze_with_recurring_ratio(
        &self,
        transactions: &[TransactionInput],
        recurring_ratio: Option<f64>,
    ) -> CashFlowStabilityResult {
        let months = self.lookback(transactions);
        self.analyze_months(&months, recurring_ratio)
    }

    /// Run the detector and use its confirmed monthly total as the
    /// recurring share of average expenses
    pub fn analyze_with_patterns(
        &self,
        transactions: &[TransactionInput],
        detector: &RecurringDetector,
    ) -> CashFlowStabilityResult {
        let months = self.lookback(transactions);
        let expenses: Vec<f64> = months.iter().map(|m| m.expenses).collect();
        let mean_expenses = mean(&expenses);

        let recurring_total = calculate_recurring_total(&detector.detect(transactions));
        let ratio = if mean_expenses > 0.0 {
            (recurring_total / mean_expenses).min(1.0)
        } else {
            1.0
        };
        debug!(
            "Recurring total {:.2} against mean expenses {:.2}",
            recurring_total, mean_expenses
        );

        self.analyze_months(&months, Some(ratio))
    }

    /// Analyze pre-aggregated months (already limited to the lookback)
    pub fn analyze_months(
        &self,
        months: &[MonthlyAggregate],
        recurring_ratio: Option<f64>,
    ) -> CashFlowStabilityResult {
        let count = months.len();
        if count < self.config.min_months {
            debug!(
                "Stability gated: {} months, need {}",
                count, self.config.min_months
            );
            return CashFlowStabilityResult {
                stability_index: 0.0,
                rating: StabilityRating::Volatile,
                coefficient_of_variation: None,
                mean_net_cash_flow: 0.0,
                std_dev_net_cash_flow: 0.0,
                recurring_expense_ratio: 0.0,
                negative_month_probability: 0.0,
                months_analyzed: count,
                confidence: ConfidenceLevel::Insufficient,
                explanation: format!(
                    "Need at least {} months of cash flow history to assess stability (found {}).",
                    self.config.min_months, count
                ),
            };
        }

        let nets: Vec<f64> = months.iter().map(|m| m.net).collect();
        let mean_net = mean(&nets);
        let std_net = standard_deviation(&nets);
        let cv = coefficient_of_variation(&nets);

        let recurring = recurring_ratio
            .map(|r| r.clamp(0.0, 1.0))
            .unwrap_or_else(|| heuristic_recurring_ratio(months));

        let index = if mean_net < 0.0 {
            0.0
        } else {
            // An undefined CV (zero mean) scores as fully volatile
            let volatility = cv.unwrap_or(1.0).min(1.0);
            (100.0 * (1.0 - volatility) * recurring).clamp(0.0, 100.0)
        };

        let probability = negative_month_probability(mean_net, std_net, self.config.horizon_months);
        let rating = self.rate(index);

        let confidence = if count >= self.config.high_confidence_months {
            ConfidenceLevel::High
        } else if count >= self.config.medium_confidence_months {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        };

        let explanation = self.explain(rating, mean_net, cv, count, probability);

        CashFlowStabilityResult {
            stability_index: round_to(index, 1),
            rating,
            coefficient_of_variation: cv.map(|v| round_to(v, 3)),
            mean_net_cash_flow: round_to(mean_net, 2),
            std_dev_net_cash_flow: round_to(std_net, 2),
            recurring_expense_ratio: round_to(recurring, 3),
            negative_month_probability: round_to(probability, 3),
            months_analyzed: count,
            confidence,
            explanation,
        }
    }

    /// Attribute volatility to income, expenses, both or neither
    pub fn analyze_volatility_source(&self, transactions: &[TransactionInput]) -> VolatilityAnalysis {
        let months = self.lookback(transactions);
        let income: Vec<f64> = months.iter().map(|m| m.income).collect();
        let expenses: Vec<f64> = months.iter().map(|m| m.expenses).collect();

        let income_cv = coefficient_of_variation(&income);
        let expense_cv = coefficient_of_variation(&expenses);

        let threshold = self.config.volatility_cv_threshold;
        let income_volatile = income_cv.is_some_and(|cv| cv > threshold);
        let expenses_volatile = expense_cv.is_some_and(|cv| cv > threshold);

        let source = match (income_volatile, expenses_volatile) {
            (true, true) => VolatilitySource::Both,
            (true, false) => VolatilitySource::Income,
            (false, true) => VolatilitySource::Expenses,
            (false, false) => VolatilitySource::Neither,
        };

        VolatilityAnalysis {
            source,
            income_cv: income_cv.map(|v| round_to(v, 3)),
            expense_cv: expense_cv.map(|v| round_to(v, 3)),
        }
    }

    /// Months until `cash_on_hand` runs out at the mean monthly burn.
    ///
    /// `None` when there is no history or net flow is not negative.
    pub fn estimate_runway(&self, cash_on_hand: f64, transactions: &[TransactionInput]) -> Option<f64> {
        let months = self.lookback(transactions);
        if months.is_empty() {
            return None;
        }

        let nets: Vec<f64> = months.iter().map(|m| m.net).collect();
        let mean_net = mean(&nets);
        if mean_net >= 0.0 {
            return None;
        }

        Some(round_to((cash_on_hand / -mean_net).max(0.0), 1))
    }

    fn lookback(&self, transactions: &[TransactionInput]) -> Vec<MonthlyAggregate> {
        let mut months = get_sorted_monthly_aggregates(transactions);
        let excess = months.len().saturating_sub(self.config.lookback_months);
        months.drain(..excess);
        months
    }

    fn rate(&self, index: f64) -> StabilityRating {
        if index >= self.config.very_stable_threshold {
            StabilityRating::VeryStable
        } else if index >= self.config.stable_threshold {
            StabilityRating::Stable
        } else if index >= self.config.moderate_threshold {
            StabilityRating::Moderate
        } else {
            StabilityRating::Volatile
        }
    }

    fn explain(
        &self,
        rating: StabilityRating,
        mean_net: f64,
        cv: Option<f64>,
        months: usize,
        probability: f64,
    ) -> String {
        let variation = match cv {
            Some(cv) => format!("varied by {:.0}% month to month", cv * 100.0),
            None => "averaged zero, so its variation is undefined".to_string(),
        };
        let mut text = format!(
            "{}: over {} months, net cash flow averaged ${:.2} and {}. \
             {:.0}% chance of at least one negative month in the next {} months.",
            rating,
            months,
            mean_net,
            variation,
            probability * 100.0,
            self.config.horizon_months
        );
        if mean_net < 0.0 {
            text.push_str(" Spending exceeds income on average, so the index is 0.");
        }
        text
    }
}

/// `max(0, mean - std) / mean` over monthly expenses.
///
/// Treats spending within one standard deviation of the mean as the
/// recurring base. Detected patterns give a better figure when available.
fn heuristic_recurring_ratio(months: &[MonthlyAggregate]) -> f64 {
    let expenses: Vec<f64> = months.iter().map(|m| m.expenses).collect();
    let mean_expenses = mean(&expenses);
    if mean_expenses <= 0.0 {
        return 1.0;
    }
    (mean_expenses - standard_deviation(&expenses)).max(0.0) / mean_expenses
}
