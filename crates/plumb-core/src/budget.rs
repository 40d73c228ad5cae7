//! Budget variance analysis
//!
//! Compares actual category spending to budgeted amounts, flags overspend
//! and suggests budgets from history.
//!
//! `variance = (actual - budgeted) / budgeted * 100`, with two special
//! cases: zero budget and zero spend is 0, zero budget with spend is
//! `f64::INFINITY` (serialized to JSON as `null`).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{ConfidenceLevel, TransactionInput};
use crate::stats::{expense_months_by_category, mean, month_key, parse_month_key, round_to};

/// Budget engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Half-width of the on-track band, in percent
    pub variance_threshold: f64,
    /// Category labels excluded from every report (case-insensitive)
    pub transfer_categories: Vec<String>,
    /// Below this many months a suggestion is low confidence
    pub suggestion_min_months: usize,
    /// At or above this many months a suggestion is high confidence
    pub suggestion_high_months: usize,
    /// Suggestions round to the nearest multiple of this
    pub suggestion_rounding: f64,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            variance_threshold: 20.0,
            transfer_categories: vec!["transfer".to_string(), "transfers".to_string()],
            suggestion_min_months: 3,
            suggestion_high_months: 6,
            suggestion_rounding: 10.0,
        }
    }
}

impl BudgetConfig {
    pub fn validate(&self) -> Result<()> {
        if self.variance_threshold < 0.0 {
            return Err(Error::InvalidConfig(
                "budget.variance_threshold must be non-negative".to_string(),
            ));
        }
        if self.suggestion_rounding <= 0.0 {
            return Err(Error::InvalidConfig(
                "budget.suggestion_rounding must be positive".to_string(),
            ));
        }
        if self.suggestion_high_months < self.suggestion_min_months {
            return Err(Error::InvalidConfig(
                "budget.suggestion_high_months must be >= suggestion_min_months".to_string(),
            ));
        }
        Ok(())
    }

    fn is_transfer_category(&self, category: &str) -> bool {
        self.transfer_categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BudgetStatus {
    #[serde(rename = "On Track")]
    OnTrack,
    #[serde(rename = "Over Budget")]
    OverBudget,
    #[serde(rename = "Under Budget")]
    UnderBudget,
}

impl BudgetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OnTrack => "On Track",
            Self::OverBudget => "Over Budget",
            Self::UnderBudget => "Under Budget",
        }
    }
}

impl std::fmt::Display for BudgetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryVarianceResult {
    pub category: String,
    pub budgeted: f64,
    pub actual: f64,
    /// Signed percentage; `INFINITY` for spend against a zero budget
    pub variance_percent: f64,
    pub variance_amount: f64,
    pub status: BudgetStatus,
    pub red_flag: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBudgetReport {
    pub month: String,
    pub total_budgeted: f64,
    pub total_actual: f64,
    pub total_income: f64,
    /// `total_income - total_actual`
    pub surplus: f64,
    pub red_flag_count: usize,
    pub categories: Vec<CategoryVarianceResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetSuggestion {
    pub category: String,
    pub suggested_amount: f64,
    pub average_monthly: f64,
    pub months_of_data: usize,
    pub confidence: ConfidenceLevel,
}

/// Signed variance percentage of `actual` against `budgeted`
pub fn calculate_variance(budgeted: f64, actual: f64) -> f64 {
    if budgeted == 0.0 {
        return if actual == 0.0 { 0.0 } else { f64::INFINITY };
    }
    (actual - budgeted) / budgeted * 100.0
}

/// Overspend beyond the band; underspend is never flagged
pub fn is_red_flag(variance: f64, threshold: f64) -> bool {
    variance > threshold
}

pub fn classify_variance(variance: f64, threshold: f64) -> BudgetStatus {
    if variance > threshold {
        BudgetStatus::OverBudget
    } else if variance < -threshold {
        BudgetStatus::UnderBudget
    } else {
        BudgetStatus::OnTrack
    }
}

pub struct BudgetAnalyzer {
    config: BudgetConfig,
}

impl Default for BudgetAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl BudgetAnalyzer {
    pub fn new() -> Self {
        Self {
            config: BudgetConfig::default(),
        }
    }

    pub fn with_config(config: BudgetConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    pub fn is_red_flag(&self, variance: f64) -> bool {
        is_red_flag(variance, self.config.variance_threshold)
    }

    pub fn analyze_category(&self, category: &str, budgeted: f64, actual: f64) -> CategoryVarianceResult {
        let variance = calculate_variance(budgeted, actual);
        CategoryVarianceResult {
            category: category.to_string(),
            budgeted: round_to(budgeted, 2),
            actual: round_to(actual, 2),
            variance_percent: round_to(variance, 1),
            variance_amount: round_to(actual - budgeted, 2),
            status: classify_variance(variance, self.config.variance_threshold),
            red_flag: self.is_red_flag(variance),
        }
    }

    /// Variance for every budgeted category plus every category with
    /// unbudgeted spend, sorted by category name.
    ///
    /// `transactions` should already be limited to the period of interest.
    pub fn category_report(
        &self,
        transactions: &[TransactionInput],
        budgets: &BTreeMap<String, f64>,
    ) -> Vec<CategoryVarianceResult> {
        let mut actuals: BTreeMap<&str, f64> = BTreeMap::new();
        for tx in transactions.iter().filter(|t| t.is_expense()) {
            if self.config.is_transfer_category(&tx.category) {
                continue;
            }
            *actuals.entry(tx.category.as_str()).or_insert(0.0) += tx.abs_amount();
        }

        let categories: BTreeSet<&str> = budgets
            .keys()
            .map(String::as_str)
            .chain(actuals.keys().copied())
            .filter(|c| !self.config.is_transfer_category(c))
            .collect();

        categories
            .into_iter()
            .map(|category| {
                let budgeted = budgets.get(category).copied().unwrap_or(0.0);
                let actual = actuals.get(category).copied().unwrap_or(0.0);
                self.analyze_category(category, budgeted, actual)
            })
            .collect()
    }

    /// Report for one `YYYY-MM` month
    pub fn monthly_report(
        &self,
        transactions: &[TransactionInput],
        budgets: &BTreeMap<String, f64>,
        month: &str,
    ) -> Result<MonthlyBudgetReport> {
        let month = month_key(parse_month_key(month)?);
        let in_month: Vec<TransactionInput> = transactions
            .iter()
            .filter(|t| month_key(t.date) == month)
            .cloned()
            .collect();

        let categories = self.category_report(&in_month, budgets);
        let total_income: f64 = in_month
            .iter()
            .filter(|t| t.is_income())
            .map(|t| t.abs_amount())
            .sum();
        let total_budgeted: f64 = categories.iter().map(|c| c.budgeted).sum();
        let total_actual: f64 = categories.iter().map(|c| c.actual).sum();
        let red_flag_count = categories.iter().filter(|c| c.red_flag).count();

        debug!(
            "Budget report {}: {} categories, {} red flags",
            month,
            categories.len(),
            red_flag_count
        );

        Ok(MonthlyBudgetReport {
            month,
            total_budgeted: round_to(total_budgeted, 2),
            total_actual: round_to(total_actual, 2),
            total_income: round_to(total_income, 2),
            surplus: round_to(total_income - total_actual, 2),
            red_flag_count,
            categories,
        })
    }

    /// Suggest a monthly budget from the months in which the category had spend
    pub fn suggest_budget(&self, transactions: &[TransactionInput], category: &str) -> BudgetSuggestion {
        let by_category = expense_months_by_category(transactions);
        let monthly: Vec<f64> = by_category
            .get(category)
            .map(|months| months.values().copied().collect())
            .unwrap_or_default();
        self.suggestion(category, &monthly)
    }

    /// Suggestions for every non-transfer expense category
    pub fn suggest_budgets(&self, transactions: &[TransactionInput]) -> Vec<BudgetSuggestion> {
        expense_months_by_category(transactions)
            .into_iter()
            .filter(|(category, _)| !self.config.is_transfer_category(category))
            .map(|(category, months)| {
                let monthly: Vec<f64> = months.into_values().collect();
                self.suggestion(&category, &monthly)
            })
            .collect()
    }

    fn suggestion(&self, category: &str, monthly: &[f64]) -> BudgetSuggestion {
        let months_of_data = monthly.len();
        let average = mean(monthly);
        let step = self.config.suggestion_rounding;

        let confidence = if months_of_data < self.config.suggestion_min_months {
            ConfidenceLevel::Low
        } else if months_of_data < self.config.suggestion_high_months {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::High
        };

        BudgetSuggestion {
            category: category.to_string(),
            suggested_amount: round_to((average / step).round() * step, 2),
            average_monthly: round_to(average, 2),
            months_of_data,
            confidence,
        }
    }
}
