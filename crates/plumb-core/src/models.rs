//! Domain models for Plumb

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Transaction classification.
///
/// This is authoritative: the sign of `amount` is never used to decide
/// whether a transaction is income or an expense.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            "transfer" => Ok(Self::Transfer),
            _ => Err(format!("Unknown transaction type: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A categorized transaction supplied by the calling layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub id: String,
    pub date: NaiveDate,
    pub description: String,
    pub category: String,
    /// Signed amount as it appeared in the source data
    pub amount: f64,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl TransactionInput {
    /// Magnitude of the amount; all aggregation works on this
    pub fn abs_amount(&self) -> f64 {
        self.amount.abs()
    }

    pub fn is_income(&self) -> bool {
        self.transaction_type == TransactionType::Income
    }

    pub fn is_expense(&self) -> bool {
        self.transaction_type == TransactionType::Expense
    }

    pub fn is_transfer(&self) -> bool {
        self.transaction_type == TransactionType::Transfer
    }
}

/// Income and expense totals for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    /// Month key in `YYYY-MM` form
    pub month: String,
    pub income: f64,
    pub expenses: f64,
    /// `income - expenses`
    pub net: f64,
}

impl MonthlyAggregate {
    pub fn new(month: impl Into<String>) -> Self {
        Self {
            month: month.into(),
            income: 0.0,
            expenses: 0.0,
            net: 0.0,
        }
    }
}

/// How much historical data backs a metric.
///
/// Variants are ordered from weakest to strongest so `min()` yields the
/// most conservative level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Insufficient,
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insufficient => "insufficient",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Direction of a spending series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Amount for a single month in a history series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyValue {
    pub month: String,
    pub amount: f64,
}
