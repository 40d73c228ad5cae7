//! Plumb Core Library
//!
//! Analytics engine for the Plumb personal finance tool:
//! - Statistical utilities and monthly aggregation
//! - Recurring payment detection (subscriptions, bills, duplicates)
//! - Expense forecasting with Holt / Holt-Winters smoothing
//! - Cash flow stability scoring
//! - Budget variance reports and budget suggestions
//! - Monte Carlo investment projections
//!
//! Every entry point is a pure function of its inputs. Nothing is stored
//! between calls and nothing performs I/O apart from [`AnalyticsConfig::load`].

pub mod budget;
pub mod config;
pub mod detect;
pub mod error;
pub mod forecast;
pub mod models;
pub mod simulation;
pub mod stability;
pub mod stats;

/// Transaction fixture builders
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use budget::{
    calculate_variance, classify_variance, is_red_flag, BudgetAnalyzer, BudgetConfig,
    BudgetStatus, BudgetSuggestion, CategoryVarianceResult, MonthlyBudgetReport,
};
pub use config::{default_config_path, parse_config, AnalyticsConfig};
pub use detect::{
    calculate_recurring_total, upcoming_charges, DuplicateTransaction, PatternStatus, Period,
    PeriodWindow, PriceChange, RecurringConfig, RecurringDetector, RecurringPattern,
    UpcomingCharge, MAX_HORIZON_DAYS,
};
pub use error::{Error, Result};
pub use forecast::{
    classify_trend, ConfidenceInterval, ExpenseForecaster, ForecastConfig, ForecastMethod,
    ForecastOptions, ForecastResult, Projection,
};
pub use models::{
    ConfidenceLevel, MonthlyAggregate, MonthlyValue, TransactionInput, TransactionType, Trend,
};
pub use simulation::{
    calculate_required_contribution, AllocationWeight, AssetClass, MonteCarloSimulator,
    Percentiles, ReturnAssumption, RiskProfile, ScenarioComparison, SimulationConfig,
    SimulationParams, SimulationResult,
};
pub use stability::{
    negative_month_probability, CashFlowStabilityResult, StabilityAnalyzer, StabilityConfig,
    StabilityRating, VolatilityAnalysis, VolatilitySource,
};
