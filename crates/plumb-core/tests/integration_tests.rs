//! Integration tests for plumb-core
//!
//! These tests run one synthetic household through the whole engine:
//! detect → stability → forecast → budget → simulate.

use std::collections::BTreeMap;

use plumb_core::{
    calculate_recurring_total,
    test_utils::{expense, expense_series, income_series, monthly_expenses, transfer},
    AnalyticsConfig, BudgetAnalyzer, ConfidenceLevel, ExpenseForecaster, ForecastMethod,
    ForecastOptions, MonteCarloSimulator, PatternStatus, Period, RecurringDetector,
    SimulationParams, StabilityAnalyzer, TransactionInput, TransactionType,
};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Twelve months of a salaried household:
/// - payroll on the 1st, rent on the 3rd
/// - two streaming subscriptions
/// - groceries with varying amounts
/// - a monthly transfer to savings (must be ignored everywhere)
fn household() -> Vec<TransactionInput> {
    let mut txs = income_series("ACME CORP PAYROLL", "2024-01-01", &[4200.0; 12]);
    txs.extend(monthly_expenses("Landlord", "Housing", 1500.0, "2024-01-03", 12));
    txs.extend(monthly_expenses("NETFLIX.COM", "Entertainment", 15.49, "2024-01-15", 12));
    txs.extend(monthly_expenses("SPOTIFY USA", "Music", 10.99, "2024-01-20", 12));
    txs.extend(expense_series(
        "Corner Grocer",
        "Groceries",
        "2024-01-08",
        &[
            420.0, 385.0, 510.0, 450.0, 390.0, 470.0, 405.0, 520.0, 440.0, 395.0, 480.0, 610.0,
        ],
    ));
    for month in 1..=12 {
        txs.push(transfer(
            &format!("2024-{:02}-25", month),
            "Transfer to savings",
            500.0,
        ));
    }
    txs
}

fn chase_style_json() -> &'static str {
    r#"[
  {"id": "a1", "date": "2024-07-15", "description": "NETFLIX.COM", "category": "Entertainment", "amount": -15.49, "type": "expense"},
  {"id": "a2", "date": "2024-08-15", "description": "NETFLIX.COM", "category": "Entertainment", "amount": -15.49, "type": "expense"},
  {"id": "a3", "date": "2024-09-15", "description": "NETFLIX.COM", "category": "Entertainment", "amount": -15.49, "type": "expense"},
  {"id": "a4", "date": "2024-10-15", "description": "NETFLIX.COM", "category": "Entertainment", "amount": -15.49, "type": "expense"},
  {"id": "b1", "date": "2024-07-01", "description": "Payroll", "category": "Salary", "amount": 3000.0, "type": "income", "account": "checking"},
  {"id": "b2", "date": "2024-07-02", "description": "To savings", "category": "Transfer", "amount": 500.0, "type": "transfer", "note": "auto"}
]"#
}

// =============================================================================
// Input Format
// =============================================================================

#[test]
fn test_json_input_feeds_detector() {
    let transactions: Vec<TransactionInput> =
        serde_json::from_str(chase_style_json()).expect("Failed to parse transactions");

    assert_eq!(transactions.len(), 6);
    assert_eq!(transactions[4].transaction_type, TransactionType::Income);
    assert_eq!(transactions[4].account.as_deref(), Some("checking"));

    let patterns = RecurringDetector::new().detect(&transactions);
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].merchant, "NETFLIX.COM");
    assert_eq!(patterns[0].status, PatternStatus::Confirmed);
}

// =============================================================================
// Full Workflow
// =============================================================================

#[test]
fn test_recurring_detection_on_household() {
    let txs = household();
    let patterns = RecurringDetector::new().detect(&txs);

    for merchant in ["Landlord", "NETFLIX.COM", "SPOTIFY USA"] {
        let pattern = patterns
            .iter()
            .find(|p| p.merchant == merchant)
            .unwrap_or_else(|| panic!("{} not detected", merchant));
        assert_eq!(pattern.period, Period::Monthly);
        assert_eq!(pattern.status, PatternStatus::Confirmed);
        assert_eq!(pattern.occurrences, 12);
    }

    // Transfers and income never show up as recurring expenses
    assert!(patterns.iter().all(|p| p.category != "Transfer"));
    assert!(patterns.iter().all(|p| p.category != "Salary"));

    let total = calculate_recurring_total(&patterns);
    assert!(total >= 1500.0 + 15.49 + 10.99);
}

#[test]
fn test_stability_with_detected_patterns() {
    let txs = household();
    let analyzer = StabilityAnalyzer::new();

    let result = analyzer.analyze_with_patterns(&txs, &RecurringDetector::new());

    assert_eq!(result.months_analyzed, 12);
    assert_eq!(result.confidence, ConfidenceLevel::High);
    assert!(result.mean_net_cash_flow > 2000.0);
    assert!(result.stability_index > 0.0 && result.stability_index <= 100.0);
    assert!(result.negative_month_probability < 0.01);
    assert!(result.recurring_expense_ratio > 0.5);

    // The built-in heuristic gives an answer in the same range
    let heuristic = analyzer.analyze(&txs);
    assert_eq!(heuristic.mean_net_cash_flow, result.mean_net_cash_flow);
    assert!(heuristic.stability_index > 0.0);
}

#[test]
fn test_forecast_total_for_household() {
    let txs = household();
    let options = ForecastOptions {
        periods: 3,
        override_value: None,
    };

    let forecaster = ExpenseForecaster::new();
    let categories = forecaster.forecast_all(&txs, &options).unwrap();
    let names: Vec<&str> = categories.iter().map(|c| c.category.as_str()).collect();
    assert_eq!(
        names,
        vec!["Entertainment", "Groceries", "Housing", "Music"]
    );
    assert!(categories.iter().all(|c| c.seasonal));

    let housing = categories.iter().find(|c| c.category == "Housing").unwrap();
    assert!((housing.forecast - 1500.0).abs() < 0.01);

    let total = forecaster.forecast_total(&txs, &options).unwrap();
    assert_eq!(total.method, ForecastMethod::ExponentialSmoothing);
    assert_eq!(total.history.len(), 12);
    assert_eq!(total.projections.len(), 3);
    assert_eq!(total.projections[0].month, "2025-01");
    let lowest = categories.iter().map(|c| c.confidence).min().unwrap();
    assert_eq!(total.confidence, lowest);
}

#[test]
fn test_budget_report_for_household() {
    let mut txs = household();
    txs.push(expense("2024-06-18", "Concert Hall", "Entertainment", -120.0));

    let budgets: BTreeMap<String, f64> = [
        ("Housing".to_string(), 1500.0),
        ("Groceries".to_string(), 450.0),
        ("Entertainment".to_string(), 20.0),
    ]
    .into_iter()
    .collect();

    let report = BudgetAnalyzer::new()
        .monthly_report(&txs, &budgets, "2024-06")
        .unwrap();

    // Housing 1500 + Groceries 470 + Entertainment 135.49 + Music 10.99
    assert_eq!(report.total_actual, 2116.48);
    assert_eq!(report.total_income, 4200.0);
    assert_eq!(report.surplus, 2083.52);
    // Entertainment is over budget; Music has no budget
    assert_eq!(report.red_flag_count, 2);
    assert!(report.categories.iter().all(|c| c.category != "Transfer"));

    let suggestions = BudgetAnalyzer::new().suggest_budgets(&txs);
    let groceries = suggestions
        .iter()
        .find(|s| s.category == "Groceries")
        .unwrap();
    assert_eq!(groceries.months_of_data, 12);
    assert_eq!(groceries.confidence, ConfidenceLevel::High);
    assert_eq!(groceries.suggested_amount % 10.0, 0.0);
}

#[test]
fn test_surplus_invested_over_ten_years() {
    let txs = household();
    let stability = StabilityAnalyzer::new().analyze(&txs);
    let contribution = stability.mean_net_cash_flow * 0.5;

    let params = SimulationParams::new(10_000.0, contribution, 120)
        .with_goal(200_000.0)
        .with_simulations(2_000);
    let mut rng = StdRng::seed_from_u64(7);

    let scenarios = MonteCarloSimulator::new()
        .compare_scenarios(&params, &mut rng)
        .unwrap();

    assert_eq!(scenarios.len(), 3);
    for scenario in &scenarios {
        let p = scenario.result.percentiles;
        assert!(p.p10 <= p.p50 && p.p50 <= p.p90);
        let probability = scenario.result.goal_probability.unwrap();
        assert!((0.0..=1.0).contains(&probability));
    }
}

#[test]
fn test_components_accept_loaded_config() {
    let config = AnalyticsConfig::load(None).unwrap();

    let txs = household();
    let detector = RecurringDetector::with_config(config.recurring.clone()).unwrap();
    let stability = StabilityAnalyzer::with_config(config.stability.clone()).unwrap();
    let forecaster = ExpenseForecaster::with_config(config.forecast.clone()).unwrap();
    let budget = BudgetAnalyzer::with_config(config.budget.clone()).unwrap();
    let simulator = MonteCarloSimulator::with_config(config.simulation).unwrap();

    assert!(!detector.detect(&txs).is_empty());
    assert_eq!(stability.analyze(&txs).months_analyzed, 12);
    assert_eq!(
        forecaster
            .forecast_category(&txs, "Housing", &ForecastOptions::default())
            .unwrap()
            .history
            .len(),
        12
    );
    assert!(budget.suggest_budget(&txs, "Housing").suggested_amount > 0.0);
    assert!(simulator.config().num_simulations > 0);
}
