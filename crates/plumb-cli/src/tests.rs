//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;

use plumb_core::test_utils::{income_series, monthly_expenses};
use plumb_core::{AnalyticsConfig, AssetClass, TransactionInput};
use tempfile::NamedTempFile;

use crate::cli::ProjectionArgs;
use crate::commands::{self, truncate};

fn write_json<T: serde::Serialize>(value: &T) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", serde_json::to_string(value).unwrap()).unwrap();
    file
}

fn household_file() -> NamedTempFile {
    let mut txs: Vec<TransactionInput> = income_series("Payroll", "2024-01-01", &[3500.0; 8]);
    txs.extend(monthly_expenses("Landlord", "Housing", 1400.0, "2024-01-03", 8));
    txs.extend(monthly_expenses("NETFLIX.COM", "Entertainment", 15.49, "2024-01-15", 8));
    write_json(&txs)
}

fn projection(months: u32) -> ProjectionArgs {
    ProjectionArgs {
        initial: 1_000.0,
        contribution: 100.0,
        months,
        goal: Some(5_000.0),
        simulations: Some(200),
        seed: Some(1),
    }
}

// ========== Input Loading Tests ==========

#[test]
fn test_load_transactions() {
    let file = household_file();
    let txs = commands::load_transactions(file.path()).unwrap();
    assert_eq!(txs.len(), 24);
}

#[test]
fn test_load_transactions_missing_file() {
    let err = commands::load_transactions(std::path::Path::new("/nonexistent/tx.json"))
        .unwrap_err();
    assert!(err.to_string().contains("Failed to read transactions"));
}

#[test]
fn test_load_transactions_bad_json() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "[{{\"id\": 1}}]").unwrap();
    let err = commands::load_transactions(file.path()).unwrap_err();
    assert!(err.to_string().contains("Invalid transactions JSON"));
}

#[test]
fn test_load_budgets() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"Housing": 1400, "Groceries": 450.5}}"#).unwrap();
    let budgets = commands::load_budgets(file.path()).unwrap();
    assert_eq!(budgets.get("Groceries"), Some(&450.5));
}

// ========== Analytics Command Tests ==========

#[test]
fn test_cmd_recurring() {
    let config = AnalyticsConfig::default();
    let file = household_file();

    assert!(
        commands::cmd_recurring(&config, file.path(), false, true, Some("2024-08-20"), 30, false)
            .is_ok()
    );
    assert!(commands::cmd_recurring(&config, file.path(), true, false, None, 30, true).is_ok());
}

#[test]
fn test_cmd_recurring_bad_date() {
    let config = AnalyticsConfig::default();
    let file = household_file();
    let result = commands::cmd_recurring(&config, file.path(), false, false, Some("08/20/2024"), 30, false);
    assert!(result.is_err());
}

#[test]
fn test_cmd_recurring_bad_horizon() {
    let config = AnalyticsConfig::default();
    let file = household_file();

    for horizon in [-5, 100_000_000] {
        let result =
            commands::cmd_recurring(&config, file.path(), false, false, Some("2024-08-20"), horizon, true);
        assert!(result.is_err());
    }
}

#[test]
fn test_cmd_forecast() {
    let config = AnalyticsConfig::default();
    let file = household_file();

    assert!(commands::cmd_forecast(&config, file.path(), None, 3, None, false).is_ok());
    assert!(
        commands::cmd_forecast(&config, file.path(), Some("Housing"), 1, Some(1500.0), true)
            .is_ok()
    );
    // Zero periods is a caller error
    assert!(commands::cmd_forecast(&config, file.path(), Some("Housing"), 0, None, true).is_err());
    // So is a horizon past forecast.max_periods
    assert!(commands::cmd_forecast(&config, file.path(), None, 10_000, None, true).is_err());
}

#[test]
fn test_cmd_stability() {
    let config = AnalyticsConfig::default();
    let file = household_file();

    assert!(commands::cmd_stability(&config, file.path(), false, None, false).is_ok());
    assert!(commands::cmd_stability(&config, file.path(), true, Some(10_000.0), true).is_ok());
}

#[test]
fn test_cmd_budget_and_suggest() {
    let config = AnalyticsConfig::default();
    let file = household_file();
    let mut budgets = NamedTempFile::new().unwrap();
    write!(budgets, r#"{{"Housing": 1400, "Entertainment": 10}}"#).unwrap();

    assert!(commands::cmd_budget(&config, file.path(), budgets.path(), "2024-03", false).is_ok());
    assert!(commands::cmd_budget(&config, file.path(), budgets.path(), "2024-03", true).is_ok());
    assert!(commands::cmd_budget(&config, file.path(), budgets.path(), "March", false).is_err());

    assert!(commands::cmd_suggest(&config, file.path(), None, false).is_ok());
    assert!(commands::cmd_suggest(&config, file.path(), Some("Housing"), true).is_ok());
}

#[test]
fn test_cmd_simulate() {
    let config = AnalyticsConfig::default();

    assert!(commands::cmd_simulate(&config, &projection(60), None, &[], false).is_ok());
    assert!(commands::cmd_simulate(&config, &projection(60), Some("aggressive"), &[], true).is_ok());

    let allocation = vec!["large_cap=60".to_string(), "bonds=40".to_string()];
    assert!(commands::cmd_simulate(&config, &projection(60), None, &allocation, false).is_ok());

    assert!(commands::cmd_simulate(&config, &projection(60), Some("yolo"), &[], false).is_err());
    assert!(commands::cmd_simulate(&config, &projection(0), None, &[], false).is_err());
}

#[test]
fn test_cmd_compare_and_required() {
    let config = AnalyticsConfig::default();

    assert!(commands::cmd_compare(&config, &projection(24), false).is_ok());
    assert!(commands::cmd_compare(&config, &projection(24), true).is_ok());

    assert!(commands::cmd_required(1_000.0, 10_000.0, 60, 0.06, false).is_ok());
    assert!(commands::cmd_required(1_000.0, 10_000.0, 0, 0.06, true).is_err());
}

#[test]
fn test_parse_allocation() {
    let weights =
        commands::parse_allocation(&["Large-Cap=70".to_string(), "reit = 30".to_string()])
            .unwrap();
    assert_eq!(weights.len(), 2);
    assert_eq!(weights[0].asset_class, AssetClass::LargeCap);
    assert_eq!(weights[1].weight, 30.0);

    assert!(commands::parse_allocation(&["bonds".to_string()]).is_err());
    assert!(commands::parse_allocation(&["gold=10".to_string()]).is_err());
    assert!(commands::parse_allocation(&["cash=lots".to_string()]).is_err());
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("Netflix", 10), "Netflix");
    assert_eq!(truncate("A very long merchant name", 10), "A very ...");
    assert_eq!(truncate("Café Crème Brûlée", 8), "Café ...");
}
