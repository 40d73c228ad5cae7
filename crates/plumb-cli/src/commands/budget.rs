//! Budget command implementations

use std::path::Path;

use anyhow::Result;
use plumb_core::{AnalyticsConfig, BudgetAnalyzer, BudgetStatus, ConfidenceLevel};

use super::{load_budgets, load_transactions, print_json, truncate};

pub fn cmd_budget(
    config: &AnalyticsConfig,
    file: &Path,
    budgets_file: &Path,
    month: &str,
    json: bool,
) -> Result<()> {
    let transactions = load_transactions(file)?;
    let budgets = load_budgets(budgets_file)?;
    let analyzer = BudgetAnalyzer::with_config(config.budget.clone())?;

    let report = analyzer.monthly_report(&transactions, &budgets, month)?;

    if json {
        return print_json(&report);
    }

    println!();
    println!("💰 Budget Report: {}", report.month);
    println!("   ─────────────────────────────────────────────────────────────");

    for category in &report.categories {
        let status_icon = match category.status {
            BudgetStatus::OnTrack => "✅",
            BudgetStatus::UnderBudget => "🔽",
            BudgetStatus::OverBudget => "🚩",
        };
        let variance = if category.variance_percent.is_finite() {
            format!("{:+.1}%", category.variance_percent)
        } else {
            "unbudgeted".to_string()
        };

        println!(
            "   {} {:22} │ {:>10} of {:>10} │ {:>11}",
            status_icon,
            truncate(&category.category, 22),
            format!("${:.2}", category.actual),
            format!("${:.2}", category.budgeted),
            variance
        );
    }

    println!();
    println!(
        "   Spent ${:.2} of ${:.2} budgeted; income ${:.2}; surplus ${:.2}",
        report.total_actual, report.total_budgeted, report.total_income, report.surplus
    );
    if report.red_flag_count > 0 {
        println!("   🚩 {} categories need attention", report.red_flag_count);
    }

    Ok(())
}

pub fn cmd_suggest(
    config: &AnalyticsConfig,
    file: &Path,
    category: Option<&str>,
    json: bool,
) -> Result<()> {
    let transactions = load_transactions(file)?;
    let analyzer = BudgetAnalyzer::with_config(config.budget.clone())?;

    let suggestions = match category {
        Some(category) => vec![analyzer.suggest_budget(&transactions, category)],
        None => analyzer.suggest_budgets(&transactions),
    };

    if json {
        return print_json(&suggestions);
    }

    if suggestions.is_empty() {
        println!("No expense history to suggest budgets from.");
        return Ok(());
    }

    println!();
    println!("💡 Suggested Budgets");
    println!("   ─────────────────────────────────────────────────────────────");
    for suggestion in &suggestions {
        let note = match suggestion.confidence {
            ConfidenceLevel::Low | ConfidenceLevel::Insufficient => " (limited history)",
            _ => "",
        };
        println!(
            "   {:22} │ {:>10}/month │ {} months{}",
            truncate(&suggestion.category, 22),
            format!("${:.0}", suggestion.suggested_amount),
            suggestion.months_of_data,
            note
        );
    }

    Ok(())
}
