//! Recurring payment command implementations

use std::path::Path;

use anyhow::Result;
use plumb_core::{
    calculate_recurring_total, upcoming_charges, AnalyticsConfig, PatternStatus,
    RecurringDetector,
};
use serde::Serialize;

use super::{load_transactions, parse_date, print_json, truncate};

#[derive(Serialize)]
struct RecurringReport {
    patterns: Vec<plumb_core::RecurringPattern>,
    monthly_total: f64,
    price_changes: Vec<plumb_core::PriceChange>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duplicates: Option<Vec<plumb_core::DuplicateTransaction>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    upcoming: Option<Vec<plumb_core::UpcomingCharge>>,
}

pub fn cmd_recurring(
    config: &AnalyticsConfig,
    file: &Path,
    include_income: bool,
    duplicates: bool,
    upcoming: Option<&str>,
    horizon: i64,
    json: bool,
) -> Result<()> {
    let transactions = load_transactions(file)?;

    let mut recurring = config.recurring.clone();
    recurring.include_income |= include_income;
    let detector = RecurringDetector::with_config(recurring)?;

    let patterns = detector.detect(&transactions);
    let report = RecurringReport {
        monthly_total: calculate_recurring_total(&patterns),
        price_changes: detector.detect_price_changes(&patterns),
        duplicates: duplicates.then(|| detector.detect_duplicates(&transactions)),
        upcoming: upcoming
            .map(parse_date)
            .transpose()?
            .map(|today| upcoming_charges(&patterns, today, horizon))
            .transpose()?,
        patterns,
    };

    if json {
        return print_json(&report);
    }

    if report.patterns.is_empty() {
        println!("No recurring payments found.");
        println!("   Recurring charges need at least 2 regular occurrences.");
        return Ok(());
    }

    println!();
    println!("🔁 Recurring Payments");
    println!("   ─────────────────────────────────────────────────────────────");

    for pattern in &report.patterns {
        let status_icon = match pattern.status {
            PatternStatus::Confirmed => "✅",
            PatternStatus::Unconfirmed => "❔",
        };
        println!(
            "   {} {:22} │ {:>9} {:<9} │ {:>5.1}% │ next {}",
            status_icon,
            truncate(&pattern.merchant, 22),
            format!("${:.2}", pattern.average_amount),
            pattern.period.as_str(),
            pattern.confidence,
            pattern.next_occurrence
        );
    }

    println!();
    println!(
        "   Confirmed recurring spend: ${:.2}/month",
        report.monthly_total
    );

    if !report.price_changes.is_empty() {
        println!();
        println!("📈 Price Increases");
        for change in &report.price_changes {
            println!(
                "   {} ${:.2} → ${:.2} (+{:.1}%) on {}",
                truncate(&change.merchant, 22),
                change.previous_amount,
                change.current_amount,
                change.change_percent,
                change.changed_on
            );
        }
    }

    if let Some(duplicates) = &report.duplicates {
        println!();
        if duplicates.is_empty() {
            println!("👯 No duplicate charges found");
        } else {
            println!("👯 Possible Duplicate Charges");
            for dup in duplicates {
                println!(
                    "   {} {} ${:.2} (same as {})",
                    dup.date,
                    truncate(&dup.merchant, 22),
                    dup.amount,
                    dup.duplicate_of
                );
            }
        }
    }

    if let Some(upcoming) = &report.upcoming {
        println!();
        println!("📅 Upcoming Charges ({} days)", horizon);
        if upcoming.is_empty() {
            println!("   Nothing due");
        }
        for charge in upcoming {
            println!(
                "   {} {:22} ${:.2}",
                charge.due_date,
                truncate(&charge.merchant, 22),
                charge.amount
            );
        }
    }

    Ok(())
}
