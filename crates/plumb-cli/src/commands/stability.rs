//! Cash flow stability command implementations

use std::path::Path;

use anyhow::Result;
use plumb_core::{
    AnalyticsConfig, CashFlowStabilityResult, RecurringDetector, StabilityAnalyzer,
    StabilityRating, VolatilityAnalysis,
};
use serde::Serialize;

use super::{load_transactions, print_json};

#[derive(Serialize)]
struct StabilityReport {
    stability: CashFlowStabilityResult,
    volatility: VolatilityAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    runway_months: Option<f64>,
}

pub fn cmd_stability(
    config: &AnalyticsConfig,
    file: &Path,
    use_patterns: bool,
    cash: Option<f64>,
    json: bool,
) -> Result<()> {
    let transactions = load_transactions(file)?;
    let analyzer = StabilityAnalyzer::with_config(config.stability.clone())?;

    let stability = if use_patterns {
        let detector = RecurringDetector::with_config(config.recurring.clone())?;
        analyzer.analyze_with_patterns(&transactions, &detector)
    } else {
        analyzer.analyze(&transactions)
    };

    let report = StabilityReport {
        stability,
        volatility: analyzer.analyze_volatility_source(&transactions),
        runway_months: cash.and_then(|cash| analyzer.estimate_runway(cash, &transactions)),
    };

    if json {
        return print_json(&report);
    }

    let s = &report.stability;
    let rating_icon = match s.rating {
        StabilityRating::VeryStable => "🟢",
        StabilityRating::Stable => "🟡",
        StabilityRating::Moderate => "🟠",
        StabilityRating::Volatile => "🔴",
    };

    println!();
    println!("⚖️  Cash Flow Stability");
    println!("   ─────────────────────────────────────────────────────────────");
    println!(
        "   {} {} ({:.1}/100, {} confidence)",
        rating_icon, s.rating, s.stability_index, s.confidence
    );
    println!(
        "   Net cash flow:   ${:.2}/month ± ${:.2}",
        s.mean_net_cash_flow, s.std_dev_net_cash_flow
    );
    println!(
        "   Recurring share: {:.0}%",
        s.recurring_expense_ratio * 100.0
    );
    println!(
        "   Negative month:  {:.1}% chance in the next {} months",
        s.negative_month_probability * 100.0,
        config.stability.horizon_months
    );
    println!(
        "   Volatility from: {}",
        report.volatility.source.as_str()
    );
    if let Some(runway) = report.runway_months {
        println!("   Runway:          {:.1} months", runway);
    }
    println!();
    println!("   {}", s.explanation);

    Ok(())
}
