//! Forecast command implementations

use std::path::Path;

use anyhow::Result;
use plumb_core::{AnalyticsConfig, ExpenseForecaster, ForecastOptions, ForecastResult};

use super::{load_transactions, print_json, truncate};

pub fn cmd_forecast(
    config: &AnalyticsConfig,
    file: &Path,
    category: Option<&str>,
    periods: usize,
    override_value: Option<f64>,
    json: bool,
) -> Result<()> {
    let transactions = load_transactions(file)?;
    let forecaster = ExpenseForecaster::with_config(config.forecast.clone())?;
    let options = ForecastOptions {
        periods,
        override_value,
    };

    let results = match category {
        Some(category) => vec![forecaster.forecast_category(&transactions, category, &options)?],
        None => {
            let mut results = forecaster.forecast_all(&transactions, &options)?;
            results.push(forecaster.forecast_total(&transactions, &options)?);
            results
        }
    };

    if json {
        return print_json(&results);
    }

    println!();
    println!("🔮 Expense Forecast");
    println!("   ─────────────────────────────────────────────────────────────");
    for result in &results {
        print_forecast(result);
    }

    Ok(())
}

fn print_forecast(result: &ForecastResult) {
    let trend_icon = match result.trend {
        plumb_core::Trend::Increasing => "↑",
        plumb_core::Trend::Decreasing => "↓",
        plumb_core::Trend::Stable => "→",
    };

    println!(
        "   {:22} │ {:>10} │ {:>10} – {:<10} │ {} {:<6} │ {}{}",
        truncate(&result.category, 22),
        format!("${:.2}", result.forecast),
        format!("${:.2}", result.interval.lower),
        format!("${:.2}", result.interval.upper),
        trend_icon,
        result.confidence.as_str(),
        result.method.as_str(),
        if result.seasonal { " (seasonal)" } else { "" }
    );

    for projection in result.projections.iter().skip(1) {
        println!(
            "   {:>22} │ {:>10} │ {:>10} – {:<10}",
            projection.month,
            format!("${:.2}", projection.amount),
            format!("${:.2}", projection.lower),
            format!("${:.2}", projection.upper),
        );
    }
}
