//! Plumb CLI - Personal finance analytics
//!
//! Usage:
//!   plumb recurring --file tx.json             Detect recurring payments
//!   plumb forecast --file tx.json --periods 3  Forecast expenses
//!   plumb stability --file tx.json             Score cash flow stability
//!   plumb simulate --months 240 --contribution 500

mod cli;
mod commands;

#[cfg(test)]
mod tests;

use anyhow::{Context, Result};
use clap::Parser;
use plumb_core::AnalyticsConfig;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    let config =
        AnalyticsConfig::load(cli.config.as_deref()).context("Failed to load analytics config")?;

    match cli.command {
        Commands::Recurring {
            file,
            include_income,
            duplicates,
            upcoming,
            horizon,
        } => commands::cmd_recurring(
            &config,
            &file,
            include_income,
            duplicates,
            upcoming.as_deref(),
            horizon,
            cli.json,
        ),
        Commands::Forecast {
            file,
            category,
            periods,
            override_value,
        } => commands::cmd_forecast(
            &config,
            &file,
            category.as_deref(),
            periods,
            override_value,
            cli.json,
        ),
        Commands::Stability {
            file,
            use_patterns,
            cash,
        } => commands::cmd_stability(&config, &file, use_patterns, cash, cli.json),
        Commands::Budget {
            file,
            budgets,
            month,
        } => commands::cmd_budget(&config, &file, &budgets, &month, cli.json),
        Commands::Suggest { file, category } => {
            commands::cmd_suggest(&config, &file, category.as_deref(), cli.json)
        }
        Commands::Simulate {
            projection,
            profile,
            allocation,
        } => commands::cmd_simulate(
            &config,
            &projection,
            profile.as_deref(),
            &allocation,
            cli.json,
        ),
        Commands::Compare { projection } => commands::cmd_compare(&config, &projection, cli.json),
        Commands::Required {
            current,
            goal,
            months,
            annual_return,
        } => commands::cmd_required(current, goal, months, annual_return, cli.json),
    }
}
