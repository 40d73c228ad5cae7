//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Plumb - Personal finance analytics
#[derive(Parser)]
#[command(name = "plumb")]
#[command(about = "Forecasts, recurring charges, stability and projections from your transactions", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Analytics config file (defaults to ~/.config/plumb/analytics.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Detect recurring payments (subscriptions, bills)
    Recurring {
        /// JSON file with an array of transactions
        #[arg(short, long)]
        file: PathBuf,

        /// Also look for recurring income
        #[arg(long)]
        include_income: bool,

        /// Also report duplicate charges
        #[arg(long)]
        duplicates: bool,

        /// List charges due after this date (YYYY-MM-DD)
        #[arg(long)]
        upcoming: Option<String>,

        /// Days ahead to look for upcoming charges (0 to 3660)
        #[arg(long, default_value = "30")]
        horizon: i64,
    },

    /// Forecast expenses by category
    Forecast {
        /// JSON file with an array of transactions
        #[arg(short, long)]
        file: PathBuf,

        /// Single category to forecast (all categories if omitted)
        #[arg(short, long)]
        category: Option<String>,

        /// Months to project
        #[arg(short, long, default_value = "1")]
        periods: usize,

        /// Your own estimate for next month, blended into the forecast
        #[arg(long, requires = "category")]
        override_value: Option<f64>,
    },

    /// Score cash flow stability
    Stability {
        /// JSON file with an array of transactions
        #[arg(short, long)]
        file: PathBuf,

        /// Use detected recurring charges instead of the built-in estimate
        #[arg(long)]
        use_patterns: bool,

        /// Cash on hand, to estimate runway when spending exceeds income
        #[arg(long)]
        cash: Option<f64>,
    },

    /// Compare a month's spending to budgets
    Budget {
        /// JSON file with an array of transactions
        #[arg(short, long)]
        file: PathBuf,

        /// JSON object mapping category to monthly budget
        #[arg(short, long)]
        budgets: PathBuf,

        /// Month to report (YYYY-MM)
        #[arg(short, long)]
        month: String,
    },

    /// Suggest budgets from spending history
    Suggest {
        /// JSON file with an array of transactions
        #[arg(short, long)]
        file: PathBuf,

        /// Single category (all expense categories if omitted)
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Run a Monte Carlo investment projection
    Simulate {
        #[command(flatten)]
        projection: ProjectionArgs,

        /// Risk profile: conservative, moderate, aggressive
        #[arg(long, conflicts_with = "allocation")]
        profile: Option<String>,

        /// Allocation weights, e.g. large_cap=60,bonds=40
        #[arg(long, value_delimiter = ',')]
        allocation: Vec<String>,
    },

    /// Compare conservative, moderate and aggressive projections
    Compare {
        #[command(flatten)]
        projection: ProjectionArgs,
    },

    /// Monthly contribution needed to reach a goal
    Required {
        /// Current portfolio value
        #[arg(long)]
        current: f64,

        /// Target value
        #[arg(long)]
        goal: f64,

        /// Months until the goal
        #[arg(long)]
        months: u32,

        /// Expected annual return (0.07 = 7%)
        #[arg(long, default_value = "0.07")]
        annual_return: f64,
    },
}

/// Inputs shared by the projection commands
#[derive(clap::Args, Debug, Clone)]
pub struct ProjectionArgs {
    /// Starting portfolio value
    #[arg(long, default_value = "0")]
    pub initial: f64,

    /// Contribution added at the start of each month
    #[arg(long, default_value = "0")]
    pub contribution: f64,

    /// Horizon in months
    #[arg(long)]
    pub months: u32,

    /// Target value for the success probability
    #[arg(long)]
    pub goal: Option<f64>,

    /// Number of simulated paths
    #[arg(long)]
    pub simulations: Option<usize>,

    /// Seed for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,
}
