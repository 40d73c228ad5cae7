//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Shared utilities (loading transaction and budget files, JSON output)
//! - `recurring` - Recurring payment detection, duplicates, upcoming charges
//! - `forecast` - Expense forecasts
//! - `stability` - Cash flow stability, volatility source, runway
//! - `budget` - Budget variance reports and suggestions
//! - `simulate` - Monte Carlo projections and required contributions

pub mod budget;
pub mod core;
pub mod forecast;
pub mod recurring;
pub mod simulate;
pub mod stability;

// Re-export command functions for main.rs
pub use budget::*;
pub use core::*;
pub use forecast::*;
pub use recurring::*;
pub use simulate::*;
pub use stability::*;

/// Truncate a string to a maximum length, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
