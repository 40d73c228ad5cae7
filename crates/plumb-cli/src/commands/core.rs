//! Shared command utilities
//!
//! This module contains:
//! - `load_transactions` - Read a JSON array of transactions
//! - `load_budgets` - Read a JSON object of category budgets
//! - `print_json` - Pretty-print any result as JSON
//! - `make_rng` - Seeded or entropy-backed random source

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use plumb_core::TransactionInput;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::debug;

pub fn load_transactions(path: &Path) -> Result<Vec<TransactionInput>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read transactions from {}", path.display()))?;
    let transactions: Vec<TransactionInput> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid transactions JSON in {}", path.display()))?;
    debug!("Loaded {} transactions", transactions.len());
    Ok(transactions)
}

pub fn load_budgets(path: &Path) -> Result<BTreeMap<String, f64>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read budgets from {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Invalid budgets JSON in {} (expected {{\"Category\": amount}})", path.display()))
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").context("Invalid date format (use YYYY-MM-DD)")
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

pub fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}
