//! Test utilities for building transaction fixtures
//!
//! Enabled for unit tests and, through the `test-utils` feature, for
//! integration tests and downstream crates.
//!
//! ```rust,ignore
//! use plumb_core::test_utils::{expense, monthly_expenses};
//!
//! let rent = monthly_expenses("Landlord", "Housing", 1200.0, "2024-01-01", 12);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;

use crate::models::{TransactionInput, TransactionType};
use crate::stats::add_months;

static COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_id() -> String {
    format!("tx_{}", COUNTER.fetch_add(1, Ordering::SeqCst))
}

/// Parse a `YYYY-MM-DD` literal, panicking on malformed test input
pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap_or_else(|_| panic!("bad test date: {}", s))
}

/// Build a transaction with an auto-generated id
pub fn transaction(
    date_str: &str,
    description: &str,
    category: &str,
    amount: f64,
    transaction_type: TransactionType,
) -> TransactionInput {
    TransactionInput {
        id: next_id(),
        date: date(date_str),
        description: description.to_string(),
        category: category.to_string(),
        amount,
        transaction_type,
        account: None,
        note: None,
    }
}

pub fn expense(date_str: &str, description: &str, category: &str, amount: f64) -> TransactionInput {
    transaction(date_str, description, category, amount, TransactionType::Expense)
}

pub fn income(date_str: &str, description: &str, category: &str, amount: f64) -> TransactionInput {
    transaction(date_str, description, category, amount, TransactionType::Income)
}

pub fn transfer(date_str: &str, description: &str, amount: f64) -> TransactionInput {
    transaction(
        date_str,
        description,
        "Transfer",
        amount,
        TransactionType::Transfer,
    )
}

/// `count` identical monthly expenses starting at `start`, same day each month
pub fn monthly_expenses(
    description: &str,
    category: &str,
    amount: f64,
    start: &str,
    count: usize,
) -> Vec<TransactionInput> {
    let start = date(start);
    (0..count)
        .map(|i| {
            let when = add_months(start, i as i32).expect("fixture date in range");
            expense(
                &when.format("%Y-%m-%d").to_string(),
                description,
                category,
                -amount,
            )
        })
        .collect()
}

/// One expense per month with the given amounts, starting at `start`
pub fn expense_series(
    description: &str,
    category: &str,
    start: &str,
    amounts: &[f64],
) -> Vec<TransactionInput> {
    let start = date(start);
    amounts
        .iter()
        .enumerate()
        .map(|(i, amount)| {
            let when = add_months(start, i as i32).expect("fixture date in range");
            expense(
                &when.format("%Y-%m-%d").to_string(),
                description,
                category,
                -amount,
            )
        })
        .collect()
}

/// One income per month with the given amounts, starting at `start`
pub fn income_series(description: &str, start: &str, amounts: &[f64]) -> Vec<TransactionInput> {
    let start = date(start);
    amounts
        .iter()
        .enumerate()
        .map(|(i, amount)| {
            let when = add_months(start, i as i32).expect("fixture date in range");
            income(
                &when.format("%Y-%m-%d").to_string(),
                description,
                "Salary",
                *amount,
            )
        })
        .collect()
}
