//! Statistical utilities shared by every analytics component
//!
//! - Descriptive statistics (mean, population standard deviation, median,
//!   coefficient of variation, interpolated percentiles)
//! - Calendar helpers (month keys, day/month arithmetic)
//! - Monthly aggregation of transaction collections
//! - Merchant name normalization and fuzzy matching
//!
//! Everything here is total: undefined statistics return `None` (or 0 for
//! empty input) instead of propagating NaN.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{Datelike, Days, Months, NaiveDate};
use regex::Regex;

use crate::error::{Error, Result};
use crate::models::{MonthlyAggregate, TransactionInput};

/// Arithmetic mean (0 for empty input)
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divides by n, not n - 1)
pub fn standard_deviation(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Calculate median of a slice
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// `stdDev / |mean|`, or `None` with fewer than two samples or a zero mean
pub fn coefficient_of_variation(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let avg = mean(values);
    if avg == 0.0 {
        return None;
    }
    Some(standard_deviation(values) / avg.abs())
}

/// Percentile `p` (0-100) with linear interpolation between ranks.
///
/// Input does not need to be sorted.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    percentile_sorted(&sorted, p)
}

/// Same as [`percentile`] for input already sorted ascending
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }

    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Round to a fixed number of decimal places
pub fn round_to(value: f64, digits: i32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10_f64.powi(digits);
    (value * factor).round() / factor
}

/// `YYYY-MM` key for the month containing `date`
pub fn month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Parse a `YYYY-MM` key into the first day of that month
pub fn parse_month_key(key: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", key.trim()), "%Y-%m-%d")
        .map_err(|_| Error::InvalidData(format!("Invalid month key '{}' (use YYYY-MM)", key)))
}

/// Signed number of days from `from` to `to`
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Shift by whole days; `None` when the result leaves chrono's date range
pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    let delta = Days::new(days.unsigned_abs());
    if days >= 0 {
        date.checked_add_days(delta)
    } else {
        date.checked_sub_days(delta)
    }
}

/// Add (or subtract) calendar months, clamping to the end of shorter months.
/// `None` when the result leaves chrono's date range.
pub fn add_months(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    if months >= 0 {
        date.checked_add_months(Months::new(months as u32))
    } else {
        date.checked_sub_months(Months::new(months.unsigned_abs()))
    }
}

/// Inclusive list of month keys from `first` to `last`
pub fn months_in_range(first: &str, last: &str) -> Result<Vec<String>> {
    let start = parse_month_key(first)?;
    let end = parse_month_key(last)?;

    let mut months = Vec::new();
    let mut current = start;
    while current <= end {
        months.push(month_key(current));
        match add_months(current, 1) {
            Some(next) => current = next,
            None => break,
        }
    }
    Ok(months)
}

/// Fold transactions into month-ordered income/expense totals.
///
/// Transfers are excluded; amounts are taken as magnitudes and routed by
/// transaction type.
pub fn get_sorted_monthly_aggregates(transactions: &[TransactionInput]) -> Vec<MonthlyAggregate> {
    let mut by_month: BTreeMap<String, MonthlyAggregate> = BTreeMap::new();

    for tx in transactions.iter().filter(|tx| !tx.is_transfer()) {
        let key = month_key(tx.date);
        let entry = by_month
            .entry(key.clone())
            .or_insert_with(|| MonthlyAggregate::new(key));
        if tx.is_income() {
            entry.income += tx.abs_amount();
        } else {
            entry.expenses += tx.abs_amount();
        }
    }

    by_month
        .into_values()
        .map(|mut agg| {
            agg.net = agg.income - agg.expenses;
            agg
        })
        .collect()
}

/// Per-category, per-month expense magnitudes (category -> month -> total)
pub fn expense_months_by_category(
    transactions: &[TransactionInput],
) -> BTreeMap<String, BTreeMap<String, f64>> {
    let mut by_category: BTreeMap<String, BTreeMap<String, f64>> = BTreeMap::new();
    for tx in transactions.iter().filter(|tx| tx.is_expense()) {
        *by_category
            .entry(tx.category.clone())
            .or_default()
            .entry(month_key(tx.date))
            .or_insert(0.0) += tx.abs_amount();
    }
    by_category
}

fn punctuation_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[^\p{L}\p{N}\s]+").expect("valid punctuation regex"))
}

/// Normalize a merchant description for comparison.
///
/// Lowercases, replaces punctuation with spaces, drops purely numeric tokens
/// of three or more digits (store and reference numbers) and collapses
/// whitespace.
pub fn normalize_text(text: &str) -> String {
    let lower = text.to_lowercase();
    let stripped = punctuation_pattern().replace_all(&lower, " ");

    stripped
        .split_whitespace()
        .filter(|token| !(token.len() >= 3 && token.chars().all(|c| c.is_ascii_digit())))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Whether two merchant descriptions likely refer to the same merchant.
///
/// Matches on normalized equality, whole-word containment of the shorter
/// name in the longer one, or normalized Levenshtein similarity at or above
/// `threshold`.
pub fn is_similar_merchant(a: &str, b: &str, threshold: f64) -> bool {
    let a = normalize_text(a);
    let b = normalize_text(b);

    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a == b {
        return true;
    }

    let (shorter, longer) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    if shorter.chars().count() >= 3 && format!(" {} ", longer).contains(&format!(" {} ", shorter))
    {
        return true;
    }

    strsim::normalized_levenshtein(&a, &b) >= threshold
}

/// Error function, Abramowitz and Stegun 7.1.26 (max error ~1.5e-7)
pub fn erf(x: f64) -> f64 {
    let a1 = 0.254829592;
    let a2 = -0.284496736;
    let a3 = 1.421413741;
    let a4 = -1.453152027;
    let a5 = 1.061405429;
    let p = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + p * x);
    let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

    sign * y
}

/// Standard normal cumulative distribution function
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}
