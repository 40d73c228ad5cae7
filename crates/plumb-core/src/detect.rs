//! Recurring payment detection
//!
//! Detects:
//! - Recurring patterns: merchant/category series with a regular cadence
//! - Duplicate charges: same merchant, amount and day seen more than once
//! - Price changes: recurring charges whose latest amount went up
//!
//! The merchant merge in [`RecurringDetector::detect`] is a greedy single
//! pass over sorted group keys. It is deterministic but not a global
//! clustering: it can under- or over-merge similar names.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::models::TransactionInput;
use crate::stats::{
    add_days, days_between, is_similar_merchant, mean, median, normalize_text, round_to,
    standard_deviation,
};

/// Billing cadence of a recurring pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    Weekly,
    #[serde(rename = "Bi-weekly")]
    BiWeekly,
    Monthly,
    Quarterly,
    Annual,
    Unknown,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Weekly => "Weekly",
            Self::BiWeekly => "Bi-weekly",
            Self::Monthly => "Monthly",
            Self::Quarterly => "Quarterly",
            Self::Annual => "Annual",
            Self::Unknown => "Unknown",
        }
    }

    /// Multiplier converting one charge into a monthly-equivalent amount
    pub fn monthly_factor(&self) -> f64 {
        match self {
            Self::Weekly => 4.33,
            Self::BiWeekly => 2.17,
            Self::Monthly => 1.0,
            Self::Quarterly => 1.0 / 3.0,
            Self::Annual => 1.0 / 12.0,
            Self::Unknown => 0.0,
        }
    }
}

impl std::fmt::Display for Period {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Accepted range of median day-gaps for one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodWindow {
    pub period: Period,
    pub expected_days: f64,
    pub min_days: f64,
    pub max_days: f64,
}

impl PeriodWindow {
    pub fn new(period: Period, expected_days: f64, min_days: f64, max_days: f64) -> Self {
        Self {
            period,
            expected_days,
            min_days,
            max_days,
        }
    }

    pub fn contains(&self, gap_days: f64) -> bool {
        gap_days >= self.min_days && gap_days <= self.max_days
    }
}

/// Default cadence windows.
///
/// Tolerances are asymmetric: billing slips late more often than early.
/// The monthly window covers the literal 28-31 day calendar spread.
pub fn default_period_windows() -> Vec<PeriodWindow> {
    vec![
        PeriodWindow::new(Period::Weekly, 7.0, 6.0, 9.0),
        PeriodWindow::new(Period::BiWeekly, 14.0, 12.0, 17.0),
        PeriodWindow::new(Period::Monthly, 30.0, 26.0, 35.0),
        PeriodWindow::new(Period::Quarterly, 91.0, 80.0, 100.0),
        PeriodWindow::new(Period::Annual, 365.0, 340.0, 390.0),
    ]
}

/// Detection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecurringConfig {
    /// Percentage deviation from the group mean an amount may have
    /// before it is considered for outlier removal
    pub amount_tolerance_percent: f64,
    /// Standard deviations from the group mean before an amount is
    /// considered for outlier removal
    pub outlier_std_devs: f64,
    /// Minimum occurrences for a `Confirmed` pattern
    pub min_occurrences_confirmed: usize,
    /// Minimum occurrences for an `Unconfirmed` pattern
    pub min_occurrences_unconfirmed: usize,
    /// Fraction of gaps that must fall inside the period window
    pub min_consistency: f64,
    /// Normalized Levenshtein similarity for merging merchant names
    pub merchant_similarity_threshold: f64,
    /// Also look for recurring income (paychecks); expenses only by default
    pub include_income: bool,
    /// Price increase threshold (percentage)
    pub price_increase_percent: f64,
    /// Price increase threshold (absolute dollars)
    pub price_increase_absolute: f64,
    /// Cadence windows, checked in order
    pub windows: Vec<PeriodWindow>,
}

impl Default for RecurringConfig {
    fn default() -> Self {
        Self {
            amount_tolerance_percent: 15.0,
            outlier_std_devs: 2.0,
            min_occurrences_confirmed: 4,
            min_occurrences_unconfirmed: 2,
            min_consistency: 0.7,
            merchant_similarity_threshold: 0.8,
            include_income: false,
            price_increase_percent: 5.0,
            price_increase_absolute: 1.0,
            windows: default_period_windows(),
        }
    }
}

impl RecurringConfig {
    pub fn validate(&self) -> Result<()> {
        if self.amount_tolerance_percent < 0.0 || self.outlier_std_devs < 0.0 {
            return Err(Error::InvalidConfig(
                "recurring outlier tolerances must be non-negative".to_string(),
            ));
        }
        if self.min_occurrences_unconfirmed < 2 {
            return Err(Error::InvalidConfig(
                "recurring.min_occurrences_unconfirmed must be at least 2".to_string(),
            ));
        }
        if self.min_occurrences_confirmed < self.min_occurrences_unconfirmed {
            return Err(Error::InvalidConfig(
                "recurring.min_occurrences_confirmed must be >= min_occurrences_unconfirmed"
                    .to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_consistency) {
            return Err(Error::InvalidConfig(
                "recurring.min_consistency must be between 0 and 1".to_string(),
            ));
        }
        if !(self.merchant_similarity_threshold > 0.0 && self.merchant_similarity_threshold <= 1.0)
        {
            return Err(Error::InvalidConfig(
                "recurring.merchant_similarity_threshold must be in (0, 1]".to_string(),
            ));
        }
        if self.windows.is_empty() {
            return Err(Error::InvalidConfig(
                "recurring.windows must not be empty".to_string(),
            ));
        }
        for window in &self.windows {
            if window.period == Period::Unknown {
                return Err(Error::InvalidConfig(
                    "recurring.windows cannot include the Unknown period".to_string(),
                ));
            }
            if !(window.min_days <= window.expected_days && window.expected_days <= window.max_days)
            {
                return Err(Error::InvalidConfig(format!(
                    "recurring window for {} must satisfy min <= expected <= max",
                    window.period
                )));
            }
        }
        Ok(())
    }
}

/// Whether a pattern met the confirmed or only the unconfirmed threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatternStatus {
    Confirmed,
    Unconfirmed,
}

impl PatternStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "Confirmed",
            Self::Unconfirmed => "Unconfirmed",
        }
    }
}

impl std::fmt::Display for PatternStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A detected recurring series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecurringPattern {
    /// Description of the most recent occurrence
    pub merchant: String,
    pub category: String,
    pub average_amount: f64,
    pub period: Period,
    /// 0-100
    pub confidence: f64,
    pub status: PatternStatus,
    pub last_occurrence: NaiveDate,
    pub next_occurrence: NaiveDate,
    pub occurrences: usize,
    pub median_interval_days: f64,
    /// Fraction of gaps inside the period window
    pub consistency: f64,
    pub monthly_equivalent: f64,
    /// Member transactions, oldest first
    pub transactions: Vec<TransactionInput>,
}

/// A transaction that repeats an earlier one exactly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateTransaction {
    pub transaction_id: String,
    /// Id of the first transaction seen with the same key
    pub duplicate_of: String,
    pub merchant: String,
    pub amount: f64,
    pub date: NaiveDate,
}

/// A recurring charge expected within a look-ahead window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingCharge {
    pub merchant: String,
    pub category: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub period: Period,
    pub status: PatternStatus,
}

/// A recurring charge whose latest amount rose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceChange {
    pub merchant: String,
    pub category: String,
    pub previous_amount: f64,
    pub current_amount: f64,
    pub change_amount: f64,
    pub change_percent: f64,
    pub changed_on: NaiveDate,
}

/// Candidate series keyed by normalized merchant and category
struct MerchantGroup<'a> {
    merchant: String,
    category: String,
    members: Vec<&'a TransactionInput>,
}

/// Runs the recurring-pattern algorithms over a transaction collection
#[derive(Debug, Clone, Default)]
pub struct RecurringDetector {
    config: RecurringConfig,
}

impl RecurringDetector {
    pub fn new() -> Self {
        Self {
            config: RecurringConfig::default(),
        }
    }

    pub fn with_config(config: RecurringConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RecurringConfig {
        &self.config
    }

    /// Detect recurring patterns, highest confidence first
    pub fn detect(&self, transactions: &[TransactionInput]) -> Vec<RecurringPattern> {
        let groups = self.group_transactions(transactions);
        debug!(
            "Recurring detection: {} transactions in {} merchant groups",
            transactions.len(),
            groups.len()
        );

        let mut patterns: Vec<RecurringPattern> = groups
            .into_iter()
            .filter_map(|group| self.analyze_group(group))
            .collect();

        patterns.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.merchant.cmp(&b.merchant))
        });

        debug!("Recurring detection found {} patterns", patterns.len());
        patterns
    }

    /// Group by (normalized merchant, category), then fold fuzzy-matching
    /// merchants within a category into the first group seen
    fn group_transactions<'a>(&self, transactions: &'a [TransactionInput]) -> Vec<MerchantGroup<'a>> {
        let mut by_key: BTreeMap<(String, String), Vec<&'a TransactionInput>> = BTreeMap::new();
        for tx in transactions {
            if tx.is_transfer() || (tx.is_income() && !self.config.include_income) {
                continue;
            }
            let merchant = normalize_text(&tx.description);
            if merchant.is_empty() {
                continue;
            }
            by_key
                .entry((merchant, tx.category.clone()))
                .or_default()
                .push(tx);
        }

        let mut candidates: Vec<Option<MerchantGroup<'a>>> = by_key
            .into_iter()
            .map(|((merchant, category), members)| {
                Some(MerchantGroup {
                    merchant,
                    category,
                    members,
                })
            })
            .collect();

        let mut groups = Vec::new();
        for i in 0..candidates.len() {
            let Some(mut group) = candidates[i].take() else {
                continue; // Already absorbed
            };

            for candidate in candidates.iter_mut().skip(i + 1) {
                let absorb = candidate.as_ref().is_some_and(|other| {
                    other.category == group.category
                        && is_similar_merchant(
                            &group.merchant,
                            &other.merchant,
                            self.config.merchant_similarity_threshold,
                        )
                });
                if absorb {
                    if let Some(other) = candidate.take() {
                        trace!("Merging '{}' into '{}'", other.merchant, group.merchant);
                        group.members.extend(other.members);
                    }
                }
            }

            groups.push(group);
        }

        groups
    }

    /// Drop amounts that fail both the standard-deviation and the
    /// percentage tolerance test
    fn filter_outliers<'a>(&self, members: Vec<&'a TransactionInput>) -> Vec<&'a TransactionInput> {
        if members.len() < 3 {
            return members;
        }

        let amounts: Vec<f64> = members.iter().map(|t| t.abs_amount()).collect();
        let avg = mean(&amounts);
        if avg <= 0.0 {
            return members;
        }
        let std_dev = standard_deviation(&amounts);

        members
            .into_iter()
            .filter(|tx| {
                let deviation = (tx.abs_amount() - avg).abs();
                let within_std = deviation <= self.config.outlier_std_devs * std_dev;
                let within_percent = deviation / avg * 100.0 <= self.config.amount_tolerance_percent;
                within_std || within_percent
            })
            .collect()
    }

    fn classify_period(&self, median_gap: f64) -> Option<&PeriodWindow> {
        self.config.windows.iter().find(|w| w.contains(median_gap))
    }

    fn analyze_group(&self, group: MerchantGroup<'_>) -> Option<RecurringPattern> {
        let min_occurrences = self.config.min_occurrences_unconfirmed;
        if group.members.len() < min_occurrences {
            return None;
        }

        let mut survivors = self.filter_outliers(group.members);
        if survivors.len() < min_occurrences {
            trace!("Dropping '{}': too few occurrences after outliers", group.merchant);
            return None;
        }
        survivors.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

        let gaps: Vec<f64> = survivors
            .windows(2)
            .map(|w| days_between(w[0].date, w[1].date) as f64)
            .collect();
        let median_gap = median(&gaps);

        let Some(window) = self.classify_period(median_gap) else {
            trace!(
                "Dropping '{}': median gap {:.1} days matches no period",
                group.merchant,
                median_gap
            );
            return None;
        };

        let consistent = gaps.iter().filter(|&&gap| window.contains(gap)).count();
        let consistency = consistent as f64 / gaps.len() as f64;

        let amounts: Vec<f64> = survivors.iter().map(|t| t.abs_amount()).collect();
        let average_amount = mean(&amounts);
        let amount_variation = if average_amount > 0.0 {
            standard_deviation(&amounts) / average_amount
        } else {
            0.0
        };
        let confidence = consistency * (1.0 - amount_variation.min(1.0)) * 100.0;

        let occurrences = survivors.len();
        let consistency_met = consistency >= self.config.min_consistency;
        let status = if consistency_met && occurrences >= self.config.min_occurrences_confirmed {
            PatternStatus::Confirmed
        } else if consistency_met && occurrences >= min_occurrences {
            PatternStatus::Unconfirmed
        } else {
            trace!(
                "Dropping '{}': consistency {:.2} below {:.2}",
                group.merchant,
                consistency,
                self.config.min_consistency
            );
            return None;
        };

        let latest = survivors.last()?;
        let last_occurrence = latest.date;
        let Some(next_occurrence) = add_days(last_occurrence, median_gap.round() as i64) else {
            trace!("Dropping '{}': next occurrence out of date range", group.merchant);
            return None;
        };

        Some(RecurringPattern {
            merchant: latest.description.trim().to_string(),
            category: group.category,
            average_amount: round_to(average_amount, 2),
            period: window.period,
            confidence: round_to(confidence, 1),
            status,
            last_occurrence,
            next_occurrence,
            occurrences,
            median_interval_days: round_to(median_gap, 1),
            consistency: round_to(consistency, 3),
            monthly_equivalent: round_to(average_amount * window.period.monthly_factor(), 2),
            transactions: survivors.into_iter().cloned().collect(),
        })
    }

    /// Report every transaction that repeats the (merchant, amount, day)
    /// of one seen earlier in input order.
    ///
    /// Transfers are skipped: both legs of an internal move legitimately
    /// share description, amount and date.
    pub fn detect_duplicates(&self, transactions: &[TransactionInput]) -> Vec<DuplicateTransaction> {
        let mut first_seen: HashMap<(String, i64, NaiveDate), &TransactionInput> = HashMap::new();
        let mut duplicates = Vec::new();

        for tx in transactions.iter().filter(|tx| !tx.is_transfer()) {
            let merchant = normalize_text(&tx.description);
            let cents = (tx.abs_amount() * 100.0).round() as i64;
            let key = (merchant.clone(), cents, tx.date);

            match first_seen.get(&key) {
                Some(original) => duplicates.push(DuplicateTransaction {
                    transaction_id: tx.id.clone(),
                    duplicate_of: original.id.clone(),
                    merchant,
                    amount: round_to(tx.abs_amount(), 2),
                    date: tx.date,
                }),
                None => {
                    first_seen.insert(key, tx);
                }
            }
        }

        debug!("Duplicate detection found {} duplicates", duplicates.len());
        duplicates
    }

    /// Flag patterns whose latest charge rose over the previous one
    pub fn detect_price_changes(&self, patterns: &[RecurringPattern]) -> Vec<PriceChange> {
        let mut changes = Vec::new();

        for pattern in patterns {
            let [.., previous, current] = pattern.transactions.as_slice() else {
                continue;
            };

            let previous_amount = previous.abs_amount();
            let current_amount = current.abs_amount();
            if previous_amount <= 0.0 {
                continue;
            }

            let increase = current_amount - previous_amount;
            let increase_percent = increase / previous_amount * 100.0;

            if increase > 0.0
                && (increase > self.config.price_increase_absolute
                    || increase_percent > self.config.price_increase_percent)
            {
                changes.push(PriceChange {
                    merchant: pattern.merchant.clone(),
                    category: pattern.category.clone(),
                    previous_amount: round_to(previous_amount, 2),
                    current_amount: round_to(current_amount, 2),
                    change_amount: round_to(increase, 2),
                    change_percent: round_to(increase_percent, 1),
                    changed_on: current.date,
                });
            }
        }

        changes
    }
}

/// Monthly-equivalent sum of all confirmed patterns
pub fn calculate_recurring_total(patterns: &[RecurringPattern]) -> f64 {
    let total: f64 = patterns
        .iter()
        .filter(|p| p.status == PatternStatus::Confirmed)
        .map(|p| p.average_amount * p.period.monthly_factor())
        .sum();
    round_to(total, 2)
}

/// Longest look-ahead accepted by [`upcoming_charges`]
pub const MAX_HORIZON_DAYS: i64 = 3_660;

/// Charges expected after `today` and within `horizon_days` of it
pub fn upcoming_charges(
    patterns: &[RecurringPattern],
    today: NaiveDate,
    horizon_days: i64,
) -> Result<Vec<UpcomingCharge>> {
    if !(0..=MAX_HORIZON_DAYS).contains(&horizon_days) {
        return Err(Error::InvalidConfig(format!(
            "upcoming horizon must be between 0 and {} days, got {}",
            MAX_HORIZON_DAYS, horizon_days
        )));
    }
    let window_end = add_days(today, horizon_days).ok_or_else(|| {
        Error::InvalidData(format!("{} plus {} days is out of range", today, horizon_days))
    })?;

    let mut charges: Vec<UpcomingCharge> = patterns
        .iter()
        .filter_map(|pattern| {
            let interval = (pattern.median_interval_days.round() as i64).max(1);

            // Skip whole intervals until the charge is after today
            let mut due = pattern.next_occurrence;
            if due <= today {
                let steps = days_between(due, today) / interval + 1;
                due = add_days(due, steps.checked_mul(interval)?)?;
            }

            (due <= window_end).then(|| UpcomingCharge {
                merchant: pattern.merchant.clone(),
                category: pattern.category.clone(),
                amount: pattern.average_amount,
                due_date: due,
                period: pattern.period,
                status: pattern.status,
            })
        })
        .collect();

    charges.sort_by(|a, b| {
        a.due_date
            .cmp(&b.due_date)
            .then_with(|| a.merchant.cmp(&b.merchant))
    });
    Ok(charges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{date, expense, income, monthly_expenses};

    fn weekly(description: &str, amount: f64, start: &str, count: usize) -> Vec<TransactionInput> {
        let start = date(start);
        (0..count)
            .map(|i| {
                let when = add_days(start, 7 * i as i64).unwrap();
                expense(
                    &when.format("%Y-%m-%d").to_string(),
                    description,
                    "Food",
                    -amount,
                )
            })
            .collect()
    }

    #[test]
    fn test_six_monthly_charges_are_confirmed() {
        let txs = monthly_expenses("NETFLIX.COM", "Entertainment", 15.49, "2024-01-15", 6);

        let patterns = RecurringDetector::new().detect(&txs);

        assert_eq!(patterns.len(), 1);
        let netflix = &patterns[0];
        assert_eq!(netflix.period, Period::Monthly);
        assert_eq!(netflix.status, PatternStatus::Confirmed);
        assert_eq!(netflix.occurrences, 6);
        assert_eq!(netflix.average_amount, 15.49);
        assert_eq!(netflix.confidence, 100.0);
        assert_eq!(netflix.last_occurrence, date("2024-06-15"));
        // Median gap is 31 days (Feb 2024 is 29)
        assert_eq!(netflix.next_occurrence, date("2024-07-16"));
    }

    #[test]
    fn test_two_monthly_charges_are_unconfirmed() {
        let txs = monthly_expenses("Gym Membership", "Health", 40.0, "2024-03-01", 2);

        let patterns = RecurringDetector::new().detect(&txs);

        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].status, PatternStatus::Unconfirmed);
        assert_eq!(patterns[0].period, Period::Monthly);
    }

    #[test]
    fn test_irregular_grocery_trips_emit_nothing() {
        let txs = vec![
            expense("2024-01-03", "FRESH MARKET", "Groceries", -45.12),
            expense("2024-01-05", "FRESH MARKET", "Groceries", -112.40),
            expense("2024-01-19", "FRESH MARKET", "Groceries", -23.99),
            expense("2024-01-20", "FRESH MARKET", "Groceries", -87.00),
            expense("2024-02-11", "FRESH MARKET", "Groceries", -64.30),
            expense("2024-02-14", "FRESH MARKET", "Groceries", -19.75),
            expense("2024-03-02", "FRESH MARKET", "Groceries", -130.10),
        ];

        assert!(RecurringDetector::new().detect(&txs).is_empty());
    }

    #[test]
    fn test_single_transaction_is_never_a_pattern() {
        let txs = vec![expense("2024-01-03", "AWS", "Cloud", -150.0)];
        assert!(RecurringDetector::new().detect(&txs).is_empty());
    }

    #[test]
    fn test_fuzzy_merchant_names_merge_within_category() {
        let txs = vec![
            expense("2024-01-10", "Shell Gas", "Auto", -60.0),
            expense("2024-02-10", "SHELL GAS STATION #1234", "Auto", -60.0),
            expense("2024-03-10", "Shell Gas", "Auto", -60.0),
            expense("2024-04-10", "Shell Gas Station", "Auto", -60.0),
        ];

        let patterns = RecurringDetector::new().detect(&txs);

        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].occurrences, 4);
        assert_eq!(patterns[0].status, PatternStatus::Confirmed);
    }

    #[test]
    fn test_same_merchant_different_category_not_merged() {
        let mut txs = monthly_expenses("Amazon", "Shopping", 35.0, "2024-01-05", 2);
        txs.extend(monthly_expenses("Amazon", "Video", 8.99, "2024-01-20", 2));

        let patterns = RecurringDetector::new().detect(&txs);

        assert_eq!(patterns.len(), 2);
        assert!(patterns.iter().all(|p| p.occurrences == 2));
    }

    #[test]
    fn test_outlier_amount_is_removed() {
        let mut txs = monthly_expenses("City Water", "Utilities", 50.0, "2024-01-20", 5);
        txs.push(expense("2024-03-02", "City Water", "Utilities", -500.0));

        let patterns = RecurringDetector::new().detect(&txs);

        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].occurrences, 5);
        assert_eq!(patterns[0].average_amount, 50.0);
    }

    #[test]
    fn test_income_is_excluded_by_default() {
        let txs: Vec<TransactionInput> = (0..6)
            .map(|i| {
                income(
                    &format!("2024-0{}-01", i + 1),
                    "ACME PAYROLL",
                    "Salary",
                    3000.0,
                )
            })
            .collect();

        assert!(RecurringDetector::new().detect(&txs).is_empty());

        let config = RecurringConfig {
            include_income: true,
            ..Default::default()
        };
        let detector = RecurringDetector::with_config(config).unwrap();
        assert_eq!(detector.detect(&txs).len(), 1);
    }

    #[test]
    fn test_weekly_and_annual_periods() {
        let mut txs = weekly("MEAL KIT CO", 60.0, "2024-01-01", 8);
        txs.push(expense("2022-03-01", "DOMAIN REGISTRAR", "Software", -12.0));
        txs.push(expense("2023-03-01", "DOMAIN REGISTRAR", "Software", -12.0));
        txs.push(expense("2024-03-01", "DOMAIN REGISTRAR", "Software", -12.0));

        let patterns = RecurringDetector::new().detect(&txs);

        let meal_kit = patterns.iter().find(|p| p.merchant == "MEAL KIT CO").unwrap();
        assert_eq!(meal_kit.period, Period::Weekly);
        assert_eq!(meal_kit.status, PatternStatus::Confirmed);

        let domain = patterns
            .iter()
            .find(|p| p.merchant == "DOMAIN REGISTRAR")
            .unwrap();
        assert_eq!(domain.period, Period::Annual);
        assert_eq!(domain.status, PatternStatus::Unconfirmed);
    }

    #[test]
    fn test_bi_weekly_and_quarterly_periods() {
        let start = date("2024-01-05");
        let mut txs: Vec<TransactionInput> = (0..6)
            .map(|i| {
                let when = add_days(start, 14 * i).unwrap();
                expense(&when.format("%Y-%m-%d").to_string(), "DOG WALKER", "Pets", -25.0)
            })
            .collect();
        // Gaps of 90, 91, 92 and 92 days
        for day in ["2023-01-10", "2023-04-10", "2023-07-10", "2023-10-10", "2024-01-10"] {
            txs.push(expense(day, "HOME INSURANCE", "Insurance", -90.0));
        }

        let patterns = RecurringDetector::new().detect(&txs);

        let walker = patterns.iter().find(|p| p.merchant == "DOG WALKER").unwrap();
        assert_eq!(walker.period, Period::BiWeekly);
        assert_eq!(walker.status, PatternStatus::Confirmed);
        assert_eq!(walker.median_interval_days, 14.0);
        assert_eq!(walker.monthly_equivalent, 54.25);

        let insurance = patterns
            .iter()
            .find(|p| p.merchant == "HOME INSURANCE")
            .unwrap();
        assert_eq!(insurance.period, Period::Quarterly);
        assert_eq!(insurance.status, PatternStatus::Confirmed);
        assert_eq!(insurance.occurrences, 5);
        assert_eq!(insurance.monthly_equivalent, 30.0);
    }

    #[test]
    fn test_results_sorted_by_confidence() {
        let mut txs = monthly_expenses("Spotify", "Music", 10.99, "2024-01-20", 4);
        txs.extend(vec![
            expense("2024-01-05", "Electric Co", "Utilities", -85.0),
            expense("2024-02-05", "Electric Co", "Utilities", -120.5),
            expense("2024-03-05", "Electric Co", "Utilities", -95.25),
            expense("2024-04-05", "Electric Co", "Utilities", -101.0),
        ]);

        let patterns = RecurringDetector::new().detect(&txs);

        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].merchant, "Spotify");
        assert!(patterns[0].confidence > patterns[1].confidence);
        assert!(patterns[1].confidence > 0.0);
    }

    #[test]
    fn test_detect_duplicates_reports_against_first_seen() {
        let first = expense("2024-05-02", "Coffee House", "Dining", -4.50);
        let second = expense("2024-05-02", "COFFEE HOUSE", "Dining", -4.50);
        let third = expense("2024-05-02", "Coffee House!", "Dining", 4.50);
        let other_day = expense("2024-05-03", "Coffee House", "Dining", -4.50);
        let txs = vec![first.clone(), second.clone(), third.clone(), other_day];

        let duplicates = RecurringDetector::new().detect_duplicates(&txs);

        assert_eq!(duplicates.len(), 2);
        assert_eq!(duplicates[0].transaction_id, second.id);
        assert_eq!(duplicates[0].duplicate_of, first.id);
        assert_eq!(duplicates[1].transaction_id, third.id);
        assert_eq!(duplicates[1].duplicate_of, first.id);
    }

    #[test]
    fn test_calculate_recurring_total_uses_confirmed_only() {
        let mut txs = monthly_expenses("Netflix", "Entertainment", 15.0, "2024-01-15", 4);
        txs.extend(weekly("Meal Kit", 10.0, "2024-01-01", 4));
        txs.extend(monthly_expenses("Gym", "Health", 40.0, "2024-01-01", 2));

        let patterns = RecurringDetector::new().detect(&txs);
        assert_eq!(patterns.len(), 3);

        // 15 * 1 + 10 * 4.33; the unconfirmed gym is ignored
        assert_eq!(calculate_recurring_total(&patterns), 58.3);
    }

    #[test]
    fn test_upcoming_charges_advance_past_today() {
        let txs = monthly_expenses("Netflix", "Entertainment", 15.49, "2024-01-15", 6);
        let patterns = RecurringDetector::new().detect(&txs);

        let today = date("2024-08-01");
        let upcoming = upcoming_charges(&patterns, today, 30).unwrap();

        // Next is Jul 16, which is past; advanced by 31 days to Aug 16
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].due_date, date("2024-08-16"));

        assert!(upcoming_charges(&patterns, today, 10).unwrap().is_empty());
    }

    #[test]
    fn test_upcoming_charges_skip_many_missed_intervals() {
        let txs = monthly_expenses("Netflix", "Entertainment", 15.49, "2024-01-15", 6);
        let patterns = RecurringDetector::new().detect(&txs);

        // Jul 16 plus 31-day steps: the first one after 2034-01-01
        let today = date("2034-01-01");
        let upcoming = upcoming_charges(&patterns, today, 31).unwrap();
        assert_eq!(upcoming.len(), 1);
        assert!(upcoming[0].due_date > today);
        assert_eq!(days_between(date("2024-07-16"), upcoming[0].due_date) % 31, 0);
    }

    #[test]
    fn test_upcoming_horizon_out_of_range_is_rejected() {
        let txs = monthly_expenses("Netflix", "Entertainment", 15.49, "2024-01-15", 6);
        let patterns = RecurringDetector::new().detect(&txs);
        let today = date("2024-08-01");

        for horizon in [-1, MAX_HORIZON_DAYS + 1, 100_000_000, i64::MAX] {
            let err = upcoming_charges(&patterns, today, horizon).unwrap_err();
            assert!(matches!(err, Error::InvalidConfig(_)));
        }
        assert!(upcoming_charges(&patterns, today, MAX_HORIZON_DAYS).is_ok());

        // A valid horizon that runs off the calendar is bad data, not a panic
        let err = upcoming_charges(&patterns, NaiveDate::MAX, 1).unwrap_err();
        assert!(matches!(err, Error::InvalidData(_)));
    }

    #[test]
    fn test_detect_price_changes() {
        let mut txs = monthly_expenses("Streamly", "Entertainment", 10.0, "2024-01-10", 4);
        txs.push(expense("2024-05-10", "Streamly", "Entertainment", -11.0));

        let detector = RecurringDetector::new();
        let patterns = detector.detect(&txs);
        let changes = detector.detect_price_changes(&patterns);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].previous_amount, 10.0);
        assert_eq!(changes[0].current_amount, 11.0);
        assert_eq!(changes[0].change_percent, 10.0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = RecurringConfig {
            min_consistency: 1.5,
            ..Default::default()
        };
        assert!(RecurringDetector::with_config(config).is_err());

        let config = RecurringConfig {
            min_occurrences_confirmed: 1,
            ..Default::default()
        };
        assert!(RecurringDetector::with_config(config).is_err());
    }

    #[test]
    fn test_period_wire_labels() {
        assert_eq!(
            serde_json::to_string(&Period::BiWeekly).unwrap(),
            "\"Bi-weekly\""
        );
        assert_eq!(Period::Quarterly.monthly_factor(), 1.0 / 3.0);
    }
}
