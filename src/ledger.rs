use crate::error::LedgerError;
use crate::utils::parse_year_month;
use chrono::{Datelike, NaiveDate};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

/// A calendar month within a year. Orders chronologically and prints as `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    /// Returns `None` unless `month` is within 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_year_month(s)
    }
}

impl TryFrom<String> for YearMonth {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_year_month(&value)
    }
}

impl From<YearMonth> for String {
    fn from(value: YearMonth) -> Self {
        value.to_string()
    }
}

type DedupKey = (NaiveDate, u64, Option<String>, Option<String>);

/// One normalized row of the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub amount_expense: f64,
    pub amount_income: f64,
    pub party: Option<String>,
    pub category: Option<String>,
    pub notes: Option<String>,
    /// Name of the file this row was read from
    pub source_file: String,
    /// Columns present in the export that are not part of the column mapping
    pub extra: BTreeMap<String, String>,
}

impl Transaction {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn year_month(&self) -> YearMonth {
        YearMonth::from_date(self.date)
    }

    fn dedup_key(&self) -> DedupKey {
        (
            self.date,
            self.amount_expense.to_bits(),
            self.party.clone(),
            self.notes.clone(),
        )
    }
}

/// Selection applied to a ledger. `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerFilter {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub party: Option<String>,
    pub category: Option<String>,
}

impl LedgerFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.year.map_or(true, |y| tx.year() == y)
            && self.month.map_or(true, |m| tx.month() == m)
            && self
                .party
                .as_deref()
                .map_or(true, |p| tx.party.as_deref() == Some(p))
            && self
                .category
                .as_deref()
                .map_or(true, |c| tx.category.as_deref() == Some(c))
    }
}

/// The deduplicated collection of transactions, in file-then-row order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Ledger {
    transactions: Vec<Transaction>,
}

impl Ledger {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a ledger, discarding every transaction whose (date, expense amount,
    /// party, notes) tuple was already seen. The first occurrence wins.
    pub fn from_transactions(transactions: Vec<Transaction>) -> Self {
        let total = transactions.len();
        let mut seen = HashSet::with_capacity(total);
        let mut kept = Vec::with_capacity(total);

        for tx in transactions {
            if seen.insert(tx.dedup_key()) {
                kept.push(tx);
            }
        }

        if kept.len() < total {
            debug!("Discarded {} duplicate row(s)", total - kept.len());
        }

        Self { transactions: kept }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Transaction> {
        self.transactions.iter()
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Distinct parties, sorted, missing values excluded.
    pub fn parties(&self) -> Vec<String> {
        distinct_sorted(self.iter().filter_map(|tx| tx.party.as_deref()))
    }

    /// Distinct categories, sorted, missing values excluded.
    pub fn categories(&self) -> Vec<String> {
        distinct_sorted(self.iter().filter_map(|tx| tx.category.as_deref()))
    }

    /// Distinct years, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.iter()
            .map(Transaction::year)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Distinct months (1-12) that have at least one transaction in `year`, ascending.
    pub fn months_in_year(&self, year: i32) -> Vec<u32> {
        self.iter()
            .filter(|tx| tx.year() == year)
            .map(Transaction::month)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn filter(&self, filter: &LedgerFilter) -> Ledger {
        Ledger {
            transactions: self
                .iter()
                .filter(|tx| filter.matches(tx))
                .cloned()
                .collect(),
        }
    }

    pub fn total_expense(&self) -> f64 {
        self.iter().map(|tx| tx.amount_expense).sum()
    }

    pub fn total_income(&self) -> f64 {
        self.iter().map(|tx| tx.amount_income).sum()
    }

    /// Earliest and latest transaction dates.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = self.iter().map(|tx| tx.date).min()?;
        let last = self.iter().map(|tx| tx.date).max()?;
        Some((first, last))
    }
}

impl IntoIterator for Ledger {
    type Item = Transaction;
    type IntoIter = std::vec::IntoIter<Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.transactions.into_iter()
    }
}

impl<'a> IntoIterator for &'a Ledger {
    type Item = &'a Transaction;
    type IntoIter = std::slice::Iter<'a, Transaction>;

    fn into_iter(self) -> Self::IntoIter {
        self.transactions.iter()
    }
}

fn distinct_sorted<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn tx(
        date: (i32, u32, u32),
        expense: f64,
        party: Option<&str>,
        category: Option<&str>,
    ) -> Transaction {
        Transaction {
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            amount_expense: expense,
            amount_income: 0.0,
            party: party.map(str::to_string),
            category: category.map(str::to_string),
            notes: None,
            source_file: "test.csv".to_string(),
            extra: BTreeMap::new(),
        }
    }

    #[test]
    fn test_year_month_display_and_parse() {
        let ym = YearMonth::new(2024, 2).unwrap();
        assert_eq!(ym.to_string(), "2024-02");
        assert_eq!("2024-02".parse::<YearMonth>().unwrap(), ym);
        assert!(YearMonth::new(2024, 0).is_none());
        assert!(YearMonth::new(2024, 13).is_none());
    }

    #[test]
    fn test_year_month_orders_chronologically() {
        let dec = YearMonth::new(2023, 12).unwrap();
        let jan = YearMonth::new(2024, 1).unwrap();
        let feb = YearMonth::new(2024, 2).unwrap();
        assert!(dec < jan && jan < feb);
    }

    #[test]
    fn test_year_month_serde_as_string() {
        let ym = YearMonth::new(2024, 7).unwrap();
        assert_eq!(serde_json::to_string(&ym).unwrap(), "\"2024-07\"");
        let back: YearMonth = serde_json::from_str("\"2024-07\"").unwrap();
        assert_eq!(back, ym);
        assert!(serde_json::from_str::<YearMonth>("\"2024-00\"").is_err());
    }

    #[test]
    fn test_derived_fields_follow_date() {
        let t = tx((2024, 3, 9), 1.0, None, None);
        assert_eq!(t.year(), 2024);
        assert_eq!(t.month(), 3);
        assert_eq!(t.year_month().to_string(), "2024-03");
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let first = tx((2024, 1, 15), 50.0, Some("Alice"), Some("Food"));
        let second = tx((2024, 1, 15), 50.0, Some("Alice"), Some("Restaurant"));
        let other = tx((2024, 1, 15), 51.0, Some("Alice"), Some("Food"));

        let ledger = Ledger::from_transactions(vec![first, second, other]);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.transactions()[0].category.as_deref(), Some("Food"));
        assert_eq!(ledger.transactions()[1].amount_expense, 51.0);
    }

    #[test]
    fn test_dedup_treats_missing_values_as_equal() {
        let a = tx((2024, 1, 1), 5.0, None, Some("A"));
        let b = tx((2024, 1, 1), 5.0, None, Some("B"));
        assert_eq!(Ledger::from_transactions(vec![a, b]).len(), 1);
    }

    #[test]
    fn test_derived_queries() {
        let ledger = Ledger::from_transactions(vec![
            tx((2024, 1, 2), 10.0, Some("Bob"), Some("Food")),
            tx((2023, 5, 2), 20.0, Some("Alice"), None),
            tx((2024, 3, 2), 30.0, None, Some("Transport")),
            tx((2024, 1, 9), 40.0, Some("Bob"), Some("Food")),
        ]);

        assert_eq!(ledger.parties(), vec!["Alice", "Bob"]);
        assert_eq!(ledger.categories(), vec!["Food", "Transport"]);
        assert_eq!(ledger.years(), vec![2023, 2024]);
        assert_eq!(ledger.months_in_year(2024), vec![1, 3]);
        assert_eq!(ledger.total_expense(), 100.0);
        assert_eq!(
            ledger.date_range(),
            Some((
                NaiveDate::from_ymd_opt(2023, 5, 2).unwrap(),
                NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()
            ))
        );
    }

    #[test]
    fn test_filter() {
        let ledger = Ledger::from_transactions(vec![
            tx((2024, 1, 2), 10.0, Some("Bob"), Some("Food")),
            tx((2024, 2, 2), 20.0, Some("Alice"), Some("Food")),
            tx((2023, 1, 2), 30.0, Some("Bob"), Some("Rent")),
        ]);

        let bob_2024 = ledger.filter(&LedgerFilter {
            year: Some(2024),
            party: Some("Bob".to_string()),
            ..LedgerFilter::default()
        });
        assert_eq!(bob_2024.len(), 1);
        assert_eq!(bob_2024.total_expense(), 10.0);

        let food = ledger.filter(&LedgerFilter {
            category: Some("Food".to_string()),
            ..LedgerFilter::default()
        });
        assert_eq!(food.len(), 2);

        assert_eq!(ledger.filter(&LedgerFilter::default()), ledger);
    }

    #[test]
    fn test_empty_ledger_queries() {
        let ledger = Ledger::empty();
        assert!(ledger.parties().is_empty());
        assert!(ledger.years().is_empty());
        assert!(ledger.categories().is_empty());
        assert!(ledger.date_range().is_none());
        assert_eq!(ledger.total_expense(), 0.0);
    }
}
