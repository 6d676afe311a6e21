use crate::gap_fill::MonthlySeries;
use crate::ledger::{Ledger, Transaction, YearMonth};
use crate::schema::ColumnMapping;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A text attribute transactions can be grouped by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Dimension {
    Party,
    Category,
}

impl Dimension {
    pub fn value<'a>(&self, tx: &'a Transaction) -> Option<&'a str> {
        match self {
            Dimension::Party => tx.party.as_deref(),
            Dimension::Category => tx.category.as_deref(),
        }
    }

    /// Column header this dimension is read from.
    pub fn label<'a>(&self, columns: &'a ColumnMapping) -> &'a str {
        match self {
            Dimension::Party => &columns.party,
            Dimension::Category => &columns.category,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub key: String,
    pub total: f64,
    pub mean: f64,
    pub count: usize,
    pub max: f64,
}

/// Builds expense series named after the configured columns.
pub struct Aggregator<'a> {
    columns: &'a ColumnMapping,
}

impl<'a> Aggregator<'a> {
    pub fn new(columns: &'a ColumnMapping) -> Self {
        Self { columns }
    }

    /// Expense totals per month of `year`. Months without transactions are absent.
    pub fn monthly_totals(&self, ledger: &Ledger, year: i32) -> MonthlySeries {
        let mut totals: BTreeMap<YearMonth, f64> = BTreeMap::new();
        for tx in ledger.iter().filter(|tx| tx.year() == year) {
            *totals.entry(tx.year_month()).or_default() += tx.amount_expense;
        }

        let mut series = MonthlySeries::new(self.columns.expense.clone());
        for (year_month, total) in totals {
            series.push(year_month, Vec::new(), total);
        }
        series
    }

    /// Expense totals per month of `year` and per combination of `dims`.
    /// Transactions missing any of the dimension values are left out.
    pub fn monthly_totals_by(
        &self,
        ledger: &Ledger,
        year: i32,
        dims: &[Dimension],
    ) -> MonthlySeries {
        let mut totals: BTreeMap<(YearMonth, Vec<String>), f64> = BTreeMap::new();
        for tx in ledger.iter().filter(|tx| tx.year() == year) {
            let groups: Option<Vec<String>> = dims
                .iter()
                .map(|dim| dim.value(tx).map(str::to_string))
                .collect();
            if let Some(groups) = groups {
                *totals.entry((tx.year_month(), groups)).or_default() += tx.amount_expense;
            }
        }

        let group_fields = dims
            .iter()
            .map(|dim| dim.label(self.columns).to_string())
            .collect();
        let mut series = MonthlySeries::grouped(self.columns.expense.clone(), group_fields);
        for ((year_month, groups), total) in totals {
            series.push(year_month, groups, total);
        }
        series
    }
}

/// Running total of each group's values in month order.
pub fn cumulative(series: &MonthlySeries) -> MonthlySeries {
    let mut points = series.points.clone();
    points.sort_by(|a, b| (&a.groups, a.year_month).cmp(&(&b.groups, b.year_month)));

    let mut running: BTreeMap<Vec<String>, f64> = BTreeMap::new();
    for point in &mut points {
        let sum = running.entry(point.groups.clone()).or_default();
        *sum += point.value;
        point.value = *sum;
    }
    points.sort_by(|a, b| (a.year_month, &a.groups).cmp(&(b.year_month, &b.groups)));

    MonthlySeries {
        value_field: series.value_field.clone(),
        group_fields: series.group_fields.clone(),
        points,
    }
}

/// Expense totals per value of `dim`, largest first (ties by name).
pub fn totals_by(ledger: &Ledger, dim: Dimension) -> Vec<(String, f64)> {
    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for tx in ledger {
        if let Some(key) = dim.value(tx) {
            *totals.entry(key).or_default() += tx.amount_expense;
        }
    }

    let mut totals: Vec<(String, f64)> = totals
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    totals.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    totals
}

/// Expense totals per (outer, inner) pair, ordered by outer then inner value.
pub fn cross_totals(
    ledger: &Ledger,
    outer: Dimension,
    inner: Dimension,
) -> Vec<(String, String, f64)> {
    let mut totals: BTreeMap<(&str, &str), f64> = BTreeMap::new();
    for tx in ledger {
        if let (Some(o), Some(i)) = (outer.value(tx), inner.value(tx)) {
            *totals.entry((o, i)).or_default() += tx.amount_expense;
        }
    }

    totals
        .into_iter()
        .map(|((o, i), v)| (o.to_string(), i.to_string(), v))
        .collect()
}

/// Expense totals per party and day.
pub fn daily_totals_by_party(ledger: &Ledger) -> BTreeMap<String, Vec<(NaiveDate, f64)>> {
    let mut totals: BTreeMap<&str, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
    for tx in ledger {
        if let Some(party) = tx.party.as_deref() {
            *totals.entry(party).or_default().entry(tx.date).or_default() += tx.amount_expense;
        }
    }

    totals
        .into_iter()
        .map(|(party, days)| (party.to_string(), days.into_iter().collect()))
        .collect()
}

/// Running expense total per party, sampled on every day any party spent something.
pub fn cumulative_daily_by_party(ledger: &Ledger) -> BTreeMap<String, Vec<(NaiveDate, f64)>> {
    let daily = daily_totals_by_party(ledger);
    let all_days: BTreeSet<NaiveDate> = daily
        .values()
        .flat_map(|days| days.iter().map(|(d, _)| *d))
        .collect();

    daily
        .into_iter()
        .map(|(party, days)| {
            let by_day: BTreeMap<NaiveDate, f64> = days.into_iter().collect();
            let mut sum = 0.0;
            let running: Vec<(NaiveDate, f64)> = all_days
                .iter()
                .map(|day| {
                    sum += by_day.get(day).copied().unwrap_or(0.0);
                    (*day, sum)
                })
                .collect();
            (party, running)
        })
        .collect()
}

/// Total, mean, count and maximum expense per value of `dim`, largest total first.
pub fn group_stats(ledger: &Ledger, dim: Dimension) -> Vec<GroupStats> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for tx in ledger {
        if let Some(key) = dim.value(tx) {
            groups.entry(key).or_default().push(tx.amount_expense);
        }
    }

    let mut stats: Vec<GroupStats> = groups
        .into_iter()
        .map(|(key, amounts)| {
            let total: f64 = amounts.iter().sum();
            let count = amounts.len();
            GroupStats {
                key: key.to_string(),
                total,
                mean: total / count as f64,
                count,
                max: amounts.iter().copied().fold(f64::MIN, f64::max),
            }
        })
        .collect();
    stats.sort_by(|a, b| b.total.total_cmp(&a.total).then_with(|| a.key.cmp(&b.key)));
    stats
}

/// The `n` largest expenses, ties kept in ledger order.
pub fn top_expenses(ledger: &Ledger, n: usize) -> Vec<&Transaction> {
    let mut sorted: Vec<&Transaction> = ledger.iter().collect();
    sorted.sort_by(|a, b| b.amount_expense.total_cmp(&a.amount_expense));
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gap_fill::fill_missing_months;
    use crate::ledger::tests::tx;

    fn sample() -> Ledger {
        Ledger::from_transactions(vec![
            tx((2024, 1, 5), 10.0, Some("Alice"), Some("Food")),
            tx((2024, 1, 20), 15.0, Some("Bob"), Some("Food")),
            tx((2024, 3, 2), 700.0, Some("Bob"), Some("Rent")),
            tx((2024, 3, 9), 5.0, Some("Alice"), None),
            tx((2024, 3, 9), 8.0, None, Some("Food")),
            tx((2023, 12, 30), 99.0, Some("Carol"), Some("Gifts")),
        ])
    }

    fn ym(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).unwrap()
    }

    #[test]
    fn test_monthly_totals() {
        let columns = ColumnMapping::default();
        let series = Aggregator::new(&columns).monthly_totals(&sample(), 2024);

        assert_eq!(series.value_field, "Dépense");
        assert_eq!(series.len(), 2);
        assert_eq!(series.value_at(ym(2024, 1), &[]), Some(25.0));
        assert_eq!(series.value_at(ym(2024, 3), &[]), Some(713.0));

        let filled = fill_missing_months(&series, 2024);
        assert_eq!(filled.len(), 12);
        assert_eq!(filled.value_at(ym(2024, 2), &[]), Some(0.0));
    }

    #[test]
    fn test_monthly_totals_by_party() {
        let columns = ColumnMapping::default();
        let series =
            Aggregator::new(&columns).monthly_totals_by(&sample(), 2024, &[Dimension::Party]);

        assert_eq!(series.group_fields, vec!["Tiers"]);
        assert_eq!(series.value_at(ym(2024, 3), &["Bob"]), Some(700.0));
        assert_eq!(series.value_at(ym(2024, 3), &["Alice"]), Some(5.0));
        assert_eq!(series.groups(), vec![vec!["Alice"], vec!["Bob"]]);

        let filled = fill_missing_months(&series, 2024);
        assert_eq!(filled.len(), 24);
    }

    #[test]
    fn test_cumulative() {
        let columns = ColumnMapping::default();
        let series =
            Aggregator::new(&columns).monthly_totals_by(&sample(), 2024, &[Dimension::Party]);
        let running = cumulative(&fill_missing_months(&series, 2024));

        assert_eq!(running.value_at(ym(2024, 1), &["Bob"]), Some(15.0));
        assert_eq!(running.value_at(ym(2024, 2), &["Bob"]), Some(15.0));
        assert_eq!(running.value_at(ym(2024, 12), &["Bob"]), Some(715.0));
        assert_eq!(running.value_at(ym(2024, 12), &["Alice"]), Some(15.0));
        assert_eq!(running.points[0].year_month, ym(2024, 1));
    }

    #[test]
    fn test_totals_by_category() {
        let totals = totals_by(&sample(), Dimension::Category);
        assert_eq!(
            totals,
            vec![
                ("Rent".to_string(), 700.0),
                ("Gifts".to_string(), 99.0),
                ("Food".to_string(), 33.0),
            ]
        );
    }

    #[test]
    fn test_cross_totals() {
        let totals = cross_totals(&sample(), Dimension::Category, Dimension::Party);
        assert_eq!(totals[0], ("Food".to_string(), "Alice".to_string(), 10.0));
        assert_eq!(totals[1], ("Food".to_string(), "Bob".to_string(), 15.0));
        assert_eq!(totals.len(), 4);
    }

    #[test]
    fn test_cumulative_daily_by_party() {
        let running = cumulative_daily_by_party(&sample());
        let bob = &running["Bob"];

        assert_eq!(bob.len(), 5);
        assert_eq!(bob[0], (NaiveDate::from_ymd_opt(2023, 12, 30).unwrap(), 0.0));
        assert_eq!(bob.last().unwrap().1, 715.0);
        assert_eq!(running["Alice"].last().unwrap().1, 15.0);
    }

    #[test]
    fn test_group_stats() {
        let stats = group_stats(&sample(), Dimension::Party);
        assert_eq!(stats[0].key, "Bob");
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[0].max, 700.0);
        assert_eq!(stats[0].mean, 357.5);
        assert_eq!(stats.len(), 3);
    }

    #[test]
    fn test_top_expenses() {
        let ledger = sample();
        let top = top_expenses(&ledger, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].amount_expense, 700.0);
        assert_eq!(top[1].amount_expense, 99.0);
        assert_eq!(top_expenses(&ledger, 50).len(), 6);
    }

    #[test]
    fn test_empty_ledger_aggregates() {
        let columns = ColumnMapping::default();
        let ledger = Ledger::empty();
        let aggregator = Aggregator::new(&columns);

        assert!(aggregator.monthly_totals(&ledger, 2024).is_empty());
        assert!(totals_by(&ledger, Dimension::Party).is_empty());
        assert!(group_stats(&ledger, Dimension::Category).is_empty());
        assert!(cumulative_daily_by_party(&ledger).is_empty());
        assert!(top_expenses(&ledger, 5).is_empty());
    }
}
