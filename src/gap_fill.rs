use crate::ledger::YearMonth;
use crate::utils::months_of_year;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub const YEAR_MONTH_FIELD: &str = "YearMonth";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub year_month: YearMonth,
    /// One value per entry of the owning series' `group_fields`
    pub groups: Vec<String>,
    pub value: f64,
}

/// An aggregated series keyed by year-month, optionally split by grouping dimensions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySeries {
    pub value_field: String,
    pub group_fields: Vec<String>,
    pub points: Vec<SeriesPoint>,
}

impl MonthlySeries {
    pub fn new(value_field: impl Into<String>) -> Self {
        Self::grouped(value_field, Vec::new())
    }

    pub fn grouped(value_field: impl Into<String>, group_fields: Vec<String>) -> Self {
        Self {
            value_field: value_field.into(),
            group_fields,
            points: Vec::new(),
        }
    }

    pub fn push(&mut self, year_month: YearMonth, groups: Vec<String>, value: f64) {
        self.points.push(SeriesPoint {
            year_month,
            groups,
            value,
        });
    }

    pub fn is_grouped(&self) -> bool {
        !self.group_fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Column layout of the series when shown as a table.
    pub fn columns(&self) -> Vec<String> {
        std::iter::once(YEAR_MONTH_FIELD.to_string())
            .chain(self.group_fields.iter().cloned())
            .chain(std::iter::once(self.value_field.clone()))
            .collect()
    }

    /// Distinct group tuples present in the series, sorted.
    pub fn groups(&self) -> Vec<Vec<String>> {
        self.points
            .iter()
            .map(|p| p.groups.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn value_at(&self, year_month: YearMonth, groups: &[&str]) -> Option<f64> {
        self.points
            .iter()
            .find(|p| p.year_month == year_month && p.groups.iter().eq(groups.iter()))
            .map(|p| p.value)
    }
}

/// Completes `series` to exactly the twelve months of `year`.
///
/// Grouped series get every month crossed with every group tuple seen anywhere in the
/// input; an empty grouped input stays empty. Missing combinations are zero, existing
/// ones keep the first value seen. Output is ordered by month, then group.
pub fn fill_missing_months(series: &MonthlySeries, year: i32) -> MonthlySeries {
    let grouped = series.is_grouped();
    let key_groups = |point: &SeriesPoint| {
        if grouped {
            point.groups.clone()
        } else {
            Vec::new()
        }
    };

    let mut observed: BTreeMap<(YearMonth, Vec<String>), f64> = BTreeMap::new();
    for point in series.points.iter().filter(|p| p.year_month.year() == year) {
        observed
            .entry((point.year_month, key_groups(point)))
            .or_insert(point.value);
    }

    let groups: Vec<Vec<String>> = if grouped {
        series
            .points
            .iter()
            .map(key_groups)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    } else {
        vec![Vec::new()]
    };

    let mut filled =
        MonthlySeries::grouped(series.value_field.clone(), series.group_fields.clone());
    for month in months_of_year(year) {
        for group in &groups {
            let value = observed
                .get(&(month, group.clone()))
                .copied()
                .unwrap_or(0.0);
            filled.push(month, group.clone(), value);
        }
    }

    filled
}
