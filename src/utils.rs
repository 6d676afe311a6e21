use crate::error::{LedgerError, Result};
use crate::ledger::YearMonth;
use chrono::{Datelike, NaiveDate};
use std::env;
use std::path::{Path, PathBuf};

pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const DEPLOYMENT_DATA_DIR: &str = "/app/data";
pub const DEVELOPMENT_DATA_DIR: &str = "data";

/// Parses a raw date cell, returning `None` for anything that is not a real calendar date
/// in `format` (including empty cells and impossible dates such as 31/02).
///
/// A `%Y` year must be written with four digits: chrono alone would read `15/01/24`
/// as the year 24.
pub fn parse_ledger_date(raw: &str, format: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let date = NaiveDate::parse_from_str(trimmed, format).ok()?;

    if format.contains("%Y") {
        let year = date.year();
        if !(0..=9999).contains(&year) || !trimmed.contains(&format!("{:04}", year)) {
            return None;
        }
    }
    Some(date)
}

/// Parses a raw amount cell using `decimal_separator`.
/// Anything that is not a finite, non-negative number coerces to zero.
pub fn parse_amount(raw: &str, decimal_separator: char) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }

    let normalized = if decimal_separator == '.' {
        trimmed.to_string()
    } else {
        trimmed.replace(decimal_separator, ".")
    };

    match normalized.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value,
        _ => 0.0,
    }
}

/// Text cells that are blank after trimming are missing values.
pub fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Parses a year-month key in the form "YYYY-MM".
pub fn parse_year_month(key: &str) -> Result<YearMonth> {
    let invalid = || LedgerError::InvalidYearMonth(key.to_string());

    let (year, month) = key.trim().split_once('-').ok_or_else(invalid)?;
    if year.len() != 4 || month.len() != 2 {
        return Err(invalid());
    }

    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;

    YearMonth::new(year, month).ok_or_else(invalid)
}

/// The twelve year-month keys of `year`, January first.
pub fn months_of_year(year: i32) -> Vec<YearMonth> {
    (1..=12).filter_map(|m| YearMonth::new(year, m)).collect()
}

/// Resolves the directory holding the ledger exports.
///
/// Precedence: `explicit`, then the `DATA_DIR` environment variable, then
/// `/app/data` when it exists, then `data` relative to the working directory.
pub fn resolve_source_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }

    if let Ok(dir) = env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }

    let deployment = Path::new(DEPLOYMENT_DATA_DIR);
    if deployment.exists() {
        return deployment.to_path_buf();
    }

    PathBuf::from(DEVELOPMENT_DATA_DIR)
}
