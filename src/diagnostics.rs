use crate::error::Result;
use crate::ingestion::{read_raw_file, source_paths};
use crate::schema::LoaderConfig;
use crate::utils::parse_ledger_date;
use log::{error, warn};
use serde::Serialize;
use std::path::Path;

/// A source row whose date could not be parsed, kept verbatim for review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvalidRow {
    pub source_file: String,
    /// 1-indexed position among the data rows; the header is not counted
    pub row_number: usize,
    /// The date cell exactly as it appears in the file
    pub original_date: String,
    /// Every column of the row in header order
    pub fields: Vec<(String, String)>,
}

impl InvalidRow {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(header, _)| header == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Re-reads every export in `dir` and reports the rows the ledger loader discards
/// for an unparseable date. Unreadable files and files without a date column are
/// logged and skipped.
pub fn find_invalid_date_rows(
    dir: impl AsRef<Path>,
    config: &LoaderConfig,
) -> Result<Vec<InvalidRow>> {
    config.validate()?;

    let mut invalid = Vec::new();
    for path in source_paths(dir.as_ref(), config)? {
        let raw = match read_raw_file(&path, config) {
            Ok(raw) => raw,
            Err(e) => {
                error!("Error reading file '{}': {}", path.display(), e);
                continue;
            }
        };

        let Some(date_idx) = raw.column(&config.columns.date) else {
            warn!(
                "File '{}' has no '{}' column, skipping",
                raw.name, config.columns.date
            );
            continue;
        };

        for (i, record) in raw.records.iter().enumerate() {
            let original_date = record.get(date_idx).unwrap_or_default();
            if parse_ledger_date(original_date, &config.date_format).is_some() {
                continue;
            }

            let fields = raw
                .headers
                .iter()
                .enumerate()
                .map(|(col, header)| {
                    let value = record.get(col).unwrap_or_default();
                    (header.clone(), value.to_string())
                })
                .collect();

            invalid.push(InvalidRow {
                source_file: raw.name.clone(),
                row_number: i + 1,
                original_date: original_date.to_string(),
                fields,
            });
        }
    }

    Ok(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, contents: &str) {
        fs::write(dir.path().join(name), contents).unwrap();
    }

    #[test]
    fn test_reports_rows_with_row_numbers() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "a.csv",
            "Date;Dépense;Tiers\n01/01/2024;1;Alice\nsoon;2;Bob\n32/01/2024;3;Carol\n",
        );

        let rows = find_invalid_date_rows(dir.path(), &LoaderConfig::default()).unwrap();
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].source_file, "a.csv");
        assert_eq!(rows[0].row_number, 2);
        assert_eq!(rows[0].original_date, "soon");
        assert_eq!(rows[0].field("Tiers"), Some("Bob"));

        assert_eq!(rows[1].row_number, 3);
        assert_eq!(rows[1].original_date, "32/01/2024");
    }

    #[test]
    fn test_empty_date_cell_is_reported_verbatim() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.csv", "Date;Tiers\n;Alice\n");

        let rows = find_invalid_date_rows(dir.path(), &LoaderConfig::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].original_date, "");
    }

    #[test]
    fn test_skips_files_without_date_column_or_unreadable() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.csv", "Jour;Tiers\nsoon;Alice\n");
        fs::write(dir.path().join("b.csv"), b"Date\n\xff\xfe\n").unwrap();
        write(&dir, "c.csv", "Date;Tiers\nlater;Bob\n");

        let rows = find_invalid_date_rows(dir.path(), &LoaderConfig::default()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].source_file, "c.csv");
    }

    #[test]
    fn test_no_files() {
        let dir = TempDir::new().unwrap();
        assert!(find_invalid_date_rows(dir.path(), &LoaderConfig::default())
            .unwrap()
            .is_empty());
    }
}
