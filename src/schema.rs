use crate::error::{LedgerError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Header names of the columns the loader reads from each export.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(default)]
pub struct ColumnMapping {
    #[schemars(description = "Transaction date column, formatted according to `date_format`")]
    pub date: String,

    #[schemars(description = "Expense amount column (non-negative, decimal separator as configured)")]
    pub expense: String,

    #[schemars(description = "Income amount column (non-negative, decimal separator as configured)")]
    pub income: String,

    #[schemars(description = "Person or entity the transaction is attributed to")]
    pub party: String,

    #[schemars(description = "Free-text category label")]
    pub category: String,

    #[schemars(description = "Free-text notes")]
    pub notes: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            date: "Date".to_string(),
            expense: "Dépense".to_string(),
            income: "Revenu".to_string(),
            party: "Tiers".to_string(),
            category: "Catégorie".to_string(),
            notes: "Notes".to_string(),
        }
    }
}

impl ColumnMapping {
    /// Returns true if `header` is one of the mapped columns.
    pub fn is_mapped(&self, header: &str) -> bool {
        [
            &self.date,
            &self.expense,
            &self.income,
            &self.party,
            &self.category,
            &self.notes,
        ]
        .iter()
        .any(|name| name.as_str() == header)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema, Default)]
#[serde(rename_all = "PascalCase")]
pub enum InvalidFilePolicy {
    #[default]
    #[schemars(
        description = "Log a warning and continue with the remaining files when a file is unreadable or has no date column."
    )]
    Skip,

    #[schemars(description = "Abort the load with an error on the first unreadable or malformed file.")]
    Fail,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(default)]
pub struct LoaderConfig {
    #[schemars(description = "Mapping from logical fields to header names")]
    pub columns: ColumnMapping,

    #[schemars(description = "Field separator (single ASCII character)")]
    pub delimiter: char,

    #[schemars(description = "Decimal separator used in amount columns")]
    pub decimal_separator: char,

    #[schemars(description = "chrono format string for the date column, e.g. %d/%m/%Y")]
    pub date_format: String,

    #[schemars(description = "File extension (without the dot) of ledger exports, matched case-insensitively")]
    pub extension: String,

    #[schemars(description = "What the ledger loader does with files it cannot use")]
    pub invalid_file_policy: InvalidFilePolicy,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            columns: ColumnMapping::default(),
            delimiter: ';',
            decimal_separator: ',',
            date_format: "%d/%m/%Y".to_string(),
            extension: "csv".to_string(),
            invalid_file_policy: InvalidFilePolicy::Skip,
        }
    }
}

impl LoaderConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: LoaderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(LoaderConfig)
    }

    pub fn validate(&self) -> Result<()> {
        self.delimiter_byte()?;

        if self.delimiter == self.decimal_separator {
            return Err(LedgerError::InvalidConfig(format!(
                "delimiter and decimal separator are both '{}'",
                self.delimiter
            )));
        }
        if self.date_format.trim().is_empty() {
            return Err(LedgerError::InvalidConfig(
                "date_format must not be empty".to_string(),
            ));
        }
        if self.columns.date.is_empty() {
            return Err(LedgerError::InvalidConfig(
                "the date column name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// The delimiter as the single byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(LedgerError::InvalidConfig(format!(
                "delimiter '{}' is not a single ASCII character",
                self.delimiter
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = LoaderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.delimiter_byte().unwrap(), b';');
        assert_eq!(config.columns.expense, "Dépense");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = LoaderConfig::from_json_str(
            r#"{ "columns": { "party": "Person" }, "invalid_file_policy": "Fail" }"#,
        )
        .unwrap();

        assert_eq!(config.columns.party, "Person");
        assert_eq!(config.columns.date, "Date");
        assert_eq!(config.delimiter, ';');
        assert_eq!(config.invalid_file_policy, InvalidFilePolicy::Fail);
    }

    #[test]
    fn test_rejects_clashing_separators() {
        let result = LoaderConfig::from_json_str(r#"{ "delimiter": ",", "decimal_separator": "," }"#);
        assert!(matches!(result, Err(LedgerError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_non_ascii_delimiter() {
        let config = LoaderConfig {
            delimiter: '§',
            ..LoaderConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_schema_lists_columns() {
        let schema = serde_json::to_value(LoaderConfig::json_schema()).unwrap();
        let text = schema.to_string();
        assert!(text.contains("decimal_separator"));
        assert!(text.contains("invalid_file_policy"));
    }

    #[test]
    fn test_is_mapped() {
        let columns = ColumnMapping::default();
        assert!(columns.is_mapped("Tiers"));
        assert!(!columns.is_mapped("Compte"));
    }
}
