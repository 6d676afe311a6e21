//! # Expense Ledger
//!
//! A library for turning semicolon-separated expense exports into a single
//! deduplicated ledger, and for deriving the monthly views a dashboard draws from it.
//!
//! ## Core Concepts
//!
//! - **Ledger**: every transaction from every export in a directory, with bad dates
//!   dropped, bad amounts zeroed and repeated (date, expense, party, notes) rows removed
//! - **Year-month key**: the `YYYY-MM` bucket a transaction falls in, always derived from its date
//! - **Gap filling**: completing an aggregated series to all twelve months of a year
//! - **Diagnostics**: the rows the loader discarded, with their original date text
//!
//! ## Example
//!
//! ```rust,ignore
//! use expense_ledger::*;
//!
//! let config = LoaderConfig::default();
//! let dir = resolve_source_dir(None);
//!
//! let ledger = load_ledger(&dir, &config)?;
//! for year in ledger.years() {
//!     let monthly = Aggregator::new(&config.columns).monthly_totals(&ledger, year);
//!     let complete = fill_missing_months(&monthly, year);
//!     assert_eq!(complete.len(), 12);
//! }
//!
//! for row in find_invalid_date_rows(&dir, &config)? {
//!     println!("{} row {}: '{}'", row.source_file, row.row_number, row.original_date);
//! }
//! ```

pub mod aggregation;
pub mod cache;
pub mod diagnostics;
pub mod error;
pub mod gap_fill;
pub mod ingestion;
pub mod ledger;
pub mod schema;
pub mod utils;

pub use aggregation::*;
pub use cache::{CacheKey, CacheStats, DirectorySignature, LedgerCache};
pub use diagnostics::{find_invalid_date_rows, InvalidRow};
pub use error::{LedgerError, Result};
pub use gap_fill::*;
pub use ingestion::{list_source_files, load_ledger, load_single_file};
pub use ledger::{Ledger, LedgerFilter, Transaction, YearMonth};
pub use schema::*;
pub use utils::*;
