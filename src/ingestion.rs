use crate::error::{LedgerError, Result};
use crate::ledger::{Ledger, Transaction};
use crate::schema::{InvalidFilePolicy, LoaderConfig};
use crate::utils::{non_empty, parse_amount, parse_ledger_date};
use csv::{ReaderBuilder, StringRecord};
use log::{info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A source file read into memory without any interpretation of its cells.
#[derive(Debug, Clone)]
pub(crate) struct RawFile {
    pub name: String,
    pub headers: Vec<String>,
    pub records: Vec<StringRecord>,
}

impl RawFile {
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }
}

/// Positions of the mapped columns in one file's header.
struct ColumnIndex {
    date: usize,
    expense: Option<usize>,
    income: Option<usize>,
    party: Option<usize>,
    category: Option<usize>,
    notes: Option<usize>,
    extra: Vec<(usize, String)>,
}

impl ColumnIndex {
    fn resolve(raw: &RawFile, config: &LoaderConfig) -> Result<Self> {
        let columns = &config.columns;
        let date = raw
            .column(&columns.date)
            .ok_or_else(|| LedgerError::MissingColumn {
                file: raw.name.clone(),
                column: columns.date.clone(),
            })?;

        let extra = raw
            .headers
            .iter()
            .enumerate()
            .filter(|(_, h)| !columns.is_mapped(h))
            .map(|(i, h)| (i, h.clone()))
            .collect();

        Ok(Self {
            date,
            expense: raw.column(&columns.expense),
            income: raw.column(&columns.income),
            party: raw.column(&columns.party),
            category: raw.column(&columns.category),
            notes: raw.column(&columns.notes),
            extra,
        })
    }
}

/// Transactions parsed from one file, plus how many rows were dropped for bad dates.
struct FileRows {
    transactions: Vec<Transaction>,
    invalid_dates: usize,
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

/// Paths of all ledger exports directly inside `dir`, sorted by file name.
/// A directory that does not exist has no exports.
pub(crate) fn source_paths(dir: &Path, config: &LoaderConfig) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_extension(&path, &config.extension) {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    Ok(paths)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Names of the ledger exports in `dir`, sorted alphabetically. Nothing is parsed.
pub fn list_source_files(dir: impl AsRef<Path>, config: &LoaderConfig) -> Result<Vec<String>> {
    Ok(source_paths(dir.as_ref(), config)?
        .iter()
        .map(|path| file_name(path))
        .collect())
}

pub(crate) fn read_raw_file(path: &Path, config: &LoaderConfig) -> Result<RawFile> {
    let name = file_name(path);
    let unreadable = |details: String| LedgerError::UnreadableFile {
        file: name.clone(),
        details,
    };

    let mut rdr = ReaderBuilder::new()
        .delimiter(config.delimiter_byte()?)
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| unreadable(e.to_string()))?;

    let headers = rdr
        .headers()
        .map_err(|e| unreadable(e.to_string()))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let records = rdr
        .records()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| unreadable(e.to_string()))?;

    Ok(RawFile {
        name,
        headers,
        records,
    })
}

fn normalize_file(raw: &RawFile, config: &LoaderConfig) -> Result<FileRows> {
    let index = ColumnIndex::resolve(raw, config)?;
    let mut transactions = Vec::with_capacity(raw.records.len());
    let mut invalid_dates = 0;

    for record in &raw.records {
        let date = record
            .get(index.date)
            .and_then(|cell| parse_ledger_date(cell, &config.date_format));
        let Some(date) = date else {
            invalid_dates += 1;
            continue;
        };

        let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i));
        let amount = |idx: Option<usize>| {
            cell(idx)
                .map(|v| parse_amount(v, config.decimal_separator))
                .unwrap_or(0.0)
        };

        let extra: BTreeMap<String, String> = index
            .extra
            .iter()
            .filter_map(|(i, header)| record.get(*i).map(|v| (header.clone(), v.to_string())))
            .collect();

        transactions.push(Transaction {
            date,
            amount_expense: amount(index.expense),
            amount_income: amount(index.income),
            party: non_empty(cell(index.party)),
            category: non_empty(cell(index.category)),
            notes: non_empty(cell(index.notes)),
            source_file: raw.name.clone(),
            extra,
        });
    }

    Ok(FileRows {
        transactions,
        invalid_dates,
    })
}

/// Reads and normalizes one file. Under `InvalidFilePolicy::Skip` an unusable file
/// yields `Ok(None)` after a warning.
fn load_file_rows(path: &Path, config: &LoaderConfig) -> Result<Option<FileRows>> {
    let result = read_raw_file(path, config).and_then(|raw| normalize_file(&raw, config));

    match (result, config.invalid_file_policy) {
        (Ok(rows), _) => {
            if rows.invalid_dates > 0 {
                warn!(
                    "File '{}' contains {} row(s) with invalid/broken dates - these rows will be discarded",
                    file_name(path),
                    rows.invalid_dates
                );
            }
            Ok(Some(rows))
        }
        (Err(e), InvalidFilePolicy::Skip) => {
            warn!("Skipping file '{}': {}", file_name(path), e);
            Ok(None)
        }
        (Err(e), InvalidFilePolicy::Fail) => Err(e),
    }
}

/// Loads every ledger export in `dir` into a single deduplicated ledger.
///
/// Files are concatenated in file-name order. Rows with an unparseable date are
/// discarded (one warning per file), unparseable amounts become zero, and rows
/// repeating an earlier (date, expense, party, notes) tuple are dropped.
pub fn load_ledger(dir: impl AsRef<Path>, config: &LoaderConfig) -> Result<Ledger> {
    let dir = dir.as_ref();
    config.validate()?;

    let paths = source_paths(dir, config)?;
    info!(
        "Found {} {} file(s) in {}",
        paths.len(),
        config.extension,
        dir.display()
    );

    let mut all_rows = Vec::new();
    let mut discarded = 0;
    for path in &paths {
        if let Some(rows) = load_file_rows(path, config)? {
            discarded += rows.invalid_dates;
            all_rows.extend(rows.transactions);
        }
    }

    if discarded > 0 {
        info!("Discarded {} row(s) with invalid dates", discarded);
    }

    Ok(Ledger::from_transactions(all_rows))
}

/// Loads exactly one named export from `dir`. A file that does not exist yields an
/// empty ledger.
pub fn load_single_file(
    dir: impl AsRef<Path>,
    filename: &str,
    config: &LoaderConfig,
) -> Result<Ledger> {
    config.validate()?;

    let path = dir.as_ref().join(filename);
    if !path.is_file() {
        return Ok(Ledger::empty());
    }

    Ok(load_file_rows(&path, config)?
        .map(|rows| Ledger::from_transactions(rows.transactions))
        .unwrap_or_default())
}
