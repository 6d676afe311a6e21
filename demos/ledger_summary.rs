use expense_ledger::{
    cumulative, fill_missing_months, find_invalid_date_rows, group_stats, resolve_source_dir,
    top_expenses, Aggregator, Dimension, LedgerCache, LoaderConfig,
};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let explicit = std::env::args().nth(1).map(PathBuf::from);
    let dir = resolve_source_dir(explicit.as_deref());
    let config = match std::env::var("LEDGER_CONFIG") {
        Ok(path) => LoaderConfig::from_json_file(path)?,
        Err(_) => LoaderConfig::default(),
    };
    let aggregator = Aggregator::new(&config.columns);

    let invalid = find_invalid_date_rows(&dir, &config)?;
    if !invalid.is_empty() {
        println!("Rows with invalid dates:");
        for row in &invalid {
            println!(
                "{} row {}: '{}'",
                row.source_file, row.row_number, row.original_date
            );
        }
        println!();
    }

    let mut cache = LedgerCache::new(&dir, config.clone());
    let ledger = cache.ledger()?;

    if ledger.is_empty() {
        println!("No data in {}", dir.display());
        return Ok(());
    }

    println!(
        "{} transactions from {} ({} to {})",
        ledger.len(),
        dir.display(),
        ledger.date_range().map(|r| r.0.to_string()).unwrap_or_default(),
        ledger.date_range().map(|r| r.1.to_string()).unwrap_or_default(),
    );

    for year in ledger.years() {
        println!("\n== {} ==", year);

        let monthly = fill_missing_months(&aggregator.monthly_totals(ledger, year), year);
        for point in &monthly.points {
            println!("{}  {:>10.2}", point.year_month, point.value);
        }

        let per_party = fill_missing_months(
            &aggregator.monthly_totals_by(ledger, year, &[Dimension::Party]),
            year,
        );
        let running = cumulative(&per_party);
        for party in ledger.parties() {
            let total = running
                .points
                .iter()
                .filter(|p| p.groups == [party.clone()])
                .map(|p| p.value)
                .last()
                .unwrap_or(0.0);
            println!("{:<20} {:>10.2}", party, total);
        }
    }

    println!("\nBy category:");
    for stats in group_stats(ledger, Dimension::Category) {
        println!(
            "{:<20} total {:>10.2}  mean {:>8.2}  count {:>4}",
            stats.key, stats.total, stats.mean, stats.count
        );
    }

    println!("\nTop expenses:");
    for tx in top_expenses(ledger, 5) {
        println!(
            "{}  {:<12} {:>10.2}  {}",
            tx.date.format("%d/%m/%Y"),
            tx.party.as_deref().unwrap_or("-"),
            tx.amount_expense,
            tx.notes.as_deref().unwrap_or("")
        );
    }

    Ok(())
}
