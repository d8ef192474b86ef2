use chrono::NaiveDate;
use tracing::{info, warn};

use super::{DailyLevel, SnapshotStore};
use crate::data::DataResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// No records were collected; storage was not touched
    NothingToWrite,
    Replaced {
        captured_date: NaiveDate,
        deleted: u64,
        inserted: u64,
    },
}

fn warn_on_other_dates(captured_date: NaiveDate, records: &[DailyLevel]) {
    let stragglers: Vec<&str> = records
        .iter()
        .filter(|r| r.captured_date != captured_date)
        .map(|r| r.symbol.as_str())
        .collect();
    if !stragglers.is_empty() {
        warn!(
            %captured_date,
            symbols = ?stragglers,
            "Records from an older session replace only their own symbol on that date"
        );
    }
}

/// Replace the stored snapshot for the records' date with `records`.
///
/// The date comes from the first record and is cleared completely. A record
/// from another date replaces only its own `(symbol, captured_date)` row.
/// An empty slice performs neither the delete nor the insert.
pub async fn replace_snapshot(
    store: &dyn SnapshotStore,
    records: &[DailyLevel],
) -> DataResult<ReplaceOutcome> {
    let Some(first) = records.first() else {
        info!("No records collected, leaving stored snapshot untouched");
        return Ok(ReplaceOutcome::NothingToWrite);
    };
    let captured_date = first.captured_date;
    warn_on_other_dates(captured_date, records);

    info!(%captured_date, records = records.len(), "Replacing snapshot");
    let (deleted, inserted) = store.replace_snapshot(captured_date, records).await?;
    info!(%captured_date, deleted, inserted, "Snapshot replaced");

    Ok(ReplaceOutcome::Replaced {
        captured_date,
        deleted,
        inserted,
    })
}

/// Replace only the rows for the symbols in `records`, leaving every other
/// symbol stored on the same date in place.
pub async fn replace_symbol_levels(
    store: &dyn SnapshotStore,
    records: &[DailyLevel],
) -> DataResult<ReplaceOutcome> {
    let Some(first) = records.first() else {
        info!("No records collected, leaving stored snapshot untouched");
        return Ok(ReplaceOutcome::NothingToWrite);
    };
    let captured_date = first.captured_date;
    warn_on_other_dates(captured_date, records);

    info!(%captured_date, records = records.len(), "Replacing symbol levels");
    let (deleted, inserted) = store.replace_symbols(records).await?;
    info!(%captured_date, deleted, inserted, "Symbol levels replaced");

    Ok(ReplaceOutcome::Replaced {
        captured_date,
        deleted,
        inserted,
    })
}
