use tracing::info;

use super::DailyLevel;
use crate::data::{fetch_previous_session, BarSource};
use crate::universe::SectorUniverse;

/// Outcome of one pass over the fetch set
#[derive(Debug, Clone, Default)]
pub struct AggregateReport {
    pub records: Vec<DailyLevel>,
    pub succeeded: usize,
    pub failed: usize,
    /// Symbols whose fetch produced no usable bar
    pub failures: Vec<String>,
}

impl AggregateReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Fetch every distinct symbol of the universe, one at a time
pub async fn aggregate_universe(
    source: &dyn BarSource,
    universe: &SectorUniverse,
    unclassified_sector: &str,
) -> AggregateReport {
    let symbols = universe.symbols();
    aggregate_levels(source, universe, &symbols, unclassified_sector).await
}

/// Fetch `symbols` sequentially and build a record per success.
///
/// A failed symbol is counted and skipped; the batch always runs to the end.
/// Symbols absent from the universe are tagged with `unclassified_sector`.
pub async fn aggregate_levels(
    source: &dyn BarSource,
    universe: &SectorUniverse,
    symbols: &[&str],
    unclassified_sector: &str,
) -> AggregateReport {
    let mut report = AggregateReport::default();
    let total = symbols.len();

    for (i, symbol) in symbols.iter().enumerate() {
        print!("[{}/{}] Fetching {}... ", i + 1, total, symbol);

        match fetch_previous_session(source, symbol).await {
            Some(bar) => {
                let sector = universe.sector_of(symbol).unwrap_or(unclassified_sector);
                println!(
                    "✅ High: ₹{:.2}, Low: ₹{:.2}, Open: ₹{:.2}, Close: ₹{:.2}",
                    bar.high, bar.low, bar.open, bar.close
                );
                report.records.push(DailyLevel::from_bar(symbol, sector, &bar));
                report.succeeded += 1;
            }
            None => {
                println!("⚠️  no data");
                report.failures.push(symbol.to_string());
                report.failed += 1;
            }
        }
    }

    info!(
        succeeded = report.succeeded,
        failed = report.failed,
        source = source.name(),
        "Aggregation finished"
    );
    report
}
