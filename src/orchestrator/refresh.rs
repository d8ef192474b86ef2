use anyhow::{Context, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::data::BarSource;
use crate::levels::{
    aggregate_levels, replace_snapshot, replace_symbol_levels, AggregateReport, ReplaceOutcome,
    SnapshotStore,
};
use crate::universe::SectorUniverse;

#[derive(Debug)]
pub struct RefreshSummary {
    pub report: AggregateReport,
    pub outcome: ReplaceOutcome,
}

/// Fetch -> aggregate -> replace, for one sector universe
pub struct LevelsRefresher {
    source: Arc<dyn BarSource>,
    store: Arc<dyn SnapshotStore>,
    unclassified_sector: String,
}

impl LevelsRefresher {
    pub fn new(
        source: Arc<dyn BarSource>,
        store: Arc<dyn SnapshotStore>,
        unclassified_sector: impl Into<String>,
    ) -> Self {
        Self {
            source,
            store,
            unclassified_sector: unclassified_sector.into(),
        }
    }

    /// Refresh the snapshot. `only` restricts the fetch set; empty means the
    /// whole universe and replaces the whole date. A restricted run replaces
    /// only the fetched symbols' rows.
    pub async fn run(&self, universe: &SectorUniverse, only: &[String]) -> Result<RefreshSummary> {
        let symbols: Vec<&str> = if only.is_empty() {
            universe.symbols()
        } else {
            let mut seen = HashSet::new();
            let symbols: Vec<&str> = only
                .iter()
                .map(String::as_str)
                .filter(|symbol| seen.insert(*symbol))
                .collect();
            for symbol in &symbols {
                if universe.sector_of(symbol).is_none() {
                    warn!(
                        symbol = %symbol,
                        sector = %self.unclassified_sector,
                        "Symbol is not in the sector mapping"
                    );
                }
            }
            symbols
        };

        println!("🚀 Starting daily_high_low population...");
        println!("📊 Processing {} stocks...\n", symbols.len());
        info!(symbols = symbols.len(), source = self.source.name(), "Refreshing daily levels");

        let report = aggregate_levels(
            self.source.as_ref(),
            universe,
            &symbols,
            &self.unclassified_sector,
        )
        .await;

        println!(
            "\n📈 Fetched {} stocks successfully, {} errors",
            report.succeeded, report.failed
        );

        if report.records.is_empty() {
            println!("❌ No data to insert");
        } else {
            println!("\n💾 Updating {} records in database...", report.records.len());
        }

        let replaced = if only.is_empty() {
            replace_snapshot(self.store.as_ref(), &report.records).await
        } else {
            replace_symbol_levels(self.store.as_ref(), &report.records).await
        };
        let outcome = replaced
            .map_err(|e| {
                error!("Snapshot replacement failed: {}", e);
                e
            })
            .context("Failed to replace the daily_high_low snapshot")?;

        if let ReplaceOutcome::Replaced {
            captured_date,
            deleted,
            inserted,
        } = &outcome
        {
            println!("🧹 Cleared {} existing records for {}", deleted, captured_date);
            println!("✅ Successfully inserted {} records!", inserted);
        }

        Ok(RefreshSummary { report, outcome })
    }
}
