use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{BrokerConfig, DatabaseConfig, RefreshConfig};
use crate::data::YahooBarSource;
use crate::db::Database;
use crate::levels::{MemorySnapshotStore, PgSnapshotStore, SnapshotStore};
use crate::orchestrator::{acquire_access_token, LevelsRefresher};
use crate::universe::{load_sector_universe, SectorUniverse};

/// Generate a Groww access token and write it to the token file
pub async fn token() -> Result<()> {
    let config = BrokerConfig::load()?;

    match acquire_access_token(&config).await {
        Some(token) => {
            println!("\n📝 QUICK REFERENCE - Copy this token for API calls:");
            println!("{}", "-".repeat(60));
            println!("{}", token.token);
            println!("{}", "-".repeat(60));
            Ok(())
        }
        None => bail!("No access token was obtained"),
    }
}

fn load_universe(config: &RefreshConfig) -> Result<SectorUniverse> {
    let universe = load_sector_universe(&config.sector_mapping_path).with_context(|| {
        format!(
            "Failed to load stocks from {}",
            config.sector_mapping_path.display()
        )
    })?;

    println!(
        "✅ Loaded {} sectors with {} total stocks",
        universe.len(),
        universe.symbol_count()
    );
    Ok(universe)
}

/// Refresh the daily_high_low snapshot from Yahoo Finance
pub async fn refresh(symbols: Vec<String>, dry_run: bool) -> Result<()> {
    // Everything that can be misconfigured is checked before the first request
    let config = RefreshConfig::load()?;
    let universe = load_universe(&config)?;
    let database_config = if dry_run {
        None
    } else {
        Some(DatabaseConfig::load()?)
    };

    let source = Arc::new(YahooBarSource::new(&config.market)?);

    let (store, database) = match database_config {
        Some(db_config) => {
            let db = Database::new(&db_config).await?;
            db.health_check().await?;
            let store: Arc<dyn SnapshotStore> = Arc::new(PgSnapshotStore::new(db.pool.clone()));
            (store, Some(db))
        }
        None => {
            warn!("Dry run: records are kept in memory and discarded");
            let store: Arc<dyn SnapshotStore> = Arc::new(MemorySnapshotStore::new());
            (store, None)
        }
    };

    let refresher = LevelsRefresher::new(source, store, config.unclassified_sector.clone());
    let result = refresher.run(&universe, &symbols).await;

    if let Some(db) = database {
        db.close().await;
    }

    let summary = result?;
    if !summary.report.failures.is_empty() {
        let preview: Vec<&str> = summary
            .report
            .failures
            .iter()
            .take(10)
            .map(String::as_str)
            .collect();
        println!("⚠️  Failed symbols: {}", preview.join(", "));
    }

    println!("\n🎉 Done!");
    Ok(())
}

/// Print a stored snapshot
pub async fn show(date: Option<NaiveDate>) -> Result<()> {
    let db = Database::new(&DatabaseConfig::load()?).await?;
    let store = PgSnapshotStore::new(db.pool.clone());

    let date = match date {
        Some(date) => Some(date),
        None => store.latest_captured_date().await?,
    };
    let Some(date) = date else {
        println!("No daily_high_low data stored yet");
        db.close().await;
        return Ok(());
    };

    let records = store.load_snapshot(date).await?;
    db.close().await;

    println!("\n📅 Snapshot for {} ({} records)\n", date, records.len());
    println!(
        "{:<14} {:<24} {:>10} {:>10} {:>10} {:>10}",
        "SYMBOL", "SECTOR", "HIGH", "LOW", "OPEN", "CLOSE"
    );
    for record in &records {
        println!(
            "{:<14} {:<24} {:>10.2} {:>10.2} {:>10.2} {:>10.2}",
            record.symbol,
            record.sector,
            record.today_high,
            record.today_low,
            record.today_open,
            record.today_close
        );
    }
    Ok(())
}

/// Delete the stored snapshot for `date`
pub async fn clear(date: NaiveDate) -> Result<()> {
    let db = Database::new(&DatabaseConfig::load()?).await?;
    let store = PgSnapshotStore::new(db.pool.clone());

    let deleted = store.delete_snapshot(date).await;
    db.close().await;
    let deleted = deleted?;

    info!(%date, deleted, "Snapshot cleared");
    println!("🧹 Deleted {} records for {}", deleted, date);
    Ok(())
}

/// Validate the sector mapping without touching the network
pub fn sectors() -> Result<()> {
    let config = RefreshConfig::load()?;
    let universe = load_universe(&config)?;

    for (sector, symbols) in universe.sectors() {
        println!("{:<32} {:>4}", sector, symbols.len());
    }

    let shared = universe.shared_symbols();
    if !shared.is_empty() {
        println!("\n⚠️  Symbols listed under more than one sector (first sector wins):");
        for (symbol, sectors) in shared {
            println!("   {} -> {}", symbol, sectors.join(", "));
        }
    }
    Ok(())
}
