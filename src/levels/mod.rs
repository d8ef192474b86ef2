//! Prior-day reference levels: aggregation from bars and snapshot storage

pub mod aggregator;
pub mod replacer;
pub mod store;

pub use aggregator::{aggregate_levels, aggregate_universe, AggregateReport};
pub use replacer::{replace_snapshot, replace_symbol_levels, ReplaceOutcome};
pub use store::{symbols_by_date, MemorySnapshotStore, PgSnapshotStore, SnapshotStore};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::DailyBar;

/// One row of `daily_high_low`: a symbol's previous-session levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct DailyLevel {
    pub symbol: String,
    pub sector: String,
    pub today_high: f64,
    pub today_low: f64,
    pub today_open: f64,
    pub today_close: f64,
    pub captured_date: NaiveDate,
}

impl DailyLevel {
    pub fn from_bar(symbol: &str, sector: &str, bar: &DailyBar) -> Self {
        Self {
            symbol: symbol.to_string(),
            sector: sector.to_string(),
            today_high: bar.high,
            today_low: bar.low,
            today_open: bar.open,
            today_close: bar.close,
            captured_date: bar.date,
        }
    }
}
