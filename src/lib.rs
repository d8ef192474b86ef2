// breakout-levels - Groww access tokens and prior-day reference levels
// Acquires a short-lived broker access token via the key/secret checksum
// handshake, and refreshes the daily_high_low table that the breakout
// scanner compares live prices against.

#![deny(clippy::unwrap_used)]

pub mod auth;
pub mod cli;
pub mod config;
pub mod data;
pub mod db;
pub mod levels;
pub mod orchestrator;
pub mod universe;

// Re-export commonly used items
pub use auth::AccessToken;
pub use config::{BrokerConfig, DatabaseConfig, MarketConfig, RefreshConfig};
pub use data::{DailyBar, DataError, DataResult};
pub use levels::DailyLevel;
pub use universe::SectorUniverse;
