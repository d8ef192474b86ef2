//! Pipeline drivers: token acquisition and the daily levels refresh

pub mod refresh;
pub mod token;

pub use refresh::{LevelsRefresher, RefreshSummary};
pub use token::{acquire_access_token, TokenOrchestrator};
