use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_TOKEN_URL: &str = "https://api.groww.in/v1/token/api/access";
pub const DEFAULT_CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Credentials and endpoint for the Groww token exchange
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub api_key: String,
    pub api_secret: String,
    pub token_url: String,
    pub token_file: PathBuf,
    pub timeout_seconds: u64,
}

/// Historical-bar provider settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConfig {
    pub chart_url: String,
    pub exchange_suffix: String,
    pub history_range: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshConfig {
    pub sector_mapping_path: PathBuf,
    pub unclassified_sector: String,
    pub market: MarketConfig,
}

/// Load `.env` then `.env.local`; variables already set in the shell win.
pub fn load_env_files() {
    dotenv::dotenv().ok();
    dotenv::from_filename(".env.local").ok();
}

fn process_env(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn required<F>(lookup: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .filter(|v| !v.trim().is_empty())
        .with_context(|| format!("{} environment variable is required but not set", key))
}

fn parsed_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {} value: {}", key, raw)),
        None => Ok(default),
    }
}

impl BrokerConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(process_env)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            api_key: required(&lookup, "GROWW_API_KEY")?,
            api_secret: required(&lookup, "GROWW_API_SECRET")?,
            token_url: lookup("GROWW_TOKEN_URL").unwrap_or(defaults.token_url),
            token_file: lookup("TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.token_file),
            timeout_seconds: parsed_or(&lookup, "HTTP_TIMEOUT_SECONDS", defaults.timeout_seconds)?,
        })
    }
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_secret: String::new(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            token_file: PathBuf::from("current_access_token.txt"),
            timeout_seconds: 30,
        }
    }
}

impl MarketConfig {
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            chart_url: lookup("YAHOO_CHART_URL").unwrap_or(defaults.chart_url),
            exchange_suffix: lookup("EXCHANGE_SUFFIX").unwrap_or(defaults.exchange_suffix),
            history_range: lookup("HISTORY_RANGE").unwrap_or(defaults.history_range),
            timeout_seconds: parsed_or(&lookup, "HTTP_TIMEOUT_SECONDS", defaults.timeout_seconds)?,
        })
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            chart_url: DEFAULT_CHART_URL.to_string(),
            exchange_suffix: ".NS".to_string(),
            // Five sessions always cover yesterday across weekends and holidays
            history_range: "5d".to_string(),
            timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(process_env)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            url: required(&lookup, "DATABASE_URL")?,
            max_connections: parsed_or(&lookup, "DB_MAX_CONNECTIONS", defaults.max_connections)?,
            min_connections: parsed_or(&lookup, "DB_MIN_CONNECTIONS", defaults.min_connections)?,
        })
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgresql://localhost/breakout_levels".to_string(),
            max_connections: 5,
            min_connections: 1,
        }
    }
}

impl RefreshConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(process_env)
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            sector_mapping_path: lookup("SECTOR_MAPPING_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.sector_mapping_path),
            unclassified_sector: lookup("UNCLASSIFIED_SECTOR")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.unclassified_sector),
            market: MarketConfig::from_lookup(&lookup)?,
        })
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            sector_mapping_path: PathBuf::from("constants/sector-stocks-mapping.ts"),
            unclassified_sector: "Other".to_string(),
            market: MarketConfig::default(),
        }
    }
}
