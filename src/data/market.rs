use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{DataError, DataResult};
use crate::config::MarketConfig;

/// One daily OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// Source of daily history for a bare ticker symbol.
///
/// Implementations return bars oldest first.
#[async_trait]
pub trait BarSource: Send + Sync {
    fn name(&self) -> &str;

    async fn daily_history(&self, symbol: &str) -> DataResult<Vec<DailyBar>>;
}

/// Yahoo Finance v8 chart API response structures
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

pub struct YahooBarSource {
    client: reqwest::Client,
    chart_url: String,
    exchange_suffix: String,
    range: String,
    timeout_seconds: u64,
}

impl YahooBarSource {
    pub fn new(config: &MarketConfig) -> DataResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_seconds))
            .user_agent("Mozilla/5.0 (compatible; breakout-levels/0.1.0)")
            .build()?;

        Ok(Self {
            client,
            chart_url: config.chart_url.trim_end_matches('/').to_string(),
            exchange_suffix: config.exchange_suffix.clone(),
            range: config.history_range.clone(),
            timeout_seconds: config.timeout_seconds,
        })
    }

    /// Exchange-qualified identifier, e.g. `TCS` -> `TCS.NS`
    pub fn qualified_symbol(&self, symbol: &str) -> String {
        if self.exchange_suffix.is_empty() || symbol.ends_with(&self.exchange_suffix) {
            symbol.to_string()
        } else {
            format!("{}{}", symbol, self.exchange_suffix)
        }
    }

    fn request_url(&self, symbol: &str) -> String {
        format!(
            "{}/{}?interval=1d&range={}",
            self.chart_url,
            self.qualified_symbol(symbol),
            self.range
        )
    }
}

#[async_trait]
impl BarSource for YahooBarSource {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    async fn daily_history(&self, symbol: &str) -> DataResult<Vec<DailyBar>> {
        let url = self.request_url(symbol);
        tracing::debug!("Yahoo chart request: GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DataError::from_transport(e, self.timeout_seconds))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DataError::api_error(
                status.as_u16(),
                format!("Yahoo chart for {}: {}", symbol, error_text),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DataError::from_transport(e, self.timeout_seconds))?;

        parse_chart_response(symbol, &body)
    }
}

/// Parse a v8 chart body into bars, oldest first.
///
/// Rows missing any of open/high/low/close are dropped; a missing volume is 0.
/// Dates are taken in the exchange's local time using `meta.gmtoffset`.
pub fn parse_chart_response(symbol: &str, body: &str) -> DataResult<Vec<DailyBar>> {
    let response: ChartResponse = serde_json::from_str(body)
        .map_err(|e| DataError::parse_error(format!("chart response for {}: {}", symbol, e)))?;

    let results = match response.chart.result {
        Some(results) => results,
        None => {
            return Err(match response.chart.error {
                Some(err) if err.code == "Not Found" => DataError::NoData {
                    symbol: symbol.to_string(),
                },
                Some(err) => DataError::parse_error(format!("{}: {}", err.code, err.description)),
                None => DataError::parse_error("empty chart result with no error"),
            })
        }
    };

    let data = results.into_iter().next().ok_or_else(|| DataError::NoData {
        symbol: symbol.to_string(),
    })?;

    let offset_secs = data.meta.as_ref().and_then(|m| m.gmtoffset).unwrap_or(0);
    let offset = FixedOffset::east_opt(offset_secs)
        .ok_or_else(|| DataError::parse_error(format!("invalid gmtoffset: {}", offset_secs)))?;

    // No timestamps means no sessions in the window
    let timestamps = data.timestamp.unwrap_or_default();
    let quote = match data.indicators.quote.into_iter().next() {
        Some(quote) => quote,
        None if timestamps.is_empty() => return Ok(Vec::new()),
        None => return Err(DataError::parse_error("chart response has no quote data")),
    };

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let date = DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.with_timezone(&offset).date_naive())
            .ok_or_else(|| DataError::parse_error(format!("invalid timestamp: {}", ts)))?;

        let open = quote.open.get(i).copied().flatten();
        let high = quote.high.get(i).copied().flatten();
        let low = quote.low.get(i).copied().flatten();
        let close = quote.close.get(i).copied().flatten();

        let (Some(open), Some(high), Some(low), Some(close)) = (open, high, low, close) else {
            tracing::debug!("Skipping incomplete bar for {} on {}", symbol, date);
            continue;
        };

        let volume = quote.volume.get(i).copied().flatten().unwrap_or(0.0);

        bars.push(DailyBar {
            date,
            open,
            high,
            low,
            close,
            volume: volume as i64,
        });
    }

    Ok(bars)
}

/// The second-most-recent bar: the latest may still be the forming session.
pub fn select_previous_session(bars: &[DailyBar]) -> Option<DailyBar> {
    if bars.len() < 2 {
        return None;
    }
    bars.get(bars.len() - 2).cloned()
}

/// Fetch "yesterday" for one symbol. Any failure is logged and yields `None`.
pub async fn fetch_previous_session(source: &dyn BarSource, symbol: &str) -> Option<DailyBar> {
    let bars = match source.daily_history(symbol).await {
        Ok(bars) => bars,
        Err(e) => {
            if e.is_symbol_scoped() {
                tracing::warn!(symbol, source = source.name(), "History fetch failed: {}", e);
            } else {
                tracing::error!(symbol, source = source.name(), "History fetch failed: {}", e);
            }
            return None;
        }
    };

    let selected = select_previous_session(&bars);
    if selected.is_none() {
        let err = DataError::InsufficientHistory {
            symbol: symbol.to_string(),
            bars: bars.len(),
        };
        tracing::warn!(symbol, source = source.name(), "{}", err);
    }
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(day: u32, close: f64) -> DailyBar {
        DailyBar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close - 1.0,
            high: close + 2.0,
            low: close - 3.0,
            close,
            volume: 1000 + day as i64,
        }
    }

    #[test]
    fn test_select_previous_session_picks_second_to_last() {
        let bars: Vec<DailyBar> = (1..=5).map(|d| bar(d, 100.0 + d as f64)).collect();
        let selected = select_previous_session(&bars).unwrap();
        assert_eq!(selected, bar(4, 104.0));
    }

    #[test]
    fn test_select_previous_session_needs_two_bars() {
        assert!(select_previous_session(&[]).is_none());
        assert!(select_previous_session(&[bar(1, 100.0)]).is_none());
        assert_eq!(select_previous_session(&[bar(1, 100.0), bar(2, 101.0)]), Some(bar(1, 100.0)));
    }

    #[test]
    fn test_parse_chart_response_uses_exchange_offset() {
        // 2024-01-01T03:45:00Z and 2024-01-02T03:45:00Z, IST sessions
        let body = r#"{
            "chart": {
                "result": [{
                    "meta": {"symbol": "TCS.NS", "gmtoffset": 19800},
                    "timestamp": [1704080700, 1704167100],
                    "indicators": {"quote": [{
                        "open": [3700.0, 3710.5],
                        "high": [3750.0, 3760.0],
                        "low": [3690.0, 3701.0],
                        "close": [3740.0, 3755.0],
                        "volume": [1200000, null]
                    }]}
                }],
                "error": null
            }
        }"#;

        let bars = parse_chart_response("TCS", body).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(bars[0].high, 3750.0);
        assert_eq!(bars[0].volume, 1_200_000);
        assert_eq!(bars[1].volume, 0);
    }

    #[test]
    fn test_parse_chart_response_drops_incomplete_rows() {
        let body = r#"{
            "chart": {
                "result": [{
                    "meta": {"gmtoffset": 19800},
                    "timestamp": [1704080700, 1704167100, 1704253500],
                    "indicators": {"quote": [{
                        "open": [1.0, null, 3.0],
                        "high": [1.5, null, 3.5],
                        "low": [0.5, null, 2.5],
                        "close": [1.2, null, 3.2],
                        "volume": [10, null, 30]
                    }]}
                }],
                "error": null
            }
        }"#;

        let bars = parse_chart_response("INFY", body).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].close, 3.2);
    }

    #[test]
    fn test_parse_chart_response_not_found() {
        let body = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#;
        let err = parse_chart_response("ZZZZ", body).unwrap_err();
        assert!(matches!(err, DataError::NoData { .. }));
    }

    #[test]
    fn test_parse_chart_response_malformed_body() {
        let err = parse_chart_response("TCS", "<html>rate limited</html>").unwrap_err();
        assert!(matches!(err, DataError::Parse { .. }));
    }

    #[test]
    fn test_qualified_symbol() {
        let source = YahooBarSource::new(&MarketConfig::default()).unwrap();
        assert_eq!(source.qualified_symbol("TCS"), "TCS.NS");
        assert_eq!(source.qualified_symbol("M&M.NS"), "M&M.NS");
    }
}
