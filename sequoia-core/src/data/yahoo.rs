//! Yahoo Finance fetch client.
//!
//! Fetches daily OHLCV bars from Yahoo's v8 chart API. Handles rate limiting,
//! retries with exponential backoff inside one `fetch` call, response parsing,
//! and the shared circuit breaker.
//!
//! Mainland A-share codes (six digits) are mapped to Yahoo's exchange
//! suffixes; everything else is passed through as a ticker.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataError, DataProvider, RawBar};
use crate::domain::Symbol;
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

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
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
}

/// Yahoo Finance fetch client.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .expect("failed to build HTTP client");

        Self {
            client,
            circuit_breaker,
            max_retries: 2,
            base_delay: Duration::from_millis(500),
        }
    }

    /// Yahoo ticker for a symbol code.
    pub fn ticker(code: &str) -> String {
        let is_a_share = code.len() == 6 && code.bytes().all(|b| b.is_ascii_digit());
        if !is_a_share {
            return code.to_string();
        }
        match code.as_bytes()[0] {
            b'6' | b'9' => format!("{code}.SS"),
            b'0' | b'2' | b'3' => format!("{code}.SZ"),
            _ => code.to_string(),
        }
    }

    fn chart_url(ticker: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = end
            .succ_opt()
            .unwrap_or(end)
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp();
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{ticker}\
             ?period1={start_ts}&period2={end_ts}&interval=1d"
        )
    }

    /// Parse the chart API response into raw bars.
    ///
    /// An unknown symbol maps to `SymbolNotFound`; a known symbol without
    /// bars in range maps to an empty vector.
    fn parse_response(code: &str, resp: ChartResponse) -> Result<Vec<RawBar>, DataError> {
        let result = match resp.chart.result {
            Some(result) => result,
            None => {
                return Err(match resp.chart.error {
                    Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                        code: code.to_string(),
                    },
                    Some(err) => DataError::ResponseFormatChanged(format!(
                        "{}: {}",
                        err.code, err.description
                    )),
                    None => DataError::ResponseFormatChanged("empty result with no error".into()),
                })
            }
        };

        let Some(data) = result.into_iter().next() else {
            return Ok(Vec::new());
        };
        let Some(timestamps) = data.timestamp else {
            return Ok(Vec::new());
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;

            let field = |col: &Vec<Option<f64>>| col.get(i).copied().flatten();
            let (open, high, low, close) = (
                field(&quote.open),
                field(&quote.high),
                field(&quote.low),
                field(&quote.close),
            );

            // Halted days come back as all-null rows.
            let Some(close) = close else {
                continue;
            };

            bars.push(RawBar {
                date,
                open: open.unwrap_or(close),
                high: high.unwrap_or(close),
                low: low.unwrap_or(close),
                close,
                volume: field(&quote.volume).unwrap_or(0.0),
            });
        }

        Ok(bars)
    }

    fn fetch_with_retry(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawBar>, DataError> {
        let url = Self::chart_url(&Self::ticker(code), start, end);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                std::thread::sleep(self.base_delay * 2u32.pow(attempt - 1));
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            let resp = match self.client.get(&url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    self.circuit_breaker.record_failure();
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();
            if status == reqwest::StatusCode::FORBIDDEN {
                self.circuit_breaker.trip();
                return Err(DataError::CircuitBreakerTripped);
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(DataError::SymbolNotFound {
                    code: code.to_string(),
                });
            }
            if status == reqwest::StatusCode::UNAUTHORIZED {
                return Err(DataError::AuthenticationRequired(
                    "Yahoo Finance requires authentication".into(),
                ));
            }
            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                self.circuit_breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(DataError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }
            if !status.is_success() {
                self.circuit_breaker.record_failure();
                last_error = Some(DataError::Other(format!("HTTP {status} for {code}")));
                continue;
            }

            let chart: ChartResponse = resp.json().map_err(|e| {
                DataError::ResponseFormatChanged(format!("failed to parse response for {code}: {e}"))
            })?;
            let bars = Self::parse_response(code, chart)?;
            self.circuit_breaker.record_success();
            return Ok(bars);
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &Symbol,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawBar>, DataError> {
        self.fetch_with_retry(&symbol.code, start, end)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_share_codes_get_exchange_suffix() {
        assert_eq!(YahooProvider::ticker("600519"), "600519.SS");
        assert_eq!(YahooProvider::ticker("000001"), "000001.SZ");
        assert_eq!(YahooProvider::ticker("300750"), "300750.SZ");
        assert_eq!(YahooProvider::ticker("SPY"), "SPY");
    }

    #[test]
    fn parses_chart_payload_and_skips_halted_rows() {
        let json = r#"{"chart":{"result":[{"timestamp":[1704153600,1704240000,1704326400],
            "indicators":{"quote":[{"open":[10.0,null,10.4],"high":[10.5,null,10.9],
            "low":[9.9,null,10.2],"close":[10.2,null,10.8],"volume":[1000,null,1500]}]}}],
            "error":null}}"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        let bars = YahooProvider::parse_response("600519", resp).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[1].close, 10.8);
        assert_eq!(bars[1].volume, 1500.0);
    }

    #[test]
    fn not_found_error_maps_to_missing_data() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        let err = YahooProvider::parse_response("XXXX", resp).unwrap_err();
        assert!(err.is_missing_data());
    }

    #[test]
    fn url_covers_end_date_inclusive() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let url = YahooProvider::chart_url("SPY", start, end);
        assert!(url.contains("period1=1704067200"));
        assert!(url.contains("period2=1706745600"));
    }
}
