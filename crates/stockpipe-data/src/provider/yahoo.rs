//! Yahoo Finance 일봉 데이터 클라이언트.
//!
//! Yahoo Finance v8 chart API에서 일봉(OHLCV) 데이터를 조회합니다.
//!
//! # 응답 특성
//!
//! - 요청 범위보다 넓은 구간이 내려올 수 있으므로 범위 밖 행은 버립니다.
//! - 휴장일/데이터 없음은 빈 timestamp 배열로 내려오며 에러가 아닙니다.
//! - 개별 행의 가격 필드가 null인 경우가 있어 해당 행은 건너뜁니다.
//!
//! # 사용 예시
//! ```rust,ignore
//! let provider = YahooChartProvider::new();
//! let bars = provider.fetch_daily("AAPL", window).await?;
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use stockpipe_core::{DailyBar, DateWindow};
use tracing::debug;

use super::{DailyBarProvider, ProviderError};

const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Yahoo Finance v8 chart API 클라이언트.
pub struct YahooChartProvider {
    client: Client,
    base_url: String,
}

impl YahooChartProvider {
    /// 기본 엔드포인트로 생성.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// 커스텀 엔드포인트로 생성 (테스트용).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36")
            .build()
            .expect("HTTP 클라이언트 생성 실패");

        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl Default for YahooChartProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DailyBarProvider for YahooChartProvider {
    async fn fetch_daily(
        &self,
        symbol: &str,
        window: DateWindow,
    ) -> Result<Vec<DailyBar>, ProviderError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(ProviderError::InvalidSymbol(symbol));
        }

        // period2는 배타적이므로 종료일 다음 날 자정을 사용
        let period1 = window.start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let period2 = (window.end + Duration::days(1))
            .and_time(NaiveTime::MIN)
            .and_utc()
            .timestamp();

        let url = format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d",
            self.base_url, symbol, period1, period2
        );

        debug!(symbol = %symbol, window = %window, "Yahoo Finance 일봉 조회");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Http {
                symbol: symbol.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                symbol: symbol.clone(),
                status,
            });
        }

        let body: ChartResponse =
            response.json().await.map_err(|e| ProviderError::Parse {
                symbol: symbol.clone(),
                reason: e.to_string(),
            })?;

        if let Some(error) = body.chart.error {
            return Err(ProviderError::Upstream {
                symbol: symbol.clone(),
                message: format!("{}: {}", error.code, error.description),
            });
        }

        let result = match body.chart.result.and_then(|mut r| {
            if r.is_empty() {
                None
            } else {
                Some(r.remove(0))
            }
        }) {
            Some(result) => result,
            // 결과도 에러도 없으면 데이터 없음으로 취급
            None => return Ok(Vec::new()),
        };

        let timestamps = result.timestamp.unwrap_or_default();
        let quote = match result.indicators.quote.into_iter().next() {
            Some(quote) => quote,
            None => return Ok(Vec::new()),
        };

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, ts) in timestamps.iter().enumerate() {
            let date = match DateTime::from_timestamp(*ts, 0) {
                Some(dt) => dt.date_naive(),
                None => continue,
            };
            // Yahoo는 요청 범위 밖 데이터를 덧붙여 내려주기도 함
            if !window.contains(date) {
                continue;
            }

            let (open, high, low, close) = match (
                quote.open.get(i).copied().flatten(),
                quote.high.get(i).copied().flatten(),
                quote.low.get(i).copied().flatten(),
                quote.close.get(i).copied().flatten(),
            ) {
                (Some(o), Some(h), Some(l), Some(c)) => (o, h, l, c),
                // 가격 필드가 비어 있는 행은 건너뜀
                _ => continue,
            };

            let (open, high, low, close) = match (
                Decimal::from_f64_retain(open),
                Decimal::from_f64_retain(high),
                Decimal::from_f64_retain(low),
                Decimal::from_f64_retain(close),
            ) {
                (Some(o), Some(h), Some(l), Some(c)) => (o, h, l, c),
                _ => continue,
            };

            let volume = quote.volume.get(i).copied().flatten().unwrap_or(0);

            bars.push(DailyBar::new(
                symbol.as_str(),
                date,
                open,
                high,
                low,
                close,
                volume,
            ));
        }

        debug!(symbol = %symbol, count = bars.len(), "일봉 조회 완료");
        Ok(bars)
    }
}

// =============================================================================
// Yahoo chart API 응답 구조
// =============================================================================

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Deserialize, Default)]
struct QuoteBlock {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<i64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use mockito::Matcher;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn window(start: &str, end: &str) -> DateWindow {
        DateWindow::new(date(start), date(end)).unwrap()
    }

    /// 날짜를 UTC 자정 타임스탬프로 변환.
    fn ts(s: &str) -> i64 {
        date(s).and_time(NaiveTime::MIN).and_utc().timestamp()
    }

    #[tokio::test]
    async fn test_fetch_daily_parses_bars() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "chart": {
                "result": [{
                    "timestamp": [ts("2024-01-02"), ts("2024-01-03")],
                    "indicators": {
                        "quote": [{
                            "open": [185.123, 184.22],
                            "high": [186.40, 185.88],
                            "low": [183.89, 183.43],
                            "close": [185.64, 184.25],
                            "volume": [82488700, 58414500]
                        }]
                    }
                }],
                "error": null
            }
        });

        let mock = server
            .mock("GET", "/v8/finance/chart/AAPL")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
            .create_async()
            .await;

        let provider = YahooChartProvider::with_base_url(server.url());
        let bars = provider
            .fetch_daily("AAPL", window("2024-01-01", "2024-01-05"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].symbol, "AAPL");
        assert_eq!(bars[0].date, date("2024-01-02"));
        assert_eq!(bars[0].open, dec!(185.12));
        assert_eq!(bars[0].close, dec!(185.64));
        assert_eq!(bars[1].volume, 58_414_500);
    }

    #[tokio::test]
    async fn test_fetch_daily_empty_range_is_not_an_error() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "chart": {
                "result": [{
                    "timestamp": null,
                    "indicators": { "quote": [{}] }
                }],
                "error": null
            }
        });

        server
            .mock("GET", "/v8/finance/chart/AAPL")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let provider = YahooChartProvider::with_base_url(server.url());
        let bars = provider
            .fetch_daily("AAPL", window("2024-01-06", "2024-01-07"))
            .await
            .unwrap();

        assert!(bars.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_daily_upstream_error() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "chart": {
                "result": null,
                "error": { "code": "Not Found", "description": "No data found, symbol may be delisted" }
            }
        });

        server
            .mock("GET", "/v8/finance/chart/NOPE")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let provider = YahooChartProvider::with_base_url(server.url());
        let err = provider
            .fetch_daily("NOPE", window("2024-01-01", "2024-01-05"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Upstream { .. }));
        assert_eq!(err.symbol(), "NOPE");
    }

    #[tokio::test]
    async fn test_fetch_daily_skips_null_rows_and_out_of_window() {
        let mut server = mockito::Server::new_async().await;
        let body = json!({
            "chart": {
                "result": [{
                    // 마지막 행은 요청 범위 밖
                    "timestamp": [ts("2024-01-02"), ts("2024-01-03"), ts("2024-02-01")],
                    "indicators": {
                        "quote": [{
                            "open": [185.0, null, 190.0],
                            "high": [186.0, 185.0, 191.0],
                            "low": [184.0, 183.0, 189.0],
                            "close": [185.5, 184.0, 190.5],
                            "volume": [1000, 2000, 3000]
                        }]
                    }
                }],
                "error": null
            }
        });

        server
            .mock("GET", "/v8/finance/chart/MSFT")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let provider = YahooChartProvider::with_base_url(server.url());
        let bars = provider
            .fetch_daily("MSFT", window("2024-01-01", "2024-01-05"))
            .await
            .unwrap();

        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].date, date("2024-01-02"));
    }

    #[tokio::test]
    async fn test_fetch_daily_http_status_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/v8/finance/chart/AAPL")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let provider = YahooChartProvider::with_base_url(server.url());
        let err = provider
            .fetch_daily("AAPL", window("2024-01-01", "2024-01-05"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Status { .. }));
    }

    #[tokio::test]
    async fn test_fetch_daily_rejects_blank_symbol() {
        let provider = YahooChartProvider::new();
        let err = provider
            .fetch_daily("  ", window("2024-01-01", "2024-01-05"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::InvalidSymbol(_)));
    }
}
