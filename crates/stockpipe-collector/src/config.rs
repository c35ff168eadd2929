//! 환경변수 기반 설정 모듈.

use crate::error::CollectorError;
use crate::Result;
use chrono::NaiveDate;
use std::time::Duration;
use stockpipe_core::DateWindow;

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// 데이터베이스 URL
    pub database_url: String,
    /// 수집 대상 심볼 목록 (순서 유지, 중복 제거)
    pub symbols: Vec<String>,
    /// 수집 범위/속도 설정
    pub fetch: FetchConfig,
    /// 데몬 모드 설정
    pub daemon: DaemonConfig,
}

/// 수집 범위/속도 설정
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// 기본 수집 범위 일수 (종료일로부터 거슬러 올라감)
    pub window_days: i64,
    /// 수집 시작 날짜 (YYYY-MM-DD, 생략 시 window_days로 계산)
    pub start_date: Option<NaiveDate>,
    /// 수집 종료 날짜 (YYYY-MM-DD, 생략 시 오늘)
    pub end_date: Option<NaiveDate>,
    /// API 요청 간 딜레이 (밀리초)
    pub request_delay_ms: u64,
}

/// 데몬 모드 설정
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// 수집 실행 주기 (분 단위, 기본: 하루)
    pub interval_minutes: u64,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL").map_err(|_| {
            CollectorError::Config("DATABASE_URL 환경변수가 설정되지 않았습니다".to_string())
        })?;

        let symbols = parse_symbol_list(
            &std::env::var("STOCK_SYMBOLS").unwrap_or_else(|_| "AAPL,MSFT,GOOGL".to_string()),
        );

        Ok(Self {
            database_url,
            symbols,
            fetch: FetchConfig {
                window_days: env_var_parse("FETCH_WINDOW_DAYS", 7),
                start_date: env_var_date("FETCH_START_DATE")?,
                end_date: env_var_date("FETCH_END_DATE")?,
                request_delay_ms: env_var_parse("REQUEST_DELAY_MS", 500),
            },
            daemon: DaemonConfig {
                interval_minutes: env_var_parse("DAEMON_INTERVAL_MINUTES", 1440),
            },
        })
    }
}

impl FetchConfig {
    /// API 요청 간 딜레이를 Duration으로 반환
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    /// 이번 실행의 수집 범위를 결정합니다.
    ///
    /// 명시된 날짜가 없으면 오늘을 종료일로 최근 `window_days`일입니다.
    pub fn resolve_window(&self) -> Result<DateWindow> {
        let fallback = DateWindow::last_days(self.window_days);
        let start = self.start_date.unwrap_or(fallback.start);
        let end = self.end_date.unwrap_or(fallback.end);

        DateWindow::new(start, end).ok_or_else(|| {
            CollectorError::Config(format!(
                "시작일({})이 종료일({})보다 늦습니다",
                start, end
            ))
        })
    }
}

impl DaemonConfig {
    /// 수집 실행 주기를 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

/// 쉼표로 구분된 심볼 목록 파싱 (공백 제거, 대문자화, 순서 유지 중복 제거)
pub fn parse_symbol_list(raw: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for part in raw.split(',') {
        let symbol = part.trim().to_uppercase();
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// 환경변수에서 날짜(YYYY-MM-DD) 파싱
fn env_var_date(key: &str) -> Result<Option<NaiveDate>> {
    match std::env::var(key) {
        Ok(raw) => {
            let date = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
                CollectorError::Config(format!("{}의 날짜 형식이 잘못되었습니다: {}", key, raw))
            })?;
            Ok(Some(date))
        }
        Err(_) => Ok(None),
    }
}
