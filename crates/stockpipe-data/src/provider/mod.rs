//! 데이터 Provider 모듈.
//!
//! 외부 소스에서 일봉 시세를 가져오는 Provider들을 정의합니다.
//!
//! ## Yahoo Finance
//! - `YahooChartProvider`: Yahoo Finance v8 chart API 클라이언트
//! - 미국/글로벌 주식 일봉 OHLCV 데이터

use async_trait::async_trait;
use stockpipe_core::{DailyBar, DateWindow};
use thiserror::Error;

pub mod yahoo;

pub use yahoo::YahooChartProvider;

/// Provider 에러.
///
/// 어느 심볼 요청이 실패했는지 로그에 남길 수 있도록
/// 모든 변형이 심볼을 함께 보관합니다.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP 요청 실패 ({symbol}): {source}")]
    Http {
        symbol: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("HTTP 상태 오류 ({symbol}): {status}")]
    Status {
        symbol: String,
        status: reqwest::StatusCode,
    },

    #[error("응답 파싱 실패 ({symbol}): {reason}")]
    Parse { symbol: String, reason: String },

    #[error("제공자 오류 ({symbol}): {message}")]
    Upstream { symbol: String, message: String },

    #[error("잘못된 심볼: {0:?}")]
    InvalidSymbol(String),
}

impl ProviderError {
    /// 실패한 요청의 심볼을 반환합니다.
    pub fn symbol(&self) -> &str {
        match self {
            Self::Http { symbol, .. }
            | Self::Status { symbol, .. }
            | Self::Parse { symbol, .. }
            | Self::Upstream { symbol, .. } => symbol,
            Self::InvalidSymbol(symbol) => symbol,
        }
    }
}

/// 일봉 시세 제공자.
///
/// 요청 범위에 데이터가 없으면 빈 벡터를 반환합니다 (휴장일 등).
/// 빈 결과는 에러가 아니며 수집 실행을 중단시키지 않습니다.
#[async_trait]
pub trait DailyBarProvider: Send + Sync {
    /// 한 심볼의 일봉 시세를 날짜 범위(양끝 포함)로 조회합니다.
    async fn fetch_daily(
        &self,
        symbol: &str,
        window: DateWindow,
    ) -> Result<Vec<DailyBar>, ProviderError>;
}
