//! Cache-backed 조회 서비스.
//!
//! `StockDataRepository`의 읽기 연산을 키/TTL 정책 뒤로 감쌉니다.
//!
//! # 동작 방식
//!
//! 1. 요청 파라미터로 결정적 cache 키 생성
//! 2. cache hit 시 디코드 후 즉시 반환
//! 3. miss(또는 cache 오류/손상 항목) 시 저장소에서 계산
//! 4. 계산 결과를 TTL과 함께 best-effort 저장 후 반환
//!
//! cache 백엔드 장애는 절대 치명적이지 않습니다. 조회/저장 실패와
//! 디코드 실패는 warn 로그 후 miss로 처리되어 저장소 직접 조회로
//! 우아하게 저하됩니다.

use crate::error::Result;
use crate::storage::redis::RedisCache;
use crate::storage::stock_data::{PriceRecord, StockDataRepository};
use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use tracing::{debug, warn};

/// 목록 조회 TTL (5분).
const LIST_TTL_SECS: u64 = 300;
/// 심볼 카탈로그 TTL (1시간).
const SYMBOLS_TTL_SECS: u64 = 3600;
/// 최신 일봉 조회 TTL (5분).
const LATEST_TTL_SECS: u64 = 300;
/// 날짜 범위 조회 TTL (10분).
const RANGE_TTL_SECS: u64 = 600;

/// 부재 파라미터를 나타내는 예약 리터럴.
///
/// 유효한 티커(대문자 영숫자)나 ISO 날짜와 충돌하지 않습니다.
const ABSENT: &str = "-";

/// Cache-backed 시장 데이터 조회 서비스.
#[derive(Clone)]
pub struct CachedMarketData {
    repo: StockDataRepository,
    cache: Option<RedisCache>,
}

impl CachedMarketData {
    /// cache 없이 생성합니다 (모든 조회가 저장소로 직행).
    pub fn new(repo: StockDataRepository) -> Self {
        Self { repo, cache: None }
    }

    /// Redis cache를 연결합니다.
    pub fn with_cache(mut self, cache: RedisCache) -> Self {
        self.cache = Some(cache);
        self
    }

    // =========================================================================
    // Cache 키
    // =========================================================================

    fn list_key(symbol: Option<&str>, page: u32, per_page: u32) -> String {
        format!(
            "stocks:list:{}:{}:{}",
            symbol.unwrap_or(ABSENT),
            page,
            per_page
        )
    }

    fn symbols_key() -> String {
        "stocks:symbols".to_string()
    }

    fn latest_key(symbol: &str) -> String {
        format!("stocks:latest:{}", symbol)
    }

    fn range_key(symbol: &str, start: Option<NaiveDate>, end: Option<NaiveDate>) -> String {
        let start = start.map_or_else(|| ABSENT.to_string(), |d| d.to_string());
        let end = end.map_or_else(|| ABSENT.to_string(), |d| d.to_string());
        format!("stocks:history:{}:{}:{}", symbol, start, end)
    }

    // =========================================================================
    // Read-through 헬퍼
    // =========================================================================

    /// cache를 먼저 확인하고, miss면 `compute`로 계산 후 저장합니다.
    async fn cached<T, F, Fut>(&self, key: &str, ttl_secs: u64, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if let Some(cache) = &self.cache {
            match cache.get::<T>(key).await {
                Ok(Some(value)) => {
                    debug!(key = key, "cache hit");
                    return Ok(value);
                }
                Ok(None) => {}
                // 손상 항목 포함 모든 cache 오류는 miss로 처리
                Err(e) => warn!(key = key, error = %e, "cache 조회 실패, 저장소로 대체"),
            }
        }

        let value = compute().await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set_with_ttl(key, &value, ttl_secs).await {
                warn!(key = key, error = %e, "cache 저장 실패");
            }
        }

        Ok(value)
    }

    // =========================================================================
    // 조회 연산
    // =========================================================================

    /// 페이지 단위 일봉 목록 (cache 5분).
    pub async fn list_page(
        &self,
        symbol: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<PriceRecord>> {
        let key = Self::list_key(symbol, page, per_page);
        self.cached(&key, LIST_TTL_SECS, || {
            self.repo.list_page(symbol, page, per_page)
        })
        .await
    }

    /// 저장된 심볼 카탈로그 (cache 1시간).
    pub async fn symbols(&self) -> Result<Vec<String>> {
        let key = Self::symbols_key();
        self.cached(&key, SYMBOLS_TTL_SECS, || self.repo.symbols())
            .await
    }

    /// 한 심볼의 최신 일봉 (cache 5분).
    ///
    /// 찾은 레코드만 cache합니다. 부재(NotFound)는 cache하지 않고
    /// 매번 저장소에서 재확인합니다.
    pub async fn latest(&self, symbol: &str) -> Result<Option<PriceRecord>> {
        let key = Self::latest_key(symbol);

        if let Some(cache) = &self.cache {
            match cache.get::<PriceRecord>(&key).await {
                Ok(Some(record)) => {
                    debug!(key = %key, "cache hit");
                    return Ok(Some(record));
                }
                Ok(None) => {}
                Err(e) => warn!(key = %key, error = %e, "cache 조회 실패, 저장소로 대체"),
            }
        }

        let record = self.repo.latest(symbol).await?;

        if let (Some(cache), Some(record)) = (&self.cache, &record) {
            if let Err(e) = cache.set_with_ttl(&key, record, LATEST_TTL_SECS).await {
                warn!(key = %key, error = %e, "cache 저장 실패");
            }
        }

        Ok(record)
    }

    /// 한 심볼의 날짜 범위 조회 (cache 10분).
    pub async fn date_range(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<PriceRecord>> {
        let key = Self::range_key(symbol, start, end);
        self.cached(&key, RANGE_TTL_SECS, || {
            self.repo.date_range(symbol, start, end)
        })
        .await
    }
}
