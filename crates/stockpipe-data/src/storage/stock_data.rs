//! 일봉 시세 Repository.
//!
//! `stock_data` 테이블의 멱등 upsert와 조회를 담당합니다.
//! (symbol, date) 쌍이 자연 키이며, 같은 쌍에 대한 재수집은
//! 가격 필드를 덮어쓰고 `created_at`을 갱신합니다 (중복 생성 없음).
//!
//! # 배치 쓰기 정책
//!
//! 1. 배치 전체가 하나의 트랜잭션 안에서 처리됩니다.
//! 2. 개별 레코드의 데이터 오류(제약 위반 등)는 SAVEPOINT로 격리되어
//!    로그 후 건너뛰며, 나머지 레코드는 계속 진행됩니다.
//! 3. 인프라 오류(연결 유실 등)는 배치 전체를 롤백하고 전파됩니다.
//! 4. 한 건이라도 커밋되면 같은 트랜잭션에서 `stock_metadata`의
//!    신선도를 갱신합니다. 커밋 0건이면 신선도는 그대로 둡니다.

use crate::error::{DataError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Acquire, PgPool};
use stockpipe_core::DailyBar;
use tracing::{debug, info, warn};

/// 일봉 시세 데이터베이스 레코드.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PriceRecord {
    pub id: i32,
    /// 심볼 (예: "AAPL")
    pub symbol: String,
    /// 거래일
    pub date: NaiveDate,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량
    pub volume: i64,
    /// 마지막 기록 시각 (덮어쓰기 시 갱신)
    pub created_at: DateTime<Utc>,
}

/// 심볼별 신선도 마커.
///
/// 마지막으로 성공한 수집이 해당 심볼을 건드린 시각입니다.
/// 조회 정합성이 아닌 staleness 모니터링 용도입니다.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SymbolFreshness {
    pub symbol: String,
    pub last_updated: DateTime<Utc>,
}

/// 한 심볼의 저장 데이터 통계.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SymbolStatistics {
    pub symbol: String,
    /// 저장된 레코드 수
    pub data_points: i64,
    /// 가장 오래된 거래일
    pub first_date: NaiveDate,
    /// 가장 최근 거래일
    pub last_date: NaiveDate,
    /// 평균 종가
    pub avg_close: Decimal,
    /// 최저가 (low 기준)
    pub min_price: Decimal,
    /// 최고가 (high 기준)
    pub max_price: Decimal,
    /// 평균 거래량
    pub avg_volume: Decimal,
}

/// 일봉 시세 Repository.
#[derive(Clone)]
pub struct StockDataRepository {
    pool: PgPool,
}

impl StockDataRepository {
    /// 새 Repository 생성.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 필요한 테이블과 인덱스를 생성합니다 (존재하면 무시).
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stock_data (
                id SERIAL PRIMARY KEY,
                symbol VARCHAR(10) NOT NULL,
                date DATE NOT NULL,
                open NUMERIC(10, 2) NOT NULL,
                high NUMERIC(10, 2) NOT NULL,
                low NUMERIC(10, 2) NOT NULL,
                close NUMERIC(10, 2) NOT NULL,
                volume BIGINT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                UNIQUE (symbol, date)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS stock_metadata (
                symbol VARCHAR(10) PRIMARY KEY,
                last_updated TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_stock_data_symbol_date
             ON stock_data (symbol, date DESC)",
        )
        .execute(&self.pool)
        .await?;

        info!("스키마 준비 완료");
        Ok(())
    }

    // =========================================================================
    // 쓰기 경로
    // =========================================================================

    /// 한 심볼의 일봉 배치를 멱등 upsert 합니다.
    ///
    /// 실제로 커밋된 레코드 수를 반환하며, 개별 레코드 실패로 인해
    /// 배치 크기보다 작을 수 있습니다. 빈 배치는 DB를 건드리지 않고
    /// 0을 반환합니다.
    ///
    /// # Errors
    ///
    /// 배치에 다른 심볼의 레코드가 섞여 있으면 `InvalidData`
    /// (호출자 계약 위반). 인프라 오류는 배치를 롤백하고 전파됩니다.
    pub async fn save_daily_bars(&self, symbol: &str, bars: &[DailyBar]) -> Result<usize> {
        if bars.is_empty() {
            return Ok(0);
        }

        if let Some(stray) = bars.iter().find(|b| b.symbol != symbol) {
            return Err(DataError::InvalidData(format!(
                "batch for {} contains a bar for {}",
                symbol, stray.symbol
            )));
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        let mut written = 0usize;

        for bar in bars {
            // 개별 레코드 실패가 트랜잭션을 오염시키지 않도록 SAVEPOINT 사용
            let mut sp = tx
                .begin()
                .await
                .map_err(|e| DataError::ConnectionError(e.to_string()))?;

            let result = sqlx::query(
                r#"
                INSERT INTO stock_data (symbol, date, open, high, low, close, volume)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (symbol, date) DO UPDATE SET
                    open = EXCLUDED.open,
                    high = EXCLUDED.high,
                    low = EXCLUDED.low,
                    close = EXCLUDED.close,
                    volume = EXCLUDED.volume,
                    created_at = NOW()
                "#,
            )
            .bind(symbol)
            .bind(bar.date)
            .bind(bar.open)
            .bind(bar.high)
            .bind(bar.low)
            .bind(bar.close)
            .bind(bar.volume)
            .execute(&mut *sp)
            .await;

            match result {
                Ok(_) => {
                    sp.commit()
                        .await
                        .map_err(|e| DataError::ConnectionError(e.to_string()))?;
                    written += 1;
                }
                Err(sqlx::Error::Database(db_err)) => {
                    // 레코드 단위 데이터 오류: 건너뛰고 계속
                    sp.rollback()
                        .await
                        .map_err(|e| DataError::ConnectionError(e.to_string()))?;
                    warn!(
                        symbol = symbol,
                        date = %bar.date,
                        error = %db_err,
                        "레코드 저장 실패, 건너뜀"
                    );
                }
                // 인프라 오류: 트랜잭션 전체 롤백
                Err(e) => return Err(e.into()),
            }
        }

        if written > 0 {
            sqlx::query(
                r#"
                INSERT INTO stock_metadata (symbol, last_updated)
                VALUES ($1, NOW())
                ON CONFLICT (symbol) DO UPDATE SET last_updated = NOW()
                "#,
            )
            .bind(symbol)
            .execute(&mut *tx)
            .await
            .map_err(|e| DataError::InsertError(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| DataError::ConnectionError(e.to_string()))?;

        info!(
            symbol = symbol,
            batch = bars.len(),
            written = written,
            "일봉 배치 저장 완료"
        );

        Ok(written)
    }

    // =========================================================================
    // 읽기 경로
    // =========================================================================

    /// 일봉 목록을 페이지 단위로 조회합니다.
    ///
    /// 심볼 필터가 있으면 해당 심볼의 최신 날짜순, 없으면 최신 날짜순
    /// 후 심볼 오름차순입니다. 범위를 벗어난 페이지는 빈 목록을
    /// 반환합니다 (에러 아님).
    pub async fn list_page(
        &self,
        symbol: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<PriceRecord>> {
        let page = page.max(1);
        let per_page = per_page.max(1);
        let offset = (page as i64 - 1) * per_page as i64;

        let records: Vec<PriceRecord> = match symbol {
            Some(symbol) => {
                sqlx::query_as(
                    r#"
                    SELECT id, symbol, date, open, high, low, close, volume, created_at
                    FROM stock_data
                    WHERE symbol = $1
                    ORDER BY date DESC
                    LIMIT $2 OFFSET $3
                    "#,
                )
                .bind(symbol)
                .bind(per_page as i64)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as(
                    r#"
                    SELECT id, symbol, date, open, high, low, close, volume, created_at
                    FROM stock_data
                    ORDER BY date DESC, symbol ASC
                    LIMIT $1 OFFSET $2
                    "#,
                )
                .bind(per_page as i64)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?
            }
        };

        debug!(
            symbol = symbol.unwrap_or("*"),
            page = page,
            per_page = per_page,
            count = records.len(),
            "일봉 목록 조회"
        );

        Ok(records)
    }

    /// 한 심볼의 가장 최근 일봉을 조회합니다.
    ///
    /// 레코드가 없으면 `None` (정상 결과).
    pub async fn latest(&self, symbol: &str) -> Result<Option<PriceRecord>> {
        let record = sqlx::query_as(
            r#"
            SELECT id, symbol, date, open, high, low, close, volume, created_at
            FROM stock_data
            WHERE symbol = $1
            ORDER BY date DESC
            LIMIT 1
            "#,
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// 한 심볼의 날짜 범위 조회 (양끝 포함, 생략 시 무제한), 날짜 오름차순.
    ///
    /// 범위에 레코드가 없으면 빈 목록을 반환합니다 (에러 아님).
    pub async fn date_range(
        &self,
        symbol: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<PriceRecord>> {
        let records: Vec<PriceRecord> = sqlx::query_as(
            r#"
            SELECT id, symbol, date, open, high, low, close, volume, created_at
            FROM stock_data
            WHERE symbol = $1
              AND ($2::date IS NULL OR date >= $2)
              AND ($3::date IS NULL OR date <= $3)
            ORDER BY date ASC
            "#,
        )
        .bind(symbol)
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        debug!(
            symbol = symbol,
            start = ?start,
            end = ?end,
            count = records.len(),
            "날짜 범위 조회"
        );

        Ok(records)
    }

    /// 저장된 심볼 목록을 오름차순으로 조회합니다.
    pub async fn symbols(&self) -> Result<Vec<String>> {
        let symbols: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT symbol
            FROM stock_data
            ORDER BY symbol ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(symbols.into_iter().map(|(s,)| s).collect())
    }

    /// 한 심볼의 저장 데이터 통계를 조회합니다.
    ///
    /// 레코드가 없으면 `None`.
    pub async fn statistics(&self, symbol: &str) -> Result<Option<SymbolStatistics>> {
        let stats = sqlx::query_as(
            r#"
            SELECT
                symbol,
                COUNT(*) AS data_points,
                MIN(date) AS first_date,
                MAX(date) AS last_date,
                AVG(close) AS avg_close,
                MIN(low) AS min_price,
                MAX(high) AS max_price,
                AVG(volume) AS avg_volume
            FROM stock_data
            WHERE symbol = $1
            GROUP BY symbol
            "#,
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stats)
    }

    /// 한 심볼의 신선도 마커를 조회합니다.
    pub async fn freshness(&self, symbol: &str) -> Result<Option<SymbolFreshness>> {
        let freshness = sqlx::query_as(
            r#"
            SELECT symbol, last_updated
            FROM stock_metadata
            WHERE symbol = $1
            "#,
        )
        .bind(symbol)
        .fetch_optional(&self.pool)
        .await?;

        Ok(freshness)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn bar(symbol: &str, date: &str) -> DailyBar {
        DailyBar::new(
            symbol,
            NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            dec!(100.00),
            dec!(101.00),
            dec!(99.00),
            dec!(100.50),
            1_000_000,
        )
    }

    /// 네트워크 접근 없이 생성되는 풀 (검증 경로 테스트용).
    fn lazy_repo() -> StockDataRepository {
        let pool = PgPool::connect_lazy("postgres://localhost/stockpipe_test")
            .expect("lazy pool");
        StockDataRepository::new(pool)
    }

    #[tokio::test]
    async fn test_save_rejects_mixed_symbol_batch() {
        let repo = lazy_repo();
        let bars = vec![bar("AAPL", "2024-01-02"), bar("MSFT", "2024-01-02")];

        let err = repo.save_daily_bars("AAPL", &bars).await.unwrap_err();
        assert!(matches!(err, DataError::InvalidData(_)));
    }

    #[tokio::test]
    async fn test_save_empty_batch_is_noop() {
        let repo = lazy_repo();

        // DB를 건드리지 않으므로 연결 없이도 성공해야 함
        let written = repo.save_daily_bars("AAPL", &[]).await.unwrap();
        assert_eq!(written, 0);
    }
}
