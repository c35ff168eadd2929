//! 일봉 시세 수집 모듈 (Ingestion Coordinator).
//!
//! 설정된 심볼들을 순서대로 순회하며 제공자 조회 → 멱등 upsert를
//! 수행합니다. 한 심볼의 실패(조회든 저장이든)는 다음 심볼 처리를
//! 막지 않으며, 모든 결과는 `RunSummary`에 집계됩니다.
//!
//! 재시도는 이 모듈의 관심사가 아닙니다. 외부 스케줄러가 다음 실행에서
//! 겹치는 범위를 다시 요청해도 upsert가 멱등이므로 안전합니다.

use crate::error::CollectorError;
use crate::{CollectorConfig, Result, RunSummary, SymbolOutcome};
use sqlx::PgPool;
use std::time::Instant;
use stockpipe_core::DateWindow;
use stockpipe_data::{DailyBarProvider, StockDataRepository};

/// 일봉 데이터 수집 실행.
///
/// # Errors
///
/// 심볼 목록이 비어 있거나 공백 심볼이 섞여 있으면 어떤 심볼도
/// 처리하기 전에 `Precondition` 에러로 중단합니다. 심볼 단위 오류는
/// 에러가 아니라 요약의 개별 결과로 기록됩니다.
pub async fn collect_prices(
    pool: &PgPool,
    provider: &dyn DailyBarProvider,
    config: &CollectorConfig,
    symbols: &[String],
    window: DateWindow,
) -> Result<RunSummary> {
    if symbols.is_empty() {
        return Err(CollectorError::Precondition(
            "수집할 심볼이 없습니다".to_string(),
        ));
    }
    if let Some(blank) = symbols.iter().find(|s| s.trim().is_empty()) {
        return Err(CollectorError::Precondition(format!(
            "공백 심볼이 포함되어 있습니다: {:?}",
            blank
        )));
    }

    let start = Instant::now();
    let mut summary = RunSummary::new();
    let repo = StockDataRepository::new(pool.clone());

    tracing::info!(
        symbols = symbols.len(),
        window = %window,
        "일봉 수집 시작"
    );

    for (idx, symbol) in symbols.iter().enumerate() {
        tracing::debug!(
            symbol = %symbol,
            progress = format!("{}/{}", idx + 1, symbols.len()),
            "수집 시작"
        );

        match provider.fetch_daily(symbol, window).await {
            Ok(bars) if bars.is_empty() => {
                // 휴장일 또는 제공자에 데이터 없음: 정상, 신선도 미변경
                summary.record(symbol, SymbolOutcome::NoData);
                tracing::debug!(symbol = %symbol, "데이터 없음");
            }
            Ok(bars) => match repo.save_daily_bars(symbol, &bars).await {
                Ok(rows) => {
                    summary.record(symbol, SymbolOutcome::Written { rows });
                    tracing::info!(symbol = %symbol, fetched = bars.len(), written = rows, "수집 및 저장 완료");
                }
                Err(e) => {
                    summary.record(
                        symbol,
                        SymbolOutcome::WriteFailed {
                            error: e.to_string(),
                        },
                    );
                    tracing::error!(symbol = %symbol, error = %e, "저장 실패");
                }
            },
            Err(e) => {
                summary.record(
                    symbol,
                    SymbolOutcome::FetchFailed {
                        error: e.to_string(),
                    },
                );
                tracing::error!(symbol = %symbol, error = %e, "조회 실패");
            }
        }

        // Rate limiting
        tokio::time::sleep(config.fetch.request_delay()).await;
    }

    summary.elapsed = start.elapsed();
    Ok(summary)
}
