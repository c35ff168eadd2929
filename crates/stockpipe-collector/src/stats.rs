//! 수집 실행 요약.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 한 심볼의 수집 결과.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SymbolOutcome {
    /// 커밋된 레코드 수 (개별 레코드 실패로 배치 크기보다 작을 수 있음)
    Written { rows: usize },
    /// 조회 성공, 범위 내 데이터 없음 (휴장일 등)
    NoData,
    /// 제공자 조회 실패
    FetchFailed { error: String },
    /// 저장 실패 (배치 롤백)
    WriteFailed { error: String },
}

/// 심볼별 결과 리포트.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolReport {
    pub symbol: String,
    pub outcome: SymbolOutcome,
}

/// 수집 실행 요약.
///
/// 모든 심볼의 개별 결과와 총 커밋 레코드 수를 담습니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    /// 이번 실행에서 커밋된 총 레코드 수
    pub total_written: usize,
    /// 심볼별 결과 (처리 순서대로)
    pub reports: Vec<SymbolReport>,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunSummary {
    /// 새 요약 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 심볼 결과를 기록합니다.
    pub fn record(&mut self, symbol: impl Into<String>, outcome: SymbolOutcome) {
        if let SymbolOutcome::Written { rows } = &outcome {
            self.total_written += rows;
        }
        self.reports.push(SymbolReport {
            symbol: symbol.into(),
            outcome,
        });
    }

    /// 처리한 심볼 수
    pub fn total(&self) -> usize {
        self.reports.len()
    }

    /// 저장까지 성공한 심볼 수
    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, SymbolOutcome::Written { .. }))
    }

    /// 데이터 없음 심볼 수
    pub fn empty(&self) -> usize {
        self.count(|o| matches!(o, SymbolOutcome::NoData))
    }

    /// 실패(조회 또는 저장) 심볼 수
    pub fn failed(&self) -> usize {
        self.count(|o| {
            matches!(
                o,
                SymbolOutcome::FetchFailed { .. } | SymbolOutcome::WriteFailed { .. }
            )
        })
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.reports.is_empty() {
            0.0
        } else {
            (self.succeeded() as f64 / self.reports.len() as f64) * 100.0
        }
    }

    fn count(&self, pred: impl Fn(&SymbolOutcome) -> bool) -> usize {
        self.reports.iter().filter(|r| pred(&r.outcome)).count()
    }

    /// 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total(),
            success = self.succeeded(),
            empty = self.empty(),
            failed = self.failed(),
            total_written = self.total_written,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "수집 완료"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_accumulates_written_rows() {
        let mut summary = RunSummary::new();
        summary.record("AAPL", SymbolOutcome::Written { rows: 5 });
        summary.record("MSFT", SymbolOutcome::Written { rows: 3 });
        summary.record("GOOGL", SymbolOutcome::NoData);

        assert_eq!(summary.total_written, 8);
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.empty(), 1);
        assert_eq!(summary.failed(), 0);
    }

    #[test]
    fn test_failures_are_counted_independently() {
        let mut summary = RunSummary::new();
        summary.record(
            "AAPL",
            SymbolOutcome::FetchFailed {
                error: "timeout".to_string(),
            },
        );
        summary.record("MSFT", SymbolOutcome::Written { rows: 2 });
        summary.record(
            "GOOGL",
            SymbolOutcome::WriteFailed {
                error: "connection reset".to_string(),
            },
        );

        assert_eq!(summary.failed(), 2);
        assert_eq!(summary.succeeded(), 1);
        assert_eq!(summary.total_written, 2);
        assert!((summary.success_rate() - 33.3).abs() < 0.1);
    }

    #[test]
    fn test_success_rate_empty_run() {
        let summary = RunSummary::new();
        assert_eq!(summary.success_rate(), 0.0);
    }
}
