//! 시장 데이터 타입 및 구조체.
//!
//! 이 모듈은 일봉 시세 관련 타입을 정의합니다:
//! - `DailyBar` - 심볼별 하루치 OHLCV 데이터
//! - `DateWindow` - 수집 대상 날짜 범위 (양끝 포함)

use chrono::{Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 한 심볼의 하루치 OHLCV 시세.
///
/// (symbol, date) 쌍이 자연 키이며, 같은 쌍에 대한 재수집은
/// 저장 계층에서 기존 레코드를 덮어씁니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    /// 티커 심볼 (예: "AAPL", "MSFT")
    pub symbol: String,
    /// 거래일 (시간 성분 없음)
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
}

impl DailyBar {
    /// 새 일봉을 생성합니다.
    ///
    /// 심볼은 대문자로, 가격은 소수점 둘째 자리로 정규화됩니다.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        symbol: impl Into<String>,
        date: NaiveDate,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: i64,
    ) -> Self {
        Self {
            symbol: symbol.into().trim().to_uppercase(),
            date,
            open: open.round_dp(2),
            high: high.round_dp(2),
            low: low.round_dp(2),
            close: close.round_dp(2),
            volume,
        }
    }

    /// 일봉 범위(고가 - 저가)를 반환합니다.
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// 양봉(종가 > 시가)인지 확인합니다.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// 음봉(종가 < 시가)인지 확인합니다.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// 수집 대상 날짜 범위 (양끝 포함).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    /// 시작일 (포함)
    pub start: NaiveDate,
    /// 종료일 (포함)
    pub end: NaiveDate,
}

impl DateWindow {
    /// 새 날짜 범위를 생성합니다.
    ///
    /// `start > end`이면 `None`을 반환합니다.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        if start > end {
            return None;
        }
        Some(Self { start, end })
    }

    /// 오늘을 종료일로 하는 최근 `days`일 범위를 생성합니다.
    pub fn last_days(days: i64) -> Self {
        let end = Utc::now().date_naive();
        let start = end - Duration::days(days.max(0));
        Self { start, end }
    }

    /// 날짜가 범위에 포함되는지 확인합니다.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_daily_bar_normalization() {
        let bar = DailyBar::new(
            " aapl ",
            date("2024-01-02"),
            dec!(185.123),
            dec!(186.999),
            dec!(184.005),
            dec!(186.50),
            48_201_800,
        );

        assert_eq!(bar.symbol, "AAPL");
        assert_eq!(bar.open, dec!(185.12));
        assert_eq!(bar.high, dec!(187.00));
        assert_eq!(bar.low, dec!(184.01));
        assert_eq!(bar.close, dec!(186.50));
    }

    #[test]
    fn test_daily_bar_helpers() {
        let bar = DailyBar::new(
            "MSFT",
            date("2024-01-02"),
            dec!(370.00),
            dec!(375.50),
            dec!(368.00),
            dec!(374.00),
            20_000_000,
        );

        assert_eq!(bar.range(), dec!(7.50));
        assert!(bar.is_bullish());
        assert!(!bar.is_bearish());
    }

    #[test]
    fn test_date_window_rejects_inverted_range() {
        assert!(DateWindow::new(date("2024-01-03"), date("2024-01-01")).is_none());

        let window = DateWindow::new(date("2024-01-01"), date("2024-01-03")).unwrap();
        assert!(window.contains(date("2024-01-01")));
        assert!(window.contains(date("2024-01-03")));
        assert!(!window.contains(date("2024-01-04")));
    }

    #[test]
    fn test_date_window_last_days() {
        let window = DateWindow::last_days(7);
        assert_eq!(window.end - window.start, Duration::days(7));
    }
}
