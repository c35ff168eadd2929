//! 에러 타입 정의.

use std::fmt;

/// Collector 에러 타입
#[derive(Debug)]
pub enum CollectorError {
    /// 설정 에러
    Config(String),
    /// 실행 전제조건 위반 (빈 심볼 목록 등)
    Precondition(String),
}

impl fmt::Display for CollectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Precondition(msg) => write!(f, "Precondition violated: {}", msg),
        }
    }
}

impl std::error::Error for CollectorError {}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
