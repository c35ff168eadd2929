//! 저장소 레이어.
//!
//! - PostgreSQL: 일봉 시세 및 심볼 신선도 메타데이터
//! - Redis: 조회 결과 캐싱

pub mod redis;
pub mod stock_data;

pub use redis::{RedisCache, RedisConfig};
pub use stock_data::{PriceRecord, StockDataRepository, SymbolFreshness, SymbolStatistics};
