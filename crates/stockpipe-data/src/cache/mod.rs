//! 캐싱 레이어.
//!
//! 조회 서비스를 키/TTL 정책 뒤로 감싸 반복 조회를 흡수합니다.

pub mod market_read;

pub use crate::storage::redis::{RedisCache, RedisConfig};
pub use market_read::CachedMarketData;
