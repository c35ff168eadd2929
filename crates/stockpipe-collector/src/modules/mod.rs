//! 데이터 수집 모듈.

pub mod price_collect;

pub use price_collect::collect_prices;
