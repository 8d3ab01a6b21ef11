pub mod caching;
pub mod yahoo_finance;

pub use crate::store::memory::MemoryCache;
pub use caching::{CachePolicy, CachingMarketDataProvider, FetchKey};
