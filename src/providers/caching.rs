use crate::core::cache::Cache;
use crate::core::market::{MarketData, MarketDataProvider, normalize_ticker};
use crate::core::series::DateRange;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Identity of a history request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FetchKey {
    pub ticker: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FetchKey {
    pub fn new(ticker: &str, range: &DateRange) -> Self {
        Self {
            ticker: normalize_ticker(ticker),
            start: range.start,
            end: range.end,
        }
    }
}

/// How long a fetched result may be reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Range is entirely in the past; data will not change.
    Forever,
    /// Range reaches today; the latest session may still move.
    Expire(Duration),
    Skip,
}

impl CachePolicy {
    pub fn for_range(range: &DateRange, today: NaiveDate, intraday_ttl: Duration) -> Self {
        if !range.includes(today) {
            CachePolicy::Forever
        } else if intraday_ttl.is_zero() {
            CachePolicy::Skip
        } else {
            CachePolicy::Expire(intraday_ttl)
        }
    }
}

/// Memoizes successful history fetches of an inner provider.
///
/// Failed fetches are never stored.
pub struct CachingMarketDataProvider<T: MarketDataProvider> {
    inner: T,
    cache: Arc<dyn Cache<FetchKey, MarketData>>,
    intraday_ttl: Duration,
}

impl<T: MarketDataProvider> CachingMarketDataProvider<T> {
    pub fn new(
        inner: T,
        cache: Arc<dyn Cache<FetchKey, MarketData>>,
        intraday_ttl: Duration,
    ) -> Self {
        Self {
            inner,
            cache,
            intraday_ttl,
        }
    }
}

#[async_trait]
impl<T: MarketDataProvider> MarketDataProvider for CachingMarketDataProvider<T> {
    async fn fetch_history(&self, ticker: &str, range: &DateRange) -> Result<MarketData> {
        let key = FetchKey::new(ticker, range);
        let policy = CachePolicy::for_range(range, Utc::now().date_naive(), self.intraday_ttl);

        if policy != CachePolicy::Skip {
            if let Some(cached) = self.cache.get(&key).await {
                return Ok(cached);
            }
        }

        let result = self.inner.fetch_history(ticker, range).await?;
        match policy {
            CachePolicy::Forever => self.cache.put(key, result.clone(), None).await,
            CachePolicy::Expire(ttl) => self.cache.put(key, result.clone(), Some(ttl)).await,
            CachePolicy::Skip => debug!("Not caching intraday history for {}", key.ticker),
        }
        Ok(result)
    }
}
