//! Same-day read-through cache for daily published tables.
//!
//! Holds at most one value, tagged with the calendar date it was loaded
//! for. A lookup for another date reloads and replaces it. Concurrent
//! misses may both load; the later write wins with an equivalent value.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::debug;

/// Hit/miss counters.
#[derive(Debug, Default)]
pub struct DailyCacheStats {
    pub hits: AtomicU64,
    pub misses: AtomicU64,
}

/// Value cached for one calendar day.
#[derive(Debug)]
pub struct DailyCache<T> {
    entry: RwLock<Option<(NaiveDate, T)>>,
    stats: DailyCacheStats,
}

impl<T: Clone> DailyCache<T> {
    pub fn new() -> Self {
        Self {
            entry: RwLock::new(None),
            stats: DailyCacheStats::default(),
        }
    }

    /// Cached value for `date`, if one was loaded for that day.
    pub async fn get(&self, date: NaiveDate) -> Option<T> {
        let entry = self.entry.read().await;
        match entry.as_ref() {
            Some((cached_date, value)) if *cached_date == date => Some(value.clone()),
            _ => None,
        }
    }

    pub async fn put(&self, date: NaiveDate, value: T) {
        *self.entry.write().await = Some((date, value));
    }

    /// Return the value for `date`, running `load` on a miss.
    ///
    /// A failed load leaves the previous entry untouched.
    pub async fn get_or_try_load<F, Fut, E>(&self, date: NaiveDate, load: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get(date).await {
            self.stats.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value);
        }

        self.stats.misses.fetch_add(1, Ordering::Relaxed);
        debug!(date = %date, "Daily cache miss, loading");

        let value = load().await?;
        self.put(date, value.clone()).await;
        Ok(value)
    }

    pub fn stats(&self) -> &DailyCacheStats {
        &self.stats
    }
}

impl<T: Clone> Default for DailyCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    #[tokio::test]
    async fn test_reuses_same_day() {
        let cache: DailyCache<u32> = DailyCache::new();
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_try_load(day(1), || async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(42)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().hits.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn test_day_rollover_reloads() {
        let cache: DailyCache<&'static str> = DailyCache::new();
        cache.put(day(1), "monday").await;

        let value = cache
            .get_or_try_load(day(2), || async { Ok::<_, String>("tuesday") })
            .await
            .unwrap();
        assert_eq!(value, "tuesday");
        assert_eq!(cache.get(day(1)).await, None);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous() {
        let cache: DailyCache<u32> = DailyCache::new();
        cache.put(day(1), 7).await;

        let err = cache
            .get_or_try_load(day(2), || async { Err::<u32, _>("offline") })
            .await
            .unwrap_err();
        assert_eq!(err, "offline");
        assert_eq!(cache.get(day(1)).await, Some(7));
    }
}
