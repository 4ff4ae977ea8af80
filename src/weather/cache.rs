use super::types::WeatherResult;
use super::CityName;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use moka::Expiry;
use std::sync::Arc;
#[cfg(test)]
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Source of the current time for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[cfg(test)]
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

#[cfg(test)]
impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let delta = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now = now.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC);
    }
}

#[cfg(test)]
impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub value: WeatherResult,
    pub expires_at: DateTime<Utc>,
    ttl: Duration,
}

impl CacheEntry {
    fn new(value: WeatherResult, ttl: Duration, now: DateTime<Utc>) -> Self {
        let expires_at = chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        Self {
            value,
            expires_at,
            ttl,
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

// Lets moka drop entries on its own once their TTL passes. Reads still
// check `expires_at` so the outcome never depends on eviction timing, and
// never remove anything themselves: a concurrent `put` may already have
// replaced the stale entry they saw.
struct EntryExpiry;

impl Expiry<String, CacheEntry> for EntryExpiry {
    fn expire_after_create(&self, _key: &String, value: &CacheEntry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// Process-wide weather cache keyed by normalized city name.
///
/// A disabled cache reports every lookup as a miss and ignores writes, so
/// callers never branch on whether caching is on.
#[derive(Clone)]
pub struct TtlCache {
    entries: Option<Cache<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl TtlCache {
    pub fn new(max_entries: u64) -> Self {
        Self::with_clock(max_entries, Arc::new(SystemClock))
    }

    pub fn with_clock(max_entries: u64, clock: Arc<dyn Clock>) -> Self {
        let entries = Cache::builder()
            .max_capacity(max_entries)
            .expire_after(EntryExpiry)
            .build();

        Self {
            entries: Some(entries),
            clock,
        }
    }

    pub fn disabled() -> Self {
        Self {
            entries: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    pub async fn get(&self, city: &str) -> Option<WeatherResult> {
        let entries = self.entries.as_ref()?;
        let key = CityName::cache_key(city);

        let entry = entries.get(&key).await?;
        entry.is_fresh(self.clock.now()).then_some(entry.value)
    }

    pub async fn put(&self, city: &str, value: WeatherResult, ttl: Duration) {
        let Some(entries) = self.entries.as_ref() else {
            return;
        };

        let entry = CacheEntry::new(value, ttl, self.clock.now());
        entries.insert(CityName::cache_key(city), entry).await;
    }

    pub async fn clear(&self) {
        if let Some(entries) = self.entries.as_ref() {
            entries.invalidate_all();
            entries.run_pending_tasks().await;
        }
    }

    /// Approximate number of stored entries, expired ones included until
    /// they are read or evicted.
    pub async fn len(&self) -> u64 {
        match self.entries.as_ref() {
            Some(entries) => {
                entries.run_pending_tasks().await;
                entries.entry_count()
            }
            None => 0,
        }
    }
}
