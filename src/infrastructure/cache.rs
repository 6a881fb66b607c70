//! Expiring result cache for selector queries.
//!
//! A hit freezes a previous random outcome for the TTL window, so repeat
//! callers with the same selectors get the same assignment.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::trace;

use crate::infrastructure::traits::{Clock, SystemClock};

/// Default time-to-live: 5 minutes.
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Every this many inserts, expired entries are swept out.
pub const SWEEP_INTERVAL: usize = 64;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

pub struct ResultCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    inserts: AtomicUsize,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(ttl_secs: u64) -> Self {
        Self::with_clock(ttl_secs, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        let ttl = Duration::try_seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX))
            .unwrap_or(Duration::MAX);
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            clock,
            inserts: AtomicUsize::new(0),
        }
    }

    /// Canonical key for a selector map: JSON of the sorted map.
    pub fn selector_key(selectors: &BTreeMap<String, String>) -> String {
        // Serializing a map of strings cannot fail
        serde_json::to_string(selectors).unwrap_or_default()
    }

    /// Live value for `key`; an expired entry is evicted and reported as a miss.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().ok()?;
            match entries.get(key) {
                None => return None,
                Some(entry) if entry.expires_at > now => return Some(entry.value.clone()),
                Some(_) => {}
            }
        }
        trace!(key, "cache entry expired");
        if let Ok(mut entries) = self.entries.write() {
            if entries.get(key).is_some_and(|e| e.expires_at <= now) {
                entries.remove(key);
            }
        }
        None
    }

    pub fn set(&self, key: impl Into<String>, value: V) {
        self.set_with_ttl(key, value, self.ttl);
    }

    /// Last writer wins. Keys never read again are dropped by the periodic
    /// sweep once expired.
    pub fn set_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let sweep = (self.inserts.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_INTERVAL == 0;
        if let Ok(mut entries) = self.entries.write() {
            if sweep {
                let before = entries.len();
                entries.retain(|_, e| e.expires_at > now);
                trace!(removed = before - entries.len(), "cache sweep");
            }
            entries.insert(key.into(), CacheEntry { value, expires_at });
        }
    }

    /// Drop every expired entry; returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let Ok(mut entries) = self.entries.write() else {
            return 0;
        };
        let before = entries.len();
        entries.retain(|_, e| e.expires_at > now);
        before - entries.len()
    }

    /// Entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn advance(&self, secs: i64) {
            let mut now = self.0.lock().unwrap();
            *now += Duration::seconds(secs);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    fn cache() -> (ResultCache<String>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock(Mutex::new(Utc::now())));
        (ResultCache::with_clock(DEFAULT_TTL_SECS, clock.clone()), clock)
    }

    #[test]
    fn given_fresh_entry_when_getting_then_hit() {
        let (cache, clock) = cache();
        cache.set("k", "v".to_string());
        clock.advance(299);
        assert_eq!(cache.get("k"), Some("v".to_string()));
    }

    #[test]
    fn given_entry_past_ttl_when_getting_then_miss_and_evicted() {
        let (cache, clock) = cache();
        cache.set("k", "v".to_string());
        clock.advance(300);
        assert_eq!(cache.get("k"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn given_same_key_when_setting_twice_then_last_writer_wins() {
        let (cache, _) = cache();
        cache.set("k", "first".to_string());
        cache.set("k", "second".to_string());
        assert_eq!(cache.get("k"), Some("second".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn given_mixed_entries_when_purging_then_only_expired_removed() {
        let (cache, clock) = cache();
        cache.set_with_ttl("short", "a".to_string(), Duration::seconds(10));
        cache.set("long", "b".to_string());
        clock.advance(60);
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.get("long"), Some("b".to_string()));
    }

    #[test]
    fn given_many_distinct_keys_that_expire_when_setting_then_held_entries_stay_bounded() {
        let (cache, clock) = cache();
        for i in 0..1000 {
            cache.set(format!("k{i}"), "v".to_string());
            clock.advance(400);
        }
        assert!(
            cache.len() <= SWEEP_INTERVAL,
            "cache holds {} entries",
            cache.len()
        );
    }

    #[test]
    fn given_live_entries_when_sweeping_then_kept() {
        let (cache, _) = cache();
        for i in 0..(SWEEP_INTERVAL * 2) {
            cache.set(format!("k{i}"), "v".to_string());
        }
        assert_eq!(cache.len(), SWEEP_INTERVAL * 2);
    }

    #[test]
    fn given_reordered_selector_maps_when_keying_then_same_key() {
        let mut a = BTreeMap::new();
        a.insert("placement".to_string(), "top".to_string());
        a.insert("geo".to_string(), "US".to_string());
        let mut b = BTreeMap::new();
        b.insert("geo".to_string(), "US".to_string());
        b.insert("placement".to_string(), "top".to_string());
        assert_eq!(
            ResultCache::<String>::selector_key(&a),
            ResultCache::<String>::selector_key(&b)
        );
        assert_eq!(
            ResultCache::<String>::selector_key(&a),
            r#"{"geo":"US","placement":"top"}"#
        );
    }
}
