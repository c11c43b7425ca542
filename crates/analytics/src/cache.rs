// Timed result cache keyed by analysis variant, input digest and parameters

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::pipeline::Variant;

/// blake3 over each input's kind, length and bytes, in order.
pub fn digest_inputs<'a, I>(parts: I) -> blake3::Hash
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut hasher = blake3::Hasher::new();
    for (kind, bytes) in parts {
        hasher.update(kind.as_bytes());
        hasher.update(&[0]);
        hasher.update(&(bytes.len() as u64).to_le_bytes());
        hasher.update(bytes);
    }
    hasher.finalize()
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub variant: Variant,
    pub digest: blake3::Hash,
    /// Rendered parameters (date pin and the like).
    pub params: String,
}

struct Entry<V> {
    value: V,
    inserted: Instant,
}

/// Entries expire after `ttl`; when full, the oldest entry is evicted.
pub struct ResultCache<V> {
    ttl: Duration,
    capacity: usize,
    entries: HashMap<CacheKey, Entry<V>>,
}

impl<V: Clone> ResultCache<V> {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity,
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn get(&mut self, key: &CacheKey) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    pub fn insert(&mut self, key: CacheKey, value: V) {
        self.insert_at(key, value, Instant::now());
    }

    pub fn get_at(&mut self, key: &CacheKey, now: Instant) -> Option<V> {
        let expired = match self.entries.get(key) {
            None => return None,
            Some(e) => now.saturating_duration_since(e.inserted) >= self.ttl,
        };
        if expired {
            log::debug!("cache entry for {} expired", key.variant);
            self.entries.remove(key);
            return None;
        }
        log::debug!("cache hit for {}", key.variant);
        self.entries.get(key).map(|e| e.value.clone())
    }

    pub fn insert_at(&mut self, key: CacheKey, value: V, now: Instant) {
        if self.capacity == 0 {
            return;
        }
        let ttl = self.ttl;
        self.entries
            .retain(|_, e| now.saturating_duration_since(e.inserted) < ttl);
        while self.entries.len() >= self.capacity && !self.entries.contains_key(&key) {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.inserted)
                .map(|(k, _)| k.clone());
            match oldest {
                Some(k) => {
                    log::debug!("cache full, evicting {}", k.variant);
                    self.entries.remove(&k);
                }
                None => break,
            }
        }
        self.entries.insert(key, Entry { value, inserted: now });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(variant: Variant, data: &[u8]) -> CacheKey {
        CacheKey {
            variant,
            digest: digest_inputs([("sales", data)]),
            params: String::new(),
        }
    }

    #[test]
    fn digest_depends_on_kind_and_bytes() {
        let a = digest_inputs([("sales", b"abc".as_slice())]);
        assert_eq!(a, digest_inputs([("sales", b"abc".as_slice())]));
        assert_ne!(a, digest_inputs([("contract", b"abc".as_slice())]));
        assert_ne!(
            digest_inputs([("sales", b"ab".as_slice()), ("sales", b"c".as_slice())]),
            digest_inputs([("sales", b"a".as_slice()), ("sales", b"bc".as_slice())])
        );
    }

    #[test]
    fn entries_expire() {
        let mut cache = ResultCache::new(Duration::from_secs(10), 4);
        let t0 = Instant::now();
        cache.insert_at(key(Variant::DailySales, b"x"), 1, t0);
        assert_eq!(cache.get_at(&key(Variant::DailySales, b"x"), t0 + Duration::from_secs(9)), Some(1));
        assert_eq!(cache.get_at(&key(Variant::CampaignStatus, b"x"), t0), None);
        assert_eq!(cache.get_at(&key(Variant::DailySales, b"x"), t0 + Duration::from_secs(10)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn oldest_evicted_when_full() {
        let mut cache = ResultCache::new(Duration::from_secs(60), 2);
        let t0 = Instant::now();
        cache.insert_at(key(Variant::DailySales, b"a"), 'a', t0);
        cache.insert_at(key(Variant::DailySales, b"b"), 'b', t0 + Duration::from_secs(1));
        cache.insert_at(key(Variant::DailySales, b"c"), 'c', t0 + Duration::from_secs(2));
        let now = t0 + Duration::from_secs(3);
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get_at(&key(Variant::DailySales, b"a"), now), None);
        assert_eq!(cache.get_at(&key(Variant::DailySales, b"c"), now), Some('c'));
    }
}
