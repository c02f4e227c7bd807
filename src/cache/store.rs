//! TTL'd LRU storage for rendered feed pages.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::num::NonZeroUsize;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use bytes::Bytes;
use lru::LruCache;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// Identity of a cached page: the request path plus a hash of its query
/// string, so `/?page=2` and `/?page=3` occupy separate slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageKey {
    pub path: String,
    pub query_hash: u64,
}

impl PageKey {
    pub fn new(path: &str, query: &str) -> Self {
        Self {
            path: path.to_string(),
            query_hash: hash_query(query),
        }
    }
}

pub fn hash_query(query: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    query.hash(&mut hasher);
    hasher.finish()
}

#[derive(Clone)]
pub struct CachedPage {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    stored_at: Instant,
}

/// Response cache for rendered pages. Entries expire a fixed interval after
/// being stored; expiry is checked on read, and writes never invalidate
/// anything, so a stale page can be served until its interval runs out.
pub struct PageCache {
    pages: RwLock<LruCache<PageKey, CachedPage>>,
    ttl: Duration,
}

impl PageCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            pages: RwLock::new(LruCache::new(capacity)),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fetch a live entry. Expired entries are dropped on the spot.
    pub fn get(&self, key: &PageKey) -> Option<CachedPage> {
        let mut pages = rw_write(&self.pages, SOURCE, "get");
        match pages.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => Some(entry.clone()),
            Some(_) => {
                pages.pop(key);
                None
            }
            None => None,
        }
    }

    pub fn set(&self, key: PageKey, status: u16, headers: Vec<(String, String)>, body: Bytes) {
        let entry = CachedPage {
            status,
            headers,
            body,
            stored_at: Instant::now(),
        };
        rw_write(&self.pages, SOURCE, "set").put(key, entry);
    }

    pub fn len(&self) -> usize {
        rw_read(&self.pages, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
