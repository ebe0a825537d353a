//! Download cache for URL sources

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

struct Downloads {
    by_url: LruCache<String, Arc<[u8]>>,
    bytes: usize,
}

impl Downloads {
    fn release(&mut self, data: &[u8]) {
        self.bytes = self.bytes.saturating_sub(data.len());
    }
}

/// Downloaded PDF bytes keyed by URL, bounded by entry count and total size.
///
/// Entries are shared (`Arc<[u8]>`), so handing a cached download to a
/// parsing task does not copy it.
pub struct DownloadCache {
    inner: Mutex<Downloads>,
    max_bytes: usize,
}

impl DownloadCache {
    /// A cache holding at most `max_entries` downloads and `max_bytes` bytes
    pub fn new(max_entries: usize, max_bytes: usize) -> Self {
        let max_entries = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(Downloads {
                by_url: LruCache::new(max_entries),
                bytes: 0,
            }),
            max_bytes,
        }
    }

    /// Remember the bytes downloaded from `url`.
    ///
    /// A download larger than the whole byte budget is not kept. Otherwise the
    /// least recently used downloads are dropped until it fits.
    pub fn insert(&self, url: &str, data: Arc<[u8]>) {
        if data.len() > self.max_bytes {
            tracing::debug!(url, bytes = data.len(), "download too large to cache");
            return;
        }

        let mut inner = self.inner.lock();

        if let Some(previous) = inner.by_url.pop(url) {
            inner.release(&previous);
        }
        while inner.bytes + data.len() > self.max_bytes {
            match inner.by_url.pop_lru() {
                Some((_, evicted)) => inner.release(&evicted),
                None => break,
            }
        }

        inner.bytes += data.len();
        if let Some((_, evicted)) = inner.by_url.push(url.to_string(), data) {
            inner.release(&evicted);
        }
    }

    pub fn get(&self, url: &str) -> Option<Arc<[u8]>> {
        self.inner.lock().by_url.get(url).cloned()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.inner.lock().by_url.contains(url)
    }

    /// Forget the download for `url`. Returns whether it was cached.
    pub fn evict(&self, url: &str) -> bool {
        let mut inner = self.inner.lock();
        match inner.by_url.pop(url) {
            Some(data) => {
                inner.release(&data);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().by_url.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().by_url.is_empty()
    }

    /// Total size of the cached downloads
    pub fn total_bytes(&self) -> usize {
        self.inner.lock().bytes
    }
}

impl std::fmt::Debug for DownloadCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadCache")
            .field("len", &self.len())
            .field("total_bytes", &self.total_bytes())
            .field("max_bytes", &self.max_bytes)
            .finish()
    }
}
