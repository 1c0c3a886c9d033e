//! Expiring content cache
//!
//! Maps identifiers to content items with per-item expiration. Pruning is
//! lazy: expired entries are evicted only when the next `put` rewrites the
//! document, and `get` hides them in the meantime.

use super::schema::{STORE_KEY, StoredRecord, decode_document, encode_document};
use super::{CacheError, KeyValueStore};
use crate::clock::{Clock, SystemClock};
use crate::content::{ContentId, ContentItem};

/// Outcome of a successful cache write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheWriteReport {
    /// Expired entries removed by this write
    pub evicted: usize,
    /// Entry with the same id that this write replaced
    pub replaced: bool,
}

/// Identifier-keyed cache with expiration, layered on a key-value store.
#[derive(Debug)]
pub struct ExpiringCache<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S: KeyValueStore> ExpiringCache<S, SystemClock> {
    /// Creates a cache over `store` using the system clock.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> ExpiringCache<S, C> {
    /// Creates a cache over `store` with an explicit time source.
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    /// Current time according to the cache's clock.
    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Inserts or replaces `item`, evicting every expired entry.
    ///
    /// # Errors
    ///
    /// - `CacheError::Store` - Store unavailable or quota exceeded; nothing is written
    /// - `CacheError::Serialization` - Existing document cannot be parsed
    /// - `CacheError::UnsupportedSchema` - Existing document was written by a newer version
    pub fn put(&mut self, item: &ContentItem) -> Result<CacheWriteReport, CacheError> {
        let now = self.clock.now();
        let mut records = self.load_records()?;

        let before = records.len();
        records.retain(|record| record.id != item.id().as_str());
        let replaced = records.len() != before;

        records.push(StoredRecord::from_item(item));

        let before_prune = records.len();
        records.retain(|record| !record.is_expired_at(now));
        let evicted = before_prune - records.len();

        let document = encode_document(&records)?;
        self.store.write(STORE_KEY, &document)?;

        if evicted > 0 {
            tracing::info!("Evicted {evicted} expired cache entries");
        }
        tracing::debug!(
            "Cached {} item {} ({} entries stored)",
            item.kind(),
            item.id(),
            records.len()
        );

        Ok(CacheWriteReport { evicted, replaced })
    }

    /// Looks up a live entry by id.
    ///
    /// Returns `Ok(None)` for unknown ids and for entries that have expired
    /// but not yet been pruned.
    ///
    /// # Errors
    ///
    /// - `CacheError::Store` - Store cannot be read
    /// - `CacheError::Serialization` / `CacheError::UnsupportedSchema` - Document unreadable
    /// - `CacheError::InvalidRecord` - Matching record is corrupt
    pub fn get(&self, id: &ContentId) -> Result<Option<ContentItem>, CacheError> {
        let now = self.clock.now();
        let record = self
            .load_records()?
            .into_iter()
            .rev()
            .find(|record| record.id == id.as_str());

        match record {
            Some(record) if record.is_expired_at(now) => {
                tracing::debug!("Cache entry {id} expired");
                Ok(None)
            }
            Some(record) => {
                tracing::debug!("Cache hit for {id}");
                record.into_item().map(Some)
            }
            None => {
                tracing::debug!("Cache miss for {id}");
                Ok(None)
            }
        }
    }

    /// Number of physical records, including expired ones awaiting pruning.
    ///
    /// # Errors
    ///
    /// - `CacheError` - Document cannot be read
    pub fn stored_len(&self) -> Result<usize, CacheError> {
        Ok(self.load_records()?.len())
    }

    /// Underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Mutable access to the underlying store.
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    fn load_records(&self) -> Result<Vec<StoredRecord>, CacheError> {
        match self.store.read(STORE_KEY)? {
            Some(raw) if !raw.trim().is_empty() => decode_document(&raw),
            _ => Ok(Vec::new()),
        }
    }
}
