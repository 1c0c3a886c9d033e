//! Local persistent cache for shared content.
//!
//! Defines the key-value store interface that stands in for origin-scoped
//! browser storage, with in-memory and file-backed implementations, and the
//! expiring cache that is the only component allowed to touch the store.

pub mod expiring;
pub mod schema;
pub mod store;

pub use expiring::{CacheWriteReport, ExpiringCache};
pub use schema::{SCHEMA_VERSION, STORE_KEY};
pub use store::{FileStore, MemoryStore};

/// String-to-string persistent mapping.
///
/// Mirrors browser local storage: synchronous, origin scoped, and clearable
/// by the host at any time without notice.
pub trait KeyValueStore {
    /// Reads the value stored under `key`.
    ///
    /// # Errors
    ///
    /// - `StoreError::Unavailable` - Store cannot be accessed
    /// - `StoreError::Io` - Underlying read failed
    fn read(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// - `StoreError::QuotaExceeded` - Value would exceed the store's quota
    /// - `StoreError::Unavailable` - Store cannot be accessed
    /// - `StoreError::Io` - Underlying write failed
    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for Box<S> {
    fn read(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).read(key)
    }

    fn write(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).write(key, value)
    }
}

/// Errors raised by a key-value store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Write would exceed the configured storage quota
    #[error("Storage quota exceeded: need {needed} bytes, quota is {quota}")]
    QuotaExceeded {
        /// Bytes the store would occupy after the write
        needed: usize,
        /// Maximum bytes allowed
        quota: usize,
    },

    /// Store cannot be used at all
    #[error("Storage unavailable: {reason}")]
    Unavailable {
        /// Description of why the store is unavailable
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the expiring cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Stored content is not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Stored schema version {found} is newer than supported version {supported}")]
    UnsupportedSchema { found: u32, supported: u32 },

    #[error("Stored record '{id}' is invalid: {reason}")]
    InvalidRecord { id: String, reason: String },
}

impl CacheError {
    /// True when the write failed because the store ran out of space.
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, CacheError::Store(StoreError::QuotaExceeded { .. }))
    }
}
