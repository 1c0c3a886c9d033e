//! QR Share Core - content addressing for shareable links
//!
//! This crate packs short text or a video reference into a link that can be
//! encoded as a scannable code, and reconstructs the content on a later visit.
//! Content either travels inline in the link's query string or is kept in an
//! expiring local cache keyed by a short identifier.

pub mod cache;
pub mod clock;
pub mod codec;
pub mod config;
pub mod content;
pub mod id;
pub mod reader;
pub mod render;
pub mod resolver;
pub mod share;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use cache::{CacheError, ExpiringCache, FileStore, KeyValueStore, MemoryStore, StoreError};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{ContentCodec, DecodeError, ShareLink, ShareQuery};
pub use config::QrShareConfig;
pub use content::{ContentError, ContentId, ContentItem, ContentKind, ContentPayload, Expiration};
pub use reader::{ReadError, VideoFileReader};
pub use render::{FallbackRenderer, RenderError};
pub use resolver::{Resolution, TieredResolver};
pub use share::{ShareError, ShareOutcome, ShareService, SharedView};

/// Core errors that can bubble up from any QR Share subsystem.
#[derive(Debug, thiserror::Error)]
pub enum QrShareError {
    #[error("Share error: {0}")]
    Share(#[from] ShareError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Content error: {0}")]
    Content(#[from] ContentError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl QrShareError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            QrShareError::Share(e) => e.user_message(),
            QrShareError::Cache(_) => "Could not access the local content store".to_string(),
            QrShareError::Content(e) => e.to_string(),
            QrShareError::Configuration { reason } => format!("Invalid configuration: {reason}"),
            QrShareError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        match self {
            QrShareError::Share(e) => e.is_user_error(),
            QrShareError::Content(_) | QrShareError::Configuration { .. } => true,
            QrShareError::Cache(_) | QrShareError::Io(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, QrShareError>;
