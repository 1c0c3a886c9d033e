//! Shareable content model.
//!
//! A [`ContentItem`] is the unit of shared state: an identifier, a typed
//! payload, and its creation and optional expiration timestamps.

pub mod data_url;
pub mod video;

use std::fmt;

use chrono::{DateTime, Duration, Utc};
pub use data_url::DataUrl;
use url::Url;
pub use video::{EmbedProvider, Playback};

/// Maximum length of a content identifier in characters.
pub const MAX_ID_LENGTH: usize = 16;

/// Longest accepted expiration, roughly one hundred years.
pub const MAX_EXPIRATION_DAYS: u32 = 36_500;

/// Validation failures for content and its identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    #[error("Please enter some content to share")]
    EmptyText,

    #[error("Please enter a valid URL: {reason}")]
    InvalidUrl { reason: String },

    #[error("Invalid content ID: {reason}")]
    InvalidId { reason: String },

    #[error("Expiration {expires_at} must be later than creation {created_at}")]
    InvalidExpiration {
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    },

    #[error("Expiration of {days} days exceeds the {max} day limit")]
    ExpirationOutOfRange { days: u32, max: u32 },

    #[error("Invalid data URL: {reason}")]
    InvalidDataUrl { reason: String },
}

/// Short opaque token identifying one shared item.
///
/// Always 1 to [`MAX_ID_LENGTH`] characters drawn from the URL-safe set
/// `[A-Za-z0-9_-]`, so it can be placed in a query string unescaped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentId(String);

impl ContentId {
    /// Parses and validates an identifier.
    ///
    /// # Errors
    ///
    /// - `ContentError::InvalidId` - Empty, too long, or contains characters outside `[A-Za-z0-9_-]`
    pub fn parse(raw: &str) -> Result<Self, ContentError> {
        if raw.is_empty() {
            return Err(ContentError::InvalidId {
                reason: "identifier is empty".to_string(),
            });
        }

        if raw.chars().count() > MAX_ID_LENGTH {
            return Err(ContentError::InvalidId {
                reason: format!("identifier exceeds {MAX_ID_LENGTH} characters"),
            });
        }

        if let Some(bad) = raw
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
        {
            return Err(ContentError::InvalidId {
                reason: format!("character '{bad}' is not URL-safe"),
            });
        }

        Ok(Self(raw.to_string()))
    }

    /// Wraps a hex digest prefix produced by the identifier generator.
    pub(crate) fn from_digest_prefix(token: &str) -> Self {
        debug_assert!(Self::parse(token).is_ok(), "digest prefix must be a valid id");
        Self(token.to_string())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of shared content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    /// Plain UTF-8 text
    Text,
    /// Link to a video hosted elsewhere
    VideoUrlReference,
    /// Uploaded video bytes, only available through the cache
    VideoFileReference,
}

impl ContentKind {
    /// Value of the `type` link parameter for this kind.
    pub fn type_tag(self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::VideoUrlReference | ContentKind::VideoFileReference => "video",
        }
    }

    /// Value of the `source` link parameter, present for video kinds only.
    pub fn source_tag(self) -> Option<&'static str> {
        match self {
            ContentKind::Text => None,
            ContentKind::VideoUrlReference => Some("url"),
            ContentKind::VideoFileReference => Some("file"),
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Text => write!(f, "text"),
            ContentKind::VideoUrlReference => write!(f, "video url"),
            ContentKind::VideoFileReference => write!(f, "video file"),
        }
    }
}

/// Typed payload of a content item. The variant determines the kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPayload {
    Text(String),
    VideoUrl(Url),
    VideoFile(DataUrl),
}

impl ContentPayload {
    /// Builds a text payload, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// - `ContentError::EmptyText` - Text is empty after trimming
    pub fn text(raw: &str) -> Result<Self, ContentError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ContentError::EmptyText);
        }
        Ok(Self::Text(trimmed.to_string()))
    }

    /// Builds a video URL payload from user input.
    ///
    /// # Errors
    ///
    /// - `ContentError::InvalidUrl` - Input is empty or not an absolute URL
    pub fn video_url(raw: &str) -> Result<Self, ContentError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ContentError::InvalidUrl {
                reason: "no URL entered".to_string(),
            });
        }

        Url::parse(trimmed)
            .map(Self::VideoUrl)
            .map_err(|e| ContentError::InvalidUrl {
                reason: e.to_string(),
            })
    }

    /// Kind implied by this payload.
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentPayload::Text(_) => ContentKind::Text,
            ContentPayload::VideoUrl(_) => ContentKind::VideoUrlReference,
            ContentPayload::VideoFile(_) => ContentKind::VideoFileReference,
        }
    }
}

/// How long a shared item stays in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Expiration {
    /// Entry is kept until the store is cleared externally
    #[default]
    Never,
    /// Entry expires this many days after creation
    Days(u32),
}

impl Expiration {
    /// Maps a day count to an expiration, treating zero as permanent.
    pub fn from_days(days: u32) -> Self {
        if days == 0 { Self::Never } else { Self::Days(days) }
    }

    /// Absolute expiry for an item created at `created_at`.
    ///
    /// # Errors
    ///
    /// - `ContentError::ExpirationOutOfRange` - More than [`MAX_EXPIRATION_DAYS`], or the
    ///   expiry is not representable
    pub fn expires_at_from(
        self,
        created_at: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, ContentError> {
        let days = match self {
            Expiration::Never | Expiration::Days(0) => return Ok(None),
            Expiration::Days(days) => days,
        };

        let out_of_range = ContentError::ExpirationOutOfRange {
            days,
            max: MAX_EXPIRATION_DAYS,
        };
        if days > MAX_EXPIRATION_DAYS {
            return Err(out_of_range);
        }

        Duration::try_days(i64::from(days))
            .and_then(|delta| created_at.checked_add_signed(delta))
            .map(Some)
            .ok_or(out_of_range)
    }
}

/// One shared item as held by the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentItem {
    id: ContentId,
    payload: ContentPayload,
    created_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
}

impl ContentItem {
    /// Creates an item with an explicit expiry timestamp.
    ///
    /// # Errors
    ///
    /// - `ContentError::InvalidExpiration` - `expires_at` is not strictly after `created_at`
    pub fn new(
        id: ContentId,
        payload: ContentPayload,
        created_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<Self, ContentError> {
        if let Some(expires_at) = expires_at
            && expires_at <= created_at
        {
            return Err(ContentError::InvalidExpiration {
                created_at,
                expires_at,
            });
        }

        Ok(Self {
            id,
            payload,
            created_at,
            expires_at,
        })
    }

    /// Creates an item whose expiry is derived from an [`Expiration`] policy.
    ///
    /// # Errors
    ///
    /// - `ContentError::ExpirationOutOfRange` - Expiration too far in the future
    pub fn with_expiration(
        id: ContentId,
        payload: ContentPayload,
        created_at: DateTime<Utc>,
        expiration: Expiration,
    ) -> Result<Self, ContentError> {
        Ok(Self {
            id,
            payload,
            created_at,
            expires_at: expiration.expires_at_from(created_at)?,
        })
    }

    pub fn id(&self) -> &ContentId {
        &self.id
    }

    pub fn payload(&self) -> &ContentPayload {
        &self.payload
    }

    pub fn kind(&self) -> ContentKind {
        self.payload.kind()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// True when the item has an expiry at or before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}
