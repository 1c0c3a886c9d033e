//! Tiered content resolution
//!
//! Materializes shared content from an identifier and the link's query
//! parameters by trying an ordered list of strategies. The standard order is
//! the inline payload first, which works on any device without storage, then
//! the local cache, which only works on the originating device. Resolution is
//! best-effort and never fails: every miss or malformed source ends in the
//! same [`Resolution::NotFound`].

use std::fmt;

use chrono::{DateTime, Utc};

use crate::cache::{ExpiringCache, KeyValueStore};
use crate::clock::Clock;
use crate::codec::{ContentCodec, ShareQuery};
use crate::content::{ContentId, ContentItem, ContentKind, ContentPayload};

/// Source that produced resolved content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Payload decoded from the link itself
    Inline,
    /// Entry read from the local cache
    Cache,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Inline => write!(f, "inline"),
            Tier::Cache => write!(f, "cache"),
        }
    }
}

/// Content produced by a resolver tier.
///
/// Inline results carry no timestamps; they are permanent for as long as the
/// link exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContent {
    pub id: ContentId,
    pub payload: ContentPayload,
    pub created_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl ResolvedContent {
    pub fn kind(&self) -> ContentKind {
        self.payload.kind()
    }
}

impl From<ContentItem> for ResolvedContent {
    fn from(item: ContentItem) -> Self {
        Self {
            id: item.id().clone(),
            created_at: Some(item.created_at()),
            expires_at: item.expires_at(),
            payload: item.payload().clone(),
        }
    }
}

/// Result of one strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt {
    Found(ResolvedContent),
    /// This tier has nothing for the id
    NotApplicable,
    /// This tier has data for the id but it cannot be used
    Malformed(String),
}

/// One source of content in the resolution order.
pub trait ResolveStrategy {
    fn tier(&self) -> Tier;

    /// Looks up content for `id`. Must not panic or block indefinitely.
    fn attempt(&self, id: &ContentId, query: &ShareQuery) -> Attempt;
}

/// Decodes the payload carried in the link.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineStrategy {
    codec: ContentCodec,
}

impl InlineStrategy {
    pub fn new(codec: ContentCodec) -> Self {
        Self { codec }
    }
}

impl ResolveStrategy for InlineStrategy {
    fn tier(&self) -> Tier {
        Tier::Inline
    }

    fn attempt(&self, id: &ContentId, query: &ShareQuery) -> Attempt {
        match self.codec.decode(query) {
            Ok(Some(payload)) => Attempt::Found(ResolvedContent {
                id: id.clone(),
                payload,
                created_at: None,
                expires_at: None,
            }),
            Ok(None) => Attempt::NotApplicable,
            Err(e) => Attempt::Malformed(e.to_string()),
        }
    }
}

/// Looks the id up in the expiring cache.
#[derive(Debug)]
pub struct CacheStrategy<'a, S, C> {
    cache: &'a ExpiringCache<S, C>,
}

impl<'a, S, C> CacheStrategy<'a, S, C> {
    pub fn new(cache: &'a ExpiringCache<S, C>) -> Self {
        Self { cache }
    }
}

impl<S: KeyValueStore, C: Clock> ResolveStrategy for CacheStrategy<'_, S, C> {
    fn tier(&self) -> Tier {
        Tier::Cache
    }

    fn attempt(&self, id: &ContentId, _query: &ShareQuery) -> Attempt {
        match self.cache.get(id) {
            Ok(Some(item)) => Attempt::Found(item.into()),
            Ok(None) => Attempt::NotApplicable,
            Err(e) => {
                tracing::warn!("Cache lookup for {id} failed: {e}");
                Attempt::Malformed(e.to_string())
            }
        }
    }
}

/// Final outcome of tiered resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Found { content: ResolvedContent, tier: Tier },
    /// Unknown, expired, or undecodable; callers cannot tell these apart
    NotFound,
}

impl Resolution {
    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found { .. })
    }
}

/// Ordered list of strategies tried until one finds content.
#[derive(Default)]
pub struct TieredResolver<'a> {
    strategies: Vec<Box<dyn ResolveStrategy + 'a>>,
}

impl<'a> TieredResolver<'a> {
    /// Creates a resolver with no tiers; it resolves everything to not-found.
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// Inline payload first, then the cache.
    pub fn standard<S, C>(codec: ContentCodec, cache: &'a ExpiringCache<S, C>) -> Self
    where
        S: KeyValueStore,
        C: Clock,
    {
        Self::new()
            .with_strategy(InlineStrategy::new(codec))
            .with_strategy(CacheStrategy::new(cache))
    }

    /// Appends a strategy after the existing ones.
    pub fn with_strategy(mut self, strategy: impl ResolveStrategy + 'a) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Tiers in the order they are tried.
    pub fn tiers(&self) -> Vec<Tier> {
        self.strategies.iter().map(|s| s.tier()).collect()
    }

    /// Resolves `id`, stopping at the first tier that finds content.
    pub fn resolve(&self, id: &ContentId, query: &ShareQuery) -> Resolution {
        for strategy in &self.strategies {
            let tier = strategy.tier();
            match strategy.attempt(id, query) {
                Attempt::Found(content) => {
                    tracing::debug!("Resolved {id} from {tier} tier");
                    return Resolution::Found { content, tier };
                }
                Attempt::NotApplicable => {
                    tracing::debug!("No {tier} content for {id}");
                }
                Attempt::Malformed(reason) => {
                    tracing::warn!("Ignoring malformed {tier} content for {id}: {reason}");
                }
            }
        }

        tracing::debug!("No tier could resolve {id}");
        Resolution::NotFound
    }
}
