//! Share workflow
//!
//! Ties identifier generation, link encoding, the expiring cache and code
//! rendering into the two user-facing flows: creating a share and opening a
//! share link.

mod error;
pub mod view;

use std::path::Path;

use url::Url;

pub use error::ShareError;
pub use view::{NOT_FOUND_MESSAGE, SharedView, ViewBody};

use crate::QrShareError;
use crate::cache::{CacheWriteReport, ExpiringCache, KeyValueStore};
use crate::clock::{Clock, SystemClock};
use crate::codec::{self, ContentCodec, ShareLink, ShareQuery};
use crate::config::QrShareConfig;
use crate::content::{ContentId, ContentItem, ContentPayload, Expiration};
use crate::id::{IdGenerator, RandomIdGenerator};
use crate::reader::{PendingRead, VideoFileReader};
use crate::render::{FallbackRenderer, RenderError, RenderedCode};
use crate::resolver::TieredResolver;

/// Result of a successful share.
#[derive(Debug)]
pub struct ShareOutcome {
    pub link: ShareLink,
    pub item: ContentItem,
    /// Cache write result, absent when the write failed
    pub cache_report: Option<CacheWriteReport>,
    /// Set when the cache write failed but the inline link still works
    pub storage_warning: Option<String>,
    /// Rendered code image, when a renderer is configured and succeeded
    pub code: Option<RenderedCode>,
    pub render_error: Option<RenderError>,
}

impl ShareOutcome {
    /// True when the link only resolves on this device.
    pub fn requires_cache(&self) -> bool {
        !self.link.inline
    }
}

/// Creates share links and resolves them back into views.
#[derive(Debug)]
pub struct ShareService<S, G = RandomIdGenerator, C = SystemClock> {
    cache: ExpiringCache<S, C>,
    ids: G,
    codec: ContentCodec,
    base_url: Url,
    reader: VideoFileReader,
    renderer: Option<FallbackRenderer>,
}

impl<S: KeyValueStore> ShareService<S> {
    /// Creates a service over `store` using the configured policy, the system
    /// clock and OS-seeded identifiers.
    ///
    /// # Errors
    ///
    /// - `QrShareError::Configuration` - Configuration does not validate
    pub fn from_config(config: &QrShareConfig, store: S) -> Result<Self, QrShareError> {
        config.validate()?;
        let base_url = config.base_url()?;

        Ok(Self::with_parts(
            base_url,
            ExpiringCache::new(store),
            RandomIdGenerator::new(),
        )
        .with_codec(ContentCodec::new(config.share.inline_text_limit))
        .with_reader(VideoFileReader::new(config.share.max_file_size)))
    }
}

impl<S, G, C> ShareService<S, G, C>
where
    S: KeyValueStore,
    G: IdGenerator,
    C: Clock,
{
    /// Assembles a service from explicit parts with default codec and reader.
    pub fn with_parts(base_url: Url, cache: ExpiringCache<S, C>, ids: G) -> Self {
        Self {
            cache,
            ids,
            codec: ContentCodec::default(),
            base_url,
            reader: VideoFileReader::default(),
            renderer: None,
        }
    }

    pub fn with_codec(mut self, codec: ContentCodec) -> Self {
        self.codec = codec;
        self
    }

    pub fn with_reader(mut self, reader: VideoFileReader) -> Self {
        self.reader = reader;
        self
    }

    /// Renders every new link through `renderer`.
    pub fn with_renderer(mut self, renderer: FallbackRenderer) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn cache(&self) -> &ExpiringCache<S, C> {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut ExpiringCache<S, C> {
        &mut self.cache
    }

    /// Shares a piece of text.
    ///
    /// # Errors
    ///
    /// - `ShareError::Validation` - Text is empty after trimming, or the expiration is out of range
    /// - `ShareError::Storage` - Text too long for the link and the cache write failed
    pub fn share_text(
        &mut self,
        text: &str,
        expiration: Expiration,
    ) -> Result<ShareOutcome, ShareError> {
        let payload = ContentPayload::text(text)?;
        self.publish(payload, expiration)
    }

    /// Shares a link to a hosted video.
    ///
    /// # Errors
    ///
    /// - `ShareError::Validation` - URL is empty or unparseable, or the expiration is out of range
    pub fn share_video_url(
        &mut self,
        url: &str,
        expiration: Expiration,
    ) -> Result<ShareOutcome, ShareError> {
        let payload = ContentPayload::video_url(url)?;
        self.publish(payload, expiration)
    }

    /// Validates a video file and starts reading it in the background.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// - `ShareError::File` - File is missing, empty, not a file, or over the size limit
    pub fn begin_video_file(
        &self,
        path: impl AsRef<Path>,
        media_type: Option<&str>,
    ) -> Result<PendingRead, ShareError> {
        Ok(self.reader.start(path, media_type)?)
    }

    /// Finishes a video file read and shares the result.
    ///
    /// Returns `Ok(None)` when a newer read superseded this one.
    ///
    /// # Errors
    ///
    /// - `ShareError::File` - Reading failed or was interrupted
    /// - `ShareError::Storage` - Cache write failed; uploaded files are never inline
    pub async fn complete_video_file(
        &mut self,
        pending: PendingRead,
        expiration: Expiration,
    ) -> Result<Option<ShareOutcome>, ShareError> {
        match self.reader.finish(pending).await? {
            Some(data) => self
                .publish(ContentPayload::VideoFile(data), expiration)
                .map(Some),
            None => Ok(None),
        }
    }

    /// Builds the id-only link for an existing share.
    ///
    /// # Errors
    ///
    /// - `ShareError::Validation` - Id is empty or malformed
    pub fn link_for_id(&self, raw_id: &str) -> Result<ShareLink, ShareError> {
        let id = ContentId::parse(raw_id.trim())?;
        Ok(ShareLink {
            url: codec::link_for_id(&self.base_url, &id),
            id,
            inline: false,
        })
    }

    /// Resolves a share link, bare query string or bare id into a view.
    pub fn open(&self, link_or_query: &str) -> SharedView {
        let query = ShareQuery::parse(link_or_query);
        let raw_id = query.id().unwrap_or_else(|| link_or_query.trim());

        let id = match ContentId::parse(raw_id.trim()) {
            Ok(id) => id,
            Err(e) => {
                tracing::debug!("Link has no usable id: {e}");
                return SharedView::not_found();
            }
        };

        let resolution = TieredResolver::standard(self.codec, &self.cache).resolve(&id, &query);
        SharedView::from_resolution(resolution)
    }

    fn publish(
        &mut self,
        payload: ContentPayload,
        expiration: Expiration,
    ) -> Result<ShareOutcome, ShareError> {
        let id = self.ids.generate_id();
        let item = ContentItem::with_expiration(id, payload, self.cache.now(), expiration)?;
        let link = self.codec.build_link(&self.base_url, &item);

        let (cache_report, storage_warning) = match self.cache.put(&item) {
            Ok(report) => (Some(report), None),
            Err(e) if link.inline => {
                tracing::warn!(
                    "Could not cache {}, the inline link still works: {e}",
                    item.id()
                );
                (
                    None,
                    Some(format!(
                        "Content was not saved locally ({e}). The link still works because it carries the content."
                    )),
                )
            }
            Err(e) => {
                tracing::warn!("Could not cache {} and its link is not inline: {e}", item.id());
                return Err(ShareError::Storage(e));
            }
        };

        let (code, render_error) = match &self.renderer {
            Some(renderer) => match renderer.render(&link.url) {
                Ok(code) => (Some(code), None),
                Err(e) => {
                    tracing::warn!("Could not render code for {}: {e}", item.id());
                    (None, Some(e))
                }
            },
            None => (None, None),
        };

        tracing::info!(
            "Shared {} as {} ({} link)",
            item.kind(),
            item.id(),
            if link.inline { "inline" } else { "cache-only" }
        );

        Ok(ShareOutcome {
            link,
            item,
            cache_report,
            storage_warning,
            code,
            render_error,
        })
    }
}
