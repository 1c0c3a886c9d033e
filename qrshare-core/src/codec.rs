//! Link query-string codec
//!
//! Converts content payloads to and from the query parameters of a share
//! link. Short text and video URLs travel inline so the link works on any
//! device; long text and uploaded files carry only the identifier and must be
//! resolved from the originating device's cache.
//!
//! Parameters: `id`, `type` (`text`|`video`), `source` (`url`|`file`),
//! `content` (inline text, `text` accepted on read) and `videoUrl`.

use std::borrow::Cow;

use url::Url;

use crate::content::{ContentError, ContentId, ContentItem, ContentKind, ContentPayload};

/// Text longer than this many characters is never inlined.
pub const DEFAULT_INLINE_TEXT_LIMIT: usize = 500;

pub const PARAM_ID: &str = "id";
pub const PARAM_TYPE: &str = "type";
pub const PARAM_SOURCE: &str = "source";
pub const PARAM_CONTENT: &str = "content";
pub const PARAM_TEXT: &str = "text";
pub const PARAM_VIDEO_URL: &str = "videoUrl";

/// Inline payload present but unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("Unknown content type '{value}'")]
    UnknownType { value: String },

    #[error("Unknown video source '{value}'")]
    UnknownSource { value: String },

    #[error("Missing '{param}' parameter for {kind} content")]
    MissingField { param: &'static str, kind: ContentKind },

    #[error("Invalid inline payload: {0}")]
    InvalidPayload(#[from] ContentError),
}

/// Decoded query parameters of a share link, in their original order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareQuery {
    params: Vec<(String, String)>,
}

impl ShareQuery {
    /// Parses a full link, a `?`-prefixed query, or a bare query string.
    ///
    /// Values are percent-decoded with `+` read as a space. Malformed escapes
    /// are kept verbatim rather than rejected.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        let query = match Url::parse(input) {
            Ok(url) => url.query().unwrap_or_default().to_string(),
            Err(_) => {
                let without_fragment = input.split('#').next().unwrap_or_default();
                match without_fragment.split_once('?') {
                    Some((_, query)) => query.to_string(),
                    None => without_fragment.to_string(),
                }
            }
        };

        let params = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                (decode_component(key), decode_component(value))
            })
            .collect();

        Self { params }
    }

    /// Builds a query from already-decoded pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            params: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }

    /// First value for `key`, if any.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    /// Raw `id` parameter.
    pub fn id(&self) -> Option<&str> {
        self.param(PARAM_ID)
    }

    /// True when no parameters are present.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

/// Encoded query parameters for one content item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryFragment {
    pairs: Vec<(&'static str, String)>,
    inline: bool,
}

impl QueryFragment {
    /// Whether the payload itself is embedded.
    pub fn is_inline(&self) -> bool {
        self.inline
    }

    /// Whether a parameter is present.
    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(name, _)| *name == key)
    }

    /// Percent-encoded `key=value&...` form.
    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// A shareable link for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareLink {
    pub url: String,
    pub id: ContentId,
    /// True when the link carries the payload and works without the cache
    pub inline: bool,
}

/// Encodes payloads into link parameters and decodes them back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentCodec {
    inline_text_limit: usize,
}

impl Default for ContentCodec {
    fn default() -> Self {
        Self::new(DEFAULT_INLINE_TEXT_LIMIT)
    }
}

impl ContentCodec {
    /// Creates a codec that inlines text up to `inline_text_limit` characters.
    pub fn new(inline_text_limit: usize) -> Self {
        Self { inline_text_limit }
    }

    pub fn inline_text_limit(&self) -> usize {
        self.inline_text_limit
    }

    /// Whether a payload fits in the link.
    pub fn can_inline(&self, payload: &ContentPayload) -> bool {
        match payload {
            ContentPayload::Text(text) => text.chars().count() <= self.inline_text_limit,
            ContentPayload::VideoUrl(_) => true,
            ContentPayload::VideoFile(_) => false,
        }
    }

    /// Encodes an item into link parameters according to the size policy.
    pub fn encode(&self, item: &ContentItem) -> QueryFragment {
        let mut pairs = vec![(PARAM_ID, item.id().to_string())];
        let inline = self.can_inline(item.payload());

        match item.payload() {
            ContentPayload::Text(text) if inline => {
                pairs.push((PARAM_TYPE, ContentKind::Text.type_tag().to_string()));
                pairs.push((PARAM_CONTENT, text.clone()));
            }
            ContentPayload::Text(_) => {}
            ContentPayload::VideoUrl(url) => {
                push_kind(&mut pairs, ContentKind::VideoUrlReference);
                pairs.push((PARAM_VIDEO_URL, url.to_string()));
            }
            ContentPayload::VideoFile(_) => {
                push_kind(&mut pairs, ContentKind::VideoFileReference);
            }
        }

        QueryFragment { pairs, inline }
    }

    /// Builds the full share link for an item under `base_url`.
    pub fn build_link(&self, base_url: &Url, item: &ContentItem) -> ShareLink {
        let fragment = self.encode(item);
        ShareLink {
            url: format!("{}?{}", strip_query(base_url), fragment.to_query_string()),
            id: item.id().clone(),
            inline: fragment.is_inline(),
        }
    }

    /// Decodes an inline payload from link parameters.
    ///
    /// Returns `Ok(None)` when the link declares no inline payload, including
    /// links for uploaded files that only reference the cache.
    ///
    /// # Errors
    ///
    /// - `DecodeError::UnknownType` / `DecodeError::UnknownSource` - Unrecognised discriminator
    /// - `DecodeError::MissingField` - Declared kind lacks its payload parameter
    /// - `DecodeError::InvalidPayload` - Payload fails validation, e.g. malformed video URL
    pub fn decode(&self, query: &ShareQuery) -> Result<Option<ContentPayload>, DecodeError> {
        let inline_text = query
            .param(PARAM_CONTENT)
            .or_else(|| query.param(PARAM_TEXT));
        let video_url = query.param(PARAM_VIDEO_URL);

        match query.param(PARAM_TYPE) {
            Some("text") => {
                let text = inline_text.ok_or(DecodeError::MissingField {
                    param: PARAM_CONTENT,
                    kind: ContentKind::Text,
                })?;
                Ok(Some(ContentPayload::text(text)?))
            }
            Some("video") => match query.param(PARAM_SOURCE) {
                Some("file") => Ok(None),
                Some("url") | None => {
                    let url = video_url.ok_or(DecodeError::MissingField {
                        param: PARAM_VIDEO_URL,
                        kind: ContentKind::VideoUrlReference,
                    })?;
                    Ok(Some(ContentPayload::video_url(url)?))
                }
                Some(other) => Err(DecodeError::UnknownSource {
                    value: other.to_string(),
                }),
            },
            Some(other) => Err(DecodeError::UnknownType {
                value: other.to_string(),
            }),
            None => match (inline_text, video_url) {
                (Some(text), _) => Ok(Some(ContentPayload::text(text)?)),
                (None, Some(url)) => Ok(Some(ContentPayload::video_url(url)?)),
                (None, None) => Ok(None),
            },
        }
    }
}

/// Id-only link, as produced by "view by id".
pub fn link_for_id(base_url: &Url, id: &ContentId) -> String {
    format!("{}?{PARAM_ID}={id}", strip_query(base_url))
}

fn push_kind(pairs: &mut Vec<(&'static str, String)>, kind: ContentKind) {
    pairs.push((PARAM_TYPE, kind.type_tag().to_string()));
    if let Some(source) = kind.source_tag() {
        pairs.push((PARAM_SOURCE, source.to_string()));
    }
}

fn strip_query(base_url: &Url) -> Cow<'_, Url> {
    if base_url.query().is_none() && base_url.fragment().is_none() {
        return Cow::Borrowed(base_url);
    }
    let mut stripped = base_url.clone();
    stripped.set_query(None);
    stripped.set_fragment(None);
    Cow::Owned(stripped)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::content::{DataUrl, Expiration};

    fn item(payload: ContentPayload) -> ContentItem {
        ContentItem::with_expiration(
            ContentId::parse("abc123").unwrap(),
            payload,
            Utc::now(),
            Expiration::Never,
        )
        .unwrap()
    }

    fn base() -> Url {
        Url::parse("https://share.example.com/qr/").unwrap()
    }

    #[test]
    fn test_short_text_encoded_inline() {
        let codec = ContentCodec::default();
        let fragment = codec.encode(&item(ContentPayload::Text("hello world & more".to_string())));

        assert!(fragment.is_inline());
        assert_eq!(
            fragment.to_query_string(),
            "id=abc123&type=text&content=hello%20world%20%26%20more"
        );
    }

    #[test]
    fn test_long_text_encoded_as_id_only() {
        let codec = ContentCodec::default();
        let text = "x".repeat(DEFAULT_INLINE_TEXT_LIMIT + 1);
        let fragment = codec.encode(&item(ContentPayload::Text(text)));

        assert!(!fragment.is_inline());
        assert!(!fragment.contains(PARAM_CONTENT));
        assert_eq!(fragment.to_query_string(), "id=abc123");
    }

    #[test]
    fn test_text_at_limit_counts_characters_not_bytes() {
        let codec = ContentCodec::new(3);
        assert!(codec.can_inline(&ContentPayload::Text("ééé".to_string())));
        assert!(!codec.can_inline(&ContentPayload::Text("éééé".to_string())));
    }

    #[test]
    fn test_video_file_never_inlined() {
        let codec = ContentCodec::default();
        let data_url = DataUrl::encode("video/mp4", b"tiny").unwrap();
        let fragment = codec.encode(&item(ContentPayload::VideoFile(data_url)));

        assert!(!fragment.is_inline());
        assert_eq!(fragment.to_query_string(), "id=abc123&type=video&source=file");
    }

    #[test]
    fn test_video_url_link_decodes_same_payload() {
        let codec = ContentCodec::default();
        let payload = ContentPayload::video_url("https://www.youtube.com/watch?v=ABC123&t=5").unwrap();
        let link = codec.build_link(&base(), &item(payload.clone()));

        assert!(link.inline);
        assert!(link.url.starts_with("https://share.example.com/qr/?id=abc123&type=video&source=url&videoUrl="));

        let decoded = codec.decode(&ShareQuery::parse(&link.url)).unwrap();
        assert_eq!(decoded, Some(payload));
    }

    #[test]
    fn test_build_link_base_query_replaced() {
        let codec = ContentCodec::default();
        let base = Url::parse("https://share.example.com/?id=old#top").unwrap();
        let link = codec.build_link(&base, &item(ContentPayload::Text("hi".to_string())));

        assert_eq!(link.url, "https://share.example.com/?id=abc123&type=text&content=hi");
    }

    #[test]
    fn test_query_parse_plus_and_escapes_decoded() {
        let query = ShareQuery::parse("?id=a1&content=caf%C3%A9+au+lait&content=second");
        assert_eq!(query.id(), Some("a1"));
        assert_eq!(query.param(PARAM_CONTENT), Some("café au lait"));
    }

    #[test]
    fn test_query_parse_bare_and_relative_forms_accepted() {
        assert_eq!(ShareQuery::parse("id=x9").id(), Some("x9"));
        assert_eq!(ShareQuery::parse("/index.html?id=x9#frag").id(), Some("x9"));
        assert!(ShareQuery::parse("").is_empty());
    }

    #[test]
    fn test_decode_without_payload_not_applicable() {
        let codec = ContentCodec::default();
        assert_eq!(codec.decode(&ShareQuery::parse("id=abc")).unwrap(), None);
        assert_eq!(
            codec
                .decode(&ShareQuery::parse("id=abc&type=video&source=file"))
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_decode_legacy_text_param_read_as_text() {
        let codec = ContentCodec::default();
        let decoded = codec.decode(&ShareQuery::parse("id=abc&text=hello")).unwrap();
        assert_eq!(decoded, Some(ContentPayload::Text("hello".to_string())));
    }

    #[test]
    fn test_decode_missing_or_invalid_fields_undecodable() {
        let codec = ContentCodec::default();

        assert!(matches!(
            codec.decode(&ShareQuery::parse("id=a&type=text")),
            Err(DecodeError::MissingField { .. })
        ));
        assert!(matches!(
            codec.decode(&ShareQuery::parse("id=a&type=text&content=%20%20")),
            Err(DecodeError::InvalidPayload(ContentError::EmptyText))
        ));
        assert!(matches!(
            codec.decode(&ShareQuery::parse("id=a&type=video&source=url")),
            Err(DecodeError::MissingField { .. })
        ));
        assert!(matches!(
            codec.decode(&ShareQuery::parse("id=a&type=video&source=url&videoUrl=not%20a%20url")),
            Err(DecodeError::InvalidPayload(ContentError::InvalidUrl { .. }))
        ));
        assert!(matches!(
            codec.decode(&ShareQuery::parse("id=a&type=audio")),
            Err(DecodeError::UnknownType { .. })
        ));
        assert!(matches!(
            codec.decode(&ShareQuery::parse("id=a&type=video&source=ftp")),
            Err(DecodeError::UnknownSource { .. })
        ));
    }

    #[test]
    fn test_link_for_id_only_carries_id() {
        let id = ContentId::parse("f00ba5").unwrap();
        assert_eq!(link_for_id(&base(), &id), "https://share.example.com/qr/?id=f00ba5");
    }
}
