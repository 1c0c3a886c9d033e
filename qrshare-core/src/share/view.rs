//! Display model for a visited share link.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::content::{ContentId, ContentPayload, Playback};
use crate::resolver::{Resolution, Tier};

/// Message shown for every unresolvable link.
pub const NOT_FOUND_MESSAGE: &str = "This content has expired or does not exist.";

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// What the visitor sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewBody {
    Text { body: String },
    Video { playback: Playback },
    NotFound,
}

/// Rendered outcome of opening a share link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedView {
    pub id: Option<ContentId>,
    pub body: ViewBody,
    /// Tier the content came from, absent when not found
    pub tier: Option<Tier>,
    /// Formatted creation time, known only for cached content
    pub shared_at: Option<String>,
    /// "Expires on ..." / "Never expires", empty when not found
    pub expiry_info: String,
}

impl SharedView {
    /// View for a link that resolves to nothing. Unknown, expired and
    /// undecodable content all produce this same value.
    pub fn not_found() -> Self {
        Self {
            id: None,
            body: ViewBody::NotFound,
            tier: None,
            shared_at: None,
            expiry_info: String::new(),
        }
    }

    /// Builds the view for a resolution outcome.
    pub fn from_resolution(resolution: Resolution) -> Self {
        let (content, tier) = match resolution {
            Resolution::Found { content, tier } => (content, tier),
            Resolution::NotFound => return Self::not_found(),
        };

        let body = match &content.payload {
            ContentPayload::Text(text) => ViewBody::Text { body: text.clone() },
            payload => match Playback::for_payload(payload) {
                Some(playback) => ViewBody::Video { playback },
                None => return Self::not_found(),
            },
        };

        Self {
            id: Some(content.id),
            body,
            tier: Some(tier),
            shared_at: content.created_at.map(format_timestamp),
            expiry_info: describe_expiry(content.expires_at),
        }
    }

    pub fn is_found(&self) -> bool {
        !matches!(self.body, ViewBody::NotFound)
    }
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.format(DATE_FORMAT).to_string()
}

fn describe_expiry(expires_at: Option<DateTime<Utc>>) -> String {
    match expires_at {
        Some(expires_at) => format!("Expires on {}", format_timestamp(expires_at)),
        None => "Never expires".to_string(),
    }
}

impl fmt::Display for SharedView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            ViewBody::NotFound => return write!(f, "{NOT_FOUND_MESSAGE}"),
            ViewBody::Text { body } => writeln!(f, "{body}")?,
            ViewBody::Video {
                playback: Playback::Embed { embed_url, .. },
            } => writeln!(f, "Embedded video: {embed_url}")?,
            ViewBody::Video {
                playback: Playback::Direct { src },
            } => {
                if src.starts_with("data:") {
                    writeln!(f, "Uploaded video ({} characters of data)", src.len())?;
                } else {
                    writeln!(f, "Video: {src}")?;
                }
            }
        }

        if let Some(shared_at) = &self.shared_at {
            writeln!(f, "Shared {shared_at}")?;
        }
        write!(f, "{}", self.expiry_info)
    }
}
