//! Video playback target selection
//!
//! YouTube and Vimeo links are shown through the provider's embed player,
//! anything else is played directly from its source URL.

use url::Url;

use super::ContentPayload;

/// Hosting provider with an iframe embed player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedProvider {
    Youtube,
    Vimeo,
}

/// How a video item is displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Playback {
    /// Provider iframe player
    Embed {
        provider: EmbedProvider,
        embed_url: String,
    },
    /// Native player pointed straight at the source
    Direct { src: String },
}

impl Playback {
    /// Selects the playback target for a payload. Text has no playback.
    pub fn for_payload(payload: &ContentPayload) -> Option<Self> {
        match payload {
            ContentPayload::Text(_) => None,
            ContentPayload::VideoUrl(url) => Some(Self::for_url(url)),
            ContentPayload::VideoFile(data_url) => Some(Self::Direct {
                src: data_url.to_string(),
            }),
        }
    }

    /// Selects embed or direct playback for a video URL.
    pub fn for_url(url: &Url) -> Self {
        let embed = match url.host_str() {
            Some(host) if is_host(host, "youtube.com") => {
                youtube_watch_id(url).map(|id| (EmbedProvider::Youtube, id))
            }
            Some(host) if is_host(host, "youtu.be") => {
                last_path_segment(url).map(|id| (EmbedProvider::Youtube, id))
            }
            Some(host) if is_host(host, "vimeo.com") => {
                last_path_segment(url).map(|id| (EmbedProvider::Vimeo, id))
            }
            _ => None,
        };

        match embed {
            Some((provider, video_id)) => Self::Embed {
                provider,
                embed_url: embed_url(provider, &video_id),
            },
            None => Self::Direct {
                src: url.to_string(),
            },
        }
    }

    /// True for iframe embed playback.
    pub fn is_embed(&self) -> bool {
        matches!(self, Playback::Embed { .. })
    }
}

fn embed_url(provider: EmbedProvider, video_id: &str) -> String {
    match provider {
        EmbedProvider::Youtube => format!("https://www.youtube.com/embed/{video_id}"),
        EmbedProvider::Vimeo => format!("https://player.vimeo.com/video/{video_id}"),
    }
}

/// Matches `domain` itself or any subdomain of it.
fn is_host(host: &str, domain: &str) -> bool {
    let host = host.trim_end_matches('.');
    host.eq_ignore_ascii_case(domain)
        || host
            .to_ascii_lowercase()
            .ends_with(&format!(".{domain}"))
}

fn youtube_watch_id(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
        .filter(|id| !id.is_empty())
}

fn last_path_segment(url: &Url) -> Option<String> {
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .next_back()
        .map(str::to_string)
}
