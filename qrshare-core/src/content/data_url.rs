//! Self-describing `data:` URLs for uploaded video bytes.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use super::ContentError;

/// Base64 `data:` URL carrying a media type, e.g. `data:video/mp4;base64,AAAA`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUrl {
    media_type: String,
    encoded: String,
}

impl DataUrl {
    /// Encodes raw bytes under the given media type.
    ///
    /// # Errors
    ///
    /// - `ContentError::InvalidDataUrl` - Media type is empty or not of the form `type/subtype`
    pub fn encode(media_type: &str, bytes: &[u8]) -> Result<Self, ContentError> {
        let media_type = validate_media_type(media_type)?;
        Ok(Self {
            media_type,
            encoded: STANDARD.encode(bytes),
        })
    }

    /// Parses a `data:<media-type>;base64,<payload>` string.
    ///
    /// # Errors
    ///
    /// - `ContentError::InvalidDataUrl` - Missing scheme, media type, base64 marker, or invalid base64
    pub fn parse(raw: &str) -> Result<Self, ContentError> {
        let rest = raw.strip_prefix("data:").ok_or_else(|| invalid("missing data: scheme"))?;
        let (header, encoded) = rest
            .split_once(',')
            .ok_or_else(|| invalid("missing ',' separator"))?;
        let media_type = header
            .strip_suffix(";base64")
            .ok_or_else(|| invalid("only base64 data URLs are supported"))?;
        let media_type = validate_media_type(media_type)?;

        STANDARD
            .decode(encoded)
            .map_err(|e| invalid(&format!("payload is not base64: {e}")))?;

        Ok(Self {
            media_type,
            encoded: encoded.to_string(),
        })
    }

    /// Media type tag, e.g. `video/mp4`.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Decodes the payload back to raw bytes.
    ///
    /// # Errors
    ///
    /// - `ContentError::InvalidDataUrl` - Stored payload is not valid base64
    pub fn decode_bytes(&self) -> Result<Vec<u8>, ContentError> {
        STANDARD
            .decode(&self.encoded)
            .map_err(|e| invalid(&format!("payload is not base64: {e}")))
    }

    /// Size of the decoded payload in bytes, computed from the base64 length.
    pub fn decoded_len(&self) -> usize {
        let padding = self.encoded.bytes().rev().take_while(|b| *b == b'=').count();
        (self.encoded.len() / 4) * 3 - padding
    }
}

impl fmt::Display for DataUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "data:{};base64,{}", self.media_type, self.encoded)
    }
}

fn validate_media_type(media_type: &str) -> Result<String, ContentError> {
    let media_type = media_type.trim();
    match media_type.split_once('/') {
        Some((top, sub)) if !top.is_empty() && !sub.is_empty() && !media_type.contains(',') => {
            Ok(media_type.to_ascii_lowercase())
        }
        _ => Err(invalid(&format!("media type '{media_type}' is not type/subtype"))),
    }
}

fn invalid(reason: &str) -> ContentError {
    ContentError::InvalidDataUrl {
        reason: reason.to_string(),
    }
}
