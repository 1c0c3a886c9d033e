//! Centralized configuration for QR Share.
//!
//! All tunable parameters and settings are defined here to avoid
//! hard-coded values scattered throughout the codebase.

use std::path::PathBuf;

use url::Url;

use crate::QrShareError;
use crate::codec::DEFAULT_INLINE_TEXT_LIMIT;
use crate::content::{Expiration, MAX_EXPIRATION_DAYS};
use crate::reader::DEFAULT_MAX_FILE_SIZE;
use crate::render::RenderOptions;

/// Central configuration for all QR Share components.
///
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Default)]
pub struct QrShareConfig {
    pub share: ShareConfig,
    pub storage: StorageConfig,
    pub render: RenderOptions,
}

/// Link building and share policy.
#[derive(Debug, Clone)]
pub struct ShareConfig {
    /// Page that share links point at
    pub base_url: String,
    /// Longest text, in characters, carried inline in a link
    pub inline_text_limit: usize,
    /// Largest accepted video upload in bytes
    pub max_file_size: u64,
    /// Expiration applied when the caller does not choose one (0 = never)
    pub default_expiration_days: u32,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/".to_string(),
            inline_text_limit: DEFAULT_INLINE_TEXT_LIMIT,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            default_expiration_days: 7,
        }
    }
}

impl ShareConfig {
    pub fn default_expiration(&self) -> Expiration {
        Expiration::from_days(self.default_expiration_days)
    }
}

/// Local content store configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory holding the store file
    pub data_dir: PathBuf,
    pub store_file_name: String,
    /// Store size limit in bytes (None = unlimited)
    pub quota_bytes: Option<usize>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./qrshare-data"),
            store_file_name: "store.json".to_string(),
            quota_bytes: Some(5 * 1024 * 1024), // 5 MiB
        }
    }
}

impl StorageConfig {
    /// Full path of the store file.
    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join(&self.store_file_name)
    }
}

impl QrShareConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Unparseable values are ignored and the default is kept.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(base_url) = std::env::var("QRSHARE_BASE_URL")
            && !base_url.trim().is_empty()
        {
            config.share.base_url = base_url.trim().to_string();
        }

        if let Ok(limit) = std::env::var("QRSHARE_INLINE_LIMIT")
            && let Ok(chars) = limit.parse::<usize>()
        {
            config.share.inline_text_limit = chars;
        }

        if let Ok(size) = std::env::var("QRSHARE_MAX_FILE_SIZE")
            && let Ok(bytes) = size.parse::<u64>()
        {
            config.share.max_file_size = bytes;
        }

        if let Ok(days) = std::env::var("QRSHARE_DEFAULT_EXPIRATION_DAYS")
            && let Ok(days) = days.parse::<u32>()
        {
            config.share.default_expiration_days = days;
        }

        if let Ok(data_dir) = std::env::var("QRSHARE_DATA_DIR")
            && !data_dir.is_empty()
        {
            config.storage.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(quota) = std::env::var("QRSHARE_QUOTA_BYTES")
            && let Ok(bytes) = quota.parse::<usize>()
        {
            // Zero disables the quota
            config.storage.quota_bytes = (bytes > 0).then_some(bytes);
        }

        config
    }

    /// Parsed base URL for share links.
    ///
    /// # Errors
    ///
    /// - `QrShareError::Configuration` - Base URL is unparseable or cannot carry a query
    pub fn base_url(&self) -> Result<Url, QrShareError> {
        let url = Url::parse(&self.share.base_url).map_err(|e| QrShareError::Configuration {
            reason: format!("base URL '{}' is invalid: {e}", self.share.base_url),
        })?;

        if url.cannot_be_a_base() {
            return Err(QrShareError::Configuration {
                reason: format!("base URL '{}' is not a page address", self.share.base_url),
            });
        }

        Ok(url)
    }

    /// Checks that the configuration can produce working links.
    ///
    /// # Errors
    ///
    /// - `QrShareError::Configuration` - Invalid base URL, zero inline limit or
    ///   default expiration out of range
    pub fn validate(&self) -> Result<(), QrShareError> {
        self.base_url()?;

        if self.share.inline_text_limit == 0 {
            return Err(QrShareError::Configuration {
                reason: "inline text limit must be greater than zero".to_string(),
            });
        }

        if self.share.default_expiration_days > MAX_EXPIRATION_DAYS {
            return Err(QrShareError::Configuration {
                reason: format!(
                    "default expiration of {} days exceeds the {MAX_EXPIRATION_DAYS} day limit",
                    self.share.default_expiration_days
                ),
            });
        }

        Ok(())
    }
}
