//! Runtime configuration.
//!
//! Loaded from a JSON document. Every field has a default, so `{}` is a
//! valid configuration.

use std::path::{Path, PathBuf};

use chrono::{Duration, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use medical_office_imaging::{PhotoSize, PhotoSizes};

use crate::db::SEED_USER;
use crate::memory::{DEFAULT_PAGE_SIZE_TTL_DAYS, DEFAULT_RETURN_URL_TTL_MINUTES};
use crate::query::PageSizeOptions;

pub const APP_NAME: &str = "Medical Office";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Office configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfficeConfig {
    /// SQLite file; `None` keeps everything in memory
    pub database_path: Option<PathBuf>,
    /// Recorded in audit columns
    pub acting_user: String,
    /// `tracing` filter directive; `RUST_LOG` overrides it
    pub log_filter: String,
    pub page_sizes: PageSizeOptions,
    pub page_size_ttl_days: i64,
    pub return_url_ttl_minutes: i64,
    pub photo_max_width: u32,
    pub photo_max_height: u32,
    pub thumbnail_max_width: u32,
    pub thumbnail_max_height: u32,
    /// Fill empty tables with sample data on open
    pub seed_sample_data: bool,
    /// Offset of the office's local time from UTC, in minutes. `None`
    /// uses the host's time zone.
    pub utc_offset_minutes: Option<i32>,
}

impl Default for OfficeConfig {
    fn default() -> Self {
        let sizes = PhotoSizes::default();
        Self {
            database_path: None,
            acting_user: SEED_USER.to_string(),
            log_filter: "info".to_string(),
            page_sizes: PageSizeOptions::default(),
            page_size_ttl_days: DEFAULT_PAGE_SIZE_TTL_DAYS,
            return_url_ttl_minutes: DEFAULT_RETURN_URL_TTL_MINUTES,
            photo_max_width: sizes.photo.max_width,
            photo_max_height: sizes.photo.max_height,
            thumbnail_max_width: sizes.thumbnail.max_width,
            thumbnail_max_height: sizes.thumbnail.max_height,
            seed_sample_data: false,
            utc_offset_minutes: None,
        }
    }
}

impl OfficeConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: OfficeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_sizes.options.is_empty() {
            return Err(ConfigError::Invalid("page_sizes.options is empty".into()));
        }
        if self.page_sizes.options.contains(&0) {
            return Err(ConfigError::Invalid("page sizes must be positive".into()));
        }
        if !self.page_sizes.is_allowed(self.page_sizes.default_size) {
            return Err(ConfigError::Invalid(format!(
                "default page size {} is not one of the options",
                self.page_sizes.default_size
            )));
        }
        if self.page_size_ttl_days <= 0 || self.return_url_ttl_minutes <= 0 {
            return Err(ConfigError::Invalid("expiry times must be positive".into()));
        }
        let dims = [
            self.photo_max_width,
            self.photo_max_height,
            self.thumbnail_max_width,
            self.thumbnail_max_height,
        ];
        if dims.contains(&0) {
            return Err(ConfigError::Invalid("photo dimensions must be positive".into()));
        }
        if let Some(minutes) = self.utc_offset_minutes {
            if self.utc_offset().is_none() {
                return Err(ConfigError::Invalid(format!("UTC offset of {} minutes is out of range", minutes)));
            }
        }
        Ok(())
    }

    pub fn photo_sizes(&self) -> PhotoSizes {
        PhotoSizes {
            photo: PhotoSize::new(self.photo_max_width, self.photo_max_height),
            thumbnail: PhotoSize::new(self.thumbnail_max_width, self.thumbnail_max_height),
        }
    }

    pub fn page_size_ttl(&self) -> Duration {
        Duration::days(self.page_size_ttl_days)
    }

    pub fn return_url_ttl(&self) -> Duration {
        Duration::minutes(self.return_url_ttl_minutes)
    }

    /// The configured fixed offset, if any and in range.
    pub fn utc_offset(&self) -> Option<FixedOffset> {
        self.utc_offset_minutes
            .and_then(|minutes| minutes.checked_mul(60))
            .and_then(FixedOffset::east_opt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = OfficeConfig::from_json_str("{}").unwrap();
        assert_eq!(config, OfficeConfig::default());
        assert_eq!(config.photo_sizes(), PhotoSizes::default());
        assert_eq!(config.page_sizes.default_size, 10);
        assert_eq!(config.acting_user, "Seed Data");
    }

    #[test]
    fn test_overrides() {
        let config = OfficeConfig::from_json_str(
            r#"{"acting_user": "reception", "page_sizes": {"options": [5, 25], "default_size": 25}, "seed_sample_data": true}"#,
        )
        .unwrap();
        assert_eq!(config.acting_user, "reception");
        assert_eq!(config.page_sizes.options, vec![5, 25]);
        assert!(config.seed_sample_data);
    }

    #[test]
    fn test_rejects_bad_default_page_size() {
        let err = OfficeConfig::from_json_str(r#"{"page_sizes": {"options": [5], "default_size": 10}}"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_utc_offset() {
        let config = OfficeConfig::from_json_str(r#"{"utc_offset_minutes": -300}"#).unwrap();
        assert_eq!(config.utc_offset(), FixedOffset::west_opt(5 * 3600));
        assert!(OfficeConfig::default().utc_offset().is_none());

        let err = OfficeConfig::from_json_str(r#"{"utc_offset_minutes": 1500}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            OfficeConfig::from_json_str("{"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("office.json");
        std::fs::write(&path, r#"{"thumbnail_max_width": 60}"#).unwrap();
        let config = OfficeConfig::load(&path).unwrap();
        assert_eq!(config.photo_sizes().thumbnail.max_width, 60);
        assert!(OfficeConfig::load(dir.path().join("missing.json")).is_err());
    }
}
