use thiserror::Error;

use crate::upload::policy::UploadPolicy;
use crate::upload::AcceptedKind;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Origin the `/api/...` routes are served from
    pub base_url: String,
    /// Origin used when composing the short link shown to the user
    pub share_base_url: String,
    /// Per-request timeout. Unset means the transport default.
    pub request_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct LimitsConfig {
    /// Maximum size of a single file, in megabytes
    pub max_file_size_mb: u64,
    pub max_images: usize,
    pub max_videos: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5173".to_string(),
            share_base_url: "http://localhost:5173".to_string(),
            request_timeout_secs: None,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_file_size_mb: 70,
            max_images: 3,
            max_videos: 1,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let base_url = std::env::var("EZURL_API_BASE_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| ApiConfig::default().base_url);

        let share_base_url = std::env::var("EZURL_SHARE_BASE_URL")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| base_url.clone());

        let request_timeout_secs = std::env::var("EZURL_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok());

        let max_file_size_mb = std::env::var("EZURL_MAX_FILE_SIZE_MB")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(70);

        let max_images = std::env::var("EZURL_MAX_IMAGES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(3);

        let max_videos = std::env::var("EZURL_MAX_VIDEOS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(1);

        let config = Config {
            api: ApiConfig {
                base_url,
                share_base_url,
                request_timeout_secs,
            },
            limits: LimitsConfig {
                max_file_size_mb,
                max_images,
                max_videos,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (var, url) in [
            ("EZURL_API_BASE_URL", &self.api.base_url),
            ("EZURL_SHARE_BASE_URL", &self.api.share_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ConfigError::ValidationError(format!(
                    "{var} must be an http(s) URL, got '{url}'"
                )));
            }
        }

        if self.limits.max_file_size_mb == 0 {
            return Err(ConfigError::ValidationError(
                "EZURL_MAX_FILE_SIZE_MB must be greater than 0".to_string(),
            ));
        }

        if self.limits.max_images == 0 || self.limits.max_videos == 0 {
            return Err(ConfigError::ValidationError(
                "EZURL_MAX_IMAGES and EZURL_MAX_VIDEOS must be greater than 0".to_string(),
            ));
        }

        if self.api.request_timeout_secs == Some(0) {
            tracing::warn!("EZURL_REQUEST_TIMEOUT_SECS is 0; every request will time out");
        }

        Ok(())
    }

    /// Upload policy for the image tab.
    pub fn image_policy(&self) -> UploadPolicy {
        UploadPolicy {
            max_file_size_bytes: self.limits.max_file_size_mb * 1024 * 1024,
            accepted_kind: AcceptedKind::Image,
            max_files: self.limits.max_images,
        }
    }

    /// Upload policy for the video tab.
    pub fn video_policy(&self) -> UploadPolicy {
        UploadPolicy {
            max_file_size_bytes: self.limits.max_file_size_mb * 1024 * 1024,
            accepted_kind: AcceptedKind::Video,
            max_files: self.limits.max_videos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            api: ApiConfig::default(),
            limits: LimitsConfig::default(),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(config().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_http_base_url() {
        let mut config = config();
        config.api.base_url = "ftp://example.com".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_rejects_zero_limits() {
        let mut config = config();
        config.limits.max_images = 0;
        assert!(config.validate().is_err());

        let mut config = self::config();
        config.limits.max_file_size_mb = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tab_policies() {
        let config = config();

        let images = config.image_policy();
        assert_eq!(images.max_files, 3);
        assert_eq!(images.accepted_kind, AcceptedKind::Image);
        assert_eq!(images.max_file_size_bytes, 73_400_320);

        let video = config.video_policy();
        assert_eq!(video.max_files, 1);
        assert_eq!(video.accepted_kind, AcceptedKind::Video);
    }
}
