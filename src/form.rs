//! The shortening form: collects the password, expiry and description fields,
//! turns a selection (or a URL) into the `/api/Form` payload and submits it.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::UploadBackend;
use crate::upload::{FileEntry, UploadStatus};

pub const MAX_DESCRIPTION_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Invalid form: {0}")]
    FormValidationFailure(String),
    #[error("Form submission failed: {0}")]
    FormSubmissionFailure(String),
}

/// How long the short link stays valid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExpireDays {
    One,
    Seven,
    Fourteen,
    #[default]
    Thirty,
}

impl ExpireDays {
    pub const ALL: [ExpireDays; 4] = [
        ExpireDays::One,
        ExpireDays::Seven,
        ExpireDays::Fourteen,
        ExpireDays::Thirty,
    ];

    pub fn days(self) -> u32 {
        match self {
            ExpireDays::One => 1,
            ExpireDays::Seven => 7,
            ExpireDays::Fourteen => 14,
            ExpireDays::Thirty => 30,
        }
    }

    pub fn from_days(days: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.days() == days)
    }
}

impl std::str::FromStr for ExpireDays {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u32>()
            .ok()
            .and_then(Self::from_days)
            .ok_or_else(|| format!("expiry must be one of 1, 7, 14 or 30 days, got '{s}'"))
    }
}

/// Body of `POST /api/Form`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormRequest {
    pub is_password: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub expired_days: u32,
    pub file_names: Vec<String>,
    /// Target of the URL tab; absent for file uploads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// The user-editable fields shared by all three tabs.
#[derive(Debug, Clone, Default)]
pub struct ShortenForm {
    pub password_enabled: bool,
    pub password: Option<String>,
    pub expire: ExpireDays,
    pub description: Option<String>,
}

impl ShortenForm {
    /// Fill the password with today's date (`YYYYMMDD`, UTC). Does nothing
    /// while password protection is off.
    pub fn fill_today_password(&mut self) {
        if self.password_enabled {
            self.password = Some(today_password(Utc::now().date_naive()));
        }
    }

    /// Payload for the URL tab.
    pub fn url_request(&self, url: &str) -> Result<FormRequest, FormError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(FormError::FormValidationFailure("URL is required".to_string()));
        }

        let parsed = reqwest::Url::parse(url)
            .map_err(|e| FormError::FormValidationFailure(format!("'{url}' is not a valid URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(FormError::FormValidationFailure(format!(
                "'{url}' is not a valid http(s) URL"
            )));
        }

        let mut request = self.base_request()?;
        request.url = Some(parsed.to_string());
        Ok(request)
    }

    /// Payload for the image and video tabs. Every selected file must have
    /// finished uploading.
    pub fn files_request(&self, entries: &[FileEntry]) -> Result<FormRequest, FormError> {
        if entries.is_empty() {
            return Err(FormError::FormValidationFailure(
                "select at least one file".to_string(),
            ));
        }

        let mut file_names = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry.status() {
                UploadStatus::Uploaded(token) => file_names.push(token.clone()),
                UploadStatus::Pending => {
                    return Err(FormError::FormValidationFailure(format!(
                        "{} is still uploading",
                        entry.raw_file().name()
                    )))
                }
                UploadStatus::Failed(reason) => {
                    return Err(FormError::FormValidationFailure(format!(
                        "{} failed to upload ({reason}); remove it or select it again",
                        entry.raw_file().name()
                    )))
                }
            }
        }

        let mut request = self.base_request()?;
        request.file_names = file_names;
        Ok(request)
    }

    fn base_request(&self) -> Result<FormRequest, FormError> {
        let password = if self.password_enabled {
            match self.password.as_deref().filter(|p| !p.is_empty()) {
                Some(p) => Some(p.to_string()),
                None => {
                    return Err(FormError::FormValidationFailure(
                        "password is required when password protection is enabled".to_string(),
                    ))
                }
            }
        } else {
            None
        };

        let description = self
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty());
        if let Some(d) = description {
            if d.chars().count() > MAX_DESCRIPTION_CHARS {
                return Err(FormError::FormValidationFailure(format!(
                    "description must be at most {MAX_DESCRIPTION_CHARS} characters"
                )));
            }
        }

        Ok(FormRequest {
            is_password: self.password_enabled,
            password,
            description: description.map(str::to_string),
            expired_days: self.expire.days(),
            file_names: Vec::new(),
            url: None,
        })
    }
}

pub fn today_password(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// Compose the shareable link for a created record.
pub fn short_link(share_base_url: &str, id: &str) -> String {
    format!("{}/{}", share_base_url.trim_end_matches('/'), id)
}

/// Submit `request` and return the short-link id.
pub async fn submit(backend: &dyn UploadBackend, request: &FormRequest) -> Result<String, FormError> {
    let response = backend.create_form(request).await?;
    if response.id.is_empty() {
        return Err(FormError::FormSubmissionFailure(
            "server returned an empty link id".to_string(),
        ));
    }

    tracing::info!(
        id = %response.id,
        files = request.file_names.len(),
        expired_days = request.expired_days,
        "Short link created"
    );
    Ok(response.id)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testutil::{sample_image, MockBackend};
    use crate::upload::{FileUploader, ObjectUrlRegistry, UploadPolicy};

    #[test]
    fn test_expire_days() {
        assert_eq!(ExpireDays::default().days(), 30);
        assert_eq!(ExpireDays::from_days(14), Some(ExpireDays::Fourteen));
        assert_eq!(ExpireDays::from_days(3), None);
        assert_eq!("7".parse::<ExpireDays>(), Ok(ExpireDays::Seven));
        assert!("2".parse::<ExpireDays>().is_err());
    }

    #[test]
    fn test_today_password_format() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(today_password(date), "20250309");
    }

    #[test]
    fn test_fill_today_password_requires_toggle() {
        let mut form = ShortenForm::default();
        form.fill_today_password();
        assert!(form.password.is_none());

        form.password_enabled = true;
        form.fill_today_password();
        assert_eq!(form.password.as_deref().map(str::len), Some(8));
    }

    #[test]
    fn test_url_request() {
        let form = ShortenForm {
            expire: ExpireDays::Seven,
            ..Default::default()
        };
        let request = form.url_request("https://example.com/a?b=c").unwrap();
        assert_eq!(request.url.as_deref(), Some("https://example.com/a?b=c"));
        assert_eq!(request.expired_days, 7);
        assert!(!request.is_password);
        assert!(request.file_names.is_empty());
    }

    #[test]
    fn test_url_request_validation() {
        let form = ShortenForm::default();
        assert!(matches!(
            form.url_request("  "),
            Err(FormError::FormValidationFailure(_))
        ));
        assert!(form.url_request("not a url").is_err());
        assert!(form.url_request("ftp://example.com").is_err());
    }

    #[test]
    fn test_password_required_when_enabled() {
        let form = ShortenForm {
            password_enabled: true,
            password: Some(String::new()),
            ..Default::default()
        };
        assert!(form.url_request("https://example.com").is_err());
    }

    #[test]
    fn test_password_ignored_when_disabled() {
        let form = ShortenForm {
            password_enabled: false,
            password: Some("secret".to_string()),
            ..Default::default()
        };
        let request = form.url_request("https://example.com").unwrap();
        assert!(!request.is_password);
        assert!(request.password.is_none());
    }

    #[test]
    fn test_description_limit_counts_characters() {
        let mut form = ShortenForm {
            description: Some("字".repeat(MAX_DESCRIPTION_CHARS)),
            ..Default::default()
        };
        assert!(form.url_request("https://example.com").is_ok());

        form.description = Some("a".repeat(MAX_DESCRIPTION_CHARS + 1));
        assert!(form.url_request("https://example.com").is_err());
    }

    #[test]
    fn test_wire_format_is_camel_case() {
        let form = ShortenForm {
            password_enabled: true,
            password: Some("20250309".to_string()),
            expire: ExpireDays::One,
            description: Some("holiday photos".to_string()),
        };
        let mut request = form.base_request().unwrap();
        request.file_names = vec!["token-a".to_string()];

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "isPassword": true,
                "password": "20250309",
                "description": "holiday photos",
                "expiredDays": 1,
                "fileNames": ["token-a"],
            })
        );
    }

    #[tokio::test]
    async fn test_files_request_collects_tokens_in_order() {
        let backend = Arc::new(MockBackend::new());
        let uploader = FileUploader::new(
            UploadPolicy::images(),
            backend.clone(),
            Arc::new(ObjectUrlRegistry::new()),
        );
        uploader
            .offer(vec![sample_image("a.png", 10), sample_image("b.png", 10)])
            .await;

        let request = ShortenForm::default()
            .files_request(&uploader.entries())
            .unwrap();
        assert_eq!(request.file_names, vec!["token-a.png", "token-b.png"]);

        let id = submit(backend.as_ref(), &request).await.unwrap();
        assert_eq!(id, "aB3x");
        assert_eq!(backend.submitted_forms(), vec![request]);
    }

    #[tokio::test]
    async fn test_files_request_rejects_failed_uploads() {
        let uploader = FileUploader::new(
            UploadPolicy::images(),
            Arc::new(MockBackend::new().failing_on("b.png")),
            Arc::new(ObjectUrlRegistry::new()),
        );
        uploader
            .offer(vec![sample_image("a.png", 10), sample_image("b.png", 10)])
            .await;

        let err = ShortenForm::default()
            .files_request(&uploader.entries())
            .unwrap_err();
        assert!(err.to_string().contains("b.png"));
    }

    #[test]
    fn test_files_request_requires_a_file() {
        assert!(ShortenForm::default().files_request(&[]).is_err());
    }

    #[test]
    fn test_short_link() {
        assert_eq!(short_link("https://ezurl.io/", "aB3x"), "https://ezurl.io/aB3x");
    }
}
