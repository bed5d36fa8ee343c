use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client};

use super::response::{FormResponse, UploadResponse};
use super::{UploadBackend, FORM_PATH, UPLOAD_PATH};
use crate::config::ApiConfig;
use crate::form::{FormError, FormRequest};
use crate::upload::{RawFile, UploadError};

/// reqwest-based client for the EZURL HTTP API.
pub struct HttpBackend {
    base_url: String,
    client: Client,
}

impl HttpBackend {
    /// `timeout` of `None` leaves the transport default in place.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: builder.build()?,
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self, reqwest::Error> {
        Self::new(
            &config.base_url,
            config.request_timeout_secs.map(Duration::from_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn file_part(file: &RawFile) -> Part {
        let part = Part::stream_with_length(file.data().clone(), file.size())
            .file_name(file.name().to_string());

        // An unparseable declared type falls back to reqwest's default.
        match part.mime_str(file.mime_type()) {
            Ok(part) => part,
            Err(_) => Part::stream_with_length(file.data().clone(), file.size())
                .file_name(file.name().to_string()),
        }
    }
}

#[async_trait]
impl UploadBackend for HttpBackend {
    async fn upload(&self, file: &RawFile) -> Result<String, UploadError> {
        let form = Form::new().part("file", Self::file_part(file));

        let resp = self
            .client
            .post(self.url(UPLOAD_PATH))
            .header(header::ACCEPT, "application/json")
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::UploadTransportFailure(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(UploadError::UploadTransportFailure(format!(
                "{} returned {status}: {body}",
                file.name()
            )));
        }

        let body: UploadResponse = resp.json().await.map_err(|e| {
            UploadError::UploadTransportFailure(format!("Invalid upload response: {e}"))
        })?;

        let token = body.into_token().map_err(|message| {
            UploadError::UploadRejectedByServer(format!("{}: {message}", file.name()))
        })?;

        tracing::debug!(file = %file.name(), token = %token, "Uploaded file");
        Ok(token)
    }

    async fn create_form(&self, request: &FormRequest) -> Result<FormResponse, FormError> {
        let resp = self
            .client
            .post(self.url(FORM_PATH))
            .header(header::ACCEPT, "*/*")
            .json(request)
            .send()
            .await
            .map_err(|e| FormError::FormSubmissionFailure(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(FormError::FormSubmissionFailure(format!(
                "Form creation failed ({status}): {body}"
            )));
        }

        let form: FormResponse = resp
            .json()
            .await
            .map_err(|e| FormError::FormSubmissionFailure(format!("Invalid form response: {e}")))?;

        tracing::debug!(id = %form.id, "Created short link");
        Ok(form)
    }
}
