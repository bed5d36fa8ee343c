//! Shared test helpers for ezurl-uploader unit tests.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::api::response::FormResponse;
use crate::api::UploadBackend;
use crate::form::{FormError, FormRequest};
use crate::upload::{RawFile, UploadError};

pub fn sample_image(name: &str, size: usize) -> RawFile {
    RawFile::new(name, "image/png", vec![0u8; size])
}

pub fn sample_video(name: &str, size: usize) -> RawFile {
    RawFile::new(name, "video/mp4", vec![0u8; size])
}

pub fn sample_text(name: &str, size: usize) -> RawFile {
    RawFile::new(name, "text/plain", vec![b'x'; size])
}

/// Scripted in-memory backend. Uploads succeed with `token-<name>` unless
/// the file name was registered with [`MockBackend::failing_on`].
#[derive(Default)]
pub struct MockBackend {
    delay: Option<Duration>,
    failing: Vec<String>,
    forms: Mutex<Vec<FormRequest>>,
    hanging: bool,
    uploads: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(mut self, name: &str) -> Self {
        self.failing.push(name.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Uploads never complete.
    pub fn hanging(mut self) -> Self {
        self.hanging = true;
        self
    }

    /// Names of every file whose upload was attempted, in order.
    pub fn uploaded_names(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn submitted_forms(&self) -> Vec<FormRequest> {
        self.forms.lock().unwrap().clone()
    }
}

#[async_trait]
impl UploadBackend for MockBackend {
    async fn upload(&self, file: &RawFile) -> Result<String, UploadError> {
        self.uploads.lock().unwrap().push(file.name().to_string());

        if self.hanging {
            std::future::pending::<()>().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.iter().any(|n| n == file.name()) {
            return Err(UploadError::UploadRejectedByServer(format!(
                "{} was rejected",
                file.name()
            )));
        }

        Ok(format!("token-{}", file.name()))
    }

    async fn create_form(&self, request: &FormRequest) -> Result<FormResponse, FormError> {
        self.forms.lock().unwrap().push(request.clone());
        Ok(FormResponse {
            id: "aB3x".to_string(),
        })
    }
}
