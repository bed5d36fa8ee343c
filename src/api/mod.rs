mod client;
pub mod response;

pub use client::HttpBackend;

use async_trait::async_trait;

use crate::form::{FormError, FormRequest};
use crate::upload::{RawFile, UploadError};
use response::FormResponse;

/// Upload endpoint
pub const UPLOAD_PATH: &str = "/api/File/Upload";
/// Short-link creation endpoint
pub const FORM_PATH: &str = "/api/Form";

/// The EZURL backend as seen by the client.
/// Short codes, storage and expiry all live behind this boundary.
#[async_trait]
pub trait UploadBackend: Send + Sync {
    /// Upload one file, returning the server-issued reference token.
    async fn upload(&self, file: &RawFile) -> Result<String, UploadError>;
    /// Create the short-link record.
    async fn create_form(&self, request: &FormRequest) -> Result<FormResponse, FormError>;
}
