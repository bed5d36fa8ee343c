use serde::{Deserialize, Serialize};

/// Body returned by `POST /api/File/Upload`.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    /// Server token for the uploaded file
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl UploadResponse {
    /// The token when the backend reports success, otherwise its message.
    pub fn into_token(self) -> Result<String, String> {
        match (self.success, self.data) {
            (true, Some(token)) if !token.is_empty() => Ok(token),
            (true, _) => Err(self
                .message
                .unwrap_or_else(|| "server returned no file reference".to_string())),
            (false, _) => Err(self
                .message
                .unwrap_or_else(|| "upload was not accepted".to_string())),
        }
    }
}

/// Body returned by `POST /api/Form`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormResponse {
    /// Short-link path segment
    pub id: String,
}
