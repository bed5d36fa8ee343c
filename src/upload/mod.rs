mod classify;
pub mod policy;
mod preview;
mod selection;

pub use classify::{classify, format_size, AcceptedKind, FileKind};
pub use policy::{RejectReason, UploadPolicy, ValidationOutcome};
pub use preview::{ObjectUrlRegistry, PreviewAllocator, PreviewHandle};
pub use selection::{
    BatchReport, FileEntry, FileUploader, FilesSelectedCallback, Selection, UploadStatus,
};

use std::path::Path;

use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("At most {max} files can be uploaded")]
    TooManyFiles { max: usize },
    #[error("File {name} exceeds the maximum size of {}", size_limit(.limit))]
    FileTooLarge { name: String, limit: u64 },
    #[error("File {name} is not {}", .expected.describe())]
    WrongFileType { name: String, expected: AcceptedKind },
    #[error("Upload failed: {0}")]
    UploadTransportFailure(String),
    #[error("Upload rejected by server: {0}")]
    UploadRejectedByServer(String),
    #[error("Upload cancelled")]
    Cancelled,
    #[error("No selected file at index {0}")]
    NoSuchEntry(usize),
}

fn size_limit(limit: &u64) -> String {
    format_size(*limit)
}

/// A file offered for upload: its name, declared MIME type and bytes.
/// Cloning shares the underlying buffer.
#[derive(Debug, Clone)]
pub struct RawFile {
    name: String,
    mime_type: String,
    data: Bytes,
}

impl RawFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Read a file from disk, guessing its MIME type from the extension.
    pub async fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        let mime_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.to_string())
            .unwrap_or_else(|| "application/octet-stream".to_string());

        Ok(Self::new(name, mime_type, data))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn kind(&self) -> FileKind {
        classify(&self.mime_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_file() {
        let err = UploadError::FileTooLarge {
            name: "big.png".to_string(),
            limit: 70 * 1024 * 1024,
        };
        assert_eq!(
            err.to_string(),
            "File big.png exceeds the maximum size of 70.00 MB"
        );

        let err = UploadError::WrongFileType {
            name: "clip.mp4".to_string(),
            expected: AcceptedKind::Image,
        };
        assert_eq!(err.to_string(), "File clip.mp4 is not an image");
    }

    #[test]
    fn test_raw_file_clone_shares_bytes() {
        let file = RawFile::new("a.png", "image/png", vec![0u8; 16]);
        let copy = file.clone();
        assert_eq!(copy.data().as_ptr(), file.data().as_ptr());
        assert_eq!(copy.size(), 16);
        assert_eq!(copy.kind(), FileKind::Image);
    }
}
