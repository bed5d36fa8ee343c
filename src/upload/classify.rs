/// Classification of a file derived from its declared MIME type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Other,
    Video,
}

/// The kind of file an uploader instance admits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AcceptedKind {
    /// Images and videos, nothing else
    #[default]
    Any,
    Image,
    Video,
}

impl FileKind {
    /// Derive a file kind from a MIME type string.
    pub fn from_mime(mime_type: &str) -> Self {
        if mime_type.starts_with("image/") {
            FileKind::Image
        } else if mime_type.starts_with("video/") {
            FileKind::Video
        } else {
            FileKind::Other
        }
    }
}

impl AcceptedKind {
    pub fn admits(self, kind: FileKind) -> bool {
        match self {
            AcceptedKind::Any => matches!(kind, FileKind::Image | FileKind::Video),
            AcceptedKind::Image => kind == FileKind::Image,
            AcceptedKind::Video => kind == FileKind::Video,
        }
    }

    /// Filter string for a file picker's `accept` attribute.
    pub fn accept_attr(self) -> &'static str {
        match self {
            AcceptedKind::Any => "image/*,video/*",
            AcceptedKind::Image => "image/*",
            AcceptedKind::Video => "video/*",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AcceptedKind::Any => "images and videos",
            AcceptedKind::Image => "images",
            AcceptedKind::Video => "videos",
        }
    }

    /// Noun phrase used in rejection messages ("is not an image").
    pub fn describe(self) -> &'static str {
        match self {
            AcceptedKind::Any => "an image or video",
            AcceptedKind::Image => "an image",
            AcceptedKind::Video => "a video",
        }
    }
}

pub fn classify(mime_type: &str) -> FileKind {
    FileKind::from_mime(mime_type)
}

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Format a byte count with base-1024 units and two decimals ("1.50 KB").
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{value:.2} {}", SIZE_UNITS[unit])
}
