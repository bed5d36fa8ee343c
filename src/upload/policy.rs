//! Per-upload constraints and the batch validation pass.

use super::{AcceptedKind, RawFile, UploadError};

/// Default per-file limit: 70MB
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 70 * 1024 * 1024;

/// Constraints for one uploader instance. Immutable while the uploader holds it;
/// switching policy goes through [`FileUploader::reset`](super::FileUploader::reset).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_file_size_bytes: u64,
    pub accepted_kind: AcceptedKind,
    pub max_files: usize,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            accepted_kind: AcceptedKind::Any,
            max_files: 5,
        }
    }
}

impl UploadPolicy {
    /// Build a policy, rejecting zero limits.
    pub fn new(
        max_file_size_bytes: u64,
        accepted_kind: AcceptedKind,
        max_files: usize,
    ) -> Option<Self> {
        if max_file_size_bytes == 0 || max_files == 0 {
            return None;
        }
        Some(Self {
            max_file_size_bytes,
            accepted_kind,
            max_files,
        })
    }

    /// Image tab: up to three images of 70MB each.
    pub fn images() -> Self {
        Self {
            accepted_kind: AcceptedKind::Image,
            max_files: 3,
            ..Self::default()
        }
    }

    /// Video tab: a single video of at most 70MB.
    pub fn video() -> Self {
        Self {
            accepted_kind: AcceptedKind::Video,
            max_files: 1,
            ..Self::default()
        }
    }

    /// Check a single candidate against the size and type rules. First match wins.
    pub fn check(&self, file: &RawFile) -> Result<(), (RejectReason, UploadError)> {
        if file.size() > self.max_file_size_bytes {
            return Err((
                RejectReason::TooLarge,
                UploadError::FileTooLarge {
                    name: file.name().to_string(),
                    limit: self.max_file_size_bytes,
                },
            ));
        }

        if !self.accepted_kind.admits(file.kind()) {
            return Err((
                RejectReason::WrongType,
                UploadError::WrongFileType {
                    name: file.name().to_string(),
                    expected: self.accepted_kind,
                },
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    TooLarge,
    TooMany,
    WrongType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted,
    Rejected(RejectReason),
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted)
    }
}

/// Result of validating one batch.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// One outcome per candidate, in offered order
    pub outcomes: Vec<ValidationOutcome>,
    /// The last rejection encountered, if any
    pub error: Option<UploadError>,
}

impl ValidationReport {
    pub fn accepted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_accepted()).count()
    }
}

/// Validate a batch of candidates against `policy`, given `current_len` files
/// already selected.
///
/// A batch that would push the selection past `max_files` is rejected as a
/// whole before any file is inspected. Otherwise each file is checked on its
/// own and only the last rejection is reported.
pub fn validate_batch(
    current_len: usize,
    policy: &UploadPolicy,
    candidates: &[RawFile],
) -> ValidationReport {
    if current_len + candidates.len() > policy.max_files {
        return ValidationReport {
            outcomes: vec![ValidationOutcome::Rejected(RejectReason::TooMany); candidates.len()],
            error: Some(UploadError::TooManyFiles {
                max: policy.max_files,
            }),
        };
    }

    let mut report = ValidationReport {
        outcomes: Vec::with_capacity(candidates.len()),
        error: None,
    };

    for file in candidates {
        match policy.check(file) {
            Ok(()) => report.outcomes.push(ValidationOutcome::Accepted),
            Err((reason, error)) => {
                tracing::debug!(file = %file.name(), ?reason, "Rejected candidate file");
                report.outcomes.push(ValidationOutcome::Rejected(reason));
                report.error = Some(error);
            }
        }
    }

    report
}
