//! The ordered set of selected files and the upload loop that feeds it.
//!
//! Batches are queued behind a FIFO writer lock, so each batch validates
//! against the final length of the one before it. The selection itself sits
//! behind a short-lived lock that is never held across an upload: entries can
//! be read, removed or reset while a batch is still in flight, and each upload
//! result is written back to its entry by id.

use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use super::policy::{self, UploadPolicy, ValidationOutcome};
use super::{AcceptedKind, PreviewAllocator, PreviewHandle, RawFile, UploadError};
use crate::api::UploadBackend;

/// Upload state of one selected file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Pending,
    Uploaded(String),
    Failed(String),
}

/// One accepted file, its preview and its upload state.
#[derive(Debug)]
pub struct FileEntry {
    id: u64,
    raw_file: RawFile,
    preview: PreviewHandle,
    status: UploadStatus,
}

impl FileEntry {
    /// Stable for the lifetime of the entry, unlike its index.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn raw_file(&self) -> &RawFile {
        &self.raw_file
    }

    pub fn preview(&self) -> &PreviewHandle {
        &self.preview
    }

    pub fn status(&self) -> &UploadStatus {
        &self.status
    }

    /// The server token, present only once the upload succeeded.
    pub fn server_token(&self) -> Option<&str> {
        match &self.status {
            UploadStatus::Uploaded(token) => Some(token),
            _ => None,
        }
    }
}

/// Called with the full entry list after every completed mutation.
pub type FilesSelectedCallback = Box<dyn Fn(&[FileEntry]) + Send + Sync>;

/// Summary of one `offer` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// Validation outcome per offered file, in offered order
    pub outcomes: Vec<ValidationOutcome>,
    pub uploaded: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn accepted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_accepted()).count()
    }
}

struct SelectionState {
    entries: Vec<FileEntry>,
    /// Only the most recent error is kept
    error: Option<UploadError>,
    next_id: u64,
    policy: UploadPolicy,
}

impl SelectionState {
    fn entry_mut(&mut self, id: u64) -> Option<&mut FileEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }
}

/// Read-only view of the selection. Holds the selection lock until dropped,
/// so keep it out of `.await` points.
pub struct Selection<'a> {
    guard: MutexGuard<'a, SelectionState>,
}

impl Deref for Selection<'_> {
    type Target = [FileEntry];

    fn deref(&self) -> &[FileEntry] {
        &self.guard.entries
    }
}

pub struct FileUploader {
    backend: Arc<dyn UploadBackend>,
    batches: tokio::sync::Mutex<()>,
    cancel: CancellationToken,
    on_files_selected: Option<FilesSelectedCallback>,
    previews: Arc<dyn PreviewAllocator>,
    state: Mutex<SelectionState>,
}

/// Settles a batch when the upload loop ends, including when the `offer`
/// future is dropped part way: entries still `Pending` become `Failed`, and
/// the callback fires.
struct BatchGuard<'a> {
    uploader: &'a FileUploader,
    ids: Vec<u64>,
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.uploader.state();
        let mut cancelled = 0;
        for id in &self.ids {
            if let Some(entry) = state.entry_mut(*id) {
                if entry.status == UploadStatus::Pending {
                    entry.status = UploadStatus::Failed(UploadError::Cancelled.to_string());
                    cancelled += 1;
                }
            }
        }
        if cancelled > 0 {
            tracing::warn!(cancelled, "Batch ended before all uploads finished");
            state.error = Some(UploadError::Cancelled);
        }

        self.uploader.notify(&state.entries);
    }
}

impl FileUploader {
    pub fn new(
        policy: UploadPolicy,
        backend: Arc<dyn UploadBackend>,
        previews: Arc<dyn PreviewAllocator>,
    ) -> Self {
        Self {
            backend,
            batches: tokio::sync::Mutex::new(()),
            cancel: CancellationToken::new(),
            on_files_selected: None,
            previews,
            state: Mutex::new(SelectionState {
                entries: Vec::new(),
                error: None,
                next_id: 0,
                policy,
            }),
        }
    }

    pub fn with_on_files_selected<F>(mut self, callback: F) -> Self
    where
        F: Fn(&[FileEntry]) + Send + Sync + 'static,
    {
        self.on_files_selected = Some(Box::new(callback));
        self
    }

    /// Tie in-flight uploads to an outer lifetime. Cancelling `token` (or
    /// dropping the uploader) aborts the current upload.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn state(&self) -> MutexGuard<'_, SelectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate `batch`, add the accepted files and upload them one at a time.
    ///
    /// A file whose upload fails stays selected with a `Failed` status; other
    /// entries are untouched.
    pub async fn offer(&self, batch: Vec<RawFile>) -> BatchReport {
        if batch.is_empty() {
            return BatchReport::default();
        }

        let _queued = self.batches.lock().await;

        let (mut report, ids) = {
            let mut state = self.state();
            state.error = None;

            let validation = policy::validate_batch(state.entries.len(), &state.policy, &batch);
            state.error = validation.error;

            let report = BatchReport {
                outcomes: validation.outcomes,
                ..Default::default()
            };
            if report.accepted() == 0 {
                return report;
            }

            let mut ids = Vec::with_capacity(report.accepted());
            for (raw_file, outcome) in batch.into_iter().zip(&report.outcomes) {
                if outcome.is_accepted() {
                    let id = state.next_id;
                    state.next_id += 1;
                    let preview = self.previews.allocate(&raw_file);
                    state.entries.push(FileEntry {
                        id,
                        raw_file,
                        preview,
                        status: UploadStatus::Pending,
                    });
                    ids.push(id);
                }
            }
            (report, ids)
        };

        let guard = BatchGuard {
            uploader: self,
            ids: ids.clone(),
        };

        for id in ids {
            // Removed or reset away before its turn
            let Some(raw_file) = self.state().entry_mut(id).map(|e| e.raw_file.clone()) else {
                continue;
            };

            let result = self.upload_one(&raw_file).await;

            let mut state = self.state();
            match result {
                Ok(token) => {
                    report.uploaded += 1;
                    if let Some(entry) = state.entry_mut(id) {
                        entry.status = UploadStatus::Uploaded(token);
                    }
                }
                Err(e) => {
                    tracing::warn!(file = %raw_file.name(), error = %e, "Upload failed");
                    report.failed += 1;
                    if let Some(entry) = state.entry_mut(id) {
                        entry.status = UploadStatus::Failed(e.to_string());
                    }
                    state.error = Some(e);
                }
            }
        }

        tracing::debug!(
            accepted = report.accepted(),
            uploaded = report.uploaded,
            failed = report.failed,
            "Applied batch"
        );

        drop(guard);
        report
    }

    async fn upload_one(&self, file: &RawFile) -> Result<String, UploadError> {
        if self.cancel.is_cancelled() {
            return Err(UploadError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(UploadError::Cancelled),
            result = self.backend.upload(file) => result,
        }
    }

    /// Remove the entry at `index`, releasing its preview. Later entries shift
    /// down by one. Allowed while a batch is uploading.
    pub fn remove(&self, index: usize) -> Result<(), UploadError> {
        let mut state = self.state();
        if index >= state.entries.len() {
            return Err(UploadError::NoSuchEntry(index));
        }

        let entry = state.entries.remove(index);
        self.previews.release(entry.preview);
        tracing::debug!(index, file = %entry.raw_file.name(), "Removed file");

        self.notify(&state.entries);
        Ok(())
    }

    /// Switch to a new policy, dropping the whole selection and its previews.
    pub fn reset(&self, policy: UploadPolicy) {
        let mut state = self.state();
        for entry in state.entries.drain(..) {
            self.previews.release(entry.preview);
        }
        state.error = None;
        state.policy = policy;

        self.notify(&state.entries);
    }

    /// Change only the accepted kind; same reset semantics as [`Self::reset`].
    pub fn set_accepted_kind(&self, kind: AcceptedKind) {
        let policy = UploadPolicy {
            accepted_kind: kind,
            ..self.policy()
        };
        self.reset(policy);
    }

    /// Abort the in-flight upload, if any. Later batches fail immediately.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn entries(&self) -> Selection<'_> {
        Selection {
            guard: self.state(),
        }
    }

    pub fn len(&self) -> usize {
        self.state().entries.len()
    }

    pub fn is_full(&self) -> bool {
        self.remaining() == 0
    }

    /// Number of files that can still be added.
    pub fn remaining(&self) -> usize {
        let state = self.state();
        state.policy.max_files.saturating_sub(state.entries.len())
    }

    pub fn error(&self) -> Option<UploadError> {
        self.state().error.clone()
    }

    /// Dismiss the current error message.
    pub fn clear_error(&self) {
        self.state().error = None;
    }

    pub fn policy(&self) -> UploadPolicy {
        self.state().policy.clone()
    }

    pub fn statuses(&self) -> Vec<UploadStatus> {
        self.state()
            .entries
            .iter()
            .map(|e| e.status.clone())
            .collect()
    }

    /// Tokens of all successfully uploaded entries, in selection order.
    pub fn server_tokens(&self) -> Vec<String> {
        self.state()
            .entries
            .iter()
            .filter_map(|e| e.server_token().map(str::to_string))
            .collect()
    }

    fn notify(&self, entries: &[FileEntry]) {
        if let Some(callback) = &self.on_files_selected {
            callback(entries);
        }
    }
}

impl Drop for FileUploader {
    fn drop(&mut self) {
        self.cancel.cancel();
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        for entry in state.entries.drain(..) {
            self.previews.release(entry.preview);
        }
    }
}
