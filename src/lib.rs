//! ezurl-uploader - Upload pipeline and client for the EZURL link and media shortener
//!
//! This crate provides the client half of EZURL:
//! - File classification and policy-based validation of offered batches
//! - Revocable preview handles tied to the lifetime of each selected file
//! - Sequential, cancellable uploads to the EZURL backend over HTTP
//! - The shortening form that turns uploaded files (or a URL) into a short link

pub mod api;
pub mod config;
pub mod form;
pub mod upload;
#[cfg(test)]
pub mod testutil;

use std::sync::Arc;

use api::UploadBackend;
use config::Config;
use upload::{FileUploader, ObjectUrlRegistry, PreviewAllocator, UploadPolicy};

/// Shared client state
pub struct Session {
    pub config: Config,
    pub backend: Arc<dyn UploadBackend>,
    pub previews: Arc<dyn PreviewAllocator>,
}

impl Session {
    pub fn new(config: Config, backend: Arc<dyn UploadBackend>) -> Self {
        Self {
            config,
            backend,
            previews: Arc::new(ObjectUrlRegistry::new()),
        }
    }

    /// A fresh uploader sharing this session's backend and preview registry.
    pub fn uploader(&self, policy: UploadPolicy) -> FileUploader {
        FileUploader::new(policy, Arc::clone(&self.backend), Arc::clone(&self.previews))
    }
}
