use std::collections::HashMap;
use std::sync::Mutex;

use bytes::Bytes;

use super::RawFile;

/// A revocable local reference to a selected file's bytes, used to render a
/// thumbnail without reading the file again.
///
/// Not `Clone`: each handle has a single owner, and releasing it consumes it.
#[derive(Debug, PartialEq, Eq)]
pub struct PreviewHandle {
    url: String,
}

impl PreviewHandle {
    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Allocates and releases preview handles.
pub trait PreviewAllocator: Send + Sync {
    fn allocate(&self, file: &RawFile) -> PreviewHandle;
    fn release(&self, handle: PreviewHandle);
    /// Bytes behind a live handle, or `None` once it has been released.
    fn resolve(&self, handle: &PreviewHandle) -> Option<Bytes>;
    fn live_count(&self) -> usize;
}

/// In-process registry of `blob:` style object URLs.
#[derive(Default)]
pub struct ObjectUrlRegistry {
    live: Mutex<HashMap<String, Bytes>>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn live(&self) -> std::sync::MutexGuard<'_, HashMap<String, Bytes>> {
        self.live.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PreviewAllocator for ObjectUrlRegistry {
    fn allocate(&self, file: &RawFile) -> PreviewHandle {
        let url = format!("blob:ezurl/{}", uuid::Uuid::new_v4());
        self.live().insert(url.clone(), file.data().clone());
        tracing::trace!(%url, file = %file.name(), "Allocated preview");
        PreviewHandle { url }
    }

    fn release(&self, handle: PreviewHandle) {
        if self.live().remove(&handle.url).is_none() {
            tracing::warn!(url = %handle.url, "Released a preview this registry does not hold");
        } else {
            tracing::trace!(url = %handle.url, "Released preview");
        }
    }

    fn resolve(&self, handle: &PreviewHandle) -> Option<Bytes> {
        self.live().get(&handle.url).cloned()
    }

    fn live_count(&self) -> usize {
        self.live().len()
    }
}
