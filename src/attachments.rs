//! Image attachments selected for one diagnosis.
//!
//! Each attachment owns an optional preview handle, a revocable local
//! reference used to render a thumbnail. Handles are released exactly
//! once: on `remove`, on `clear`, or when the manager is dropped.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use uuid::Uuid;

use crate::models::ImageFile;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreviewError {
    #[error("Cannot preview empty file: {0}")]
    EmptyFile(String),
    #[error("Preview unavailable: {0}")]
    Unavailable(String),
}

/// Opaque, revocable preview reference (`blob:<id>`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewHandle(String);

impl PreviewHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Issues and revokes preview handles.
pub trait PreviewProvider {
    fn create(&self, file: &ImageFile) -> Result<PreviewHandle, PreviewError>;
    fn revoke(&self, handle: &PreviewHandle);
}

/// One selected image plus its preview slot.
#[derive(Debug)]
pub struct ImageAttachment {
    file: ImageFile,
    preview: Option<PreviewHandle>,
}

impl ImageAttachment {
    pub fn file(&self) -> &ImageFile {
        &self.file
    }

    pub fn media_type(&self) -> &str {
        &self.file.media_type
    }

    pub fn size_bytes(&self) -> usize {
        self.file.size_bytes()
    }

    /// `None` when preview generation failed; render a placeholder instead.
    pub fn preview(&self) -> Option<&PreviewHandle> {
        self.preview.as_ref()
    }
}

/// Ordered set of attachments for one authoring session.
pub struct AttachmentManager<P: PreviewProvider> {
    provider: P,
    attachments: Vec<ImageAttachment>,
}

impl<P: PreviewProvider> AttachmentManager<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            attachments: Vec::new(),
        }
    }

    /// Append files in order, generating a preview for each.
    ///
    /// Preview failure is not fatal: the attachment is kept without one
    /// and still counts toward submission.
    pub fn add<I>(&mut self, files: I)
    where
        I: IntoIterator<Item = ImageFile>,
    {
        for file in files {
            let preview = match self.provider.create(&file) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    tracing::warn!(
                        file_name = %file.file_name,
                        error = %e,
                        "Preview generation failed, keeping attachment without preview"
                    );
                    None
                }
            };
            self.attachments.push(ImageAttachment { file, preview });
        }
    }

    /// Remove the attachment at `index`, releasing its preview.
    ///
    /// Out-of-range indices are a no-op and return `None`.
    pub fn remove(&mut self, index: usize) -> Option<ImageFile> {
        if index >= self.attachments.len() {
            return None;
        }
        let attachment = self.attachments.remove(index);
        if let Some(handle) = &attachment.preview {
            self.provider.revoke(handle);
        }
        Some(attachment.file)
    }

    /// Release every preview, then empty the set.
    pub fn clear(&mut self) {
        for attachment in self.attachments.drain(..) {
            if let Some(handle) = &attachment.preview {
                self.provider.revoke(handle);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.attachments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attachments.is_empty()
    }

    pub fn attachments(&self) -> &[ImageAttachment] {
        &self.attachments
    }

    /// Snapshot of the selected files, in order, for composing a submission.
    pub fn files(&self) -> Vec<ImageFile> {
        self.attachments.iter().map(|a| a.file.clone()).collect()
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

impl<P: PreviewProvider> Drop for AttachmentManager<P> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// In-memory object URL registry.
///
/// Hands out unique `blob:` handles and tracks which are still live.
/// Clones share the same registry.
#[derive(Debug, Clone, Default)]
pub struct ObjectUrlRegistry {
    live: Arc<Mutex<HashSet<String>>>,
}

impl ObjectUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of handles created and not yet revoked.
    pub fn live_count(&self) -> usize {
        self.live.lock().map(|set| set.len()).unwrap_or(0)
    }

    pub fn is_live(&self, handle: &PreviewHandle) -> bool {
        self.live
            .lock()
            .map(|set| set.contains(handle.as_str()))
            .unwrap_or(false)
    }
}

impl PreviewProvider for ObjectUrlRegistry {
    fn create(&self, file: &ImageFile) -> Result<PreviewHandle, PreviewError> {
        if file.data.is_empty() {
            return Err(PreviewError::EmptyFile(file.file_name.clone()));
        }
        let url = format!("blob:{}", Uuid::new_v4());
        self.live
            .lock()
            .map_err(|_| PreviewError::Unavailable("registry lock poisoned".into()))?
            .insert(url.clone());
        Ok(PreviewHandle(url))
    }

    fn revoke(&self, handle: &PreviewHandle) {
        match self.live.lock() {
            Ok(mut set) => {
                if !set.remove(handle.as_str()) {
                    tracing::warn!(handle = handle.as_str(), "Revoking unknown preview handle");
                }
            }
            Err(_) => tracing::error!("Preview registry lock poisoned"),
        }
    }
}
