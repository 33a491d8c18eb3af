//! # Image Attachment Manager
//!
//! Validates, uploads and removes images for avatars and drafts.
//!
//! Storage keys are `{owner}/{timestamp}-{token}.{ext}` for content images.
//! Avatars use `{owner}/{timestamp}.{ext}` with no token, so two avatar
//! uploads by the same user in the same millisecond collide and the second
//! one fails with whatever the object store reports for a duplicate key.

use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use domains::error::{AppError, Result};
use domains::models::{UploadedImage, User};
use domains::traits::ObjectStore;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::flat::FlatDraft;

pub const MIB: u64 = 1024 * 1024;

/// What an upload is for; decides the size limit and key shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPurpose {
    Avatar,
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    pub avatar_max_bytes: u64,
    pub content_max_bytes: u64,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            avatar_max_bytes: 5 * MIB,
            content_max_bytes: 10 * MIB,
        }
    }
}

impl UploadLimits {
    pub fn for_purpose(&self, purpose: UploadPurpose) -> u64 {
        match purpose {
            UploadPurpose::Avatar => self.avatar_max_bytes,
            UploadPurpose::Content => self.content_max_bytes,
        }
    }
}

/// A file picked by the user, before upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    /// Original filename
    pub name: String,
    /// Declared MIME type, e.g. `image/png`
    pub content_type: String,
    pub bytes: Bytes,
}

impl FileUpload {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Lowercased filename extension, falling back to one known for the MIME type.
    pub fn extension(&self) -> String {
        let from_name = Path::new(&self.name)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()));
        if let Some(ext) = from_name {
            return ext.to_ascii_lowercase();
        }
        self.content_type
            .parse::<mime::Mime>()
            .ok()
            .and_then(|m| mime_guess::get_mime_extensions(&m))
            .and_then(|exts| exts.first())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "bin".to_string())
    }
}

/// Upload progress for a batch, reported each time one file finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchProgress {
    pub completed: usize,
    pub total: usize,
}

/// Checks MIME type and size against the limit for `purpose`.
pub fn validate(file: &FileUpload, purpose: UploadPurpose, limits: &UploadLimits) -> Result<()> {
    let is_image = file
        .content_type
        .parse::<mime::Mime>()
        .map(|m| m.type_() == mime::IMAGE)
        .unwrap_or(false);
    if !is_image {
        return Err(AppError::InvalidFileType(file.content_type.clone()));
    }

    let limit = limits.for_purpose(purpose);
    if file.size() > limit {
        return Err(AppError::FileTooLarge {
            size: file.size(),
            limit,
        });
    }
    Ok(())
}

/// Builds the object-store key for an upload.
pub fn storage_key(owner: Uuid, purpose: UploadPurpose, timestamp_ms: i64, ext: &str) -> String {
    match purpose {
        UploadPurpose::Avatar => format!("{owner}/{timestamp_ms}.{ext}"),
        UploadPurpose::Content => {
            let token = Uuid::new_v4().simple().to_string();
            format!("{owner}/{timestamp_ms}-{}.{ext}", &token[..12])
        }
    }
}

pub struct AttachmentManager {
    store: Arc<dyn ObjectStore>,
    limits: UploadLimits,
}

impl AttachmentManager {
    pub fn new(store: Arc<dyn ObjectStore>, limits: UploadLimits) -> Self {
        Self { store, limits }
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    pub fn validate(&self, file: &FileUpload, purpose: UploadPurpose) -> Result<()> {
        validate(file, purpose, &self.limits)
    }

    /// Validates and stores one file for the signed-in user.
    #[instrument(skip(self, user, file), fields(file = %file.name, size = file.size()))]
    pub async fn upload(
        &self,
        user: Option<&User>,
        file: &FileUpload,
        purpose: UploadPurpose,
    ) -> Result<UploadedImage> {
        let user = user.ok_or(AppError::NotAuthenticated)?;
        self.validate(file, purpose)?;
        self.store_file(user.id, file, purpose).await
    }

    /// Uploads every file concurrently, all or nothing.
    ///
    /// The first failure is returned and none of the files that did upload
    /// are handed back. `on_progress` sees `completed` go up by one per
    /// finished file. Results come back in input order.
    #[instrument(skip_all, fields(files = files.len()))]
    pub async fn upload_batch<F>(
        &self,
        user: Option<&User>,
        files: &[FileUpload],
        purpose: UploadPurpose,
        mut on_progress: F,
    ) -> Result<Vec<UploadedImage>>
    where
        F: FnMut(BatchProgress),
    {
        let user = user.ok_or(AppError::NotAuthenticated)?;
        for file in files {
            self.validate(file, purpose)?;
        }

        let total = files.len();
        let mut pending = files
            .iter()
            .enumerate()
            .map(|(index, file)| async move { (index, self.store_file(user.id, file, purpose).await) })
            .collect::<FuturesUnordered<_>>();

        let mut uploaded: Vec<Option<UploadedImage>> = vec![None; total];
        let mut completed = 0;
        while let Some((index, result)) = pending.next().await {
            let image = result?;
            uploaded[index] = Some(image);
            completed += 1;
            on_progress(BatchProgress { completed, total });
        }

        info!(count = total, "batch upload complete");
        Ok(uploaded.into_iter().flatten().collect())
    }

    /// Best-effort delete. Storage failures are logged and swallowed.
    #[instrument(skip(self))]
    pub async fn remove(&self, image_id: &str) {
        match self.store.delete_object(image_id).await {
            Ok(()) => debug!("attachment deleted from storage"),
            Err(e) => warn!(error = %e, "failed to delete attachment from storage"),
        }
    }

    /// Removes the attachment from the draft, then deletes it from storage.
    /// The draft is updated whether or not the storage delete succeeds.
    pub async fn remove_from_draft(&self, draft: &mut FlatDraft, image_id: &str) -> Option<UploadedImage> {
        let removed = draft.remove_attachment(image_id);
        self.remove(image_id).await;
        removed
    }

    async fn store_file(&self, owner: Uuid, file: &FileUpload, purpose: UploadPurpose) -> Result<UploadedImage> {
        let key = storage_key(owner, purpose, Utc::now().timestamp_millis(), &file.extension());
        let url = self
            .store
            .put_object(&key, file.bytes.clone(), &file.content_type)
            .await
            .map_err(|e| AppError::UploadFailed(e.to_string()))?;

        info!(key = %key, "image uploaded");
        Ok(UploadedImage {
            id: key,
            url,
            display_name: file.name.clone(),
            size_bytes: file.size(),
        })
    }
}
