//! Shared fixtures for the integration tests: the content core wired to the
//! in-memory adapters.

use std::sync::Arc;

use domains::models::User;
use domains::traits::RowStore;
use serde_json::json;
use services::{AttachmentManager, FileUpload, UploadLimits};
use storage_adapters::{MemoryObjectStore, MemoryRowStore};
use uuid::Uuid;

pub const CDN: &str = "https://cdn.forum.test/storage";

pub struct Harness {
    pub rows: Arc<MemoryRowStore>,
    pub objects: Arc<MemoryObjectStore>,
    pub attachments: AttachmentManager,
}

impl Harness {
    pub fn new() -> Self {
        let rows = Arc::new(MemoryRowStore::new());
        let objects = Arc::new(MemoryObjectStore::new(CDN));
        let attachments = AttachmentManager::new(objects.clone(), UploadLimits::default());
        Self { rows, objects, attachments }
    }

    /// Inserts a profile row and returns the matching user.
    pub async fn register(&self, username: &str) -> User {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
        };
        self.rows
            .insert_row(
                "profiles",
                json!({ "id": user.id, "username": username, "verification": "verified" }),
            )
            .await
            .expect("profile insert");
        user
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn png(name: &str, size: usize) -> FileUpload {
    FileUpload::new(name, "image/png", vec![0x89u8; size])
}
