//! # Local object store
//!
//! Filesystem implementation of `ObjectStore`.
//! Keys map to paths under the root directory; the public URL is the key
//! appended to a configured prefix.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use domains::traits::ObjectStore;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

pub struct LocalObjectStore {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/static/uploads")
    url_prefix: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, url_prefix: impl Into<String>) -> Self {
        Self {
            root_path: root.into(),
            url_prefix: url_prefix.into(),
        }
    }

    /// Resolves a key below the root, refusing anything that could escape it.
    fn resolve(&self, key: &str) -> anyhow::Result<PathBuf> {
        let relative = Path::new(key);
        let clean = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !clean {
            anyhow::bail!("invalid object key: {key}");
        }
        Ok(self.root_path.join(relative))
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.url_prefix.trim_end_matches('/'), key)
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    /// Writes the object with `create_new`, so an existing key is an error
    /// rather than an overwrite.
    async fn put_object(&self, key: &str, data: Bytes, _content_type: &str) -> anyhow::Result<String> {
        // 1. Resolve the key below the root
        let target = self.resolve(key)?;

        // 2. Ensure directory exists
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).await?;
        }

        // 3. Write, refusing to overwrite
        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                anyhow::bail!("The resource already exists")
            }
            Err(e) => return Err(e).with_context(|| format!("opening {}", target.display())),
        };
        file.write_all(&data).await?;
        file.flush().await?;

        debug!(key, bytes = data.len(), "object written");
        Ok(self.public_url(key))
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        let target = self.resolve(key)?;
        fs::remove_file(&target)
            .await
            .with_context(|| format!("deleting {}", target.display()))?;
        Ok(())
    }
}
