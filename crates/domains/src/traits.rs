//! # Core Traits (Ports)
//!
//! Every external collaborator the content core talks to sits behind one of
//! these traits. Adapters live in `storage-adapters`; tests use the mockall
//! mocks exposed by the `testing` feature.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;

#[cfg(feature = "testing")]
use mockall::automock;

use crate::models::{CatalogItem, PublishRequest, PublishedRecord, User};

/// A row as stored by the row store: a JSON object.
pub type Row = Value;

/// Equality filter over row columns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowFilter {
    pub eq: Vec<(String, Value)>,
    pub limit: Option<usize>,
}

impl RowFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.eq.push((column.into(), value.into()));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a row satisfies every equality in the filter.
    pub fn matches(&self, row: &Row) -> bool {
        self.eq
            .iter()
            .all(|(column, value)| row.get(column) == Some(value))
    }
}

/// Session lookup.
#[cfg_attr(feature = "testing", automock)]
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// The signed-in user, if any.
    async fn current_user(&self) -> Option<User>;
}

/// Relational row storage owned by the hosted backend.
#[cfg_attr(feature = "testing", automock)]
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Inserts a row and returns it as stored (with any generated columns).
    async fn insert_row(&self, table: &str, fields: Row) -> anyhow::Result<Row>;
    async fn query_rows(&self, table: &str, filter: &RowFilter) -> anyhow::Result<Vec<Row>>;
}

/// Blob storage for avatars and content images.
#[cfg_attr(feature = "testing", automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes `data` under `key` and returns its public URL.
    /// Must fail if `key` already exists.
    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> anyhow::Result<String>;
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;
}

/// The persistence callback a publish hands its payload to.
#[cfg_attr(feature = "testing", automock)]
#[async_trait]
pub trait PublishSink: Send + Sync {
    async fn persist(&self, request: PublishRequest) -> anyhow::Result<PublishedRecord>;
}

/// Read-only third-party mod catalog.
#[cfg_attr(feature = "testing", automock)]
#[async_trait]
pub trait ModCatalog: Send + Sync {
    async fn search(&self, query: &str, limit: usize) -> anyhow::Result<Vec<CatalogItem>>;
    async fn popular(&self, limit: usize) -> anyhow::Result<Vec<CatalogItem>>;
}
