//! In-memory row and object stores.
//!
//! Stand-ins for the hosted backend, used by the CLI demo and by tests.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::traits::{ObjectStore, Row, RowFilter, RowStore};
use serde_json::Value;
use uuid::Uuid;

/// Tables of JSON rows. Inserted rows get an `id` and `created_at` unless
/// they already carry one.
#[derive(Default)]
pub struct MemoryRowStore {
    tables: DashMap<String, Vec<Row>>,
}

impl MemoryRowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every row currently in `table`, in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables
            .get(table)
            .map(|rows| rows.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RowStore for MemoryRowStore {
    async fn insert_row(&self, table: &str, mut fields: Row) -> anyhow::Result<Row> {
        let Some(object) = fields.as_object_mut() else {
            anyhow::bail!("rows must be JSON objects");
        };
        object
            .entry("id")
            .or_insert_with(|| Value::from(Uuid::new_v4().to_string()));
        object
            .entry("created_at")
            .or_insert_with(|| Value::from(Utc::now().to_rfc3339()));

        self.tables
            .entry(table.to_string())
            .or_default()
            .push(fields.clone());
        Ok(fields)
    }

    async fn query_rows(&self, table: &str, filter: &RowFilter) -> anyhow::Result<Vec<Row>> {
        let Some(rows) = self.tables.get(table) else {
            return Ok(Vec::new());
        };
        let matching = rows.iter().filter(|row| filter.matches(row)).cloned();
        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }
}

/// Objects keyed by storage path, refusing to overwrite.
pub struct MemoryObjectStore {
    objects: DashMap<String, (Bytes, String)>,
    url_prefix: String,
}

impl MemoryObjectStore {
    pub fn new(url_prefix: impl Into<String>) -> Self {
        Self {
            objects: DashMap::new(),
            url_prefix: url_prefix.into(),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, key: &str, data: Bytes, content_type: &str) -> anyhow::Result<String> {
        match self.objects.entry(key.to_string()) {
            Entry::Occupied(_) => anyhow::bail!("The resource already exists"),
            Entry::Vacant(slot) => {
                slot.insert((data, content_type.to_string()));
            }
        }
        Ok(format!("{}/{}", self.url_prefix.trim_end_matches('/'), key))
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.objects
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| anyhow::anyhow!("object not found: {key}"))
    }
}
