//! Mention notifications, written after a publish succeeds.

use std::sync::Arc;

use domains::models::{Profile, PublishedRecord, User};
use domains::traits::{RowFilter, RowStore};
use serde_json::json;
use tracing::{debug, instrument, warn};

use crate::markup::extract_mentions;

pub struct MentionNotifier {
    rows: Arc<dyn RowStore>,
}

impl MentionNotifier {
    pub fn new(rows: Arc<dyn RowStore>) -> Self {
        Self { rows }
    }

    /// Writes one `mention` notification per distinct user mentioned in
    /// `body`, skipping the author and unknown usernames.
    ///
    /// The record is already persisted, so failures are logged, not returned.
    /// Returns how many notifications were written.
    #[instrument(skip_all, fields(record = %record.id))]
    pub async fn notify(&self, author: &User, record: &PublishedRecord, body: &str) -> usize {
        let mut sent = 0;
        for username in extract_mentions(body) {
            if username == author.username {
                continue;
            }
            match self.notify_one(author, record, &username).await {
                Ok(true) => sent += 1,
                Ok(false) => debug!(%username, "mentioned user not found"),
                Err(e) => warn!(%username, error = %e, "failed to write mention notification"),
            }
        }
        sent
    }

    async fn notify_one(&self, author: &User, record: &PublishedRecord, username: &str) -> anyhow::Result<bool> {
        let filter = RowFilter::new().eq("username", username).limit(1);
        let Some(row) = self.rows.query_rows("profiles", &filter).await?.into_iter().next() else {
            return Ok(false);
        };
        let profile: Profile = serde_json::from_value(row)?;

        self.rows
            .insert_row(
                "notifications",
                json!({
                    "user_id": profile.id,
                    "actor_id": author.id,
                    "kind": "mention",
                    "record_id": record.id,
                    "record_table": record.table,
                }),
            )
            .await?;
        Ok(true)
    }
}
