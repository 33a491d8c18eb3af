//! # Publish Coordinator
//!
//! Gates a draft on validation, snapshots it into a payload, and hands the
//! payload to a [`PublishSink`].
//!
//! State moves `Idle → Validating → Publishing → Published | Failed`. A
//! failed validation drops back to `Idle`; a failed publish parks in
//! `Failed` until the user triggers publish again. Nothing retries on its own.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domains::error::{AppError, Result};
use domains::models::{
    ComposeMode, ComposeTarget, PublishPayload, PublishRequest, PublishedRecord, User,
};
use domains::traits::{PublishSink, RowStore};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::blocks::BlockDraft;
use crate::flat::FlatDraft;
use crate::notify::MentionNotifier;

/// Either editing mode's draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Draft {
    Blocks(BlockDraft),
    Flat(FlatDraft),
}

impl Draft {
    pub fn validate_for_publish(&self, mode: ComposeMode) -> Result<()> {
        match self {
            Draft::Blocks(d) => d.validate_for_publish(mode),
            Draft::Flat(d) => d.validate_for_publish(mode),
        }
    }

    pub fn to_payload(&self, mode: ComposeMode) -> Result<PublishPayload> {
        match self {
            Draft::Blocks(d) => d.to_payload(mode).map(PublishPayload::Blocks),
            Draft::Flat(d) => d.to_payload(mode).map(PublishPayload::Flat),
        }
    }
}

impl From<BlockDraft> for Draft {
    fn from(draft: BlockDraft) -> Self {
        Draft::Blocks(draft)
    }
}

impl From<FlatDraft> for Draft {
    fn from(draft: FlatDraft) -> Self {
        Draft::Flat(draft)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishState {
    Idle,
    Validating,
    Publishing,
    Published(PublishedRecord),
    /// The sink's error message, as shown to the user
    Failed(String),
}

pub struct PublishCoordinator {
    sink: Arc<dyn PublishSink>,
    target: ComposeTarget,
    notifier: Option<MentionNotifier>,
    state: PublishState,
}

impl PublishCoordinator {
    pub fn new(sink: Arc<dyn PublishSink>, target: ComposeTarget) -> Self {
        Self {
            sink,
            target,
            notifier: None,
            state: PublishState::Idle,
        }
    }

    /// Sends mention notifications after each successful publish.
    pub fn with_notifier(mut self, notifier: MentionNotifier) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn state(&self) -> &PublishState {
        &self.state
    }

    pub fn target(&self) -> ComposeTarget {
        self.target
    }

    /// Validates `draft`, snapshots it and persists it through the sink.
    ///
    /// The payload is built by value before the sink is awaited, so later
    /// edits to the draft cannot leak into this submission.
    #[instrument(skip_all, fields(mode = ?self.target.mode))]
    pub async fn publish(&mut self, user: Option<&User>, draft: &Draft) -> Result<PublishedRecord> {
        let user = user.ok_or(AppError::NotAuthenticated)?;

        self.transition(PublishState::Validating);
        let payload = match draft.to_payload(self.target.mode) {
            Ok(payload) => payload,
            Err(e) => {
                self.transition(PublishState::Idle);
                return Err(e);
            }
        };

        self.transition(PublishState::Publishing);
        debug!(title = payload.title().unwrap_or_default(), "draft snapshotted");
        let body = payload.markup_body();
        let request = PublishRequest {
            target: self.target,
            author_id: user.id,
            payload,
        };

        match self.sink.persist(request).await {
            Ok(record) => {
                info!(record = %record.id, table = %record.table, "published");
                if let Some(notifier) = &self.notifier {
                    notifier.notify(user, &record, &body).await;
                }
                self.transition(PublishState::Published(record.clone()));
                Ok(record)
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(error = %reason, "publish rejected");
                self.transition(PublishState::Failed(reason.clone()));
                Err(AppError::PublishFailed(reason))
            }
        }
    }

    fn transition(&mut self, next: PublishState) {
        debug!(from = ?self.state, to = ?next, "publish state");
        self.state = next;
    }
}

/// Persists payloads as one row in the mode's table.
pub struct RowStoreSink {
    rows: Arc<dyn RowStore>,
}

impl RowStoreSink {
    pub fn new(rows: Arc<dyn RowStore>) -> Self {
        Self { rows }
    }
}

#[async_trait]
impl PublishSink for RowStoreSink {
    async fn persist(&self, request: PublishRequest) -> anyhow::Result<PublishedRecord> {
        let mode = request.target.mode;
        let mut fields = serde_json::to_value(&request.payload)?;
        let Some(object) = fields.as_object_mut() else {
            anyhow::bail!("payload did not serialize to an object");
        };
        object.insert("author_id".into(), Value::from(request.author_id.to_string()));
        if let (Some(column), Some(parent)) = (mode.parent_column(), request.target.parent_id) {
            object.insert(column.into(), Value::from(parent.to_string()));
        }

        let row = self.rows.insert_row(mode.table(), fields).await?;
        let id = row
            .get("id")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok())
            .ok_or_else(|| anyhow::anyhow!("{} row came back without an id", mode.table()))?;
        let created_at = row
            .get("created_at")
            .cloned()
            .and_then(|v| serde_json::from_value::<DateTime<Utc>>(v).ok())
            .unwrap_or_else(Utc::now);

        Ok(PublishedRecord {
            id,
            table: mode.table().to_string(),
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::BlockPatch;
    use domains::models::{BlockKind, BlockPayload, PublishedBlock};
    use domains::traits::{MockPublishSink, MockRowStore};
    use serde_json::json;
    use std::sync::Mutex;

    fn user() -> User {
        User { id: Uuid::new_v4(), username: "ada".into() }
    }

    fn record() -> PublishedRecord {
        PublishedRecord { id: Uuid::new_v4(), table: "threads".into(), created_at: Utc::now() }
    }

    fn hello_world() -> BlockDraft {
        let mut draft = BlockDraft::new();
        draft.set_title("Hello");
        let id = draft.blocks()[0].id;
        draft.update_block(id, BlockPatch::text("World"));
        draft
    }

    /// Records every request it is asked to persist.
    #[derive(Default)]
    struct RecordingSink {
        seen: Mutex<Vec<PublishRequest>>,
    }

    #[async_trait]
    impl PublishSink for RecordingSink {
        async fn persist(&self, request: PublishRequest) -> anyhow::Result<PublishedRecord> {
            self.seen.lock().unwrap().push(request);
            Ok(record())
        }
    }

    #[tokio::test]
    async fn sink_receives_exact_block_payload() {
        let sink = Arc::new(RecordingSink::default());
        let forum = Uuid::new_v4();
        let mut coordinator = PublishCoordinator::new(sink.clone(), ComposeTarget::thread(forum));
        let user = user();

        coordinator
            .publish(Some(&user), &hello_world().into())
            .await
            .unwrap();

        let seen = sink.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].author_id, user.id);
        assert_eq!(seen[0].target.parent_id, Some(forum));
        assert_eq!(
            seen[0].payload,
            PublishPayload::Blocks(BlockPayload {
                title: Some("Hello".into()),
                blocks: vec![PublishedBlock {
                    kind: BlockKind::Text,
                    text: "World".into(),
                    image: None,
                    order: 0,
                }],
            })
        );
        assert!(matches!(coordinator.state(), PublishState::Published(_)));
    }

    #[tokio::test]
    async fn validation_failure_never_reaches_sink() {
        let mut sink = MockPublishSink::new();
        sink.expect_persist().never();
        let mut coordinator = PublishCoordinator::new(Arc::new(sink), ComposeTarget::thread(Uuid::new_v4()));

        let mut draft = hello_world();
        draft.set_title("");
        let err = coordinator.publish(Some(&user()), &draft.into()).await;
        assert!(matches!(err, Err(AppError::ValidationError(_))));
        assert_eq!(coordinator.state(), &PublishState::Idle);
    }

    #[tokio::test]
    async fn anonymous_publish_is_refused() {
        let mut sink = MockPublishSink::new();
        sink.expect_persist().never();
        let mut coordinator = PublishCoordinator::new(Arc::new(sink), ComposeTarget::forum());
        let err = coordinator.publish(None, &hello_world().into()).await;
        assert_eq!(err, Err(AppError::NotAuthenticated));
    }

    #[tokio::test]
    async fn sink_error_is_surfaced_verbatim_and_retry_is_manual() {
        let mut sink = MockPublishSink::new();
        let mut calls = 0;
        sink.expect_persist().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Err(anyhow::anyhow!("new row violates row-level security policy"))
            } else {
                Ok(record())
            }
        });
        let mut coordinator = PublishCoordinator::new(Arc::new(sink), ComposeTarget::forum());
        let draft: Draft = hello_world().into();
        let user = user();

        let err = coordinator.publish(Some(&user), &draft).await;
        assert_eq!(
            err,
            Err(AppError::PublishFailed("new row violates row-level security policy".into()))
        );
        assert_eq!(
            coordinator.state(),
            &PublishState::Failed("new row violates row-level security policy".into())
        );

        assert!(coordinator.publish(Some(&user), &draft).await.is_ok());
    }

    #[tokio::test]
    async fn row_store_sink_adds_author_and_parent() {
        let thread = Uuid::new_v4();
        let reply_id = Uuid::new_v4();
        let mut rows = MockRowStore::new();
        rows.expect_insert_row()
            .times(1)
            .withf(move |table, fields| {
                table.to_string() == "posts"
                    && fields["thread_id"] == json!(thread.to_string())
                    && fields["body"] == json!("thanks!")
                    && fields.get("author_id").is_some()
            })
            .returning(move |_, mut fields| {
                fields["id"] = json!(reply_id.to_string());
                fields["created_at"] = json!("2024-05-01T12:00:00Z");
                Ok(fields)
            });

        let mut draft = FlatDraft::new();
        draft.set_body("thanks!");
        let mut coordinator =
            PublishCoordinator::new(Arc::new(RowStoreSink::new(Arc::new(rows))), ComposeTarget::reply(thread));

        let record = coordinator.publish(Some(&user()), &draft.into()).await.unwrap();
        assert_eq!(record.id, reply_id);
        assert_eq!(record.table, "posts");
        assert_eq!(record.created_at.to_rfc3339(), "2024-05-01T12:00:00+00:00");
    }

    #[tokio::test]
    async fn row_without_id_is_a_publish_failure() {
        let mut rows = MockRowStore::new();
        rows.expect_insert_row().returning(|_, fields| Ok(fields));
        let mut coordinator =
            PublishCoordinator::new(Arc::new(RowStoreSink::new(Arc::new(rows))), ComposeTarget::forum());

        let err = coordinator.publish(Some(&user()), &hello_world().into()).await;
        assert_eq!(
            err,
            Err(AppError::PublishFailed("forums row came back without an id".into()))
        );
    }
}
