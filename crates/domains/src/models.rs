//! # Domain Models
//!
//! These structs represent the content a user composes on the forum: blocks,
//! flat bodies with attachments, and the payloads handed to persistence.
//! Block ids are UUID v4; they only need to be unique within one draft.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// The signed-in user, as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
}

/// Verification badge shown next to a profile name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationType {
    Verified,
    Developer,
    Moderator,
    Staff,
}

/// A public profile row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub verification: Option<VerificationType>,
}

/// What kind of record a draft becomes when published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComposeMode {
    Thread,
    Reply,
    Forum,
}

impl ComposeMode {
    /// Replies are the only records without a title.
    pub fn requires_title(self) -> bool {
        match self {
            ComposeMode::Thread | ComposeMode::Forum => true,
            ComposeMode::Reply => false,
        }
    }

    /// Pinned/locked only apply to threads.
    pub fn supports_flags(self) -> bool {
        matches!(self, ComposeMode::Thread)
    }

    /// Column holding the parent record's id, if the mode has a parent.
    pub fn parent_column(self) -> Option<&'static str> {
        match self {
            ComposeMode::Thread => Some("forum_id"),
            ComposeMode::Reply => Some("thread_id"),
            ComposeMode::Forum => None,
        }
    }

    /// Row-store table the published record lands in.
    pub fn table(self) -> &'static str {
        match self {
            ComposeMode::Thread => "threads",
            ComposeMode::Reply => "posts",
            ComposeMode::Forum => "forums",
        }
    }
}

/// Recognized thread categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    General,
    Help,
    Showcase,
    Modding,
    Resources,
    OffTopic,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::General,
        Category::Help,
        Category::Showcase,
        Category::Modding,
        Category::Resources,
        Category::OffTopic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::General => "general",
            Category::Help => "help",
            Category::Showcase => "showcase",
            Category::Modding => "modding",
            Category::Resources => "resources",
            Category::OffTopic => "off-topic",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| AppError::UnknownCategory(s.to_string()))
    }
}

/// Thread-only moderation flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadFlags {
    pub pinned: bool,
    pub locked: bool,
}

/// An image that made it into the object store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedImage {
    /// Storage key, e.g. `{owner}/{timestamp}-{token}.png`
    pub id: String,
    pub url: String,
    pub display_name: String,
    pub size_bytes: u64,
}

impl UploadedImage {
    pub fn to_image_ref(&self) -> ImageRef {
        ImageRef {
            id: self.id.clone(),
            url: self.url.clone(),
            display_name: self.display_name.clone(),
        }
    }
}

/// The attachment reference an image block is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub id: String,
    pub url: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub Uuid);

impl BlockId {
    pub fn new() -> Self {
        BlockId(Uuid::new_v4())
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Text,
    Image,
}

/// One unit of block-mode content.
///
/// `image` should be `Some` exactly when `kind` is [`BlockKind::Image`].
/// [`ContentBlock::text`] and [`ContentBlock::image`] uphold that; code that
/// fills the fields directly has to keep it too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub id: BlockId,
    pub kind: BlockKind,
    /// Body text, or the caption of an image block
    pub text: String,
    pub image: Option<ImageRef>,
    pub order: u32,
}

impl ContentBlock {
    pub fn text(order: u32) -> Self {
        Self {
            id: BlockId::new(),
            kind: BlockKind::Text,
            text: String::new(),
            image: None,
            order,
        }
    }

    pub fn image(image: ImageRef, order: u32) -> Self {
        Self {
            id: BlockId::new(),
            kind: BlockKind::Image,
            text: String::new(),
            image: Some(image),
            order,
        }
    }

    /// Whether the block survives filter-on-publish.
    pub fn has_content(&self) -> bool {
        match self.kind {
            BlockKind::Text => !self.text.trim().is_empty(),
            BlockKind::Image => self.image.is_some(),
        }
    }
}

/// A block as it appears in the published payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedBlock {
    pub kind: BlockKind,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub blocks: Vec<PublishedBlock>,
}

impl BlockPayload {
    /// Flattens the blocks into one inline-markup body, image blocks becoming
    /// `![caption](url)` references, so block content renders like flat content.
    pub fn to_markup_body(&self) -> String {
        self.blocks
            .iter()
            .map(|block| match (&block.kind, &block.image) {
                (BlockKind::Image, Some(image)) => {
                    let alt = if block.text.trim().is_empty() {
                        image.display_name.as_str()
                    } else {
                        block.text.trim()
                    };
                    format!("![{}]({})", alt, image.url)
                }
                _ => block.text.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub body: String,
    pub attachments: Vec<UploadedImage>,
    pub tags: Vec<String>,
    pub category: Option<Category>,
    pub cover_image: Option<String>,
    pub flags: ThreadFlags,
}

/// Snapshot of a validated draft, owned by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PublishPayload {
    Blocks(BlockPayload),
    Flat(FlatPayload),
}

impl PublishPayload {
    pub fn title(&self) -> Option<&str> {
        match self {
            PublishPayload::Blocks(p) => p.title.as_deref(),
            PublishPayload::Flat(p) => p.title.as_deref(),
        }
    }

    /// The inline-markup body, used for mention detection and rendering.
    pub fn markup_body(&self) -> String {
        match self {
            PublishPayload::Blocks(p) => p.to_markup_body(),
            PublishPayload::Flat(p) => p.body.clone(),
        }
    }
}

/// Where a draft is published: the record kind plus the parent it hangs
/// off (the forum for a thread, the thread for a reply).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComposeTarget {
    pub mode: ComposeMode,
    pub parent_id: Option<Uuid>,
}

impl ComposeTarget {
    pub fn forum() -> Self {
        Self { mode: ComposeMode::Forum, parent_id: None }
    }

    pub fn thread(forum_id: Uuid) -> Self {
        Self { mode: ComposeMode::Thread, parent_id: Some(forum_id) }
    }

    pub fn reply(thread_id: Uuid) -> Self {
        Self { mode: ComposeMode::Reply, parent_id: Some(thread_id) }
    }
}

/// What a [`crate::traits::PublishSink`] is asked to persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    pub target: ComposeTarget,
    pub author_id: Uuid,
    pub payload: PublishPayload,
}

/// The persisted record as reported back by the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishedRecord {
    pub id: Uuid,
    pub table: String,
    pub created_at: DateTime<Utc>,
}

/// Render-time output of the inline markup renderer. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedContent {
    pub html: String,
    pub images: Vec<String>,
}

/// One hit from the third-party mod catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub author: Option<String>,
    pub downloads: u64,
    pub icon_url: Option<String>,
}
