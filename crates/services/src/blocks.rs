//! # Block Draft
//!
//! Block-mode composition: an ordered, reorderable list of text and image
//! blocks. Every mutation leaves `order` equal to the list position, so
//! ordinals are always `0..n-1`.

use domains::error::{AppError, Result};
use domains::models::{
    BlockId, BlockKind, BlockPayload, ComposeMode, ContentBlock, ImageRef, PublishedBlock,
};
use tracing::debug;

/// Partial update for [`BlockDraft::update_block`]. `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockPatch {
    pub text: Option<String>,
    /// Only applied to image blocks.
    pub image: Option<ImageRef>,
}

impl BlockPatch {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            image: None,
        }
    }
}

/// Moves the item at `source` to `dest`, shifting the items in between.
///
/// Items outside `source..=dest` keep their positions, and
/// `move_item(v, i, j)` followed by `move_item(v, j, i)` restores `v`.
pub fn move_item<T>(items: &mut Vec<T>, source: usize, dest: usize) -> Result<()> {
    let len = items.len();
    for index in [source, dest] {
        if index >= len {
            return Err(AppError::BlockIndexOutOfBounds { index, len });
        }
    }
    if source != dest {
        let item = items.remove(source);
        items.insert(dest, item);
    }
    Ok(())
}

/// A draft composed of blocks. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDraft {
    title: String,
    blocks: Vec<ContentBlock>,
}

impl Default for BlockDraft {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockDraft {
    /// Starts with one empty text block.
    pub fn new() -> Self {
        Self {
            title: String::new(),
            blocks: vec![ContentBlock::text(0)],
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Never true: a draft keeps at least one block.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block(&self, id: BlockId) -> Option<&ContentBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn add_text_block(&mut self) -> BlockId {
        let block = ContentBlock::text(self.next_order());
        let id = block.id;
        self.blocks.push(block);
        id
    }

    /// Appends an image block bound to an already-uploaded attachment.
    pub fn add_image_block(&mut self, image: ImageRef) -> BlockId {
        let block = ContentBlock::image(image, self.next_order());
        let id = block.id;
        self.blocks.push(block);
        id
    }

    /// Merges `patch` into the block with `id`. Returns false if no block matched.
    pub fn update_block(&mut self, id: BlockId, patch: BlockPatch) -> bool {
        let Some(block) = self.blocks.iter_mut().find(|b| b.id == id) else {
            return false;
        };
        if let Some(text) = patch.text {
            block.text = text;
        }
        if let Some(image) = patch.image {
            if block.kind == BlockKind::Image {
                block.image = Some(image);
            } else {
                debug!(block = %id, "ignoring image patch on text block");
            }
        }
        true
    }

    /// Removes the block with `id`.
    ///
    /// Refuses with [`AppError::CannotDelete`] when it is the only block left.
    /// An unknown id is a no-op and returns `Ok(false)`.
    pub fn delete_block(&mut self, id: BlockId) -> Result<bool> {
        let Some(index) = self.blocks.iter().position(|b| b.id == id) else {
            return Ok(false);
        };
        if self.blocks.len() == 1 {
            return Err(AppError::CannotDelete);
        }
        self.blocks.remove(index);
        self.renumber();
        Ok(true)
    }

    /// Drag-and-drop: moves one block and recomputes every ordinal.
    pub fn reorder(&mut self, source: usize, dest: usize) -> Result<()> {
        move_item(&mut self.blocks, source, dest)?;
        self.renumber();
        Ok(())
    }

    pub fn validate_for_publish(&self, mode: ComposeMode) -> Result<()> {
        if mode.requires_title() && self.title.trim().is_empty() {
            return Err(AppError::ValidationError("a title is required".into()));
        }
        if !self.blocks.iter().any(ContentBlock::has_content) {
            return Err(AppError::ValidationError(
                "add some content before publishing".into(),
            ));
        }
        Ok(())
    }

    /// Validates and snapshots the draft. Empty blocks are dropped and the
    /// survivors renumbered from zero.
    pub fn to_payload(&self, mode: ComposeMode) -> Result<BlockPayload> {
        self.validate_for_publish(mode)?;

        let blocks = self
            .blocks
            .iter()
            .filter(|b| b.has_content())
            .enumerate()
            .map(|(i, b)| PublishedBlock {
                kind: b.kind,
                text: b.text.clone(),
                image: b.image.clone(),
                order: i as u32,
            })
            .collect();

        Ok(BlockPayload {
            title: publish_title(&self.title),
            blocks,
        })
    }

    fn next_order(&self) -> u32 {
        self.blocks.len() as u32
    }

    fn renumber(&mut self) {
        for (i, block) in self.blocks.iter_mut().enumerate() {
            block.order = i as u32;
        }
    }
}

/// Trimmed title, or `None` when blank.
pub(crate) fn publish_title(title: &str) -> Option<String> {
    let title = title.trim();
    (!title.is_empty()).then(|| title.to_string())
}
