//! services/src/lib.rs
//!
//! The content composition and rendering core: block and flat drafts, image
//! attachments, the inline markup renderer, publishing, mention
//! notifications and the resource browser.

pub mod attachments;
pub mod blocks;
pub mod browse;
pub mod flat;
pub mod markup;
pub mod notify;
pub mod publish;

pub use attachments::{AttachmentManager, BatchProgress, FileUpload, UploadLimits, UploadPurpose};
pub use blocks::{BlockDraft, BlockPatch};
pub use browse::{BrowseResult, BrowseSource, ResourceBrowser};
pub use flat::FlatDraft;
pub use markup::{extract_mentions, process};
pub use notify::MentionNotifier;
pub use publish::{Draft, PublishCoordinator, PublishState, RowStoreSink};
