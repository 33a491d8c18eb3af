//! # AppError
//!
//! Centralized error handling for the forum content core.
//! Local validation failures and remote-call failures share one type so the
//! UI layer can turn any of them into a [`Notice`].

use thiserror::Error;

/// The primary error type for all content-core operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Draft failed pre-submission checks (blank title, no content, bad tag)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Selected file is not an image
    #[error("invalid file type: {0}")]
    InvalidFileType(String),

    /// Selected file exceeds the limit for its upload purpose
    #[error("file too large: {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    /// The object store rejected the write; reason is the store's own message
    #[error("{0}")]
    UploadFailed(String),

    /// The persistence sink rejected the payload; reason is the sink's own message
    #[error("{0}")]
    PublishFailed(String),

    /// No signed-in user for an action that requires one
    #[error("not authenticated")]
    NotAuthenticated,

    /// Deleting the block would leave the draft empty
    #[error("cannot delete the last block")]
    CannotDelete,

    #[error("block index {index} out of bounds for {len} blocks")]
    BlockIndexOutOfBounds { index: usize, len: usize },

    /// Cover image must be one of the draft's attachments
    #[error("cover image {0} is not an attachment of this draft")]
    CoverNotAttached(String),

    #[error("tag already added: {0}")]
    DuplicateTag(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    /// Both the search and the popular-items query failed
    #[error("mod catalog unavailable: {0}")]
    CatalogUnavailable(String),
}

/// A specialized Result type for content-core logic.
pub type Result<T> = std::result::Result<T, AppError>;

/// What the UI should do with an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Show the message inline next to the action that failed.
    Inline(String),
    /// Send the user to the sign-in flow instead of showing an error.
    RedirectToSignIn,
}

impl AppError {
    /// Converts the error into a user-visible notice.
    pub fn notice(&self) -> Notice {
        match self {
            AppError::NotAuthenticated => Notice::RedirectToSignIn,
            other => Notice::Inline(other.to_string()),
        }
    }
}
