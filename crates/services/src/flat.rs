//! # Flat Draft
//!
//! The streamlined editor: one markup body, a set of uploaded attachments,
//! an optional cover image, tags, category and thread flags.

use domains::error::{AppError, Result};
use domains::models::{Category, ComposeMode, FlatPayload, ThreadFlags, UploadedImage};

use crate::blocks::publish_title;
use crate::markup::{image_reference, strip_image_references};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlatDraft {
    title: String,
    body: String,
    attachments: Vec<UploadedImage>,
    cover_image: Option<String>,
    tags: Vec<String>,
    category: Option<Category>,
    flags: ThreadFlags,
}

impl FlatDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn set_body(&mut self, body: impl Into<String>) {
        self.body = body.into();
    }

    pub fn attachments(&self) -> &[UploadedImage] {
        &self.attachments
    }

    pub fn cover_image(&self) -> Option<&str> {
        self.cover_image.as_deref()
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn category(&self) -> Option<Category> {
        self.category
    }

    pub fn set_category(&mut self, category: Option<Category>) {
        self.category = category;
    }

    pub fn flags(&self) -> ThreadFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: ThreadFlags) {
        self.flags = flags;
    }

    /// Adds an attachment. Returns false if one with the same id is already present.
    pub fn add_attachment(&mut self, image: UploadedImage) -> bool {
        if self.attachments.iter().any(|a| a.id == image.id) {
            return false;
        }
        self.attachments.push(image);
        true
    }

    /// Appends an inline reference to `image` on its own paragraph.
    pub fn append_image_reference(&mut self, image: &UploadedImage) {
        let reference = image_reference(&image.to_image_ref());
        if self.body.trim().is_empty() {
            self.body = reference;
        } else {
            self.body = format!("{}\n\n{}", self.body.trim_end(), reference);
        }
    }

    /// Drops the attachment, every inline reference to it, and the cover if it
    /// pointed there.
    pub fn remove_attachment(&mut self, image_id: &str) -> Option<UploadedImage> {
        let index = self.attachments.iter().position(|a| a.id == image_id)?;
        let removed = self.attachments.remove(index);
        self.body = strip_image_references(&self.body, &removed.url);
        if self.cover_image.as_deref() == Some(removed.url.as_str()) {
            self.cover_image = None;
        }
        Some(removed)
    }

    /// Sets or clears the cover. The URL must belong to an attachment.
    pub fn set_cover_image(&mut self, url: Option<&str>) -> Result<()> {
        match url {
            None => self.cover_image = None,
            Some(url) => {
                if !self.attachments.iter().any(|a| a.url == url) {
                    return Err(AppError::CoverNotAttached(url.to_string()));
                }
                self.cover_image = Some(url.to_string());
            }
        }
        Ok(())
    }

    pub fn add_tag(&mut self, tag: &str) -> Result<()> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(AppError::ValidationError("tags cannot be empty".into()));
        }
        if self.tags.iter().any(|t| t == tag) {
            return Err(AppError::DuplicateTag(tag.to_string()));
        }
        self.tags.push(tag.to_string());
        Ok(())
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag.trim());
        self.tags.len() != before
    }

    pub fn validate_for_publish(&self, mode: ComposeMode) -> Result<()> {
        if mode.requires_title() && self.title.trim().is_empty() {
            return Err(AppError::ValidationError("a title is required".into()));
        }
        if self.body.trim().is_empty() && self.attachments.is_empty() {
            return Err(AppError::ValidationError(
                "add some content before publishing".into(),
            ));
        }
        Ok(())
    }

    /// Validates and snapshots the draft. Flags are only carried for threads.
    pub fn to_payload(&self, mode: ComposeMode) -> Result<FlatPayload> {
        self.validate_for_publish(mode)?;
        Ok(FlatPayload {
            title: publish_title(&self.title),
            body: self.body.clone(),
            attachments: self.attachments.clone(),
            tags: self.tags.clone(),
            category: self.category,
            cover_image: self.cover_image.clone(),
            flags: if mode.supports_flags() {
                self.flags
            } else {
                ThreadFlags::default()
            },
        })
    }
}
