//! domains/src/lib.rs
//!
//! Content models, the error taxonomy, and port definitions for the forum
//! content core.

pub mod error;
pub mod models;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use traits::*;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mode_title_rules() {
        assert!(ComposeMode::Thread.requires_title());
        assert!(ComposeMode::Forum.requires_title());
        assert!(!ComposeMode::Reply.requires_title());
        assert!(ComposeMode::Thread.supports_flags());
        assert!(!ComposeMode::Reply.supports_flags());
    }

    #[test]
    fn category_parses_recognized_names_only() {
        assert_eq!("Off-Topic".parse::<Category>(), Ok(Category::OffTopic));
        assert_eq!(" help ".parse::<Category>(), Ok(Category::Help));
        assert_eq!(
            "memes".parse::<Category>(),
            Err(AppError::UnknownCategory("memes".into()))
        );
        assert_eq!(serde_json::to_value(Category::OffTopic).unwrap(), json!("off-topic"));
    }

    #[test]
    fn image_blocks_always_carry_an_image() {
        let image = ImageRef {
            id: "u/1.png".into(),
            url: "https://cdn/u/1.png".into(),
            display_name: "1.png".into(),
        };
        let block = ContentBlock::image(image, 3);
        assert_eq!(block.kind, BlockKind::Image);
        assert!(block.image.is_some());
        assert!(block.has_content());

        let text = ContentBlock::text(0);
        assert!(text.image.is_none());
        assert!(!text.has_content());
    }

    #[test]
    fn text_blocks_serialize_without_image() {
        let payload = BlockPayload {
            title: Some("Hello".into()),
            blocks: vec![PublishedBlock {
                kind: BlockKind::Text,
                text: "World".into(),
                image: None,
                order: 0,
            }],
        };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({ "title": "Hello", "blocks": [{ "kind": "Text", "text": "World", "order": 0 }] })
        );
    }

    #[test]
    fn block_payload_flattens_to_markup() {
        let payload = BlockPayload {
            title: None,
            blocks: vec![
                PublishedBlock { kind: BlockKind::Text, text: "intro".into(), image: None, order: 0 },
                PublishedBlock {
                    kind: BlockKind::Image,
                    text: String::new(),
                    image: Some(ImageRef {
                        id: "k".into(),
                        url: "http://x/a.png".into(),
                        display_name: "a.png".into(),
                    }),
                    order: 1,
                },
            ],
        };
        assert_eq!(payload.to_markup_body(), "intro\n\n![a.png](http://x/a.png)");
    }

    #[test]
    fn payload_title_reads_either_shape() {
        let blocks = PublishPayload::Blocks(BlockPayload { title: Some("Hello".into()), blocks: vec![] });
        assert_eq!(blocks.title(), Some("Hello"));

        let flat = PublishPayload::Flat(FlatPayload {
            title: None,
            body: "reply body".into(),
            attachments: vec![],
            tags: vec![],
            category: None,
            cover_image: None,
            flags: ThreadFlags::default(),
        });
        assert_eq!(flat.title(), None);
        assert_eq!(flat.markup_body(), "reply body");
    }

    #[test]
    fn row_filter_matches_all_columns() {
        let row = json!({ "username": "ada", "id": 7 });
        assert!(RowFilter::new().eq("username", "ada").matches(&row));
        assert!(!RowFilter::new().eq("username", "ada").eq("id", 8).matches(&row));
        assert!(RowFilter::new().matches(&row));
    }
}
