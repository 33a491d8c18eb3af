//! # Inline Markup Renderer
//!
//! Turns the forum's small markup dialect into display HTML.
//!
//! Passes run in a fixed order and each one works on the output of the one
//! before it:
//!
//! 1. `![alt](url)` is pulled out into [`ProcessedContent::images`] and removed
//!    from the prose (images render in a separate gallery). The remaining text
//!    is then HTML-escaped.
//! 2. `[text](url)` becomes an anchor opening in a new tab.
//! 3. `@name` becomes a mention span.
//! 4. `**bold**`, then `*italic*`.
//! 5. `` `code` ``.
//! 6. Blank lines split paragraphs, single newlines become `<br>`.
//!
//! Rendered anchors are parked behind placeholders while passes 3 to 5 run,
//! so nothing inside an `href` is rewritten. Link text gets the same inline
//! passes before it is wrapped.
//!
//! Malformed markup (an unclosed `**`, emphasis spanning a link) is not
//! repaired; whatever the passes produce is the output.

use domains::models::{ImageRef, ProcessedContent};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)\s]+)\)").expect("image pattern"));
static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)\s]+)\)").expect("link pattern"));
// Not preceded by a word character, so `me@example.com` is left alone.
static MENTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(^|[^\w])@(\w+)").expect("mention pattern"));
static BOLD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern"));
static ITALIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*([^*]+)\*").expect("italic pattern"));
static CODE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`([^`]+)`").expect("code pattern"));
static PARAGRAPH_BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n").expect("paragraph pattern"));
// Private-use character; stripped from input so only placeholders carry it.
const ANCHOR_MARK: char = '\u{E000}';
static ANCHOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new("\u{E000}(\\d+)\u{E000}").expect("anchor placeholder pattern"));
static EXTRA_BLANK_LINES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n{3,}").expect("blank line pattern"));

/// Renders `body` into sanitized HTML plus the gallery image list.
pub fn process(body: &str) -> ProcessedContent {
    if body.trim().is_empty() {
        return ProcessedContent::default();
    }
    let body = body.replace("\r\n", "\n");

    let mut images = Vec::new();
    let prose = IMAGE_RE.replace_all(&body, |caps: &Captures| {
        images.push(caps[2].to_string());
        ""
    });
    let prose = prose.trim();
    if prose.is_empty() {
        return ProcessedContent {
            html: String::new(),
            images,
        };
    }

    let escaped = html_escape::encode_text(prose).replace(ANCHOR_MARK, "");

    let mut anchors: Vec<String> = Vec::new();
    let linked = LINK_RE.replace_all(&escaped, |caps: &Captures| {
        anchors.push(render_link(&inline(&caps[1]), &caps[2]));
        format!("{ANCHOR_MARK}{}{ANCHOR_MARK}", anchors.len() - 1)
    });
    let formatted = inline(&linked);
    let restored = ANCHOR_RE.replace_all(&formatted, |caps: &Captures| {
        caps[1]
            .parse::<usize>()
            .ok()
            .and_then(|i| anchors.get(i))
            .cloned()
            .unwrap_or_default()
    });

    let paragraphs = PARAGRAPH_BREAK_RE
        .split(&restored)
        .map(|p| p.replace('\n', "<br>"))
        .collect::<Vec<_>>();

    ProcessedContent {
        html: format!("<p>{}</p>", paragraphs.join("</p><p>")),
        images,
    }
}

/// Mentions, emphasis and code spans, in that order.
fn inline(text: &str) -> String {
    let mentioned = MENTION_RE.replace_all(text, r#"${1}<span class="mention">@${2}</span>"#);
    let bold = BOLD_RE.replace_all(&mentioned, "<strong>${1}</strong>");
    let italic = ITALIC_RE.replace_all(&bold, "<em>${1}</em>");
    CODE_RE
        .replace_all(&italic, r#"<code class="inline-code">${1}</code>"#)
        .into_owned()
}

fn render_link(text: &str, url: &str) -> String {
    if !is_safe_url(url) {
        return text.to_string();
    }
    format!(
        r#"<a href="{}" target="_blank" rel="noopener noreferrer">{}</a>"#,
        url.replace('"', "&quot;"),
        text
    )
}

/// Allows http(s), mailto, and scheme-less (relative) URLs.
fn is_safe_url(url: &str) -> bool {
    let scheme_end = url.find(|c: char| matches!(c, ':' | '/' | '?' | '#'));
    match scheme_end {
        Some(i) if url[i..].starts_with(':') => {
            let scheme = url[..i].to_ascii_lowercase();
            matches!(scheme.as_str(), "http" | "https" | "mailto")
        }
        _ => true,
    }
}

/// Usernames mentioned in `body`, distinct, in first-seen order.
/// Image references and link URLs are ignored; link text is not.
pub fn extract_mentions(body: &str) -> Vec<String> {
    let prose = IMAGE_RE.replace_all(body, "");
    let prose = LINK_RE.replace_all(&prose, "${1}");
    let mut names: Vec<String> = Vec::new();
    for caps in MENTION_RE.captures_iter(&prose) {
        let name = &caps[2];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// The inline reference that embeds `image` in a body.
pub fn image_reference(image: &ImageRef) -> String {
    let alt: String = image
        .display_name
        .chars()
        .filter(|c| !matches!(c, '[' | ']'))
        .collect();
    format!("![{}]({})", alt, image.url)
}

/// Removes every image reference pointing at `url`.
pub fn strip_image_references(body: &str, url: &str) -> String {
    let stripped = IMAGE_RE.replace_all(body, |caps: &Captures| {
        if &caps[2] == url {
            String::new()
        } else {
            caps[0].to_string()
        }
    });
    EXTRA_BLANK_LINES_RE
        .replace_all(&stripped, "\n\n")
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        assert_eq!(process(""), ProcessedContent { html: String::new(), images: vec![] });
        assert_eq!(process("  \n\n "), ProcessedContent::default());
    }

    #[test]
    fn bold_and_italic() {
        let out = process("**bold** and *italic*");
        assert!(out.html.contains("<strong>bold</strong>"));
        assert!(out.html.contains("<em>italic</em>"));
        assert!(out.images.is_empty());
    }

    #[test]
    fn images_are_extracted_not_inlined() {
        let out = process("![cat](http://x/cat.png) hello");
        assert_eq!(out.images, vec!["http://x/cat.png".to_string()]);
        assert!(out.html.contains("hello"));
        assert!(!out.html.contains("!["));
        assert!(!out.html.contains("cat.png"));
        assert_eq!(out.html, "<p>hello</p>");
    }

    #[test]
    fn images_keep_order_and_duplicates() {
        let out = process("![a](u1) text ![b](u2)\n![a again](u1)");
        assert_eq!(out.images, vec!["u1", "u2", "u1"]);
    }

    #[test]
    fn image_only_body_has_no_html() {
        let out = process("![a](http://x/a.png)");
        assert_eq!(out.html, "");
        assert_eq!(out.images, vec!["http://x/a.png"]);
    }

    #[test]
    fn links_open_in_new_context() {
        let out = process("see [docs](https://example.com/a?b=1&c=2)");
        assert_eq!(
            out.html,
            "<p>see <a href=\"https://example.com/a?b=1&amp;c=2\" target=\"_blank\" \
             rel=\"noopener noreferrer\">docs</a></p>"
        );
    }

    #[test]
    fn unsafe_link_schemes_render_as_text() {
        let out = process("[click](javascript:alert(1))");
        assert!(!out.html.contains("<a"));
        assert!(out.html.contains("click"));
    }

    #[test]
    fn link_urls_are_not_rewritten_by_later_passes() {
        let out = process("follow [me](https://mastodon.social/@ada)");
        assert_eq!(
            out.html,
            "<p>follow <a href=\"https://mastodon.social/@ada\" target=\"_blank\" \
             rel=\"noopener noreferrer\">me</a></p>"
        );

        let out = process("[a](https://x.test/a*b*c) and [c](https://x.test/`q`)");
        assert!(out.html.contains(r#"href="https://x.test/a*b*c""#));
        assert!(out.html.contains(r#"href="https://x.test/`q`""#));
        assert!(!out.html.contains("<em>"));
        assert!(!out.html.contains("<code"));
    }

    #[test]
    fn link_text_still_gets_inline_formatting() {
        let out = process("**see [the *docs*](https://x.test/@team) now** @bob");
        assert_eq!(
            out.html,
            "<p><strong>see <a href=\"https://x.test/@team\" target=\"_blank\" \
             rel=\"noopener noreferrer\">the <em>docs</em></a> now</strong> \
             <span class=\"mention\">@bob</span></p>"
        );
    }

    #[test]
    fn placeholder_character_in_input_is_dropped() {
        let out = process("a\u{E000}0\u{E000} [x](https://x.test)");
        assert!(!out.html.contains('\u{E000}'));
        assert_eq!(out.html.matches("<a ").count(), 1);
        assert!(out.html.starts_with("<p>a0 <a "));
    }

    #[test]
    fn raw_html_is_escaped() {
        let out = process("<script>alert('x')</script>");
        assert!(!out.html.contains("<script>"));
        assert!(out.html.contains("&lt;script&gt;"));
    }

    #[test]
    fn mentions_become_spans() {
        let out = process("thanks @ada_l, mail me@example.com");
        assert!(out.html.contains(r#"<span class="mention">@ada_l</span>"#));
        assert!(out.html.contains("me@example.com"));
        assert_eq!(out.html.matches("mention").count(), 1);
    }

    #[test]
    fn inline_code() {
        let out = process("run `cargo fmt` first");
        assert_eq!(out.html, r#"<p>run <code class="inline-code">cargo fmt</code> first</p>"#);
    }

    #[test]
    fn paragraphs_and_line_breaks() {
        let out = process("one\ntwo\n\nthree\r\n\r\n\r\nfour");
        assert_eq!(out.html, "<p>one<br>two</p><p>three</p><p>four</p>");
    }

    #[test]
    fn unclosed_bold_is_left_as_is() {
        let out = process("**open");
        assert_eq!(out.html, "<p>**open</p>");
    }

    #[test]
    fn mentions_are_distinct_and_ordered() {
        assert_eq!(
            extract_mentions("@bob hi @ada and @bob again ![@eve](u) a@b"),
            vec!["bob".to_string(), "ada".to_string()]
        );
        assert_eq!(
            extract_mentions("[ping @carl](https://mastodon.social/@dora)"),
            vec!["carl".to_string()]
        );
    }

    #[test]
    fn stripping_only_touches_matching_url() {
        let body = "intro\n\n![a](http://x/a.png)\n\n![b](http://x/b.png)\n\noutro";
        assert_eq!(
            strip_image_references(body, "http://x/a.png"),
            "intro\n\n![b](http://x/b.png)\n\noutro"
        );
    }

    #[test]
    fn reference_drops_brackets_from_name() {
        let image = ImageRef {
            id: "k".into(),
            url: "http://x/a.png".into(),
            display_name: "my [draft].png".into(),
        };
        assert_eq!(image_reference(&image), "![my draft.png](http://x/a.png)");
    }
}
