//! Text cleanup helpers shared by the store and the renderer

use regex::Regex;
use std::sync::OnceLock;

fn tag_pattern() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid tag regex"))
}

/// Remove every `<...>` tag and trim surrounding whitespace.
///
/// Applying this to its own output is a no-op.
pub fn strip_html(content: &str) -> String {
    tag_pattern().replace_all(content, "").trim().to_string()
}

/// Collapse runs of whitespace into single spaces
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Plain text of a paragraph ready for layout, or `None` if nothing is left
pub fn layout_text(content: &str) -> Option<String> {
    let text = collapse_whitespace(&strip_html(content));
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_html() {
        let html = "  <p class=\"x\">Come to <em>Jesus</em> just as you are.</p>\n";
        assert_eq!(strip_html(html), "Come to Jesus just as you are.");
    }

    #[test]
    fn test_strip_is_idempotent() {
        let once = strip_html("<span>a</span> <b>b</b> c > d");
        assert_eq!(strip_html(&once), once);
    }

    #[test]
    fn test_strip_keeps_bare_angle_bracket() {
        assert_eq!(strip_html("1 > 0"), "1 > 0");
    }

    #[test]
    fn test_layout_text_discards_blank() {
        assert_eq!(layout_text("<br/>  \n "), None);
        assert_eq!(
            layout_text("<p>One\n  two</p>"),
            Some("One two".to_string())
        );
    }
}
