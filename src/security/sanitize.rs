//! HTML sanitization policies.
//!
//! Plain-text fields lose all markup. The post body keeps a small set of
//! formatting tags, and every anchor gets `rel="noopener noreferrer"`.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use ammonia::Builder;

const RICH_TAGS: &[&str] = &[
    "p", "a", "b", "strong", "i", "em", "u", "blockquote", "code", "pre", "ul", "ol", "li", "h1",
    "h2", "h3", "br", "span",
];

const URL_SCHEMES: &[&str] = &["http", "https", "mailto"];

/// Tags whose text content is dropped along with the tag.
const PLAIN_DROPPED: &[&str] = &["script", "style", "textarea", "option", "noscript"];
const RICH_DROPPED: &[&str] = &["script", "style"];

/// `rel` is forced by the builder, so it is not in the `a` attribute list.
static RICH: LazyLock<Builder<'static>> = LazyLock::new(|| {
    let mut attributes: HashMap<&str, HashSet<&str>> = HashMap::new();
    attributes.insert("a", ["href", "name", "target"].into_iter().collect());
    attributes.insert("span", ["class"].into_iter().collect());
    attributes.insert("code", ["class"].into_iter().collect());

    let mut builder = Builder::default();
    builder
        .tags(RICH_TAGS.iter().copied().collect())
        .clean_content_tags(RICH_DROPPED.iter().copied().collect())
        .tag_attributes(attributes)
        .generic_attributes(HashSet::new())
        .url_schemes(URL_SCHEMES.iter().copied().collect())
        .link_rel(Some("noopener noreferrer"))
        .strip_comments(true);
    builder
});

static PLAIN: LazyLock<Builder<'static>> = LazyLock::new(|| {
    let mut builder = Builder::empty();
    builder
        .clean_content_tags(PLAIN_DROPPED.iter().copied().collect())
        .strip_comments(true);
    builder
});

/// Sanitize rich post content.
pub fn sanitize_rich_html(dirty: &str) -> String {
    RICH.clean(dirty).to_string()
}

/// Strip every tag, keeping only text.
pub fn sanitize_plain_text(dirty: &str) -> String {
    PLAIN.clean(dirty).to_string()
}

/// Plain-text sanitize each entry of a list.
pub fn sanitize_plain_list(items: Vec<String>) -> Vec<String> {
    items.iter().map(|s| sanitize_plain_text(s)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_strips_tags() {
        assert_eq!(sanitize_plain_text("<b>hi</b>"), "hi");
        assert_eq!(sanitize_plain_text("Hello <i>World</i>!"), "Hello World!");
        assert_eq!(sanitize_plain_text("no markup"), "no markup");
    }

    #[test]
    fn test_plain_text_drops_script_content() {
        assert_eq!(sanitize_plain_text("a<script>alert(1)</script>b"), "ab");
        assert_eq!(sanitize_plain_text("<style>p{}</style>x"), "x");
    }

    #[test]
    fn test_rich_removes_script_entirely() {
        let clean = sanitize_rich_html("<p>hi</p><script>alert('x')</script>");
        assert_eq!(clean, "<p>hi</p>");
    }

    #[test]
    fn test_rich_forces_rel_on_anchors() {
        let clean = sanitize_rich_html(r#"<a href="https://example.com" target="_blank">x</a>"#);
        assert!(clean.contains(r#"rel="noopener noreferrer""#), "{clean}");
        assert!(clean.contains(r#"target="_blank""#), "{clean}");

        let clean = sanitize_rich_html(r#"<a href="https://example.com" rel="opener">x</a>"#);
        assert!(clean.contains(r#"rel="noopener noreferrer""#), "{clean}");
        assert!(!clean.contains(r#"rel="opener""#), "{clean}");
    }

    #[test]
    fn test_rich_drops_disallowed_schemes_and_attributes() {
        let clean = sanitize_rich_html(
            r#"<a href="javascript:alert(1)">x</a><p onclick="steal()" class="c">y</p>"#,
        );
        assert!(!clean.contains("javascript"), "{clean}");
        assert!(!clean.contains("onclick"), "{clean}");
        assert!(!clean.contains("class"), "{clean}");
        assert!(clean.contains("<p>y</p>"), "{clean}");
    }

    #[test]
    fn test_rich_keeps_allowed_markup() {
        let html = r#"<h2>Title</h2><pre><code class="language-rust">fn main() {}</code></pre><ul><li><strong>a</strong></li></ul>"#;
        assert_eq!(sanitize_rich_html(html), html);
    }

    #[test]
    fn test_rich_unwraps_unknown_tags() {
        assert_eq!(sanitize_rich_html("<div><p>x</p></div>"), "<p>x</p>");
        assert_eq!(sanitize_rich_html("<img src=x onerror=alert(1)>"), "");
    }

    #[test]
    fn test_plain_list() {
        assert_eq!(
            sanitize_plain_list(vec!["<em>rust</em>".into(), "web".into()]),
            vec!["rust", "web"]
        );
    }
}
