//! HTML fragment sanitization.
//!
//! The fragment is re-parsed and serialized back out through a filter:
//! script-like and hidden elements are dropped with their subtree,
//! comments vanish, tracking and event attributes are stripped, and
//! lazy-loaded images get their real source. Attributes are emitted sorted
//! by name and whitespace is collapsed, so the output is a fixed point:
//! `sanitize(sanitize(x)) == sanitize(x)`.

use std::collections::HashSet;
use std::sync::LazyLock;

use ego_tree::iter::Edge;
use regex::Regex;
use scraper::{Html, Node, node::Element};

/// Elements removed together with their content.
const DROPPED_ELEMENTS: &[&str] = &[
    "script", "style", "template", "noscript", "iframe", "xmp", "noembed", "noframes", "plaintext",
];

/// Classes that mark an element as hidden.
const HIDDEN_CLASSES: &[&str] = &["hidden", "visually-hidden"];

/// Attributes stripped from every element.
const STRIPPED_ATTRIBUTES: &[&str] = &[
    "onclick",
    "onload",
    "onerror",
    "onmouseover",
    "onfocus",
    "data-tracking",
    "data-analytics",
    "data-testid",
    "data-action",
    "data-controller",
    "data-target",
    "jsaction",
    "jsname",
    "jscontroller",
];

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

static WHITESPACE_RUN: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"\s+").ok());
static WHITESPACE_BETWEEN_TAGS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r">\s+<").ok());

fn is_dropped(element: &Element) -> bool {
    DROPPED_ELEMENTS.contains(&element.name())
        || element.attr("hidden").is_some()
        || element.classes().any(|c| HIDDEN_CLASSES.contains(&c))
}

fn is_void(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            c => out.push(c),
        }
    }
}

/// Returns the attributes to emit, filtered, rewritten and sorted by name.
///
/// Namespaced attributes are emitted by local name (`xlink:href` as
/// `href`), so only the first attribute per emitted name is kept, as a
/// parser does with repeated attributes.
fn clean_attributes(element: &Element) -> Vec<(&str, &str)> {
    let is_img = element.name() == "img";
    let lazy_src = if is_img {
        element.attr("data-src").filter(|s| !s.trim().is_empty())
    } else {
        None
    };

    let mut attrs: Vec<(&str, &str)> = element
        .attrs()
        .filter(|(name, _)| !STRIPPED_ATTRIBUTES.contains(name))
        .filter(|(name, _)| !(is_img && matches!(*name, "data-src" | "loading")))
        .filter(|(name, _)| !(lazy_src.is_some() && *name == "src"))
        .collect();
    if let Some(src) = lazy_src {
        attrs.push(("src", src));
    }
    let mut seen = HashSet::with_capacity(attrs.len());
    attrs.retain(|(name, _)| seen.insert(*name));
    attrs.sort_by(|a, b| a.0.cmp(b.0));
    attrs
}

fn open_tag(element: &Element, out: &mut String) {
    out.push('<');
    out.push_str(element.name());
    for (name, value) in clean_attributes(element) {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        escape_attribute(value, out);
        out.push('"');
    }
    out.push('>');
}

fn collapse_whitespace(html: &str) -> String {
    let (Some(run), Some(between)) = (WHITESPACE_RUN.as_ref(), WHITESPACE_BETWEEN_TAGS.as_ref())
    else {
        return html.trim().to_string();
    };
    let collapsed = run.replace_all(html, " ");
    between.replace_all(&collapsed, "><").trim().to_string()
}

/// Cleans an extracted HTML fragment.
#[must_use]
pub fn sanitize(fragment: &str) -> String {
    let html = Html::parse_fragment(fragment);
    let root = html.root_element();
    let mut out = String::with_capacity(fragment.len());
    let mut skipping = None;

    for edge in root.traverse() {
        match edge {
            Edge::Open(node) => {
                if skipping.is_some() || node.id() == root.id() {
                    continue;
                }
                match node.value() {
                    Node::Text(text) => escape_text(text, &mut out),
                    Node::Element(element) if is_dropped(element) => skipping = Some(node.id()),
                    Node::Element(element) => open_tag(element, &mut out),
                    _ => {}
                }
            }
            Edge::Close(node) => {
                if skipping == Some(node.id()) {
                    skipping = None;
                    continue;
                }
                if skipping.is_some() || node.id() == root.id() {
                    continue;
                }
                if let Node::Element(element) = node.value()
                    && !is_void(element.name())
                {
                    out.push_str("</");
                    out.push_str(element.name());
                    out.push('>');
                }
            }
        }
    }

    collapse_whitespace(&out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_drops_script_style_template_and_hidden() {
        let out = sanitize(
            r#"<p>keep</p><script>evil()</script><style>p{}</style><template><p>t</p></template>
            <div hidden>h1</div><span class="visually-hidden">h2</span><svg class="hidden"></svg><div class="note hidden">h3</div>"#,
        );
        assert_eq!(out, "<p>keep</p>");
    }

    #[test]
    fn test_strips_tracking_and_event_attributes() {
        let out = sanitize(
            r#"<a href="/x" onclick="go()" data-testid="link" jsaction="a" data-tracking="1" title="t">x</a>"#,
        );
        assert_eq!(out, r#"<a href="/x" title="t">x</a>"#);
    }

    #[test]
    fn test_promotes_lazy_image_source() {
        let out = sanitize(r#"<img src="placeholder.gif" data-src="real.png" loading="lazy" alt="a">"#);
        assert_eq!(out, r#"<img alt="a" src="real.png">"#);

        let plain = sanitize(r#"<img src="only.png" loading="lazy">"#);
        assert_eq!(plain, r#"<img src="only.png">"#);
    }

    #[test]
    fn test_collapses_whitespace_and_drops_comments() {
        let out = sanitize("  <div>\n  <p>one   two\n three</p>  <!-- c -->\n <p>four</p>\n</div>  ");
        assert_eq!(out, "<div><p>one two three</p><p>four</p></div>");
    }

    #[test]
    fn test_escapes_text_and_attributes() {
        let out = sanitize(r#"<p title="a &quot;b&quot; &lt;c&gt;">1 &lt; 2 &amp;&amp; 3&nbsp;&gt; 0</p>"#);
        assert_eq!(
            out,
            r#"<p title="a &quot;b&quot; &lt;c&gt;">1 &lt; 2 &amp;&amp; 3&nbsp;&gt; 0</p>"#
        );
    }

    #[test]
    fn test_idempotent_on_realistic_fragment() {
        let input = r#"
            <h1 data-testid="storyTitle">Title</h1>
            <p class="x" onclick="t()">Some <em>emphasis</em> and a <a href="https://e.com/?a=1&b=2">link</a>.</p>
            <figure><img data-src="a.png" loading="lazy"><figcaption>cap</figcaption></figure>
            <pre><code>fn main() {
                println!("hi");
            }</code></pre>
            <ul><li>one<li>two</ul>
            <table><tr><td>cell</td></tr></table>
        "#;
        let once = sanitize(input);
        assert_eq!(sanitize(&once), once);
        assert!(once.contains("<tbody>"));
    }

    #[test]
    fn test_namespaced_attributes_keep_first() {
        let once = sanitize(r#"<svg><a href="a" xlink:href="b">x</a></svg>"#);
        assert_eq!(once.matches("href=").count(), 1);
        assert_eq!(sanitize(&once), once);

        let once = sanitize(r#"<svg><text xml:lang="en" lang="fr">t</text></svg>"#);
        assert_eq!(once.matches("lang=").count(), 1);
        assert_eq!(sanitize(&once), once);
    }

    fn fragment() -> impl Strategy<Value = String> {
        let leaf = prop_oneof![
            "[a-z &<>\"']{0,12}".prop_map(|s| s.replace('&', "&amp;").replace('<', "&lt;")),
            Just("<br>".to_string()),
            Just(r#"<img data-src="x.png" loading="lazy" src="y.png">"#.to_string()),
            Just("<!-- note -->".to_string()),
            Just("<script>x()</script>".to_string()),
            Just("\u{a0}".to_string()),
            Just(r#"<svg><a href="a" xlink:href="b">x</a></svg>"#.to_string()),
            Just(r#"<svg><text xml:lang="en" lang="fr">t</text></svg>"#.to_string()),
        ];
        leaf.prop_recursive(4, 48, 6, |inner| {
            (
                prop_oneof![
                    Just("div"),
                    Just("span"),
                    Just("em"),
                    Just("strong"),
                    Just("blockquote"),
                    Just("section"),
                ],
                prop_oneof![
                    Just(""),
                    Just(r#" class="hidden""#),
                    Just(r#" onclick="x()" id="a""#),
                    Just(r#" data-testid="t"   title="a  b""#),
                ],
                prop::collection::vec(inner, 0..4),
                "[ \n\t]{0,3}",
            )
                .prop_map(|(tag, attrs, children, ws)| {
                    format!("<{tag}{attrs}>{ws}{}{ws}</{tag}>", children.join(ws.as_str()))
                })
        })
    }

    proptest! {
        #[test]
        fn prop_sanitize_is_idempotent(input in fragment()) {
            let once = sanitize(&input);
            prop_assert_eq!(sanitize(&once), once);
        }
    }
}
