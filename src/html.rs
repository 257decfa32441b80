//! Compose document model
//!
//! The compose body is parsed once per capture with `scraper` (html5ever) and
//! flattened into an arena of nodes in document order. Segmentation works on
//! this immutable snapshot: "removing" a subtree means adding its index range
//! to an [`Exclusions`] set that traversal and serialization skip.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Node};
use std::ops::Range;

/// Tags that terminate a line when projecting text
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "aside", "blockquote", "center", "dd", "div", "dl", "dt", "fieldset",
    "figure", "footer", "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

/// Elements serialized without a closing tag
const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose content never contributes to projected text
const HIDDEN_TAGS: &[&str] = &["head", "script", "style", "template", "title"];

/// Index of a node inside a [`ComposeDocument`]
///
/// Ids are assigned in pre-order, so comparing ids compares document order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub usize);

/// Payload of an arena node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
    Comment(String),
}

/// A single node of the arena
#[derive(Debug, Clone)]
pub struct DomNode {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// One past the last descendant; the subtree is `id..end`
    end: usize,
}

/// Immutable snapshot of a compose body
#[derive(Debug, Clone)]
pub struct ComposeDocument {
    nodes: Vec<DomNode>,
}

/// Subtrees excluded from traversal and serialization
#[derive(Debug, Clone, Default)]
pub struct Exclusions {
    ranges: Vec<Range<usize>>,
}

impl Exclusions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclude a node and all of its descendants
    pub fn exclude_subtree(&mut self, doc: &ComposeDocument, id: NodeId) {
        self.ranges.push(doc.subtree(id));
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.ranges.iter().any(|r| r.contains(&id.0))
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl ComposeDocument {
    /// Parse compose markup. The `<body>` element becomes the arena root.
    pub fn parse(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let html_element = parsed.root_element();
        let body = html_element
            .children()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "body")
            .unwrap_or(html_element);

        let mut doc = ComposeDocument { nodes: Vec::new() };
        doc.push_element(body, None);

        tracing::debug!("Parsed compose document into {} nodes", doc.nodes.len());
        doc
    }

    fn push_element(&mut self, element: ElementRef<'_>, parent: Option<NodeId>) -> NodeId {
        let value = element.value();
        let id = NodeId(self.nodes.len());
        self.nodes.push(DomNode {
            kind: NodeKind::Element {
                tag: value.name().to_ascii_lowercase(),
                attrs: value
                    .attrs()
                    .map(|(name, val)| (name.to_string(), val.to_string()))
                    .collect(),
            },
            parent,
            children: Vec::new(),
            end: id.0 + 1,
        });

        for child in element.children() {
            let child_id = match child.value() {
                Node::Element(_) => ElementRef::wrap(child).map(|el| self.push_element(el, Some(id))),
                Node::Text(text) => Some(self.push_leaf(NodeKind::Text(text.to_string()), id)),
                Node::Comment(comment) => {
                    Some(self.push_leaf(NodeKind::Comment(comment.to_string()), id))
                }
                _ => None,
            };
            if let Some(child_id) = child_id {
                self.nodes[id.0].children.push(child_id);
            }
        }

        self.nodes[id.0].end = self.nodes.len();
        id
    }

    fn push_leaf(&mut self, kind: NodeKind, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(DomNode {
            kind,
            parent: Some(parent),
            children: Vec::new(),
            end: id.0 + 1,
        });
        id
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1 && self.nodes.first().map_or(true, |n| n.children.is_empty())
    }

    pub fn node(&self, id: NodeId) -> &DomNode {
        &self.nodes[id.0]
    }

    /// Index range covered by the subtree rooted at `id`
    pub fn subtree(&self, id: NodeId) -> Range<usize> {
        id.0..self.nodes[id.0].end
    }

    /// Lowercase tag name, or `None` for text and comment nodes
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { tag, .. } => Some(tag.as_str()),
            _ => None,
        }
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id.0].kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    /// Whether the element's `class` attribute contains `class_name`
    pub fn has_class(&self, id: NodeId, class_name: &str) -> bool {
        self.attr(id, "class")
            .map(|classes| classes.split_whitespace().any(|c| c == class_name))
            .unwrap_or(false)
    }

    /// All element ids in document order
    pub fn elements(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n.kind, NodeKind::Element { .. }))
            .map(|(i, _)| NodeId(i))
    }

    /// Elements with the given tag, in document order, root excluded
    pub fn elements_by_tag<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.elements()
            .filter(move |&id| id != self.root() && self.tag(id) == Some(tag))
    }

    pub fn is_ancestor_of(&self, ancestor: NodeId, id: NodeId) -> bool {
        ancestor != id && self.subtree(ancestor).contains(&id.0)
    }

    /// Walk up to the ancestor that is a direct child of the root.
    /// Returns `None` for the root itself.
    pub fn root_block_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        loop {
            let parent = self.nodes[current.0].parent?;
            if parent == self.root() {
                return Some(current);
            }
            current = parent;
        }
    }

    /// `id` and every sibling after it
    pub fn self_and_following_siblings(&self, id: NodeId) -> Vec<NodeId> {
        match self.nodes[id.0].parent {
            Some(parent) => self.nodes[parent.0]
                .children
                .iter()
                .copied()
                .filter(|&sibling| sibling >= id)
                .collect(),
            None => vec![id],
        }
    }

    /// Projected text of a subtree
    pub fn text_of(&self, id: NodeId) -> String {
        let range = self.subtree(id);
        self.text_where(|n| range.contains(&n.0))
    }

    /// Projected text of the whole document
    pub fn text(&self) -> String {
        self.text_where(|_| true)
    }

    /// Projected text of the document restricted to the text nodes accepted by `include`
    pub fn text_where(&self, include: impl Fn(NodeId) -> bool) -> String {
        let mut out = String::new();
        self.collect_text(self.root(), &include, &mut out);
        normalize_projected_text(&out)
    }

    fn collect_text(&self, id: NodeId, include: &dyn Fn(NodeId) -> bool, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(text) => {
                if include(id) {
                    push_collapsed(out, text);
                }
            }
            NodeKind::Comment(_) => {}
            NodeKind::Element { tag, .. } => {
                let tag = tag.as_str();
                if HIDDEN_TAGS.contains(&tag) {
                    return;
                }
                if tag == "br" {
                    if include(id) {
                        out.push('\n');
                    }
                    return;
                }

                let block = BLOCK_TAGS.contains(&tag);
                if block {
                    ensure_line_break(out);
                }
                for &child in &self.nodes[id.0].children {
                    self.collect_text(child, include, out);
                }
                if tag == "td" || tag == "th" {
                    out.push(' ');
                }
                if block {
                    ensure_line_break(out);
                    if tag == "p" {
                        out.push('\n');
                    }
                }
            }
        }
    }

    /// Serialized markup of an element including itself
    pub fn outer_html(&self, id: NodeId, excluded: &Exclusions) -> String {
        let mut out = String::new();
        self.write_node(id, excluded, &mut out);
        out
    }

    /// Serialized children of the root, skipping excluded subtrees
    pub fn body_html(&self, excluded: &Exclusions) -> String {
        let mut out = String::new();
        for &child in &self.nodes[self.root().0].children {
            self.write_node(child, excluded, &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, excluded: &Exclusions, out: &mut String) {
        if excluded.contains(id) {
            return;
        }
        let node = &self.nodes[id.0];
        match &node.kind {
            NodeKind::Text(text) => {
                let raw_parent = node
                    .parent
                    .and_then(|p| self.tag(p))
                    .map(|t| matches!(t, "script" | "style"))
                    .unwrap_or(false);
                if raw_parent {
                    out.push_str(text);
                } else {
                    out.push_str(&escape_text(text));
                }
            }
            NodeKind::Comment(comment) => {
                out.push_str("<!--");
                out.push_str(comment);
                out.push_str("-->");
            }
            NodeKind::Element { tag, attrs } => {
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_TAGS.contains(&tag.as_str()) {
                    return;
                }
                for &child in &node.children {
                    self.write_node(child, excluded, out);
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
            }
        }
    }
}

fn push_collapsed(out: &mut String, text: &str) {
    let mut pending_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() || ch == '\u{a0}' {
            pending_space = true;
            continue;
        }
        if pending_space && !out.is_empty() && !out.ends_with([' ', '\n']) {
            out.push(' ');
        }
        pending_space = false;
        out.push(ch);
    }
    if pending_space && !out.is_empty() && !out.ends_with([' ', '\n']) {
        out.push(' ');
    }
}

fn ensure_line_break(out: &mut String) {
    if !out.is_empty() && !out.ends_with('\n') {
        out.push('\n');
    }
}

fn normalize_projected_text(raw: &str) -> String {
    static BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

    let trimmed_lines = raw.lines().map(str::trim).collect::<Vec<_>>().join("\n");
    BLANK_RUNS
        .replace_all(&trimmed_lines, "\n\n")
        .trim()
        .to_string()
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '\u{a0}' => escaped.push_str("&nbsp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '\u{a0}' => escaped.push_str("&nbsp;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Check if content appears to be HTML rather than plain or markdown text
pub fn is_html_content(content: &str) -> bool {
    static HTML_TAG: Lazy<Regex> = Lazy::new(|| {
        Regex::new(
            r"(?i)</?(p|div|br|span|b|strong|i|em|u|ul|ol|li|a|table|tr|td|th|h[1-6]|blockquote|font|html|body)(\s[^<>]*)?/?>",
        )
        .unwrap()
    });
    HTML_TAG.is_match(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_detection() {
        assert!(is_html_content("<html><body>Test</body></html>"));
        assert!(is_html_content("<p>This is a paragraph</p>"));
        assert!(is_html_content("Hello <br> World"));
        assert!(is_html_content("<div><span>Content</span></div>"));
        assert!(!is_html_content("Plain text email"));
        assert!(!is_html_content("Email with > and < but no tags"));
        assert!(!is_html_content("- item one\n- **bold** item"));
    }

    #[test]
    fn test_arena_is_preorder() {
        let doc = ComposeDocument::parse("<div>a<span>b</span></div><p>c</p>");
        let div = doc.elements_by_tag("div").next().unwrap();
        let span = doc.elements_by_tag("span").next().unwrap();
        let p = doc.elements_by_tag("p").next().unwrap();

        assert!(div < span && span < p);
        assert!(doc.is_ancestor_of(div, span));
        assert!(!doc.is_ancestor_of(div, p));
        assert_eq!(doc.root_block_of(span), Some(div));
        assert_eq!(doc.root_block_of(doc.root()), None);
    }

    #[test]
    fn test_text_projection_breaks_blocks() {
        let doc = ComposeDocument::parse(
            "<div>Hello   <b>world</b></div><p>Second</p><div>Line one<br>Line two</div>",
        );
        assert_eq!(doc.text(), "Hello world\nSecond\n\nLine one\nLine two");
    }

    #[test]
    fn test_text_projection_skips_head_and_style() {
        let doc = ComposeDocument::parse(
            "<html><head><style>p { color: red; }</style></head><body><p>Visible</p></body></html>",
        );
        assert_eq!(doc.text(), "Visible");
    }

    #[test]
    fn test_serialization_round_trip() {
        let markup = r#"<div class="a" id="x">Tom &amp; Jerry<br><img src="y.png"></div><!--note--><p>&lt;tag&gt;</p>"#;
        let doc = ComposeDocument::parse(markup);
        assert_eq!(doc.body_html(&Exclusions::new()), markup);
    }

    #[test]
    fn test_exclusions_skip_subtree() {
        let doc = ComposeDocument::parse("<div>keep</div><div>drop<span>me</span></div>");
        let drop = doc.elements_by_tag("div").nth(1).unwrap();
        let mut excluded = Exclusions::new();
        excluded.exclude_subtree(&doc, drop);

        assert_eq!(doc.body_html(&excluded), "<div>keep</div>");
        let span = doc.elements_by_tag("span").next().unwrap();
        assert!(excluded.contains(span));
    }

    #[test]
    fn test_following_siblings() {
        let doc = ComposeDocument::parse("<div>1</div><div>2</div><div>3</div>");
        let second = doc.elements_by_tag("div").nth(1).unwrap();
        let siblings = doc.self_and_following_siblings(second);
        assert_eq!(siblings.len(), 2);
        assert_eq!(siblings[0], second);
    }
}
