//! Splitting a compose body into draft, signature and thread regions
//!
//! Two independent contracts live here:
//! - [`split_for_extraction`] projects plain text for prompting.
//! - [`extract_preservable_fragments`] captures signature and thread markup
//!   so they can be reattached after the draft is replaced.

use crate::compose::patterns::{CLOSING_PHRASE_AT_START, SIGNATURE_CANDIDATE_TAGS, SIGNATURE_MARKERS};
use crate::compose::signature::MIN_TEMPLATE_CHARS;
use crate::compose::thread::{locate_thread_start, matches_marker};
use crate::html::{ComposeDocument, Exclusions, NodeId, NodeKind};

/// Plain-text projection of the draft area and the quoted history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedText {
    pub current_message_text: String,
    pub thread_text: String,
}

/// Markup to reattach below a replacement draft
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreservedFragments {
    pub signature_html: String,
    pub thread_html: String,
}

impl PreservedFragments {
    pub fn is_empty(&self) -> bool {
        self.signature_html.is_empty() && self.thread_html.is_empty()
    }
}

/// Both projections of one compose body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Segmentation {
    pub current_message_text: String,
    pub thread_text: String,
    pub signature_html: String,
    pub thread_html: String,
}

/// Segment raw compose markup in one go
pub fn segment(html: &str, template: Option<&str>) -> Segmentation {
    let doc = ComposeDocument::parse(html);
    let text = split_for_extraction(&doc);
    let fragments = extract_preservable_fragments(&doc, template);
    Segmentation {
        current_message_text: text.current_message_text,
        thread_text: text.thread_text,
        signature_html: fragments.signature_html,
        thread_html: fragments.thread_html,
    }
}

/// Split the document's text at the thread start.
///
/// Text before the thread node in document order is the current message;
/// the thread node and everything after it is the thread.
pub fn split_for_extraction(doc: &ComposeDocument) -> ExtractedText {
    match locate_thread_start(doc) {
        Some(start) => ExtractedText {
            current_message_text: doc.text_where(|id| id < start),
            thread_text: doc.text_where(|id| id >= start),
        },
        None => ExtractedText {
            current_message_text: doc.text(),
            thread_text: String::new(),
        },
    }
}

/// Capture the thread block and the signature block as markup.
///
/// The thread is captured first and excluded from the working view, so the
/// signature search never sees quoted markup and the two never overlap.
pub fn extract_preservable_fragments(
    doc: &ComposeDocument,
    template: Option<&str>,
) -> PreservedFragments {
    let mut excluded = Exclusions::new();

    let thread_html = match locate_thread_start(doc) {
        Some(start) => capture_from_block(doc, start, &mut excluded),
        None => String::new(),
    };

    let signature_html = match find_signature_node(doc, &excluded, template) {
        Some(node) => capture_from_block(doc, node, &mut excluded),
        None => String::new(),
    };

    tracing::debug!(
        "Preserved fragments: signature {} bytes, thread {} bytes",
        signature_html.len(),
        thread_html.len()
    );

    PreservedFragments {
        signature_html,
        thread_html,
    }
}

/// Serialize the top-level block holding `node` plus its following siblings,
/// then exclude what was captured
fn capture_from_block(doc: &ComposeDocument, node: NodeId, excluded: &mut Exclusions) -> String {
    let container = block_container(doc, excluded, Some(node));
    let Some(block) = block_within(doc, container, node) else {
        return String::new();
    };

    let mut captured = String::new();
    for sibling in doc.self_and_following_siblings(block) {
        if excluded.contains(sibling) {
            continue;
        }
        captured.push_str(&doc.outer_html(sibling, excluded));
    }
    for sibling in doc.self_and_following_siblings(block) {
        if !excluded.contains(sibling) {
            excluded.exclude_subtree(doc, sibling);
        }
    }
    captured
}

/// Children of the root are the top-level blocks, except when the root holds
/// a single wrapper element (Word's `WordSection1`, Gmail's `dir="ltr"` div);
/// such wrappers are descended so the draft is not captured along with them.
fn block_container(doc: &ComposeDocument, excluded: &Exclusions, target: Option<NodeId>) -> NodeId {
    let mut container = doc.root();
    loop {
        let meaningful: Vec<NodeId> = meaningful_children(doc, container, excluded);
        let [only] = meaningful.as_slice() else {
            return container;
        };
        let only = *only;
        let is_wrapper = matches!(doc.tag(only), Some("div" | "section" | "font" | "span"));
        let has_blocks = meaningful_children(doc, only, excluded).len() > 1;
        let holds_target = target.map_or(true, |t| doc.is_ancestor_of(only, t));
        if !(is_wrapper && has_blocks && holds_target) {
            return container;
        }
        container = only;
    }
}

fn meaningful_children(doc: &ComposeDocument, id: NodeId, excluded: &Exclusions) -> Vec<NodeId> {
    doc.node(id)
        .children
        .iter()
        .copied()
        .filter(|&child| !excluded.contains(child))
        .filter(|&child| match &doc.node(child).kind {
            NodeKind::Element { .. } => true,
            NodeKind::Text(text) => !text.trim().is_empty(),
            NodeKind::Comment(_) => false,
        })
        .collect()
}

/// Ancestor-or-self of `id` whose parent is `container`
fn block_within(doc: &ComposeDocument, container: NodeId, id: NodeId) -> Option<NodeId> {
    let mut current = id;
    loop {
        let parent = doc.node(current).parent?;
        if parent == container {
            return Some(current);
        }
        current = parent;
    }
}

/// Explicit markers, then the session template, then a closing phrase
fn find_signature_node(
    doc: &ComposeDocument,
    excluded: &Exclusions,
    template: Option<&str>,
) -> Option<NodeId> {
    for marker in SIGNATURE_MARKERS {
        let found = doc
            .elements()
            .filter(|&id| id != doc.root() && !excluded.contains(id))
            .find(|&id| matches_marker(doc, id, marker));
        if let Some(id) = found {
            tracing::debug!("Signature container found by marker {:?}", marker);
            return Some(id);
        }
    }

    if let Some(template) = template.filter(|t| t.trim().chars().count() > MIN_TEMPLATE_CHARS) {
        if let Some(id) = find_template_run(doc, excluded, template) {
            tracing::debug!("Signature found by session template");
            return Some(id);
        }
    }

    let found = doc
        .elements()
        .filter(|&id| id != doc.root() && !excluded.contains(id))
        .filter(|&id| doc.tag(id).map_or(false, |t| SIGNATURE_CANDIDATE_TAGS.contains(&t)))
        .find(|&id| CLOSING_PHRASE_AT_START.is_match(&visible_text(doc, id, excluded)));
    if found.is_some() {
        tracing::debug!("Signature found by closing phrase");
    }
    found
}

/// Earliest block of the trailing run of top-level blocks whose text the template contains
fn find_template_run(doc: &ComposeDocument, excluded: &Exclusions, template: &str) -> Option<NodeId> {
    let template = collapse_whitespace(template);
    let container = block_container(doc, excluded, None);

    let mut start = None;
    for &block in doc.node(container).children.iter().rev() {
        if excluded.contains(block) {
            continue;
        }
        let text = collapse_whitespace(&visible_text(doc, block, excluded));
        if text.is_empty() {
            continue;
        }
        if !template.contains(&text) {
            break;
        }
        start = Some(block);
    }
    start
}

fn visible_text(doc: &ComposeDocument, id: NodeId, excluded: &Exclusions) -> String {
    let range = doc.subtree(id);
    doc.text_where(|n| range.contains(&n.0) && !excluded.contains(n))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
