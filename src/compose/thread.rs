//! Locating where quoted or forwarded history begins

use crate::compose::patterns::{
    Marker, BANNER_REGEX, HEADER_BLOCK_REGEXES, HEADER_CANDIDATE_TAGS, THREAD_MARKERS,
};
use crate::html::{ComposeDocument, NodeId};

/// Which probe located the thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadProbe {
    ClientMarker(Marker),
    HeaderText,
    HorizontalRule,
}

/// Whether an element matches a marker probe
pub fn matches_marker(doc: &ComposeDocument, id: NodeId, marker: &Marker) -> bool {
    let Some(tag) = doc.tag(id) else {
        return false;
    };
    match *marker {
        Marker::Id(expected) => doc.attr(id, "id") == Some(expected),
        Marker::Class(class_name) => doc.has_class(id, class_name),
        Marker::Tag(expected) => tag == expected,
        Marker::TagWithAttr { tag: expected, attr, value } => {
            tag == expected && doc.attr(id, attr) == Some(value)
        }
        Marker::Attr { attr, value } => doc.attr(id, attr) == Some(value),
    }
}

/// First element in document order matching `marker`, root excluded
pub fn find_marker(doc: &ComposeDocument, marker: &Marker) -> Option<NodeId> {
    doc.elements()
        .filter(|&id| id != doc.root())
        .find(|&id| matches_marker(doc, id, marker))
}

/// Locate the node marking the start of quoted history.
///
/// Probes run in order: client markers, header text ("From: ... Sent:" or an
/// "Original Message" banner), then the first plain `<hr>`.
pub fn locate_thread_start(doc: &ComposeDocument) -> Option<NodeId> {
    locate_thread_start_with_probe(doc).map(|(id, _)| id)
}

/// Like [`locate_thread_start`], also reporting which probe fired
pub fn locate_thread_start_with_probe(doc: &ComposeDocument) -> Option<(NodeId, ThreadProbe)> {
    for marker in THREAD_MARKERS {
        if let Some(id) = find_marker(doc, marker) {
            tracing::debug!("Thread start found by client marker {:?}", marker);
            return Some((id, ThreadProbe::ClientMarker(*marker)));
        }
    }

    if let Some(id) = find_header_block(doc) {
        tracing::debug!("Thread start found by header text");
        return Some((id, ThreadProbe::HeaderText));
    }

    let hr = doc.elements_by_tag("hr").next()?;
    tracing::debug!("Thread start falling back to first <hr>");
    Some((hr, ThreadProbe::HorizontalRule))
}

fn is_header_text(text: &str) -> bool {
    HEADER_BLOCK_REGEXES.iter().any(|r| r.is_match(text)) || BANNER_REGEX.is_match(text)
}

/// The innermost candidate block, on the first matching path, whose text looks like a header
fn find_header_block(doc: &ComposeDocument) -> Option<NodeId> {
    let candidates: Vec<NodeId> = doc
        .elements()
        .filter(|&id| id != doc.root())
        .filter(|&id| doc.tag(id).map_or(false, |t| HEADER_CANDIDATE_TAGS.contains(&t)))
        .collect();

    let mut found = *candidates.iter().find(|&&id| is_header_text(&doc.text_of(id)))?;
    while let Some(&inner) = candidates
        .iter()
        .find(|&&id| doc.is_ancestor_of(found, id) && is_header_text(&doc.text_of(id)))
    {
        found = inner;
    }
    Some(found)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn start_tag(doc: &ComposeDocument, id: NodeId) -> (String, Option<String>, Option<String>) {
        (
            doc.tag(id).unwrap_or_default().to_string(),
            doc.attr(id, "id").map(str::to_string),
            doc.attr(id, "class").map(str::to_string),
        )
    }

    #[test]
    fn test_outlook_web_marker() {
        let doc = ComposeDocument::parse(
            r#"<div>Reply</div><div id="divRplyFwdMsg"><b>From:</b> A</div><div>old</div>"#,
        );
        let (id, probe) = locate_thread_start_with_probe(&doc).unwrap();
        assert_eq!(start_tag(&doc, id).1.as_deref(), Some("divRplyFwdMsg"));
        assert_eq!(probe, ThreadProbe::ClientMarker(Marker::Id("divRplyFwdMsg")));
    }

    #[test]
    fn test_gmail_quote_marker() {
        let doc = ComposeDocument::parse(
            r#"<div dir="ltr">Sure</div><div class="gmail_quote gmail_quote_container"><div class="gmail_attr">On Mon, Bob wrote:</div><blockquote>hi</blockquote></div>"#,
        );
        let id = locate_thread_start(&doc).unwrap();
        assert!(doc.has_class(id, "gmail_quote_container"));
    }

    #[test]
    fn test_marker_order_beats_document_order() {
        // blockquote appears earlier in the document but gmail_quote is probed first
        let doc = ComposeDocument::parse(
            r#"<blockquote>a pull quote</blockquote><div class="gmail_quote">history</div>"#,
        );
        let id = locate_thread_start(&doc).unwrap();
        assert!(doc.has_class(id, "gmail_quote"));
    }

    #[test]
    fn test_hr_with_tabindex() {
        let doc = ComposeDocument::parse(
            r#"<div>Hello world</div><hr tabindex="-1"><div>From: A Sent: B To: C Subject: D</div>"#,
        );
        let (id, _) = locate_thread_start_with_probe(&doc).unwrap();
        assert_eq!(doc.tag(id), Some("hr"));
    }

    #[test]
    fn test_header_text_picks_innermost_block() {
        let doc = ComposeDocument::parse(
            "<div><p>My reply</p><div><p><b>From:</b> Bob<br><b>Sent:</b> Monday<br><b>To:</b> Me</p><p>Earlier text</p></div></div>",
        );
        let (id, probe) = locate_thread_start_with_probe(&doc).unwrap();
        assert_eq!(probe, ThreadProbe::HeaderText);
        assert_eq!(doc.tag(id), Some("p"));
        assert!(doc.text_of(id).starts_with("From: Bob"));
    }

    #[test]
    fn test_localized_header_text() {
        let doc = ComposeDocument::parse(
            "<div>Antwort</div><div>Von: Hans<br>Gesendet: Montag<br>An: Eva</div>",
        );
        let (id, probe) = locate_thread_start_with_probe(&doc).unwrap();
        assert_eq!(probe, ThreadProbe::HeaderText);
        assert!(doc.text_of(id).starts_with("Von: Hans"));

        let doc = ComposeDocument::parse(
            "<p>Merci</p><p>-----Message d'origine-----</p><p>De : Paul</p>",
        );
        assert_eq!(
            locate_thread_start_with_probe(&doc).map(|(_, p)| p),
            Some(ThreadProbe::HeaderText)
        );
    }

    #[test]
    fn test_plain_hr_fallback() {
        let doc = ComposeDocument::parse("<div>Top</div><hr><div>Below the line</div>");
        let (id, probe) = locate_thread_start_with_probe(&doc).unwrap();
        assert_eq!(probe, ThreadProbe::HorizontalRule);
        assert_eq!(doc.tag(id), Some("hr"));
    }

    #[test]
    fn test_no_thread() {
        let doc = ComposeDocument::parse("<div>Just a new message</div><div>Thanks</div>");
        assert!(locate_thread_start(&doc).is_none());
    }
}
