//! Per-session capture state

use crate::compose::cleaner::clean_thread_text;
use crate::compose::segment::{extract_preservable_fragments, split_for_extraction, PreservedFragments};
use crate::compose::signature::strip_signature;
use crate::html::ComposeDocument;

/// Text projections from the most recent capture
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capture {
    /// Draft text with the signature stripped
    pub draft_text: String,
    /// Cleaned quoted history
    pub thread_text: String,
}

/// State owned by one compose session.
///
/// A learning session takes its signature template from the first capture
/// and only reads it afterwards. By the time later captures run the user has
/// started typing, so taking a new template then would swallow the draft.
/// Sessions that first see a body which may already hold a draft must not
/// learn at all; they rely on signature markers and closing phrases.
#[derive(Debug)]
pub struct ComposeSession {
    signature_template: Option<String>,
    learns_template: bool,
    last_capture: Option<Capture>,
    captures: u64,
}

impl Default for ComposeSession {
    fn default() -> Self {
        Self {
            signature_template: None,
            learns_template: true,
            last_capture: None,
            captures: 0,
        }
    }
}

impl ComposeSession {
    /// Session for a freshly opened compose window
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session with a known template instead of learning it
    pub fn with_template(template: impl Into<String>) -> Self {
        Self {
            signature_template: Some(template.into()),
            learns_template: false,
            ..Self::default()
        }
    }

    /// Session that never takes a template from what it captures
    pub fn without_learning() -> Self {
        Self {
            learns_template: false,
            ..Self::default()
        }
    }

    pub fn learns_template(&self) -> bool {
        self.learns_template && self.signature_template.is_none()
    }

    /// Give up learning, e.g. when the first body seen is not a clean one
    pub fn stop_learning(&mut self) {
        self.learns_template = false;
    }

    pub fn signature_template(&self) -> Option<&str> {
        self.signature_template.as_deref()
    }

    pub fn last_capture(&self) -> Option<&Capture> {
        self.last_capture.as_ref()
    }

    pub fn capture_count(&self) -> u64 {
        self.captures
    }

    /// Re-segment the current compose markup and remember the result.
    ///
    /// Reads `html` only. The first call of a learning session also takes the
    /// pre-thread text as the signature template.
    pub fn capture(&mut self, html: &str) -> &Capture {
        let doc = ComposeDocument::parse(html);
        let extracted = split_for_extraction(&doc);

        if self.learns_template() {
            tracing::debug!(
                "Signature template captured ({} chars)",
                extracted.current_message_text.chars().count()
            );
            self.signature_template = Some(extracted.current_message_text.clone());
            self.learns_template = false;
        }

        let capture = Capture {
            draft_text: strip_signature(
                &extracted.current_message_text,
                self.signature_template.as_deref(),
            ),
            thread_text: clean_thread_text(&extracted.thread_text),
        };
        self.captures += 1;
        self.last_capture.insert(capture)
    }

    /// Signature and thread markup to keep when the draft is replaced
    pub fn preservable_fragments(&self, html: &str) -> PreservedFragments {
        let doc = ComposeDocument::parse(html);
        extract_preservable_fragments(&doc, self.signature_template())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIGNED_BLANK: &str =
        r#"<div><br></div><div id="Signature"><div>Jane Doe</div><div>Acme Corp</div></div>"#;

    #[test]
    fn test_template_captured_once() {
        let mut session = ComposeSession::new();
        assert!(session.signature_template().is_none());

        let first = session.capture(SIGNED_BLANK).clone();
        assert_eq!(session.signature_template(), Some("Jane Doe\nAcme Corp"));
        assert_eq!(first.draft_text, "");

        let typed = r#"<div>Hi Bob, sounds good.</div><div id="Signature"><div>Jane Doe</div><div>Acme Corp</div></div>"#;
        let second = session.capture(typed).clone();
        assert_eq!(session.signature_template(), Some("Jane Doe\nAcme Corp"));
        assert_eq!(second.draft_text, "Hi Bob, sounds good.");
        assert_eq!(session.capture_count(), 2);
        assert_eq!(session.last_capture(), Some(&second));
    }

    #[test]
    fn test_non_learning_session_keeps_typed_draft() {
        let mut session = ComposeSession::without_learning();
        let html = r#"<div>Please approve the budget by Friday.</div><div>Thanks for checking.</div><div id="divRplyFwdMsg"><b>From:</b> Bob<br><b>Sent:</b> Monday</div><div>Budget attached</div>"#;

        let capture = session.capture(html).clone();
        assert!(session.signature_template().is_none());
        assert_eq!(
            capture.draft_text,
            "Please approve the budget by Friday.\nThanks for checking."
        );

        let fragments = session.preservable_fragments(html);
        assert!(fragments.signature_html.is_empty());
        assert!(fragments.thread_html.starts_with(r#"<div id="divRplyFwdMsg">"#));
        assert!(!fragments.thread_html.contains("Please approve"));
    }

    #[test]
    fn test_stop_learning_before_first_capture() {
        let mut session = ComposeSession::new();
        assert!(session.learns_template());
        session.stop_learning();
        session.capture("<div>Typed already</div>");
        assert!(session.signature_template().is_none());
        assert_eq!(session.last_capture().unwrap().draft_text, "Typed already");
    }

    #[test]
    fn test_capture_cleans_thread() {
        let mut session = ComposeSession::with_template("Jane Doe\nAcme Corp");
        let html = r#"<div>Approved.</div><div>Jane Doe</div><div>Acme Corp</div><div id="divRplyFwdMsg"><b>From:</b> Bob &lt;bob@example.com&gt;<br><b>Sent:</b> Monday<br><b>To:</b> Jane<br><b>Subject:</b> Budget</div><div>Can you approve?</div>"#;

        let capture = session.capture(html);
        assert_eq!(capture.draft_text, "Approved.");
        assert!(capture.thread_text.starts_with("From:\nSent:\nTo:\nSubject: Budget"));
        assert!(capture.thread_text.ends_with("Can you approve?"));
        assert!(!capture.thread_text.contains("bob@example.com"));
    }

    #[test]
    fn test_fragments_use_template() {
        let mut session = ComposeSession::new();
        session.capture("<p>Jane Doe<br>Acme Corp</p>");

        let fragments = session.preservable_fragments("<p>New text here</p><p>Jane Doe<br>Acme Corp</p>");
        assert_eq!(fragments.signature_html, "<p>Jane Doe<br>Acme Corp</p>");
        assert!(fragments.thread_html.is_empty());
    }
}
