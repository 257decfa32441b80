//! Trailing signature detection on plain text

use crate::compose::patterns::{CLOSING_PHRASE_REGEXES, CONTACT_LINE_REGEXES};

/// Templates this short (after trimming) are too weak to match on
pub const MIN_TEMPLATE_CHARS: usize = 5;

/// How many trailing lines the contact-details fallback looks at
const CONTACT_SCAN_LINES: usize = 8;

/// A contact line only counts when it sits within this many lines of the end
const CONTACT_WINDOW_LINES: usize = 10;

/// Which rule produced a cut
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureRule {
    /// The text ends with the session's signature template
    Template,
    /// A sign-off or client footer line
    ClosingPhrase,
    /// Phone, email or URL near the end of the text
    ContactDetails,
}

/// Byte offset where a signature begins
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureCut {
    pub index: usize,
    pub rule: SignatureRule,
}

/// Find where a trailing signature starts in `text`.
///
/// Rules are tried in priority order: template suffix, closing phrase, contact
/// details. Returns `None` when none of them fire.
pub fn detect_signature_start(text: &str, template: Option<&str>) -> Option<SignatureCut> {
    if let Some(template) = template
        .map(str::trim)
        .filter(|t| t.chars().count() > MIN_TEMPLATE_CHARS)
    {
        let body = text.trim_end();
        if body.ends_with(template) {
            return Some(SignatureCut {
                index: body.len() - template.len(),
                rule: SignatureRule::Template,
            });
        }
    }

    for regex in CLOSING_PHRASE_REGEXES.iter() {
        if let Some(found) = regex.find(text) {
            return Some(SignatureCut {
                index: found.start(),
                rule: SignatureRule::ClosingPhrase,
            });
        }
    }

    find_contact_block(text).map(|index| SignatureCut {
        index,
        rule: SignatureRule::ContactDetails,
    })
}

/// Earliest contact line among the last few lines; never the very first line
fn find_contact_block(text: &str) -> Option<usize> {
    let body = text.trim_end();
    let mut offsets = Vec::new();
    let mut offset = 0;
    for line in body.split('\n') {
        offsets.push((offset, line));
        offset += line.len() + 1;
    }

    let total = offsets.len();
    let first_scanned = total.saturating_sub(CONTACT_SCAN_LINES);
    let mut start = None;
    for idx in (first_scanned..total).rev() {
        let (line_offset, line) = offsets[idx];
        let within_window = total - idx <= CONTACT_WINDOW_LINES;
        if idx > 0 && within_window && CONTACT_LINE_REGEXES.iter().any(|r| r.is_match(line)) {
            start = Some(line_offset);
        }
    }
    start
}

/// Remove a trailing signature, returning the trimmed text before it
pub fn strip_signature(text: &str, template: Option<&str>) -> String {
    match detect_signature_start(text, template) {
        Some(cut) => {
            tracing::debug!("Signature detected by {:?} at byte {}", cut.rule, cut.index);
            text[..cut.index].trim().to_string()
        }
        None => text.trim().to_string(),
    }
}
