//! Locale and mail-client pattern tables
//!
//! Every heuristic in the segmentation engine reads its vocabulary from here.
//! Supporting another locale or client means adding rows, not code.

use once_cell::sync::Lazy;
use regex::Regex;

/// How a closing phrase must sit on its line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhraseFit {
    /// The phrase is the whole line, optionally followed by punctuation and a name
    SignOff,
    /// The phrase starts the line; anything may follow
    Prefix,
}

/// A sign-off or client footer that opens a signature block
#[derive(Debug, Clone, Copy)]
pub struct ClosingPhrase {
    pub text: &'static str,
    pub fit: PhraseFit,
}

const fn sign_off(text: &'static str) -> ClosingPhrase {
    ClosingPhrase { text, fit: PhraseFit::SignOff }
}

const fn prefix(text: &'static str) -> ClosingPhrase {
    ClosingPhrase { text, fit: PhraseFit::Prefix }
}

/// Closing phrases in scan order. The first entry that matches anywhere wins.
pub const CLOSING_PHRASES: &[ClosingPhrase] = &[
    // English
    sign_off("Best regards"),
    sign_off("Kind regards"),
    sign_off("Warm regards"),
    sign_off("Warmest regards"),
    sign_off("With best regards"),
    sign_off("Thanks and regards"),
    sign_off("Thanks & regards"),
    sign_off("Many thanks"),
    sign_off("Best wishes"),
    sign_off("Sincerely"),
    sign_off("Yours sincerely"),
    sign_off("Yours faithfully"),
    sign_off("Regards"),
    sign_off("Cheers"),
    // French
    sign_off("Bien cordialement"),
    sign_off("Cordialement"),
    sign_off("Bien à vous"),
    sign_off("Sincères salutations"),
    sign_off("Meilleures salutations"),
    // German
    sign_off("Mit freundlichen Grüßen"),
    sign_off("Mit freundlichen Gruessen"),
    sign_off("Freundliche Grüße"),
    sign_off("Viele Grüße"),
    sign_off("Beste Grüße"),
    sign_off("Liebe Grüße"),
    // Client footers
    prefix("Sent from my iPhone"),
    prefix("Sent from my iPad"),
    prefix("Sent from my Android"),
    prefix("Sent from Mail for Windows"),
    prefix("Get Outlook for"),
    prefix("Envoyé de mon iPhone"),
    prefix("Obtenir Outlook pour"),
    prefix("Von meinem iPhone gesendet"),
    prefix("Outlook für"),
];

/// One compiled regex per [`CLOSING_PHRASES`] entry, same order, multi-line and case-insensitive
pub static CLOSING_PHRASE_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    CLOSING_PHRASES
        .iter()
        .map(|phrase| {
            let escaped = regex::escape(phrase.text);
            let pattern = match phrase.fit {
                PhraseFit::SignOff => {
                    format!(r"(?mi)^[ \t]*{}[ \t]*(?:[,.!:][^\n]*)?$", escaped)
                }
                PhraseFit::Prefix => format!(r"(?mi)^[ \t]*{}", escaped),
            };
            Regex::new(&pattern).unwrap()
        })
        .collect()
});

/// Same phrases and fits, anchored at the start of a block's text instead of a line.
///
/// A sign-off must end its line or be followed by punctuation, so a block
/// like "Cheers to everyone" stays in the draft.
pub static CLOSING_PHRASE_AT_START: Lazy<Regex> = Lazy::new(|| {
    let alternatives_for = |fit: PhraseFit| {
        CLOSING_PHRASES
            .iter()
            .filter(|phrase| phrase.fit == fit)
            .map(|phrase| regex::escape(phrase.text))
            .collect::<Vec<_>>()
            .join("|")
    };
    Regex::new(&format!(
        r"(?i)^\s*(?:(?:{})[ \t]*(?:[,.!:]|\r?\n|$)|(?:{}))",
        alternatives_for(PhraseFit::SignOff),
        alternatives_for(PhraseFit::Prefix)
    ))
    .unwrap()
});

/// Contact details that mark the start of an unlabelled signature block
pub static CONTACT_LINE_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // phone numbers: at least 9 digits with common separators
        r"(?:\+|\b)\d[\d \t().\-/]{7,}\d\b",
        // email addresses
        r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(?:\.[A-Za-z0-9\-]+)+",
        // URLs
        r"(?i)\b(?:https?://|www\.)\S+",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Header field labels, in the order they appear in a quoted header block
#[derive(Debug, Clone, Copy)]
pub struct HeaderLabels {
    pub locale: &'static str,
    pub from: &'static str,
    pub sent: &'static str,
    pub to: &'static str,
    pub subject: &'static str,
}

/// Labels as regex fragments; French labels allow the typographic space before the colon
pub const HEADER_LABELS: &[HeaderLabels] = &[
    HeaderLabels {
        locale: "en",
        from: r"From:",
        sent: r"Sent:",
        to: r"To:",
        subject: r"Subject:",
    },
    HeaderLabels {
        locale: "fr",
        from: r"De[ \u{a0}]?:",
        sent: r"Envoyé[ \u{a0}]?:",
        to: r"À[ \u{a0}]?:",
        subject: r"Objet[ \u{a0}]?:",
    },
    HeaderLabels {
        locale: "de",
        from: r"Von:",
        sent: r"Gesendet:",
        to: r"An:",
        subject: r"Betreff:",
    },
];

/// A "from ... sent" header block in any supported locale
pub static HEADER_BLOCK_REGEXES: Lazy<Vec<Regex>> = Lazy::new(|| {
    HEADER_LABELS
        .iter()
        .map(|labels| Regex::new(&format!(r"(?s)\b{}.*\b{}", labels.from, labels.sent)).unwrap())
        .collect()
});

/// Banner lines that introduce a quoted or forwarded message
pub const BANNER_PHRASES: &[&str] = &[
    "Original Message",
    "Message d'origine",
    "Message d’origine",
    "Forwarded message",
    "Message transféré",
    "Ursprüngliche Nachricht",
    "Weitergeleitete Nachricht",
];

/// Any banner phrase, case-insensitive, anywhere in the text
pub static BANNER_REGEX: Lazy<Regex> = Lazy::new(|| {
    let alternatives = BANNER_PHRASES
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i){}", alternatives)).unwrap()
});

/// Whole banner lines, case-insensitive
pub static BANNER_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    let alternatives = BANNER_PHRASES
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?mi)^[^\n]*(?:{})[^\n]*$", alternatives)).unwrap()
});

/// Header lines dropped entirely from thread text (case-sensitive labels)
pub const DROPPED_HEADER_LABELS: &[&str] = &[
    "Cc:", "Bcc:", "Date:", "Importance:", // en
    "Cc :", "Cci :", "Date :", "Importance :", // fr
    "Kopie:", "Datum:", "Wichtigkeit:", // de
];

/// "On ... wrote:" attribution lines per locale
pub const ATTRIBUTION_PATTERNS: &[&str] = &[
    r"(?m)^[ \t>]*On\b[^\n]*\bwrote:[ \t]*$",
    r"(?m)^[ \t>]*Le\b[^\n]*\ba écrit[ \t\u{a0}]?:[ \t]*$",
    r"(?m)^[ \t>]*Am\b[^\n]*\bschrieb[^\n]*:[ \t]*$",
];

/// Where a marker probe looks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Id(&'static str),
    Class(&'static str),
    Tag(&'static str),
    TagWithAttr {
        tag: &'static str,
        attr: &'static str,
        value: &'static str,
    },
    Attr {
        attr: &'static str,
        value: &'static str,
    },
}

/// Reply/forward containers in probe order (first match wins)
pub const THREAD_MARKERS: &[Marker] = &[
    // Outlook on the web
    Marker::Id("appendonsend"),
    Marker::Id("divRplyFwdMsg"),
    Marker::Id("x_divRplyFwdMsg"),
    // Outlook desktop / Mac
    Marker::Class("OutlookMessageHeader"),
    Marker::Id("mail-editor-reference-message-container"),
    // Gmail
    Marker::Class("gmail_quote_container"),
    Marker::Class("gmail_quote"),
    // Other clients
    Marker::Class("yahoo_quoted"),
    Marker::Class("moz-cite-prefix"),
    // Generic
    Marker::Tag("blockquote"),
    Marker::TagWithAttr {
        tag: "hr",
        attr: "tabindex",
        value: "-1",
    },
];

/// Explicit signature containers in probe order
pub const SIGNATURE_MARKERS: &[Marker] = &[
    Marker::Id("Signature"),
    Marker::Id("signature"),
    Marker::Id("x_Signature"),
    Marker::Class("gmail_signature"),
    Marker::Attr {
        attr: "data-smartmail",
        value: "gmail_signature",
    },
    Marker::Class("moz-signature"),
    Marker::Id("AppleMailSignature"),
];

/// Block-level tags scanned for header text when no marker matches
pub const HEADER_CANDIDATE_TAGS: &[&str] = &["div", "p", "font"];

/// Block-level tags considered when matching a signature template or closing phrase
pub const SIGNATURE_CANDIDATE_TAGS: &[&str] = &["div", "p", "table", "font"];
