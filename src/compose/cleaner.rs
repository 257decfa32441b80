//! Denoising quoted thread text before it is sent as prompt context

use crate::compose::patterns::{
    ATTRIBUTION_PATTERNS, BANNER_LINE_REGEX, DROPPED_HEADER_LABELS, HEADER_LABELS,
};
use crate::compose::signature::strip_signature;
use once_cell::sync::Lazy;
use regex::Regex;

static DEFAULT_CLEANER: Lazy<ThreadTextCleaner> = Lazy::new(ThreadTextCleaner::new);

/// Strip header values, boilerplate and the trailing signature from thread text
pub fn clean_thread_text(raw: &str) -> String {
    DEFAULT_CLEANER.clean(raw)
}

/// Compiled cleanup passes, built from the locale tables
pub struct ThreadTextCleaner {
    /// One regex per adjacent header label pair, applied in order
    range_collapses: Vec<Regex>,
    line_removals: Vec<Regex>,
    blank_lines: Regex,
    newline_runs: Regex,
}

impl Default for ThreadTextCleaner {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadTextCleaner {
    pub fn new() -> Self {
        let range_collapses = HEADER_LABELS
            .iter()
            .flat_map(|labels| {
                [
                    (labels.from, labels.sent),
                    (labels.sent, labels.to),
                    (labels.to, labels.subject),
                ]
            })
            .map(|(start, next)| Regex::new(&format!(r"(?s)\b({}).*?\b({})", start, next)).unwrap())
            .collect();

        let mut line_removals: Vec<Regex> = DROPPED_HEADER_LABELS
            .iter()
            .map(|label| {
                Regex::new(&format!(r"(?m)^[ \t]*{}[^\n]*$", regex::escape(label))).unwrap()
            })
            .collect();
        // bracketed addresses: <a@b.c> and [mailto:a@b.c]
        line_removals.push(Regex::new(r"<[^<>\s@]+@[^<>\s]+>").unwrap());
        line_removals.push(Regex::new(r"(?i)\[mailto:[^\]\s]+\]").unwrap());
        line_removals.extend(ATTRIBUTION_PATTERNS.iter().map(|p| Regex::new(p).unwrap()));
        line_removals.push(Regex::new(r"(?m)^[ \t]*[-_]{3,}[ \t]*$").unwrap());
        line_removals.push(Regex::clone(&BANNER_LINE_REGEX));

        Self {
            range_collapses,
            line_removals,
            blank_lines: Regex::new(r"(?m)^[ \t]+$").unwrap(),
            newline_runs: Regex::new(r"\n{3,}").unwrap(),
        }
    }

    pub fn clean(&self, raw: &str) -> String {
        let mut text = raw.replace("\r\n", "\n");

        for collapse in &self.range_collapses {
            text = collapse.replace_all(&text, "$1\n$2").into_owned();
        }

        for removal in &self.line_removals {
            text = removal.replace_all(&text, "").into_owned();
        }

        text = self.blank_lines.replace_all(&text, "").into_owned();
        text = self.newline_runs.replace_all(&text, "\n\n").into_owned();

        strip_signature(&text, None)
    }
}
