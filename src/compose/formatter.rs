//! Rebuilding the compose body from a completion
//!
//! Completions arrive either as HTML or as lightweight markdown. Both paths end
//! with inline spacing styles on paragraphs and lists, since the compose editor
//! ignores stylesheets.

use crate::html::is_html_content;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::ops::Range;

pub const PARAGRAPH_STYLE: &str = "margin: 0 0 1em 0;";
pub const LIST_STYLE: &str = "margin: 0 0 1em 0; padding-left: 1.5em;";

static SPACING_TARGET: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<(p|ul|ol)(\s[^>]*)?>").unwrap());
static STYLE_ATTR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\sstyle\s*=").unwrap());

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\[[A-Za-z]+_\d+\]\]").unwrap());

static BOLD_STARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*\*([^*\s\n](?:[^\n]*?[^*\s])?)\*\*").unwrap());
static BOLD_UNDERSCORES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"__([^_\s](?:[^\n]*?[^_\s])?)__").unwrap());
static ITALIC_STAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\*([^*\s](?:[^*\n]*[^*\s])?)\*").unwrap());
static ITALIC_UNDERSCORE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"_([^_\s](?:[^_\n]*[^_\s])?)_").unwrap());

static UNORDERED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[-*]\s+(.*)$").unwrap());
static ORDERED_ITEM: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s+(.*)$").unwrap());

/// Convert a completion body into HTML ready for the compose editor.
///
/// HTML input only gains spacing styles. Anything else is treated as
/// markdown: bold and italic spans, `- `/`* ` and `N. ` lists, and blank-line
/// separated paragraphs. `[[KIND_N]]` placeholders pass through untouched.
pub fn format_for_insertion(raw_body: &str) -> String {
    if is_html_content(raw_body) {
        return inject_spacing_styles(raw_body);
    }
    if raw_body.trim().is_empty() {
        return String::new();
    }

    let escaped = escape_text(raw_body.trim());
    let inline = apply_inline_markdown(&escaped);
    inject_spacing_styles(&build_blocks(&inline))
}

/// `format_for_insertion(new_body) + signature_html + thread_html`
pub fn assemble_replacement_body(new_body: &str, signature_html: &str, thread_html: &str) -> String {
    let mut body = format_for_insertion(new_body);
    body.push_str(signature_html);
    body.push_str(thread_html);
    body
}

/// Add inline margins to `<p>`, `<ul>` and `<ol>` tags that carry no `style` yet.
///
/// Tags that already have a style attribute are left alone, so running this
/// twice yields the same markup.
pub fn inject_spacing_styles(html: &str) -> String {
    SPACING_TARGET
        .replace_all(html, |caps: &Captures| {
            let tag = &caps[1];
            let attrs = caps.get(2).map_or("", |m| m.as_str());
            if STYLE_ATTR.is_match(attrs) {
                return caps[0].to_string();
            }
            let style = if tag.eq_ignore_ascii_case("p") {
                PARAGRAPH_STYLE
            } else {
                LIST_STYLE
            };
            format!("<{}{} style=\"{}\">", tag, attrs, style)
        })
        .into_owned()
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace("\r\n", "\n")
}

fn apply_inline_markdown(text: &str) -> String {
    let text = replace_emphasis(text, &BOLD_STARS, "strong", |_, _| true);
    let text = replace_emphasis(&text, &BOLD_UNDERSCORES, "strong", outside_word);
    // a star next to another star is a stray bold delimiter, not italic
    let text = replace_emphasis(&text, &ITALIC_STAR, "em", |before, after| {
        before != Some('*') && after != Some('*')
    });
    replace_emphasis(&text, &ITALIC_UNDERSCORE, "em", outside_word)
}

fn outside_word(before: Option<char>, after: Option<char>) -> bool {
    let word_char = |c: char| c.is_alphanumeric() || c == '_';
    !before.map_or(false, word_char) && !after.map_or(false, word_char)
}

/// Wrap each accepted match of `pattern` in `tag`.
///
/// `accept` sees the characters just outside the match. Matches whose
/// delimiters fall inside a placeholder are skipped.
fn replace_emphasis(
    text: &str,
    pattern: &Regex,
    tag: &str,
    accept: impl Fn(Option<char>, Option<char>) -> bool,
) -> String {
    let guarded: Vec<Range<usize>> = PLACEHOLDER.find_iter(text).map(|m| m.range()).collect();
    let in_placeholder = |pos: usize| guarded.iter().any(|r| r.contains(&pos));

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in pattern.captures_iter(text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let before = text[..whole.start()].chars().next_back();
        let after = text[whole.end()..].chars().next();
        if !accept(before, after) || in_placeholder(whole.start()) || in_placeholder(whole.end() - 1) {
            continue;
        }
        out.push_str(&text[last..whole.start()]);
        out.push_str(&format!("<{}>{}</{}>", tag, inner.as_str(), tag));
        last = whole.end();
    }
    out.push_str(&text[last..]);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenBlock {
    None,
    Paragraph,
    Unordered,
    Ordered,
}

impl OpenBlock {
    fn close_tag(self) -> &'static str {
        match self {
            OpenBlock::None => "",
            OpenBlock::Paragraph => "</p>",
            OpenBlock::Unordered => "</ul>",
            OpenBlock::Ordered => "</ol>",
        }
    }

    fn open_tag(self) -> &'static str {
        match self {
            OpenBlock::None => "",
            OpenBlock::Paragraph => "<p>",
            OpenBlock::Unordered => "<ul>",
            OpenBlock::Ordered => "<ol>",
        }
    }
}

/// Line pass: group list items, split paragraphs on blank lines.
///
/// Text without any list or blank line comes out as a single paragraph.
fn build_blocks(text: &str) -> String {
    let mut html = String::with_capacity(text.len() + 64);
    let mut open = OpenBlock::None;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            switch_to(&mut html, &mut open, OpenBlock::None);
            continue;
        }

        if let Some(caps) = UNORDERED_ITEM.captures(line) {
            switch_to(&mut html, &mut open, OpenBlock::Unordered);
            html.push_str(&format!("<li>{}</li>", &caps[1]));
        } else if let Some(caps) = ORDERED_ITEM.captures(line) {
            switch_to(&mut html, &mut open, OpenBlock::Ordered);
            html.push_str(&format!("<li>{}</li>", &caps[1]));
        } else if open == OpenBlock::Paragraph {
            html.push_str("<br>");
            html.push_str(line);
        } else {
            switch_to(&mut html, &mut open, OpenBlock::Paragraph);
            html.push_str(line);
        }
    }
    html.push_str(open.close_tag());
    html
}

fn switch_to(html: &mut String, open: &mut OpenBlock, next: OpenBlock) {
    if *open != next {
        html.push_str(open.close_tag());
        html.push_str(next.open_tag());
        *open = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_list_then_paragraph() {
        let out = format_for_insertion("- item one\n- item two\n\nSecond paragraph");

        assert_eq!(out.matches("<ul").count(), 1);
        assert_eq!(out.matches("<li>").count(), 2);
        assert_eq!(out.matches("<p").count(), 1);
        assert!(out.contains(">Second paragraph</p>"));
        assert!(!out.contains("></p>"));
        assert!(out.find("</ul>").unwrap() < out.find("Second paragraph").unwrap());
        assert_eq!(
            out,
            format!(
                "<ul style=\"{}\"><li>item one</li><li>item two</li></ul><p style=\"{}\">Second paragraph</p>",
                LIST_STYLE, PARAGRAPH_STYLE
            )
        );
    }

    #[test]
    fn test_ordered_list_and_switching_blocks() {
        let out = format_for_insertion("Steps:\n1. Open it\n2. Close it\n* loose end");
        assert_eq!(
            out,
            format!(
                "<p style=\"{p}\">Steps:</p><ol style=\"{l}\"><li>Open it</li><li>Close it</li></ol><ul style=\"{l}\"><li>loose end</li></ul>",
                p = PARAGRAPH_STYLE,
                l = LIST_STYLE
            )
        );
    }

    #[test]
    fn test_single_line_is_one_paragraph() {
        let out = format_for_insertion("Thanks, see you Monday.");
        assert_eq!(out, format!("<p style=\"{}\">Thanks, see you Monday.</p>", PARAGRAPH_STYLE));
    }

    #[test]
    fn test_adjacent_lines_share_a_paragraph() {
        let out = format_for_insertion("Hi Bob,\nThanks for the update.\n\nJane");
        assert!(out.contains(">Hi Bob,<br>Thanks for the update.</p>"));
        assert!(out.contains(">Jane</p>"));
    }

    #[test]
    fn test_inline_emphasis() {
        let out = format_for_insertion("This is **very** important and __bold__, *quite* _subtle_.");
        assert!(out.contains("<strong>very</strong>"));
        assert!(out.contains("<strong>bold</strong>"));
        assert!(out.contains("<em>quite</em>"));
        assert!(out.contains("<em>subtle</em>"));
    }

    #[test]
    fn test_list_markers_are_not_italic() {
        let out = format_for_insertion("* first item\n* second *item*");
        assert!(!out.contains("<em>first"));
        assert!(out.contains("<li>second <em>item</em></li>"));
        assert_eq!(out.matches("<li>").count(), 2);
    }

    #[test]
    fn test_snake_case_left_alone() {
        let out = format_for_insertion("Set max_context_chars and retry_count");
        assert!(out.contains("max_context_chars and retry_count"));
        assert!(!out.contains("<em>"));
    }

    #[test]
    fn test_placeholder_preserved() {
        let out = format_for_insertion("<p>See [[TABLE_1]] below.</p>");
        assert!(out.contains("[[TABLE_1]]"));

        let out = format_for_insertion("See [[TABLE_1]] and [[IMAGE_2]], _really_.");
        assert!(out.contains("[[TABLE_1]]"));
        assert!(out.contains("[[IMAGE_2]]"));
        assert!(out.contains("<em>really</em>"));
    }

    #[test]
    fn test_markdown_text_is_escaped() {
        let out = format_for_insertion("a < b & c");
        assert!(out.contains("a &lt; b &amp; c"));
    }

    #[test]
    fn test_html_gets_styles_only() {
        let out = format_for_insertion("<p>Hello</p><ul><li>x</li></ul><pre>raw</pre>");
        assert_eq!(
            out,
            format!(
                "<p style=\"{}\">Hello</p><ul style=\"{}\"><li>x</li></ul><pre>raw</pre>",
                PARAGRAPH_STYLE, LIST_STYLE
            )
        );
    }

    #[test]
    fn test_existing_style_is_kept() {
        let html = r#"<p class="x" style="color: red">Hi</p>"#;
        assert_eq!(format_for_insertion(html), html);
    }

    #[test]
    fn test_style_injection_is_idempotent() {
        let once = format_for_insertion("- a\n- b\n\nTail **bold**");
        let twice = format_for_insertion(&once);
        assert_eq!(once, twice);
        assert_eq!(inject_spacing_styles(&once), once);
    }

    #[test]
    fn test_assemble_is_plain_concatenation() {
        let sig = "<div id=\"Signature\">Jane</div>";
        let thread = "<div id=\"divRplyFwdMsg\">From: Bob</div>";
        for body in ["Plain text", "<p>Already html</p>", "- a\n- b", ""] {
            assert_eq!(
                assemble_replacement_body(body, sig, thread),
                format!("{}{}{}", format_for_insertion(body), sig, thread)
            );
        }
    }

    #[test]
    fn test_blank_body_formats_to_nothing() {
        assert_eq!(format_for_insertion("  \n "), "");
    }
}
