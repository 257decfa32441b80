//! Prompt text sent with every completion request

/// Structured-output instruction shared by every vendor shape
pub const SYSTEM_INSTRUCTION: &str = "You are an email writing assistant working inside the user's mail client. \
You receive the user's current draft, the quoted email thread it replies to, and an instruction. \
Respond with a single JSON object and nothing else, in the form {\"subject\": string, \"body\": string}. \
Use an empty subject when the subject should not change. \
The body must be HTML restricted to <p>, <b>, <strong>, <i>, <em>, <ul>, <ol>, <li> and <br>, with emoji used sparingly. \
Do not include the signature or the quoted thread in the body. \
Tokens of the form [[KIND_N]], such as [[TABLE_1]] or [[IMAGE_2]], stand for content you cannot see: \
copy every such token into the body exactly as written and in the same position.";

const DRAFT_HEADING: &str = "Current draft:\n";
const THREAD_HEADING: &str = "Email thread:\n";
const SECTION_SEPARATOR: &str = "\n\n";

/// Build the context block from the captured draft and thread text.
///
/// Empty sections are left out. When the result would exceed `max_chars`,
/// the thread is cut first and the draft only if it alone is too long.
pub fn build_context(draft: &str, thread: &str, max_chars: usize) -> String {
    let draft = draft.trim();
    let thread = thread.trim();

    let draft_section = if draft.is_empty() {
        String::new()
    } else {
        format!("{}{}", DRAFT_HEADING, draft)
    };

    let draft_len = draft_section.chars().count();
    if draft_len >= max_chars {
        tracing::debug!("Draft fills the {} char context, thread dropped", max_chars);
        return truncate_chars(&draft_section, max_chars).to_string();
    }

    if thread.is_empty() {
        return draft_section;
    }

    let separator = if draft_section.is_empty() { "" } else { SECTION_SEPARATOR };
    let overhead = draft_len + separator.chars().count() + THREAD_HEADING.chars().count();
    if overhead >= max_chars {
        return draft_section;
    }

    let budget = max_chars - overhead;
    let thread_text = truncate_chars(thread, budget);
    if thread_text.len() < thread.len() {
        tracing::debug!(
            "Thread truncated to {} of {} chars",
            budget,
            thread.chars().count()
        );
    }

    format!("{}{}{}{}", draft_section, separator, THREAD_HEADING, thread_text)
}

/// Single user message: context first, then the instruction
pub fn build_user_message(context: &str, instruction: &str) -> String {
    if context.trim().is_empty() {
        format!("Instruction:\n{}", instruction.trim())
    } else {
        format!("{}\n\nInstruction:\n{}", context, instruction.trim())
    }
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((index, _)) => &text[..index],
        None => text,
    }
}
