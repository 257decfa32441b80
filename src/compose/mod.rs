//! Compose-buffer segmentation and reconstruction
//!
//! A compose body is split into the draft the user is writing, the signature
//! below it and the quoted thread. The draft is projected to text for the
//! completion request; signature and thread markup are kept verbatim and
//! reattached under the rewritten draft.

pub mod assistant;
pub mod cleaner;
pub mod formatter;
pub mod host;
pub mod patterns;
pub mod segment;
pub mod session;
pub mod signature;
pub mod thread;

pub use assistant::{spawn_assistant, AssistCommand, AssistEvent, AssistantHandle, ComposeAssistant};
pub use cleaner::clean_thread_text;
pub use formatter::{assemble_replacement_body, format_for_insertion};
pub use host::{FileHost, MailHost};
pub use segment::{
    extract_preservable_fragments, segment, split_for_extraction, ExtractedText, PreservedFragments,
    Segmentation,
};
pub use session::{Capture, ComposeSession};
pub use signature::{detect_signature_start, strip_signature, SignatureCut, SignatureRule};
pub use thread::{locate_thread_start, ThreadProbe};
