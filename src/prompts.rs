//! The instruction contract sent with every payload, and the fixed texts
//! that surround it.
//!
//! Keeping every prompt here means the contract can be inspected by unit
//! tests and changed in one place. Callers can override the instruction via
//! [`crate::config::StoryConfig::instruction`]; the constants are used when
//! no override is given.
//!
//! None of the contract is enforced locally. The model is asked to cover
//! every page, mark pages and finish with a completion proof, and whatever
//! it returns is passed through as-is.

/// Fixed instruction contract for turning a document or image into a story.
pub const INSTRUCTION_CONTRACT: &str = r#"You are a friendly storyteller for 5-year-old children.
You will receive a document or an image. It may be a whole book or a single page.
Turn the ENTIRE content into a simple, warm and fun story that a 5-year-old can follow.

TOTAL CONTENT RULES (summarising is a failure):
1. COMPLETE CONVERSION
   - PDF: convert every page, every paragraph and every line. Skip nothing.
   - Image: explain every detail that is visible in the image.
2. NO SUMMARIES
   - Every complex sentence in the original gets its own simple explanation.
   - Follow the original structure exactly. Do not merge paragraphs.
3. PAGE MARKERS
   - For a PDF, start the section for each page with a line of the form:
     --- PAGE [Number] KI MAGIC KAHANI ---
4. LENGTH
   - There is no length limit. Be as long and detailed as the content needs.
5. LANGUAGE AND TONE
   - Write in Hinglish (Hindi + English), like a loving parent reading aloud.
   - Explain hard ideas with toys, animals and magic.
   - Sprinkle emojis every few lines 🌟🎈🧸📖🌈🦄🍎🚗
6. FORMAT
   - Use Markdown: # headings, short paragraphs, - bullet lists, **bold** for key words.

VERIFICATION: finish with a section titled "Magic Completion Proof ✅" that says:
"Maine content ka ek-ek word aur ek-ek line bacho ke liye aasan bana di hai!"

Goal: the child learns 100% of the information in the original. Your output is a
complete, simplified mirror of the whole content."#;

/// Returned in place of the story when the capability answers with no text.
///
/// This is a degraded *success*, not an error.
pub const FALLBACK_MESSAGE: &str = "I couldn't read that story. Maybe try another one?";

/// Words that open every per-page marker line.
pub const PAGE_MARKER_KEYWORD: &str = "PAGE";

/// Heading the model is asked to close the story with.
pub const COMPLETION_PROOF_TITLE: &str = "Magic Completion Proof";

/// Build the marker line for a 1-indexed page.
pub fn page_marker(page: usize) -> String {
    format!("--- {PAGE_MARKER_KEYWORD} {page} KI MAGIC KAHANI ---")
}
