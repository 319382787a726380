//! PDF form filling using lopdf
//!
//! Takes a form template and a flat list of (field identifier, answer)
//! pairs, and produces a filled PDF: widget annotations are located in the
//! document's object graph, field-name spelling variants are normalized so
//! loose answer keys match strict PDF names, text and button state is
//! written into the annotations, and checked boxes additionally get a
//! check-mark glyph drawn onto the page because widget appearance streams
//! render inconsistently across viewers.
//!
//! The pipeline is strictly sequential per document:
//! parse → match → mutate → assemble → composite. Each fill owns its own
//! document; nothing here keeps process-wide mutable state, so independent
//! fills can run in parallel.

pub mod apply_answers;
pub mod assemble;
pub mod document;
pub mod error;
pub mod matching;
pub mod normalize;
pub mod overlay;

pub use apply_answers::{apply_answers, is_checked_token, CheckmarkInstruction};
pub use assemble::{assemble, write_atomic, ScratchFile};
pub use document::{
    AppearanceState, FormDocument, PageWidgets, WidgetAnnotation, WidgetKind, WidgetRect,
};
pub use error::FormFillError;
pub use matching::{match_answers, AnswerRecord, MatchedAnswer};
pub use normalize::normalize;
pub use overlay::{CheckmarkCompositor, ContentStreamCompositor};

/// Fill a form template with the given answers, using the default
/// content-stream compositor for checkmark glyphs.
pub fn fill_form(template: &[u8], answers: &[AnswerRecord]) -> Result<Vec<u8>, FormFillError> {
    fill_form_with(template, answers, &ContentStreamCompositor)
}

/// Fill a form template, compositing checkmarks through the given backend.
///
/// A parse failure of the template aborts before any mutation; a
/// serialization failure aborts with no output. Unmatched answers and
/// unusable rects are non-fatal and only logged.
pub fn fill_form_with(
    template: &[u8],
    answers: &[AnswerRecord],
    compositor: &dyn CheckmarkCompositor,
) -> Result<Vec<u8>, FormFillError> {
    let document = FormDocument::parse(template)?;
    let matches = match_answers(&document, answers);
    let (document, instructions) = apply_answers(document, &matches)?;
    let intermediate = assemble(document)?;
    compositor.composite(&intermediate, &instructions)
}

/// Parse PDF bytes and return the page count.
pub fn page_count(bytes: &[u8]) -> Result<u32, FormFillError> {
    let doc =
        lopdf::Document::load_mem(bytes).map_err(|e| FormFillError::Parse(e.to_string()))?;
    Ok(doc.get_pages().len() as u32)
}
