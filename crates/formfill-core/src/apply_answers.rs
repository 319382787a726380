//! Apply matched answers to widget annotations
//!
//! Takes the parsed document by value and returns the mutated value plus the
//! checkmark draw list, so the stage stays a pure transform: same document
//! and matches in, same document and instructions out. Mutations are written
//! both to the in-memory widget view and to the underlying lopdf objects.

use crate::document::{AppearanceState, FormDocument, WidgetKind, WidgetRect};
use crate::error::FormFillError;
use crate::matching::MatchedAnswer;
use lopdf::Object;
use tracing::warn;

/// Inset from the box corner and total vertical margin for the drawn glyph.
/// Tuned to center a check mark inside a typical checkbox, not derived.
const GLYPH_INSET: f64 = 2.0;
const GLYPH_MARGIN: f64 = 4.0;

/// A single checkmark to draw, in page coordinates. Produced here, consumed
/// once by the overlay stage.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckmarkInstruction {
    pub page_index: usize,
    pub x: f64,
    pub y: f64,
    pub glyph_size: f64,
}

/// True if an answer string marks a button field as checked.
/// Comparison is case-insensitive and ignores surrounding whitespace.
pub fn is_checked_token(answer: &str) -> bool {
    matches!(
        answer.trim().to_lowercase().as_str(),
        "yes" | "on" | "true" | "1"
    )
}

/// Write matched answers into the document.
///
/// Text widgets get the answer verbatim as `/V` and lose any cached `/AP`
/// appearance so viewers re-render from the value. Button widgets are set to
/// the `Yes`/`Off` state pair, and checked buttons with a usable rect emit a
/// [`CheckmarkInstruction`]. Instruction order follows page-then-annotation
/// encounter order.
pub fn apply_answers(
    mut document: FormDocument,
    matches: &[MatchedAnswer],
) -> Result<(FormDocument, Vec<CheckmarkInstruction>), FormFillError> {
    let mut instructions = Vec::new();

    for matched in matches {
        let (object_id, kind, rect) = {
            let widget = document
                .pages()
                .get(matched.page_index)
                .and_then(|page| page.widgets.get(matched.widget_index))
                .ok_or_else(|| {
                    FormFillError::Operation(format!(
                        "Matched widget {}/{} does not exist",
                        matched.page_index, matched.widget_index
                    ))
                })?;
            (widget.object_id, widget.kind, widget.rect)
        };

        let annot = document
            .doc
            .get_object_mut(object_id)
            .map_err(|e| FormFillError::Operation(e.to_string()))?
            .as_dict_mut()
            .map_err(|e| FormFillError::Operation(e.to_string()))?;

        let (value, state) = match kind {
            WidgetKind::Text => {
                annot.set(
                    "V",
                    Object::String(
                        matched.answer.as_bytes().to_vec(),
                        lopdf::StringFormat::Literal,
                    ),
                );
                // Stale cached appearances win over /V in most viewers.
                annot.remove(b"AP");
                (matched.answer.clone(), None)
            }
            WidgetKind::Button => {
                if is_checked_token(&matched.answer) {
                    annot.set("V", Object::Name(b"Yes".to_vec()));
                    annot.set("AS", Object::Name(b"Yes".to_vec()));
                    match checkmark_for(matched.page_index, rect) {
                        Some(instruction) => instructions.push(instruction),
                        None => warn!(
                            page = matched.page_index,
                            widget = matched.widget_index,
                            "checked button has no usable rect, skipping checkmark"
                        ),
                    }
                    ("Yes".to_string(), Some(AppearanceState::On))
                } else {
                    annot.set("V", Object::Name(b"Off".to_vec()));
                    annot.set("AS", Object::Name(b"Off".to_vec()));
                    ("Off".to_string(), Some(AppearanceState::Off))
                }
            }
        };

        let widget = &mut document.pages_mut()[matched.page_index].widgets[matched.widget_index];
        widget.value = Some(value);
        if state.is_some() {
            widget.appearance_state = state;
        }
    }

    Ok((document, instructions))
}

/// Derive the draw instruction for a checked box, or `None` when the rect is
/// missing or too small to hold a positive glyph size.
fn checkmark_for(page_index: usize, rect: Option<WidgetRect>) -> Option<CheckmarkInstruction> {
    let rect = rect?;
    let glyph_size = rect.y1 - rect.y0 - GLYPH_MARGIN;
    if glyph_size <= 0.0 {
        return None;
    }
    Some(CheckmarkInstruction {
        page_index,
        x: rect.x0 + GLYPH_INSET,
        y: rect.y0 + GLYPH_INSET,
        glyph_size,
    })
}
