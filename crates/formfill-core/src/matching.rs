//! Pairing answers against widget annotations
//!
//! Matching is a linear scan with first-match-wins semantics: templates get
//! revised, and a duplicated field name across revisions should resolve to
//! the earliest answer in list order rather than an arbitrary one. Answers
//! with no matching widget are expected — an answer list may cover table
//! rows or template variants a given document does not contain — so they
//! are dropped, not rejected.

use crate::document::{FormDocument, WidgetKind};
use crate::normalize::normalize;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// One collected answer. `question` is the human-readable prompt and is
/// carried for diagnostics and archival only; matching uses `field_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub field_id: String,
    pub question: String,
    pub answer: String,
}

/// A resolved (widget, answer) pair, addressed by page and widget position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchedAnswer {
    pub page_index: usize,
    pub widget_index: usize,
    pub answer: String,
}

/// Match answers to widgets in page-then-annotation order.
///
/// For each widget the answer list is scanned in order and the first
/// `field_id` whose normalized key equals the widget's normalized name wins;
/// later duplicates are ignored. The numeric-text-field rewrite applies to
/// both sides of the comparison and only for `Text` widgets, so a
/// digit-named button field is matched verbatim.
pub fn match_answers(document: &FormDocument, answers: &[AnswerRecord]) -> Vec<MatchedAnswer> {
    let mut matches = Vec::new();
    let mut used_field_ids: Vec<&str> = Vec::new();

    for page in document.pages() {
        for (widget_index, widget) in page.widgets.iter().enumerate() {
            let numeric_rewrite = widget.kind == WidgetKind::Text;
            let widget_key = normalize(&widget.name, numeric_rewrite);

            let hit = answers
                .iter()
                .find(|answer| normalize(&answer.field_id, numeric_rewrite) == widget_key);

            if let Some(answer) = hit {
                debug!(
                    field = %widget.name,
                    answer_id = %answer.field_id,
                    "matched answer to widget"
                );
                used_field_ids.push(&answer.field_id);
                matches.push(MatchedAnswer {
                    page_index: page.index,
                    widget_index,
                    answer: answer.answer.clone(),
                });
            }
        }
    }

    for answer in answers {
        if !used_field_ids.iter().any(|used| *used == answer.field_id) {
            warn!(
                field_id = %answer.field_id,
                question = %answer.question,
                "answer has no matching widget, dropping"
            );
        }
    }

    matches
}
