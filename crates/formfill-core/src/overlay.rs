//! Checkmark overlay compositing
//!
//! Checked boxes get a glyph drawn directly onto the page because the
//! widget's own appearance streams are unreliable across viewers. The stage
//! is a capability trait with one production implementation so a different
//! rendering backend can satisfy the same seam without touching callers.

use crate::apply_answers::CheckmarkInstruction;
use crate::error::FormFillError;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use tracing::warn;

/// Draws checkmark glyphs onto an already-serialized document.
pub trait CheckmarkCompositor {
    /// Merge the glyphs described by `instructions` onto `document`.
    ///
    /// Pages without instructions pass through unmodified. An unreadable
    /// intermediate document is fatal: no output is produced.
    fn composite(
        &self,
        document: &[u8],
        instructions: &[CheckmarkInstruction],
    ) -> Result<Vec<u8>, FormFillError>;
}

/// Production compositor: appends a fresh content stream per affected page.
///
/// The glyph is the check mark (U+2713), reached as ZapfDingbats code 0x34
/// since none of the standard text fonts carry it.
pub struct ContentStreamCompositor;

impl CheckmarkCompositor for ContentStreamCompositor {
    fn composite(
        &self,
        document: &[u8],
        instructions: &[CheckmarkInstruction],
    ) -> Result<Vec<u8>, FormFillError> {
        if instructions.is_empty() {
            return Ok(document.to_vec());
        }

        let mut doc = Document::load_mem(document).map_err(|e| {
            FormFillError::Serialization(format!("Intermediate document unreadable: {}", e))
        })?;

        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();

        let mut by_page: BTreeMap<usize, Vec<&CheckmarkInstruction>> = BTreeMap::new();
        for instruction in instructions {
            by_page
                .entry(instruction.page_index)
                .or_default()
                .push(instruction);
        }

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "ZapfDingbats",
        });

        for (page_index, marks) in by_page {
            let Some(&page_id) = pages.get(page_index) else {
                warn!(page = page_index, "checkmark targets nonexistent page, skipping");
                continue;
            };

            ensure_font_resource(&mut doc, page_id, font_id)?;

            let mut content = String::from("q\n");
            for mark in marks {
                content.push_str("BT\n");
                let _ = writeln!(content, "/ZaDb {} Tf", mark.glyph_size);
                let _ = writeln!(content, "{} {} Td", mark.x, mark.y);
                // 0x34 is the check-mark glyph in the ZapfDingbats encoding.
                content.push_str("(4) Tj\n");
                content.push_str("ET\n");
            }
            content.push_str("Q\n");

            append_content(&mut doc, page_id, content)?;
        }

        let mut output = Vec::new();
        doc.save_to(&mut output)
            .map_err(|e| FormFillError::Serialization(e.to_string()))?;

        Ok(output)
    }
}

/// Register the overlay font as `/ZaDb` in the page's font resources,
/// wherever those happen to live (inline, referenced, or absent).
fn ensure_font_resource(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
) -> Result<(), FormFillError> {
    let resources_ref = {
        let page = doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| FormFillError::Operation(format!("Invalid page object: {}", e)))?;
        match page.get(b"Resources") {
            Ok(Object::Reference(id)) => Some(*id),
            _ => None,
        }
    };

    let font_ref = match resources_ref {
        Some(res_id) => {
            let resources = doc
                .get_object_mut(res_id)
                .map_err(|e| FormFillError::Operation(e.to_string()))?
                .as_dict_mut()
                .map_err(|e| FormFillError::Operation(e.to_string()))?;
            set_font_entry(resources, font_id)
        }
        None => {
            let page = doc
                .get_object_mut(page_id)
                .map_err(|e| FormFillError::Operation(e.to_string()))?
                .as_dict_mut()
                .map_err(|e| FormFillError::Operation(e.to_string()))?;

            let mut resources = match page.get(b"Resources") {
                Ok(Object::Dictionary(dict)) => dict.clone(),
                _ => Dictionary::new(),
            };
            let font_ref = set_font_entry(&mut resources, font_id);
            page.set("Resources", Object::Dictionary(resources));
            font_ref
        }
    };

    // The Font entry itself may be an indirect dictionary.
    if let Some(fonts_id) = font_ref {
        let fonts = doc
            .get_object_mut(fonts_id)
            .map_err(|e| FormFillError::Operation(e.to_string()))?
            .as_dict_mut()
            .map_err(|e| FormFillError::Operation(e.to_string()))?;
        fonts.set("ZaDb", Object::Reference(font_id));
    }

    Ok(())
}

/// Add `/ZaDb` to an inline Font dictionary, or report the indirect Font
/// dictionary the caller must patch instead.
fn set_font_entry(resources: &mut Dictionary, font_id: ObjectId) -> Option<ObjectId> {
    match resources.get_mut(b"Font") {
        Ok(Object::Dictionary(fonts)) => {
            fonts.set("ZaDb", Object::Reference(font_id));
            None
        }
        Ok(Object::Reference(id)) => Some(*id),
        _ => {
            let mut fonts = Dictionary::new();
            fonts.set("ZaDb", Object::Reference(font_id));
            resources.set("Font", Object::Dictionary(fonts));
            None
        }
    }
}

/// Stack a new content stream after the page's existing content.
fn append_content(
    doc: &mut Document,
    page_id: ObjectId,
    content: String,
) -> Result<(), FormFillError> {
    let stream = Stream::new(Dictionary::new(), content.into_bytes());
    let content_id = doc.add_object(Object::Stream(stream));

    let page = doc
        .get_object_mut(page_id)
        .map_err(|e| FormFillError::Operation(e.to_string()))?;

    if let Object::Dictionary(ref mut dict) = page {
        let existing = dict.get(b"Contents").ok().cloned();
        match existing {
            Some(Object::Reference(existing_id)) => {
                dict.set(
                    "Contents",
                    Object::Array(vec![
                        Object::Reference(existing_id),
                        Object::Reference(content_id),
                    ]),
                );
            }
            Some(Object::Array(mut arr)) => {
                arr.push(Object::Reference(content_id));
                dict.set("Contents", Object::Array(arr));
            }
            _ => {
                dict.set("Contents", Object::Reference(content_id));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mark(page_index: usize, x: f64, y: f64, glyph_size: f64) -> CheckmarkInstruction {
        CheckmarkInstruction {
            page_index,
            x,
            y,
            glyph_size,
        }
    }

    fn create_test_pdf(num_pages: u32) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        let mut kids = Vec::new();
        for _ in 0..num_pages {
            let content_id = doc.add_object(Object::Stream(Stream::new(
                Dictionary::new(),
                b"BT ET".to_vec(),
            )));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                "Contents" => Object::Reference(content_id),
            });
            kids.push(Object::Reference(page_id));
        }

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Count" => num_pages as i64,
                "Kids" => kids,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_no_instructions_returns_input_unchanged() {
        let pdf = create_test_pdf(2);
        let result = ContentStreamCompositor.composite(&pdf, &[]).unwrap();
        assert_eq!(result, pdf);
    }

    #[test]
    fn test_composite_draws_glyph_on_page() {
        let pdf = create_test_pdf(1);
        let result = ContentStreamCompositor
            .composite(&pdf, &[mark(0, 52.0, 52.0, 16.0)])
            .unwrap();

        let text = String::from_utf8_lossy(&result);
        assert!(text.contains("/ZaDb 16 Tf"), "missing font selection");
        assert!(text.contains("52 52 Td"), "missing glyph position");
        assert!(text.contains("(4) Tj"), "missing glyph draw");
        assert!(text.contains("ZapfDingbats"), "missing font resource");
    }

    #[test]
    fn test_composite_preserves_page_count() {
        let pdf = create_test_pdf(3);
        let result = ContentStreamCompositor
            .composite(&pdf, &[mark(1, 10.0, 10.0, 12.0)])
            .unwrap();

        let doc = Document::load_mem(&result).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn test_untouched_page_keeps_single_content_stream() {
        let pdf = create_test_pdf(2);
        let result = ContentStreamCompositor
            .composite(&pdf, &[mark(0, 10.0, 10.0, 12.0)])
            .unwrap();

        let doc = Document::load_mem(&result).unwrap();
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();

        let contents_of = |page_id: ObjectId| {
            doc.get_object(page_id)
                .unwrap()
                .as_dict()
                .unwrap()
                .get(b"Contents")
                .unwrap()
                .clone()
        };

        assert!(matches!(contents_of(pages[0]), Object::Array(arr) if arr.len() == 2));
        assert!(matches!(contents_of(pages[1]), Object::Reference(_)));
    }

    #[test]
    fn test_multiple_marks_share_one_stream_per_page() {
        let pdf = create_test_pdf(1);
        let result = ContentStreamCompositor
            .composite(
                &pdf,
                &[mark(0, 10.0, 10.0, 12.0), mark(0, 50.0, 50.0, 14.0)],
            )
            .unwrap();

        let doc = Document::load_mem(&result).unwrap();
        let pages: Vec<ObjectId> = doc.get_pages().into_values().collect();
        let contents = doc
            .get_object(pages[0])
            .unwrap()
            .as_dict()
            .unwrap()
            .get(b"Contents")
            .unwrap();
        assert!(matches!(contents, Object::Array(arr) if arr.len() == 2));
    }

    #[test]
    fn test_out_of_range_page_is_skipped() {
        let pdf = create_test_pdf(1);
        let result = ContentStreamCompositor
            .composite(&pdf, &[mark(5, 10.0, 10.0, 12.0)])
            .unwrap();

        let doc = Document::load_mem(&result).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_unreadable_document_is_fatal() {
        let result = ContentStreamCompositor.composite(b"garbage", &[mark(0, 0.0, 0.0, 10.0)]);
        assert!(matches!(result, Err(FormFillError::Serialization(_))));
    }
}
