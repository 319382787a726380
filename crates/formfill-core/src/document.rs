//! In-memory model of a form PDF
//!
//! Wraps a parsed `lopdf::Document` together with an ordered view of each
//! page's widget annotations. The view is what the matching and mutation
//! stages operate on; the underlying document is what gets serialized back
//! out, so both are kept in sync by the mutation stage.

use crate::error::FormFillError;
use lopdf::{Document, Object, ObjectId};

/// Field type of a widget annotation. Immutable once parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WidgetKind {
    Text,
    Button,
}

/// Which pre-rendered appearance a viewer should display for a button field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppearanceState {
    On,
    Off,
}

/// Widget rectangle in page coordinates: lower-left and upper-right corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidgetRect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

/// A single interactive form field anchored to a page.
#[derive(Debug, Clone)]
pub struct WidgetAnnotation {
    pub name: String,
    pub kind: WidgetKind,
    pub rect: Option<WidgetRect>,
    pub value: Option<String>,
    pub appearance_state: Option<AppearanceState>,
    /// Handle back into the lopdf object graph, used when writing mutations.
    pub(crate) object_id: ObjectId,
}

/// One page's worth of widgets, in `/Annots` order.
#[derive(Debug, Clone)]
pub struct PageWidgets {
    /// Zero-based page index, stable across mutation and overlay stages.
    pub index: usize,
    pub widgets: Vec<WidgetAnnotation>,
}

/// A parsed form document: the lopdf object graph plus the widget view.
pub struct FormDocument {
    pub(crate) doc: Document,
    pages: Vec<PageWidgets>,
}

impl FormDocument {
    /// Parse PDF bytes and index every widget annotation per page.
    ///
    /// Annotations without `/Subtype /Widget` or without a `/T` name are
    /// ignored, as are field types other than `/Tx` and `/Btn`. Only
    /// indirect annotation entries are kept; an inline dictionary inside
    /// `/Annots` cannot be addressed for mutation later.
    pub fn parse(bytes: &[u8]) -> Result<Self, FormFillError> {
        let doc = Document::load_mem(bytes).map_err(|e| FormFillError::Parse(e.to_string()))?;

        let mut pages = Vec::new();
        for (index, (_, page_id)) in doc.get_pages().into_iter().enumerate() {
            let widgets = collect_page_widgets(&doc, page_id)?;
            pages.push(PageWidgets { index, widgets });
        }

        Ok(Self { doc, pages })
    }

    pub fn pages(&self) -> &[PageWidgets] {
        &self.pages
    }

    pub(crate) fn pages_mut(&mut self) -> &mut [PageWidgets] {
        &mut self.pages
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Total number of widgets across all pages.
    pub fn widget_count(&self) -> usize {
        self.pages.iter().map(|p| p.widgets.len()).sum()
    }
}

fn collect_page_widgets(
    doc: &Document,
    page_id: ObjectId,
) -> Result<Vec<WidgetAnnotation>, FormFillError> {
    let page_dict = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| FormFillError::Parse(format!("Invalid page object: {}", e)))?;

    let annots = match page_dict.get(b"Annots") {
        Ok(obj) => match resolve(doc, obj) {
            Object::Array(arr) => arr.clone(),
            _ => return Ok(Vec::new()),
        },
        Err(_) => return Ok(Vec::new()),
    };

    let mut widgets = Vec::new();
    for entry in annots {
        let Object::Reference(annot_id) = entry else {
            continue;
        };
        let Ok(annot) = doc.get_object(annot_id).and_then(Object::as_dict) else {
            continue;
        };

        let is_widget = matches!(annot.get(b"Subtype"), Ok(Object::Name(n)) if n == b"Widget");
        if !is_widget {
            continue;
        }

        let Some(name) = annot.get(b"T").ok().and_then(decode_text) else {
            continue;
        };

        let kind = match annot.get(b"FT") {
            Ok(Object::Name(n)) if n == b"Tx" => WidgetKind::Text,
            Ok(Object::Name(n)) if n == b"Btn" => WidgetKind::Button,
            _ => continue,
        };

        let rect = annot
            .get(b"Rect")
            .ok()
            .and_then(|obj| parse_rect(resolve(doc, obj)));

        let value = annot.get(b"V").ok().and_then(decode_text);

        let appearance_state = match annot.get(b"AS") {
            Ok(Object::Name(n)) if n == b"Off" => Some(AppearanceState::Off),
            Ok(Object::Name(_)) => Some(AppearanceState::On),
            _ => None,
        };

        widgets.push(WidgetAnnotation {
            name,
            kind,
            rect,
            value,
            appearance_state,
            object_id: annot_id,
        });
    }

    Ok(widgets)
}

/// Follow a single level of indirection.
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        other => other,
    }
}

/// Decode a PDF text object (string or name) into UTF-8.
///
/// Text strings carrying a UTF-16BE BOM are decoded accordingly; everything
/// else is treated as a byte string.
fn decode_text(obj: &Object) -> Option<String> {
    let bytes = match obj {
        Object::String(bytes, _) => bytes,
        Object::Name(bytes) => bytes,
        _ => return None,
    };

    if bytes.starts_with(&[0xFE, 0xFF]) {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return Some(String::from_utf16_lossy(&utf16));
    }

    Some(String::from_utf8_lossy(bytes).into_owned())
}

fn parse_rect(obj: &Object) -> Option<WidgetRect> {
    let Object::Array(arr) = obj else {
        return None;
    };
    if arr.len() != 4 {
        return None;
    }

    let mut coords = [0.0f64; 4];
    for (slot, value) in coords.iter_mut().zip(arr) {
        *slot = number(value)?;
    }

    Some(WidgetRect {
        x0: coords[0],
        y0: coords[1],
        x1: coords[2],
        y1: coords[3],
    })
}

fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Real(v) => Some(*v as f64),
        Object::Integer(v) => Some(*v as f64),
        _ => None,
    }
}
