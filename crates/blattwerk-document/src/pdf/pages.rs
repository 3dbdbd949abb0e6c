// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-tree helpers over `lopdf`: inherited attributes, page boxes, flat
// page ordering, and content/resource injection.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, warn};

use blattwerk_core::error::{BlattwerkError, Result};

use crate::layout::Rect;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic /Parent chains in malformed files.
const MAX_TREE_DEPTH: usize = 32;

/// US Letter, used when a page carries no usable MediaBox at all.
const DEFAULT_MEDIA_BOX: Rect = Rect {
    x0: 0.0,
    y0: 0.0,
    x1: 612.0,
    y1: 792.0,
};

/// Page object ids in reading order.
pub fn page_ids(doc: &Document) -> Vec<ObjectId> {
    doc.get_pages().into_values().collect()
}

/// Id of the root /Pages node.
pub fn root_pages_id(doc: &Document) -> Result<ObjectId> {
    doc.catalog()
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|err| BlattwerkError::PdfError(format!("document has no page tree root: {}", err)))
}

/// Look up `key` on the page or the nearest ancestor that defines it.
pub fn inherited(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut current = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value.clone());
        }
        let parent = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    warn!(?page_id, "page tree deeper than expected, giving up on inheritance");
    None
}

/// Follow a reference to its target; direct objects are returned as-is.
pub fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Numeric value of an Integer or Real object.
pub fn as_number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(value) => Some(*value as f64),
        Object::Real(value) => Some(f64::from(*value)),
        _ => None,
    }
}

fn as_rect(doc: &Document, object: &Object) -> Option<Rect> {
    let Object::Array(items) = resolve(doc, object)? else {
        return None;
    };
    if items.len() != 4 {
        return None;
    }
    let values: Vec<f64> = items
        .iter()
        .filter_map(|item| resolve(doc, item).and_then(as_number))
        .collect();
    if values.len() != 4 {
        return None;
    }
    // Boxes may list any two opposite corners.
    Rect::new(
        values[0].min(values[2]),
        values[1].min(values[3]),
        values[0].max(values[2]),
        values[1].max(values[3]),
    )
    .validated()
}

/// The page's MediaBox in PDF user space.
pub fn media_box(doc: &Document, page_id: ObjectId) -> Rect {
    inherited(doc, page_id, b"MediaBox")
        .and_then(|obj| as_rect(doc, &obj))
        .unwrap_or(DEFAULT_MEDIA_BOX)
}

/// The visible region: CropBox when present, MediaBox otherwise.
pub fn visible_box(doc: &Document, page_id: ObjectId) -> Rect {
    inherited(doc, page_id, b"CropBox")
        .and_then(|obj| as_rect(doc, &obj))
        .unwrap_or_else(|| media_box(doc, page_id))
}

/// Current /Rotate of the page in degrees.
pub fn rotation(doc: &Document, page_id: ObjectId) -> i64 {
    inherited(doc, page_id, b"Rotate")
        .and_then(|obj| resolve(doc, &obj).and_then(|o| o.as_i64().ok()))
        .unwrap_or(0)
}

pub fn rect_object(rect: &Rect) -> Object {
    Object::Array(vec![
        Object::Real(rect.x0 as f32),
        Object::Real(rect.y0 as f32),
        Object::Real(rect.x1 as f32),
        Object::Real(rect.y1 as f32),
    ])
}

/// Copy inherited attributes onto the page itself so it no longer depends on
/// its current ancestors.
pub fn materialise_inherited(doc: &mut Document, page_id: ObjectId) -> Result<()> {
    let values: Vec<(&[u8], Object)> = INHERITABLE
        .iter()
        .filter_map(|key| inherited(doc, page_id, key).map(|value| (*key, value)))
        .collect();
    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|err| BlattwerkError::PdfError(format!("page {:?} is not a dictionary: {}", page_id, err)))?;
    for (key, value) in values {
        if !page.has(key) {
            page.set(key.to_vec(), value);
        }
    }
    Ok(())
}

/// Make the root /Pages node list exactly `pages`, in that order, then drop
/// every object no longer reachable.
///
/// Pages keep their content; inherited attributes are copied down first so
/// flattening the tree cannot change how they render.
pub fn set_page_order(doc: &mut Document, pages: &[ObjectId]) -> Result<()> {
    for &page_id in pages {
        materialise_inherited(doc, page_id)?;
    }

    let root_id = root_pages_id(doc)?;
    let root = doc
        .get_dictionary_mut(root_id)
        .map_err(|err| BlattwerkError::PdfError(format!("page tree root is not a dictionary: {}", err)))?;
    root.set("Kids", Object::Array(pages.iter().map(|&id| Object::Reference(id)).collect()));
    root.set("Count", Object::Integer(pages.len() as i64));

    for &page_id in pages {
        if let Ok(page) = doc.get_dictionary_mut(page_id) {
            page.set("Parent", Object::Reference(root_id));
        }
    }

    let pruned = doc.prune_objects();
    debug!(pages = pages.len(), pruned = pruned.len(), "page order rewritten");
    Ok(())
}

/// Append `operations` as a new content stream drawn on top of the page.
///
/// The existing content is bracketed in `q`/`Q` first, so whatever graphics
/// state it leaves behind cannot leak into the overlay.
pub fn append_content(doc: &mut Document, page_id: ObjectId, operations: Vec<u8>) -> Result<()> {
    let existing: Vec<Object> = match doc.get_dictionary(page_id).ok().and_then(|page| page.get(b"Contents").ok()) {
        Some(Object::Reference(id)) => vec![Object::Reference(*id)],
        Some(Object::Array(items)) => items.clone(),
        _ => Vec::new(),
    };

    let save_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    let restore_id = doc.add_object(Stream::new(Dictionary::new(), b"\nQ\n".to_vec()));
    let overlay_id = doc.add_object(Stream::new(Dictionary::new(), operations));

    let mut contents = Vec::with_capacity(existing.len() + 3);
    contents.push(Object::Reference(save_id));
    contents.extend(existing);
    contents.push(Object::Reference(restore_id));
    contents.push(Object::Reference(overlay_id));

    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|err| BlattwerkError::PdfError(format!("page {:?} is not a dictionary: {}", page_id, err)))?;
    page.set("Contents", Object::Array(contents));
    Ok(())
}

/// Register `value` under `/Resources/<category>/<name>` on the page.
///
/// Shared or inherited resource dictionaries are copied onto the page before
/// being modified so other pages are unaffected.
pub fn add_resource(doc: &mut Document, page_id: ObjectId, category: &str, name: &str, value: Object) -> Result<()> {
    let mut resources = match inherited(doc, page_id, b"Resources") {
        Some(obj) => match resolve(doc, &obj) {
            Some(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        },
        None => Dictionary::new(),
    };

    let mut entries = match resources.get(category.as_bytes()) {
        Ok(obj) => match resolve(doc, obj) {
            Some(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        },
        Err(_) => Dictionary::new(),
    };
    entries.set(name.as_bytes().to_vec(), value);
    resources.set(category.as_bytes().to_vec(), Object::Dictionary(entries));

    let page = doc
        .get_dictionary_mut(page_id)
        .map_err(|err| BlattwerkError::PdfError(format!("page {:?} is not a dictionary: {}", page_id, err)))?;
    page.set("Resources", Object::Dictionary(resources));
    Ok(())
}

/// Serialise the document.
pub fn save_to_bytes(doc: &mut Document) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    doc.save_to(&mut output)
        .map_err(|err| BlattwerkError::PdfError(format!("failed to serialise PDF: {}", err)))?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn media_box_is_inherited_from_page_tree() {
        let doc = fixtures::document(2, 400.0, 500.0);
        let ids = page_ids(&doc);
        assert_eq!(media_box(&doc, ids[0]), Rect::new(0.0, 0.0, 400.0, 500.0));
        assert_eq!(visible_box(&doc, ids[1]), Rect::new(0.0, 0.0, 400.0, 500.0));
        assert_eq!(rotation(&doc, ids[0]), 0);
    }

    #[test]
    fn reordering_flattens_and_keeps_attributes() {
        let mut doc = fixtures::document(3, 300.0, 300.0);
        let ids = page_ids(&doc);
        set_page_order(&mut doc, &[ids[2], ids[0]]).expect("reorder");

        let reordered = page_ids(&doc);
        assert_eq!(reordered, vec![ids[2], ids[0]]);
        let page = doc.get_dictionary(reordered[0]).expect("page");
        assert!(page.has(b"MediaBox"));
        assert!(page.has(b"Resources"));
        assert_eq!(fixtures::page_labels(&doc), vec!["Page 3", "Page 1"]);
    }

    #[test]
    fn appended_content_wraps_original() {
        let mut doc = fixtures::document(1, 300.0, 300.0);
        let page_id = page_ids(&doc)[0];
        append_content(&mut doc, page_id, b"0 0 m 10 10 l S".to_vec()).expect("append");

        let content = doc.get_page_content(page_id).expect("content");
        let text = String::from_utf8_lossy(&content);
        assert!(text.starts_with("q\n"));
        assert!(text.contains("(Page 1) Tj"));
        assert!(text.trim_end().ends_with("0 0 m 10 10 l S"));
    }

    #[test]
    fn resources_are_copied_before_modification() {
        let mut doc = fixtures::document(2, 300.0, 300.0);
        let ids = page_ids(&doc);
        add_resource(&mut doc, ids[0], "Font", "FStamp", Object::Null).expect("resource");

        let first = inherited(&doc, ids[0], b"Resources").expect("resources");
        let Object::Dictionary(first) = first else { panic!("inline dictionary expected") };
        let fonts = first.get(b"Font").expect("font dict");
        let fonts = resolve(&doc, fonts).expect("resolved");
        assert!(fonts.as_dict().expect("dict").has(b"FStamp"));
        assert!(fonts.as_dict().expect("dict").has(b"F1"));

        let second = inherited(&doc, ids[1], b"Resources").expect("resources");
        let second = resolve(&doc, &second).expect("resolved").as_dict().expect("dict").clone();
        let second_fonts = resolve(&doc, second.get(b"Font").expect("font")).expect("fonts");
        assert!(!second_fonts.as_dict().expect("dict").has(b"FStamp"));
    }
}
