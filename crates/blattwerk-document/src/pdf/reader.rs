// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: open, inspect, split, merge, reorder, and rotate existing PDF
// documents using the `lopdf` crate.

use std::path::Path;

use blattwerk_core::ValidationError;
use blattwerk_core::error::{BlattwerkError, Result};
use lopdf::{Document, Object, ObjectId};
use tracing::{debug, info, instrument};

use crate::layout::{PageSelection, Rect, geometry};
use crate::pdf::pages;

/// Reads and manipulates existing PDF files.
///
/// Every operation works on a clone of the loaded document, so one reader
/// can serve several extractions.
#[derive(Clone)]
pub struct PdfReader {
    document: Document,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
}

impl PdfReader {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            BlattwerkError::CorruptInput(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        Self::checked(document, Some(path_ref.display().to_string()))
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data)
            .map_err(|err| BlattwerkError::CorruptInput(format!("failed to load PDF from memory: {}", err)))?;
        Self::checked(document, None)
    }

    fn checked(document: Document, source_path: Option<String>) -> Result<Self> {
        if document.is_encrypted() {
            return Err(BlattwerkError::CorruptInput(
                "document is password protected; unlock it first".into(),
            ));
        }
        let page_count = document.get_pages().len();
        if page_count == 0 {
            return Err(BlattwerkError::CorruptInput("document has no pages".into()));
        }
        debug!(pages = page_count, "PDF loaded");
        Ok(Self {
            document,
            source_path,
        })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    /// Return the source path if the reader was created via [`PdfReader::open`].
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn page_ids(&self) -> Vec<ObjectId> {
        pages::page_ids(&self.document)
    }

    /// Visible box of the zero-based page `index`.
    pub fn page_box(&self, index: usize) -> Option<Rect> {
        self.page_ids()
            .get(index)
            .map(|&id| pages::visible_box(&self.document, id))
    }

    /// Effective /Rotate of the zero-based page `index`.
    pub fn page_rotation(&self, index: usize) -> Option<i64> {
        self.page_ids()
            .get(index)
            .map(|&id| pages::rotation(&self.document, id))
    }

    /// Select every page, failing only for an empty document.
    pub fn all_pages(&self) -> Result<PageSelection> {
        Ok(PageSelection::all(self.page_count())?)
    }

    // -- Extraction -----------------------------------------------------------

    /// Build a standalone PDF holding the zero-based pages `indices`, in the
    /// order given.
    #[instrument(skip_all, fields(pages = indices.len()))]
    pub fn extract_pages(&self, indices: &[usize]) -> Result<Vec<u8>> {
        if indices.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }
        let ids = self.page_ids();
        let selected = indices
            .iter()
            .map(|&index| {
                ids.get(index).copied().ok_or_else(|| {
                    BlattwerkError::from(ValidationError::OutOfRange {
                        page: index as i64 + 1,
                        page_count: ids.len(),
                    })
                })
            })
            .collect::<Result<Vec<ObjectId>>>()?;

        let mut doc = self.document.clone();
        pages::set_page_order(&mut doc, &selected)?;
        let output = pages::save_to_bytes(&mut doc)?;
        debug!(output_bytes = output.len(), "Pages extracted");
        Ok(output)
    }

    /// One single-page PDF per page, in page order.
    #[instrument(skip(self))]
    pub fn split_each(&self) -> Result<Vec<Vec<u8>>> {
        let total = self.page_count();
        info!(total, "Splitting PDF into single pages");
        (0..total).map(|index| self.extract_pages(&[index])).collect()
    }

    /// One PDF per inclusive zero-based `(first, last)` span.
    #[instrument(skip_all, fields(spans = spans.len()))]
    pub fn split_spans(&self, spans: &[(usize, usize)]) -> Result<Vec<Vec<u8>>> {
        info!(total = self.page_count(), "Splitting PDF by ranges");
        spans
            .iter()
            .map(|&(first, last)| {
                let indices: Vec<usize> = (first..=last).collect();
                self.extract_pages(&indices)
            })
            .collect()
    }

    /// Concatenate whole documents in the order given.
    #[instrument(skip_all, fields(documents = inputs.len()))]
    pub fn merge(inputs: &[&[u8]]) -> Result<Vec<u8>> {
        if inputs.len() < 2 {
            return Err(ValidationError::MissingInput("merging needs at least two documents".into()).into());
        }

        let mut merged: Option<Document> = None;
        let mut order = Vec::new();

        for (index, bytes) in inputs.iter().enumerate() {
            let mut doc = Self::from_bytes(bytes)
                .map_err(|err| BlattwerkError::CorruptInput(format!("document #{}: {}", index + 1, err)))?
                .document;

            match merged.as_mut() {
                None => {
                    order.extend(pages::page_ids(&doc));
                    merged = Some(doc);
                }
                Some(target) => {
                    doc.renumber_objects_with(target.max_id + 1);
                    order.extend(pages::page_ids(&doc));
                    target.max_id = doc.max_id;
                    target.objects.extend(doc.objects);
                }
            }
        }

        let mut merged = merged.ok_or_else(|| ValidationError::MissingInput("no documents to merge".into()))?;
        pages::set_page_order(&mut merged, &order)?;
        let output = pages::save_to_bytes(&mut merged)?;
        info!(pages = order.len(), output_bytes = output.len(), "Merge complete");
        Ok(output)
    }

    /// Rearrange pages into `order`, which must list every page exactly once.
    #[instrument(skip_all, fields(pages = order.len()))]
    pub fn reorder(&self, order: &[usize]) -> Result<Vec<u8>> {
        let total = self.page_count();
        if order.len() != total {
            return Err(ValidationError::parameter(
                "pageOrder",
                format!("order lists {} pages but the document has {}", order.len(), total),
            )
            .into());
        }
        self.extract_pages(order)
    }

    // -- Page attributes ------------------------------------------------------

    /// Rotate every selected page by `degrees` (a multiple of 90), composing
    /// with its current rotation.
    #[instrument(skip(self, selection), fields(pages = selection.len(), degrees))]
    pub fn rotate(&self, selection: &PageSelection, degrees: i64) -> Result<Vec<u8>> {
        if degrees % 90 != 0 {
            return Err(ValidationError::parameter("angle", format!("rotation must be a multiple of 90, got {}", degrees)).into());
        }

        let mut doc = self.document.clone();
        let ids = pages::page_ids(&doc);
        for index in selection.iter() {
            let Some(&page_id) = ids.get(index) else {
                continue;
            };
            let existing = pages::rotation(&doc, page_id);
            let rotated = geometry::compose_rotation(existing, degrees);
            if let Ok(page) = doc.get_dictionary_mut(page_id) {
                page.set("Rotate", Object::Integer(rotated));
            }
            debug!(page = index + 1, existing, rotated, "Page rotated");
        }

        pages::save_to_bytes(&mut doc)
    }

    /// Serialise the document unchanged.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut doc = self.document.clone();
        pages::save_to_bytes(&mut doc)
    }

    pub fn into_document(self) -> Document {
        self.document
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::layout::page_range;

    fn reader(pages: usize) -> PdfReader {
        PdfReader::from_bytes(&fixtures::pdf_bytes(pages, 612.0, 792.0)).expect("fixture loads")
    }

    #[test]
    fn garbage_is_corrupt_input() {
        let err = PdfReader::from_bytes(b"definitely not a pdf").err().expect("error");
        assert!(matches!(err, BlattwerkError::CorruptInput(_)));
    }

    #[test]
    fn page_count_and_boxes() {
        let r = reader(3);
        assert_eq!(r.page_count(), 3);
        assert_eq!(r.page_box(2), Some(Rect::new(0.0, 0.0, 612.0, 792.0)));
        assert_eq!(r.page_box(3), None);
        assert_eq!(r.page_rotation(0), Some(0));
    }

    #[test]
    fn split_spans_match_requested_pages() {
        let r = reader(5);
        let parts = r.split_spans(&[(0, 1), (3, 4)]).expect("split");
        assert_eq!(parts.len(), 2);
        assert_eq!(fixtures::labels_of(&parts[0]), vec!["Page 1", "Page 2"]);
        assert_eq!(fixtures::labels_of(&parts[1]), vec!["Page 4", "Page 5"]);
    }

    #[test]
    fn split_then_merge_reproduces_order() {
        let r = reader(4);
        let singles = r.split_each().expect("split");
        assert_eq!(singles.len(), 4);
        for part in &singles {
            assert_eq!(PdfReader::from_bytes(part).expect("part").page_count(), 1);
        }

        let refs: Vec<&[u8]> = singles.iter().map(Vec::as_slice).collect();
        let merged = PdfReader::merge(&refs).expect("merge");
        assert_eq!(
            fixtures::labels_of(&merged),
            vec!["Page 1", "Page 2", "Page 3", "Page 4"]
        );
    }

    #[test]
    fn merge_needs_two_documents() {
        let one = fixtures::pdf_bytes(1, 100.0, 100.0);
        let err = PdfReader::merge(&[one.as_slice()]).err().expect("error");
        assert!(matches!(err, BlattwerkError::Validation(ValidationError::MissingInput(_))));
    }

    #[test]
    fn merge_reports_which_document_is_corrupt() {
        let good = fixtures::pdf_bytes(1, 100.0, 100.0);
        let err = PdfReader::merge(&[good.as_slice(), b"junk"]).err().expect("error");
        match err {
            BlattwerkError::CorruptInput(msg) => assert!(msg.contains("#2")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn reorder_follows_caller_order() {
        let r = reader(3);
        let order = page_range::parse_order("[3,1,2]", 3).expect("order");
        let out = r.reorder(&order).expect("reorder");
        assert_eq!(fixtures::labels_of(&out), vec!["Page 3", "Page 1", "Page 2"]);
    }

    #[test]
    fn reorder_must_cover_every_page() {
        let r = reader(3);
        let err = r.reorder(&[1, 0]).err().expect("error");
        assert!(matches!(err, BlattwerkError::Validation(ValidationError::Parameter { .. })));
    }

    #[test]
    fn rotation_composes_per_page() {
        let r = reader(3);
        let selection = page_range::parse("1,3", 3, false).expect("selection");
        let once = r.rotate(&selection, 90).expect("rotate");
        let twice = PdfReader::from_bytes(&once)
            .expect("reload")
            .rotate(&PageSelection::all(3).expect("all"), 270)
            .expect("rotate");

        let result = PdfReader::from_bytes(&twice).expect("reload");
        assert_eq!(result.page_rotation(0), Some(0));
        assert_eq!(result.page_rotation(1), Some(270));
        assert_eq!(result.page_rotation(2), Some(0));
    }

    #[test]
    fn rotation_rejects_odd_angles() {
        let r = reader(1);
        let err = r.rotate(&PageSelection::all(1).expect("all"), 45).err().expect("error");
        assert!(matches!(err, BlattwerkError::Validation(ValidationError::Parameter { .. })));
    }
}
