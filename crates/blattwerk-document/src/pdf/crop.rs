// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page cropping by margins or by an exact relative box.

use blattwerk_core::error::Result;
use blattwerk_core::types::UnitReport;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::layout::{MarginsMm, PageSelection, Rect, RelativeRect, geometry};
use crate::pdf::pages;
use crate::pdf::reader::PdfReader;
use crate::pdf::PageOutput;

/// How the new visible area is described.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum CropSpec {
    /// Remove millimetre margins from each edge.
    Margins(MarginsMm),
    /// Keep a box given as fractions of the page, origin top-left.
    Exact(RelativeRect),
}

impl CropSpec {
    /// The kept area in top-left view space for a page of `width` x `height`.
    pub fn view_rect(&self, width: f64, height: f64) -> Option<Rect> {
        let view = Rect::new(0.0, 0.0, width, height);
        match self {
            Self::Margins(margins) => geometry::margin_rect(&view, margins),
            Self::Exact(rel) => geometry::relative_rect(&view, rel),
        }
    }
}

/// Set a new CropBox on every selected page.
///
/// The box is computed against the page's current visible area, so cropping
/// twice narrows further. Pages whose result would be degenerate are left
/// as they were and reported as skipped.
#[instrument(skip_all, fields(pages = selection.len()))]
pub fn crop(reader: &PdfReader, selection: &PageSelection, spec: &CropSpec) -> Result<PageOutput> {
    let mut doc = reader.document().clone();
    let ids = pages::page_ids(&doc);
    let mut report = UnitReport::new();

    for index in selection.iter() {
        let unit = format!("page {}", index + 1);
        let Some(&page_id) = ids.get(index) else {
            report.skipped(unit, "page not in document");
            continue;
        };

        let current = pages::visible_box(&doc, page_id);
        let Some(view_rect) = spec.view_rect(current.width(), current.height()) else {
            warn!(page = index + 1, "crop would leave no visible area, page left unchanged");
            report.skipped(unit, "crop area is empty");
            continue;
        };

        let pdf_box = geometry::to_pdf_box(&view_rect, &current);
        match doc.get_dictionary_mut(page_id) {
            Ok(page) => {
                page.set("CropBox", pages::rect_object(&pdf_box));
                report.done(unit);
            }
            Err(err) => {
                warn!(page = index + 1, %err, "page dictionary unavailable, crop skipped");
                report.failed(unit, err.to_string());
            }
        }
    }

    info!(
        cropped = report.done_count(),
        skipped = report.skipped_count(),
        failed = report.failed_count(),
        "Crop finished"
    );
    Ok(PageOutput {
        bytes: pages::save_to_bytes(&mut doc)?,
        report,
    })
}
