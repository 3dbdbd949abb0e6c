// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF writer: build new PDF documents from raster images using `printpdf` 0.8.
//
// printpdf 0.8 uses a data-oriented API: documents are built by constructing
// `PdfPage` structs containing `Vec<Op>` operation lists, then serialised via
// `PdfDocument::save()`.

use blattwerk_core::ValidationError;
use blattwerk_core::error::Result;
use blattwerk_core::types::{PageSize, UnitReport};
use printpdf::{
    Mm, Op, PdfDocument, PdfPage, PdfSaveOptions, PdfWarnMsg, Pt, RawImage, RawImageData, RawImageFormat,
    XObjectTransform,
};
use tracing::{debug, info, instrument, warn};

use crate::image::ImageProcessor;
use crate::pdf::PageOutput;

/// Nominal resolution images are placed at.
const IMAGE_DPI: f32 = 300.0;

/// Blank border kept around each image.
const MARGIN_MM: f32 = 10.0;

/// Creates new PDF documents, one page per image.
pub struct PdfWriter {
    page_size: PageSize,
    /// Title metadata embedded in the PDF /Info dictionary.
    title: String,
}

impl PdfWriter {
    pub fn new(page_size: PageSize) -> Self {
        Self {
            page_size,
            title: "Documento PDF".into(),
        }
    }

    /// Set a title for the PDF metadata.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    /// Page dimensions for an image of `width_px` x `height_px`.
    ///
    /// Fixed sizes come from the page-size table; `Fit` wraps the image at its
    /// nominal resolution plus the margin on every side.
    fn page_dimensions(&self, width_px: u32, height_px: u32) -> (Mm, Mm) {
        match self.page_size.dimensions_mm() {
            Some((w, h)) => (Mm(w), Mm(h)),
            None => (
                Mm(px_to_mm(width_px) + 2.0 * MARGIN_MM),
                Mm(px_to_mm(height_px) + 2.0 * MARGIN_MM),
            ),
        }
    }

    // -- Images to PDF --------------------------------------------------------

    /// Create a PDF with one page per decodable image, in input order.
    ///
    /// Each image is flattened onto white, scaled down to fit inside the
    /// margins without distortion, and centred. Images that fail to decode
    /// are skipped; if none decode the call is a validation error.
    #[instrument(skip(self, images), fields(images = images.len(), page_size = ?self.page_size))]
    pub fn create_from_images(&self, images: &[(&str, &[u8])]) -> Result<PageOutput> {
        if images.is_empty() {
            return Err(ValidationError::MissingInput("images".into()).into());
        }
        info!(title = %self.title, "Creating image PDF");

        let mut doc = PdfDocument::new(&self.title);
        let mut pages: Vec<PdfPage> = Vec::new();
        let mut report = UnitReport::new();

        for (name, bytes) in images {
            let processor = match ImageProcessor::from_bytes(bytes) {
                Ok(processor) => processor.flatten_on_white(),
                Err(err) => {
                    warn!(image = %name, %err, "Skipping undecodable image");
                    report.skipped(*name, err.to_string());
                    continue;
                }
            };

            let img_width = processor.width();
            let img_height = processor.height();
            let rgb_image = processor.into_dynamic().to_rgb8();
            let raw = RawImage {
                pixels: RawImageData::U8(rgb_image.into_raw()),
                width: img_width as usize,
                height: img_height as usize,
                data_format: RawImageFormat::RGB8,
                tag: Vec::new(),
            };
            let xobject_id = doc.add_image(&raw);

            let (page_w, page_h) = self.page_dimensions(img_width, img_height);
            let page_w_pt = page_w.into_pt().0;
            let page_h_pt = page_h.into_pt().0;
            let margin_pt = Mm(MARGIN_MM).into_pt().0;
            let usable_w_pt = page_w_pt - 2.0 * margin_pt;
            let usable_h_pt = page_h_pt - 2.0 * margin_pt;

            let img_w_pt = img_width as f32 / IMAGE_DPI * 72.0;
            let img_h_pt = img_height as f32 / IMAGE_DPI * 72.0;

            // Scale to fit while preserving aspect ratio; do not upscale.
            let scale = (usable_w_pt / img_w_pt).min(usable_h_pt / img_h_pt).min(1.0);
            let rendered_w_pt = img_w_pt * scale;
            let rendered_h_pt = img_h_pt * scale;
            let x_offset = (page_w_pt - rendered_w_pt) / 2.0;
            let y_offset = (page_h_pt - rendered_h_pt) / 2.0;

            let ops = vec![Op::UseXobject {
                id: xobject_id,
                transform: XObjectTransform {
                    translate_x: Some(Pt(x_offset)),
                    translate_y: Some(Pt(y_offset)),
                    scale_x: Some(scale),
                    scale_y: Some(scale),
                    dpi: Some(IMAGE_DPI),
                    rotate: None,
                },
            }];
            pages.push(PdfPage::new(page_w, page_h, ops));
            debug!(image = %name, rendered_w_pt, rendered_h_pt, scale, "Image placed on page");
            report.done(*name);
        }

        if pages.is_empty() {
            return Err(ValidationError::malformed("images", "none of the images could be decoded").into());
        }

        doc.with_pages(pages);
        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
        debug!(warnings = warnings.len(), output_bytes = bytes.len(), "Image PDF serialised");

        Ok(PageOutput { bytes, report })
    }
}

fn px_to_mm(px: u32) -> f32 {
    px as f32 / IMAGE_DPI * 25.4
}
