// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-document: page-level PDF and image work for Blattwerk.
//
// Provides page selection and placement geometry, PDF operations (split,
// merge, reorder, rotate, crop, watermark, page numbers, protect, unlock),
// compression, image-to-PDF, page rendering, and the external office and
// PDF/A converters.

pub mod compress;
pub mod external;
pub mod image;
pub mod layout;
pub mod pdf;
pub mod raster;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

// Re-export the primary types so callers can use `blattwerk_document::PdfReader` etc.
pub use compress::{CompressionOutcome, CompressionTier};
pub use image::processor::ImageProcessor;
pub use layout::PageSelection;
pub use pdf::reader::PdfReader;
pub use pdf::writer::PdfWriter;
pub use raster::{PageRasterizer, RotatedThumbnail, Thumbnail};

#[cfg(feature = "pdfium")]
pub use raster::PdfiumRasterizer;
