// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module: reading, page-tree edits, overlays, cropping, encryption, and
// creating PDFs from images.

pub mod crop;
pub mod pages;
pub mod reader;
pub mod security;
pub mod stamp;
pub mod writer;

use blattwerk_core::types::UnitReport;

pub use crop::CropSpec;
pub use reader::PdfReader;
pub use stamp::{NumberFont, NumberLayout, Signature, WatermarkStyle};
pub use writer::PdfWriter;

/// A rewritten document plus what happened to each page or input.
#[derive(Debug, Clone)]
pub struct PageOutput {
    pub bytes: Vec<u8>,
    pub report: UnitReport,
}
