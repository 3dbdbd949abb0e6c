// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Overlays drawn on top of existing pages: text and image watermarks,
// page-number labels, and a visible signature on the last page.

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::UnitReport;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::image::ImageProcessor;
use crate::layout::{NumberPosition, NumberingScheme, Position, Rect, geometry};
use crate::pdf::pages;
use crate::pdf::reader::PdfReader;
use crate::pdf::PageOutput;

const WATERMARK_FONT: &str = "FBwWmk";
const WATERMARK_STATE: &str = "GSBwWmk";
const WATERMARK_IMAGE: &str = "ImBwWmk";
const NUMBER_FONT: &str = "FBwNum";
const SIGNATURE_FONT: &str = "FBwSig";
const SIGNATURE_IMAGE: &str = "ImBwSig";

/// Size of the box a signature is fitted into, in points.
pub const SIGNATURE_WIDTH_PT: f64 = 130.0;
pub const SIGNATURE_HEIGHT_PT: f64 = 50.0;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/// Base-14 font used for page numbers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NumberFont {
    #[default]
    Helvetica,
    Times,
    Courier,
}

impl NumberFont {
    /// Unknown names fall back to Helvetica.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "times" | "times-roman" | "times new roman" => Self::Times,
            "courier" | "courier new" => Self::Courier,
            _ => Self::Helvetica,
        }
    }

    pub fn base_font(&self) -> &'static str {
        match self {
            Self::Helvetica => "Helvetica",
            Self::Times => "Times-Roman",
            Self::Courier => "Courier",
        }
    }
}

/// Appearance shared by text and image watermarks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WatermarkStyle {
    /// 0 (invisible) to 100 (opaque).
    pub opacity: u8,
    pub position: Position,
    /// Counter-clockwise rotation in degrees.
    pub rotation: f64,
}

impl Default for WatermarkStyle {
    fn default() -> Self {
        Self {
            opacity: 30,
            position: Position::Center,
            rotation: 45.0,
        }
    }
}

impl WatermarkStyle {
    fn alpha(&self) -> f32 {
        f32::from(self.opacity.min(100)) / 100.0
    }
}

/// Layout of page-number labels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumberLayout {
    pub position: NumberPosition,
    pub margin_mm: f64,
    pub font: NumberFont,
    pub font_size: f64,
}

impl Default for NumberLayout {
    fn default() -> Self {
        Self {
            position: NumberPosition::BottomCenter,
            margin_mm: 15.0,
            font: NumberFont::Helvetica,
            font_size: 12.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Watermarks
// ---------------------------------------------------------------------------

/// Draw `text` on every page, sized to fill each placement rectangle.
#[instrument(skip_all, fields(chars = text.chars().count(), position = ?style.position))]
pub fn watermark_text(reader: &PdfReader, text: &str, style: &WatermarkStyle) -> Result<PageOutput> {
    if text.trim().is_empty() {
        return Err(blattwerk_core::ValidationError::parameter("watermarkText", "text is empty").into());
    }

    let mut doc = reader.document().clone();
    let font_id = doc.add_object(base14_font("Helvetica"));
    let state_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"ExtGState".to_vec())),
        ("ca", Object::Real(style.alpha())),
        ("CA", Object::Real(style.alpha())),
    ]));
    let encoded = win_ansi(text);
    let chars = encoded.len() as f64;

    let mut report = UnitReport::new();
    for (index, page_id) in pages::page_ids(&doc).into_iter().enumerate() {
        let unit = format!("page {}", index + 1);
        let page_box = pages::visible_box(&doc, page_id);
        let rects = geometry::placement(&page_box, style.position, style.position.default_fraction());
        if rects.is_empty() {
            report.skipped(unit, "no room for the watermark");
            continue;
        }

        let mut operations = vec![
            Operation::new("gs", vec![Object::Name(WATERMARK_STATE.as_bytes().to_vec())]),
            Operation::new("g", vec![Object::Real(0.0)]),
        ];
        for rect in &rects {
            operations.extend(text_in_rect(rect, WATERMARK_FONT, &encoded, chars, style.rotation));
        }

        let result = Content { operations }
            .encode()
            .map_err(|err| BlattwerkError::PdfError(format!("failed to encode watermark: {}", err)))
            .and_then(|bytes| {
                pages::add_resource(&mut doc, page_id, "Font", WATERMARK_FONT, Object::Reference(font_id))?;
                pages::add_resource(&mut doc, page_id, "ExtGState", WATERMARK_STATE, Object::Reference(state_id))?;
                pages::append_content(&mut doc, page_id, bytes)
            });
        record(&mut report, unit, result);
    }

    finish(doc, report, "Text watermark applied")
}

/// Stamp an image on every page. The image's alpha is scaled by the
/// opacity and the image is rotated with canvas expansion before it is
/// stretched over each placement rectangle.
#[instrument(skip_all, fields(image_len = image.len(), position = ?style.position))]
pub fn watermark_image(reader: &PdfReader, image: &[u8], style: &WatermarkStyle) -> Result<PageOutput> {
    let prepared = ImageProcessor::from_bytes(image)?
        .with_opacity(style.alpha())
        .rotate_expand(style.rotation as f32);

    let mut doc = reader.document().clone();
    let image_id = embed_rgba(&mut doc, &prepared)?;

    let mut report = UnitReport::new();
    for (index, page_id) in pages::page_ids(&doc).into_iter().enumerate() {
        let unit = format!("page {}", index + 1);
        let page_box = pages::visible_box(&doc, page_id);
        let rects = geometry::placement(&page_box, style.position, style.position.default_fraction());
        if rects.is_empty() {
            report.skipped(unit, "no room for the watermark");
            continue;
        }

        let mut operations = Vec::with_capacity(rects.len() * 4);
        for rect in &rects {
            operations.push(Operation::new("q", vec![]));
            operations.push(Operation::new(
                "cm",
                vec![
                    real(rect.width()),
                    real(0.0),
                    real(0.0),
                    real(rect.height()),
                    real(rect.x0),
                    real(rect.y0),
                ],
            ));
            operations.push(Operation::new("Do", vec![Object::Name(WATERMARK_IMAGE.as_bytes().to_vec())]));
            operations.push(Operation::new("Q", vec![]));
        }

        let result = Content { operations }
            .encode()
            .map_err(|err| BlattwerkError::PdfError(format!("failed to encode watermark: {}", err)))
            .and_then(|bytes| {
                pages::add_resource(&mut doc, page_id, "XObject", WATERMARK_IMAGE, Object::Reference(image_id))?;
                pages::append_content(&mut doc, page_id, bytes)
            });
        record(&mut report, unit, result);
    }

    finish(doc, report, "Image watermark applied")
}

// ---------------------------------------------------------------------------
// Page numbers
// ---------------------------------------------------------------------------

/// Label pages according to `scheme`, placed by `layout`.
#[instrument(skip_all, fields(style = ?scheme.style, start = scheme.starting_number))]
pub fn page_numbers(reader: &PdfReader, scheme: &NumberingScheme, layout: &NumberLayout) -> Result<PageOutput> {
    let mut doc = reader.document().clone();
    let font_id = doc.add_object(base14_font(layout.font.base_font()));
    let margin_pt = geometry::mm_to_pt(layout.margin_mm);

    let mut report = UnitReport::new();
    for (index, page_id) in pages::page_ids(&doc).into_iter().enumerate() {
        let unit = format!("page {}", index + 1);
        if !scheme.labels(index) {
            report.skipped(unit, "first page excluded");
            continue;
        }

        let label = scheme.format(index);
        let page_box = pages::visible_box(&doc, page_id);
        let width = geometry::estimate_text_width(&label, layout.font_size);
        let (x, y) = geometry::number_anchor(&page_box, layout.position, margin_pt, width, layout.font_size);
        debug!(page = index + 1, %label, x, y, "Placing page number");

        let operations = vec![
            Operation::new("BT", vec![]),
            Operation::new(
                "Tf",
                vec![Object::Name(NUMBER_FONT.as_bytes().to_vec()), real(layout.font_size)],
            ),
            Operation::new("Td", vec![real(x), real(y)]),
            Operation::new("Tj", vec![Object::string_literal(win_ansi(&label))]),
            Operation::new("ET", vec![]),
        ];

        let result = Content { operations }
            .encode()
            .map_err(|err| BlattwerkError::PdfError(format!("failed to encode page number: {}", err)))
            .and_then(|bytes| {
                pages::add_resource(&mut doc, page_id, "Font", NUMBER_FONT, Object::Reference(font_id))?;
                pages::append_content(&mut doc, page_id, bytes)
            });
        record(&mut report, unit, result);
    }

    finish(doc, report, "Page numbers applied")
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// What goes in the signature box.
#[derive(Debug, Clone, Copy)]
pub enum Signature<'a> {
    /// A typed name, set in italics.
    Text(&'a str),
    /// Encoded picture of a hand-drawn signature.
    Image(&'a [u8]),
}

/// Place `signature` in a corner of the last page. `position` must be a
/// corner; anything else means bottom-right.
#[instrument(skip_all, fields(position = ?position))]
pub fn sign(reader: &PdfReader, signature: Signature<'_>, position: Position) -> Result<PageOutput> {
    let corner = match position {
        Position::TopLeft | Position::TopRight | Position::BottomLeft | Position::BottomRight => position,
        Position::Center | Position::Tile => Position::BottomRight,
    };
    if matches!(signature, Signature::Text(name) if name.trim().is_empty()) {
        return Err(blattwerk_core::ValidationError::parameter("signatureName", "name is empty").into());
    }

    let mut doc = reader.document().clone();
    let page_ids = pages::page_ids(&doc);
    let Some(&page_id) = page_ids.last() else {
        return Err(BlattwerkError::PdfError("document has no pages to sign".into()));
    };
    let unit = format!("page {}", page_ids.len());
    let page_box = pages::visible_box(&doc, page_id);
    let slot = geometry::anchored_box(&page_box, corner, SIGNATURE_WIDTH_PT, SIGNATURE_HEIGHT_PT);

    let mut report = UnitReport::new();
    if !(slot.is_valid() && page_box.contains(&slot)) {
        report.skipped(unit, "page too small for the signature box");
        return finish(doc, report, "Nothing signed");
    }
    debug!(x = slot.x0, y = slot.y0, ?corner, "Placing signature");

    let result = match signature {
        Signature::Text(name) => {
            let font_id = doc.add_object(base14_font("Times-Italic"));
            let encoded = win_ansi(name.trim());
            let mut operations = vec![Operation::new("g", vec![Object::Real(0.0)])];
            operations.extend(text_in_rect(&slot, SIGNATURE_FONT, &encoded, encoded.len() as f64, 0.0));
            encode_overlay(operations, "signature").and_then(|bytes| {
                pages::add_resource(&mut doc, page_id, "Font", SIGNATURE_FONT, Object::Reference(font_id))?;
                pages::append_content(&mut doc, page_id, bytes)
            })
        }
        Signature::Image(data) => {
            let picture = ImageProcessor::from_bytes(data)?;
            let fitted = fit_within(&slot, picture.width(), picture.height());
            let image_id = embed_rgba(&mut doc, &picture)?;
            let operations = vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        real(fitted.width()),
                        real(0.0),
                        real(0.0),
                        real(fitted.height()),
                        real(fitted.x0),
                        real(fitted.y0),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(SIGNATURE_IMAGE.as_bytes().to_vec())]),
                Operation::new("Q", vec![]),
            ];
            encode_overlay(operations, "signature").and_then(|bytes| {
                pages::add_resource(&mut doc, page_id, "XObject", SIGNATURE_IMAGE, Object::Reference(image_id))?;
                pages::append_content(&mut doc, page_id, bytes)
            })
        }
    };
    record(&mut report, unit, result);

    finish(doc, report, "Signature applied")
}

/// Largest box with the picture's aspect ratio centred inside `rect`.
fn fit_within(rect: &Rect, width: u32, height: u32) -> Rect {
    let (width, height) = (f64::from(width.max(1)), f64::from(height.max(1)));
    let scale = (rect.width() / width).min(rect.height() / height);
    let (w, h) = (width * scale, height * scale);
    let (cx, cy) = rect.center();
    Rect::from_size(cx - w / 2.0, cy - h / 2.0, w, h)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn encode_overlay(operations: Vec<Operation>, what: &str) -> Result<Vec<u8>> {
    Content { operations }
        .encode()
        .map_err(|err| BlattwerkError::PdfError(format!("failed to encode {}: {}", what, err)))
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

fn base14_font(base_font: &str) -> Dictionary {
    Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(base_font.as_bytes().to_vec())),
        ("Encoding", Object::Name(b"WinAnsiEncoding".to_vec())),
    ])
}

/// Encode for a WinAnsi base-14 font. Characters outside Latin-1 become `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Operations drawing `encoded` rotated by `rotation` degrees and centred
/// in `rect`, with the font size chosen so the rotated text fits.
fn text_in_rect(rect: &Rect, font: &str, encoded: &[u8], chars: f64, rotation: f64) -> Vec<Operation> {
    let radians = rotation.to_radians();
    let (sin, cos) = radians.sin_cos();
    // Text box is (0.5 * size * chars) wide and one size tall.
    let size_for_width = rect.width() / (0.5 * chars * cos.abs() + sin.abs());
    let size_for_height = rect.height() / (0.5 * chars * sin.abs() + cos.abs());
    let font_size = size_for_width.min(size_for_height).max(1.0);

    let (cx, cy) = rect.center();
    let half_width = 0.5 * font_size * chars / 2.0;
    let half_height = font_size * 0.35;

    vec![
        Operation::new("BT", vec![]),
        Operation::new(
            "Tf",
            vec![Object::Name(font.as_bytes().to_vec()), real(font_size)],
        ),
        Operation::new(
            "Tm",
            vec![real(cos), real(sin), real(-sin), real(cos), real(cx), real(cy)],
        ),
        Operation::new("Td", vec![real(-half_width), real(-half_height)]),
        Operation::new("Tj", vec![Object::string_literal(encoded.to_vec())]),
        Operation::new("ET", vec![]),
    ]
}

/// Embed an RGBA image as an RGB XObject with a soft mask.
fn embed_rgba(doc: &mut Document, image: &ImageProcessor) -> Result<ObjectId> {
    let rgba = image.as_dynamic().to_rgba8();
    let (width, height) = rgba.dimensions();
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    let mut alpha = Vec::with_capacity((width * height) as usize);
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }

    let image_dict = |color_space: &[u8]| {
        Dictionary::from_iter([
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(i64::from(width))),
            ("Height", Object::Integer(i64::from(height))),
            ("ColorSpace", Object::Name(color_space.to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
        ])
    };

    let mut mask = Stream::new(image_dict(b"DeviceGray"), alpha);
    mask.compress()
        .map_err(|err| BlattwerkError::PdfError(format!("failed to compress watermark mask: {}", err)))?;
    let mask_id = doc.add_object(mask);

    let mut dict = image_dict(b"DeviceRGB");
    dict.set("SMask", Object::Reference(mask_id));
    let mut stream = Stream::new(dict, rgb);
    stream
        .compress()
        .map_err(|err| BlattwerkError::PdfError(format!("failed to compress watermark image: {}", err)))?;
    Ok(doc.add_object(stream))
}

fn record(report: &mut UnitReport, unit: String, result: Result<()>) {
    match result {
        Ok(()) => report.done(unit),
        Err(err) => {
            warn!(%unit, %err, "overlay failed, page left unchanged");
            report.failed(unit, err.to_string());
        }
    }
}

fn finish(mut doc: Document, report: UnitReport, message: &str) -> Result<PageOutput> {
    info!(
        done = report.done_count(),
        skipped = report.skipped_count(),
        failed = report.failed_count(),
        "{}",
        message
    );
    Ok(PageOutput {
        bytes: pages::save_to_bytes(&mut doc)?,
        report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;
    use crate::layout::NumberStyle;

    fn reader(pages: usize) -> PdfReader {
        PdfReader::from_bytes(&fixtures::pdf_bytes(pages, 600.0, 800.0)).expect("fixture")
    }

    fn page_text(bytes: &[u8], index: usize) -> String {
        let doc = Document::load_mem(bytes).expect("reload");
        let id = pages::page_ids(&doc)[index];
        String::from_utf8_lossy(&doc.get_page_content(id).expect("content")).into_owned()
    }

    #[test]
    fn text_watermark_reaches_every_page() {
        let out = watermark_text(&reader(2), "CONFIDENCIAL", &WatermarkStyle::default()).expect("watermark");
        assert_eq!(out.report.done_count(), 2);
        for index in 0..2 {
            let text = page_text(&out.bytes, index);
            assert!(text.contains("(CONFIDENCIAL) Tj"));
            assert!(text.contains(&format!("/{} gs", WATERMARK_STATE)));
        }
        // Original content survives.
        assert_eq!(fixtures::labels_of(&out.bytes), vec!["Page 1", "Page 2"]);
    }

    #[test]
    fn tiled_watermark_draws_the_whole_grid() {
        let style = WatermarkStyle {
            position: Position::Tile,
            ..WatermarkStyle::default()
        };
        let out = watermark_text(&reader(1), "X", &style).expect("watermark");
        let text = page_text(&out.bytes, 0);
        // 600x800 page, 30% tiles: 4 columns by 4 rows.
        assert_eq!(text.matches("(X) Tj").count(), 16);
    }

    #[test]
    fn empty_text_is_rejected() {
        let err = watermark_text(&reader(1), "  ", &WatermarkStyle::default()).err().expect("error");
        assert!(matches!(err, BlattwerkError::Validation(_)));
    }

    #[test]
    fn image_watermark_embeds_masked_xobject() {
        let logo = fixtures::png_bytes(40, 20);
        let out = watermark_image(&reader(1), &logo, &WatermarkStyle::default()).expect("watermark");
        assert!(out.report.is_clean());

        let text = page_text(&out.bytes, 0);
        assert!(text.contains(&format!("/{} Do", WATERMARK_IMAGE)));
        let doc = Document::load_mem(&out.bytes).expect("reload");
        let has_masked_image = doc.objects.values().any(|obj| {
            obj.as_stream()
                .map(|s| s.dict.has(b"SMask"))
                .unwrap_or(false)
        });
        assert!(has_masked_image);
    }

    #[test]
    fn bad_watermark_image_is_an_image_error() {
        let err = watermark_image(&reader(1), b"nope", &WatermarkStyle::default()).err().expect("error");
        assert!(matches!(err, BlattwerkError::ImageError(_)));
    }

    #[test]
    fn page_numbers_follow_scheme() {
        let scheme = NumberingScheme {
            starting_number: 1,
            exclude_first_page: true,
            style: NumberStyle::OfTotal,
            page_count: 3,
        };
        let out = page_numbers(&reader(3), &scheme, &NumberLayout::default()).expect("numbers");
        assert_eq!(out.report.done_count(), 2);
        assert_eq!(out.report.skipped_count(), 1);
        assert!(!page_text(&out.bytes, 0).contains(" de "));
        assert!(page_text(&out.bytes, 1).contains("(1 de 2) Tj"));
        assert!(page_text(&out.bytes, 2).contains("(2 de 2) Tj"));
    }

    #[test]
    fn typed_signature_lands_on_the_last_page_only() {
        let out = sign(&reader(3), Signature::Text("Ana Ruiz"), Position::BottomRight).expect("sign");
        assert_eq!(out.report.done_count(), 1);
        assert!(!page_text(&out.bytes, 1).contains("(Ana Ruiz) Tj"));
        assert!(page_text(&out.bytes, 2).contains("(Ana Ruiz) Tj"));
        assert!(page_text(&out.bytes, 2).contains(&format!("/{} ", SIGNATURE_FONT)));
        assert_eq!(fixtures::labels_of(&out.bytes), vec!["Page 1", "Page 2", "Page 3"]);

        let err = sign(&reader(1), Signature::Text("   "), Position::TopLeft).err().expect("error");
        assert!(matches!(err, BlattwerkError::Validation(_)));
    }

    fn operands_of(bytes: &[u8], index: usize, operator: &str) -> Vec<f32> {
        let doc = Document::load_mem(bytes).expect("reload");
        let id = pages::page_ids(&doc)[index];
        let content = Content::decode(&doc.get_page_content(id).expect("content")).expect("decode");
        let op = content
            .operations
            .iter()
            .rev()
            .find(|op| op.operator == operator)
            .expect("operator present");
        op.operands.iter().map(|o| o.as_float().expect("number")).collect()
    }

    #[test]
    fn drawn_signature_keeps_its_aspect_in_the_corner() {
        let drawing = fixtures::png_bytes(200, 40);
        let out = sign(&reader(2), Signature::Image(&drawing), Position::TopLeft).expect("sign");
        assert!(out.report.is_clean());
        assert!(page_text(&out.bytes, 1).contains(&format!("/{} Do", SIGNATURE_IMAGE)));
        // 200x40 fits as 130x26, centred in the 130x50 box at (30, 720)
        assert_eq!(operands_of(&out.bytes, 1, "cm"), vec![130.0, 0.0, 0.0, 26.0, 30.0, 732.0]);

        let err = sign(&reader(1), Signature::Image(b"nope"), Position::TopLeft).err().expect("error");
        assert!(matches!(err, BlattwerkError::ImageError(_)));
    }

    #[test]
    fn signature_outside_a_corner_goes_bottom_right() {
        let out = sign(&reader(1), Signature::Text("X"), Position::Center).expect("sign");
        let tm = operands_of(&out.bytes, 0, "Tm");
        // box is 130x50, 30 pt in from the right and bottom edges of 600x800
        assert_eq!((tm[4], tm[5]), (505.0, 55.0));
    }

    #[test]
    fn labels_encode_as_win_ansi() {
        assert_eq!(win_ansi("Página"), b"P\xe1gina".to_vec());
        assert_eq!(win_ansi("€"), b"?".to_vec());
    }

    #[test]
    fn font_names_map_to_base14() {
        assert_eq!(NumberFont::parse("times").base_font(), "Times-Roman");
        assert_eq!(NumberFont::parse("COURIER").base_font(), "Courier");
        assert_eq!(NumberFont::parse("comic").base_font(), "Helvetica");
        // names offered by the upload form
        assert_eq!(NumberFont::parse("Times New Roman").base_font(), "Times-Roman");
        assert_eq!(NumberFont::parse("Courier New").base_font(), "Courier");
        assert_eq!(NumberFont::parse("Arial").base_font(), "Helvetica");
    }
}
