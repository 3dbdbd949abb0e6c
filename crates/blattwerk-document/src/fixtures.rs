// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-process test documents. Compiled for unit tests and, through the
// `fixtures` feature, for the test suites of dependent crates.

use image::{DynamicImage, RgbImage, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, Stream};

/// A `page_count` page document whose pages read "Page 1", "Page 2", ...
///
/// MediaBox and Resources live on the /Pages node so the pages inherit
/// them, which is what most real-world producers do.
pub fn document(page_count: usize, width: f32, height: f32) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let resources_id = doc.add_object(Dictionary::from_iter([(
        "Font",
        Object::Dictionary(Dictionary::from_iter([("F1", Object::Reference(font_id))])),
    )]));

    let mut kids = Vec::with_capacity(page_count);
    for number in 1..=page_count {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![72.into(), 72.into()]),
                Operation::new("Tj", vec![Object::string_literal(format!("Page {number}"))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content.encode().expect("fixture content encodes"),
        ));
        let page_id = doc.add_object(Dictionary::from_iter([
            ("Type", Object::Name(b"Page".to_vec())),
            ("Parent", Object::Reference(pages_id)),
            ("Contents", Object::Reference(content_id)),
        ]));
        kids.push(Object::Reference(page_id));
    }

    let pages = Dictionary::from_iter([
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(page_count as i64)),
        ("Resources", Object::Reference(resources_id)),
        (
            "MediaBox",
            Object::Array(vec![0.into(), 0.into(), Object::Real(width), Object::Real(height)]),
        ),
    ]);
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]));
    doc.trailer.set("Root", Object::Reference(catalog_id));
    doc
}

/// [`document`] serialised to bytes.
pub fn pdf_bytes(page_count: usize, width: f32, height: f32) -> Vec<u8> {
    let mut doc = document(page_count, width, height);
    let mut out = Vec::new();
    doc.save_to(&mut out).expect("fixture document saves");
    out
}

/// A one-page document holding a single uncompressed DeviceRGB image of
/// `width` x `height` pixels with a smooth gradient.
pub fn image_pdf(width: u32, height: u32) -> Vec<u8> {
    let mut doc = document(1, 612.0, 792.0);
    let page_id = doc.get_pages().into_values().next().expect("fixture page");

    let pixels = gradient(width, height).into_raw();
    let image_id = doc.add_object(Stream::new(
        Dictionary::from_iter([
            ("Type", Object::Name(b"XObject".to_vec())),
            ("Subtype", Object::Name(b"Image".to_vec())),
            ("Width", Object::Integer(i64::from(width))),
            ("Height", Object::Integer(i64::from(height))),
            ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
            ("BitsPerComponent", Object::Integer(8)),
        ]),
        pixels,
    ).with_compression(false));

    let resources = Dictionary::from_iter([(
        "XObject",
        Object::Dictionary(Dictionary::from_iter([("Im1", Object::Reference(image_id))])),
    )]);
    let draw = Stream::new(Dictionary::new(), b"q 400 0 0 400 100 200 cm /Im1 Do Q".to_vec());
    let draw_id = doc.add_object(draw);
    let page = doc.get_dictionary_mut(page_id).expect("fixture page dictionary");
    page.set("Resources", Object::Dictionary(resources));
    page.set("Contents", Object::Reference(draw_id));

    let mut out = Vec::new();
    doc.save_to(&mut out).expect("fixture document saves");
    out
}

/// Smooth RGB gradient; compresses well as JPEG.
pub fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    })
}

/// PNG bytes of a half-transparent gradient.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let rgba = RgbaImage::from_fn(width, height, |x, y| image::Rgba([(x % 256) as u8, (y % 256) as u8, 90, 128]));
    let mut out = Vec::new();
    DynamicImage::ImageRgba8(rgba)
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageFormat::Png)
        .expect("fixture png encodes");
    out
}

/// The first text-showing string on each page, in page order.
pub fn page_labels(doc: &Document) -> Vec<String> {
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let bytes = doc.get_page_content(page_id).unwrap_or_default();
            Content::decode(&bytes)
                .ok()
                .and_then(|content| {
                    content
                        .operations
                        .into_iter()
                        .find(|op| op.operator == "Tj")
                        .and_then(|op| op.operands.first().and_then(|o| o.as_str().ok()).map(<[u8]>::to_vec))
                })
                .map(|raw| String::from_utf8_lossy(&raw).into_owned())
                .unwrap_or_default()
        })
        .collect()
}

/// [`page_labels`] for serialised bytes.
pub fn labels_of(bytes: &[u8]) -> Vec<String> {
    let doc = Document::load_mem(bytes).expect("fixture output parses");
    page_labels(&doc)
}

/// Rasterizer that ignores the document and renders white pages of a fixed
/// point size.
pub struct BlankRasterizer {
    width_pt: f32,
    height_pt: f32,
}

impl BlankRasterizer {
    pub fn new(width_pt: f32, height_pt: f32) -> Self {
        Self { width_pt, height_pt }
    }
}

impl crate::raster::PageRasterizer for BlankRasterizer {
    fn name(&self) -> &'static str {
        "blank"
    }

    fn render(&self, _pdf: &[u8], pages: &[usize], scale: f32) -> blattwerk_core::error::Result<Vec<DynamicImage>> {
        let width = (self.width_pt * scale).round().max(1.0) as u32;
        let height = (self.height_pt * scale).round().max(1.0) as u32;
        Ok(pages
            .iter()
            .map(|_| DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]))))
            .collect())
    }
}
