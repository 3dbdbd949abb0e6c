// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF compression: JPEG re-encoding of embedded images followed by stream
// deflation, with a stream-only fallback and a never-grow guarantee.

use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::types::UnitReport;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::compress::policy::{CompressionPath, CompressionProfile, SizeReport, Verdict, judge};
use crate::image::ImageProcessor;
use crate::pdf::pages;

/// Result of compressing one document.
#[derive(Debug, Clone, Serialize)]
pub struct CompressionOutcome {
    /// Bytes to hand back: the candidate when accepted, the input otherwise.
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub path: CompressionPath,
    pub verdict: Verdict,
    pub sizes: SizeReport,
    /// One entry per image XObject examined.
    pub images: UnitReport,
}

/// Compress `input` according to `profile`.
///
/// The image pass re-encodes every supported image as JPEG, then deflates
/// all streams. If that pass fails outright, streams are deflated alone.
/// Whatever candidate results is kept only when strictly smaller than the
/// input.
#[instrument(skip_all, fields(input_len = input.len(), tier = ?profile.tier))]
pub fn compress_pdf(input: &[u8], profile: &CompressionProfile) -> Result<CompressionOutcome> {
    let original = Document::load_mem(input)
        .map_err(|err| BlattwerkError::CorruptInput(format!("failed to load PDF: {}", err)))?;

    let mut images = UnitReport::new();
    let (candidate, path) = match image_pass(original.clone(), profile, &mut images) {
        Ok(bytes) => (Some(bytes), CompressionPath::ImageReencode),
        Err(err) => {
            warn!(%err, "image re-encoding failed, falling back to stream compression");
            match stream_pass(original) {
                Ok(bytes) => (Some(bytes), CompressionPath::StreamOnly),
                Err(err) => {
                    warn!(%err, "stream compression failed too, keeping original");
                    (None, CompressionPath::StreamOnly)
                }
            }
        }
    };

    let (bytes, verdict) = match candidate {
        Some(candidate) => match judge(input.len(), candidate.len()) {
            Verdict::AcceptCandidate => (candidate, Verdict::AcceptCandidate),
            Verdict::KeepOriginal => (input.to_vec(), Verdict::KeepOriginal),
        },
        None => (input.to_vec(), Verdict::KeepOriginal),
    };

    let sizes = SizeReport::new(input.len() as u64, bytes.len() as u64);
    info!(
        input_size = sizes.input_size,
        output_size = sizes.output_size,
        ratio = sizes.ratio,
        ?path,
        ?verdict,
        "Compression finished"
    );
    Ok(CompressionOutcome {
        bytes,
        path,
        verdict,
        sizes,
        images,
    })
}

fn image_pass(mut doc: Document, profile: &CompressionProfile, report: &mut UnitReport) -> Result<Vec<u8>> {
    let image_ids: Vec<ObjectId> = doc
        .objects
        .iter()
        .filter(|(_, obj)| is_image(obj))
        .map(|(&id, _)| id)
        .collect();
    debug!(images = image_ids.len(), "Image XObjects found");

    for id in image_ids {
        let unit = format!("image {} {}", id.0, id.1);
        let Some(Object::Stream(stream)) = doc.objects.get(&id) else {
            continue;
        };
        match recompress_image(stream, profile) {
            Ok(Reencoded::Replaced(new_stream)) => {
                doc.objects.insert(id, Object::Stream(new_stream));
                report.done(unit);
            }
            Ok(Reencoded::Unchanged(reason)) => {
                debug!(%unit, reason, "Image left as is");
                report.skipped(unit, reason);
            }
            Err(err) => {
                warn!(%unit, %err, "Image could not be recompressed");
                report.failed(unit, err.to_string());
            }
        }
    }

    stream_pass(doc)
}

fn stream_pass(mut doc: Document) -> Result<Vec<u8>> {
    doc.prune_objects();
    doc.compress();
    pages::save_to_bytes(&mut doc)
}

fn is_image(object: &Object) -> bool {
    matches!(object, Object::Stream(stream)
        if stream.dict.get(b"Subtype").and_then(Object::as_name).map(|n| n == b"Image").unwrap_or(false))
}

enum Reencoded {
    Replaced(Stream),
    Unchanged(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Raw,
    Flate,
    Jpeg,
}

fn recompress_image(stream: &Stream, profile: &CompressionProfile) -> Result<Reencoded> {
    let dict = &stream.dict;
    if dict.get(b"ImageMask").and_then(Object::as_bool).unwrap_or(false) {
        return Ok(Reencoded::Unchanged("stencil mask"));
    }
    if dict.has(b"Decode") {
        return Ok(Reencoded::Unchanged("custom decode array"));
    }
    let Some(encoding) = encoding_of(dict) else {
        return Ok(Reencoded::Unchanged("unsupported filter"));
    };
    let Some(components) = components_of(dict) else {
        return Ok(Reencoded::Unchanged("unsupported colour space"));
    };
    let (Some(width), Some(height)) = (dimension(dict, b"Width"), dimension(dict, b"Height")) else {
        return Ok(Reencoded::Unchanged("missing or invalid dimensions"));
    };

    let decoded = match encoding {
        Encoding::Jpeg => {
            if components == 4 {
                return Ok(Reencoded::Unchanged("CMYK JPEG"));
            }
            image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
                .map_err(|err| BlattwerkError::ImageError(format!("JPEG decode failed: {}", err)))?
        }
        Encoding::Raw | Encoding::Flate => {
            let bits = dict.get(b"BitsPerComponent").and_then(Object::as_i64).unwrap_or(8);
            if bits != 8 {
                return Ok(Reencoded::Unchanged("not 8 bits per component"));
            }
            let data = if encoding == Encoding::Flate {
                stream
                    .decompressed_content()
                    .map_err(|err| BlattwerkError::PdfError(format!("inflate failed: {}", err)))?
            } else {
                stream.content.clone()
            };
            match raw_to_image(data, width, height, components) {
                Some(img) => img,
                None => return Ok(Reencoded::Unchanged("sample data does not match dimensions")),
            }
        }
    };

    let plan = profile.plan_image(decoded.width(), decoded.height());
    let mut processor = ImageProcessor::from_dynamic(decoded);
    if let Some((w, h)) = plan.resize_to {
        processor = processor.resize_exact(w, h);
    }
    let gray = components == 1;
    let jpeg = encode_jpeg(processor.as_dynamic(), gray, plan.quality)?;

    if jpeg.len() >= stream.content.len() {
        return Ok(Reencoded::Unchanged("re-encoding would not shrink it"));
    }

    let mut new_dict = dict.clone();
    new_dict.remove(b"DecodeParms");
    new_dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    new_dict.set("Width", Object::Integer(i64::from(processor.width())));
    new_dict.set("Height", Object::Integer(i64::from(processor.height())));
    new_dict.set("BitsPerComponent", Object::Integer(8));
    new_dict.set(
        "ColorSpace",
        Object::Name(if gray { b"DeviceGray".to_vec() } else { b"DeviceRGB".to_vec() }),
    );
    Ok(Reencoded::Replaced(Stream::new(new_dict, jpeg).with_compression(false)))
}

fn encoding_of(dict: &Dictionary) -> Option<Encoding> {
    let filter = match dict.get(b"Filter") {
        Err(_) => return Some(Encoding::Raw),
        Ok(Object::Name(name)) => name.clone(),
        Ok(Object::Array(items)) if items.is_empty() => return Some(Encoding::Raw),
        Ok(Object::Array(items)) if items.len() == 1 => items[0].as_name().ok()?.to_vec(),
        Ok(_) => return None,
    };
    match filter.as_slice() {
        b"FlateDecode" => Some(Encoding::Flate),
        b"DCTDecode" => Some(Encoding::Jpeg),
        _ => None,
    }
}

/// A positive `/Width` or `/Height` that fits in `u32`.
fn dimension(dict: &Dictionary, key: &[u8]) -> Option<u32> {
    let value = dict.get(key).and_then(Object::as_i64).ok()?;
    u32::try_from(value).ok().filter(|&v| v > 0)
}

/// Colour components per sample for the colour spaces handled here.
fn components_of(dict: &Dictionary) -> Option<u8> {
    match dict.get(b"ColorSpace").ok()? {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" => Some(1),
            b"DeviceRGB" => Some(3),
            b"DeviceCMYK" => Some(4),
            _ => None,
        },
        // Indirect and ICC-based spaces would need the document to resolve.
        _ => None,
    }
}

fn raw_to_image(data: Vec<u8>, width: u32, height: u32, components: u8) -> Option<DynamicImage> {
    let pixels = (width as usize).checked_mul(height as usize)?;
    if data.len() < pixels.checked_mul(components as usize)? {
        return None;
    }
    match components {
        1 => GrayImage::from_raw(width, height, data[..pixels].to_vec()).map(DynamicImage::ImageLuma8),
        3 => RgbImage::from_raw(width, height, data[..pixels * 3].to_vec()).map(DynamicImage::ImageRgb8),
        4 => {
            let rgb: Vec<u8> = data[..pixels * 4]
                .chunks_exact(4)
                .flat_map(|cmyk| {
                    let k = 255 - u16::from(cmyk[3]);
                    let channel = |v: u8| ((255 - u16::from(v)) * k / 255) as u8;
                    [channel(cmyk[0]), channel(cmyk[1]), channel(cmyk[2])]
                })
                .collect();
            RgbImage::from_raw(width, height, rgb).map(DynamicImage::ImageRgb8)
        }
        _ => None,
    }
}

fn encode_jpeg(image: &DynamicImage, gray: bool, quality: u8) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    let result = if gray {
        image.to_luma8().write_with_encoder(encoder)
    } else {
        image.to_rgb8().write_with_encoder(encoder)
    };
    result.map_err(|err| BlattwerkError::ImageError(format!("JPEG encoding failed: {}", err)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::policy::{CompressionTier, select};
    use crate::fixtures;

    #[test]
    fn raw_images_are_reencoded_and_output_shrinks() {
        let input = fixtures::image_pdf(300, 200);
        let outcome = compress_pdf(&input, &select(CompressionTier::Medium)).expect("compress");

        assert_eq!(outcome.path, CompressionPath::ImageReencode);
        assert_eq!(outcome.verdict, Verdict::AcceptCandidate);
        assert_eq!(outcome.images.done_count(), 1);
        assert!(outcome.bytes.len() < input.len());
        assert!(outcome.sizes.ratio > 0.0);

        let doc = Document::load_mem(&outcome.bytes).expect("reload");
        let jpeg = doc
            .objects
            .values()
            .find(|obj| is_image(obj))
            .and_then(|obj| obj.as_stream().ok())
            .expect("image survives");
        assert_eq!(jpeg.dict.get(b"Filter").and_then(Object::as_name).expect("filter"), b"DCTDecode");
    }

    #[test]
    fn oversized_images_are_downscaled() {
        let input = fixtures::image_pdf(2400, 100);
        let outcome = compress_pdf(&input, &select(CompressionTier::Low)).expect("compress");
        let doc = Document::load_mem(&outcome.bytes).expect("reload");
        let image = doc
            .objects
            .values()
            .find(|obj| is_image(obj))
            .and_then(|obj| obj.as_stream().ok())
            .expect("image");
        assert_eq!(image.dict.get(b"Width").and_then(Object::as_i64).expect("width"), 2000);
        assert_eq!(image.dict.get(b"Height").and_then(Object::as_i64).expect("height"), 83);
    }

    #[test]
    fn output_never_grows() {
        for tier in [CompressionTier::Low, CompressionTier::Medium, CompressionTier::High] {
            let input = fixtures::pdf_bytes(2, 300.0, 300.0);
            let outcome = compress_pdf(&input, &select(tier)).expect("compress");
            assert!(outcome.bytes.len() <= input.len());
            if outcome.verdict == Verdict::KeepOriginal {
                assert_eq!(outcome.bytes, input);
            }
        }
    }

    #[test]
    fn corrupt_input_is_reported() {
        let err = compress_pdf(b"%PDF-nonsense", &select(CompressionTier::High)).err().expect("error");
        assert!(matches!(err, BlattwerkError::CorruptInput(_)));
    }

    #[test]
    fn unsupported_filters_are_skipped() {
        let dict = Dictionary::from_iter([("Filter", Object::Name(b"JPXDecode".to_vec()))]);
        assert_eq!(encoding_of(&dict), None);
        let chained = Dictionary::from_iter([(
            "Filter",
            Object::Array(vec![Object::Name(b"FlateDecode".to_vec()), Object::Name(b"DCTDecode".to_vec())]),
        )]);
        assert_eq!(encoding_of(&chained), None);
        assert_eq!(encoding_of(&Dictionary::new()), Some(Encoding::Raw));
    }

    #[test]
    fn out_of_range_dimensions_skip_the_image() {
        let image = |width: i64| {
            Stream::new(
                Dictionary::from_iter([
                    ("Type", Object::Name(b"XObject".to_vec())),
                    ("Subtype", Object::Name(b"Image".to_vec())),
                    ("Width", Object::Integer(width)),
                    ("Height", Object::Integer(2)),
                    ("ColorSpace", Object::Name(b"DeviceRGB".to_vec())),
                    ("BitsPerComponent", Object::Integer(8)),
                ]),
                vec![0u8; 12],
            )
        };
        let profile = select(CompressionTier::Medium);
        for width in [i64::from(u32::MAX) + 3, -2, 0] {
            match recompress_image(&image(width), &profile).expect("no error") {
                Reencoded::Unchanged(reason) => assert_eq!(reason, "missing or invalid dimensions"),
                Reencoded::Replaced(_) => panic!("width {width} must not be re-encoded"),
            }
        }
        assert_eq!(raw_to_image(vec![0; 16], u32::MAX, u32::MAX, 4).map(|i| i.width()), None);
    }

    #[test]
    fn cmyk_samples_convert_to_rgb() {
        let img = raw_to_image(vec![0, 0, 0, 0, 0, 255, 255, 0], 2, 1, 4).expect("image");
        let rgb = img.to_rgb8();
        assert_eq!(rgb.get_pixel(0, 0).0, [255, 255, 255]);
        assert_eq!(rgb.get_pixel(1, 0).0, [255, 0, 0]);
    }
}
