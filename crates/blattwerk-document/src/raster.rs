// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rasterisation: the renderer seam, the optional pdfium backend, and the
// thumbnail, rotation-preview, and page-image operations built on top of it.

use blattwerk_core::error::Result;
use image::{DynamicImage, Rgba};
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::image::ImageProcessor;
use crate::layout::PageSelection;
use crate::layout::geometry::compose_rotation;

/// PDF points per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// Renders PDF pages to bitmaps.
pub trait PageRasterizer: Send + Sync {
    /// Short backend name for logs and system reports.
    fn name(&self) -> &'static str;

    /// Render the zero-based `pages` of `pdf`, in the order given, at
    /// `scale` device pixels per PDF point.
    fn render(&self, pdf: &[u8], pages: &[usize], scale: f32) -> Result<Vec<DynamicImage>>;
}

/// One page preview, ready to embed in a web page.
#[derive(Debug, Clone, Serialize)]
pub struct Thumbnail {
    /// 1-based page number.
    pub page_num: usize,
    pub thumbnail: String,
    pub width: u32,
    pub height: u32,
}

/// Render every page at `scale` and encode each as a JPEG data URI.
#[instrument(skip(rasterizer, pdf), fields(backend = rasterizer.name(), page_count))]
pub fn thumbnails(
    rasterizer: &dyn PageRasterizer,
    pdf: &[u8],
    page_count: usize,
    scale: f32,
    quality: u8,
) -> Result<Vec<Thumbnail>> {
    let pages: Vec<usize> = (0..page_count).collect();
    let rendered = rasterizer.render(pdf, &pages, scale)?;

    let thumbs = rendered
        .into_iter()
        .zip(pages)
        .map(|(image, index)| thumbnail_of(index, ImageProcessor::from_dynamic(image), quality))
        .collect::<Result<Vec<_>>>()?;
    debug!(thumbnails = thumbs.len(), "Thumbnails rendered");
    Ok(thumbs)
}

fn thumbnail_of(index: usize, processor: ImageProcessor, quality: u8) -> Result<Thumbnail> {
    Ok(Thumbnail {
        page_num: index + 1,
        width: processor.width(),
        height: processor.height(),
        thumbnail: processor.to_jpeg_data_uri(quality)?,
    })
}

/// Side of the marker square on turned pages, in pixels.
pub const ROTATION_BADGE_PX: u32 = 50;
const ROTATION_BADGE: Rgba<u8> = Rgba([255, 100, 0, 255]);

/// A thumbnail from [`rotation_preview`].
#[derive(Debug, Clone, Serialize)]
pub struct RotatedThumbnail {
    #[serde(flatten)]
    pub thumbnail: Thumbnail,
    /// Whether the page is one of those being turned.
    pub is_rotated: bool,
}

/// Thumbnails of every page as they would look after turning the
/// `selection` clockwise by `angle` degrees. Turned pages carry an orange
/// badge in their top-right corner. Nothing is written back to `pdf`.
#[instrument(skip(rasterizer, pdf, selection), fields(backend = rasterizer.name(), pages = selection.len(), angle))]
pub fn rotation_preview(
    rasterizer: &dyn PageRasterizer,
    pdf: &[u8],
    page_count: usize,
    selection: &PageSelection,
    angle: i64,
    scale: f32,
    quality: u8,
) -> Result<Vec<RotatedThumbnail>> {
    let turn = compose_rotation(0, angle);
    let pages: Vec<usize> = (0..page_count).collect();
    let rendered = rasterizer.render(pdf, &pages, scale)?;

    let previews = rendered
        .into_iter()
        .zip(pages)
        .map(|(image, index)| {
            let is_rotated = selection.contains(index);
            let mut processor = ImageProcessor::from_dynamic(image);
            if is_rotated {
                // rotate_expand turns counter-clockwise
                processor = processor
                    .rotate_expand(-(turn as f32))
                    .with_corner_badge(ROTATION_BADGE_PX, ROTATION_BADGE);
            }
            Ok(RotatedThumbnail {
                thumbnail: thumbnail_of(index, processor, quality)?,
                is_rotated,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    debug!(previews = previews.len(), turn, "Rotation preview rendered");
    Ok(previews)
}

/// A rendered page as JPEG bytes.
#[derive(Debug, Clone)]
pub struct PageImage {
    /// 1-based page number.
    pub page_num: usize,
    pub jpeg: Vec<u8>,
}

/// Render the selected pages at `dpi` and encode them as JPEG.
#[instrument(skip(rasterizer, pdf, selection), fields(backend = rasterizer.name(), pages = selection.len(), dpi, quality))]
pub fn page_images(
    rasterizer: &dyn PageRasterizer,
    pdf: &[u8],
    selection: &PageSelection,
    dpi: f32,
    quality: u8,
) -> Result<Vec<PageImage>> {
    let rendered = rasterizer.render(pdf, selection.indices(), dpi / POINTS_PER_INCH)?;
    let images = rendered
        .into_iter()
        .zip(selection.iter())
        .map(|(image, index)| {
            Ok(PageImage {
                page_num: index + 1,
                jpeg: ImageProcessor::from_dynamic(image).to_jpeg_bytes(quality)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    info!(images = images.len(), "Pages exported as images");
    Ok(images)
}

// ---------------------------------------------------------------------------
// pdfium backend
// ---------------------------------------------------------------------------

#[cfg(feature = "pdfium")]
pub use self::pdfium_backend::PdfiumRasterizer;

#[cfg(feature = "pdfium")]
mod pdfium_backend {
    use blattwerk_core::error::{BlattwerkError, Result};
    use image::DynamicImage;
    use pdfium_render::prelude::*;
    use tracing::{debug, info};

    use super::PageRasterizer;

    /// Rasterizer backed by the pdfium shared library.
    pub struct PdfiumRasterizer {
        pdfium: Pdfium,
    }

    impl PdfiumRasterizer {
        /// Bind pdfium from the working directory, then from the system
        /// library path.
        pub fn new() -> Result<Self> {
            let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library())
                .map_err(|err| BlattwerkError::ToolUnavailable(format!("pdfium library not found: {}", err)))?;
            info!("pdfium bound");
            Ok(Self {
                pdfium: Pdfium::new(bindings),
            })
        }
    }

    impl PageRasterizer for PdfiumRasterizer {
        fn name(&self) -> &'static str {
            "pdfium"
        }

        fn render(&self, pdf: &[u8], pages: &[usize], scale: f32) -> Result<Vec<DynamicImage>> {
            let document = self
                .pdfium
                .load_pdf_from_byte_slice(pdf, None)
                .map_err(|err| BlattwerkError::CorruptInput(format!("pdfium could not open document: {}", err)))?;

            let all: Vec<PdfPage> = document.pages().iter().collect();
            let mut images = Vec::with_capacity(pages.len());
            for &index in pages {
                let page = all.get(index).ok_or_else(|| {
                    BlattwerkError::PdfError(format!("page {} not found for rendering", index + 1))
                })?;
                let pixel_width = ((page.width().value * scale).round() as i32).max(1);
                let pixel_height = ((page.height().value * scale).round() as i32).max(1);
                let bitmap = page
                    .render_with_config(
                        &PdfRenderConfig::new()
                            .set_target_width(pixel_width)
                            .set_target_height(pixel_height)
                            .render_form_data(true)
                            .render_annotations(true),
                    )
                    .map_err(|err| BlattwerkError::PdfError(format!("failed to render page {}: {}", index + 1, err)))?;
                debug!(page = index + 1, pixel_width, pixel_height, "Page rendered");
                images.push(bitmap.as_image());
            }
            Ok(images)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::BlankRasterizer;
    use crate::layout::page_range;

    #[test]
    fn thumbnails_are_numbered_and_scaled() {
        let raster = BlankRasterizer::new(600.0, 800.0);
        let thumbs = thumbnails(&raster, b"", 3, 0.3, 70).expect("thumbnails");
        assert_eq!(thumbs.len(), 3);
        assert_eq!(thumbs[2].page_num, 3);
        assert_eq!((thumbs[0].width, thumbs[0].height), (180, 240));
        assert!(thumbs[0].thumbnail.starts_with("data:image/jpeg;base64,"));
    }

    fn decode_uri(uri: &str) -> image::RgbImage {
        let bytes = base64::Engine::decode(
            &base64::engine::general_purpose::STANDARD,
            uri.trim_start_matches("data:image/jpeg;base64,"),
        )
        .expect("base64");
        image::load_from_memory(&bytes).expect("jpeg").to_rgb8()
    }

    #[test]
    fn rotation_preview_turns_and_marks_selected_pages() {
        let raster = BlankRasterizer::new(600.0, 800.0);
        let selection = page_range::parse("2", 3, false).expect("selection");
        let previews = rotation_preview(&raster, b"", 3, &selection, -270, 0.3, 70).expect("preview");

        let flags: Vec<bool> = previews.iter().map(|p| p.is_rotated).collect();
        assert_eq!(flags, vec![false, true, false]);
        let size = |i: usize| (previews[i].thumbnail.width, previews[i].thumbnail.height);
        assert_eq!(size(0), (180, 240));
        assert_eq!(size(1), (240, 180));

        let turned = decode_uri(&previews[1].thumbnail.thumbnail);
        let corner = turned.get_pixel(230, 10).0;
        assert!(corner[0] > 200 && corner[1] < 160 && corner[2] < 80, "{corner:?}");
        assert!(turned.get_pixel(100, 100).0.iter().all(|&c| c > 230));
        assert!(decode_uri(&previews[0].thumbnail.thumbnail).get_pixel(170, 10).0.iter().all(|&c| c > 230));
    }

    #[test]
    fn half_turn_preview_keeps_dimensions() {
        let raster = BlankRasterizer::new(600.0, 800.0);
        let selection = page_range::parse("1", 1, false).expect("selection");
        let previews = rotation_preview(&raster, b"", 1, &selection, 180, 0.3, 70).expect("preview");
        assert!(previews[0].is_rotated);
        assert_eq!((previews[0].thumbnail.width, previews[0].thumbnail.height), (180, 240));
        let json = serde_json::to_value(&previews[0]).expect("json");
        assert_eq!(json["page_num"], 1);
        assert_eq!(json["is_rotated"], true);
    }

    #[test]
    fn page_images_follow_selection_at_dpi() {
        let raster = BlankRasterizer::new(72.0, 144.0);
        let selection = page_range::parse("2-3", 4, false).expect("selection");
        let images = page_images(&raster, b"", &selection, 300.0, 60).expect("images");
        assert_eq!(images.iter().map(|i| i.page_num).collect::<Vec<_>>(), vec![2, 3]);
        let decoded = image::load_from_memory(&images[0].jpeg).expect("jpeg");
        assert_eq!((decoded.width(), decoded.height()), (300, 600));
    }
}
