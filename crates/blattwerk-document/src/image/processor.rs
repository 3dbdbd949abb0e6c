// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor: resize, rotate with canvas expansion, opacity, alpha
// flattening, corner badges, and JPEG/PNG/data-URI output. Operates on in-memory images using
// the `image` and `imageproc` crates.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use blattwerk_core::error::BlattwerkError;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage, imageops};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::geometric_transformations::{self, Interpolation};
use imageproc::rect::Rect as PixelRect;
use tracing::{debug, instrument};

/// Image processing pipeline operating on a single in-memory image.
///
/// Each transformation consumes `self` and returns a new processor, so calls
/// chain:
///
/// ```ignore
/// let stamp = ImageProcessor::from_bytes(&logo)?
///     .with_opacity(0.3)
///     .rotate_expand(45.0)
///     .to_png_bytes()?;
/// ```
pub struct ImageProcessor {
    image: DynamicImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Create a processor from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, BlattwerkError> {
        let img = image::load_from_memory(data)
            .map_err(|err| BlattwerkError::ImageError(format!("failed to decode image: {}", err)))?;
        debug!(width = img.width(), height = img.height(), "Image decoded from bytes");
        Ok(Self { image: img })
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn has_alpha(&self) -> bool {
        self.image.color().has_alpha()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    // -- Transformations ------------------------------------------------------

    /// Resize to exactly `width` x `height` with Lanczos3 filtering.
    pub fn resize_exact(self, width: u32, height: u32) -> Self {
        debug!(
            from_w = self.image.width(),
            from_h = self.image.height(),
            width,
            height,
            "Resizing image"
        );
        Self {
            image: self.image.resize_exact(width, height, imageops::FilterType::Lanczos3),
        }
    }

    /// Scale by `factor` (both dimensions), never below one pixel.
    pub fn scale(self, factor: f32) -> Self {
        let width = ((self.width() as f32 * factor).round() as u32).max(1);
        let height = ((self.height() as f32 * factor).round() as u32).max(1);
        self.resize_exact(width, height)
    }

    /// Rotate counter-clockwise by `degrees`, growing the canvas so no corner
    /// is clipped. New area is transparent.
    #[instrument(skip(self), fields(degrees))]
    pub fn rotate_expand(self, degrees: f32) -> Self {
        let normalised = degrees.rem_euclid(360.0);
        if normalised.abs() < 0.01 || (normalised - 360.0).abs() < 0.01 {
            return self;
        }
        if (normalised - 90.0).abs() < 0.01 {
            return Self {
                image: self.image.rotate270(),
            };
        }
        if (normalised - 180.0).abs() < 0.01 {
            return Self {
                image: self.image.rotate180(),
            };
        }
        if (normalised - 270.0).abs() < 0.01 {
            return Self {
                image: self.image.rotate90(),
            };
        }

        let rgba = self.image.to_rgba8();
        let (w, h) = (rgba.width() as f32, rgba.height() as f32);
        let radians = normalised.to_radians();
        let (sin, cos) = (radians.sin().abs(), radians.cos().abs());
        let bound_w = (w * cos + h * sin).ceil() as u32;
        let bound_h = (w * sin + h * cos).ceil() as u32;

        // Pad to the diagonal so rotation about the centre cannot clip.
        let side = (w.hypot(h)).ceil() as u32;
        let mut canvas = RgbaImage::from_pixel(side, side, Rgba([255, 255, 255, 0]));
        let offset_x = i64::from((side - rgba.width()) / 2);
        let offset_y = i64::from((side - rgba.height()) / 2);
        imageops::overlay(&mut canvas, &rgba, offset_x, offset_y);

        // imageproc rotates clockwise for positive angles.
        let rotated = geometric_transformations::rotate_about_center(
            &canvas,
            -radians,
            Interpolation::Bilinear,
            Rgba([255, 255, 255, 0]),
        );

        let crop_x = side.saturating_sub(bound_w) / 2;
        let crop_y = side.saturating_sub(bound_h) / 2;
        let cropped = imageops::crop_imm(&rotated, crop_x, crop_y, bound_w.min(side), bound_h.min(side)).to_image();

        debug!(bound_w, bound_h, "Rotation with expansion applied");
        Self {
            image: DynamicImage::ImageRgba8(cropped),
        }
    }

    /// Multiply every alpha value by `opacity` (clamped to `[0, 1]`).
    pub fn with_opacity(self, opacity: f32) -> Self {
        let factor = opacity.clamp(0.0, 1.0);
        let mut rgba = self.image.to_rgba8();
        for pixel in rgba.pixels_mut() {
            pixel.0[3] = (f32::from(pixel.0[3]) * factor).round() as u8;
        }
        Self {
            image: DynamicImage::ImageRgba8(rgba),
        }
    }

    /// Fill a `side`-pixel square flush with the top-right corner. The square
    /// shrinks to fit images smaller than `side`.
    pub fn with_corner_badge(self, side: u32, colour: Rgba<u8>) -> Self {
        let mut rgba = self.image.to_rgba8();
        let side = side.min(rgba.width()).min(rgba.height());
        if side == 0 {
            return Self {
                image: DynamicImage::ImageRgba8(rgba),
            };
        }
        let x = i32::try_from(rgba.width() - side).unwrap_or(i32::MAX);
        draw_filled_rect_mut(&mut rgba, PixelRect::at(x, 0).of_size(side, side), colour);
        Self {
            image: DynamicImage::ImageRgba8(rgba),
        }
    }

    /// Composite onto an opaque white background, dropping the alpha channel.
    pub fn flatten_on_white(self) -> Self {
        if !self.has_alpha() {
            return self;
        }
        let rgba = self.image.to_rgba8();
        let mut background = RgbaImage::from_pixel(rgba.width(), rgba.height(), Rgba([255, 255, 255, 255]));
        imageops::overlay(&mut background, &rgba, 0, 0);
        Self {
            image: DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(background).to_rgb8()),
        }
    }

    // -- Output ---------------------------------------------------------------

    pub fn to_png_bytes(&self) -> Result<Vec<u8>, BlattwerkError> {
        encode_to_format(&self.image, ImageFormat::Png)
    }

    /// Encode as JPEG with the given quality (1-100). Alpha is discarded.
    pub fn to_jpeg_bytes(&self, quality: u8) -> Result<Vec<u8>, BlattwerkError> {
        let mut buffer = Vec::new();
        let rgb = self.image.to_rgb8();
        let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
        rgb.write_with_encoder(encoder)
            .map_err(|err| BlattwerkError::ImageError(format!("JPEG encoding failed: {}", err)))?;
        Ok(buffer)
    }

    /// JPEG encoded as a `data:` URI.
    pub fn to_jpeg_data_uri(&self, quality: u8) -> Result<String, BlattwerkError> {
        let bytes = self.to_jpeg_bytes(quality)?;
        Ok(format!("data:image/jpeg;base64,{}", STANDARD.encode(bytes)))
    }
}

/// Encode a `DynamicImage` into the specified format, returning the raw bytes.
fn encode_to_format(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, BlattwerkError> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, format)
        .map_err(|err| BlattwerkError::ImageError(format!("image encoding failed: {}", err)))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    fn solid(width: u32, height: u32) -> ImageProcessor {
        ImageProcessor::from_dynamic(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            width,
            height,
            image::Rgb([200, 30, 30]),
        )))
    }

    #[test]
    fn png_round_trip_keeps_dimensions() {
        let bytes = solid(40, 20).to_png_bytes().expect("png");
        let decoded = ImageProcessor::from_bytes(&bytes).expect("decode");
        assert_eq!((decoded.width(), decoded.height()), (40, 20));
    }

    #[test]
    fn invalid_bytes_are_image_errors() {
        let err = ImageProcessor::from_bytes(b"not an image").err().expect("error");
        assert!(matches!(err, BlattwerkError::ImageError(_)));
    }

    #[test]
    fn lower_jpeg_quality_is_smaller() {
        let mut img = RgbImage::new(128, 128);
        for (x, y, p) in img.enumerate_pixels_mut() {
            *p = image::Rgb([(x * 2) as u8, (y * 2) as u8, ((x ^ y) & 0xff) as u8]);
        }
        let processor = ImageProcessor::from_dynamic(DynamicImage::ImageRgb8(img));
        let high = processor.to_jpeg_bytes(95).expect("jpeg");
        let low = processor.to_jpeg_bytes(20).expect("jpeg");
        assert!(low.len() < high.len());
    }

    #[test]
    fn rotate_expand_grows_canvas() {
        let rotated = solid(100, 10).rotate_expand(45.0);
        assert!(rotated.width() >= 77 && rotated.width() <= 79);
        assert!(rotated.height() >= 77 && rotated.height() <= 79);
        assert!(rotated.has_alpha());
    }

    #[test]
    fn right_angle_rotation_swaps_dimensions() {
        let rotated = solid(30, 10).rotate_expand(90.0);
        assert_eq!((rotated.width(), rotated.height()), (10, 30));
    }

    #[test]
    fn corner_badge_fills_the_top_right_square() {
        let orange = Rgba([255, 100, 0, 255]);
        let badged = solid(80, 60).with_corner_badge(50, orange).as_dynamic().to_rgba8();
        assert_eq!(*badged.get_pixel(30, 0), orange);
        assert_eq!(*badged.get_pixel(79, 49), orange);
        assert_ne!(*badged.get_pixel(29, 0), orange);
        assert_ne!(*badged.get_pixel(79, 50), orange);

        let tiny = solid(20, 10).with_corner_badge(50, orange).as_dynamic().to_rgba8();
        assert_eq!(*tiny.get_pixel(10, 9), orange);
        assert_ne!(*tiny.get_pixel(9, 0), orange);
    }

    #[test]
    fn opacity_scales_alpha() {
        let faded = solid(2, 2).with_opacity(0.3);
        let rgba = faded.as_dynamic().to_rgba8();
        assert_eq!(rgba.get_pixel(0, 0).0[3], 77);
    }

    #[test]
    fn flatten_removes_alpha() {
        let flat = solid(4, 4).with_opacity(0.5).flatten_on_white();
        assert!(!flat.has_alpha());
        let px = flat.as_dynamic().to_rgb8().get_pixel(0, 0).0;
        // Half red over white.
        assert!(px[0] > 200 && px[1] > 130 && px[1] < 150);
    }

    #[test]
    fn data_uri_prefix() {
        let uri = solid(8, 8).to_jpeg_data_uri(70).expect("uri");
        assert!(uri.starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn scale_never_hits_zero() {
        let scaled = solid(3, 3).scale(0.1);
        assert_eq!((scaled.width(), scaled.height()), (1, 1));
    }
}
