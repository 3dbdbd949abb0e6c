// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-operation options. Every recognised parameter has a field and a
// default; validation happens here, before any document work starts.

use blattwerk_core::ValidationError;
use blattwerk_core::error::Result;
use blattwerk_core::types::PageSize;
use blattwerk_document::compress::CompressionTier;
use blattwerk_document::external::PdfaLevel;
use blattwerk_document::layout::{NumberPosition, NumberStyle, PageSelection, PageSpan, Position, page_range};
use blattwerk_document::pdf::{CropSpec, NumberFont, NumberLayout, WatermarkStyle};
use serde::{Deserialize, Serialize};

/// Default watermark text.
pub const DEFAULT_WATERMARK_TEXT: &str = "CONFIDENCIAL";

/// Default title for PDFs assembled from images.
pub const DEFAULT_IMAGES_TITLE: &str = "Documento PDF";

/// Which pages an operation touches.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageTarget {
    #[default]
    All,
    /// A selection such as `1-3,5`.
    Range(String),
}

impl PageTarget {
    /// `"all"` and the empty string mean every page.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Range(trimmed.to_string())
        }
    }

    /// Resolve against a document. An explicit range that selects nothing
    /// is an error; it never widens to every page.
    pub fn resolve(&self, page_count: usize) -> Result<PageSelection> {
        let selection = match self {
            Self::All => PageSelection::all(page_count)?,
            Self::Range(spec) => page_range::parse(spec, page_count, false)?,
        };
        Ok(selection)
    }
}

// ---------------------------------------------------------------------------
// Split / merge / compress
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum SplitOptions {
    /// One document per page.
    #[default]
    All,
    /// One document per 1-based inclusive range.
    Range { ranges: Vec<PageSpan> },
}

impl SplitOptions {
    /// Parse the `ranges` JSON array (`[{"start":1,"end":2}, ...]`).
    pub fn ranges_from_json(json: &str) -> Result<Self> {
        let ranges: Vec<PageSpan> = serde_json::from_str(json)
            .map_err(|err| ValidationError::malformed("ranges", err.to_string()))?;
        if ranges.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }
        Ok(Self::Range { ranges })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressOptions {
    pub tier: CompressionTier,
}

// ---------------------------------------------------------------------------
// Page geometry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotateOptions {
    /// Clockwise degrees, a multiple of 90.
    pub angle: i64,
    pub pages: PageTarget,
}

impl RotateOptions {
    pub fn validate(&self) -> Result<()> {
        if self.angle % 90 != 0 {
            return Err(ValidationError::parameter("angle", format!("{} is not a multiple of 90", self.angle)).into());
        }
        Ok(())
    }
}

/// Preview of a rotation; nothing is written back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewRotationOptions {
    /// Clockwise degrees, a multiple of 90.
    pub angle: i64,
    pub pages: PageTarget,
}

impl Default for PreviewRotationOptions {
    fn default() -> Self {
        Self {
            angle: 90,
            pages: PageTarget::All,
        }
    }
}

impl PreviewRotationOptions {
    pub fn validate(&self) -> Result<()> {
        RotateOptions {
            angle: self.angle,
            pages: PageTarget::All,
        }
        .validate()
    }

    /// Read the `pagesToRotate` form value: `"all"`, empty, a JSON array of
    /// 1-based page numbers, or a range such as `1-3,5`. An array that does
    /// not parse previews every page.
    pub fn pages_from_form(value: &str) -> PageTarget {
        let trimmed = value.trim();
        if !trimmed.starts_with('[') {
            return PageTarget::parse(trimmed);
        }
        match serde_json::from_str::<Vec<i64>>(trimmed) {
            Ok(pages) if !pages.is_empty() => {
                let list: Vec<String> = pages.iter().map(i64::to_string).collect();
                PageTarget::Range(list.join(","))
            }
            _ => PageTarget::All,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CropOptions {
    pub spec: CropSpec,
    #[serde(default)]
    pub pages: PageTarget,
}

impl CropOptions {
    pub fn validate(&self) -> Result<()> {
        match &self.spec {
            CropSpec::Margins(m) => {
                for (name, value) in [("top", m.top), ("right", m.right), ("bottom", m.bottom), ("left", m.left)] {
                    if !value.is_finite() || value < 0.0 {
                        return Err(ValidationError::parameter(
                            "margins",
                            format!("{name} margin must be a non-negative number"),
                        )
                        .into());
                    }
                }
            }
            CropSpec::Exact(r) => {
                if [r.x, r.y, r.width, r.height].iter().any(|v| !v.is_finite()) {
                    return Err(ValidationError::parameter("cropData", "box values must be numbers").into());
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReorderOptions {
    /// New sequence as 1-based page numbers, each page exactly once.
    pub order: Vec<i64>,
}

impl ReorderOptions {
    /// Parse the `pageOrder` JSON array.
    pub fn from_json(json: &str) -> Result<Self> {
        let order: Vec<i64> =
            serde_json::from_str(json).map_err(|err| ValidationError::malformed("pageOrder", err.to_string()))?;
        Ok(Self { order })
    }
}

// ---------------------------------------------------------------------------
// Overlays
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WatermarkContent {
    Text { text: String },
    /// Image bytes travel separately as an upload.
    Image,
}

impl Default for WatermarkContent {
    fn default() -> Self {
        Self::Text {
            text: DEFAULT_WATERMARK_TEXT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkOptions {
    pub content: WatermarkContent,
    pub opacity: u8,
    pub position: Position,
    pub rotation: f64,
}

impl Default for WatermarkOptions {
    fn default() -> Self {
        let style = WatermarkStyle::default();
        Self {
            content: WatermarkContent::default(),
            opacity: style.opacity,
            position: style.position,
            rotation: style.rotation,
        }
    }
}

impl WatermarkOptions {
    pub fn validate(&self) -> Result<()> {
        if self.opacity > 100 {
            return Err(ValidationError::parameter("opacity", "must be between 0 and 100").into());
        }
        if !self.rotation.is_finite() {
            return Err(ValidationError::parameter("rotation", "must be a number").into());
        }
        Ok(())
    }

    pub fn style(&self) -> WatermarkStyle {
        WatermarkStyle {
            opacity: self.opacity,
            position: self.position,
            rotation: self.rotation,
        }
    }
}

/// What goes in the signature box.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SignatureContent {
    /// A typed name.
    Text { name: String },
    /// A hand-drawn signature; the picture travels separately as an upload.
    Draw,
}

impl Default for SignatureContent {
    fn default() -> Self {
        Self::Text { name: String::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignOptions {
    pub content: SignatureContent,
    /// A corner of the last page. Other positions mean bottom-right.
    pub position: Position,
}

impl Default for SignOptions {
    fn default() -> Self {
        Self {
            content: SignatureContent::default(),
            position: Position::BottomRight,
        }
    }
}

impl SignOptions {
    pub fn validate(&self) -> Result<()> {
        if let SignatureContent::Text { name } = &self.content {
            if name.trim().is_empty() {
                return Err(ValidationError::parameter("signatureName", "a typed signature needs a name").into());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageNumberOptions {
    pub position: NumberPosition,
    pub starting_number: i64,
    pub style: NumberStyle,
    pub margin_mm: f64,
    pub exclude_first_page: bool,
    pub font: NumberFont,
    pub font_size: f64,
}

impl Default for PageNumberOptions {
    fn default() -> Self {
        let layout = NumberLayout::default();
        Self {
            position: layout.position,
            starting_number: 1,
            style: NumberStyle::Arabic,
            margin_mm: layout.margin_mm,
            exclude_first_page: false,
            font: layout.font,
            font_size: layout.font_size,
        }
    }
}

impl PageNumberOptions {
    /// Largest magnitude accepted for `starting_number`.
    pub const STARTING_NUMBER_LIMIT: i64 = 1_000_000_000;

    pub fn validate(&self) -> Result<()> {
        if self.starting_number.unsigned_abs() > Self::STARTING_NUMBER_LIMIT.unsigned_abs() {
            return Err(ValidationError::parameter(
                "startingNumber",
                format!("must be between -{0} and {0}", Self::STARTING_NUMBER_LIMIT),
            )
            .into());
        }
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(ValidationError::parameter("fontSize", "must be a positive number").into());
        }
        if !(self.margin_mm.is_finite() && self.margin_mm >= 0.0) {
            return Err(ValidationError::parameter("margin", "must be a non-negative number").into());
        }
        Ok(())
    }

    pub fn layout(&self) -> NumberLayout {
        NumberLayout {
            position: self.position,
            margin_mm: self.margin_mm,
            font: self.font,
            font_size: self.font_size,
        }
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagesToPdfOptions {
    pub page_size: PageSize,
    pub title: String,
}

impl Default for ImagesToPdfOptions {
    fn default() -> Self {
        Self {
            page_size: PageSize::A4,
            title: DEFAULT_IMAGES_TITLE.to_string(),
        }
    }
}

/// JPEG quality preset for page export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    Low,
    #[default]
    Medium,
    High,
}

impl ImageQuality {
    /// Unrecognised names fall back to medium.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }

    pub fn jpeg_quality(self) -> u8 {
        match self {
            Self::Low => 30,
            Self::Medium => 60,
            Self::High => 90,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfToImagesOptions {
    pub quality: ImageQuality,
    pub pages: PageTarget,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfaOptions {
    pub level: PdfaLevel,
}

#[cfg(test)]
mod tests {
    use super::*;
    use blattwerk_core::BlattwerkError;

    #[test]
    fn page_target_policy() {
        assert_eq!(PageTarget::parse(" ALL "), PageTarget::All);
        assert_eq!(PageTarget::parse(""), PageTarget::All);
        assert_eq!(PageTarget::All.resolve(3).expect("all").indices(), &[0, 1, 2]);
        assert_eq!(PageTarget::parse("2-3").resolve(5).expect("range").indices(), &[1, 2]);

        let err = PageTarget::parse("9-12").resolve(5).err().expect("error");
        assert!(matches!(err, BlattwerkError::Validation(ValidationError::EmptySelection)));
    }

    #[test]
    fn split_ranges_json() {
        let opts = SplitOptions::ranges_from_json(r#"[{"start":1,"end":2},{"start":4,"end":5}]"#).expect("ranges");
        assert_eq!(
            opts,
            SplitOptions::Range {
                ranges: vec![PageSpan { start: 1, end: 2 }, PageSpan { start: 4, end: 5 }]
            }
        );
        assert!(SplitOptions::ranges_from_json("not json").is_err());
        assert!(SplitOptions::ranges_from_json("[]").is_err());
    }

    #[test]
    fn rotation_must_be_quarter_turns() {
        assert!(RotateOptions { angle: 270, pages: PageTarget::All }.validate().is_ok());
        assert!(RotateOptions { angle: 45, pages: PageTarget::All }.validate().is_err());
    }

    #[test]
    fn preview_pages_accept_json_lists() {
        assert_eq!(PreviewRotationOptions::pages_from_form("all"), PageTarget::All);
        assert_eq!(PreviewRotationOptions::pages_from_form(""), PageTarget::All);
        assert_eq!(
            PreviewRotationOptions::pages_from_form("[1, 3]"),
            PageTarget::Range("1,3".into())
        );
        assert_eq!(PreviewRotationOptions::pages_from_form("[1, oops"), PageTarget::All);
        assert_eq!(PreviewRotationOptions::pages_from_form("2-4"), PageTarget::Range("2-4".into()));

        assert_eq!(PreviewRotationOptions::default().angle, 90);
        assert!(PreviewRotationOptions { angle: 45, pages: PageTarget::All }.validate().is_err());
    }

    #[test]
    fn typed_signature_needs_a_name() {
        let opts = SignOptions::default();
        assert_eq!(opts.position, Position::BottomRight);
        assert!(opts.validate().is_err());
        let named = SignOptions {
            content: SignatureContent::Text { name: "Ana".into() },
            ..SignOptions::default()
        };
        assert!(named.validate().is_ok());
        let drawn = SignOptions {
            content: SignatureContent::Draw,
            ..SignOptions::default()
        };
        assert!(drawn.validate().is_ok());
    }

    #[test]
    fn watermark_defaults() {
        let opts = WatermarkOptions::default();
        assert_eq!(
            opts.content,
            WatermarkContent::Text { text: "CONFIDENCIAL".into() }
        );
        assert_eq!(opts.opacity, 30);
        assert_eq!(opts.position, Position::Center);
        assert_eq!(opts.rotation, 45.0);
        assert!(WatermarkOptions { opacity: 101, ..opts }.validate().is_err());
    }

    #[test]
    fn page_number_defaults() {
        let opts = PageNumberOptions::default();
        assert_eq!(opts.position, NumberPosition::BottomCenter);
        assert_eq!(opts.margin_mm, 15.0);
        assert_eq!(opts.font_size, 12.0);
        assert!(PageNumberOptions { font_size: 0.0, ..opts }.validate().is_err());
    }

    #[test]
    fn starting_number_is_bounded() {
        let opts = PageNumberOptions::default();
        let limit = PageNumberOptions::STARTING_NUMBER_LIMIT;
        assert!(PageNumberOptions { starting_number: limit, ..opts }.validate().is_ok());
        assert!(PageNumberOptions { starting_number: -limit, ..opts }.validate().is_ok());
        for starting_number in [limit + 1, i64::MAX, i64::MIN] {
            let err = PageNumberOptions { starting_number, ..opts }.validate().err().expect("rejected");
            assert!(matches!(err, BlattwerkError::Validation(ValidationError::Parameter { .. })));
        }
    }

    #[test]
    fn image_quality_table() {
        assert_eq!(ImageQuality::parse("low").jpeg_quality(), 30);
        assert_eq!(ImageQuality::parse("whatever").jpeg_quality(), 60);
        assert_eq!(ImageQuality::High.jpeg_quality(), 90);
    }

    #[test]
    fn crop_margins_must_be_non_negative() {
        let bad = CropOptions {
            spec: CropSpec::Margins(blattwerk_document::layout::MarginsMm { top: -1.0, ..Default::default() }),
            pages: PageTarget::All,
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn reorder_json() {
        assert_eq!(ReorderOptions::from_json("[3,1,2]").expect("order").order, vec![3, 1, 2]);
        assert!(ReorderOptions::from_json("[1,").is_err());
    }
}
