// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Placement geometry for crop, watermark, and page-number operations.
//
// Two coordinate spaces appear here. Crop requests are authored against a
// top-left origin view of the page (y grows downward), the way a visual
// selection tool reports them. Overlays are placed directly in PDF user
// space (bottom-left origin, y grows upward). `to_pdf_box` is the only bridge
// between the two.

use serde::{Deserialize, Serialize};

/// Points per millimetre.
pub const MM_TO_PT: f64 = 2.83465;

/// Convert millimetres to PDF points.
pub fn mm_to_pt(mm: f64) -> f64 {
    mm * MM_TO_PT
}

// ---------------------------------------------------------------------------
// Rectangles
// ---------------------------------------------------------------------------

/// Absolute rectangle `(x0, y0, x1, y1)`. Valid rectangles satisfy
/// `x0 < x1` and `y0 < y1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Rect {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    pub fn from_size(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::new(x, y, x + width, y + height)
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.x0 + self.x1) / 2.0, (self.y0 + self.y1) / 2.0)
    }

    /// Holds the placement invariant.
    pub fn is_valid(&self) -> bool {
        self.x0 < self.x1 && self.y0 < self.y1
    }

    /// `Some(self)` when valid, `None` for degenerate rectangles.
    pub fn validated(self) -> Option<Self> {
        self.is_valid().then_some(self)
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.x0 >= self.x0 && other.y0 >= self.y0 && other.x1 <= self.x1 && other.y1 <= self.y1
    }
}

// ---------------------------------------------------------------------------
// Crop rectangles (top-left origin)
// ---------------------------------------------------------------------------

/// Margins to remove from each edge, in millimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MarginsMm {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Relative crop box. Every component is a fraction of the page size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelativeRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Default for RelativeRect {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }
}

/// Shrink `page` by the given margins. `None` when nothing would remain.
pub fn margin_rect(page: &Rect, margins: &MarginsMm) -> Option<Rect> {
    Rect::new(
        page.x0 + mm_to_pt(margins.left),
        page.y0 + mm_to_pt(margins.top),
        page.x1 - mm_to_pt(margins.right),
        page.y1 - mm_to_pt(margins.bottom),
    )
    .validated()
}

/// Map a relative rectangle onto `page`.
///
/// Components are clamped to `[0, 1]`, then width and height shrink so the
/// box stays inside the unit square. No rounding happens along the way.
pub fn relative_rect(page: &Rect, rel: &RelativeRect) -> Option<Rect> {
    let x = clamp_unit(rel.x);
    let y = clamp_unit(rel.y);
    let mut width = clamp_unit(rel.width);
    let mut height = clamp_unit(rel.height);
    if x + width > 1.0 {
        width = 1.0 - x;
    }
    if y + height > 1.0 {
        height = 1.0 - y;
    }

    let x0 = page.x0 + x * page.width();
    let y0 = page.y0 + y * page.height();
    Rect::new(x0, y0, x0 + width * page.width(), y0 + height * page.height()).validated()
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

/// Convert a rectangle authored in the top-left view of a page whose PDF
/// box is `page_box` into PDF user space.
pub fn to_pdf_box(view_rect: &Rect, page_box: &Rect) -> Rect {
    Rect::new(
        page_box.x0 + view_rect.x0,
        page_box.y1 - view_rect.y1,
        page_box.x0 + view_rect.x1,
        page_box.y1 - view_rect.y0,
    )
}

// ---------------------------------------------------------------------------
// Overlay placement (PDF user space)
// ---------------------------------------------------------------------------

/// Where a watermark goes on the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    #[default]
    Center,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
    Tile,
}

impl Position {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "center" | "centre" => Some(Self::Center),
            "top-left" => Some(Self::TopLeft),
            "top-right" => Some(Self::TopRight),
            "bottom-left" => Some(Self::BottomLeft),
            "bottom-right" => Some(Self::BottomRight),
            "tile" | "mosaic" => Some(Self::Tile),
            _ => None,
        }
    }

    /// Share of the page width and height a watermark covers by default.
    pub fn default_fraction(&self) -> f64 {
        match self {
            Self::Center => 0.7,
            _ => 0.3,
        }
    }
}

/// Rectangles a watermark occupies on `page`.
///
/// `center` is one box of `size_fraction` of each dimension, centred.
/// Corners are one box offset from both adjacent edges by 5% of the smaller
/// page dimension. `tile` lays a grid of adjacent boxes from the lower-left
/// corner until the page is covered.
pub fn placement(page: &Rect, position: Position, size_fraction: f64) -> Vec<Rect> {
    let width = page.width();
    let height = page.height();
    let box_w = width * size_fraction;
    let box_h = height * size_fraction;

    let rects = match position {
        Position::Tile => {
            if box_w <= 0.0 || box_h <= 0.0 {
                return Vec::new();
            }
            let columns = (width / box_w).floor() as usize + 1;
            let rows = (height / box_h).floor() as usize + 1;
            let mut tiles = Vec::with_capacity(columns * rows);
            for row in 0..rows {
                for column in 0..columns {
                    tiles.push(Rect::from_size(
                        page.x0 + column as f64 * box_w,
                        page.y0 + row as f64 * box_h,
                        box_w,
                        box_h,
                    ));
                }
            }
            tiles
        }
        single => vec![anchored_box(page, single, box_w, box_h)],
    };
    rects.into_iter().filter(Rect::is_valid).collect()
}

/// One `box_w` by `box_h` box at `position` on `page`, with the centre and
/// corner rules of [`placement`]. `Tile` is treated as the centre.
pub fn anchored_box(page: &Rect, position: Position, box_w: f64, box_h: f64) -> Rect {
    let margin = 0.05 * page.width().min(page.height());
    let (x, y) = match position {
        Position::Center | Position::Tile => (
            page.x0 + (page.width() - box_w) / 2.0,
            page.y0 + (page.height() - box_h) / 2.0,
        ),
        Position::TopLeft => (page.x0 + margin, page.y1 - box_h - margin),
        Position::TopRight => (page.x1 - box_w - margin, page.y1 - box_h - margin),
        Position::BottomLeft => (page.x0 + margin, page.y0 + margin),
        Position::BottomRight => (page.x1 - box_w - margin, page.y0 + margin),
    };
    Rect::from_size(x, y, box_w, box_h)
}

/// Where a page number goes on the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NumberPosition {
    #[default]
    BottomCenter,
    BottomRight,
    BottomLeft,
    TopCenter,
    TopRight,
    TopLeft,
}

impl NumberPosition {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bottom-center" | "bottom-centre" => Some(Self::BottomCenter),
            "bottom-right" => Some(Self::BottomRight),
            "bottom-left" => Some(Self::BottomLeft),
            "top-center" | "top-centre" => Some(Self::TopCenter),
            "top-right" => Some(Self::TopRight),
            "top-left" => Some(Self::TopLeft),
            _ => None,
        }
    }
}

/// Estimated width of a label in a base-14 font: half the font size per
/// character.
pub fn estimate_text_width(text: &str, font_size: f64) -> f64 {
    font_size * text.chars().count() as f64 * 0.5
}

/// Baseline origin for a page-number label of `text_width` points.
///
/// Bottom labels sit `margin_pt` above the lower edge. Top labels keep their
/// glyph tops `margin_pt` below the upper edge.
pub fn number_anchor(
    page: &Rect,
    position: NumberPosition,
    margin_pt: f64,
    text_width: f64,
    font_size: f64,
) -> (f64, f64) {
    let centred = page.x0 + (page.width() - text_width) / 2.0;
    let right = page.x1 - text_width - margin_pt;
    let left = page.x0 + margin_pt;
    let bottom = page.y0 + margin_pt;
    let top = page.y1 - margin_pt - font_size;

    match position {
        NumberPosition::BottomCenter => (centred, bottom),
        NumberPosition::BottomRight => (right, bottom),
        NumberPosition::BottomLeft => (left, bottom),
        NumberPosition::TopCenter => (centred, top),
        NumberPosition::TopRight => (right, top),
        NumberPosition::TopLeft => (left, top),
    }
}

// ---------------------------------------------------------------------------
// Rotation
// ---------------------------------------------------------------------------

/// Add `delta` degrees to `current`, normalised into `[0, 360)`.
///
/// Both operands are reduced first, so any pair of `i64` values is accepted.
pub fn compose_rotation(current: i64, delta: i64) -> i64 {
    (current.rem_euclid(360) + delta.rem_euclid(360)).rem_euclid(360)
}
