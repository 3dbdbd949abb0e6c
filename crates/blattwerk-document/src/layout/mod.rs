// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Layout module: page selection, placement geometry, and page-number labels.

pub mod geometry;
pub mod numbering;
pub mod page_range;

pub use geometry::{MarginsMm, NumberPosition, Position, Rect, RelativeRect};
pub use numbering::{NumberStyle, NumberingScheme};
pub use page_range::{PageSelection, PageSpan};
