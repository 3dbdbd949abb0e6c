// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page-number label formatting.

use serde::{Deserialize, Serialize};

/// Textual style of a page-number label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NumberStyle {
    /// `1`, `2`, `3`
    #[default]
    Arabic,
    /// `Página 1`, `Página 2`
    Labelled,
    /// `1 de 12`
    OfTotal,
    /// `i`, `ii`, `iii`
    RomanLower,
    /// `I`, `II`, `III`
    RomanUpper,
}

impl NumberStyle {
    /// Parse the style names used by the upload form. Anything unknown falls
    /// back to arabic.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "Página 1, Página 2" | "page-n" | "labelled" => Self::Labelled,
            "1 de N" | "n-of-total" | "of-total" => Self::OfTotal,
            "i, ii, iii" | "roman-lower" => Self::RomanLower,
            "I, II, III" | "roman-upper" => Self::RomanUpper,
            _ => Self::Arabic,
        }
    }
}

/// Everything needed to label one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberingScheme {
    pub starting_number: i64,
    pub exclude_first_page: bool,
    pub style: NumberStyle,
    /// Pages in the document.
    pub page_count: usize,
}

impl NumberingScheme {
    /// Printed number for the zero-based page `index`. Saturates at the
    /// ends of the `i64` range.
    pub fn number_for(&self, index: usize) -> i64 {
        let skipped = i64::from(self.exclude_first_page);
        let offset = i64::try_from(index).unwrap_or(i64::MAX);
        self.starting_number.saturating_add(offset).saturating_sub(skipped)
    }

    /// Total used by the `N de M` style; the unlabelled first page is not
    /// counted.
    pub fn total(&self) -> i64 {
        let skipped = usize::from(self.exclude_first_page && self.page_count > 0);
        (self.page_count - skipped) as i64
    }

    /// Whether page `index` gets a label at all.
    pub fn labels(&self, index: usize) -> bool {
        !(self.exclude_first_page && index == 0)
    }

    /// Label for page `index`.
    pub fn format(&self, index: usize) -> String {
        let n = self.number_for(index);
        match self.style {
            NumberStyle::Arabic => n.to_string(),
            NumberStyle::Labelled => format!("Página {n}"),
            NumberStyle::OfTotal => format!("{n} de {}", self.total()),
            NumberStyle::RomanLower => to_roman(n).map(|r| r.to_lowercase()).unwrap_or_else(|| n.to_string()),
            NumberStyle::RomanUpper => to_roman(n).unwrap_or_else(|| n.to_string()),
        }
    }
}

/// Free-standing form of [`NumberingScheme::format`].
pub fn format(index: usize, starting_number: i64, exclude_first_page: bool, style: NumberStyle, page_count: usize) -> String {
    NumberingScheme {
        starting_number,
        exclude_first_page,
        style,
        page_count,
    }
    .format(index)
}

/// Uppercase roman numeral for 1..=3999; `None` outside that range.
pub fn to_roman(value: i64) -> Option<String> {
    const TABLE: [(i64, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];

    if !(1..=3999).contains(&value) {
        return None;
    }
    let mut remaining = value;
    let mut out = String::new();
    for (weight, symbol) in TABLE {
        while remaining >= weight {
            out.push_str(symbol);
            remaining -= weight;
        }
    }
    Some(out)
}
