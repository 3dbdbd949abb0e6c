// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page selection parsing.
//
// Users write 1-based selections such as "1-3,5,7-9" or "all". Internally
// every selection is a list of zero-based indices. Two flavours exist: the
// set flavour (sorted, deduplicated, lenient about bad tokens) used by split,
// rotate, crop and image export, and the order flavour used by reordering,
// where order matters and every mistake is an error.

use std::collections::BTreeSet;

use blattwerk_core::ValidationError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// A validated set of zero-based page indices, strictly ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSelection {
    indices: Vec<usize>,
    page_count: usize,
}

impl PageSelection {
    /// Every page of a `page_count` page document, in order.
    pub fn all(page_count: usize) -> Result<Self, ValidationError> {
        if page_count == 0 {
            return Err(ValidationError::EmptySelection);
        }
        Ok(Self {
            indices: (0..page_count).collect(),
            page_count,
        })
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Page count of the document the selection was drawn from.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.binary_search(&index).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }
}

/// Parse a set-style selection.
///
/// `"all"` selects every page. An empty `spec` selects every page when
/// `allow_empty` is set and is an empty selection otherwise. Malformed tokens
/// and single pages outside the document are skipped with a warning; range
/// ends past the last page are truncated. The call fails only when nothing
/// survives.
pub fn parse(spec: &str, page_count: usize, allow_empty: bool) -> Result<PageSelection, ValidationError> {
    let trimmed = spec.trim();
    if trimmed.eq_ignore_ascii_case("all") || (trimmed.is_empty() && allow_empty) {
        return PageSelection::all(page_count);
    }

    let mut selected = BTreeSet::new();
    for token in trimmed.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        match parse_token(token) {
            Some(Token::Single(page)) => {
                if page >= 1 && (page as usize) <= page_count {
                    selected.insert(page as usize - 1);
                } else {
                    warn!(token, page_count, "page outside document, skipping");
                }
            }
            Some(Token::Range(start, end)) => {
                if start < 1 || end < start {
                    warn!(token, "inverted or non-positive range, skipping");
                    continue;
                }
                let first = start as usize - 1;
                let last = (end as usize).min(page_count);
                if first >= last {
                    warn!(token, page_count, "range starts past the last page, skipping");
                    continue;
                }
                selected.extend(first..last);
            }
            None => warn!(token, "malformed page range token, skipping"),
        }
    }

    if selected.is_empty() {
        return Err(ValidationError::EmptySelection);
    }

    let indices: Vec<usize> = selected.into_iter().collect();
    debug!(spec = trimmed, selected = indices.len(), page_count, "page selection parsed");
    Ok(PageSelection {
        indices,
        page_count,
    })
}

/// Parse an order-preserving selection for reordering.
///
/// Accepts either a JSON array (`[3,1,2]`) or a comma-separated list
/// (`3,1,2`) of 1-based page numbers. Nothing is sorted or deduplicated:
/// any out-of-range or repeated page fails the whole call.
pub fn parse_order(spec: &str, page_count: usize) -> Result<Vec<usize>, ValidationError> {
    let trimmed = spec.trim();
    let pages: Vec<i64> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)
            .map_err(|err| ValidationError::malformed("page order", err.to_string()))?
    } else {
        trimmed
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| {
                t.parse::<i64>()
                    .map_err(|_| ValidationError::malformed("page order", format!("'{t}' is not a page number")))
            })
            .collect::<Result<_, _>>()?
    };
    validate_order(&pages, page_count)
}

/// Check a 1-based order and convert it to zero-based indices.
pub fn validate_order(pages: &[i64], page_count: usize) -> Result<Vec<usize>, ValidationError> {
    if pages.is_empty() {
        return Err(ValidationError::EmptySelection);
    }

    let mut seen = vec![false; page_count];
    let mut order = Vec::with_capacity(pages.len());
    for &page in pages {
        if page < 1 || page as u64 > page_count as u64 {
            return Err(ValidationError::OutOfRange { page, page_count });
        }
        let index = page as usize - 1;
        if seen[index] {
            return Err(ValidationError::Duplicate { page: index + 1 });
        }
        seen[index] = true;
        order.push(index);
    }
    Ok(order)
}

/// One `{start, end}` pair from a split-by-range request, 1-based inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageSpan {
    pub start: i64,
    pub end: i64,
}

/// Clamp split spans into the document and drop the ones left inverted.
///
/// Returns zero-based inclusive `(first, last)` pairs in request order.
pub fn clamp_spans(spans: &[PageSpan], page_count: usize) -> Result<Vec<(usize, usize)>, ValidationError> {
    let mut clamped = Vec::with_capacity(spans.len());
    for span in spans {
        let start = span.start.max(1);
        let end = span.end.min(page_count as i64);
        if start > end {
            warn!(start = span.start, end = span.end, page_count, "split range empty after clamping, skipping");
            continue;
        }
        clamped.push((start as usize - 1, end as usize - 1));
    }
    if clamped.is_empty() {
        return Err(ValidationError::EmptySelection);
    }
    Ok(clamped)
}

enum Token {
    Single(i64),
    Range(i64, i64),
}

fn parse_token(token: &str) -> Option<Token> {
    match token.split_once('-') {
        Some((start, end)) => {
            let start = start.trim().parse().ok()?;
            let end = end.trim().parse().ok()?;
            Some(Token::Range(start, end))
        }
        None => token.parse().ok().map(Token::Single),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages(spec: &str, count: usize) -> Vec<usize> {
        parse(spec, count, false).expect("selection").indices().to_vec()
    }

    #[test]
    fn all_selects_every_page() {
        assert_eq!(pages("all", 4), vec![0, 1, 2, 3]);
        assert_eq!(pages(" ALL ", 2), vec![0, 1]);
    }

    #[test]
    fn empty_spec_depends_on_allow_empty() {
        assert_eq!(parse("", 3, true).expect("all").len(), 3);
        assert_eq!(parse("  ", 3, false), Err(ValidationError::EmptySelection));
    }

    #[test]
    fn mixed_tokens_are_sorted_and_deduplicated() {
        assert_eq!(pages("7-9,1-3,5,2", 10), vec![0, 1, 2, 4, 6, 7, 8]);
    }

    #[test]
    fn malformed_tokens_are_skipped() {
        assert_eq!(pages("1,abc,3-x,4", 5), vec![0, 3]);
        assert_eq!(pages("5-2,3", 5), vec![2]);
        assert_eq!(pages("0,2", 5), vec![1]);
    }

    #[test]
    fn range_end_is_truncated() {
        assert_eq!(pages("3-99", 5), vec![2, 3, 4]);
    }

    #[test]
    fn out_of_range_singles_are_dropped() {
        assert_eq!(pages("2,9", 3), vec![1]);
    }

    #[test]
    fn nothing_left_is_empty_selection() {
        assert_eq!(parse("x,y", 5, false), Err(ValidationError::EmptySelection));
        assert_eq!(parse("8-9", 5, true), Err(ValidationError::EmptySelection));
        assert_eq!(parse("all", 0, true), Err(ValidationError::EmptySelection));
    }

    #[test]
    fn selections_are_strictly_ascending_and_in_bounds() {
        let specs = ["1-3,2-4", "10,1,5-7", "4-4,4,4", "1-100", "3,2,1", " 2 - 3 , 1 "];
        for spec in specs {
            let selection = parse(spec, 8, false).expect("selection");
            let indices = selection.indices();
            assert!(indices.windows(2).all(|w| w[0] < w[1]), "{spec}");
            assert!(indices.iter().all(|&i| i < 8), "{spec}");
        }
    }

    #[test]
    fn order_is_preserved() {
        assert_eq!(parse_order("3,1,2", 3), Ok(vec![2, 0, 1]));
        assert_eq!(parse_order("[2, 3, 1]", 3), Ok(vec![1, 2, 0]));
    }

    #[test]
    fn order_rejects_duplicates_and_out_of_range() {
        assert_eq!(parse_order("1,1,2", 3), Err(ValidationError::Duplicate { page: 1 }));
        assert_eq!(
            parse_order("[1,4,2]", 3),
            Err(ValidationError::OutOfRange { page: 4, page_count: 3 })
        );
        assert_eq!(
            parse_order("0,1,2", 3),
            Err(ValidationError::OutOfRange { page: 0, page_count: 3 })
        );
        assert!(matches!(parse_order("1,two", 3), Err(ValidationError::Malformed { .. })));
        assert_eq!(parse_order("[]", 3), Err(ValidationError::EmptySelection));
    }

    #[test]
    fn spans_are_clamped_and_filtered() {
        let spans = [
            PageSpan { start: 0, end: 2 },
            PageSpan { start: 4, end: 99 },
            PageSpan { start: 6, end: 7 },
            PageSpan { start: 3, end: 2 },
        ];
        assert_eq!(clamp_spans(&spans, 5), Ok(vec![(0, 1), (3, 4)]));
        assert_eq!(
            clamp_spans(&[PageSpan { start: 9, end: 12 }], 5),
            Err(ValidationError::EmptySelection)
        );
    }
}
