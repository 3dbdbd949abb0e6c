// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Blattwerk toolkit.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one inbound operation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique token for one file in the artifact namespace. Its hyphenless form
/// prefixes the stored filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ArtifactId(pub Uuid);

impl ArtifactId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Filename prefix: 32 lowercase hex digits.
    pub fn token(&self) -> String {
        self.0.simple().to_string()
    }
}

impl Default for ArtifactId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What an artifact is for within its request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactRole {
    /// An uploaded file as received.
    Input,
    /// A working file that never leaves the server.
    Intermediate,
    /// A file returned to the caller.
    Output,
}

/// A file written to the artifact namespace during one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    pub path: PathBuf,
    pub owner: RequestId,
    pub role: ArtifactRole,
    pub created_at: DateTime<Utc>,
    /// Size in bytes once the write completed.
    pub size: u64,
    /// SHA-256 of the content, hex encoded, when written through the ledger.
    pub sha256: Option<String>,
}

/// Supported input document kinds, inferred from the filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    Pdf,
    Jpeg,
    Png,
    /// Word processor, spreadsheet, or presentation formats handled by the
    /// office converter.
    Office,
}

impl DocumentKind {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Office => "application/octet-stream",
        }
    }

    /// Infer document kind from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "doc" | "docx" | "odt" | "rtf" | "xls" | "xlsx" | "ods" | "ppt" | "pptx" | "odp" => {
                Some(Self::Office)
            }
            _ => None,
        }
    }

    /// Infer document kind from the extension of a filename.
    pub fn from_filename(name: &str) -> Option<Self> {
        let (_, ext) = name.rsplit_once('.')?;
        Self::from_extension(ext)
    }
}

/// Target page sizes for image-to-PDF conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageSize {
    #[default]
    A4,
    Letter,
    Legal,
    /// Page takes the size of the placed image.
    Fit,
}

impl PageSize {
    /// Dimensions in millimetres (width, height); `None` for [`PageSize::Fit`].
    pub fn dimensions_mm(&self) -> Option<(f32, f32)> {
        match self {
            Self::A4 => Some((210.0, 297.0)),
            Self::Letter => Some((215.9, 279.4)),
            Self::Legal => Some((215.9, 355.6)),
            Self::Fit => None,
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "a4" => Some(Self::A4),
            "letter" => Some(Self::Letter),
            "legal" => Some(Self::Legal),
            "fit" => Some(Self::Fit),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Per-unit outcomes
// ---------------------------------------------------------------------------

/// Outcome for one unit of work (a page, an image, an input file).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitOutcome {
    Done,
    /// Deliberately left untouched, for example a crop that would be degenerate.
    Skipped { reason: String },
    /// Tried and failed; the rest of the operation carried on.
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitResult {
    pub unit: String,
    pub outcome: UnitOutcome,
}

/// Aggregated per-unit results for one operation.
///
/// Best-effort operations keep going past skipped and failed units; the
/// report is how those units stay visible to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitReport {
    pub results: Vec<UnitResult>,
}

impl UnitReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn done(&mut self, unit: impl Into<String>) {
        self.push(unit, UnitOutcome::Done);
    }

    pub fn skipped(&mut self, unit: impl Into<String>, reason: impl Into<String>) {
        self.push(
            unit,
            UnitOutcome::Skipped {
                reason: reason.into(),
            },
        );
    }

    pub fn failed(&mut self, unit: impl Into<String>, reason: impl Into<String>) {
        self.push(
            unit,
            UnitOutcome::Failed {
                reason: reason.into(),
            },
        );
    }

    fn push(&mut self, unit: impl Into<String>, outcome: UnitOutcome) {
        self.results.push(UnitResult {
            unit: unit.into(),
            outcome,
        });
    }

    pub fn done_count(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Done))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Skipped { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, UnitOutcome::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&UnitOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }

    /// Every unit completed.
    pub fn is_clean(&self) -> bool {
        self.done_count() == self.results.len()
    }

    /// Fold another report into this one.
    pub fn extend(&mut self, other: UnitReport) {
        self.results.extend(other.results);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn artifact_tokens_are_distinct_and_hex() {
        let a = ArtifactId::new();
        let b = ArtifactId::new();
        assert_ne!(a.token(), b.token());
        assert_eq!(a.token().len(), 32);
        assert!(a.token().chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn document_kind_from_filename() {
        assert_eq!(DocumentKind::from_filename("Report.PDF"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_filename("scan.jpeg"), Some(DocumentKind::Jpeg));
        assert_eq!(DocumentKind::from_filename("slides.pptx"), Some(DocumentKind::Office));
        assert_eq!(DocumentKind::from_filename("README"), None);
        assert_eq!(DocumentKind::from_filename("archive.zip"), None);
    }

    #[test]
    fn page_size_parse() {
        assert_eq!(PageSize::parse(" Letter "), Some(PageSize::Letter));
        assert_eq!(PageSize::parse("fit"), Some(PageSize::Fit));
        assert_eq!(PageSize::parse("b5"), None);
        assert_eq!(PageSize::Fit.dimensions_mm(), None);
    }

    #[test]
    fn unit_report_counts() {
        let mut report = UnitReport::new();
        report.done("page 1");
        report.skipped("page 2", "degenerate crop");
        report.failed("image 7 0 R", "unsupported filter");
        report.done("page 3");

        assert_eq!(report.done_count(), 2);
        assert_eq!(report.skipped_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert!(!report.is_clean());
    }
}
