// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Blattwerk.

use thiserror::Error;

/// Caller-side input problems. Never retried, always reported with the
/// specific reason.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("the selection contains no pages")]
    EmptySelection,

    #[error("page {page} is outside 1..={page_count}")]
    OutOfRange { page: i64, page_count: usize },

    #[error("page {page} appears more than once")]
    Duplicate { page: usize },

    #[error("missing input: {0}")]
    MissingInput(String),

    #[error("unexpected file type for {filename}: expected {expected}")]
    WrongExtension { filename: String, expected: String },

    #[error("malformed {what}: {detail}")]
    Malformed { what: String, detail: String },

    #[error("invalid parameter {name}: {detail}")]
    Parameter { name: String, detail: String },
}

impl ValidationError {
    pub fn malformed(what: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Malformed {
            what: what.into(),
            detail: detail.into(),
        }
    }

    pub fn parameter(name: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Parameter {
            name: name.into(),
            detail: detail.into(),
        }
    }
}

/// Top-level error type for all Blattwerk operations.
#[derive(Debug, Error)]
pub enum BlattwerkError {
    // -- Caller errors --
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("incorrect password")]
    Authentication,

    // -- Document errors --
    #[error("document could not be opened: {0}")]
    CorruptInput(String),

    #[error("PDF operation failed: {0}")]
    PdfError(String),

    #[error("image processing failed: {0}")]
    ImageError(String),

    #[error("archive creation failed: {0}")]
    Archive(String),

    // -- External tools --
    #[error("required tool is not available: {0}")]
    ToolUnavailable(String),

    #[error("external tool failed: {0}")]
    ToolExecution(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BlattwerkError {
    /// True for errors caused by what the caller sent rather than by the host.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Self::Validation(_) | Self::Authentication | Self::CorruptInput(_)
        )
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlattwerkError>;
