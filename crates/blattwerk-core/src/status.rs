// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error-to-status mapping for callers that speak status codes.
//
// Every error lands in exactly one of three classes. Caller mistakes are
// 400-class and carry the validation detail verbatim; a missing converter is
// a service-unavailable condition; everything else is a 500.

use serde::Serialize;

use crate::error::{BlattwerkError, ValidationError};

/// Coarse status class reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusClass {
    /// Malformed or missing input, out-of-range parameters, wrong password.
    BadRequest,
    /// A required external converter is not installed on the host.
    ServiceUnavailable,
    /// Unexpected processing failure or a converter that crashed or hung.
    Internal,
}

impl StatusClass {
    /// Numeric status code for HTTP-style transports.
    pub fn code(&self) -> u16 {
        match self {
            Self::BadRequest => 400,
            Self::ServiceUnavailable => 503,
            Self::Internal => 500,
        }
    }

    /// Whether this status counts as a successful response for deferred
    /// cleanup purposes. Error classes never do.
    pub fn is_success(code: u16) -> bool {
        (200..300).contains(&code)
    }
}

/// What the caller sees when an operation fails.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub status: StatusClass,
    /// Short summary, safe to show to an end user.
    pub message: String,
    /// Technical detail, suitable for logs and API clients.
    pub detail: String,
    /// Whether trying the same request again could succeed.
    pub retriable: bool,
}

impl ErrorReport {
    pub fn code(&self) -> u16 {
        self.status.code()
    }
}

/// Classify an error and build the caller-facing report.
pub fn describe(err: &BlattwerkError) -> ErrorReport {
    let detail = err.to_string();
    match err {
        BlattwerkError::Validation(validation) => ErrorReport {
            status: StatusClass::BadRequest,
            message: validation_message(validation),
            detail,
            retriable: false,
        },

        BlattwerkError::Authentication => ErrorReport {
            status: StatusClass::BadRequest,
            message: "Incorrect password.".into(),
            detail,
            retriable: false,
        },

        BlattwerkError::CorruptInput(_) => ErrorReport {
            status: StatusClass::BadRequest,
            message: "The document could not be opened. It may be damaged or not a PDF.".into(),
            detail,
            retriable: false,
        },

        BlattwerkError::ToolUnavailable(tool) => ErrorReport {
            status: StatusClass::ServiceUnavailable,
            message: format!("This conversion needs {tool}, which is not installed on the server."),
            detail,
            retriable: false,
        },

        BlattwerkError::ToolExecution(_) => ErrorReport {
            status: StatusClass::Internal,
            message: "The external converter failed on this document.".into(),
            detail,
            retriable: false,
        },

        BlattwerkError::PdfError(_) | BlattwerkError::ImageError(_) | BlattwerkError::Archive(_) => {
            ErrorReport {
                status: StatusClass::Internal,
                message: "The document could not be processed.".into(),
                detail,
                retriable: false,
            }
        }

        BlattwerkError::Io(io_err) => ErrorReport {
            status: StatusClass::Internal,
            message: if io_err.kind() == std::io::ErrorKind::NotFound {
                "A temporary file disappeared before it could be read.".into()
            } else {
                "There was a problem reading or writing a temporary file.".into()
            },
            detail,
            retriable: true,
        },

        BlattwerkError::Serialization(_) => ErrorReport {
            status: StatusClass::Internal,
            message: "An internal data problem occurred.".into(),
            detail,
            retriable: false,
        },
    }
}

fn validation_message(err: &ValidationError) -> String {
    match err {
        ValidationError::EmptySelection => "No pages were selected.".into(),
        ValidationError::OutOfRange { page, page_count } => {
            format!("Page {page} does not exist; the document has {page_count} pages.")
        }
        ValidationError::Duplicate { page } => format!("Page {page} is listed more than once."),
        ValidationError::MissingInput(what) => format!("Missing {what}."),
        ValidationError::WrongExtension { expected, .. } => {
            format!("Please upload a {expected} file.")
        }
        ValidationError::Malformed { what, .. } => format!("The {what} could not be understood."),
        ValidationError::Parameter { name, detail } => format!("Invalid {name}: {detail}."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_bad_request() {
        let err = BlattwerkError::from(ValidationError::EmptySelection);
        let report = describe(&err);
        assert_eq!(report.code(), 400);
        assert!(!report.retriable);
    }

    #[test]
    fn wrong_password_is_bad_request() {
        assert_eq!(describe(&BlattwerkError::Authentication).code(), 400);
    }

    #[test]
    fn missing_tool_is_service_unavailable() {
        let report = describe(&BlattwerkError::ToolUnavailable("LibreOffice".into()));
        assert_eq!(report.status, StatusClass::ServiceUnavailable);
        assert!(report.message.contains("LibreOffice"));
    }

    #[test]
    fn tool_timeout_is_internal() {
        let report = describe(&BlattwerkError::ToolExecution("timed out after 120s".into()));
        assert_eq!(report.code(), 500);
    }

    #[test]
    fn out_of_range_message_names_the_page() {
        let err = BlattwerkError::from(ValidationError::OutOfRange { page: 9, page_count: 4 });
        assert!(describe(&err).message.contains("Page 9"));
    }

    #[test]
    fn success_range() {
        assert!(StatusClass::is_success(200));
        assert!(StatusClass::is_success(204));
        assert!(!StatusClass::is_success(400));
        assert!(!StatusClass::is_success(500));
    }
}
