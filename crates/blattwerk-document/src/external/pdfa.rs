// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF to PDF/A through the PostScript interpreter's pdfwrite device.

use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

use blattwerk_core::ValidationError;
use blattwerk_core::error::{BlattwerkError, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use super::run_tool;

/// PDF/A conformance level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PdfaLevel {
    #[serde(rename = "pdfa-1b")]
    A1b,
    #[default]
    #[serde(rename = "pdfa-2b")]
    A2b,
    #[serde(rename = "pdfa-3b")]
    A3b,
    #[serde(rename = "pdfa-2u")]
    A2u,
    #[serde(rename = "pdfa-3u")]
    A3u,
}

impl PdfaLevel {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pdfa-1b" => Ok(Self::A1b),
            "pdfa-2b" | "" => Ok(Self::A2b),
            "pdfa-3b" => Ok(Self::A3b),
            "pdfa-2u" => Ok(Self::A2u),
            "pdfa-3u" => Ok(Self::A3u),
            other => Err(ValidationError::parameter(
                "conformanceLevel",
                format!("unknown level {other:?}; expected pdfa-1b, pdfa-2b, pdfa-3b, pdfa-2u or pdfa-3u"),
            )
            .into()),
        }
    }

    /// The PDF/A part number passed to the converter.
    pub fn part(self) -> u8 {
        match self {
            Self::A1b => 1,
            Self::A2b | Self::A2u => 2,
            Self::A3b | Self::A3u => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::A1b => "pdfa-1b",
            Self::A2b => "pdfa-2b",
            Self::A3b => "pdfa-3b",
            Self::A2u => "pdfa-2u",
            Self::A3u => "pdfa-3u",
        }
    }
}

/// Converter arguments for one conversion.
pub fn converter_args(level: PdfaLevel, input: &Path, output: &Path) -> Vec<OsString> {
    let mut out_arg = OsString::from("-sOutputFile=");
    out_arg.push(output.as_os_str());
    vec![
        format!("-dPDFA={}", level.part()).into(),
        "-dBATCH".into(),
        "-dNOPAUSE".into(),
        "-dNOOUTERSAVE".into(),
        "-dPDFACompatibilityPolicy=1".into(),
        "-sProcessColorModel=DeviceRGB".into(),
        "-sColorConversionStrategy=RGB".into(),
        "-sDEVICE=pdfwrite".into(),
        "-dPDFSETTINGS=/prepress".into(),
        out_arg,
        input.as_os_str().to_owned(),
    ]
}

/// Convert `input` to PDF/A at `output` with the binary at `gs`.
#[instrument(skip_all, fields(level = level.as_str(), input = %input.display()))]
pub async fn pdf_to_pdfa(gs: &Path, input: &Path, output: &Path, level: PdfaLevel, budget: Duration) -> Result<()> {
    run_tool(gs, &converter_args(level, input, output), budget).await?;

    let size = std::fs::metadata(output).map(|meta| meta.len()).unwrap_or(0);
    if size == 0 {
        return Err(BlattwerkError::ToolExecution(
            "PDF/A converter did not produce an output file".into(),
        ));
    }
    info!(output_len = size, "PDF/A written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_parse_and_default() {
        assert_eq!(PdfaLevel::parse("").expect("default"), PdfaLevel::A2b);
        assert_eq!(PdfaLevel::parse("PDFA-3U").expect("3u"), PdfaLevel::A3u);
        assert_eq!(PdfaLevel::A1b.part(), 1);
        assert_eq!(PdfaLevel::A2u.part(), 2);
        assert!(PdfaLevel::parse("pdfa-4").is_err());
    }

    #[test]
    fn arguments_name_level_and_files() {
        let args = converter_args(PdfaLevel::A3b, Path::new("/tmp/in.pdf"), Path::new("/tmp/out.pdf"));
        let args: Vec<String> = args.into_iter().map(|a| a.to_string_lossy().into_owned()).collect();
        assert_eq!(args[0], "-dPDFA=3");
        assert!(args.contains(&"-sDEVICE=pdfwrite".to_string()));
        assert_eq!(args[args.len() - 2], "-sOutputFile=/tmp/out.pdf");
        assert_eq!(args[args.len() - 1], "/tmp/in.pdf");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn empty_output_is_a_tool_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = pdf_to_pdfa(
            Path::new("/bin/true"),
            &dir.path().join("in.pdf"),
            &dir.path().join("out.pdf"),
            PdfaLevel::default(),
            Duration::from_secs(10),
        )
        .await
        .err()
        .expect("error");
        assert!(matches!(err, BlattwerkError::ToolExecution(_)));
    }
}
