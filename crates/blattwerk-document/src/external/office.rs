// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Office document to PDF through a headless office suite.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use blattwerk_core::ValidationError;
use blattwerk_core::error::{BlattwerkError, Result};
use tracing::{info, instrument};

use super::run_tool;

/// File extensions the office converter accepts.
pub const OFFICE_EXTENSIONS: &[&str] = &["doc", "docx", "odt", "rtf", "xls", "xlsx", "ods", "ppt", "pptx", "odp"];

/// Check that `filename` has one of the [`OFFICE_EXTENSIONS`].
pub fn check_extension(filename: &str) -> Result<()> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if OFFICE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(())
    } else {
        Err(ValidationError::WrongExtension {
            filename: filename.to_string(),
            expected: OFFICE_EXTENSIONS.join(", "),
        }
        .into())
    }
}

/// Where the office converter writes the PDF for `input`: the input's stem
/// with a `.pdf` extension, inside `outdir`.
pub fn output_path(input: &Path, outdir: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .ok_or_else(|| BlattwerkError::ToolExecution("input has no file name".into()))?;
    let mut name = stem.to_os_string();
    name.push(".pdf");
    Ok(outdir.join(name))
}

/// Convert `input` with the office binary at `soffice`, writing into
/// `outdir`. Returns the path of the produced PDF, which is always
/// [`output_path`] for the same arguments.
#[instrument(skip_all, fields(input = %input.display()))]
pub async fn office_to_pdf(soffice: &Path, input: &Path, outdir: &Path, budget: Duration) -> Result<PathBuf> {
    let args: Vec<OsString> = vec![
        "--headless".into(),
        "--convert-to".into(),
        "pdf".into(),
        "--outdir".into(),
        outdir.as_os_str().to_owned(),
        input.as_os_str().to_owned(),
    ];
    let produced = output_path(input, outdir)?;
    run_tool(soffice, &args, budget).await?;

    if !produced.is_file() {
        return Err(BlattwerkError::ToolExecution(format!(
            "office converter produced no output at {}",
            produced.display()
        )));
    }
    info!(output = %produced.display(), "Office document converted");
    Ok(produced)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_case_insensitive() {
        check_extension("Report.DOCX").expect("docx");
        check_extension("slides.odp").expect("odp");
        let err = check_extension("notes.txt").err().expect("error");
        assert!(matches!(
            err,
            BlattwerkError::Validation(ValidationError::WrongExtension { .. })
        ));
        assert!(check_extension("no_extension").is_err());
    }

    #[test]
    fn output_path_swaps_the_extension() {
        let out = Path::new("/tmp/out");
        assert_eq!(
            output_path(Path::new("/in/0a1b_carta.docx"), out).expect("path"),
            out.join("0a1b_carta.pdf")
        );
        assert_eq!(output_path(Path::new("/in/notes"), out).expect("path"), out.join("notes.pdf"));
        assert!(output_path(Path::new("/"), out).is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn converter_output_is_located() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let fake = dir.path().join("fake-soffice");
        // Arguments: --headless --convert-to pdf --outdir DIR INPUT
        std::fs::write(&fake, "#!/bin/sh\nname=$(basename \"$6\")\ncp \"$6\" \"$5/${name%.*}.pdf\"\n")
            .expect("write script");
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).expect("chmod");

        let input = dir.path().join("letter.docx");
        std::fs::write(&input, b"fake document").expect("write input");
        let outdir = dir.path().join("out");
        std::fs::create_dir(&outdir).expect("outdir");

        let produced = office_to_pdf(&fake, &input, &outdir, Duration::from_secs(10))
            .await
            .expect("convert");
        assert_eq!(produced, outdir.join("letter.pdf"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_output_is_a_tool_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("sheet.xlsx");
        std::fs::write(&input, b"x").expect("write input");
        let err = office_to_pdf(Path::new("/bin/true"), &input, dir.path(), Duration::from_secs(10))
            .await
            .err()
            .expect("error");
        assert!(matches!(err, BlattwerkError::ToolExecution(_)));
    }
}
