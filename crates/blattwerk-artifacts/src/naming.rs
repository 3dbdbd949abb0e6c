// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Filename hygiene and the names given to derived outputs.

/// Used when sanitising leaves nothing behind.
pub const FALLBACK_NAME: &str = "document";

/// Reduce a user-supplied filename to a safe basename.
///
/// Keeps ASCII alphanumerics, `.`, `-` and `_`. Path separators and runs of
/// whitespace become a single `_`; anything else is dropped. Leading dots and
/// underscores are stripped so the result can never be hidden or climb out
/// of the artifact directory.
pub fn secure_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_gap = false;
    for ch in name.chars() {
        if ch == '/' || ch == '\\' || ch.is_whitespace() {
            pending_gap = true;
            continue;
        }
        if ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '_') {
            if pending_gap && !out.is_empty() {
                out.push('_');
            }
            pending_gap = false;
            out.push(ch);
        }
    }

    let trimmed = out.trim_start_matches(['.', '_']).trim_end_matches(['.', '_']);
    if trimmed.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Filename without its last extension.
pub fn stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    }
}

/// Names of the files operations hand back, derived from the input name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputName {
    SplitPage(usize),
    SplitRange(usize, usize),
    SplitArchive,
    Compressed,
    Merged,
    Rotated,
    Cropped,
    Watermarked,
    Numbered,
    Reordered,
    Protected,
    Unlocked,
    Signed,
    Office,
    PdfA,
    PageImage(usize),
    ImageArchive,
}

impl OutputName {
    /// Render against the sanitised input filename.
    pub fn render(self, input: &str) -> String {
        let base = stem(input);
        match self {
            Self::SplitPage(n) => format!("{base}_pagina_{n}.pdf"),
            Self::SplitRange(start, end) => format!("{base}_paginas_{start}-{end}.pdf"),
            Self::SplitArchive => format!("{base}_dividido.zip"),
            Self::Compressed => format!("{base}_comprimido.pdf"),
            Self::Merged => "documento_combinado.pdf".to_string(),
            Self::Rotated => format!("{base}_rotado.pdf"),
            Self::Cropped => format!("{base}_recortado.pdf"),
            Self::Watermarked => format!("{base}_marca_agua.pdf"),
            Self::Numbered => format!("{base}_numerado.pdf"),
            Self::Reordered => format!("{base}_ordenado.pdf"),
            Self::Protected => format!("{base}_protegido.pdf"),
            Self::Unlocked => format!("{base}_desbloqueado.pdf"),
            Self::Signed => format!("firmado_{base}.pdf"),
            Self::Office => format!("{base}.pdf"),
            Self::PdfA => format!("{base}_pdfa.pdf"),
            Self::PageImage(n) => format!("page_{n}.jpg"),
            Self::ImageArchive => format!("{base}_images.zip"),
        }
    }
}

/// Filename for a PDF built from images, taken from its title.
pub fn titled_pdf(title: &str) -> String {
    let name = secure_filename(title);
    if name.ends_with(".pdf") { name } else { format!("{name}.pdf") }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separators_and_whitespace_collapse() {
        assert_eq!(secure_filename("my report  final.pdf"), "my_report_final.pdf");
        assert_eq!(secure_filename("../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename(r"C:\Users\ana\cv.docx"), "C_Users_ana_cv.docx");
    }

    #[test]
    fn unsafe_characters_are_dropped() {
        assert_eq!(secure_filename("résumé (1).pdf"), "rsum_1.pdf");
        assert_eq!(secure_filename(".hidden"), "hidden");
        assert_eq!(secure_filename("???"), FALLBACK_NAME);
        assert_eq!(secure_filename(""), FALLBACK_NAME);
    }

    #[test]
    fn stem_keeps_inner_dots() {
        assert_eq!(stem("a.b.pdf"), "a.b");
        assert_eq!(stem("noext"), "noext");
    }

    #[test]
    fn derived_names() {
        assert_eq!(OutputName::SplitPage(3).render("informe.pdf"), "informe_pagina_3.pdf");
        assert_eq!(OutputName::SplitRange(2, 4).render("informe.pdf"), "informe_paginas_2-4.pdf");
        assert_eq!(OutputName::SplitArchive.render("informe.pdf"), "informe_dividido.zip");
        assert_eq!(OutputName::Merged.render("ignored.pdf"), "documento_combinado.pdf");
        assert_eq!(OutputName::Watermarked.render("x.pdf"), "x_marca_agua.pdf");
        assert_eq!(OutputName::PdfA.render("scan.pdf"), "scan_pdfa.pdf");
        assert_eq!(OutputName::Office.render("letter.docx"), "letter.pdf");
        assert_eq!(OutputName::Signed.render("contrato.pdf"), "firmado_contrato.pdf");
    }

    #[test]
    fn title_becomes_pdf_name() {
        assert_eq!(titled_pdf("Documento PDF"), "Documento_PDF.pdf");
        assert_eq!(titled_pdf("album.pdf"), "album.pdf");
    }
}
