// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line surface and its translation into operation options.

use std::path::PathBuf;

use blattwerk_core::ValidationError;
use blattwerk_core::error::Result;
use blattwerk_core::types::PageSize;
use blattwerk_document::compress::CompressionTier;
use blattwerk_document::external::PdfaLevel;
use blattwerk_document::layout::{MarginsMm, NumberPosition, NumberStyle, Position, RelativeRect};
use blattwerk_document::pdf::{CropSpec, NumberFont};
use blattwerk_service::{
    CompressOptions, CropOptions, ImageQuality, ImagesToPdfOptions, PageNumberOptions, PageTarget, PdfToImagesOptions,
    PdfaOptions, PreviewRotationOptions, RotateOptions, SignOptions, SignatureContent, SplitOptions, WatermarkContent,
    WatermarkOptions,
};
use blattwerk_service::options::{DEFAULT_IMAGES_TITLE, DEFAULT_WATERMARK_TEXT};
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "blattwerk")]
#[command(about = "Blattwerk - split, merge, compress, stamp and convert PDF files")]
#[command(version)]
pub struct Cli {
    /// JSON configuration file; missing keys keep their defaults
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Split into one document per page, or per range, as a zip
    Split {
        input: PathBuf,
        /// JSON list of 1-based ranges, e.g. '[{"start":1,"end":2}]'
        #[arg(long)]
        ranges: Option<String>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Concatenate documents in the order given
    Merge {
        #[arg(num_args = 2.., required = true)]
        inputs: Vec<PathBuf>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Recompress embedded images and streams
    Compress {
        input: PathBuf,
        /// low, medium or high
        #[arg(long, default_value = "medium")]
        level: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Rotate pages clockwise by a multiple of 90 degrees
    Rotate {
        input: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        angle: i64,
        /// "all" or a selection such as 1-3,5
        #[arg(long, default_value = "all")]
        pages: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Crop by millimetre margins or to a relative box
    Crop {
        input: PathBuf,
        /// top,right,bottom,left in millimetres
        #[arg(long, value_delimiter = ',', conflicts_with = "rect")]
        margins: Option<Vec<f64>>,
        /// x,y,width,height as fractions of the page, origin top-left
        #[arg(long, value_delimiter = ',')]
        rect: Option<Vec<f64>>,
        #[arg(long, default_value = "all")]
        pages: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Stamp text or an image on every page
    Watermark {
        input: PathBuf,
        #[arg(long, conflicts_with = "image")]
        text: Option<String>,
        #[arg(long)]
        image: Option<PathBuf>,
        /// 0 to 100
        #[arg(long, default_value_t = 30)]
        opacity: u8,
        /// center, top-left, top-right, bottom-left, bottom-right or tile
        #[arg(long, default_value = "center")]
        position: String,
        #[arg(long, default_value_t = 45.0, allow_hyphen_values = true)]
        rotation: f64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Sign the last page with a typed name or a signature image
    Sign {
        input: PathBuf,
        #[arg(long, conflicts_with = "image", required_unless_present = "image")]
        name: Option<String>,
        #[arg(long)]
        image: Option<PathBuf>,
        /// top-left, top-right, bottom-left or bottom-right
        #[arg(long, default_value = "bottom-right")]
        position: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Add page numbers
    Number {
        input: PathBuf,
        #[arg(long, default_value = "bottom-center")]
        position: String,
        #[arg(long, default_value_t = 1, allow_hyphen_values = true)]
        start: i64,
        /// arabic, labelled, of-total, roman-lower or roman-upper
        #[arg(long, default_value = "arabic")]
        style: String,
        #[arg(long, default_value_t = 15.0)]
        margin: f64,
        #[arg(long)]
        skip_first: bool,
        /// helvetica, times or courier
        #[arg(long, default_value = "helvetica")]
        font: String,
        #[arg(long, default_value_t = 12.0)]
        font_size: f64,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Put pages in a new order; every page exactly once
    Reorder {
        input: PathBuf,
        /// 1-based page numbers, e.g. 3,1,2
        #[arg(long, value_delimiter = ',', required = true)]
        order: Vec<i64>,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Encrypt with a password
    Protect {
        input: PathBuf,
        #[arg(long)]
        password: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Remove password protection
    Unlock {
        input: PathBuf,
        #[arg(long)]
        password: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print page count and size as JSON
    Info { input: PathBuf },
    /// Print page thumbnails as JSON data URIs
    Thumbnails { input: PathBuf },
    /// Print thumbnails as they would look after a rotation, without rotating
    PreviewRotation {
        input: PathBuf,
        #[arg(long, default_value_t = 90, allow_hyphen_values = true)]
        angle: i64,
        /// "all", a selection such as 1-3,5, or a JSON list such as [1,3]
        #[arg(long, default_value = "all")]
        pages: String,
    },
    /// Build a PDF with one page per image
    ImagesToPdf {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// a4, letter, legal or fit
        #[arg(long, default_value = "a4")]
        page_size: String,
        #[arg(long, default_value = DEFAULT_IMAGES_TITLE)]
        title: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render pages to JPEG, zipped
    PdfToImages {
        input: PathBuf,
        /// low, medium or high
        #[arg(long, default_value = "medium")]
        quality: String,
        #[arg(long, default_value = "all")]
        pages: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert an office document with LibreOffice
    OfficeToPdf {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert to PDF/A with Ghostscript
    PdfToPdfa {
        input: PathBuf,
        /// pdfa-1b, pdfa-2b, pdfa-3b, pdfa-2u or pdfa-3u
        #[arg(long, default_value = "pdfa-2b")]
        level: String,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete every file in the temporary directory
    CleanTemp,
    /// Report converter availability and temporary directory state
    SystemInfo,
    /// Write the default configuration to a file
    InitConfig { path: PathBuf },
}

// ---------------------------------------------------------------------------
// Argument translation
// ---------------------------------------------------------------------------

pub fn split_options(ranges: Option<&str>) -> Result<SplitOptions> {
    match ranges {
        Some(json) => SplitOptions::ranges_from_json(json),
        None => Ok(SplitOptions::All),
    }
}

pub fn compress_options(level: &str) -> CompressOptions {
    CompressOptions {
        tier: CompressionTier::parse(level),
    }
}

pub fn rotate_options(angle: i64, pages: &str) -> RotateOptions {
    RotateOptions {
        angle,
        pages: PageTarget::parse(pages),
    }
}

pub fn crop_options(margins: Option<&[f64]>, rect: Option<&[f64]>, pages: &str) -> Result<CropOptions> {
    let spec = match (margins, rect) {
        (Some(&[top, right, bottom, left]), _) => CropSpec::Margins(MarginsMm { top, right, bottom, left }),
        (None, Some(&[x, y, width, height])) => CropSpec::Exact(RelativeRect { x, y, width, height }),
        _ => return Err(ValidationError::MissingInput("either --margins or --rect, with four values".into()).into()),
    };
    Ok(CropOptions {
        spec,
        pages: PageTarget::parse(pages),
    })
}

pub fn watermark_options(
    text: Option<String>,
    has_image: bool,
    opacity: u8,
    position: &str,
    rotation: f64,
) -> Result<WatermarkOptions> {
    let content = if has_image {
        WatermarkContent::Image
    } else {
        WatermarkContent::Text {
            text: text.unwrap_or_else(|| DEFAULT_WATERMARK_TEXT.to_string()),
        }
    };
    let position = Position::parse(position)
        .ok_or_else(|| ValidationError::parameter("position", format!("unknown position {position:?}")))?;
    Ok(WatermarkOptions {
        content,
        opacity,
        position,
        rotation,
    })
}

pub fn sign_options(name: Option<String>, has_image: bool, position: &str) -> Result<SignOptions> {
    let content = match (name, has_image) {
        (_, true) => SignatureContent::Draw,
        (Some(name), false) => SignatureContent::Text { name },
        (None, false) => return Err(ValidationError::MissingInput("either --name or --image".into()).into()),
    };
    let position = Position::parse(position)
        .ok_or_else(|| ValidationError::parameter("position", format!("unknown position {position:?}")))?;
    Ok(SignOptions { content, position })
}

pub fn preview_rotation_options(angle: i64, pages: &str) -> PreviewRotationOptions {
    PreviewRotationOptions {
        angle,
        pages: PreviewRotationOptions::pages_from_form(pages),
    }
}

pub fn page_number_options(
    position: &str,
    start: i64,
    style: &str,
    margin: f64,
    skip_first: bool,
    font: &str,
    font_size: f64,
) -> Result<PageNumberOptions> {
    let position = NumberPosition::parse(position)
        .ok_or_else(|| ValidationError::parameter("position", format!("unknown position {position:?}")))?;
    Ok(PageNumberOptions {
        position,
        starting_number: start,
        style: NumberStyle::parse(style),
        margin_mm: margin,
        exclude_first_page: skip_first,
        font: NumberFont::parse(font),
        font_size,
    })
}

pub fn images_to_pdf_options(page_size: &str, title: String) -> Result<ImagesToPdfOptions> {
    let page_size = PageSize::parse(page_size)
        .ok_or_else(|| ValidationError::parameter("pageSize", format!("unknown page size {page_size:?}")))?;
    Ok(ImagesToPdfOptions { page_size, title })
}

pub fn pdf_to_images_options(quality: &str, pages: &str) -> PdfToImagesOptions {
    PdfToImagesOptions {
        quality: ImageQuality::parse(quality),
        pages: PageTarget::parse(pages),
    }
}

pub fn pdfa_options(level: &str) -> Result<PdfaOptions> {
    Ok(PdfaOptions {
        level: PdfaLevel::parse(level)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Command {
        Cli::try_parse_from(std::iter::once("blattwerk").chain(args.iter().copied()))
            .expect("arguments parse")
            .command
    }

    #[test]
    fn split_with_ranges() {
        let Command::Split { input, ranges, output } =
            parse(&["split", "in.pdf", "--ranges", r#"[{"start":1,"end":2}]"#, "-o", "out.zip"])
        else {
            panic!("expected split");
        };
        assert_eq!(input, PathBuf::from("in.pdf"));
        assert_eq!(output, Some(PathBuf::from("out.zip")));
        assert!(matches!(
            split_options(ranges.as_deref()).expect("ranges"),
            SplitOptions::Range { ranges } if ranges.len() == 1
        ));
    }

    #[test]
    fn merge_needs_two_inputs() {
        assert!(Cli::try_parse_from(["blattwerk", "merge", "a.pdf"]).is_err());
        let Command::Merge { inputs, .. } = parse(&["merge", "a.pdf", "b.pdf", "c.pdf"]) else {
            panic!("expected merge");
        };
        assert_eq!(inputs.len(), 3);
    }

    #[test]
    fn rotate_accepts_negative_angles() {
        let Command::Rotate { angle, pages, .. } = parse(&["rotate", "in.pdf", "--angle", "-90", "--pages", "2-3"])
        else {
            panic!("expected rotate");
        };
        let options = rotate_options(angle, &pages);
        assert_eq!(options.angle, -90);
        assert_eq!(options.pages, PageTarget::Range("2-3".into()));
    }

    #[test]
    fn crop_takes_margins_or_rect() {
        let Command::Crop { margins, rect, pages, .. } = parse(&["crop", "in.pdf", "--margins", "10,5,10,5"]) else {
            panic!("expected crop");
        };
        let options = crop_options(margins.as_deref(), rect.as_deref(), &pages).expect("crop");
        assert_eq!(
            options.spec,
            CropSpec::Margins(MarginsMm { top: 10.0, right: 5.0, bottom: 10.0, left: 5.0 })
        );

        assert!(crop_options(None, None, "all").is_err());
        assert!(Cli::try_parse_from(["blattwerk", "crop", "in.pdf", "--margins", "1,2,3,4", "--rect", "0,0,1,1"]).is_err());
    }

    #[test]
    fn watermark_defaults_to_confidential_text() {
        let options = watermark_options(None, false, 30, "center", 45.0).expect("options");
        assert_eq!(options, WatermarkOptions::default());
        assert!(watermark_options(None, false, 30, "middle", 45.0).is_err());
        assert_eq!(
            watermark_options(Some("x".into()), true, 30, "tile", 0.0).expect("image").content,
            WatermarkContent::Image
        );
    }

    #[test]
    fn sign_takes_a_name_or_an_image() {
        let Command::Sign { name, image, position, .. } = parse(&["sign", "in.pdf", "--name", "Ana Ruiz"]) else {
            panic!("expected sign");
        };
        let options = sign_options(name, image.is_some(), &position).expect("options");
        assert_eq!(options.content, SignatureContent::Text { name: "Ana Ruiz".into() });
        assert_eq!(options.position, Position::BottomRight);

        let Command::Sign { name, image, position, .. } =
            parse(&["sign", "in.pdf", "--image", "firma.png", "--position", "top-left"])
        else {
            panic!("expected sign");
        };
        let options = sign_options(name, image.is_some(), &position).expect("options");
        assert_eq!(options.content, SignatureContent::Draw);
        assert_eq!(options.position, Position::TopLeft);

        assert!(Cli::try_parse_from(["blattwerk", "sign", "in.pdf"]).is_err());
        assert!(sign_options(None, false, "top-left").is_err());
    }

    #[test]
    fn preview_rotation_defaults_to_a_quarter_turn() {
        let Command::PreviewRotation { angle, pages, .. } = parse(&["preview-rotation", "in.pdf", "--pages", "[1,3]"])
        else {
            panic!("expected preview-rotation");
        };
        let options = preview_rotation_options(angle, &pages);
        assert_eq!(options.angle, 90);
        assert_eq!(options.pages, PageTarget::Range("1,3".into()));
    }

    #[test]
    fn number_defaults_match_options_defaults() {
        let Command::Number { position, start, style, margin, skip_first, font, font_size, .. } =
            parse(&["number", "in.pdf"])
        else {
            panic!("expected number");
        };
        let options =
            page_number_options(&position, start, &style, margin, skip_first, &font, font_size).expect("options");
        assert_eq!(options, PageNumberOptions::default());
    }

    #[test]
    fn reorder_order_is_comma_separated() {
        let Command::Reorder { order, .. } = parse(&["reorder", "in.pdf", "--order", "3,1,2"]) else {
            panic!("expected reorder");
        };
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn conversion_parameters() {
        assert_eq!(
            images_to_pdf_options("letter", "Album".into()).expect("size").page_size,
            PageSize::Letter
        );
        assert!(images_to_pdf_options("a7", "Album".into()).is_err());
        assert_eq!(pdf_to_images_options("high", "all").quality, ImageQuality::High);
        assert_eq!(pdfa_options("pdfa-3u").expect("level").level, PdfaLevel::A3u);
        assert!(pdfa_options("pdfa-9z").is_err());
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["blattwerk", "system-info", "--config", "bw.json"]).expect("parse");
        assert_eq!(cli.config, Some(PathBuf::from("bw.json")));
        assert!(matches!(cli.command, Command::SystemInfo));
    }
}
