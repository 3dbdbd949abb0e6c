// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Blattwerk - PDF page toolkit
//
// Entry point. Initialises logging, loads configuration, opens the toolkit
// over the artifact directory, and runs one subcommand against local files.

mod cli;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use blattwerk_core::ToolkitConfig;
use blattwerk_core::error::Result;
use blattwerk_core::status::{self, StatusClass};
use blattwerk_service::{Delivery, Toolkit, Upload};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info};

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let report = status::describe(&err);
            error!(code = report.code(), detail = %report.detail, "{}", report.message);
            eprintln!("error: {}", report.message);
            ExitCode::from(match report.status {
                StatusClass::BadRequest => 2,
                StatusClass::ServiceUnavailable => 3,
                StatusClass::Internal => 1,
            })
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ToolkitConfig::load_or_default(cli.config.as_deref())?;
    if let Command::InitConfig { path } = &cli.command {
        config.save(path)?;
        info!(path = %path.display(), "configuration written");
        return Ok(());
    }

    let toolkit = Toolkit::init(config)?;
    info!(temp_dir = %toolkit.config().temp_dir.display(), "Blattwerk starting");

    match cli.command {
        Command::Split { input, ranges, output } => {
            let options = cli::split_options(ranges.as_deref())?;
            save(&toolkit, toolkit.split(&Upload::from_path(&input)?, &options)?, output)
        }
        Command::Merge { inputs, output } => {
            let uploads = inputs.iter().map(Upload::from_path).collect::<Result<Vec<_>>>()?;
            save(&toolkit, toolkit.merge(&uploads)?, output)
        }
        Command::Compress { input, level, output } => {
            let (delivery, sizes) = toolkit.compress(&Upload::from_path(&input)?, &cli::compress_options(&level))?;
            print_json(&sizes)?;
            save(&toolkit, delivery, output)
        }
        Command::Rotate { input, angle, pages, output } => {
            let delivery = toolkit.rotate(&Upload::from_path(&input)?, &cli::rotate_options(angle, &pages))?;
            save(&toolkit, delivery, output)
        }
        Command::Crop { input, margins, rect, pages, output } => {
            let options = cli::crop_options(margins.as_deref(), rect.as_deref(), &pages)?;
            save(&toolkit, toolkit.crop(&Upload::from_path(&input)?, &options)?, output)
        }
        Command::Watermark { input, text, image, opacity, position, rotation, output } => {
            let options = cli::watermark_options(text, image.is_some(), opacity, &position, rotation)?;
            let mark = image.map(Upload::from_path).transpose()?;
            let delivery = toolkit.watermark(&Upload::from_path(&input)?, &options, mark.as_ref())?;
            save(&toolkit, delivery, output)
        }
        Command::Sign { input, name, image, position, output } => {
            let options = cli::sign_options(name, image.is_some(), &position)?;
            let picture = image.map(Upload::from_path).transpose()?;
            let delivery = toolkit.sign(&Upload::from_path(&input)?, &options, picture.as_ref())?;
            save(&toolkit, delivery, output)
        }
        Command::Number { input, position, start, style, margin, skip_first, font, font_size, output } => {
            let options = cli::page_number_options(&position, start, &style, margin, skip_first, &font, font_size)?;
            save(&toolkit, toolkit.page_numbers(&Upload::from_path(&input)?, &options)?, output)
        }
        Command::Reorder { input, order, output } => {
            let options = blattwerk_service::ReorderOptions { order };
            save(&toolkit, toolkit.reorder(&Upload::from_path(&input)?, &options)?, output)
        }
        Command::Protect { input, password, output } => {
            save(&toolkit, toolkit.protect(&Upload::from_path(&input)?, &password)?, output)
        }
        Command::Unlock { input, password, output } => {
            save(&toolkit, toolkit.unlock(&Upload::from_path(&input)?, &password)?, output)
        }
        Command::Info { input } => print_json(&toolkit.pdf_info(&Upload::from_path(&input)?)?),
        Command::Thumbnails { input } => print_json(&toolkit.thumbnails(&Upload::from_path(&input)?)?),
        Command::PreviewRotation { input, angle, pages } => {
            let options = cli::preview_rotation_options(angle, &pages);
            print_json(&toolkit.preview_rotation(&Upload::from_path(&input)?, &options)?)
        }
        Command::ImagesToPdf { inputs, page_size, title, output } => {
            let options = cli::images_to_pdf_options(&page_size, title)?;
            let uploads = inputs.iter().map(Upload::from_path).collect::<Result<Vec<_>>>()?;
            save(&toolkit, toolkit.images_to_pdf(&uploads, &options)?, output)
        }
        Command::PdfToImages { input, quality, pages, output } => {
            let options = cli::pdf_to_images_options(&quality, &pages);
            save(&toolkit, toolkit.pdf_to_images(&Upload::from_path(&input)?, &options)?, output)
        }
        Command::OfficeToPdf { input, output } => {
            let delivery = toolkit.office_to_pdf(&Upload::from_path(&input)?).await?;
            save(&toolkit, delivery, output)
        }
        Command::PdfToPdfa { input, level, output } => {
            let options = cli::pdfa_options(&level)?;
            let delivery = toolkit.pdf_to_pdfa(&Upload::from_path(&input)?, &options).await?;
            save(&toolkit, delivery, output)
        }
        Command::CleanTemp => print_json(&toolkit.clean_temp()?),
        Command::SystemInfo => print_json(&toolkit.system_info()),
        Command::InitConfig { .. } => Ok(()),
    }
}

/// Copy the result to `output` (or the suggested name in the working
/// directory), then settle the request's cleanup before the process exits.
fn save(toolkit: &Toolkit, delivery: Delivery, output: Option<PathBuf>) -> Result<()> {
    let target = output.unwrap_or_else(|| PathBuf::from(&delivery.download_name));
    let copied = copy_out(delivery.path(), &target);
    toolkit.complete(&delivery, if copied.is_ok() { 200 } else { 500 });
    toolkit.flush();

    let bytes = copied?;
    info!(
        output = %target.display(),
        bytes,
        skipped = delivery.report.skipped_count(),
        failed = delivery.report.failed_count(),
        "result written"
    );
    println!("{}", target.display());
    Ok(())
}

fn copy_out(from: &Path, to: &Path) -> Result<u64> {
    if let Some(parent) = to.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(std::fs::copy(from, to)?)
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
