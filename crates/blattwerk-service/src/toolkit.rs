// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request layer: wires the artifact ledger and cleanup scheduler around every
// document operation.
//
// Each call follows the same shape. Options and filenames are validated
// before anything touches disk. The sweep gets its chance to run, inputs are
// written through the ledger, the operation runs, and the result is written
// back as an output artifact. A failure after the first write deletes the
// request's files on the spot; a successful result waits for `complete`,
// which schedules deferred cleanup once the caller has the response.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use blattwerk_artifacts::naming::{self, OutputName};
use blattwerk_artifacts::{ArtifactLedger, CleanupReport, CleanupScheduler, Clock, SystemClock};
use blattwerk_core::config::DelayClass;
use blattwerk_core::error::{BlattwerkError, Result};
use blattwerk_core::status::StatusClass;
use blattwerk_core::types::{Artifact, ArtifactRole, DocumentKind, RequestId, UnitReport};
use blattwerk_core::{ToolkitConfig, ValidationError};
use blattwerk_document::compress::{self, SizeReport, policy};
use blattwerk_document::external::{self, discovery, office};
use blattwerk_document::layout::{NumberingScheme, page_range};
use blattwerk_document::pdf::{Signature, crop, security, stamp};
use blattwerk_document::raster::{self, PageRasterizer, RotatedThumbnail, Thumbnail};
use blattwerk_document::{PdfReader, PdfWriter};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::archive::{self, Entry};
use crate::maintenance::{OFFICE_BINARIES, POSTSCRIPT_BINARIES, SystemInfo, TempCleanup};
use crate::options::{
    CompressOptions, CropOptions, ImagesToPdfOptions, PageNumberOptions, PdfToImagesOptions, PdfaOptions,
    PreviewRotationOptions, ReorderOptions, RotateOptions, SignOptions, SignatureContent, SplitOptions,
    WatermarkContent, WatermarkOptions,
};

/// Resolution pages are rendered at for image export.
pub const EXPORT_DPI: f32 = 300.0;

/// A file handed in by the caller.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub data: Vec<u8>,
}

impl Upload {
    pub fn new(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            data,
        }
    }

    /// Read a local file, keeping its basename as the upload name.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self { filename, data })
    }

    fn safe_name(&self) -> String {
        naming::secure_filename(&self.filename)
    }
}

/// A finished result waiting to be sent.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub request: RequestId,
    /// The output artifact holding the response body.
    pub artifact: Artifact,
    /// Name the caller should save the result under.
    pub download_name: String,
    /// How long the request's files outlive a successful response.
    pub delay: DelayClass,
    /// Per-unit outcome for operations that work page by page or image by
    /// image.
    pub report: UnitReport,
}

impl Delivery {
    pub fn path(&self) -> &Path {
        &self.artifact.path
    }
}

/// `pdf_info` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PdfInfo {
    pub page_count: usize,
    pub filename: String,
    pub filesize: u64,
}

/// `thumbnails` result.
#[derive(Debug, Clone, Serialize)]
pub struct ThumbnailSheet {
    pub page_count: usize,
    pub thumbnails: Vec<Thumbnail>,
}

/// `preview_rotation` result.
#[derive(Debug, Clone, Serialize)]
pub struct RotationPreview {
    pub page_count: usize,
    /// Clockwise degrees the marked pages were turned by.
    pub angle: i64,
    pub thumbnails: Vec<RotatedThumbnail>,
}

/// Watermark or signature source resolved before the request opens.
enum Mark<'a> {
    Text(&'a str),
    Image(&'a Upload),
}

/// Shared toolkit handle. Cloning is cheap; every clone sees the same ledger
/// and scheduler.
#[derive(Clone)]
pub struct Toolkit {
    config: Arc<ToolkitConfig>,
    ledger: ArtifactLedger,
    scheduler: CleanupScheduler,
    rasterizer: Option<Arc<dyn PageRasterizer>>,
}

impl Toolkit {
    /// Open the artifact directory with the host clock and, when built with
    /// rendering support, bind the page renderer.
    pub fn init(config: ToolkitConfig) -> Result<Self> {
        let toolkit = Self::with_clock(config, Arc::new(SystemClock))?;

        #[cfg(feature = "pdfium")]
        let toolkit = match blattwerk_document::PdfiumRasterizer::new() {
            Ok(rasterizer) => toolkit.with_rasterizer(Arc::new(rasterizer)),
            Err(err) => {
                warn!(%err, "page rendering unavailable, thumbnails and page images disabled");
                toolkit
            }
        };

        Ok(toolkit)
    }

    pub fn with_clock(config: ToolkitConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        info!(temp_dir = %config.temp_dir.display(), "initialising toolkit");
        let ledger = ArtifactLedger::open(&config.temp_dir, clock)?;
        let scheduler = CleanupScheduler::new(ledger.clone(), config.sweep_interval(), config.max_artifact_age());
        Ok(Self {
            config: Arc::new(config),
            ledger,
            scheduler,
            rasterizer: None,
        })
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn PageRasterizer>) -> Self {
        info!(backend = rasterizer.name(), "page renderer attached");
        self.rasterizer = Some(rasterizer);
        self
    }

    pub fn config(&self) -> &ToolkitConfig {
        &self.config
    }

    pub fn ledger(&self) -> &ArtifactLedger {
        &self.ledger
    }

    pub fn scheduler(&self) -> &CleanupScheduler {
        &self.scheduler
    }

    // -- Request scope -------------------------------------------------------

    /// Give the sweep its chance, then open a request.
    fn begin(&self, operation: &'static str) -> RequestId {
        if let Some(report) = self.scheduler.maybe_sweep() {
            debug!(deleted = report.deleted_files, "sweep ran on inbound request");
        }
        let request = RequestId::new();
        debug!(%request, operation, "request opened");
        request
    }

    fn guarded<T>(&self, request: RequestId, work: impl FnOnce() -> Result<T>) -> Result<T> {
        work().inspect_err(|err| self.abort(request, err))
    }

    async fn guarded_async<T>(&self, request: RequestId, work: impl Future<Output = Result<T>>) -> Result<T> {
        work.await.inspect_err(|err| self.abort(request, err))
    }

    fn abort(&self, request: RequestId, err: &BlattwerkError) {
        let report = self.scheduler.cleanup_now(request);
        warn!(%request, %err, deleted = report.deleted_files, "operation failed, request artifacts removed");
    }

    fn store_input(&self, request: RequestId, upload: &Upload) -> Result<Artifact> {
        self.ledger.write(request, &upload.filename, ArtifactRole::Input, &upload.data)
    }

    fn deliver(
        &self,
        request: RequestId,
        download_name: String,
        data: &[u8],
        delay: DelayClass,
        report: UnitReport,
    ) -> Result<Delivery> {
        let artifact = self.ledger.write(request, &download_name, ArtifactRole::Output, data)?;
        info!(%request, output = %download_name, size = artifact.size, "result ready");
        Ok(Delivery {
            request,
            artifact,
            download_name,
            delay,
            report,
        })
    }

    /// Report how sending `delivery` went. A success-range status schedules
    /// the request's deferred cleanup; anything else removes its files now.
    pub fn complete(&self, delivery: &Delivery, status: u16) {
        if StatusClass::is_success(status) {
            let delay = self.config.cleanup_delays.for_class(delivery.delay);
            self.scheduler.schedule_deferred(delivery.request, delay);
        } else {
            warn!(request = %delivery.request, status, "response not delivered, cleaning up now");
            self.scheduler.cleanup_now(delivery.request);
        }
    }

    /// Run every waiting deferred cleanup immediately.
    pub fn flush(&self) -> CleanupReport {
        self.scheduler.flush()
    }

    fn rasterizer(&self) -> Result<&dyn PageRasterizer> {
        self.rasterizer
            .as_deref()
            .ok_or_else(|| BlattwerkError::ToolUnavailable("no page renderer is configured".into()))
    }

    // -- Page sets -----------------------------------------------------------

    /// Split into one document per page or per range, zipped.
    #[instrument(skip_all, fields(file = %upload.filename))]
    pub fn split(&self, upload: &Upload, options: &SplitOptions) -> Result<Delivery> {
        require_pdf(upload)?;
        let request = self.begin("split");
        self.guarded(request, || {
            let input = self.store_input(request, upload)?;
            let reader = PdfReader::open(&input.path)?;
            let name = upload.safe_name();

            let parts: Vec<Entry> = match options {
                SplitOptions::All => reader
                    .split_each()?
                    .into_iter()
                    .enumerate()
                    .map(|(index, bytes)| Entry::new(OutputName::SplitPage(index + 1).render(&name), bytes))
                    .collect(),
                SplitOptions::Range { ranges } => {
                    let spans = page_range::clamp_spans(ranges, reader.page_count())?;
                    let documents = reader.split_spans(&spans)?;
                    spans
                        .iter()
                        .zip(documents)
                        .map(|(&(first, last), bytes)| {
                            Entry::new(OutputName::SplitRange(first + 1, last + 1).render(&name), bytes)
                        })
                        .collect()
                }
            };

            let mut report = UnitReport::new();
            for part in &parts {
                self.ledger.write(request, &part.name, ArtifactRole::Intermediate, &part.data)?;
                report.done(part.name.as_str());
            }
            let zip = archive::pack(&parts)?;
            info!(parts = parts.len(), "document split");
            self.deliver(request, OutputName::SplitArchive.render(&name), &zip, DelayClass::Standard, report)
        })
    }

    /// Concatenate two or more documents in the order given.
    #[instrument(skip_all, fields(files = uploads.len()))]
    pub fn merge(&self, uploads: &[Upload]) -> Result<Delivery> {
        if uploads.len() < 2 {
            return Err(ValidationError::MissingInput("merging needs at least two PDF files".into()).into());
        }
        for upload in uploads {
            require_pdf(upload)?;
        }

        let request = self.begin("merge");
        self.guarded(request, || {
            let mut report = UnitReport::new();
            let mut documents = Vec::with_capacity(uploads.len());
            for upload in uploads {
                let input = self.store_input(request, upload)?;
                documents.push(self.ledger.read(input.id)?);
                report.done(upload.filename.as_str());
            }
            let slices: Vec<&[u8]> = documents.iter().map(Vec::as_slice).collect();
            let merged = PdfReader::merge(&slices)?;
            self.deliver(request, OutputName::Merged.render(""), &merged, DelayClass::Standard, report)
        })
    }

    /// Reorder pages. `order` must name every page exactly once.
    #[instrument(skip_all, fields(file = %upload.filename))]
    pub fn reorder(&self, upload: &Upload, options: &ReorderOptions) -> Result<Delivery> {
        require_pdf(upload)?;
        if options.order.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }
        let request = self.begin("reorder");
        self.guarded(request, || {
            let input = self.store_input(request, upload)?;
            let reader = PdfReader::open(&input.path)?;
            let order = page_range::validate_order(&options.order, reader.page_count())?;
            let bytes = reader.reorder(&order)?;
            let name = OutputName::Reordered.render(&upload.safe_name());
            self.deliver(request, name, &bytes, DelayClass::Long, UnitReport::new())
        })
    }

    // -- Geometry ------------------------------------------------------------

    #[instrument(skip_all, fields(file = %upload.filename, angle = options.angle))]
    pub fn rotate(&self, upload: &Upload, options: &RotateOptions) -> Result<Delivery> {
        require_pdf(upload)?;
        options.validate()?;
        let request = self.begin("rotate");
        self.guarded(request, || {
            let input = self.store_input(request, upload)?;
            let reader = PdfReader::open(&input.path)?;
            let selection = options.pages.resolve(reader.page_count())?;
            let bytes = reader.rotate(&selection, options.angle)?;

            let mut report = UnitReport::new();
            for index in selection.iter() {
                report.done(format!("page {}", index + 1));
            }
            let name = OutputName::Rotated.render(&upload.safe_name());
            self.deliver(request, name, &bytes, DelayClass::Long, report)
        })
    }

    #[instrument(skip_all, fields(file = %upload.filename))]
    pub fn crop(&self, upload: &Upload, options: &CropOptions) -> Result<Delivery> {
        require_pdf(upload)?;
        options.validate()?;
        let request = self.begin("crop");
        self.guarded(request, || {
            let input = self.store_input(request, upload)?;
            let reader = PdfReader::open(&input.path)?;
            let selection = options.pages.resolve(reader.page_count())?;
            let output = crop::crop(&reader, &selection, &options.spec)?;
            let name = OutputName::Cropped.render(&upload.safe_name());
            self.deliver(request, name, &output.bytes, DelayClass::Long, output.report)
        })
    }

    // -- Overlays ------------------------------------------------------------

    /// Stamp text or an image on every page. Image watermarks take the
    /// picture from `image`.
    #[instrument(skip_all, fields(file = %upload.filename))]
    pub fn watermark(&self, upload: &Upload, options: &WatermarkOptions, image: Option<&Upload>) -> Result<Delivery> {
        require_pdf(upload)?;
        options.validate()?;
        let mark = match (&options.content, image) {
            (WatermarkContent::Text { text }, _) => Mark::Text(text),
            (WatermarkContent::Image, Some(image)) => Mark::Image(image),
            (WatermarkContent::Image, None) => {
                return Err(ValidationError::MissingInput("watermark image".into()).into());
            }
        };

        let request = self.begin("watermark");
        self.guarded(request, || {
            let input = self.store_input(request, upload)?;
            let reader = PdfReader::open(&input.path)?;
            let style = options.style();
            let output = match mark {
                Mark::Text(text) => stamp::watermark_text(&reader, text, &style)?,
                Mark::Image(image) => {
                    let stored = self.store_input(request, image)?;
                    stamp::watermark_image(&reader, &self.ledger.read(stored.id)?, &style)?
                }
            };
            let name = OutputName::Watermarked.render(&upload.safe_name());
            self.deliver(request, name, &output.bytes, DelayClass::Long, output.report)
        })
    }

    #[instrument(skip_all, fields(file = %upload.filename, style = ?options.style))]
    pub fn page_numbers(&self, upload: &Upload, options: &PageNumberOptions) -> Result<Delivery> {
        require_pdf(upload)?;
        options.validate()?;
        let request = self.begin("page_numbers");
        self.guarded(request, || {
            let input = self.store_input(request, upload)?;
            let reader = PdfReader::open(&input.path)?;
            let scheme = NumberingScheme {
                starting_number: options.starting_number,
                exclude_first_page: options.exclude_first_page,
                style: options.style,
                page_count: reader.page_count(),
            };
            let output = stamp::page_numbers(&reader, &scheme, &options.layout())?;
            let name = OutputName::Numbered.render(&upload.safe_name());
            self.deliver(request, name, &output.bytes, DelayClass::Short, output.report)
        })
    }

    /// Sign the last page with a typed name or a drawn picture. Drawn
    /// signatures take the picture from `image`.
    #[instrument(skip_all, fields(file = %upload.filename, position = ?options.position))]
    pub fn sign(&self, upload: &Upload, options: &SignOptions, image: Option<&Upload>) -> Result<Delivery> {
        require_pdf(upload)?;
        options.validate()?;
        let mark = match (&options.content, image) {
            (SignatureContent::Text { name }, _) => Mark::Text(name),
            (SignatureContent::Draw, Some(image)) => Mark::Image(image),
            (SignatureContent::Draw, None) => {
                return Err(ValidationError::MissingInput("signature image".into()).into());
            }
        };

        let request = self.begin("sign");
        self.guarded(request, || {
            let input = self.store_input(request, upload)?;
            let reader = PdfReader::open(&input.path)?;
            let output = match mark {
                Mark::Text(name) => stamp::sign(&reader, Signature::Text(name), options.position)?,
                Mark::Image(image) => {
                    let stored = self.store_input(request, image)?;
                    let picture = self.ledger.read(stored.id)?;
                    stamp::sign(&reader, Signature::Image(&picture), options.position)?
                }
            };
            let name = OutputName::Signed.render(&upload.safe_name());
            self.deliver(request, name, &output.bytes, DelayClass::Long, output.report)
        })
    }

    // -- Size and security ---------------------------------------------------

    /// Recompress. The returned sizes describe the delivered bytes, which are
    /// the original ones whenever recompression did not help.
    #[instrument(skip_all, fields(file = %upload.filename, tier = ?options.tier))]
    pub fn compress(&self, upload: &Upload, options: &CompressOptions) -> Result<(Delivery, SizeReport)> {
        require_pdf(upload)?;
        let request = self.begin("compress");
        self.guarded(request, || {
            let input = self.store_input(request, upload)?;
            let data = self.ledger.read(input.id)?;
            let outcome = compress::compress_pdf(&data, &policy::select(options.tier))?;
            let name = OutputName::Compressed.render(&upload.safe_name());
            let delivery = self.deliver(request, name, &outcome.bytes, DelayClass::Standard, outcome.images)?;
            Ok((delivery, outcome.sizes))
        })
    }

    #[instrument(skip_all, fields(file = %upload.filename))]
    pub fn protect(&self, upload: &Upload, password: &str) -> Result<Delivery> {
        require_pdf(upload)?;
        require_password(password)?;
        let request = self.begin("protect");
        self.guarded(request, || {
            let input = self.store_input(request, upload)?;
            let bytes = security::protect(&self.ledger.read(input.id)?, password)?;
            let name = OutputName::Protected.render(&upload.safe_name());
            self.deliver(request, name, &bytes, DelayClass::Short, UnitReport::new())
        })
    }

    #[instrument(skip_all, fields(file = %upload.filename))]
    pub fn unlock(&self, upload: &Upload, password: &str) -> Result<Delivery> {
        require_pdf(upload)?;
        require_password(password)?;
        let request = self.begin("unlock");
        self.guarded(request, || {
            let input = self.store_input(request, upload)?;
            let bytes = security::unlock(&self.ledger.read(input.id)?, password)?;
            let name = OutputName::Unlocked.render(&upload.safe_name());
            self.deliver(request, name, &bytes, DelayClass::Short, UnitReport::new())
        })
    }

    // -- Inspection ----------------------------------------------------------

    /// Page count and size. Nothing outlives the call.
    #[instrument(skip_all, fields(file = %upload.filename))]
    pub fn pdf_info(&self, upload: &Upload) -> Result<PdfInfo> {
        require_pdf(upload)?;
        let request = self.begin("pdf_info");
        let info = self.guarded(request, || {
            let input = self.store_input(request, upload)?;
            let reader = PdfReader::open(&input.path)?;
            Ok(PdfInfo {
                page_count: reader.page_count(),
                filename: upload.filename.clone(),
                filesize: input.size,
            })
        })?;
        self.scheduler.cleanup_now(request);
        Ok(info)
    }

    /// JPEG data-URI previews of every page at the configured scale.
    #[instrument(skip_all, fields(file = %upload.filename))]
    pub fn thumbnails(&self, upload: &Upload) -> Result<ThumbnailSheet> {
        require_pdf(upload)?;
        let rasterizer = self.rasterizer()?;
        let request = self.begin("thumbnails");
        let sheet = self.guarded(request, || {
            let input = self.store_input(request, upload)?;
            let reader = PdfReader::open(&input.path)?;
            let page_count = reader.page_count();
            let thumbnails = raster::thumbnails(
                rasterizer,
                &self.ledger.read(input.id)?,
                page_count,
                self.config.thumbnail_scale,
                self.config.thumbnail_quality,
            )?;
            Ok(ThumbnailSheet { page_count, thumbnails })
        })?;
        self.scheduler.cleanup_now(request);
        Ok(sheet)
    }

    /// Thumbnails of every page with the selected ones turned by the
    /// requested angle. The document itself is not changed or kept.
    #[instrument(skip_all, fields(file = %upload.filename, angle = options.angle))]
    pub fn preview_rotation(&self, upload: &Upload, options: &PreviewRotationOptions) -> Result<RotationPreview> {
        require_pdf(upload)?;
        options.validate()?;
        let rasterizer = self.rasterizer()?;
        let request = self.begin("preview_rotation");
        let preview = self.guarded(request, || {
            let input = self.store_input(request, upload)?;
            let reader = PdfReader::open(&input.path)?;
            let page_count = reader.page_count();
            let selection = options.pages.resolve(page_count)?;
            let thumbnails = raster::rotation_preview(
                rasterizer,
                &self.ledger.read(input.id)?,
                page_count,
                &selection,
                options.angle,
                self.config.thumbnail_scale,
                self.config.thumbnail_quality,
            )?;
            Ok(RotationPreview {
                page_count,
                angle: options.angle,
                thumbnails,
            })
        })?;
        self.scheduler.cleanup_now(request);
        Ok(preview)
    }

    // -- Conversions ---------------------------------------------------------

    /// One page per image, in the order given.
    #[instrument(skip_all, fields(images = images.len(), page_size = ?options.page_size))]
    pub fn images_to_pdf(&self, images: &[Upload], options: &ImagesToPdfOptions) -> Result<Delivery> {
        if images.is_empty() {
            return Err(ValidationError::MissingInput("no images were provided".into()).into());
        }
        let request = self.begin("images_to_pdf");
        self.guarded(request, || {
            for image in images {
                self.store_input(request, image)?;
            }
            let mut writer = PdfWriter::new(options.page_size);
            writer.set_title(options.title.as_str());
            let named: Vec<(&str, &[u8])> = images
                .iter()
                .map(|image| (image.filename.as_str(), image.data.as_slice()))
                .collect();
            let output = writer.create_from_images(&named)?;
            self.deliver(request, naming::titled_pdf(&options.title), &output.bytes, DelayClass::Long, output.report)
        })
    }

    /// Render selected pages at 300 dpi and zip them as `page_<n>.jpg`.
    #[instrument(skip_all, fields(file = %upload.filename, quality = ?options.quality))]
    pub fn pdf_to_images(&self, upload: &Upload, options: &PdfToImagesOptions) -> Result<Delivery> {
        require_pdf(upload)?;
        let rasterizer = self.rasterizer()?;
        let request = self.begin("pdf_to_images");
        self.guarded(request, || {
            let input = self.store_input(request, upload)?;
            let reader = PdfReader::open(&input.path)?;
            let selection = options.pages.resolve(reader.page_count())?;
            let pages = raster::page_images(
                rasterizer,
                &self.ledger.read(input.id)?,
                &selection,
                EXPORT_DPI,
                options.quality.jpeg_quality(),
            )?;

            let mut report = UnitReport::new();
            let entries: Vec<Entry> = pages
                .into_iter()
                .map(|page| {
                    let name = OutputName::PageImage(page.page_num).render("");
                    report.done(name.as_str());
                    Entry::new(name, page.jpeg)
                })
                .collect();
            let zip = archive::pack(&entries)?;
            let name = OutputName::ImageArchive.render(&upload.safe_name());
            self.deliver(request, name, &zip, DelayClass::Long, report)
        })
    }

    /// Convert an office document with the office converter.
    #[instrument(skip_all, fields(file = %upload.filename))]
    pub async fn office_to_pdf(&self, upload: &Upload) -> Result<Delivery> {
        office::check_extension(&upload.filename)?;
        let soffice = discovery::locate(&self.config.office_candidates, OFFICE_BINARIES)
            .ok_or_else(|| BlattwerkError::ToolUnavailable("office converter (LibreOffice) not found".into()))?;

        let request = self.begin("office_to_pdf");
        self.guarded_async(request, async {
            let input = self.store_input(request, upload)?;
            let download_name = OutputName::Office.render(&upload.safe_name());
            let slot = self
                .ledger
                .reserve_path(request, office::output_path(&input.path, self.ledger.root())?);
            let produced =
                external::office_to_pdf(&soffice, &input.path, self.ledger.root(), self.config.tool_timeout()).await?;
            let artifact = self.ledger.register(slot.id, &produced, ArtifactRole::Output)?;
            Ok(Delivery {
                request,
                artifact,
                download_name,
                delay: DelayClass::Standard,
                report: UnitReport::new(),
            })
        })
        .await
    }

    /// Convert to an archival PDF/A profile with the PostScript converter.
    #[instrument(skip_all, fields(file = %upload.filename, level = options.level.as_str()))]
    pub async fn pdf_to_pdfa(&self, upload: &Upload, options: &PdfaOptions) -> Result<Delivery> {
        require_pdf(upload)?;
        let gs = discovery::locate(&self.config.postscript_candidates, POSTSCRIPT_BINARIES)
            .ok_or_else(|| BlattwerkError::ToolUnavailable("PostScript converter (Ghostscript) not found".into()))?;

        let request = self.begin("pdf_to_pdfa");
        self.guarded_async(request, async {
            let input = self.store_input(request, upload)?;
            let download_name = OutputName::PdfA.render(&upload.safe_name());
            let slot = self.ledger.mint(request, &download_name);
            external::pdf_to_pdfa(&gs, &input.path, &slot.path, options.level, self.config.tool_timeout()).await?;
            let artifact = self.ledger.register(slot.id, &slot.path, ArtifactRole::Output)?;
            Ok(Delivery {
                request,
                artifact,
                download_name,
                delay: DelayClass::Long,
                report: UnitReport::new(),
            })
        })
        .await
    }

    // -- Maintenance ---------------------------------------------------------

    /// Delete every file in the artifact directory, whatever its age.
    pub fn clean_temp(&self) -> Result<TempCleanup> {
        let cleanup = TempCleanup::from(self.scheduler.purge()?);
        info!(deleted = cleanup.deleted_files, freed_kb = cleanup.freed_kb, "temporary files cleaned");
        Ok(cleanup)
    }

    pub fn system_info(&self) -> SystemInfo {
        self.scheduler.maybe_sweep();
        SystemInfo::gather(
            &self.config,
            self.ledger.root(),
            self.ledger.len(),
            self.rasterizer.as_ref().map(|r| r.name()),
        )
    }
}

fn require_pdf(upload: &Upload) -> Result<()> {
    if upload.filename.trim().is_empty() {
        return Err(ValidationError::MissingInput("no file was selected".into()).into());
    }
    if DocumentKind::from_filename(&upload.filename) != Some(DocumentKind::Pdf) {
        return Err(ValidationError::WrongExtension {
            filename: upload.filename.clone(),
            expected: "pdf".into(),
        }
        .into());
    }
    if upload.data.is_empty() {
        return Err(ValidationError::MissingInput(format!("{} is empty", upload.filename)).into());
    }
    Ok(())
}

fn require_password(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(ValidationError::MissingInput("password".into()).into());
    }
    Ok(())
}
