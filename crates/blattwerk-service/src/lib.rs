// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-service: the operation surface.
//
// `Toolkit` is the one handle callers hold. It validates options, scopes
// every file an operation writes to a request, and hands results back as
// deliveries whose cleanup runs once the caller reports the response sent.

pub mod archive;
pub mod maintenance;
pub mod options;
pub mod toolkit;

pub use maintenance::{SystemInfo, TempCleanup};
pub use options::{
    CompressOptions, CropOptions, ImageQuality, ImagesToPdfOptions, PageNumberOptions, PageTarget,
    PdfToImagesOptions, PdfaOptions, PreviewRotationOptions, ReorderOptions, RotateOptions, SignOptions,
    SignatureContent, SplitOptions, WatermarkContent, WatermarkOptions,
};
pub use toolkit::{Delivery, PdfInfo, RotationPreview, ThumbnailSheet, Toolkit, Upload};
