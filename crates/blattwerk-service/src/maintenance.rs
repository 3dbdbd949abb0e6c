// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Host and artifact-directory reports: converter availability, temp
// directory health, and the result of a full purge.

use std::path::{Path, PathBuf};

use blattwerk_artifacts::CleanupReport;
use blattwerk_core::ToolkitConfig;
use blattwerk_core::types::RequestId;
use blattwerk_document::external::discovery;
use serde::Serialize;
use tracing::debug;

/// Executable names tried on `PATH` for the office converter.
pub const OFFICE_BINARIES: &[&str] = &["soffice", "libreoffice"];

/// Executable names tried on `PATH` for the PostScript converter.
pub const POSTSCRIPT_BINARIES: &[&str] = &["gs", "gswin64c", "gswin32c"];

// ---------------------------------------------------------------------------
// Purge
// ---------------------------------------------------------------------------

/// Outcome of emptying the artifact directory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TempCleanup {
    pub deleted_files: usize,
    pub freed_bytes: u64,
    pub freed_kb: f64,
}

impl From<CleanupReport> for TempCleanup {
    fn from(report: CleanupReport) -> Self {
        Self {
            deleted_files: report.deleted_files,
            freed_bytes: report.freed_bytes,
            freed_kb: report.freed_kb(),
        }
    }
}

// ---------------------------------------------------------------------------
// System report
// ---------------------------------------------------------------------------

/// Whether an external converter can be run, and from where.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    pub available: bool,
    pub path: Option<PathBuf>,
}

impl ToolStatus {
    pub fn detect(candidates: &[PathBuf], names: &[&str]) -> Self {
        let path = discovery::locate(candidates, names);
        Self {
            available: path.is_some(),
            path,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Services {
    /// Office documents to PDF.
    pub document_conversion: ToolStatus,
    /// PDF to PDF/A.
    pub pdf_conversion: ToolStatus,
    /// Page rendering backend for thumbnails and page images.
    pub rendering: Option<&'static str>,
}

/// State of the shared artifact directory.
#[derive(Debug, Clone, Serialize)]
pub struct TempDirStatus {
    pub path: PathBuf,
    pub exists: bool,
    pub writable: bool,
    pub files: usize,
    pub bytes: u64,
    /// Artifacts the ledger is currently tracking.
    pub tracked_artifacts: usize,
}

impl TempDirStatus {
    pub fn inspect(path: &Path, tracked_artifacts: usize) -> Self {
        let (files, bytes) = directory_usage(path);
        Self {
            path: path.to_path_buf(),
            exists: path.is_dir(),
            writable: is_writable(path),
            files,
            bytes,
            tracked_artifacts,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub sweep_interval_secs: u64,
    pub max_artifact_age_secs: u64,
    pub tool_timeout_secs: u64,
    pub cleanup_delays_secs: [u64; 3],
    pub thumbnail_scale: f32,
    pub thumbnail_quality: u8,
}

impl From<&ToolkitConfig> for ConfigSummary {
    fn from(config: &ToolkitConfig) -> Self {
        let delays = &config.cleanup_delays;
        Self {
            sweep_interval_secs: config.sweep_interval_secs,
            max_artifact_age_secs: config.max_artifact_age_secs,
            tool_timeout_secs: config.tool_timeout_secs,
            cleanup_delays_secs: [delays.short_secs, delays.standard_secs, delays.long_secs],
            thumbnail_scale: config.thumbnail_scale,
            thumbnail_quality: config.thumbnail_quality,
        }
    }
}

/// Everything `system_info` reports.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub os: &'static str,
    pub services: Services,
    pub temp_dir: TempDirStatus,
    pub config: ConfigSummary,
}

impl SystemInfo {
    pub fn gather(config: &ToolkitConfig, root: &Path, tracked_artifacts: usize, rendering: Option<&'static str>) -> Self {
        let info = Self {
            name: "blattwerk",
            version: env!("CARGO_PKG_VERSION"),
            os: std::env::consts::OS,
            services: Services {
                document_conversion: ToolStatus::detect(&config.office_candidates, OFFICE_BINARIES),
                pdf_conversion: ToolStatus::detect(&config.postscript_candidates, POSTSCRIPT_BINARIES),
                rendering,
            },
            temp_dir: TempDirStatus::inspect(root, tracked_artifacts),
            config: ConfigSummary::from(config),
        };
        debug!(
            office = info.services.document_conversion.available,
            postscript = info.services.pdf_conversion.available,
            files = info.temp_dir.files,
            "system report gathered"
        );
        info
    }
}

fn directory_usage(path: &Path) -> (usize, u64) {
    let Ok(entries) = std::fs::read_dir(path) else {
        return (0, 0);
    };
    entries
        .flatten()
        .filter_map(|entry| entry.metadata().ok())
        .filter(|meta| meta.is_file())
        .fold((0, 0), |(files, bytes), meta| (files + 1, bytes + meta.len()))
}

/// Create and remove a scratch file.
fn is_writable(path: &Path) -> bool {
    let scratch = path.join(format!(".write-check-{}", RequestId::new()));
    let created = std::fs::OpenOptions::new().write(true).create_new(true).open(&scratch).is_ok();
    if created {
        let _ = std::fs::remove_file(&scratch);
    }
    created
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_dir_counts_files_and_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("a"), [0u8; 10]).expect("write");
        std::fs::write(dir.path().join("b"), [0u8; 32]).expect("write");
        std::fs::create_dir(dir.path().join("nested")).expect("mkdir");

        let status = TempDirStatus::inspect(dir.path(), 2);
        assert!(status.exists);
        assert!(status.writable);
        assert_eq!(status.files, 2);
        assert_eq!(status.bytes, 42);
        // the scratch file must not linger
        assert_eq!(std::fs::read_dir(dir.path()).expect("read").count(), 3);
    }

    #[test]
    fn missing_temp_dir_is_reported_not_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let status = TempDirStatus::inspect(&dir.path().join("gone"), 0);
        assert!(!status.exists);
        assert!(!status.writable);
        assert_eq!((status.files, status.bytes), (0, 0));
    }

    #[cfg(unix)]
    #[test]
    fn configured_tool_is_found() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let tool = dir.path().join("fake-soffice");
        std::fs::write(&tool, "#!/bin/sh\n").expect("write");
        std::fs::set_permissions(&tool, std::fs::Permissions::from_mode(0o755)).expect("chmod");

        let status = ToolStatus::detect(&[tool.clone()], &[]);
        assert_eq!(status, ToolStatus { available: true, path: Some(tool) });
    }

    #[test]
    fn purge_report_carries_kilobytes() {
        let cleanup = TempCleanup::from(CleanupReport { deleted_files: 3, freed_bytes: 3072 });
        assert_eq!(cleanup.deleted_files, 3);
        assert_eq!(cleanup.freed_kb, 3.0);
    }
}
