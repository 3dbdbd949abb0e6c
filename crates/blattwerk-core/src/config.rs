// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Toolkit configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Result;

/// How long an operation's artifacts survive after a successful response.
///
/// Operations that return large or slow-to-stream results get more time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DelayClass {
    /// Page numbers, protect, unlock.
    Short,
    /// Split, merge, compress, office conversion.
    Standard,
    /// Crop, watermark, sign, rotate, reorder, PDF/A, image conversions.
    Long,
}

/// Grace delays applied by the deferred cleanup path, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupDelays {
    pub short_secs: u64,
    pub standard_secs: u64,
    pub long_secs: u64,
}

impl Default for CleanupDelays {
    fn default() -> Self {
        Self {
            short_secs: 1,
            standard_secs: 2,
            long_secs: 5,
        }
    }
}

impl CleanupDelays {
    pub fn for_class(&self, class: DelayClass) -> Duration {
        let secs = match class {
            DelayClass::Short => self.short_secs,
            DelayClass::Standard => self.standard_secs,
            DelayClass::Long => self.long_secs,
        };
        Duration::from_secs(secs)
    }
}

/// Settings for the whole toolkit. Every field has a default so a partial
/// JSON file is enough to override one value.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolkitConfig {
    /// Shared directory holding every artifact.
    pub temp_dir: PathBuf,
    /// Minimum time between two sweep passes.
    pub sweep_interval_secs: u64,
    /// Artifacts older than this are removed by the sweep.
    pub max_artifact_age_secs: u64,
    /// Per-operation grace delays for deferred cleanup.
    pub cleanup_delays: CleanupDelays,
    /// Wall-clock budget for one external converter run.
    pub tool_timeout_secs: u64,
    /// Extra locations searched for the office converter before `PATH`.
    pub office_candidates: Vec<PathBuf>,
    /// Extra locations searched for the PostScript converter before `PATH`.
    pub postscript_candidates: Vec<PathBuf>,
    /// Scale factor applied to page size when rendering thumbnails.
    pub thumbnail_scale: f32,
    /// JPEG quality used for thumbnails.
    pub thumbnail_quality: u8,
}

impl Default for ToolkitConfig {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir().join("blattwerk"),
            sweep_interval_secs: 300,
            max_artifact_age_secs: 1800,
            cleanup_delays: CleanupDelays::default(),
            tool_timeout_secs: 120,
            office_candidates: vec![
                PathBuf::from("/usr/bin/soffice"),
                PathBuf::from("/usr/bin/libreoffice"),
                PathBuf::from("/usr/local/bin/soffice"),
                PathBuf::from("/opt/libreoffice/program/soffice"),
                PathBuf::from("/Applications/LibreOffice.app/Contents/MacOS/soffice"),
                PathBuf::from("C:\\Program Files\\LibreOffice\\program\\soffice.exe"),
            ],
            postscript_candidates: vec![
                PathBuf::from("/usr/bin/gs"),
                PathBuf::from("/usr/local/bin/gs"),
                PathBuf::from("/opt/homebrew/bin/gs"),
                PathBuf::from("C:\\Program Files\\gs\\gs10.02.1\\bin\\gswin64c.exe"),
            ],
            thumbnail_scale: 0.3,
            thumbnail_quality: 70,
        }
    }
}

impl ToolkitConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn max_artifact_age(&self) -> Duration {
        Duration::from_secs(self.max_artifact_age_secs)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    /// Load settings from a JSON file. Missing keys keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&data)?;
        info!(path = %path.display(), temp_dir = %config.temp_dir.display(), "configuration loaded");
        Ok(config)
    }

    /// Load from `path` when given and present, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                debug!(path = %path.display(), "configuration file not found, using defaults");
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Write the settings as pretty JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_observed_schedule() {
        let config = ToolkitConfig::default();
        assert_eq!(config.sweep_interval(), Duration::from_secs(300));
        assert_eq!(config.max_artifact_age(), Duration::from_secs(1800));
        assert_eq!(config.cleanup_delays.for_class(DelayClass::Short), Duration::from_secs(1));
        assert_eq!(config.cleanup_delays.for_class(DelayClass::Standard), Duration::from_secs(2));
        assert_eq!(config.cleanup_delays.for_class(DelayClass::Long), Duration::from_secs(5));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("blattwerk.json");
        std::fs::write(&path, r#"{ "sweep_interval_secs": 60, "cleanup_delays": { "long_secs": 9 } }"#)
            .expect("write config");

        let config = ToolkitConfig::load(&path).expect("load");
        assert_eq!(config.sweep_interval_secs, 60);
        assert_eq!(config.cleanup_delays.long_secs, 9);
        assert_eq!(config.cleanup_delays.short_secs, 1);
        assert_eq!(config.max_artifact_age_secs, 1800);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = ToolkitConfig::load_or_default(Some(&dir.path().join("absent.json")))
            .expect("defaults");
        assert_eq!(config.tool_timeout_secs, 120);
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out.json");
        let config = ToolkitConfig {
            thumbnail_quality: 55,
            ..ToolkitConfig::default()
        };
        config.save(&path).expect("save");
        assert_eq!(ToolkitConfig::load(&path).expect("load").thumbnail_quality, 55);
    }
}
