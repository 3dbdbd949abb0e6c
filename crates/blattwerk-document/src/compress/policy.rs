// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Compression decision policy: tier table, per-image quality and downscale
// rules, and the never-grow acceptance check.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Requested compression strength.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionTier {
    Low,
    #[default]
    Medium,
    High,
}

impl CompressionTier {
    /// Unrecognised names fall back to medium.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }
}

/// Numeric parameters derived from a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompressionProfile {
    pub tier: CompressionTier,
    /// JPEG quality for ordinary images.
    pub image_quality: u8,
    /// Images larger than this in either dimension are downscaled first.
    pub downscale_threshold_px: u32,
    /// Largest dimension after which the aggressive quality applies.
    pub aggressive_threshold_px: u32,
    /// Quality reduction applied above the aggressive threshold.
    pub aggressive_quality_delta: u8,
    /// The aggressive reduction never goes below this.
    pub quality_floor: u8,
}

/// Profile for `tier`.
pub fn select(tier: CompressionTier) -> CompressionProfile {
    let image_quality = match tier {
        CompressionTier::Low => 90,
        CompressionTier::Medium => 70,
        CompressionTier::High => 30,
    };
    CompressionProfile {
        tier,
        image_quality,
        downscale_threshold_px: 2000,
        aggressive_threshold_px: 1000,
        aggressive_quality_delta: 20,
        quality_floor: 15,
    }
}

/// What to do with one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImagePlan {
    /// Target size when the image must shrink first.
    pub resize_to: Option<(u32, u32)>,
    pub quality: u8,
}

impl CompressionProfile {
    /// Decide resize and quality for a `width` x `height` image.
    ///
    /// The quality reduction looks at the original size; downscaling keeps
    /// the aspect ratio and caps the largest side at the threshold.
    pub fn plan_image(&self, width: u32, height: u32) -> ImagePlan {
        let largest = width.max(height);
        let quality = if largest > self.aggressive_threshold_px {
            self.image_quality
                .saturating_sub(self.aggressive_quality_delta)
                .max(self.quality_floor)
        } else {
            self.image_quality
        };

        let resize_to = (largest > self.downscale_threshold_px).then(|| {
            let ratio = f64::from(self.downscale_threshold_px) / f64::from(largest);
            let scaled = |side: u32| ((f64::from(side) * ratio).round() as u32).max(1);
            (scaled(width), scaled(height))
        });

        ImagePlan { resize_to, quality }
    }
}

/// Which pass produced the candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompressionPath {
    /// Images re-encoded, then streams deflated.
    ImageReencode,
    /// Streams deflated only, after the image pass failed.
    StreamOnly,
}

/// Final choice between a candidate and the original bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    AcceptCandidate,
    KeepOriginal,
}

/// Accept the candidate only when it is strictly smaller.
pub fn judge(original_len: usize, candidate_len: usize) -> Verdict {
    let verdict = if candidate_len < original_len {
        Verdict::AcceptCandidate
    } else {
        Verdict::KeepOriginal
    };
    debug!(original_len, candidate_len, ?verdict, "compression verdict");
    verdict
}

/// Size report returned to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SizeReport {
    pub input_size: u64,
    pub output_size: u64,
    /// Percentage saved, `100 - output/input * 100`, two decimals.
    pub ratio: f64,
}

impl SizeReport {
    pub fn new(input_size: u64, output_size: u64) -> Self {
        let ratio = if input_size == 0 {
            0.0
        } else {
            100.0 - (output_size as f64 / input_size as f64 * 100.0)
        };
        Self {
            input_size,
            output_size,
            ratio: (ratio * 100.0).round() / 100.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_table() {
        assert_eq!(select(CompressionTier::Low).image_quality, 90);
        assert_eq!(select(CompressionTier::Medium).image_quality, 70);
        assert_eq!(select(CompressionTier::High).image_quality, 30);
    }

    #[test]
    fn unknown_tier_is_medium() {
        assert_eq!(CompressionTier::parse("extreme"), CompressionTier::Medium);
        assert_eq!(CompressionTier::parse(" HIGH "), CompressionTier::High);
    }

    #[test]
    fn small_images_keep_tier_quality() {
        let plan = select(CompressionTier::Medium).plan_image(800, 600);
        assert_eq!(plan, ImagePlan { resize_to: None, quality: 70 });
    }

    #[test]
    fn large_images_get_aggressive_quality_with_floor() {
        assert_eq!(select(CompressionTier::Medium).plan_image(1200, 900).quality, 50);
        assert_eq!(select(CompressionTier::High).plan_image(1001, 10).quality, 15);
        assert_eq!(select(CompressionTier::Low).plan_image(1000, 1000).quality, 90);
    }

    #[test]
    fn huge_images_are_downscaled_preserving_aspect() {
        let plan = select(CompressionTier::Low).plan_image(4000, 3000);
        assert_eq!(plan.resize_to, Some((2000, 1500)));
        assert_eq!(plan.quality, 70);

        let tall = select(CompressionTier::Low).plan_image(1000, 2500);
        assert_eq!(tall.resize_to, Some((800, 2000)));
        assert_eq!(select(CompressionTier::Low).plan_image(2000, 2000).resize_to, None);
    }

    #[test]
    fn candidate_must_be_strictly_smaller() {
        assert_eq!(judge(1000, 999), Verdict::AcceptCandidate);
        assert_eq!(judge(1000, 1000), Verdict::KeepOriginal);
        assert_eq!(judge(1000, 1500), Verdict::KeepOriginal);
    }

    #[test]
    fn size_report_ratio() {
        let report = SizeReport::new(2000, 500);
        assert_eq!(report.ratio, 75.0);
        assert_eq!(SizeReport::new(0, 0).ratio, 0.0);
        assert_eq!(SizeReport::new(300, 200).ratio, 33.33);
    }
}
