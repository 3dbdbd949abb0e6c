// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Compression: tier policy and the image/stream recompression engine.

pub mod engine;
pub mod policy;

pub use engine::{CompressionOutcome, compress_pdf};
pub use policy::{CompressionPath, CompressionProfile, CompressionTier, SizeReport, Verdict};
