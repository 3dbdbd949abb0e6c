// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// blattwerk-artifacts: the shared artifact directory.
//
// Every file a request writes is minted and recorded by the ledger under a
// collision-free name, and reclaimed by the cleanup scheduler through its
// deferred, eager, and sweep paths.

pub mod clock;
pub mod ledger;
pub mod naming;
pub mod scheduler;

pub use clock::{Clock, ManualClock, SystemClock};
pub use ledger::{ArtifactLedger, CleanupReport, hash_bytes};
pub use naming::{OutputName, secure_filename};
pub use scheduler::{CleanupScheduler, CleanupState};
