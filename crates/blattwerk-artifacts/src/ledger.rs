// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Artifact ledger: every file a request writes into the shared artifact
// directory, who owns it, and when it was made.
//
// Stored filenames are `<token>_<sanitised name>` where the token is the
// artifact id in hyphenless hex, so two requests uploading the same name
// never collide.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use blattwerk_core::error::Result;
use blattwerk_core::types::{Artifact, ArtifactId, ArtifactRole, RequestId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument, warn};

use crate::clock::Clock;
use crate::naming::secure_filename;

/// SHA-256 of `data` as lowercase hex.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Files removed by one cleanup action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub deleted_files: usize,
    pub freed_bytes: u64,
}

impl CleanupReport {
    pub fn freed_kb(&self) -> f64 {
        (self.freed_bytes as f64 / 1024.0 * 100.0).round() / 100.0
    }

    fn add(&mut self, bytes: u64) {
        self.deleted_files += 1;
        self.freed_bytes += bytes;
    }
}

struct LedgerInner {
    root: PathBuf,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<ArtifactId, Artifact>>,
}

/// Shared, cloneable handle to the artifact bookkeeping.
#[derive(Clone)]
pub struct ArtifactLedger {
    inner: Arc<LedgerInner>,
}

impl ArtifactLedger {
    // -- Construction --------------------------------------------------------

    /// Open the ledger over `root`, creating the directory if needed.
    #[instrument(skip_all, fields(root = %root.as_ref().display()))]
    pub fn open(root: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        debug!("artifact ledger opened");
        Ok(Self {
            inner: Arc::new(LedgerInner {
                root,
                clock,
                entries: Mutex::new(HashMap::new()),
            }),
        })
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.inner.clock
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<ArtifactId, Artifact>> {
        self.inner.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -- Recording -----------------------------------------------------------

    /// Reserve a fresh id and path for `filename` on behalf of `owner`.
    ///
    /// The reservation is visible to cleanup immediately, before any byte is
    /// written, with size zero until [`register`](Self::register) completes it.
    pub fn mint(&self, owner: RequestId, filename: &str) -> Artifact {
        let id = ArtifactId::new();
        let path = self
            .inner
            .root
            .join(format!("{}_{}", id.token(), secure_filename(filename)));
        self.reserve(owner, id, path)
    }

    /// Reserve `path`, a name an external tool will write to, on behalf of
    /// `owner`. Cleaning up the request removes the file whether or not the
    /// tool finished.
    pub fn reserve_path(&self, owner: RequestId, path: PathBuf) -> Artifact {
        self.reserve(owner, ArtifactId::new(), path)
    }

    fn reserve(&self, owner: RequestId, id: ArtifactId, path: PathBuf) -> Artifact {
        let artifact = Artifact {
            id,
            path,
            owner,
            role: ArtifactRole::Intermediate,
            created_at: DateTime::<Utc>::from(self.inner.clock.now()),
            size: 0,
            sha256: None,
        };
        self.entries().insert(id, artifact.clone());
        debug!(%owner, artifact = %id, path = %artifact.path.display(), "artifact minted");
        artifact
    }

    /// Record the finished file at `path` under a minted `id`.
    ///
    /// `path` may differ from the reserved one when an external tool chose
    /// the output name.
    pub fn register(&self, id: ArtifactId, path: &Path, role: ArtifactRole) -> Result<Artifact> {
        let data = std::fs::read(path)?;
        let mut entries = self.entries();
        let artifact = entries.get_mut(&id).ok_or_else(|| {
            std::io::Error::new(ErrorKind::NotFound, format!("artifact {id} was never minted"))
        })?;
        artifact.path = path.to_path_buf();
        artifact.role = role;
        artifact.size = data.len() as u64;
        artifact.sha256 = Some(hash_bytes(&data));
        debug!(artifact = %id, size = artifact.size, ?role, "artifact registered");
        Ok(artifact.clone())
    }

    /// Mint, write `data` in full, then register.
    #[instrument(skip(self, data), fields(len = data.len()))]
    pub fn write(&self, owner: RequestId, filename: &str, role: ArtifactRole, data: &[u8]) -> Result<Artifact> {
        let reserved = self.mint(owner, filename);
        if let Err(err) = std::fs::write(&reserved.path, data) {
            warn!(%err, path = %reserved.path.display(), "artifact write failed");
            let _ = self.delete(reserved.id);
            return Err(err.into());
        }
        self.register(reserved.id, &reserved.path, role)
    }

    // -- Queries -------------------------------------------------------------

    pub fn get(&self, id: ArtifactId) -> Option<Artifact> {
        self.entries().get(&id).cloned()
    }

    pub fn read(&self, id: ArtifactId) -> Result<Vec<u8>> {
        let path = self
            .get(id)
            .map(|artifact| artifact.path)
            .ok_or_else(|| std::io::Error::new(ErrorKind::NotFound, format!("artifact {id} is not in the ledger")))?;
        Ok(std::fs::read(path)?)
    }

    /// Every artifact `owner` has written, oldest first.
    pub fn all_for_request(&self, owner: RequestId) -> Vec<Artifact> {
        let mut found: Vec<Artifact> = self
            .entries()
            .values()
            .filter(|artifact| artifact.owner == owner)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.path.cmp(&b.path)));
        found
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // -- Removal -------------------------------------------------------------

    /// Remove the artifact's file and entry. Returns the bytes freed.
    ///
    /// Deleting an id that was never minted, or whose file is already gone,
    /// succeeds and frees nothing.
    pub fn delete(&self, id: ArtifactId) -> Result<u64> {
        let removed = self.entries().remove(&id);
        let Some(artifact) = removed else {
            return Ok(0);
        };
        remove_file_quietly(&artifact.path)
    }

    /// Delete everything `owner` wrote, carrying on past individual failures.
    #[instrument(skip_all, fields(%owner))]
    pub fn delete_request(&self, owner: RequestId) -> CleanupReport {
        let mut report = CleanupReport::default();
        for artifact in self.all_for_request(owner) {
            match self.delete(artifact.id) {
                Ok(bytes) => report.add(bytes),
                Err(err) => warn!(%err, path = %artifact.path.display(), "failed to delete artifact"),
            }
        }
        debug!(deleted = report.deleted_files, freed = report.freed_bytes, "request artifacts deleted");
        report
    }

    /// Drop the entry whose file is `path`, if any, without touching disk.
    pub fn forget_path(&self, path: &Path) -> Option<Artifact> {
        let mut entries = self.entries();
        let id = entries.iter().find(|(_, artifact)| artifact.path == path).map(|(id, _)| *id)?;
        entries.remove(&id)
    }

    /// Drop every entry without touching disk.
    pub fn forget_all(&self) -> usize {
        let mut entries = self.entries();
        let count = entries.len();
        entries.clear();
        count
    }
}

/// Remove `path`, treating a missing file as already removed.
pub(crate) fn remove_file_quietly(path: &Path) -> Result<u64> {
    let size = std::fs::metadata(path).map(|meta| meta.len()).unwrap_or(0);
    match std::fs::remove_file(path) {
        Ok(()) => Ok(size),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(0),
        Err(err) => Err(err.into()),
    }
}
